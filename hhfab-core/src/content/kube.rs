//! Typed wrappers producing Kubernetes API objects, recursively evaluating
//! nested [`super::ContentGenerator`] values (e.g. a templated value used
//! as a Secret's string data).

use super::{ContentGenerator, KubeObjectSource};
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

fn meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).context("converting kube object to value")
}

/// A `v1/Secret` built from named [`ContentGenerator`] string values.
pub struct KubeSecret {
    pub name: String,
    pub namespace: String,
    pub data: BTreeMap<String, Box<dyn ContentGenerator>>,
}

impl fmt::Debug for KubeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeSecret")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KubeObjectSource for KubeSecret {
    fn object(&self) -> Result<Option<Value>> {
        let mut string_data = BTreeMap::new();
        for (k, gen) in &self.data {
            string_data.insert(k.clone(), gen.generate()?);
        }
        let secret = Secret {
            metadata: meta(&self.name, &self.namespace),
            string_data: Some(string_data),
            ..Default::default()
        };
        Ok(Some(to_value(&secret)?))
    }
}

/// A `v1/ConfigMap` built from named [`ContentGenerator`] string values.
pub struct KubeConfigMap {
    pub name: String,
    pub namespace: String,
    pub data: BTreeMap<String, Box<dyn ContentGenerator>>,
}

impl fmt::Debug for KubeConfigMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeConfigMap")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KubeObjectSource for KubeConfigMap {
    fn object(&self) -> Result<Option<Value>> {
        let mut data = BTreeMap::new();
        for (k, gen) in &self.data {
            data.insert(k.clone(), gen.generate()?);
        }
        let cm = ConfigMap {
            metadata: meta(&self.name, &self.namespace),
            data: Some(data),
            ..Default::default()
        };
        Ok(Some(to_value(&cm)?))
    }
}

/// A single `v1/Service` port mapping.
#[derive(Debug, Clone)]
pub struct KubeServicePort {
    pub name: String,
    pub port: i32,
    pub target_port: i32,
    pub protocol: String,
}

/// A `v1/Service`.
#[derive(Debug)]
pub struct KubeService {
    pub name: String,
    pub namespace: String,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<KubeServicePort>,
}

impl KubeObjectSource for KubeService {
    fn object(&self) -> Result<Option<Value>> {
        let ports = self
            .ports
            .iter()
            .map(|p| ServicePort {
                name: Some(p.name.clone()),
                port: p.port,
                target_port: Some(k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(
                    p.target_port,
                )),
                protocol: Some(p.protocol.clone()),
                ..Default::default()
            })
            .collect();
        let svc = Service {
            metadata: meta(&self.name, &self.namespace),
            spec: Some(ServiceSpec {
                selector: Some(self.selector.clone()),
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        };
        Ok(Some(to_value(&svc)?))
    }
}

/// A `source.toolkit.fluxcd.io`-style `HelmChart` custom resource. No
/// official typed client exists for Helm-controller CRDs, so this is
/// assembled as a raw JSON object rather than a `k8s-openapi` type.
#[derive(Debug)]
pub struct KubeHelmChart {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub version: String,
    pub repo: String,
    pub values: Box<dyn ContentGenerator>,
}

impl KubeObjectSource for KubeHelmChart {
    fn object(&self) -> Result<Option<Value>> {
        let values_yaml = self.values.generate()?;
        let values: Value = serde_yaml::from_str(&values_yaml)
            .context("helm chart values must be valid YAML")?;
        Ok(Some(serde_json::json!({
            "apiVersion": "source.toolkit.fluxcd.io/v1",
            "kind": "HelmChart",
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
            },
            "spec": {
                "chart": self.chart,
                "version": self.version,
                "sourceRef": { "name": self.repo },
                "values": values,
            },
        })))
    }
}
