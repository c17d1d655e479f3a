//! Content generators: the small expression language `generate-file` uses
//! to produce the bytes of a generated file.

pub mod butane;
pub mod kube;

use anyhow::{ensure, Context, Result};
use serde_json::Value;
use std::fmt::Debug;
use tera::Tera;

/// Produces the text content of a generated file.
pub trait ContentGenerator: Debug + Send + Sync {
    fn generate(&self) -> Result<String>;
}

/// Something that can appear inside a [`FromKubeObjects`] list: produces a
/// single object, optionally skipping itself, optionally failing.
pub trait KubeObjectSource: Debug + Send + Sync {
    fn object(&self) -> Result<Option<Value>>;
}

/// Returns its payload verbatim.
#[derive(Debug, Clone)]
pub struct FromValue(pub String);

impl ContentGenerator for FromValue {
    fn generate(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

fn render_template(template: &str, context: &tera::Context) -> Result<String> {
    Tera::one_off(template, context, true).context("rendering template")
}

fn context_from_pairs(pairs: Vec<(String, Value)>) -> tera::Context {
    let mut ctx = tera::Context::new();
    for (k, v) in pairs {
        ctx.insert(k, &v);
    }
    ctx
}

/// Renders `template` with a `key1, val1, key2, val2, …` argument list.
#[derive(Debug)]
pub struct FromTemplate {
    template: String,
    context: tera::Context,
}

impl FromTemplate {
    /// `args` must alternate string keys and values; an odd-length list is
    /// rejected (the same constraint the underlying argument list needs).
    pub fn new(template: impl Into<String>, args: Vec<(String, Value)>) -> Self {
        Self {
            template: template.into(),
            context: context_from_pairs(args),
        }
    }

    pub fn from_flat_args(template: impl Into<String>, flat: Vec<Value>) -> Result<Self> {
        ensure!(flat.len() % 2 == 0, "FromTemplate argument list must be even-length");
        let mut pairs = Vec::with_capacity(flat.len() / 2);
        for chunk in flat.chunks_exact(2) {
            let key = chunk[0]
                .as_str()
                .context("FromTemplate argument key must be a string")?
                .to_string();
            pairs.push((key, chunk[1].clone()));
        }
        Ok(Self::new(template, pairs))
    }
}

impl ContentGenerator for FromTemplate {
    fn generate(&self) -> Result<String> {
        render_template(&self.template, &self.context)
    }
}

/// Serializes each non-skipped object to YAML and joins with `---`.
#[derive(Debug)]
pub struct FromKubeObjects(pub Vec<Box<dyn KubeObjectSource>>);

impl ContentGenerator for FromKubeObjects {
    fn generate(&self) -> Result<String> {
        let mut docs = Vec::new();
        for source in &self.0 {
            if let Some(obj) = source.object()? {
                docs.push(serde_yaml::to_string(&obj).context("marshaling kube object")?);
            }
        }
        Ok(docs.join("---\n"))
    }
}

/// Renders a template, then translates the result as a Butane config into
/// an Ignition config. Warnings from the translation are treated as errors.
#[derive(Debug)]
pub struct IgnitionFromButaneTemplate {
    template: String,
    context: tera::Context,
}

impl IgnitionFromButaneTemplate {
    pub fn new(template: impl Into<String>, args: Vec<(String, Value)>) -> Self {
        Self {
            template: template.into(),
            context: context_from_pairs(args),
        }
    }
}

impl ContentGenerator for IgnitionFromButaneTemplate {
    fn generate(&self) -> Result<String> {
        let rendered = render_template(&self.template, &self.context)?;
        let config = butane::translate(&rendered)?;
        serde_json::to_string_pretty(&config).context("marshaling ignition config")
    }
}

/// Marshals `value` as YAML.
#[derive(Debug, Clone)]
pub struct YamlFrom(pub Value);

impl ContentGenerator for YamlFrom {
    fn generate(&self) -> Result<String> {
        serde_yaml::to_string(&self.0).context("marshaling value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_returns_verbatim() {
        let g = FromValue("hello".into());
        assert_eq!(g.generate().unwrap(), "hello");
    }

    #[test]
    fn from_template_renders() {
        let g = FromTemplate::new("hello {{ name }}", vec![("name".into(), Value::from("world"))]);
        assert_eq!(g.generate().unwrap(), "hello world");
    }

    #[test]
    fn from_flat_args_rejects_odd_length() {
        assert!(FromTemplate::from_flat_args("x", vec![Value::from("k")]).is_err());
    }

    #[test]
    fn yaml_from_marshals_value() {
        let g = YamlFrom(serde_json::json!({"a": 1}));
        assert_eq!(g.generate().unwrap().trim(), "a: 1");
    }

    #[derive(Debug)]
    struct Skip;
    impl KubeObjectSource for Skip {
        fn object(&self) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct Fixed(Value);
    impl KubeObjectSource for Fixed {
        fn object(&self) -> Result<Option<Value>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[test]
    fn from_kube_objects_skips_none_and_joins_rest() {
        let g = FromKubeObjects(vec![
            Box::new(Fixed(serde_json::json!({"a": 1}))),
            Box::new(Skip),
            Box::new(Fixed(serde_json::json!({"b": 2}))),
        ]);
        let out = g.generate().unwrap();
        assert_eq!(out.matches("---").count(), 1);
    }

    #[derive(Debug)]
    struct Failing;
    impl KubeObjectSource for Failing {
        fn object(&self) -> Result<Option<Value>> {
            anyhow::bail!("boom")
        }
    }

    #[test]
    fn from_kube_objects_propagates_error() {
        let g = FromKubeObjects(vec![Box::new(Failing)]);
        assert!(g.generate().is_err());
    }
}
