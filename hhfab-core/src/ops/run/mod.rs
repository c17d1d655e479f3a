//! The five Run-Op kinds, each an idempotent install primitive executed
//! on the target by the embedded runner.

mod exec_command;
mod install_file;
mod push_oci;
mod wait_kube;
mod wait_url;

pub use exec_command::ExecCommand;
pub use install_file::InstallFile;
pub use push_oci::PushOci;
pub use wait_kube::WaitKube;
pub use wait_url::WaitUrl;
