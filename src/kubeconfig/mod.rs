mod encryption;
mod kube;

pub use encryption::EncryptionConfigGenerator;
pub use kube::{export_kubeconfig, server_url, ArtifactSource};
