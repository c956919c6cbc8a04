use crate::cert::CredentialPaths;
use crate::error::{Error, Result};
use crate::runtime::ContainerRuntime;
use crate::utils::logging::Logger;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use url::Url;

pub const CLUSTER_NAME: &str = "kubernetes";
pub const CONTEXT_NAME: &str = "kubernetes";
pub const USER_NAME: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    pub current_context: String,
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub cluster: ClusterConfig,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    pub server: String,
    pub certificate_authority_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub context: ContextConfig,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub cluster: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: UserConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    pub client_certificate_data: String,
    pub client_key_data: String,
}

/// `https://<host>:<port>`, bracketing IPv6 literals.
pub fn server_url(host: IpAddr, port: u16) -> String {
    match host {
        IpAddr::V4(v4) => format!("https://{}:{}", v4, port),
        IpAddr::V6(v6) => format!("https://[{}]:{}", v6, port),
    }
}

impl KubeConfig {
    /// Single-cluster, single-user profile with every credential embedded.
    pub fn admin(
        server: &str,
        ca_cert: &[u8],
        client_cert: &[u8],
        client_key: &[u8],
    ) -> Result<Self> {
        let config = KubeConfig {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                cluster: ClusterConfig {
                    server: server.to_string(),
                    certificate_authority_data: general_purpose::STANDARD.encode(ca_cert),
                },
                name: CLUSTER_NAME.to_string(),
            }],
            contexts: vec![NamedContext {
                context: ContextConfig {
                    cluster: CLUSTER_NAME.to_string(),
                    user: USER_NAME.to_string(),
                },
                name: CONTEXT_NAME.to_string(),
            }],
            current_context: CONTEXT_NAME.to_string(),
            users: vec![NamedUser {
                name: USER_NAME.to_string(),
                user: UserConfig {
                    client_certificate_data: general_purpose::STANDARD.encode(client_cert),
                    client_key_data: general_purpose::STANDARD.encode(client_key),
                },
            }],
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_version != "v1" || self.kind != "Config" {
            return Err(Error::InvalidKubeconfig(format!(
                "unsupported document {} {}",
                self.api_version, self.kind
            )));
        }

        for named in &self.clusters {
            let url = Url::parse(&named.cluster.server).map_err(|e| {
                Error::InvalidKubeconfig(format!("server {:?}: {}", named.cluster.server, e))
            })?;
            if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
                return Err(Error::InvalidKubeconfig(format!(
                    "server {:?} is not an http(s) URL with a host",
                    named.cluster.server
                )));
            }
            check_data("certificate-authority-data", &named.cluster.certificate_authority_data)?;
        }

        for named in &self.users {
            check_data("client-certificate-data", &named.user.client_certificate_data)?;
            check_data("client-key-data", &named.user.client_key_data)?;
        }

        for named in &self.contexts {
            if !self.clusters.iter().any(|c| c.name == named.context.cluster) {
                return Err(Error::InvalidKubeconfig(format!(
                    "context {} references unknown cluster {}",
                    named.name, named.context.cluster
                )));
            }
            if !self.users.iter().any(|u| u.name == named.context.user) {
                return Err(Error::InvalidKubeconfig(format!(
                    "context {} references unknown user {}",
                    named.name, named.context.user
                )));
            }
        }

        if !self.contexts.iter().any(|c| c.name == self.current_context) {
            return Err(Error::InvalidKubeconfig(format!(
                "current-context {} does not exist",
                self.current_context
            )));
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        self.validate()?;
        serde_yaml::to_string(self).map_err(|e| Error::Serialization {
            what: "kubeconfig",
            reason: e.to_string(),
        })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("failed to create {}", parent.display()), e))?;
        }
        fs::write(path, yaml)
            .map_err(|e| Error::io(format!("failed to write kubeconfig {}", path.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::io(format!("failed to restrict {}", path.display()), e))?;
        }
        Ok(())
    }
}

fn check_data(field: &str, value: &str) -> Result<()> {
    match general_purpose::STANDARD.decode(value) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        Ok(_) => Err(Error::InvalidKubeconfig(format!("{} is empty", field))),
        Err(e) => Err(Error::InvalidKubeconfig(format!("{} is not base64: {}", field, e))),
    }
}

/// Where the client-facing credentials are read from.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// Copied out of a running container through the container runtime.
    Container { name: String, cert_dir: String },
    /// Read from a local directory, e.g. the output of `issue-certs`.
    Directory(PathBuf),
}

const CLIENT_FACING: [&str; 3] = [
    CredentialPaths::CA_CERT,
    CredentialPaths::CLIENT_CERT,
    CredentialPaths::CLIENT_KEY,
];

/// Fetches `ca.crt`, `client.crt` and `client.key` from `source` and builds a
/// profile for `server`. The CA private key is never fetched.
pub fn materialize(
    runtime: &mut dyn ContainerRuntime,
    server: &str,
    source: &ArtifactSource,
    logger: &mut dyn Logger,
) -> Result<KubeConfig> {
    let staging;
    let dir: &Path = match source {
        ArtifactSource::Container { name, cert_dir } => {
            staging = tempfile::Builder::new()
                .prefix("kubeconfig-certs")
                .tempdir()
                .map_err(|e| Error::io("failed to create temporary directory", e))?;

            for file in CLIENT_FACING {
                let container_path = format!("{}/{}", cert_dir.trim_end_matches('/'), file);
                logger.debug_log(&format!("Copying {}:{}", name, container_path));
                runtime
                    .copy_file_out(name, &container_path, &staging.path().join(file))
                    .map_err(|e| Error::ArtifactUnavailable {
                        artifact: file.to_string(),
                        reason: e.to_string(),
                    })?;
            }
            staging.path()
        }
        ArtifactSource::Directory(dir) => dir,
    };

    let ca_cert = read_artifact(dir, CredentialPaths::CA_CERT)?;
    let client_cert = read_artifact(dir, CredentialPaths::CLIENT_CERT)?;
    let client_key = read_artifact(dir, CredentialPaths::CLIENT_KEY)?;

    KubeConfig::admin(server, &ca_cert, &client_cert, &client_key)
}

/// Materializes and writes the profile. Nothing is written on failure.
pub fn export_kubeconfig(
    runtime: &mut dyn ContainerRuntime,
    server: &str,
    source: &ArtifactSource,
    output: &Path,
    logger: &mut dyn Logger,
) -> Result<KubeConfig> {
    let config = materialize(runtime, server, source, logger)?;
    config.write_to(output)?;
    logger.log(&format!("Kubeconfig generated at: {}", output.display()));
    Ok(config)
}

fn read_artifact(dir: &Path, file: &str) -> Result<Vec<u8>> {
    let path = dir.join(file);
    match fs::read(&path) {
        Ok(bytes) if bytes.is_empty() => Err(Error::ArtifactUnavailable {
            artifact: file.to_string(),
            reason: format!("{} is empty", path.display()),
        }),
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::ArtifactUnavailable {
            artifact: file.to_string(),
            reason: format!("{} does not exist", path.display()),
        }),
        Err(e) => Err(Error::ArtifactUnavailable {
            artifact: file.to_string(),
            reason: e.to_string(),
        }),
    }
}
