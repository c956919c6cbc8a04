// config/types.rs
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Names, images and paths shared by the restore/start/cleanup workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub docker_binary: String,
    pub etcd_image: String,
    pub apiserver_image: String,
    pub helper_image: String,
    pub etcd_container: String,
    pub etcd_volume: String,
    pub apiserver_container: String,
    pub cert_volume: String,
    pub cert_mount_dir: String,
    pub encryption_config: String,
    pub service_cluster_ip_range: String,
    pub secure_port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            etcd_image: "quay.io/coreos/etcd:v3.5.7".to_string(),
            apiserver_image: "k8s.gcr.io/kube-apiserver:v1.27.1".to_string(),
            helper_image: "alpine".to_string(),
            etcd_container: "etcd-restore".to_string(),
            etcd_volume: "etcd-data".to_string(),
            apiserver_container: "kube-apiserver".to_string(),
            cert_volume: "kube-apiserver-certs".to_string(),
            cert_mount_dir: "/certs".to_string(),
            encryption_config: "./encryption-config.json".to_string(),
            service_cluster_ip_range: "10.96.0.0/12".to_string(),
            secure_port: 6443,
        }
    }
}

impl SessionConfig {
    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        let config_str = fs::read_to_string(path)?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Loads `path` when it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> io::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        let config_str = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, config_str)
    }

    pub fn encryption_config_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.encryption_config).to_string())
    }

    pub fn validate(&self) -> io::Result<()> {
        let names = [
            ("etcd_container", &self.etcd_container),
            ("etcd_volume", &self.etcd_volume),
            ("apiserver_container", &self.apiserver_container),
            ("cert_volume", &self.cert_volume),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} must not be empty", field),
                ));
            }
        }
        if !self.cert_mount_dir.starts_with('/') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cert_mount_dir must be absolute: {}", self.cert_mount_dir),
            ));
        }
        if self.etcd_volume == self.cert_volume {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "etcd_volume and cert_volume must differ",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("session.json");
        fs::write(&path, r#"{ "etcd_container": "inspect-etcd", "secure_port": 7443 }"#)?;

        let config = SessionConfig::load_from_file(&path)?;
        assert_eq!(config.etcd_container, "inspect-etcd");
        assert_eq!(config.secure_port, 7443);
        assert_eq!(config.cert_volume, SessionConfig::default().cert_volume);
        Ok(())
    }

    #[test]
    fn save_and_load_agree() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("session.json");
        let mut config = SessionConfig::default();
        config.helper_image = "busybox".to_string();

        config.save_to_file(&path)?;
        assert_eq!(SessionConfig::load_or_default(&path)?, config);
        Ok(())
    }

    #[test]
    fn missing_file_means_defaults() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let config = SessionConfig::load_or_default(&temp_dir.path().join("absent.json"))?;
        assert_eq!(config, SessionConfig::default());
        Ok(())
    }

    #[test]
    fn rejects_shared_volume_and_relative_mount() {
        let mut config = SessionConfig::default();
        config.cert_volume = config.etcd_volume.clone();
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.cert_mount_dir = "certs".to_string();
        assert!(config.validate().is_err());
    }
}
