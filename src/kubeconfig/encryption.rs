use crate::error::{Error, Result};
use crate::utils::logging::Logger;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const KIND: &str = "EncryptionConfiguration";
const API_VERSION: &str = "apiserver.config.k8s.io/v1";
const KEY_NAME: &str = "key1";
const KEY_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EncryptionConfiguration {
    kind: String,
    api_version: String,
    resources: Vec<ResourceRule>,
}

/// Providers are tried in order; the first one encrypts new writes.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ResourceRule {
    resources: Vec<String>,
    // `- aescbc: {...}` rather than serde_yaml's `!aescbc` tags
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    providers: Vec<Provider>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Provider {
    Aescbc { keys: Vec<SecretKey> },
    Identity {},
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SecretKey {
    name: String,
    secret: String,
}

/// Writes the `EncryptionConfiguration` the API server is started with.
///
/// Snapshots whose secrets were encrypted at rest need the source cluster's
/// own configuration instead; a generated key can only read plaintext data.
pub struct EncryptionConfigGenerator {
    output_path: PathBuf,
}

impl EncryptionConfigGenerator {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn generate_config(&self, logger: &mut dyn Logger) -> Result<()> {
        let config = EncryptionConfiguration {
            kind: KIND.to_string(),
            api_version: API_VERSION.to_string(),
            resources: vec![ResourceRule {
                resources: vec!["secrets".to_string()],
                providers: vec![
                    Provider::Aescbc {
                        keys: vec![SecretKey {
                            name: KEY_NAME.to_string(),
                            secret: random_key(KEY_BYTES)?,
                        }],
                    },
                    Provider::Identity {},
                ],
            }],
        };

        let rendered = if is_json(&self.output_path) {
            serde_json::to_string_pretty(&config).map_err(|e| Error::Serialization {
                what: "encryption config",
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::to_string(&config).map_err(|e| Error::Serialization {
                what: "encryption config",
                reason: e.to_string(),
            })?
        };

        fs::write(&self.output_path, rendered)
            .map_err(|e| Error::io(format!("failed to write {}", self.output_path.display()), e))?;

        logger.log(&format!(
            "Encryption configuration written to {}",
            self.output_path.display()
        ));
        Ok(())
    }
}

fn random_key(length: usize) -> Result<String> {
    let mut key = vec![0u8; length];
    openssl::rand::rand_bytes(&mut key).map_err(Error::Entropy)?;
    Ok(general_purpose::STANDARD.encode(&key))
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::MockLogger;
    use tempfile::TempDir;

    #[test]
    fn json_output_carries_a_32_byte_key_then_identity() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption-config.json");
        let mut logger = MockLogger::new();

        EncryptionConfigGenerator::new(path.clone())
            .generate_config(&mut logger)
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"apiVersion\": \"apiserver.config.k8s.io/v1\""));
        let config: EncryptionConfiguration = serde_json::from_str(&text).unwrap();
        assert_eq!(config.kind, "EncryptionConfiguration");

        let providers = &config.resources[0].providers;
        match &providers[0] {
            Provider::Aescbc { keys } => {
                assert_eq!(keys[0].name, "key1");
                let secret = general_purpose::STANDARD.decode(&keys[0].secret).unwrap();
                assert_eq!(secret.len(), 32);
            }
            other => panic!("expected aescbc first, got {:?}", other),
        }
        assert_eq!(providers[1], Provider::Identity {});
        assert!(logger.contains("Encryption configuration written"));
    }

    #[test]
    fn yaml_output_for_other_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption-config.yaml");

        EncryptionConfigGenerator::new(path.clone())
            .generate_config(&mut MockLogger::new())
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("kind: EncryptionConfiguration"));
        assert!(text.contains("- identity: {}"));
        let parsed: EncryptionConfiguration = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.resources[0].resources, vec!["secrets".to_string()]);
    }

    #[test]
    fn keys_differ_between_runs() {
        assert_ne!(random_key(32).unwrap(), random_key(32).unwrap());
    }
}
