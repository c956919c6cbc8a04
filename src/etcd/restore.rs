// src/etcd/restore.rs
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::runtime::{ContainerRuntime, ContainerSpec, Mount};
use crate::utils::logging::Logger;
use std::path::Path;

pub const ETCD_DATA_DIR: &str = "/etcd-data";
const SNAPSHOT_MOUNT: &str = "/snapshot.db";

/// Restores `snapshot_path` with `etcdutl` into a fresh data volume.
pub fn restore_snapshot(
    runtime: &mut dyn ContainerRuntime,
    config: &SessionConfig,
    snapshot_path: &Path,
    logger: &mut dyn Logger,
) -> Result<()> {
    // Validate snapshot existence before touching the engine
    if !snapshot_path.is_file() {
        return Err(Error::InputNotFound {
            what: "snapshot file",
            path: snapshot_path.to_path_buf(),
        });
    }
    let snapshot = snapshot_path
        .canonicalize()
        .map_err(|e| Error::io(format!("failed to resolve {}", snapshot_path.display()), e))?;

    logger.log("Pulling etcd Docker image...");
    let pulled = runtime
        .pull_image(&config.etcd_image)
        .map_err(|e| Error::process("failed to pull etcd Docker image", e))?;
    logger.debug_log(&format!("Pull output:\n{}", pulled.trim_end()));

    logger.log(&format!(
        "Removing existing container: {} (if running)...",
        config.etcd_container
    ));
    runtime
        .remove_container(&config.etcd_container)
        .map_err(|e| Error::process("failed to remove existing etcd container", e))?;

    logger.log(&format!(
        "Removing existing Docker volume: {} (if exists)...",
        config.etcd_volume
    ));
    runtime
        .remove_volume(&config.etcd_volume)
        .map_err(|e| Error::process("failed to remove existing Docker volume", e))?;

    logger.log(&format!("Creating Docker volume: {}...", config.etcd_volume));
    runtime
        .create_volume(&config.etcd_volume)
        .map_err(|e| Error::process("failed to create Docker volume", e))?;

    logger.log(&format!(
        "Restoring snapshot: {} into Docker volume: {}...",
        snapshot.display(),
        config.etcd_volume
    ));
    let spec = ContainerSpec::new(&config.etcd_image)
        .name(&config.etcd_container)
        .auto_remove()
        .mount(Mount::bind(&snapshot, SNAPSHOT_MOUNT).read_only())
        .mount(Mount::volume(&config.etcd_volume, ETCD_DATA_DIR))
        .command([
            "/usr/local/bin/etcdutl".to_string(),
            "snapshot".to_string(),
            "restore".to_string(),
            SNAPSHOT_MOUNT.to_string(),
            format!("--data-dir={}", ETCD_DATA_DIR),
        ]);
    logger.debug_log(&format!("Executing: {}", spec));

    let output = runtime
        .run_container(&spec)
        .map_err(|e| Error::process("failed to restore snapshot", e))?;
    logger.debug_log(&format!("Command output:\n{}", output.trim_end()));

    logger.log("Snapshot restored successfully.");
    logger.log(&format!(
        "Restored data is available in Docker volume: {}",
        config.etcd_volume
    ));
    Ok(())
}
