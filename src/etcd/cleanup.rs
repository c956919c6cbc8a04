// src/etcd/cleanup.rs
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::runtime::ContainerRuntime;
use crate::utils::logging::Logger;

/// Removes both containers and both volumes. Safe to run repeatedly.
pub fn cleanup(
    runtime: &mut dyn ContainerRuntime,
    config: &SessionConfig,
    logger: &mut dyn Logger,
) -> Result<()> {
    cleanup_container(runtime, "kube-apiserver", &config.apiserver_container, logger)?;
    cleanup_container(runtime, "etcd", &config.etcd_container, logger)?;
    cleanup_volume(runtime, &config.cert_volume, logger)?;
    cleanup_volume(runtime, &config.etcd_volume, logger)?;
    logger.log("Cleanup completed.");
    Ok(())
}

fn cleanup_container(
    runtime: &mut dyn ContainerRuntime,
    role: &str,
    name: &str,
    logger: &mut dyn Logger,
) -> Result<()> {
    logger.log(&format!("Stopping and removing {} container: {}...", role, name));
    runtime.remove_container(name).map_err(|e| {
        Error::process(format!("failed to clean up {} container {}", role, name), e)
    })?;
    logger.debug_log(&format!("{} container {} is gone", role, name));
    Ok(())
}

fn cleanup_volume(
    runtime: &mut dyn ContainerRuntime,
    name: &str,
    logger: &mut dyn Logger,
) -> Result<()> {
    logger.log(&format!("Removing Docker volume: {}...", name));
    runtime
        .remove_volume(name)
        .map_err(|e| Error::process(format!("failed to clean up Docker volume {}", name), e))?;
    Ok(())
}
