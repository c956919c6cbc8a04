// src/etcd/relocate.rs
use crate::error::{Error, Result};
use crate::runtime::{ContainerRuntime, ContainerSpec, Mount};
use crate::utils::logging::Logger;
use std::path::Path;
use uuid::Uuid;

const STAGING_MOUNT: &str = "/tmp/certs";

/// A directory inside a named volume, as seen by the containers that mount it.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeTarget {
    pub volume: String,
    pub mount_path: String,
}

/// Copies every file in `staging_dir` into `destination` with a one-shot
/// helper container. Not retried: a failed copy fails the whole start.
pub fn relocate(
    runtime: &mut dyn ContainerRuntime,
    staging_dir: &Path,
    destination: &VolumeTarget,
    helper_image: &str,
    logger: &mut dyn Logger,
) -> Result<()> {
    logger.log(&format!(
        "Copying certificates and keys into Docker volume: {}...",
        destination.volume
    ));

    let mount_path = destination.mount_path.trim_end_matches('/');
    let helper_name = format!("{}-relocate-{}", destination.volume, Uuid::new_v4().simple());
    let spec = ContainerSpec::new(helper_image)
        .name(&helper_name)
        .auto_remove()
        .mount(Mount::volume(&destination.volume, mount_path))
        .mount(Mount::bind(staging_dir, STAGING_MOUNT).read_only())
        .command([
            "sh".to_string(),
            "-c".to_string(),
            format!("cp {}/* {}/", STAGING_MOUNT, mount_path),
        ]);
    logger.debug_log(&format!("Running helper: {}", spec));

    runtime
        .run_container(&spec)
        .map_err(|e| Error::process("failed to copy certificates and keys into Docker volume", e))?;

    logger.log("Certificates and keys successfully stored in Docker volume.");
    Ok(())
}
