// src/runtime/mod.rs
mod docker;
#[cfg(test)]
pub mod fake;

pub use docker::DockerCli;

use std::fmt;
use std::path::Path;

/// Failure reported by the container engine, carried verbatim to the operator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("`{command}` failed: {stderr}")]
pub struct RuntimeError {
    pub command: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MountKind {
    Volume,
    Bind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    pub kind: MountKind,
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn volume(name: &str, target: &str) -> Self {
        Self {
            kind: MountKind::Volume,
            source: name.to_string(),
            target: target.to_string(),
            read_only: false,
        }
    }

    pub fn bind(path: &Path, target: &str) -> Self {
        Self {
            kind: MountKind::Bind,
            source: path.display().to_string(),
            target: target.to_string(),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// Everything needed to launch one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub image: String,
    pub name: Option<String>,
    pub mounts: Vec<Mount>,
    pub network: Option<String>,
    pub detached: bool,
    pub auto_remove: bool,
    pub command: Vec<String>,
}

impl ContainerSpec {
    pub fn new(image: &str) -> Self {
        Self {
            image: image.to_string(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn network(mut self, mode: &str) -> Self {
        self.network = Some(mode.to_string());
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn auto_remove(mut self) -> Self {
        self.auto_remove = true;
        self
    }

    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.image)?;
        if let Some(name) = &self.name {
            write!(f, " (name={})", name)?;
        }
        for mount in &self.mounts {
            write!(f, " -v {}", mount)?;
        }
        if !self.command.is_empty() {
            write!(f, " {}", self.command.join(" "))?;
        }
        Ok(())
    }
}

/// The container engine as seen by the workflows.
///
/// Both removal operations are idempotent: removing something that does not
/// exist succeeds. Every other failure is returned as a [`RuntimeError`].
pub trait ContainerRuntime {
    /// Pulls `image` and returns the engine's progress output.
    fn pull_image(&mut self, image: &str) -> Result<String, RuntimeError>;
    fn remove_container(&mut self, name: &str) -> Result<(), RuntimeError>;
    fn create_volume(&mut self, name: &str) -> Result<(), RuntimeError>;
    fn remove_volume(&mut self, name: &str) -> Result<(), RuntimeError>;
    /// Runs a container and returns what it printed on stdout (the container id when detached).
    fn run_container(&mut self, spec: &ContainerSpec) -> Result<String, RuntimeError>;
    fn copy_file_out(
        &mut self,
        container: &str,
        container_path: &str,
        local_path: &Path,
    ) -> Result<(), RuntimeError>;
}
