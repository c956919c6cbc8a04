// src/runtime/fake.rs
use super::{ContainerRuntime, ContainerSpec, MountKind, RuntimeError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// In-memory engine for workflow tests.
///
/// Volumes hold files by relative name. A container that bind-mounts a host
/// directory next to a volume has that directory's files copied into the
/// volume, which is what the relocation helper does on a real engine.
#[derive(Default)]
pub struct FakeRuntime {
    pub calls: Vec<String>,
    pub volumes: HashMap<String, HashMap<String, Vec<u8>>>,
    pub containers: HashMap<String, ContainerSpec>,
    pub runs: Vec<ContainerSpec>,
    fail_on: Option<String>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first call whose record starts with `prefix`.
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            fail_on: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    fn record(&mut self, call: String) -> Result<(), RuntimeError> {
        self.calls.push(call.clone());
        match &self.fail_on {
            Some(prefix) if call.starts_with(prefix.as_str()) => {
                self.fail_on = None;
                Err(RuntimeError {
                    command: call,
                    stderr: "simulated failure".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn copy_binds_into_volumes(&mut self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let volume = spec
            .mounts
            .iter()
            .find(|m| m.kind == MountKind::Volume)
            .map(|m| m.source.clone());
        let Some(volume) = volume else {
            return Ok(());
        };

        for mount in spec.mounts.iter().filter(|m| m.kind == MountKind::Bind) {
            let dir = Path::new(&mount.source);
            if !dir.is_dir() {
                continue;
            }
            let entries = fs::read_dir(dir).map_err(|e| RuntimeError {
                command: format!("cp {}", mount.source),
                stderr: e.to_string(),
            })?;
            for entry in entries.flatten() {
                if let Ok(bytes) = fs::read(entry.path()) {
                    self.volumes
                        .entry(volume.clone())
                        .or_default()
                        .insert(entry.file_name().to_string_lossy().to_string(), bytes);
                }
            }
        }
        Ok(())
    }
}

impl ContainerRuntime for FakeRuntime {
    fn pull_image(&mut self, image: &str) -> Result<String, RuntimeError> {
        self.record(format!("pull {}", image))?;
        Ok(format!("Status: Downloaded newer image for {}\n", image))
    }

    fn remove_container(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("rm {}", name))?;
        self.containers.remove(name);
        Ok(())
    }

    fn create_volume(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("volume create {}", name))?;
        self.volumes.entry(name.to_string()).or_default();
        Ok(())
    }

    fn remove_volume(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("volume rm {}", name))?;
        self.volumes.remove(name);
        Ok(())
    }

    fn run_container(&mut self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let label = spec.name.clone().unwrap_or_else(|| spec.image.clone());
        self.record(format!("run {}", label))?;
        self.runs.push(spec.clone());

        if spec.auto_remove {
            self.copy_binds_into_volumes(spec)?;
        }
        if let (Some(name), true) = (&spec.name, spec.detached) {
            self.containers.insert(name.clone(), spec.clone());
        }
        Ok(format!("{}-id\n", label))
    }

    fn copy_file_out(
        &mut self,
        container: &str,
        container_path: &str,
        local_path: &Path,
    ) -> Result<(), RuntimeError> {
        self.record(format!("cp {}:{}", container, container_path))?;

        let missing = || RuntimeError {
            command: format!("cp {}:{}", container, container_path),
            stderr: format!("Error: No such container:path: {}:{}", container, container_path),
        };

        let spec = self.containers.get(container).ok_or_else(missing)?;
        let bytes = spec
            .mounts
            .iter()
            .filter(|m| m.kind == MountKind::Volume)
            .find_map(|m| {
                let relative = container_path.strip_prefix(&format!("{}/", m.target))?;
                self.volumes.get(&m.source)?.get(relative).cloned()
            })
            .ok_or_else(missing)?;

        fs::write(local_path, bytes).map_err(|e| RuntimeError {
            command: format!("cp {}:{}", container, container_path),
            stderr: e.to_string(),
        })
    }
}
