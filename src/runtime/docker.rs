// src/runtime/docker.rs
use super::{ContainerRuntime, ContainerSpec, RuntimeError};
use std::path::Path;
use std::process::Command;

/// [`ContainerRuntime`] backed by the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    fn render(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    fn exec(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| RuntimeError {
                command: self.render(args),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RuntimeError {
                command: self.render(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn is_absent(error: &RuntimeError) -> bool {
    let stderr = error.stderr.to_lowercase();
    stderr.contains("no such container") || stderr.contains("no such volume")
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn run_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if spec.detached {
        args.push("-d".to_string());
    }
    if spec.auto_remove {
        args.push("--rm".to_string());
    }
    if let Some(name) = &spec.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    if let Some(network) = &spec.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }
    for mount in &spec.mounts {
        args.push("-v".to_string());
        args.push(mount.to_string());
    }
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

impl ContainerRuntime for DockerCli {
    fn pull_image(&mut self, image: &str) -> Result<String, RuntimeError> {
        self.exec(&owned(&["pull", image]))
    }

    fn remove_container(&mut self, name: &str) -> Result<(), RuntimeError> {
        match self.exec(&owned(&["rm", "-f", name])) {
            Err(e) if !is_absent(&e) => Err(e),
            _ => Ok(()),
        }
    }

    fn create_volume(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&owned(&["volume", "create", name])).map(|_| ())
    }

    fn remove_volume(&mut self, name: &str) -> Result<(), RuntimeError> {
        match self.exec(&owned(&["volume", "rm", name])) {
            Err(e) if !is_absent(&e) => Err(e),
            _ => Ok(()),
        }
    }

    fn run_container(&mut self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.exec(&run_args(spec))
    }

    fn copy_file_out(
        &mut self,
        container: &str,
        container_path: &str,
        local_path: &Path,
    ) -> Result<(), RuntimeError> {
        let source = format!("{}:{}", container, container_path);
        let target = local_path.display().to_string();
        self.exec(&owned(&["cp", &source, &target])).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Mount;
    use std::path::PathBuf;

    #[test]
    fn run_args_follow_docker_cli_order() {
        let spec = ContainerSpec::new("quay.io/coreos/etcd:v3.5.7")
            .name("etcd")
            .network("host")
            .detached()
            .mount(Mount::volume("etcd-data", "/etcd-data"))
            .command(["/usr/local/bin/etcd", "--data-dir=/etcd-data"]);

        assert_eq!(
            run_args(&spec),
            owned(&[
                "run",
                "-d",
                "--name",
                "etcd",
                "--network",
                "host",
                "-v",
                "etcd-data:/etcd-data",
                "quay.io/coreos/etcd:v3.5.7",
                "/usr/local/bin/etcd",
                "--data-dir=/etcd-data",
            ])
        );
    }

    #[test]
    fn run_args_for_one_shot_helper() {
        let spec = ContainerSpec::new("alpine")
            .auto_remove()
            .mount(Mount::bind(&PathBuf::from("/tmp/stage"), "/tmp/certs").read_only())
            .command(["sh", "-c", "cp /tmp/certs/* /certs/"]);

        let args = run_args(&spec);
        assert_eq!(&args[..2], &owned(&["run", "--rm"])[..]);
        assert!(args.contains(&"/tmp/stage:/tmp/certs:ro".to_string()));
        assert!(!args.contains(&"-d".to_string()));
    }

    #[test]
    fn absence_is_recognised_for_idempotent_removal() {
        let gone = RuntimeError {
            command: "docker volume rm data".to_string(),
            stderr: "Error response from daemon: get data: no such volume".to_string(),
        };
        let busy = RuntimeError {
            command: "docker volume rm data".to_string(),
            stderr: "Error response from daemon: remove data: volume is in use".to_string(),
        };
        assert!(is_absent(&gone));
        assert!(!is_absent(&busy));
    }

    #[test]
    fn missing_binary_reports_command() {
        let mut docker = DockerCli::new("/nonexistent/docker-binary");
        let err = docker.pull_image("alpine").unwrap_err();
        assert!(err.command.contains("pull alpine"));
    }
}
