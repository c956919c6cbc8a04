// src/etcd/start.rs
use super::relocate::{relocate, VolumeTarget};
use super::restore::ETCD_DATA_DIR;
use crate::cert::{issue_ca, CredentialPaths};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::kubeconfig::{export_kubeconfig, server_url, ArtifactSource};
use crate::runtime::{ContainerRuntime, ContainerSpec, Mount};
use crate::utils::logging::Logger;
use crate::utils::network::{detect_host_address, parse_host_address};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

const HOST_NETWORK: &str = "host";
const ENCRYPTION_CONFIG_MOUNT: &str = "/etc/kubernetes/encryption-config.json";
const ETCD_LOCAL_ENDPOINT: &str = "http://127.0.0.1:2379";
const SERVICE_ACCOUNT_ISSUER: &str = "https://kubernetes.default.svc.cluster.local";

#[derive(Debug, Default, Clone)]
pub struct StartOptions {
    /// Address advertised by etcd and the API server; detected when absent.
    pub host_ip: Option<String>,
    /// Where to write a kubeconfig once the API server is running.
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Started {
    pub host: IpAddr,
    pub server: String,
}

/// Starts etcd over the restored volume, then an API server in front of it
/// with freshly issued certificates.
pub fn start(
    runtime: &mut dyn ContainerRuntime,
    config: &SessionConfig,
    options: &StartOptions,
    logger: &mut dyn Logger,
) -> Result<Started> {
    let encryption_config = config.encryption_config_path();
    if !encryption_config.is_file() {
        return Err(Error::InputNotFound {
            what: "encryption configuration",
            path: encryption_config,
        });
    }
    let encryption_config = encryption_config
        .canonicalize()
        .map_err(|e| Error::io(format!("failed to resolve {}", encryption_config.display()), e))?;

    let host = match &options.host_ip {
        Some(address) => parse_host_address(address)?,
        None => detect_host_address(logger)?,
    };
    logger.log(&format!("Using host address {}", host));

    start_etcd_server(runtime, config, host, logger)?;
    start_kube_apiserver(runtime, config, host, &encryption_config, logger)?;

    let server = server_url(host, config.secure_port);
    if let Some(output) = &options.kubeconfig {
        let source = ArtifactSource::Container {
            name: config.apiserver_container.clone(),
            cert_dir: config.cert_mount_dir.clone(),
        };
        export_kubeconfig(runtime, &server, &source, output, logger)?;
    }

    logger.log(&format!("Kube-apiserver is reachable at {}", server));
    Ok(Started { host, server })
}

pub fn start_etcd_server(
    runtime: &mut dyn ContainerRuntime,
    config: &SessionConfig,
    host: IpAddr,
    logger: &mut dyn Logger,
) -> Result<()> {
    logger.log(&format!(
        "Removing existing etcd container: {} (if running)...",
        config.etcd_container
    ));
    runtime
        .remove_container(&config.etcd_container)
        .map_err(|e| Error::process("failed to remove existing etcd container", e))?;

    logger.log(&format!(
        "Starting etcd server using Docker volume: {}...",
        config.etcd_volume
    ));
    let spec = ContainerSpec::new(&config.etcd_image)
        .name(&config.etcd_container)
        .detached()
        .network(HOST_NETWORK)
        .mount(Mount::volume(&config.etcd_volume, ETCD_DATA_DIR))
        .command(etcd_args(host));
    logger.debug_log(&format!("Executing: {}", spec));

    let output = runtime
        .run_container(&spec)
        .map_err(|e| Error::process("failed to start etcd server", e))?;
    logger.debug_log(&format!("Container id: {}", output.trim()));

    logger.log("Etcd server started successfully and is listening on host ports.");
    Ok(())
}

pub fn start_kube_apiserver(
    runtime: &mut dyn ContainerRuntime,
    config: &SessionConfig,
    host: IpAddr,
    encryption_config: &Path,
    logger: &mut dyn Logger,
) -> Result<()> {
    logger.log(&format!(
        "Removing existing kube-apiserver container: {} (if running)...",
        config.apiserver_container
    ));
    runtime
        .remove_container(&config.apiserver_container)
        .map_err(|e| Error::process("failed to remove existing kube-apiserver container", e))?;

    logger.log(&format!(
        "Creating Docker volume for certificates: {}...",
        config.cert_volume
    ));
    runtime
        .create_volume(&config.cert_volume)
        .map_err(|e| Error::process("failed to create Docker volume", e))?;

    // Staging dir lives until relocation has finished
    let staging = tempfile::Builder::new()
        .prefix("apiserver-certs")
        .tempdir()
        .map_err(|e| Error::io("failed to create temporary directory", e))?;
    issue_ca(staging.path(), &host.to_string(), logger)?;
    relocate(
        runtime,
        staging.path(),
        &VolumeTarget {
            volume: config.cert_volume.clone(),
            mount_path: config.cert_mount_dir.clone(),
        },
        &config.helper_image,
        logger,
    )?;

    logger.log(&format!(
        "Starting kube-apiserver container: {}...",
        config.apiserver_container
    ));
    let spec = ContainerSpec::new(&config.apiserver_image)
        .name(&config.apiserver_container)
        .detached()
        .network(HOST_NETWORK)
        .mount(Mount::volume(&config.cert_volume, &config.cert_mount_dir))
        .mount(Mount::bind(encryption_config, ENCRYPTION_CONFIG_MOUNT).read_only())
        .command(apiserver_args(config, host));
    logger.debug_log(&format!("Executing: {}", spec));

    runtime
        .run_container(&spec)
        .map_err(|e| Error::process("failed to start kube-apiserver", e))?;

    logger.log(&format!(
        "Kube-apiserver started successfully and is listening on port {}.",
        config.secure_port
    ));
    Ok(())
}

fn etcd_args(host: IpAddr) -> Vec<String> {
    vec![
        "/usr/local/bin/etcd".to_string(),
        "--name=restored-etcd".to_string(),
        format!("--data-dir={}", ETCD_DATA_DIR),
        format!(
            "--advertise-client-urls={},http://{}:2379",
            ETCD_LOCAL_ENDPOINT,
            url_host(host)
        ),
        "--listen-client-urls=http://0.0.0.0:2379".to_string(),
        "--listen-peer-urls=http://0.0.0.0:2380".to_string(),
    ]
}

fn apiserver_args(config: &SessionConfig, host: IpAddr) -> Vec<String> {
    let cert_dir = Path::new(&config.cert_mount_dir);
    let in_volume = CredentialPaths::in_dir(cert_dir);
    let ca_cert = in_volume.ca_cert.display().to_string();
    let ca_key = in_volume.ca_key.display().to_string();

    vec![
        "/usr/local/bin/kube-apiserver".to_string(),
        format!("--etcd-servers={}", ETCD_LOCAL_ENDPOINT),
        format!(
            "--service-cluster-ip-range={}",
            config.service_cluster_ip_range
        ),
        "--allow-privileged=true".to_string(),
        "--anonymous-auth=true".to_string(),
        format!("--advertise-address={}", host),
        format!("--secure-port={}", config.secure_port),
        format!("--service-account-signing-key-file={}", ca_key),
        format!("--service-account-issuer={}", SERVICE_ACCOUNT_ISSUER),
        format!("--service-account-key-file={}", ca_cert),
        format!("--tls-cert-file={}", ca_cert),
        format!("--tls-private-key-file={}", ca_key),
        format!("--client-ca-file={}", ca_cert),
        format!("--encryption-provider-config={}", ENCRYPTION_CONFIG_MOUNT),
        "--v=2".to_string(),
    ]
}

fn url_host(host: IpAddr) -> String {
    match host {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}
