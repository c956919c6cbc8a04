// src/main.rs
mod cert;
mod config;
mod error;
mod etcd;
mod kubeconfig;
mod runtime;
mod utils;

use cert::verification::{require_valid_bundle, verify_bundle};
use cert::{issue_ca, CertificateInfo, CredentialPaths};
use clap::{Parser, Subcommand};
use config::SessionConfig;
use error::{Error, Result};
use etcd::StartOptions;
use kubeconfig::{export_kubeconfig, server_url, ArtifactSource, EncryptionConfigGenerator};
use runtime::DockerCli;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use utils::logging::{ConsoleLogger, FileLogger, Logger, MultiLogger};
use utils::network::{detect_host_address, parse_host_address};

#[derive(Parser)]
#[command(about = "Inspect an etcd snapshot through a throwaway kube-apiserver")]
pub struct Args {
    #[arg(short, long, default_value = "session.json")]
    pub config: PathBuf,
    #[arg(short, long)]
    pub debug: bool,
    /// Also append log lines to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Restore a snapshot file into the etcd data volume.
    Restore { snapshot: PathBuf },
    /// Start etcd and kube-apiserver over the restored data.
    Start {
        #[arg(long)]
        host_ip: Option<String>,
        /// Write a kubeconfig here once the API server is up.
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
    },
    /// Remove the containers and volumes.
    Cleanup,
    /// Write a kubeconfig for the running API server.
    Kubeconfig {
        #[arg(short, long, default_value = "kubeconfig")]
        output: PathBuf,
        /// Server URL; defaults to https://<host-ip>:<secure_port>.
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        host_ip: Option<String>,
        /// Read the credentials from a local directory instead of the container.
        #[arg(long)]
        from_dir: Option<PathBuf>,
    },
    /// Issue a CA and client certificate into a local directory.
    IssueCerts {
        #[arg(short, long, default_value = "certs")]
        output_dir: PathBuf,
        #[arg(long)]
        host_ip: String,
    },
    /// Summarize and verify the certificates in a directory.
    Inspect {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write an EncryptionConfiguration with a fresh aescbc key.
    InitEncryption {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the effective session configuration to the --config path.
    InitConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut loggers: Vec<Box<dyn Logger>> = vec![Box::new(ConsoleLogger::new(args.debug))];
    if let Some(path) = &args.log_file {
        match FileLogger::new(path, args.debug) {
            Ok(file_logger) => loggers.push(Box::new(file_logger)),
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }
    let mut logger = MultiLogger::new(loggers);

    match run(args, &mut logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.debug_log(&format!("{:?}", err));
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, logger: &mut dyn Logger) -> Result<()> {
    let config = SessionConfig::load_or_default(&args.config)
        .map_err(|e| Error::io(format!("failed to load {}", args.config.display()), e))?;
    config
        .validate()
        .map_err(|e| Error::io(format!("invalid session config {}", args.config.display()), e))?;
    let mut docker = DockerCli::new(&config.docker_binary);

    match args.command {
        Command::Restore { snapshot } => {
            etcd::restore_snapshot(&mut docker, &config, &snapshot, logger)
        }
        Command::Start { host_ip, kubeconfig } => {
            let options = StartOptions {
                host_ip,
                kubeconfig,
            };
            let started = etcd::start(&mut docker, &config, &options, logger)?;
            if options.kubeconfig.is_none() {
                logger.log(&format!(
                    "Fetch credentials for {} with: kubeconfig --host-ip {}",
                    started.server, started.host
                ));
            }
            Ok(())
        }
        Command::Cleanup => etcd::cleanup(&mut docker, &config, logger),
        Command::Kubeconfig {
            output,
            server,
            host_ip,
            from_dir,
        } => {
            let server = match server {
                Some(server) => server,
                None => {
                    let host = match host_ip {
                        Some(address) => parse_host_address(&address)?,
                        None => detect_host_address(logger)?,
                    };
                    server_url(host, config.secure_port)
                }
            };
            let source = match from_dir {
                Some(dir) => ArtifactSource::Directory(dir),
                None => ArtifactSource::Container {
                    name: config.apiserver_container.clone(),
                    cert_dir: config.cert_mount_dir.clone(),
                },
            };
            export_kubeconfig(&mut docker, &server, &source, &output, logger).map(|_| ())
        }
        Command::IssueCerts {
            output_dir,
            host_ip,
        } => {
            let paths = issue_ca(&output_dir, &host_ip, logger)?;
            require_valid_bundle(&paths, logger)?;
            logger.log(&format!("Certificates written to {}", output_dir.display()));
            Ok(())
        }
        Command::Inspect { dir, json } => inspect(&dir, json, logger),
        Command::InitEncryption { output } => {
            let output = output.unwrap_or_else(|| config.encryption_config_path());
            EncryptionConfigGenerator::new(output).generate_config(logger)
        }
        Command::InitConfig => {
            config
                .save_to_file(&args.config)
                .map_err(|e| Error::io(format!("failed to write {}", args.config.display()), e))?;
            logger.log(&format!("Session config written to {}", args.config.display()));
            Ok(())
        }
    }
}

/// Prints a summary of the bundle in `dir`; fails when the chain does not verify.
fn inspect(dir: &Path, json: bool, logger: &mut dyn Logger) -> Result<()> {
    let paths = CredentialPaths::in_dir(dir);
    let certificates = [
        CertificateInfo::from_file(&paths.ca_cert)?,
        CertificateInfo::from_file(&paths.client_cert)?,
    ];
    let chain_ok = verify_bundle(&paths, logger)?;

    if json {
        let report = serde_json::json!({
            "certificates": certificates,
            "chain_valid": chain_ok,
        });
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| Error::Serialization {
            what: "inspection report",
            reason: e.to_string(),
        })?;
        println!("{}", rendered);
    } else {
        for info in &certificates {
            println!("{}\n", info);
        }
        println!(
            "Chain verification: {}",
            if chain_ok { "OK" } else { "FAILED" }
        );
    }

    if !chain_ok {
        return Err(Error::ChainInvalid {
            cert: paths.client_cert,
            ca: paths.ca_cert,
        });
    }
    Ok(())
}
