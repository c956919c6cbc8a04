// src/error.rs
use openssl::error::ErrorStack;
use std::io;
use std::path::PathBuf;

use crate::runtime::RuntimeError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{what} not found: {}", path.display())]
    InputNotFound { what: &'static str, path: PathBuf },

    #[error("{context}: {source}")]
    ExternalProcess {
        context: String,
        source: RuntimeError,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{artifact} is unavailable: {reason}")]
    ArtifactUnavailable { artifact: String, reason: String },

    #[error("failed to generate key pair: {0}")]
    Entropy(#[source] ErrorStack),

    #[error("invalid host address: {0:?}")]
    InvalidHostAddress(String),

    #[error("{context}: {source}")]
    Crypto {
        context: String,
        source: ErrorStack,
    },

    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },

    #[error("{} does not verify against {}", cert.display(), ca.display())]
    ChainInvalid { cert: PathBuf, ca: PathBuf },

    #[error("invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    #[error("failed to serialize {what}: {reason}")]
    Serialization { what: &'static str, reason: String },
}

impl Error {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn crypto(context: impl Into<String>, source: ErrorStack) -> Self {
        Error::Crypto {
            context: context.into(),
            source,
        }
    }

    pub fn process(context: impl Into<String>, source: RuntimeError) -> Self {
        Error::ExternalProcess {
            context: context.into(),
            source,
        }
    }
}
