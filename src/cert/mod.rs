// src/cert/mod.rs
mod ca;
mod codec;
mod generator;
mod info;
mod types;
pub mod verification;

pub use ca::issue_ca;
pub use info::CertificateInfo;
pub use types::CredentialPaths;
