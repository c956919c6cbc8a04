// cert/types.rs
use chrono::{DateTime, Duration, Utc};
use openssl::ec::EcKey;
use openssl::nid::Nid;
use openssl::pkey::Private;
use openssl::x509::{X509Ref, X509};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
pub const EC_PRIVATE_KEY_TAG: &str = "EC PRIVATE KEY";

pub const VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    #[default]
    P256,
}

impl Curve {
    pub fn nid(self) -> Nid {
        match self {
            Curve::P256 => Nid::X9_62_PRIME256V1,
        }
    }
}

/// An EC key pair. The private half only ever leaves memory as an encoded key file.
pub struct KeyPair {
    pub curve: Curve,
    pub key: EcKey<Private>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialNumber(pub u64);

impl SerialNumber {
    pub const CA: SerialNumber = SerialNumber(1);

    /// Issuance time in the high 32 bits, random low bits so two leaves
    /// issued within the same second never share a serial.
    pub fn for_leaf(issued_at: DateTime<Utc>, random: u32) -> Self {
        let seconds = issued_at.timestamp().max(0) as u64 & 0xFFFF_FFFF;
        SerialNumber((seconds << 32) | u64::from(random))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub organization: String,
    pub common_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsage {
    pub cert_sign: bool,
    pub digital_signature: bool,
    pub key_encipherment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsage {
    ClientAuth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub serial: SerialNumber,
    pub subject: Subject,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<ExtendedKeyUsage>,
    pub ip_addresses: Vec<IpAddr>,
}

impl CertificateTemplate {
    pub fn certificate_authority(host: IpAddr, issued_at: DateTime<Utc>) -> Self {
        Self {
            serial: SerialNumber::CA,
            subject: Subject {
                organization: "Kubernetes".to_string(),
                common_name: "Kubernetes CA".to_string(),
            },
            not_before: issued_at,
            not_after: issued_at + Duration::days(VALIDITY_DAYS),
            is_ca: true,
            key_usage: KeyUsage {
                cert_sign: true,
                digital_signature: true,
                key_encipherment: false,
            },
            extended_key_usage: Vec::new(),
            ip_addresses: vec![host],
        }
    }

    pub fn client(host: IpAddr, issued_at: DateTime<Utc>, serial: SerialNumber) -> Self {
        Self {
            serial,
            subject: Subject {
                organization: "Kubernetes".to_string(),
                common_name: "Kubernetes Client".to_string(),
            },
            not_before: issued_at,
            not_after: issued_at + Duration::days(VALIDITY_DAYS),
            is_ca: false,
            key_usage: KeyUsage {
                cert_sign: false,
                digital_signature: true,
                key_encipherment: true,
            },
            extended_key_usage: vec![ExtendedKeyUsage::ClientAuth],
            ip_addresses: vec![host],
        }
    }
}

/// A signed certificate as produced by the generator. Immutable once built.
#[derive(Clone)]
pub struct SignedCertificate {
    pub(crate) x509: X509,
}

impl SignedCertificate {
    pub fn x509(&self) -> &X509Ref {
        &self.x509
    }
}

/// Locations of the four credential files inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub ca_cert: PathBuf,
    pub ca_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl CredentialPaths {
    pub const CA_CERT: &'static str = "ca.crt";
    pub const CA_KEY: &'static str = "ca.key";
    pub const CLIENT_CERT: &'static str = "client.crt";
    pub const CLIENT_KEY: &'static str = "client.key";

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            ca_cert: dir.join(Self::CA_CERT),
            ca_key: dir.join(Self::CA_KEY),
            client_cert: dir.join(Self::CLIENT_CERT),
            client_key: dir.join(Self::CLIENT_KEY),
        }
    }
}
