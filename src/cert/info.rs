// src/cert/info.rs
use super::codec;
use super::types::CERTIFICATE_TAG;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use x509_parser::prelude::{FromDer, GeneralName, ParsedExtension, X509Certificate};

/// Summary of one PEM certificate on disk.
#[derive(Debug, Serialize, Clone)]
pub struct CertificateInfo {
    pub path: PathBuf,
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub serial: String,
    pub fingerprint: String,
    pub is_ca: bool,
    pub ip_addresses: Vec<IpAddr>,
}

fn timestamp(seconds: i64, what: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| Error::MalformedInput(format!("invalid {} timestamp", what)))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

impl CertificateInfo {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        let der = codec::decode_expecting(&text, CERTIFICATE_TAG)?;
        Self::from_der(path, &der)
    }

    pub fn from_der(path: &Path, der: &[u8]) -> Result<Self> {
        let (_remainder, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::MalformedInput(format!("{}: {}", path.display(), e)))?;

        let mut is_ca = false;
        let mut ip_addresses = Vec::new();
        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
                ParsedExtension::SubjectAlternativeName(san) => {
                    ip_addresses.extend(san.general_names.iter().filter_map(|name| match name {
                        GeneralName::IPAddress(bytes) => ip_from_bytes(bytes),
                        _ => None,
                    }));
                }
                _ => {}
            }
        }

        let fingerprint = openssl::hash::hash(openssl::hash::MessageDigest::sha256(), der)
            .map_err(|e| Error::crypto("failed to fingerprint certificate", e))?;

        Ok(CertificateInfo {
            path: path.to_path_buf(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before: timestamp(cert.validity().not_before.timestamp(), "not_before")?,
            not_after: timestamp(cert.validity().not_after.timestamp(), "not_after")?,
            serial: hex::encode(cert.raw_serial()),
            fingerprint: hex::encode(fingerprint),
            is_ca,
            ip_addresses,
        })
    }
}

impl fmt::Display for CertificateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ips: Vec<String> = self.ip_addresses.iter().map(|ip| ip.to_string()).collect();
        writeln!(f, "{}", self.path.display())?;
        writeln!(f, "  subject:     {}", self.subject)?;
        writeln!(f, "  issuer:      {}", self.issuer)?;
        writeln!(f, "  serial:      {}", self.serial)?;
        writeln!(f, "  not before:  {}", self.not_before.to_rfc3339())?;
        writeln!(f, "  not after:   {}", self.not_after.to_rfc3339())?;
        writeln!(f, "  CA:          {}", self.is_ca)?;
        writeln!(f, "  IP SANs:     {}", ips.join(", "))?;
        write!(f, "  sha256:      {}", self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_address_families() {
        assert_eq!(
            ip_from_bytes(&[10, 0, 0, 5]),
            Some("10.0.0.5".parse().unwrap())
        );
        let mut v6 = [0u8; 16];
        v6[0] = 0xfd;
        v6[15] = 1;
        assert_eq!(ip_from_bytes(&v6), Some("fd00::1".parse().unwrap()));
        assert_eq!(ip_from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn rejects_garbage_der() {
        let err = CertificateInfo::from_der(Path::new("bogus.crt"), b"not der").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(msg) if msg.contains("bogus.crt")));
    }
}
