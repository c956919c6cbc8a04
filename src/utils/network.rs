// src/utils/network.rs
use crate::error::{Error, Result};
use crate::runtime::RuntimeError;
use crate::utils::logging::Logger;
use std::net::IpAddr;
use std::process::Command;

/// Parses an operator-supplied address into an IP literal suitable for a SAN entry.
pub fn parse_host_address(address: &str) -> Result<IpAddr> {
    address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| Error::InvalidHostAddress(address.to_string()))
}

/// Resolves the primary address of this host from `hostname -I`.
pub fn detect_host_address(logger: &mut dyn Logger) -> Result<IpAddr> {
    logger.debug_log("Resolving host address with `hostname -I`");

    let output = Command::new("hostname")
        .arg("-I")
        .output()
        .map_err(|e| Error::io("failed to execute hostname -I", e))?;

    if !output.status.success() {
        return Err(Error::process(
            "failed to resolve host IP address",
            RuntimeError {
                command: "hostname -I".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    first_address(&stdout)
}

fn first_address(hostname_output: &str) -> Result<IpAddr> {
    let first = hostname_output.split_whitespace().next().ok_or_else(|| {
        Error::InvalidHostAddress("no IP addresses found in hostname -I output".to_string())
    })?;
    parse_host_address(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipv4_and_ipv6_literals() {
        assert_eq!(
            parse_host_address("10.0.0.5").unwrap(),
            "10.0.0.5".parse::<IpAddr>().unwrap()
        );
        assert!(parse_host_address(" fd00::1 ").unwrap().is_ipv6());
    }

    #[test]
    fn rejects_hostnames_and_garbage() {
        for bad in ["", "localhost", "10.0.0", "10.0.0.256", "not an ip"] {
            match parse_host_address(bad) {
                Err(Error::InvalidHostAddress(value)) => assert_eq!(value, bad),
                other => panic!("expected InvalidHostAddress for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn picks_first_address_from_hostname_output() {
        let ip = first_address("192.168.1.20 172.17.0.1 fd00::20 \n").unwrap();
        assert_eq!(ip, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert!(first_address("   \n").is_err());
    }
}
