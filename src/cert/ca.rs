use super::{
    codec,
    generator::{create_certificate, generate_key_pair},
    types::{
        CertificateTemplate, CredentialPaths, Curve, KeyPair, SerialNumber, SignedCertificate,
        CERTIFICATE_TAG, EC_PRIVATE_KEY_TAG,
    },
};
use crate::error::{Error, Result};
use crate::utils::logging::Logger;
use crate::utils::network::parse_host_address;
use chrono::Utc;
use std::{fs, path::Path};

/// Issues a self-signed CA and a client certificate signed by it into
/// `output_dir` as `ca.crt`, `ca.key`, `client.crt` and `client.key`.
///
/// Stops at the first failure and leaves whatever was already written;
/// re-issuing means starting over in a fresh directory.
pub fn issue_ca(
    output_dir: &Path,
    host_address: &str,
    logger: &mut dyn Logger,
) -> Result<CredentialPaths> {
    let host = parse_host_address(host_address)?;
    let paths = CredentialPaths::in_dir(output_dir);

    fs::create_dir_all(output_dir)
        .map_err(|e| Error::io(format!("failed to create {}", output_dir.display()), e))?;

    logger.log("Generating self-signed CA certificate...");
    let ca_key = generate_key_pair(Curve::P256)?;
    logger.debug_log(&format!("CA key generated on {:?}", ca_key.curve));
    let ca_template = CertificateTemplate::certificate_authority(host, Utc::now());
    let ca_private = ca_key.private_key()?;
    let ca_cert = create_certificate(&ca_template, &ca_template, None, &ca_private, &ca_private)?;
    write_certificate(&paths.ca_cert, &ca_cert)?;
    write_private_key(&paths.ca_key, &ca_key)?;
    logger.debug_log(&format!("CA certificate written to {}", paths.ca_cert.display()));

    logger.log("Generating client certificate signed by the CA...");
    let client_key = generate_key_pair(Curve::P256)?;
    let issued_at = Utc::now();
    let serial = SerialNumber::for_leaf(issued_at, random_u32()?);
    let client_template = CertificateTemplate::client(host, issued_at, serial);
    let client_public = client_key.public_key()?;
    let client_cert = create_certificate(
        &client_template,
        &ca_template,
        Some(&ca_cert),
        &client_public,
        &ca_private,
    )?;
    write_certificate(&paths.client_cert, &client_cert)?;
    write_private_key(&paths.client_key, &client_key)?;
    logger.debug_log(&format!(
        "Client certificate (serial {:#x}) written to {}",
        serial.0,
        paths.client_cert.display()
    ));

    logger.log(&format!(
        "CA and client certificates generated successfully:\n- CA Cert: {}\n- Client Cert: {}",
        paths.ca_cert.display(),
        paths.client_cert.display()
    ));
    Ok(paths)
}

fn random_u32() -> Result<u32> {
    let mut buf = [0u8; 4];
    openssl::rand::rand_bytes(&mut buf).map_err(Error::Entropy)?;
    Ok(u32::from_be_bytes(buf))
}

fn write_certificate(path: &Path, cert: &SignedCertificate) -> Result<()> {
    let text = codec::encode(CERTIFICATE_TAG, &cert.to_der()?);
    fs::write(path, text)
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))
}

fn write_private_key(path: &Path, key: &KeyPair) -> Result<()> {
    let text = codec::encode(EC_PRIVATE_KEY_TAG, &key.to_sec1_der()?);
    fs::write(path, text)
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))?;

    // Set proper permissions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::io(format!("failed to restrict {}", path.display()), e))?;
    }

    Ok(())
}
