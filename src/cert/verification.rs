// src/cert/verification.rs
use super::codec;
use super::types::{CredentialPaths, CERTIFICATE_TAG};
use crate::error::{Error, Result};
use crate::utils::logging::Logger;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509StoreContext, X509};
use std::{fs, path::Path};

pub fn load_certificate(path: &Path) -> Result<X509> {
    let text = fs::read(path)
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
    let der = codec::decode_expecting(&text, CERTIFICATE_TAG)?;
    X509::from_der(&der)
        .map_err(|e| Error::crypto(format!("failed to parse {}", path.display()), e))
}

/// True when the certificate's signature checks out against its own public key.
pub fn verify_self_signed(cert_path: &Path) -> Result<bool> {
    let cert = load_certificate(cert_path)?;
    let key = cert
        .public_key()
        .map_err(|e| Error::crypto("failed to read certificate public key", e))?;
    cert.verify(&key)
        .map_err(|e| Error::crypto("failed to verify certificate signature", e))
}

/// True when `cert_path` chains to `ca_path` used as the only trust anchor.
pub fn verify_chain(cert_path: &Path, ca_path: &Path) -> Result<bool> {
    let cert = load_certificate(cert_path)?;
    let ca = load_certificate(ca_path)?;

    let verify = || -> std::result::Result<bool, openssl::error::ErrorStack> {
        let mut store = X509StoreBuilder::new()?;
        store.add_cert(ca)?;
        let store = store.build();
        let chain = Stack::<X509>::new()?;
        let mut context = X509StoreContext::new()?;
        context.init(&store, &cert, &chain, |c| c.verify_cert())
    };

    verify().map_err(|e| Error::crypto("failed to run chain verification", e))
}

/// Checks an issued credential directory and reports the outcome through `logger`.
pub fn verify_bundle(paths: &CredentialPaths, logger: &mut dyn Logger) -> Result<bool> {
    logger.debug_log(&format!("Verifying CA: {}", paths.ca_cert.display()));
    let ca_ok = verify_self_signed(&paths.ca_cert)?;
    if !ca_ok {
        logger.log("CA certificate signature does not verify against its own key");
    }

    logger.debug_log(&format!(
        "Verifying {} against {}",
        paths.client_cert.display(),
        paths.ca_cert.display()
    ));
    let chain_ok = verify_chain(&paths.client_cert, &paths.ca_cert)?;
    if !chain_ok {
        logger.log("Client certificate chain verification failed");
    }

    Ok(ca_ok && chain_ok)
}

/// [`verify_bundle`], but a bundle that does not verify is an error.
pub fn require_valid_bundle(paths: &CredentialPaths, logger: &mut dyn Logger) -> Result<()> {
    if verify_bundle(paths, logger)? {
        Ok(())
    } else {
        Err(Error::ChainInvalid {
            cert: paths.client_cert.clone(),
            ca: paths.ca_cert.clone(),
        })
    }
}
