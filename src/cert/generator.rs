// src/cert/generator.rs
use super::types::{
    CertificateTemplate, Curve, ExtendedKeyUsage, KeyPair, SignedCertificate, Subject,
};
use crate::error::{Error, Result};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private, Public};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage as ExtendedKeyUsageExt,
    KeyUsage as KeyUsageExt, SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509Ref, X509};

/// Generates a fresh key pair on `curve`. Failure means the entropy source
/// or the curve setup is broken and is never worth retrying.
pub fn generate_key_pair(curve: Curve) -> Result<KeyPair> {
    let group = EcGroup::from_curve_name(curve.nid()).map_err(Error::Entropy)?;
    let key = EcKey::generate(&group).map_err(Error::Entropy)?;
    Ok(KeyPair { curve, key })
}

impl KeyPair {
    pub fn private_key(&self) -> Result<PKey<Private>> {
        PKey::from_ec_key(self.key.clone())
            .map_err(|e| Error::crypto("failed to wrap private key", e))
    }

    pub fn public_key(&self) -> Result<PKey<Public>> {
        EcKey::from_public_key(self.key.group(), self.key.public_key())
            .and_then(PKey::from_ec_key)
            .map_err(|e| Error::crypto("failed to extract public key", e))
    }

    /// SEC 1 `ECPrivateKey` DER, the payload of an `EC PRIVATE KEY` block.
    pub fn to_sec1_der(&self) -> Result<Vec<u8>> {
        self.key
            .private_key_to_der()
            .map_err(|e| Error::crypto("failed to marshal private key", e))
    }
}

impl SignedCertificate {
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.x509
            .to_der()
            .map_err(|e| Error::crypto("failed to encode certificate", e))
    }
}

/// Signs `template` for `subject_key` as `issuer` using `issuer_key`.
///
/// For a self-signed certificate pass the same template twice, the key
/// pair's own private key and no issuer certificate. When `issuer_cert` is
/// given the result carries an authority key identifier taken from it.
/// Whether `issuer_key` actually belongs to `issuer` is not checked here.
pub fn create_certificate<T: HasPublic>(
    template: &CertificateTemplate,
    issuer: &CertificateTemplate,
    issuer_cert: Option<&SignedCertificate>,
    subject_key: &PKeyRef<T>,
    issuer_key: &PKeyRef<Private>,
) -> Result<SignedCertificate> {
    let issuer_cert = issuer_cert.map(SignedCertificate::x509);
    build_certificate(template, issuer, issuer_cert, subject_key, issuer_key)
        .map(|x509| SignedCertificate { x509 })
        .map_err(|e| {
            Error::crypto(
                format!(
                    "failed to create certificate for {}",
                    template.subject.common_name
                ),
                e,
            )
        })
}

fn x509_name(subject: &Subject) -> std::result::Result<X509Name, ErrorStack> {
    let mut builder = X509NameBuilder::new()?;
    builder.append_entry_by_nid(Nid::ORGANIZATIONNAME, &subject.organization)?;
    builder.append_entry_by_nid(Nid::COMMONNAME, &subject.common_name)?;
    Ok(builder.build())
}

fn build_certificate<T: HasPublic>(
    template: &CertificateTemplate,
    issuer: &CertificateTemplate,
    issuer_cert: Option<&X509Ref>,
    subject_key: &PKeyRef<T>,
    issuer_key: &PKeyRef<Private>,
) -> std::result::Result<X509, ErrorStack> {
    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;

    let serial = BigNum::from_slice(&template.serial.0.to_be_bytes())?.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;
    let subject_name = x509_name(&template.subject)?;
    builder.set_subject_name(&subject_name)?;
    let issuer_name = x509_name(&issuer.subject)?;
    builder.set_issuer_name(&issuer_name)?;
    builder.set_pubkey(subject_key)?;
    let not_before = Asn1Time::from_unix(template.not_before.timestamp())?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::from_unix(template.not_after.timestamp())?;
    builder.set_not_after(&not_after)?;

    if template.is_ca {
        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
        builder.append_extension(ski)?;
    }

    if let Some(issuer_cert) = issuer_cert {
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(issuer_cert), None))?;
        builder.append_extension(aki)?;
    }

    let mut usage = KeyUsageExt::new();
    usage.critical();
    if template.key_usage.cert_sign {
        usage.key_cert_sign();
    }
    if template.key_usage.digital_signature {
        usage.digital_signature();
    }
    if template.key_usage.key_encipherment {
        usage.key_encipherment();
    }
    builder.append_extension(usage.build()?)?;

    if !template.extended_key_usage.is_empty() {
        let mut eku = ExtendedKeyUsageExt::new();
        for purpose in &template.extended_key_usage {
            match purpose {
                ExtendedKeyUsage::ClientAuth => eku.client_auth(),
            };
        }
        builder.append_extension(eku.build()?)?;
    }

    if !template.ip_addresses.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for ip in &template.ip_addresses {
            san.ip(&ip.to_string());
        }
        let san = san.build(&builder.x509v3_context(None, None))?;
        builder.append_extension(san)?;
    }

    builder.sign(issuer_key, MessageDigest::sha256())?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::types::SerialNumber;
    use chrono::Utc;
    use std::net::IpAddr;

    fn host() -> IpAddr {
        "10.0.0.5".parse().unwrap()
    }

    fn self_signed_ca(pair: &KeyPair) -> (CertificateTemplate, SignedCertificate) {
        let template = CertificateTemplate::certificate_authority(host(), Utc::now());
        let private = pair.private_key().unwrap();
        let cert = create_certificate(&template, &template, None, &private, &private).unwrap();
        (template, cert)
    }

    #[test]
    fn generates_keys_on_the_requested_curve() {
        let pair = generate_key_pair(Curve::P256).unwrap();
        assert_eq!(pair.curve, Curve::P256);
        assert_eq!(pair.key.group().curve_name(), Some(Nid::X9_62_PRIME256V1));
        assert!(pair.key.check_key().is_ok());
    }

    #[test]
    fn sec1_der_parses_back_to_the_same_key() {
        let pair = generate_key_pair(Curve::P256).unwrap();
        let der = pair.to_sec1_der().unwrap();
        let parsed = EcKey::private_key_from_der(&der).unwrap();
        assert_eq!(parsed.private_key().to_vec(), pair.key.private_key().to_vec());
    }

    #[test]
    fn self_signed_ca_verifies_against_its_own_key() {
        let pair = generate_key_pair(Curve::P256).unwrap();
        let (_, ca) = self_signed_ca(&pair);

        let x509 = ca.x509();
        assert_eq!(
            x509.issuer_name().to_der().unwrap(),
            x509.subject_name().to_der().unwrap()
        );
        assert!(x509.verify(&pair.public_key().unwrap()).unwrap());
    }

    #[test]
    fn leaf_is_issued_by_the_ca_subject() {
        let ca_pair = generate_key_pair(Curve::P256).unwrap();
        let (ca_template, ca) = self_signed_ca(&ca_pair);

        let leaf_pair = generate_key_pair(Curve::P256).unwrap();
        let leaf_template =
            CertificateTemplate::client(host(), Utc::now(), SerialNumber(0xABCD_0001));
        let leaf = create_certificate(
            &leaf_template,
            &ca_template,
            Some(&ca),
            &leaf_pair.public_key().unwrap(),
            &ca_pair.private_key().unwrap(),
        )
        .unwrap();

        assert_eq!(
            leaf.x509().issuer_name().to_der().unwrap(),
            ca.x509().subject_name().to_der().unwrap()
        );
        assert!(leaf.x509().verify(&ca_pair.public_key().unwrap()).unwrap());
        assert!(!leaf.x509().verify(&leaf_pair.public_key().unwrap()).unwrap());
        assert_eq!(
            leaf.x509().serial_number().to_bn().unwrap(),
            BigNum::from_u32(0xABCD_0001).unwrap()
        );
    }

    #[test]
    fn mismatched_issuer_key_is_not_caught_by_the_generator() {
        let ca_pair = generate_key_pair(Curve::P256).unwrap();
        let (ca_template, _) = self_signed_ca(&ca_pair);
        let stranger = generate_key_pair(Curve::P256).unwrap();

        let leaf_pair = generate_key_pair(Curve::P256).unwrap();
        let leaf_template = CertificateTemplate::client(host(), Utc::now(), SerialNumber(9));
        let leaf = create_certificate(
            &leaf_template,
            &ca_template,
            None,
            &leaf_pair.public_key().unwrap(),
            &stranger.private_key().unwrap(),
        )
        .unwrap();

        assert!(!leaf.x509().verify(&ca_pair.public_key().unwrap()).unwrap());
    }

    #[test]
    fn leaf_authority_key_id_matches_the_ca_subject_key_id() {
        let ca_pair = generate_key_pair(Curve::P256).unwrap();
        let (ca_template, ca) = self_signed_ca(&ca_pair);
        let ca_ski = ca.x509().subject_key_id().unwrap().as_slice().to_vec();
        assert!(ca.x509().authority_key_id().is_none());

        let leaf_pair = generate_key_pair(Curve::P256).unwrap();
        let leaf_template = CertificateTemplate::client(host(), Utc::now(), SerialNumber(7));
        let leaf = create_certificate(
            &leaf_template,
            &ca_template,
            Some(&ca),
            &leaf_pair.public_key().unwrap(),
            &ca_pair.private_key().unwrap(),
        )
        .unwrap();

        let aki = leaf.x509().authority_key_id().unwrap();
        assert_eq!(aki.as_slice(), ca_ski.as_slice());
        assert!(leaf.x509().subject_key_id().is_none());
    }
}
