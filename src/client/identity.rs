//! Client certificate chain presented during the handshake

use crate::error::{AppError, Result};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256,
};
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::path::Path;

/// Leaf-first certificate chain plus the leaf's private key
#[derive(Debug)]
pub struct ClientIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key_der: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    pub fn new(
        cert_chain: impl IntoIterator<Item = CertificateDer<'static>>,
        key_der: PrivateKeyDer<'static>,
    ) -> Result<Self> {
        let cert_chain: Vec<_> = cert_chain.into_iter().collect();
        if cert_chain.is_empty() {
            return Err(AppError::setup("Client certificate chain is empty"));
        }
        Ok(Self { cert_chain, key_der })
    }

    /// Generate a fresh CA and a leaf signed by it, both ECDSA P-256
    pub fn ephemeral() -> Result<Self> {
        let ca_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let mut ca_params = CertificateParams::new(Vec::<String>::new())?;
        ca_params.distinguished_name = distinguished_name("plp ephemeral CA");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let ca_cert = ca_params.self_signed(&ca_key)?;

        let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;
        let mut leaf_params = CertificateParams::new(Vec::<String>::new())?;
        leaf_params.distinguished_name = distinguished_name("plp ephemeral client");
        leaf_params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key)?;

        Self::new(
            [leaf_cert.der().clone(), ca_cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der())),
        )
    }

    /// Load a PEM certificate chain (leaf first) and its PEM private key
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_chain = CertificateDer::pem_file_iter(cert_path)
            .map_err(|e| {
                AppError::setup(format!("Cannot read certificate file {}: {}", cert_path.display(), e))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                AppError::setup(format!("Invalid certificate in {}: {}", cert_path.display(), e))
            })?;

        let key_der = PrivateKeyDer::from_pem_file(key_path).map_err(|e| {
            AppError::setup(format!("Cannot read private key {}: {}", key_path.display(), e))
        })?;

        Self::new(cert_chain, key_der).map_err(|_| {
            AppError::setup(format!("No certificates found in {}", cert_path.display()))
        })
    }

    /// Load from files when both paths are given, otherwise generate
    pub fn load_or_generate(cert_path: Option<&Path>, key_path: Option<&Path>) -> Result<Self> {
        match (cert_path, key_path) {
            (Some(cert), Some(key)) => Self::from_pem_files(cert, key),
            (None, None) => Self::ephemeral(),
            _ => Err(AppError::setup("Client certificate and key must be given together")),
        }
    }
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dname = DistinguishedName::new();
    dname.push(DnType::CommonName, common_name);
    dname
}
