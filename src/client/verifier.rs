//! Server certificate policy for storage node peers
//!
//! Nodes present self-signed chains rooted in their own identity CA, so there is
//! no web PKI anchor to check against. The chain itself is accepted as is while
//! the handshake signatures are still verified, which keeps the full
//! cryptographic cost of the handshake inside the measured dial time.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

#[derive(Debug, Clone)]
pub struct PeerCertVerifier {
    supported_algorithms: WebPkiSupportedAlgorithms,
}

impl PeerCertVerifier {
    pub fn new(provider: &CryptoProvider) -> Self {
        Self {
            supported_algorithms: provider.signature_verification_algorithms,
        }
    }
}

impl Default for PeerCertVerifier {
    fn default() -> Self {
        Self::new(&rustls::crypto::ring::default_provider())
    }
}

impl ServerCertVerifier for PeerCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.supported_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.supported_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algorithms.supported_schemes()
    }
}
