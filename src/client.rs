//! Secure transport dialing and connection timing

pub mod identity;
pub mod verifier;

pub use identity::ClientIdentity;
pub use verifier::PeerCertVerifier;

use crate::{
    dns::HostResolver,
    error::{ProbeError, Result},
    models::{ConnectOutcome, NodeAddress, Target},
};
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    net::TcpStream,
    time::{timeout, Instant},
};
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Establishes a connection to a target through an already-configured transport
#[async_trait]
pub trait Dialer: Send + Sync {
    type Connection: Send;

    /// Dial the target, including any handshake
    async fn dial_target(&self, target: &Target) -> std::result::Result<Self::Connection, ProbeError>;

    /// Upper bound on one `dial_target` call
    fn dial_timeout(&self) -> Duration;
}

/// Measures the wall-clock cost of one connection attempt
#[async_trait]
pub trait ConnectionTimer: Send + Sync {
    async fn measure(&self, target: &Target) -> ConnectOutcome;
}

/// Times dials made by a [`Dialer`] and closes every connection it opens
pub struct DialTimer<D> {
    dialer: D,
}

impl<D: Dialer> DialTimer<D> {
    pub fn new(dialer: D) -> Self {
        Self { dialer }
    }

    pub fn dialer(&self) -> &D {
        &self.dialer
    }
}

#[async_trait]
impl<D: Dialer> ConnectionTimer for DialTimer<D> {
    async fn measure(&self, target: &Target) -> ConnectOutcome {
        let limit = self.dialer.dial_timeout();
        let start = Instant::now();

        let attempt = timeout(limit, self.dialer.dial_target(target)).await;
        let elapsed = start.elapsed();

        match attempt {
            Ok(Ok(connection)) => {
                drop(connection);
                ConnectOutcome::success(elapsed)
            }
            Ok(Err(error)) => ConnectOutcome::failed(elapsed, error),
            Err(_) => ConnectOutcome::failed(elapsed, ProbeError::Timeout(limit)),
        }
    }
}

/// TCP connect followed by a TLS handshake presenting the client identity
pub struct TlsDialer {
    connector: TlsConnector,
    resolver: HostResolver,
    dial_timeout: Duration,
}

impl TlsDialer {
    pub fn new(identity: ClientIdentity, resolver: HostResolver, dial_timeout: Duration) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = Arc::new(PeerCertVerifier::new(&provider));

        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_client_auth_cert(identity.cert_chain, identity.key_der)?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            resolver,
            dial_timeout,
        })
    }

    /// Connect to the first reachable address of the target
    async fn connect_tcp(&self, address: &NodeAddress) -> std::result::Result<TcpStream, ProbeError> {
        let ips = self.resolver.resolve(&address.host).await?;

        let mut last_error = ProbeError::Resolve(format!("{}: no addresses", address.host));
        for ip in ips {
            match TcpStream::connect(SocketAddr::new(ip, address.port)).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = ProbeError::from(e),
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl Dialer for TlsDialer {
    type Connection = TlsStream<TcpStream>;

    async fn dial_target(&self, target: &Target) -> std::result::Result<Self::Connection, ProbeError> {
        let server_name = server_name(&target.address)?;
        let tcp = self.connect_tcp(&target.address).await?;
        // Only affects small writes; the handshake still completes without it
        tcp.set_nodelay(true).ok();

        self.connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ProbeError::Handshake(e.to_string()))
    }

    fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }
}

fn server_name(address: &NodeAddress) -> std::result::Result<ServerName<'static>, ProbeError> {
    if let Some(ip) = address.ip() {
        return Ok(ServerName::IpAddress(ip.into()));
    }
    ServerName::try_from(address.host.clone())
        .map_err(|e| ProbeError::Handshake(format!("invalid server name '{}': {}", address.host, e)))
}
