//! Host name resolution for the echo prober

use crate::error::ProbeError;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

/// Shared resolver built once per run
#[derive(Clone)]
pub struct HostResolver {
    resolver: Arc<TokioAsyncResolver>,
}

impl HostResolver {
    /// Use the system resolver configuration, falling back to the library defaults
    /// when it cannot be read (for example inside minimal containers).
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self::with_resolver(resolver)
    }

    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Resolve a host to all of its addresses. IP literals are returned as is.
    pub async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ProbeError> {
        if let Some(ip) = parse_literal(host) {
            return Ok(vec![ip]);
        }

        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ProbeError::Resolve(format!("{}: {}", host, e)))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(ProbeError::Resolve(format!("{}: no addresses", host)));
        }
        Ok(ips)
    }

    /// First IPv4 address of a host
    pub async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ProbeError> {
        let ips = self.resolve(host).await?;
        first_ipv4(&ips).ok_or_else(|| ProbeError::Resolve(format!("{}: no IPv4 address", host)))
    }
}

impl Default for HostResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostResolver").finish_non_exhaustive()
    }
}

/// Parse an IP literal, accepting bracketed IPv6
fn parse_literal(host: &str) -> Option<IpAddr> {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse().ok()
}

fn first_ipv4(ips: &[IpAddr]) -> Option<Ipv4Addr> {
    ips.iter().find_map(|ip| match ip {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    })
}
