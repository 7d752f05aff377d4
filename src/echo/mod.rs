//! Echo round-trip probing

pub mod icmp;

use crate::{dns::HostResolver, error::ProbeError, models::EchoOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Measures one echo round trip to a bare host name
#[async_trait]
pub trait EchoProber: Send + Sync {
    async fn probe(&self, host: &str) -> EchoOutcome;
}

/// ICMPv4 echo prober; every probe opens its own raw channel
pub struct IcmpEchoProber {
    resolver: HostResolver,
    timeout: Duration,
    identifier: u16,
    sequence: AtomicU16,
}

impl IcmpEchoProber {
    pub fn new(resolver: HostResolver, timeout: Duration) -> Self {
        Self {
            resolver,
            timeout,
            identifier: uuid::Uuid::new_v4().as_u128() as u16,
            sequence: AtomicU16::new(0),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    fn next_sequence(&self) -> u16 {
        self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

#[async_trait]
impl EchoProber for IcmpEchoProber {
    /// Resolution and the exchange share one deadline of `timeout`
    async fn probe(&self, host: &str) -> EchoOutcome {
        let deadline = Instant::now() + self.timeout;

        let dest = timeout(self.timeout, self.resolver.resolve_ipv4(host))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProbeError::Timeout(self.timeout));
        }

        let identifier = self.identifier;
        let sequence = self.next_sequence();
        let limit = self.timeout;

        tokio::task::spawn_blocking(move || {
            icmp::echo_once(dest, identifier, sequence, remaining).map_err(|e| match e {
                ProbeError::Timeout(_) => ProbeError::Timeout(limit),
                other => other,
            })
        })
        .await
        .map_err(|e| ProbeError::Io(format!("echo task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_numbers_advance() {
        let prober = IcmpEchoProber::new(HostResolver::new(), Duration::from_secs(5));
        assert_eq!(prober.next_sequence(), 1);
        assert_eq!(prober.next_sequence(), 2);
        assert_eq!(prober.timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sequence_wraps() {
        let prober = IcmpEchoProber::new(HostResolver::new(), Duration::from_secs(5));
        prober.sequence.store(u16::MAX, Ordering::Relaxed);
        assert_eq!(prober.next_sequence(), 0);
    }

    #[tokio::test]
    async fn test_ipv6_only_host_fails_resolution() {
        let prober = IcmpEchoProber::new(HostResolver::new(), Duration::from_secs(1));
        let outcome = prober.probe("2001:db8::1").await;
        assert!(matches!(outcome, Err(ProbeError::Resolve(_))));
    }

    /// False when this process may not open raw ICMP sockets
    async fn raw_sockets_available(prober: &IcmpEchoProber) -> bool {
        !matches!(prober.probe("127.0.0.1").await, Err(ProbeError::PermissionDenied(_)))
    }

    #[tokio::test]
    async fn test_loopback_probe_answers_when_permitted() {
        let prober = IcmpEchoProber::new(HostResolver::new(), Duration::from_secs(1));
        match prober.probe("127.0.0.1").await {
            Ok(rtt) => assert!(rtt < Duration::from_secs(1)),
            Err(ProbeError::PermissionDenied(reason)) => {
                eprintln!("skipping: {}", reason);
            }
            Err(other) => panic!("loopback echo failed: {}", other),
        }
    }

    #[tokio::test]
    async fn test_unanswered_probe_ends_within_its_timeout() {
        let limit = Duration::from_secs(1);
        let prober = IcmpEchoProber::new(HostResolver::new(), limit);
        if !raw_sockets_available(&prober).await {
            eprintln!("skipping: raw ICMP sockets not permitted");
            return;
        }

        // TEST-NET-1 is never assigned, so nothing answers
        let started = std::time::Instant::now();
        let outcome = prober.probe("192.0.2.1").await;
        let elapsed = started.elapsed();

        assert!(elapsed < limit + Duration::from_millis(500), "took {:?}", elapsed);
        match outcome {
            Err(ProbeError::Timeout(reported)) => {
                assert_eq!(reported, limit);
                assert!(elapsed >= limit - Duration::from_millis(50), "took {:?}", elapsed);
            }
            // Hosts without a default route reject the send outright
            Err(ProbeError::Unreachable(_)) | Err(ProbeError::Io(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
