//! Per-round measurement data

use crate::error::ProbeError;
use crate::models::target::NodeId;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of one timed connection attempt
///
/// The elapsed time is always present: a dial that fails after hitting the
/// timeout still tells the operator how long it took to give up.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    pub elapsed: Duration,
    pub result: Result<(), ProbeError>,
}

impl ConnectOutcome {
    pub fn success(elapsed: Duration) -> Self {
        Self { elapsed, result: Ok(()) }
    }

    pub fn failed(elapsed: Duration, error: ProbeError) -> Self {
        Self { elapsed, result: Err(error) }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.result.as_ref().err()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Result of one echo probe: the round-trip time, or why there is none
pub type EchoOutcome = Result<Duration, ProbeError>;

/// One paired measurement for a (target, round)
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Position of the target in the run's target set
    pub target_index: usize,
    pub target_id: NodeId,
    /// 1-based round number
    pub round: u32,
    pub connect: ConnectOutcome,
    pub echo: EchoOutcome,
    /// Wall-clock time the round started probing
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn echo_ms(&self) -> Option<f64> {
        self.echo.as_ref().ok().map(|rtt| rtt.as_secs_f64() * 1000.0)
    }

    pub fn echo_error(&self) -> Option<&ProbeError> {
        self.echo.as_ref().err()
    }

    /// Both probes succeeded
    pub fn is_complete(&self) -> bool {
        self.connect.is_success() && self.echo.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(connect: ConnectOutcome, echo: EchoOutcome) -> Sample {
        Sample {
            target_index: 0,
            target_id: NodeId::new("node").unwrap(),
            round: 1,
            connect,
            echo,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_failed_connect_keeps_elapsed() {
        let outcome = ConnectOutcome::failed(Duration::from_secs(20), ProbeError::Timeout(Duration::from_secs(20)));
        assert!(!outcome.is_success());
        assert_eq!(outcome.elapsed, Duration::from_secs(20));
        assert_eq!(outcome.error().unwrap().kind(), "timeout");
        assert!((outcome.elapsed_ms() - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_accessors() {
        let ok = sample(ConnectOutcome::success(Duration::from_millis(50)), Ok(Duration::from_millis(10)));
        assert!(ok.is_complete());
        assert_eq!(ok.echo_ms(), Some(10.0));
        assert!(ok.echo_error().is_none());

        let echo_failed = sample(
            ConnectOutcome::success(Duration::from_millis(60)),
            Err(ProbeError::Timeout(Duration::from_secs(5))),
        );
        assert!(!echo_failed.is_complete());
        assert_eq!(echo_failed.echo_ms(), None);
        assert_eq!(echo_failed.echo_error().unwrap().kind(), "timeout");
    }
}
