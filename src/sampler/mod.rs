//! Round-based sampling engine
//!
//! The [`Sampler`] walks the target set in order. Every target goes through
//! `Idle -> Sampling(1..=N) -> Done`; each round waits the inter-round delay,
//! times one dial, runs one echo probe and hands the resulting [`Sample`] to
//! the reporter before the next round starts. Probe failures are recorded in
//! the sample, so only reporter failures and cancellation end a run early.

use crate::{
    client::ConnectionTimer,
    echo::EchoProber,
    error::{AppError, Result},
    logging::ProbeLogger,
    models::{Config, NodeId, Sample, Target, TargetSet},
    output::Reporter,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Create a linked cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle {
            sender: Arc::new(sender),
        },
        CancelSignal {
            receiver: Some(receiver),
        },
    )
}

/// Requests cancellation of a running sampler
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Observed by the sampler at every suspension point
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver.as_ref().is_some_and(|receiver| *receiver.borrow())
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        if let Some(receiver) = &self.receiver {
            let mut receiver = receiver.clone();
            if receiver.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Parameters of a sampling run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Rounds per target
    pub rounds: u32,
    /// Delay before every round, the first included
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            rounds: crate::defaults::DEFAULT_ROUNDS,
            interval: crate::defaults::DEFAULT_INTERVAL,
        }
    }
}

impl From<&Config> for SamplerConfig {
    fn from(config: &Config) -> Self {
        Self {
            rounds: config.rounds,
            interval: config.interval(),
        }
    }
}

/// Progress of one target through its rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Idle,
    Sampling { round: u32 },
    Done,
}

impl TargetState {
    pub fn advance(self, rounds: u32) -> Self {
        match self {
            Self::Idle if rounds == 0 => Self::Done,
            Self::Idle => Self::Sampling { round: 1 },
            Self::Sampling { round } if round < rounds => Self::Sampling { round: round + 1 },
            Self::Sampling { .. } | Self::Done => Self::Done,
        }
    }
}

/// Per-target counters
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSummary {
    pub node_id: NodeId,
    pub samples: u32,
    pub connect_failures: u32,
    pub echo_failures: u32,
}

impl TargetSummary {
    fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            samples: 0,
            connect_failures: 0,
            echo_failures: 0,
        }
    }

    fn record(&mut self, sample: &Sample) {
        self.samples += 1;
        if !sample.connect.is_success() {
            self.connect_failures += 1;
        }
        if sample.echo.is_err() {
            self.echo_failures += 1;
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub targets: Vec<TargetSummary>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn total_samples(&self) -> u32 {
        self.targets.iter().map(|t| t.samples).sum()
    }
}

/// Drives the rounds for every target
pub struct Sampler<C, E> {
    timer: C,
    prober: E,
    config: SamplerConfig,
    logger: Option<ProbeLogger>,
}

impl<C: ConnectionTimer, E: EchoProber> Sampler<C, E> {
    pub fn new(timer: C, prober: E, config: SamplerConfig) -> Self {
        Self {
            timer,
            prober,
            config,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample every target in order, emitting each sample as soon as its round ends
    pub async fn run<R: Reporter + ?Sized>(
        &self,
        targets: &TargetSet,
        reporter: &mut R,
        cancel: &CancelSignal,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        if let Some(logger) = &self.logger {
            logger.log_run_start(targets.len(), self.config.rounds).await;
        }

        let mut summaries = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            summaries.push(self.sample_target(index, target, reporter, cancel).await?);
        }

        let summary = RunSummary {
            targets: summaries,
            duration: started.elapsed(),
        };
        if let Some(logger) = &self.logger {
            logger.log_summary(&summary).await;
        }
        Ok(summary)
    }

    async fn sample_target<R: Reporter + ?Sized>(
        &self,
        index: usize,
        target: &Target,
        reporter: &mut R,
        cancel: &CancelSignal,
    ) -> Result<TargetSummary> {
        let correlation_id = match &self.logger {
            Some(logger) => logger.log_target_start(index, target).await,
            None => String::new(),
        };

        reporter.begin_target(target)?;
        let mut summary = TargetSummary::new(target.id.clone());

        let mut state = TargetState::Idle.advance(self.config.rounds);
        while let TargetState::Sampling { round } = state {
            let sample = self.sample_round(index, target, round, cancel).await?;
            if let Some(logger) = &self.logger {
                logger.log_sample(&sample, &correlation_id).await;
            }
            reporter.emit(&sample)?;
            summary.record(&sample);
            state = state.advance(self.config.rounds);
        }

        Ok(summary)
    }

    async fn sample_round(
        &self,
        index: usize,
        target: &Target,
        round: u32,
        cancel: &CancelSignal,
    ) -> Result<Sample> {
        interruptible(cancel, tokio::time::sleep(self.config.interval)).await?;

        let timestamp = Utc::now();
        let connect = interruptible(cancel, self.timer.measure(target)).await?;
        let echo = interruptible(cancel, self.prober.probe(&target.address.host)).await?;

        Ok(Sample {
            target_index: index,
            target_id: target.id.clone(),
            round,
            connect,
            echo,
            timestamp,
        })
    }
}

/// Run `future` unless cancellation wins first
async fn interruptible<F: Future>(cancel: &CancelSignal, future: F) -> Result<F::Output> {
    if cancel.is_cancelled() {
        return Err(AppError::cancelled("run interrupted"));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled("run interrupted")),
        output = future => Ok(output),
    }
}
