//! Line formatting for the sample stream

use super::format_duration;
use crate::{
    error::Result,
    models::{ConnectOutcome, EchoOutcome, Sample, Target},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Column line printed under every target header in text output
pub const COLUMN_LINE: &str = "DialTime : PingTime";

/// Turns targets and samples into output lines
pub trait SampleFormatter: Send {
    /// Lines announcing a target, written before its first sample
    fn format_target(&self, target: &Target) -> Result<Vec<String>>;

    /// Exactly one line per sample
    fn format_sample(&self, sample: &Sample) -> Result<String>;
}

/// `<connect> : <echo>` text lines
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl PlainFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_header(&self, target: &Target) -> String {
        format!("{} : {}", target.id, target.address)
    }

    /// The elapsed time, or `FAILED(<kind>, <elapsed>)`
    pub fn format_connect(&self, connect: &ConnectOutcome) -> String {
        match connect.error() {
            None => format_duration(connect.elapsed),
            Some(error) => format!("FAILED({}, {})", error.kind(), format_duration(connect.elapsed)),
        }
    }

    /// The round-trip time, or `FAILED(<kind>)`
    pub fn format_echo(&self, echo: &EchoOutcome) -> String {
        match echo {
            Ok(rtt) => format_duration(*rtt),
            Err(error) => format!("FAILED({})", error.kind()),
        }
    }
}

impl SampleFormatter for PlainFormatter {
    fn format_target(&self, target: &Target) -> Result<Vec<String>> {
        Ok(vec![self.format_header(target), COLUMN_LINE.to_string()])
    }

    fn format_sample(&self, sample: &Sample) -> Result<String> {
        Ok(format!(
            "{} : {}",
            self.format_connect(&sample.connect),
            self.format_echo(&sample.echo)
        ))
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum StreamEvent<'a> {
    Target {
        node_id: &'a str,
        address: String,
        transport: &'static str,
    },
    Sample {
        node_id: &'a str,
        target_index: usize,
        round: u32,
        timestamp: DateTime<Utc>,
        connect_ms: f64,
        connect_ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        connect_failure: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        connect_error: Option<String>,
        echo_ms: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        echo_failure: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        echo_error: Option<String>,
    },
}

/// One JSON object per line, for machine consumption
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl SampleFormatter for JsonFormatter {
    fn format_target(&self, target: &Target) -> Result<Vec<String>> {
        let event = StreamEvent::Target {
            node_id: target.id.as_str(),
            address: target.address.authority(),
            transport: target.address.transport.as_str(),
        };
        Ok(vec![serde_json::to_string(&event)?])
    }

    fn format_sample(&self, sample: &Sample) -> Result<String> {
        let event = StreamEvent::Sample {
            node_id: sample.target_id.as_str(),
            target_index: sample.target_index,
            round: sample.round,
            timestamp: sample.timestamp,
            connect_ms: sample.connect.elapsed_ms(),
            connect_ok: sample.connect.is_success(),
            connect_failure: sample.connect.error().map(|e| e.kind()),
            connect_error: sample.connect.error().map(|e| e.to_string()),
            echo_ms: sample.echo_ms(),
            echo_failure: sample.echo_error().map(|e| e.kind()),
            echo_error: sample.echo_error().map(|e| e.to_string()),
        };
        Ok(serde_json::to_string(&event)?)
    }
}
