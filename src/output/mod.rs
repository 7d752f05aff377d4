//! Sample stream output
//!
//! The [`Reporter`] is the sink the sampler writes to: one announcement per
//! target, then one line per sample, in production order. Formatting is
//! delegated to a [`SampleFormatter`] so the same reporter can emit plain,
//! colored or JSON lines.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter};
pub use formatter::{JsonFormatter, PlainFormatter, SampleFormatter, COLUMN_LINE};

use crate::{
    error::{AppError, Result},
    models::{Sample, Target},
    types::OutputFormat,
};
use std::io::Write;
use std::time::Duration;

/// Sink for the ordered sample stream
pub trait Reporter: Send {
    /// Called once per target before its first sample
    fn begin_target(&mut self, target: &Target) -> Result<()>;

    /// Called once per sample, in (target, round) order
    fn emit(&mut self, sample: &Sample) -> Result<()>;
}

/// Render a duration with three decimals in the largest unit that keeps it at or above one
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.3}s", secs)
    } else if secs >= 0.001 {
        format!("{:.3}ms", secs * 1_000.0)
    } else {
        format!("{:.3}µs", secs * 1_000_000.0)
    }
}

/// Output formatting factory
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    pub fn create_formatter(format: OutputFormat, enable_color: bool) -> Box<dyn SampleFormatter> {
        match format {
            OutputFormat::Json => Box::new(JsonFormatter::new()),
            OutputFormat::Text if enable_color => Box::new(ColoredFormatter::new()),
            OutputFormat::Text => Box::new(PlainFormatter::new()),
        }
    }
}

/// Writes formatted lines to any writer, flushing after each one
pub struct StreamReporter<W: Write + Send> {
    writer: W,
    formatter: Box<dyn SampleFormatter>,
    timestamps: bool,
}

impl<W: Write + Send> StreamReporter<W> {
    pub fn new(writer: W, formatter: Box<dyn SampleFormatter>) -> Self {
        Self {
            writer,
            formatter,
            timestamps: false,
        }
    }

    /// Prefix every line with the local date and time
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let written = if self.timestamps {
            let prefix = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
            writeln!(self.writer, "{} {}", prefix, line)
        } else {
            writeln!(self.writer, "{}", line)
        };
        written
            .and_then(|_| self.writer.flush())
            .map_err(|e| AppError::io(format!("Failed to write sample stream: {}", e)))
    }
}

impl StreamReporter<std::io::Stdout> {
    pub fn stdout(formatter: Box<dyn SampleFormatter>) -> Self {
        Self::new(std::io::stdout(), formatter)
    }
}

impl<W: Write + Send> Reporter for StreamReporter<W> {
    fn begin_target(&mut self, target: &Target) -> Result<()> {
        for line in self.formatter.format_target(target)? {
            self.write_line(&line)?;
        }
        Ok(())
    }

    fn emit(&mut self, sample: &Sample) -> Result<()> {
        let line = self.formatter.format_sample(sample)?;
        self.write_line(&line)
    }
}

/// Recorded reporter call
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    Target(Target),
    Sample(Sample),
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Vec<ReportEvent>,
    fail_after: Option<usize>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every sample after the first `samples` ones with an I/O error
    pub fn failing_after(samples: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_after: Some(samples),
        }
    }

    pub fn events(&self) -> &[ReportEvent] {
        &self.events
    }

    pub fn samples(&self) -> Vec<&Sample> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Sample(sample) => Some(sample),
                ReportEvent::Target(_) => None,
            })
            .collect()
    }

    pub fn targets(&self) -> Vec<&Target> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Target(target) => Some(target),
                ReportEvent::Sample(_) => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn begin_target(&mut self, target: &Target) -> Result<()> {
        self.events.push(ReportEvent::Target(target.clone()));
        Ok(())
    }

    fn emit(&mut self, sample: &Sample) -> Result<()> {
        if let Some(limit) = self.fail_after {
            if self.samples().len() >= limit {
                return Err(AppError::io("sample sink closed"));
            }
        }
        self.events.push(ReportEvent::Sample(sample.clone()));
        Ok(())
    }
}
