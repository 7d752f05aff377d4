//! Colored text lines
//!
//! Same layout as [`PlainFormatter`], with latencies colored by level and
//! failures in red.

use super::formatter::{PlainFormatter, SampleFormatter, COLUMN_LINE};
use crate::{
    error::Result,
    models::{Sample, Target},
    types::LatencyLevel,
};
use colored::*;
use std::time::Duration;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub columns: Color,
    pub excellent: Color,
    pub good: Color,
    pub fair: Color,
    pub poor: Color,
    pub failure: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            columns: Color::BrightBlack,
            excellent: Color::Green,
            good: Color::Cyan,
            fair: Color::Yellow,
            poor: Color::Magenta,
            failure: Color::Red,
        }
    }
}

impl ColorScheme {
    pub fn latency_color(&self, level: LatencyLevel) -> Color {
        match level {
            LatencyLevel::Excellent => self.excellent,
            LatencyLevel::Good => self.good,
            LatencyLevel::Fair => self.fair,
            LatencyLevel::Poor => self.poor,
        }
    }
}

pub struct ColoredFormatter {
    plain: PlainFormatter,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new() -> Self {
        Self::with_color_scheme(ColorScheme::default())
    }

    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self {
            plain: PlainFormatter::new(),
            color_scheme,
        }
    }

    fn paint(&self, text: String, outcome: Option<Duration>) -> String {
        match outcome {
            Some(latency) => text
                .color(self.color_scheme.latency_color(LatencyLevel::from_duration(latency)))
                .to_string(),
            None => text.color(self.color_scheme.failure).bold().to_string(),
        }
    }
}

impl Default for ColoredFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleFormatter for ColoredFormatter {
    fn format_target(&self, target: &Target) -> Result<Vec<String>> {
        Ok(vec![
            self.plain
                .format_header(target)
                .color(self.color_scheme.header)
                .bold()
                .to_string(),
            COLUMN_LINE.color(self.color_scheme.columns).to_string(),
        ])
    }

    fn format_sample(&self, sample: &Sample) -> Result<String> {
        let connect = self.paint(
            self.plain.format_connect(&sample.connect),
            sample.connect.is_success().then_some(sample.connect.elapsed),
        );
        let echo = self.paint(self.plain.format_echo(&sample.echo), sample.echo.as_ref().ok().copied());
        Ok(format!("{} : {}", connect, echo))
    }
}
