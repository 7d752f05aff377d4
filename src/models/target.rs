//! Probe targets: node identity plus network address

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Opaque node identity, kept exactly as supplied
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(AppError::validation("Node ID cannot be empty"));
        }
        if id.chars().any(|c| c.is_whitespace() || c == '@') {
            return Err(AppError::validation(format!("Node ID '{}' contains whitespace or '@'", id)));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.trim())
    }
}

/// Transport kind advertised for a node address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transport {
    /// TCP with a TLS session carrying RPC traffic
    #[default]
    #[serde(rename = "TCP_TLS_GRPC")]
    TcpTlsGrpc,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::TcpTlsGrpc => "TCP_TLS_GRPC",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network address of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Hostname or IP literal, without brackets
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub transport: Transport,
}

impl NodeAddress {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(AppError::validation("Address host cannot be empty"));
        }
        if host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(AppError::validation(format!("Invalid host '{}'", host)));
        }
        if port == 0 {
            return Err(AppError::validation(format!("Port 0 is not dialable for host '{}'", host)));
        }
        Ok(Self {
            host,
            port,
            transport: Transport::default(),
        })
    }

    /// Parse `host:port` or `[ipv6]:port`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| AppError::parse(format!("Unclosed '[' in address '{}'", s)))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| AppError::parse(format!("Missing port in address '{}'", s)))?;
            (host, port)
        } else {
            let (host, port) = s
                .rsplit_once(':')
                .ok_or_else(|| AppError::parse(format!("Missing port in address '{}'", s)))?;
            if host.contains(':') {
                return Err(AppError::parse(format!("IPv6 addresses must be bracketed: '{}'", s)));
            }
            (host, port)
        };

        let port: u16 = port
            .parse()
            .map_err(|e| AppError::parse(format!("Invalid port in address '{}': {}", s, e)))?;
        Self::new(host, port)
    }

    /// The host as an IP address, when it is a literal
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    /// `host:port`, bracketing IPv6 literals
    pub fn authority(&self) -> String {
        match self.ip() {
            Some(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

impl FromStr for NodeAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A peer endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: NodeId,
    pub address: NodeAddress,
}

impl Target {
    pub fn new(id: NodeId, address: NodeAddress) -> Self {
        Self { id, address }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

impl FromStr for Target {
    type Err = AppError;

    /// Parse `NODE_ID@HOST:PORT`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (id, address) = s
            .split_once('@')
            .ok_or_else(|| AppError::parse(format!("Target '{}' must be written as NODE_ID@HOST:PORT", s)))?;
        Ok(Self::new(id.parse()?, address.parse()?))
    }
}

/// Explicit subset selection over a target set
///
/// A target is kept when any pattern is a prefix of its node ID or equals its
/// host or `host:port`. An empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFilter {
    patterns: Vec<String>,
}

impl TargetFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, target: &Target) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|pattern| {
            target.id.as_str().starts_with(pattern.as_str())
                || target.address.host == *pattern
                || target.address.authority() == *pattern
        })
    }
}

/// Ordered, immutable list of targets for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<Target>,
}

impl TargetSet {
    pub fn new(targets: Vec<Target>) -> Result<Self> {
        if targets.is_empty() {
            return Err(AppError::config("Target set cannot be empty"));
        }
        Ok(Self { targets })
    }

    /// Parse every `NODE_ID@HOST:PORT` entry, keeping order
    pub fn parse_all<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let targets = entries
            .iter()
            .map(|entry| entry.as_ref().parse())
            .collect::<Result<Vec<Target>>>()?;
        Self::new(targets)
    }

    /// Keep only the targets selected by `filter`, preserving order
    pub fn filtered(self, filter: &TargetFilter) -> Result<Self> {
        if filter.is_empty() {
            return Ok(self);
        }
        let kept: Vec<Target> = self.targets.into_iter().filter(|t| filter.matches(t)).collect();
        if kept.is_empty() {
            return Err(AppError::config(format!(
                "Target filter [{}] matched no targets",
                filter.patterns().join(", ")
            )));
        }
        Ok(Self { targets: kept })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Target> {
        self.targets.get(index)
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}
