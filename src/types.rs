use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;
use crate::ports;

/// Scan strategy requested by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Tcp,
    Udp,
    /// Accepted but not implemented: needs raw sockets.
    Syn,
}

impl ScanMode {
    /// Transport label attached to outcomes produced in this mode.
    pub fn protocol(self) -> Protocol {
        match self {
            ScanMode::Tcp | ScanMode::Syn => Protocol::Tcp,
            ScanMode::Udp => Protocol::Udp,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanMode::Tcp => "TCP",
            ScanMode::Udp => "UDP",
            ScanMode::Syn => "SYN",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        })
    }
}

/// Immutable input of one scan invocation. Construct through [`ScanRequest::new`]
/// so the range is validated before anything touches the network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: String,
    pub start_port: u16,
    pub end_port: u16,
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(
        target: impl Into<String>,
        start_port: u32,
        end_port: u32,
        mode: ScanMode,
    ) -> Result<Self, ValidationError> {
        let target = target.into().trim().to_string();
        if target.is_empty() {
            return Err(ValidationError::EmptyTarget);
        }
        let (start_port, end_port) = ports::validate_range(start_port, end_port)?;
        Ok(Self {
            target,
            start_port,
            end_port,
            mode,
        })
    }

    /// Re-check a request that may have been built field by field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target.trim().is_empty() {
            return Err(ValidationError::EmptyTarget);
        }
        ports::validate_range(u32::from(self.start_port), u32::from(self.end_port))?;
        Ok(())
    }

    pub fn port_count(&self) -> u32 {
        u32::from(self.end_port) - u32::from(self.start_port) + 1
    }
}

/// Result of probing a single port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortOutcome {
    pub port: u16,
    pub protocol: Protocol,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PortOutcome {
    pub fn open(port: u16, protocol: Protocol) -> Self {
        Self {
            port,
            protocol,
            open: true,
            banner: None,
        }
    }

    pub fn closed(port: u16, protocol: Protocol) -> Self {
        Self {
            port,
            protocol,
            open: false,
            banner: None,
        }
    }
}

/// Coarse operating system classification derived from the echo reply TTL.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OsGuess {
    #[serde(rename = "Linux/Unix")]
    LinuxUnix,
    #[serde(rename = "Windows")]
    Windows,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl OsGuess {
    pub fn label(self) -> &'static str {
        match self {
            OsGuess::LinuxUnix => "Linux/Unix",
            OsGuess::Windows => "Windows",
            OsGuess::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OsGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate of one finished scan.
///
/// `open_ports` holds only open outcomes, ascending by port, without duplicates.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanResult {
    pub target: String,
    pub start_port: u16,
    pub end_port: u16,
    pub mode: ScanMode,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub open_ports: Vec<PortOutcome>,
    pub detected_os: OsGuess,
    #[serde(default)]
    pub advisories: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ScanResult {
    pub fn duration(&self) -> Duration {
        let d = self.finished_at - self.started_at;
        d.try_into().unwrap_or(Duration::ZERO)
    }

    pub fn total_ports_scanned(&self) -> u32 {
        u32::from(self.end_port) - u32::from(self.start_port) + 1
    }

    pub fn open_count(&self) -> usize {
        self.open_ports.len()
    }
}
