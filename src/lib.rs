//! Library crate for portxor-rs: concurrent TCP/UDP port scanning, banner
//! grabbing and a TTL-based operating system guess.
pub mod banner;
pub mod config;
pub mod error;
pub mod logging;
pub mod os;
pub mod ports;
pub mod probe;
pub mod report;
pub mod scanner;
pub mod types;

pub use config::ScanConfig;
pub use error::{ScanError, ValidationError};
pub use scanner::{run_scan, Scanner};
pub use types::{OsGuess, PortOutcome, Protocol, ScanMode, ScanRequest, ScanResult};
