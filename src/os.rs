use std::future::Future;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time;
use tracing::{debug, trace};

use crate::types::OsGuess;

/// TTL assumed when a reply arrives without a readable TTL field.
pub const DEFAULT_TTL: u8 = 64;

/// Extra time granted to the `ping` process on top of its own reply wait.
const PROCESS_SLACK: Duration = Duration::from_millis(500);

/// Single-shot operating system guess for a target. Never fails; problems map to `Unknown`.
pub trait OsProbe: Send + Sync + 'static {
    fn detect(&self, target: IpAddr) -> impl Future<Output = OsGuess> + Send;
}

/// Classify a reply TTL: up to 64 looks like Linux/Unix, up to 128 like Windows.
pub fn classify_ttl(ttl: u8) -> OsGuess {
    match ttl {
        0..=64 => OsGuess::LinuxUnix,
        65..=128 => OsGuess::Windows,
        _ => OsGuess::Unknown,
    }
}

/// Pull the TTL out of `ping` output (`ttl=64` on Unix, `TTL=128` on Windows).
pub fn parse_ttl(output: &str) -> Option<u8> {
    let lower = output.to_ascii_lowercase();
    let idx = lower.find("ttl=")?;
    let digits: String = lower[idx + 4..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Sends one ICMP echo through the platform `ping` utility, which works without raw-socket privileges.
#[derive(Debug, Clone)]
pub struct PingOsDetector {
    timeout: Duration,
}

impl Default for PingOsDetector {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

impl PingOsDetector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// TTL of the echo reply, or `None` if no reply arrived in time.
    pub async fn echo_ttl(&self, target: IpAddr) -> Option<u8> {
        let mut cmd = Command::new("ping");
        cmd.args(ping_args(target, self.timeout))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match time::timeout(self.timeout + PROCESS_SLACK, cmd.output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                trace!(%target, error = %e, "ping could not be run");
                return None;
            }
            Err(_) => {
                trace!(%target, "ping timed out");
                return None;
            }
        };
        if !output.status.success() {
            trace!(%target, status = ?output.status, "no echo reply");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Some(parse_ttl(&stdout).unwrap_or(DEFAULT_TTL))
    }
}

impl OsProbe for PingOsDetector {
    async fn detect(&self, target: IpAddr) -> OsGuess {
        match self.echo_ttl(target).await {
            Some(ttl) => {
                let guess = classify_ttl(ttl);
                debug!(%target, ttl, os = %guess, "echo reply");
                guess
            }
            None => OsGuess::Unknown,
        }
    }
}

fn ping_args(target: IpAddr, timeout: Duration) -> Vec<String> {
    let ms = timeout.as_millis().max(1);
    let mut args: Vec<String> = if cfg!(windows) {
        vec!["-n".into(), "1".into(), "-w".into(), ms.to_string()]
    } else if cfg!(target_os = "macos") {
        vec!["-c".into(), "1".into(), "-W".into(), ms.to_string()]
    } else {
        // iputils takes whole seconds
        let secs = ms.div_ceil(1000).max(1);
        vec!["-c".into(), "1".into(), "-W".into(), secs.to_string()]
    };
    if target.is_ipv6() && !cfg!(windows) {
        args.insert(0, "-6".into());
    }
    args.push(target.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_boundaries() {
        assert_eq!(classify_ttl(1), OsGuess::LinuxUnix);
        assert_eq!(classify_ttl(64), OsGuess::LinuxUnix);
        assert_eq!(classify_ttl(65), OsGuess::Windows);
        assert_eq!(classify_ttl(100), OsGuess::Windows);
        assert_eq!(classify_ttl(128), OsGuess::Windows);
        assert_eq!(classify_ttl(129), OsGuess::Unknown);
        assert_eq!(classify_ttl(255), OsGuess::Unknown);
    }

    #[test]
    fn parse_unix_ping_output() {
        let out = "PING 127.0.0.1 (127.0.0.1) 56(84) bytes of data.\n\
                   64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.045 ms\n";
        assert_eq!(parse_ttl(out), Some(64));
    }

    #[test]
    fn parse_windows_ping_output() {
        let out = "Reply from 10.0.0.5: bytes=32 time<1ms TTL=128\r\n";
        assert_eq!(parse_ttl(out), Some(128));
    }

    #[test]
    fn parse_missing_or_bogus_ttl() {
        assert_eq!(parse_ttl("Request timed out."), None);
        assert_eq!(parse_ttl("ttl=999"), None);
        assert_eq!(parse_ttl("ttl="), None);
    }

    #[test]
    fn ping_args_end_with_target() {
        let args = ping_args("192.0.2.1".parse().unwrap(), Duration::from_millis(1000));
        assert_eq!(args.last().map(String::as_str), Some("192.0.2.1"));
        assert!(args.contains(&"1".to_string()));
    }
}
