//! Banner grabbing for open TCP ports.
//!
//! A grab connects, waits briefly for an unsolicited greeting (SSH, FTP,
//! SMTP and friends), and only if the service stays silent sends a benign
//! protocol-specific probe taken from a [`ProbeTable`]. Whatever comes back
//! is cleaned and truncated for display.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

use crate::types::Protocol;

/// Maximum number of characters kept in a cleaned banner.
pub const MAX_BANNER_CHARS: usize = 150;
/// Marker appended to truncated banners.
pub const ELLIPSIS: &str = "...";
/// Byte cap for a single drain.
pub const MAX_DRAIN_BYTES: usize = 2048;

const HTTP_GET: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";

/// Well-known port to probe payload mapping.
const DEFAULT_PROBES: &[(u16, &[u8])] = &[
    (21, b"QUIT\r\n"),
    (22, b"\r\n"),
    (23, b"\r\n"),
    (25, b"QUIT\r\n"),
    (53, b"\x00\x00\x10\x00\x00\x00\x00\x00\x00\x00\x00\x00"),
    (80, HTTP_GET),
    (110, b"QUIT\r\n"),
    (143, b"a001 LOGOUT\r\n"),
    (443, HTTP_GET),
    (3306, b"\x00\x00\x00\x0a\x00\x00\x00\x00\x00\x00\x00\x00"),
    (5432, b"\x00\x00\x00\x04\xd2\x16\x2f\x9b"),
    (8080, HTTP_GET),
    (8443, HTTP_GET),
];

/// Port-keyed probe payloads. Ports without an entry get no probe.
#[derive(Debug, Clone)]
pub struct ProbeTable {
    probes: HashMap<u16, Vec<u8>>,
}

impl Default for ProbeTable {
    fn default() -> Self {
        Self {
            probes: DEFAULT_PROBES
                .iter()
                .map(|(port, payload)| (*port, payload.to_vec()))
                .collect(),
        }
    }
}

impl ProbeTable {
    pub fn empty() -> Self {
        Self {
            probes: HashMap::new(),
        }
    }

    /// Add or replace the payload sent to `port`.
    pub fn with_probe(mut self, port: u16, payload: impl Into<Vec<u8>>) -> Self {
        self.probes.insert(port, payload.into());
        self
    }

    pub fn get(&self, port: u16) -> Option<&[u8]> {
        self.probes.get(&port).map(Vec::as_slice)
    }

    /// The HTTP request used for the web ports.
    pub fn http_get() -> &'static [u8] {
        HTTP_GET
    }
}

/// Connects to open TCP services and extracts an identifying banner.
#[derive(Debug, Clone)]
pub struct BannerProber {
    connect_timeout: Duration,
    grace: Duration,
    drain_pause: Duration,
    max_bytes: usize,
    probes: ProbeTable,
}

impl Default for BannerProber {
    fn default() -> Self {
        Self::new()
    }
}

impl BannerProber {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            grace: Duration::from_millis(100),
            drain_pause: Duration::from_millis(50),
            max_bytes: MAX_DRAIN_BYTES,
            probes: ProbeTable::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_probes(mut self, probes: ProbeTable) -> Self {
        self.probes = probes;
        self
    }

    /// Grab a banner. Returns an empty string for non-TCP protocols and on any failure.
    pub async fn grab(&self, target: IpAddr, port: u16, protocol: Protocol) -> String {
        if protocol != Protocol::Tcp {
            return String::new();
        }
        let addr = SocketAddr::new(target, port);
        match self.grab_raw(addr).await {
            Some(raw) => {
                let banner = truncate_banner(&clean_banner(&raw));
                debug!(%addr, banner = %banner, "banner grabbed");
                banner
            }
            None => String::new(),
        }
    }

    async fn grab_raw(&self, addr: SocketAddr) -> Option<String> {
        let mut stream = match time::timeout(self.connect_timeout, TcpStream::connect(addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                trace!(%addr, error = %e, "banner connect failed");
                return None;
            }
            Err(_) => {
                trace!(%addr, "banner connect timed out");
                return None;
            }
        };
        let _ = stream.set_nodelay(true);

        time::sleep(self.grace).await;
        let initial = self.drain(&stream).await;

        if initial.is_empty() {
            if let Some(payload) = self.probes.get(addr.port()) {
                match time::timeout(self.connect_timeout, stream.write_all(payload)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        trace!(%addr, error = %e, "probe write failed");
                        return None;
                    }
                    Err(_) => return None,
                }
                let _ = stream.flush().await;
                time::sleep(self.grace).await;
            }
        }

        let response = self.drain(&stream).await;
        Some(join_parts(&initial, &response))
    }

    /// Read whatever is already buffered, pausing between chunks while data keeps arriving.
    async fn drain(&self, stream: &TcpStream) -> String {
        let mut collected: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; self.max_bytes];

        while collected.len() < self.max_bytes {
            let room = self.max_bytes - collected.len();
            match stream.try_read(&mut buf[..room]) {
                Ok(0) => break,
                Ok(n) => {
                    collected.extend_from_slice(&buf[..n]);
                    time::sleep(self.drain_pause).await;
                }
                Err(_) => break,
            }
        }

        String::from_utf8_lossy(&collected).into_owned()
    }
}

/// Pre-probe bytes first, separated by a newline when both sides carry text.
fn join_parts(initial: &str, response: &str) -> String {
    let initial = initial.trim();
    let response = response.trim();
    match (initial.is_empty(), response.is_empty()) {
        (false, false) => format!("{initial}\n{response}"),
        (false, true) => initial.to_string(),
        _ => response.to_string(),
    }
}

/// Normalise line endings, drop control characters other than `\n` and `\t`, and trim.
pub fn clean_banner(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Cap a banner at [`MAX_BANNER_CHARS`] characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_banner(banner: &str) -> String {
    if banner.chars().count() <= MAX_BANNER_CHARS {
        return banner.to_string();
    }
    let mut out: String = banner.chars().take(MAX_BANNER_CHARS).collect();
    out.push_str(ELLIPSIS);
    out
}
