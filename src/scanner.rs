use crate::banner::BannerProber;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::os::{OsProbe, PingOsDetector};
use crate::probe::{NetProber, PortProbe};
use crate::types::{OsGuess, PortOutcome, ScanMode, ScanRequest, ScanResult};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::lookup_host;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ::time::OffsetDateTime;

pub const SYN_ADVISORY: &str =
    "SYN scan requires privileged raw-socket access, which this scanner does not provide; all ports reported closed";

/// Scan `target` over `[start_port, end_port]` with the default network probers.
pub async fn run_scan(
    target: &str,
    start_port: u32,
    end_port: u32,
    mode: ScanMode,
) -> Result<ScanResult, ScanError> {
    let request = ScanRequest::new(target, start_port, end_port, mode)?;
    Scanner::new(ScanConfig::default()).scan(&request).await
}

/// Concurrent scan engine.
///
/// Phase order is strict: all port probes, then banner grabs for open TCP
/// ports, then one OS heuristic.
pub struct Scanner<P = NetProber, O = PingOsDetector> {
    config: ScanConfig,
    prober: Arc<P>,
    banner: Arc<BannerProber>,
    os: O,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let banner = BannerProber::new().with_connect_timeout(config.banner_timeout);
        let os = PingOsDetector::new(config.os_timeout);
        Self::with_parts(config, NetProber, banner, os)
    }
}

impl<P: PortProbe, O: OsProbe> Scanner<P, O> {
    pub fn with_parts(config: ScanConfig, prober: P, banner: BannerProber, os: O) -> Self {
        Self {
            config,
            prober: Arc::new(prober),
            banner: Arc::new(banner),
            os,
        }
    }

    /// Run a full scan. Only validation and target resolution can fail.
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        self.scan_with_cancel(request, CancellationToken::new()).await
    }

    /// Variant that accepts a `CancellationToken` to allow external cancellation.
    ///
    /// Ports not yet probed when the token fires are left out of the result.
    pub async fn scan_with_cancel(
        &self,
        request: &ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        request.validate()?;
        let ip = resolve_target(&request.target).await?;

        let started_at = OffsetDateTime::now_utc();
        info!(
            target = %request.target,
            %ip,
            mode = %request.mode,
            start = request.start_port,
            end = request.end_port,
            "starting scan"
        );

        let mut advisories = Vec::new();
        let mut open_ports = match request.mode {
            ScanMode::Syn => {
                warn!("{SYN_ADVISORY}");
                advisories.push(SYN_ADVISORY.to_string());
                Vec::new()
            }
            ScanMode::Tcp | ScanMode::Udp => self.probe_range(ip, request, &cancel).await,
        };

        if self.config.grab_banners && !open_ports.is_empty() && !cancel.is_cancelled() {
            info!(open = open_ports.len(), "grabbing banners");
            self.grab_banners(ip, &mut open_ports).await;
        }

        let detected_os = if self.config.detect_os && !cancel.is_cancelled() {
            self.os.detect(ip).await
        } else {
            OsGuess::Unknown
        };

        let finished_at = OffsetDateTime::now_utc();
        let result = ScanResult {
            target: request.target.clone(),
            start_port: request.start_port,
            end_port: request.end_port,
            mode: request.mode,
            started_at,
            finished_at,
            open_ports,
            detected_os,
            advisories,
            cancelled: cancel.is_cancelled(),
        };
        info!(
            open = result.open_count(),
            total = result.total_ports_scanned(),
            os = %result.detected_os,
            elapsed_ms = result.duration().as_millis() as u64,
            "scan finished"
        );
        Ok(result)
    }

    /// Fan out one probe per port under the concurrency ceiling, join, keep the open ones sorted.
    async fn probe_range(
        &self,
        ip: IpAddr,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Vec<PortOutcome> {
        let protocol = request.mode.protocol();
        let timeout = self.config.probe_timeout;
        let sem = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut set = JoinSet::new();

        for port in request.start_port..=request.end_port {
            if cancel.is_cancelled() {
                break;
            }
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };
            let prober = Arc::clone(&self.prober);
            let cancel = cancel.clone();

            set.spawn(async move {
                let _permit = permit; // keep permit until task completes
                if cancel.is_cancelled() {
                    return None;
                }
                Some(prober.probe(ip, port, protocol, timeout).await)
            });
        }

        let mut open = Vec::new();
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Some(outcome)) if outcome.open => {
                    debug!(port = outcome.port, protocol = %outcome.protocol, "port open");
                    open.push(outcome);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "probe task failed; port treated as closed"),
            }
        }

        open.sort_by_key(|o| o.port);
        open.dedup_by_key(|o| o.port);
        open
    }

    /// Attach banners to open TCP outcomes. Failures leave the banner unset.
    async fn grab_banners(&self, ip: IpAddr, open_ports: &mut [PortOutcome]) {
        let sem = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut set = JoinSet::new();

        for (idx, outcome) in open_ports.iter().enumerate() {
            let Ok(permit) = sem.clone().acquire_owned().await else {
                break;
            };
            let banner = Arc::clone(&self.banner);
            let (port, protocol) = (outcome.port, outcome.protocol);
            set.spawn(async move {
                let _permit = permit;
                (idx, banner.grab(ip, port, protocol).await)
            });
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok((idx, text)) if !text.is_empty() => open_ports[idx].banner = Some(text),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "banner task failed"),
            }
        }
    }
}

/// Resolve a host name or literal address. IPv4 results win over IPv6 ones.
pub async fn resolve_target(target: &str) -> Result<IpAddr, ScanError> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs = lookup_host((target, 0))
        .await
        .map_err(|source| ScanError::Resolve {
            target: target.to_string(),
            source,
        })?;
    pick_address(addrs.map(|sa| sa.ip())).ok_or_else(|| ScanError::NoAddress {
        target: target.to_string(),
    })
}

/// First IPv4 address, else the first address of any family.
///
/// `localhost` commonly resolves to `::1` before `127.0.0.1`.
pub fn pick_address(addrs: impl IntoIterator<Item = IpAddr>) -> Option<IpAddr> {
    let mut first = None;
    for ip in addrs {
        if ip.is_ipv4() {
            return Some(ip);
        }
        first.get_or_insert(ip);
    }
    first
}
