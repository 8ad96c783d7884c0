use std::time::Duration;

/// Upper bound for concurrently open sockets.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Tunables for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Deadline for a single TCP connect or UDP reply wait.
    pub probe_timeout: Duration,

    /// Connect deadline used by the banner phase.
    pub banner_timeout: Duration,

    /// Bounded wait for the echo reply used by the OS heuristic.
    pub os_timeout: Duration,

    /// Maximum number of in-flight probes (and banner grabs).
    pub concurrency: usize,

    /// Run the banner phase for open TCP ports.
    pub grab_banners: bool,

    /// Run the TTL-based OS heuristic.
    pub detect_os: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(1000),
            banner_timeout: Duration::from_millis(3000),
            os_timeout: Duration::from_millis(1000),
            concurrency: 1000,
            grab_banners: true,
            detect_os: true,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    pub fn with_os_timeout(mut self, timeout: Duration) -> Self {
        self.os_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_banners(mut self, enabled: bool) -> Self {
        self.grab_banners = enabled;
        self
    }

    pub fn with_os_detection(mut self, enabled: bool) -> Self {
        self.detect_os = enabled;
        self
    }

    /// Concurrency ceiling actually applied to the semaphore.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_probe_contract() {
        let c = ScanConfig::default();
        assert_eq!(c.probe_timeout, Duration::from_millis(1000));
        assert_eq!(c.banner_timeout, Duration::from_millis(3000));
        assert_eq!(c.os_timeout, Duration::from_millis(1000));
        assert!(c.grab_banners && c.detect_os);
    }

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(ScanConfig::new().with_concurrency(0).effective_concurrency(), 1);
        assert_eq!(
            ScanConfig::new().with_concurrency(1_000_000).effective_concurrency(),
            MAX_CONCURRENCY
        );
        assert_eq!(ScanConfig::new().with_concurrency(64).effective_concurrency(), 64);
    }
}
