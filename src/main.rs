use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use portxor_rs::logging::{self, LogConfig, LogFormat};
use portxor_rs::{ports, report, ScanConfig, ScanError, ScanMode, ScanRequest, ScanResult, Scanner};

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// portxor: concurrent TCP/UDP port scanner with banner grabbing and a TTL-based OS guess.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "portxor",
    version,
    about = "Concurrent TCP/UDP port scanner with banner grabbing and a TTL-based OS guess.",
    long_about = None
)]
struct Cli {
    /// Target host name or IP address.
    #[arg(short, long)]
    target: String,

    /// Port or inclusive port range (e.g. 80 or 20-80).
    #[arg(short, long, default_value = "1-65535")]
    ports: String,

    /// Scan strategy. SYN is accepted but reports every port closed.
    #[arg(short = 's', long = "scan-type", value_enum, default_value_t = ScanMode::Tcp)]
    scan_type: ScanMode,

    /// Per-port probe timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Banner grab connect timeout in milliseconds.
    #[arg(long = "banner-timeout-ms", default_value_t = 3000)]
    banner_timeout_ms: u64,

    /// Echo reply wait for the OS heuristic in milliseconds.
    #[arg(long = "os-timeout-ms", default_value_t = 1000)]
    os_timeout_ms: u64,

    /// Max concurrent probes.
    #[arg(long, default_value_t = 1000)]
    concurrency: usize,

    /// Skip banner grabbing.
    #[arg(long = "no-banners", default_value_t = false)]
    no_banners: bool,

    /// Skip the OS heuristic.
    #[arg(long = "no-os", default_value_t = false)]
    no_os: bool,

    /// Directory for the text report.
    #[arg(long = "report-dir", default_value = "reports")]
    report_dir: PathBuf,

    /// Do not write a text report.
    #[arg(long = "no-report", default_value_t = false)]
    no_report: bool,

    /// Write results as pretty JSON to this path (optional). Includes total ports and duration.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG).
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Include the module path in log lines.
    #[arg(long = "log-target", default_value_t = false)]
    log_target: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut log_config = LogConfig::new()
        .level(cli.log_level.clone())
        .format(cli.log_format);
    if cli.log_target {
        log_config = log_config.with_target();
    }
    logging::init_logging_with_config(log_config);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let validation = e
                .downcast_ref::<ScanError>()
                .is_some_and(ScanError::is_validation)
                || e.downcast_ref::<portxor_rs::ValidationError>().is_some();
            eprintln!("Error: {e:#}");
            if validation {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (start, end) = ports::parse_port_range(&cli.ports)?;
    let request = ScanRequest::new(&cli.target, u32::from(start), u32::from(end), cli.scan_type)?;

    let config = ScanConfig::new()
        .with_probe_timeout(Duration::from_millis(cli.timeout_ms))
        .with_banner_timeout(Duration::from_millis(cli.banner_timeout_ms))
        .with_os_timeout(Duration::from_millis(cli.os_timeout_ms))
        .with_concurrency(cli.concurrency)
        .with_banners(!cli.no_banners)
        .with_os_detection(!cli.no_os);

    println!("portxor configuration:");
    println!("  target       : {}", request.target);
    println!("  ports        : {}-{}", request.start_port, request.end_port);
    println!("  scan type    : {}", request.mode);
    println!("  concurrency  : {}", config.effective_concurrency());
    println!("  timeout_ms   : {}", cli.timeout_ms);

    // Ctrl-C cancels the scan.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let scanner = Scanner::new(config);
    let results = scanner.scan_with_cancel(&request, cancel).await?;

    for note in &results.advisories {
        println!("\nNote: {note}");
    }
    println!();
    print!("{}", report::render_table(&results));
    print_summary(&results);

    if !cli.no_report {
        let path = report::write_text_report(&cli.report_dir, &results)?;
        println!("Report saved to: {}", path.display());
    }
    if let Some(path) = cli.output.as_deref() {
        report::write_json(path, &results)?;
        println!("Wrote JSON results to {}", path.display());
    }
    Ok(())
}

fn print_summary(results: &ScanResult) {
    println!(
        "\nSummary: {} open port(s) found out of {} scanned",
        results.open_count(),
        results.total_ports_scanned()
    );
    println!("Duration: {:.2} seconds", results.duration().as_secs_f64());
    println!("Detected OS: {}", results.detected_os);
    if results.cancelled {
        println!("Scan was cancelled; results are partial.");
    }
}
