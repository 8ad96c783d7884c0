use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::types::ScanResult;

const RULE_WIDTH: usize = 70;
const TABLE_BANNER_WIDTH: usize = 60;

fn fmt_human(ts: OffsetDateTime) -> String {
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| String::from("1970-01-01 00:00:00"))
}

fn fmt_compact(ts: OffsetDateTime) -> String {
    ts.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))
    .unwrap_or_else(|_| String::from("19700101_000000"))
}

/// First line of a banner, cut to `width` characters.
fn banner_snippet(banner: Option<&str>, width: usize) -> String {
    banner
        .and_then(|b| b.lines().next())
        .map(|line| line.chars().take(width).collect())
        .unwrap_or_default()
}

/// Terminal table of open ports with a one-line summary.
pub fn render_table(result: &ScanResult) -> String {
    let port_w = 5usize;
    let proto_w = "protocol".len();
    let mut banner_w = "banner".len();
    for o in &result.open_ports {
        let snip = banner_snippet(o.banner.as_deref(), TABLE_BANNER_WIDTH);
        banner_w = banner_w.max(snip.chars().count());
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Open ports: {} (scanned: {})",
        result.open_count(),
        result.total_ports_scanned()
    );
    if result.open_ports.is_empty() {
        return out;
    }
    let _ = writeln!(
        out,
        "{:>port_w$}  {:<proto_w$}  {:<banner_w$}",
        "port", "protocol", "banner"
    );
    let _ = writeln!(out, "{:-<port_w$}  {:-<proto_w$}  {:-<banner_w$}", "", "", "");
    let mut rows: Vec<_> = result.open_ports.iter().collect();
    rows.sort_by_key(|o| o.port);
    for o in rows {
        let snip = banner_snippet(o.banner.as_deref(), TABLE_BANNER_WIDTH);
        let line = format!(
            "{:>port_w$}  {:<proto_w$}  {:<banner_w$}",
            o.port,
            o.protocol.to_string(),
            snip
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Plain-text report body in the fixed-width layout written to disk.
pub fn render_text_report(result: &ScanResult, generated_at: OffsetDateTime) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut sb = String::new();

    let _ = writeln!(sb, "{heavy}");
    let _ = writeln!(sb, "PortXOR Scan Report");
    let _ = writeln!(sb, "{heavy}");
    let _ = writeln!(sb);
    let _ = writeln!(sb, "Target: {}", result.target);
    let _ = writeln!(sb, "Scan Type: {}", result.mode);
    let _ = writeln!(sb, "Port Range: {} - {}", result.start_port, result.end_port);
    let _ = writeln!(sb, "Total Ports Scanned: {}", result.total_ports_scanned());
    let _ = writeln!(sb, "Start Time: {}", fmt_human(result.started_at));
    let _ = writeln!(sb, "End Time: {}", fmt_human(result.finished_at));
    let _ = writeln!(sb, "Duration: {:.2} seconds", result.duration().as_secs_f64());
    let _ = writeln!(sb, "Detected OS: {}", result.detected_os);
    for note in &result.advisories {
        let _ = writeln!(sb, "Note: {note}");
    }
    if result.cancelled {
        let _ = writeln!(sb, "Note: scan was cancelled before completion");
    }
    let _ = writeln!(sb);
    let _ = writeln!(sb, "{light}");

    if result.open_ports.is_empty() {
        let _ = writeln!(sb, "No open ports found.");
    } else {
        let _ = writeln!(sb, "OPEN PORTS ({}):", result.open_count());
        let _ = writeln!(sb, "{light}");
        let _ = writeln!(sb, "{:<10} {:<10} {:<50}", "Port", "Protocol", "Banner");
        let _ = writeln!(sb, "{light}");

        let mut rows: Vec<_> = result.open_ports.iter().collect();
        rows.sort_by_key(|o| o.port);
        for o in rows {
            let banner = o.banner.as_deref().filter(|b| !b.is_empty()).unwrap_or("N/A");
            let _ = writeln!(
                sb,
                "{:<10} {:<10} {:<50}",
                o.port,
                o.protocol.to_string(),
                banner
            );
        }
    }

    let _ = writeln!(sb);
    let _ = writeln!(sb, "{heavy}");
    let _ = writeln!(sb, "Report generated: {}", fmt_human(generated_at));
    let _ = writeln!(sb, "{heavy}");
    sb
}

/// File name used for a report on `target` generated at `ts`.
pub fn report_file_name(target: &str, ts: OffsetDateTime) -> String {
    let safe: String = target
        .chars()
        .map(|c| if c == '.' || c == ':' || c == '/' { '_' } else { c })
        .collect();
    format!("PortXOR_Report_{}_{}.txt", safe, fmt_compact(ts))
}

/// Write the text report into `dir`, creating it if needed. Returns the file path.
pub fn write_text_report(dir: &Path, result: &ScanResult) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory: {}", dir.display()))?;
    let now = OffsetDateTime::now_utc();
    let path = dir.join(report_file_name(&result.target, now));
    fs::write(&path, render_text_report(result, now))
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(path)
}

/// JSON shape of a result: the stored fields plus the derived totals.
#[derive(Serialize, Debug)]
pub struct ResultDocument<'a> {
    #[serde(flatten)]
    pub result: &'a ScanResult,
    pub total_ports_scanned: u32,
    pub open_count: usize,
    pub duration_secs: f64,
}

impl<'a> From<&'a ScanResult> for ResultDocument<'a> {
    fn from(result: &'a ScanResult) -> Self {
        Self {
            result,
            total_ports_scanned: result.total_ports_scanned(),
            open_count: result.open_count(),
            duration_secs: result.duration().as_secs_f64(),
        }
    }
}

/// Write results as pretty JSON.
pub fn write_json(path: &Path, result: &ScanResult) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create JSON output: {}", path.display()))?;
    serde_json::to_writer_pretty(file, &ResultDocument::from(result))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OsGuess, PortOutcome, Protocol, ScanMode};
    use time::macros::datetime;

    fn sample() -> ScanResult {
        let mut ssh = PortOutcome::open(22, Protocol::Tcp);
        ssh.banner = Some("SSH-2.0-OpenSSH_9.6\nsecond line".into());
        ScanResult {
            target: "10.0.0.5".into(),
            start_port: 20,
            end_port: 25,
            mode: ScanMode::Tcp,
            started_at: datetime!(2024-03-01 12:00:00 UTC),
            finished_at: datetime!(2024-03-01 12:00:01.5 UTC),
            open_ports: vec![PortOutcome::open(25, Protocol::Tcp), ssh],
            detected_os: OsGuess::LinuxUnix,
            advisories: Vec::new(),
            cancelled: false,
        }
    }

    #[test]
    fn text_report_has_summary_and_sorted_rows() {
        let text = render_text_report(&sample(), datetime!(2024-03-01 12:00:02 UTC));
        assert!(text.contains("Target: 10.0.0.5"));
        assert!(text.contains("Scan Type: TCP"));
        assert!(text.contains("Port Range: 20 - 25"));
        assert!(text.contains("Total Ports Scanned: 6"));
        assert!(text.contains("Start Time: 2024-03-01 12:00:00"));
        assert!(text.contains("Duration: 1.50 seconds"));
        assert!(text.contains("Detected OS: Linux/Unix"));
        assert!(text.contains("OPEN PORTS (2):"));

        let p22 = text.find("22         TCP").unwrap();
        let p25 = text.find("25         TCP        N/A").unwrap();
        assert!(p22 < p25);
    }

    #[test]
    fn text_report_without_open_ports() {
        let mut r = sample();
        r.open_ports.clear();
        let text = render_text_report(&r, datetime!(2024-03-01 12:00:02 UTC));
        assert!(text.contains("No open ports found."));
        assert!(!text.contains("OPEN PORTS"));
    }

    #[test]
    fn table_shows_first_banner_line_only() {
        let table = render_table(&sample());
        assert!(table.starts_with("Open ports: 2 (scanned: 6)"));
        assert!(table.contains("SSH-2.0-OpenSSH_9.6"));
        assert!(!table.contains("second line"));
        assert!(table.find("   22  TCP").unwrap() < table.find("   25  TCP").unwrap());
    }

    #[test]
    fn report_name_is_filesystem_safe() {
        let name = report_file_name("192.168.1.1", datetime!(2024-03-01 09:05:07 UTC));
        assert_eq!(name, "PortXOR_Report_192_168_1_1_20240301_090507.txt");
        assert!(!report_file_name("::1", datetime!(2024-03-01 09:05:07 UTC)).contains(':'));
    }

    #[test]
    fn json_document_carries_derived_totals() {
        let r = sample();
        let doc = serde_json::to_value(ResultDocument::from(&r)).unwrap();
        assert_eq!(doc["total_ports_scanned"], 6);
        assert_eq!(doc["open_count"], 2);
        assert_eq!(doc["duration_secs"], 1.5);
        assert_eq!(doc["target"], "10.0.0.5");
        assert_eq!(doc["open_ports"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn write_json_is_readable_back() {
        let path = std::env::temp_dir().join(format!("portxor_json_{}.json", std::process::id()));
        write_json(&path, &sample()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["total_ports_scanned"], 6);
        assert_eq!(doc["detected_os"], "Linux/Unix");
    }

    #[test]
    fn json_uses_display_labels() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"detected_os\":\"Linux/Unix\""));
        assert!(json.contains("\"protocol\":\"TCP\""));
        assert!(json.contains("\"mode\":\"tcp\""));
    }
}
