use std::time::Duration;

use portxor_rs::os::{classify_ttl, parse_ttl, OsProbe, PingOsDetector, DEFAULT_TTL};
use portxor_rs::OsGuess;

#[test]
fn simulated_replies_classify_by_ttl() {
    assert_eq!(classify_ttl(64), OsGuess::LinuxUnix);
    assert_eq!(classify_ttl(100), OsGuess::Windows);
    assert_eq!(classify_ttl(200), OsGuess::Unknown);
}

#[test]
fn reply_without_ttl_field_defaults_to_unix() {
    let ttl = parse_ttl("1 packets transmitted, 1 received").unwrap_or(DEFAULT_TTL);
    assert_eq!(classify_ttl(ttl), OsGuess::LinuxUnix);
}

#[test]
fn labels_match_report_strings() {
    assert_eq!(OsGuess::LinuxUnix.to_string(), "Linux/Unix");
    assert_eq!(OsGuess::Windows.to_string(), "Windows");
    assert_eq!(OsGuess::default().to_string(), "Unknown");
}

#[tokio::test]
async fn unreachable_host_is_unknown() {
    // TEST-NET-1, never answers
    let detector = PingOsDetector::new(Duration::from_millis(300));
    let guess = detector.detect("192.0.2.1".parse().unwrap()).await;
    assert_eq!(guess, OsGuess::Unknown);
}
