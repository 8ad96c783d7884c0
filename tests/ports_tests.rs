use portxor_rs::ports::parse_port_range;
use portxor_rs::{ScanMode, ScanRequest, ValidationError};

#[test]
fn parse_single_and_range() {
    assert_eq!(parse_port_range("22").expect("parse ok"), (22, 22));
    assert_eq!(parse_port_range("20-25").expect("parse ok"), (20, 25));
}

#[test]
fn invalid_port_rejected() {
    assert!(parse_port_range("0").is_err());
    assert!(parse_port_range("65536").is_err());
    assert!(parse_port_range("80-").is_err());
}

#[test]
fn request_rejects_reversed_range() {
    let err = ScanRequest::new("127.0.0.1", 100, 20, ScanMode::Tcp).unwrap_err();
    assert_eq!(err, ValidationError::InvalidRange { start: 100, end: 20 });
}

#[test]
fn request_rejects_empty_target_and_out_of_range_ports() {
    assert_eq!(
        ScanRequest::new("   ", 1, 10, ScanMode::Tcp).unwrap_err(),
        ValidationError::EmptyTarget
    );
    assert_eq!(
        ScanRequest::new("localhost", 1, 70_000, ScanMode::Udp).unwrap_err(),
        ValidationError::PortOutOfRange { value: 70_000 }
    );
}

#[test]
fn request_port_count_is_inclusive() {
    let req = ScanRequest::new("localhost", 20, 25, ScanMode::Tcp).unwrap();
    assert_eq!(req.port_count(), 6);
    let full = ScanRequest::new("localhost", 1, 65535, ScanMode::Tcp).unwrap();
    assert_eq!(full.port_count(), 65535);
}
