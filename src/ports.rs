use crate::error::ValidationError;

/// Parse a command-line port argument into an inclusive `(start, end)` range.
///
/// Supported forms:
/// - single port number: `80`
/// - inclusive range: `20-80`
///
/// Surrounding whitespace is ignored. Values must lie in 1..=65535 and
/// `start` must not exceed `end`.
pub fn parse_port_range(s: &str) -> Result<(u16, u16), ValidationError> {
    let spec = s.trim();
    if spec.is_empty() {
        return Err(ValidationError::InvalidPortSpec {
            spec: s.to_string(),
        });
    }

    if let Some((a, b)) = spec.split_once('-') {
        let start = parse_port_str(a.trim(), spec)?;
        let end = parse_port_str(b.trim(), spec)?;
        return validate_range(start, end);
    }

    let p = parse_port_str(spec, spec)?;
    validate_range(p, p)
}

/// Check an inclusive range of raw integers and narrow it to `u16`.
pub fn validate_range(start: u32, end: u32) -> Result<(u16, u16), ValidationError> {
    for value in [start, end] {
        if value == 0 || value > 65535 {
            return Err(ValidationError::PortOutOfRange { value });
        }
    }
    if start > end {
        return Err(ValidationError::InvalidRange { start, end });
    }
    Ok((start as u16, end as u16))
}

fn parse_port_str(s: &str, spec: &str) -> Result<u32, ValidationError> {
    s.parse::<u32>()
        .map_err(|_| ValidationError::InvalidPortSpec {
            spec: spec.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_port() {
        assert_eq!(parse_port_range("80").unwrap(), (80, 80));
        assert_eq!(parse_port_range("  443 ").unwrap(), (443, 443));
    }

    #[test]
    fn parse_inclusive_range() {
        assert_eq!(parse_port_range("20-80").unwrap(), (20, 80));
        assert_eq!(parse_port_range("1 - 65535").unwrap(), (1, 65535));
    }

    #[test]
    fn reversed_range_rejected() {
        let err = parse_port_range("100-20").unwrap_err();
        assert_eq!(err, ValidationError::InvalidRange { start: 100, end: 20 });
    }

    #[test]
    fn out_of_range_values_error() {
        assert_eq!(
            parse_port_range("70000").unwrap_err(),
            ValidationError::PortOutOfRange { value: 70000 }
        );
        assert_eq!(
            parse_port_range("0-10").unwrap_err(),
            ValidationError::PortOutOfRange { value: 0 }
        );
    }

    #[test]
    fn garbage_is_invalid_spec() {
        assert!(matches!(
            parse_port_range("http"),
            Err(ValidationError::InvalidPortSpec { .. })
        ));
        assert!(matches!(
            parse_port_range("80,443"),
            Err(ValidationError::InvalidPortSpec { .. })
        ));
        assert!(matches!(
            parse_port_range(""),
            Err(ValidationError::InvalidPortSpec { .. })
        ));
    }
}
