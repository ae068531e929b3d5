//! Motion sample records
//!
//! One record per line: two floating-point numbers separated by whitespace.
//!
//! ```text
//! 0.0005 -0.0002\n
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::error::{diagnostic_line, ProtocolError, Result};

/// Relative displacement reported by the device, in pose units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionSample {
    /// Horizontal component
    pub dx: f64,
    /// Vertical component
    pub dy: f64,
}

impl MotionSample {
    /// Create a sample
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// True when both components are finite
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

/// Render a sample as one wire record, newline included
///
/// `Debug` formatting gives the shortest representation that parses back
/// to the same `f64` and always keeps a decimal point (`0.0`, not `0`).
pub fn format_record(sample: &MotionSample) -> String {
    format!("{:?} {:?}\n", sample.dx, sample.dy)
}

/// Parse one line (without its newline) into a sample
pub fn parse_record(line: &str) -> Result<MotionSample> {
    let mut tokens = line.split_whitespace();

    let (first, second) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => {
            return Err(ProtocolError::WrongTokenCount {
                count: line.split_whitespace().count(),
                line: diagnostic_line(line),
            })
        }
    };

    let dx = parse_token(first, line)?;
    let dy = parse_token(second, line)?;

    let sample = MotionSample::new(dx, dy);
    if !sample.is_finite() {
        return Err(ProtocolError::NonFinite {
            line: diagnostic_line(line),
        });
    }

    Ok(sample)
}

fn parse_token(token: &str, line: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| ProtocolError::InvalidNumber {
            token: diagnostic_line(token),
            line: diagnostic_line(line),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        assert_eq!(
            parse_record("0.0005 -0.0002").unwrap(),
            MotionSample::new(0.0005, -0.0002)
        );
        // Surrounding and repeated whitespace is tolerated
        assert_eq!(
            parse_record("  1.5\t\t-2  \r").unwrap(),
            MotionSample::new(1.5, -2.0)
        );
        assert_eq!(
            parse_record("1e-7 3").unwrap(),
            MotionSample::new(1e-7, 3.0)
        );
    }

    #[test]
    fn test_parse_wrong_token_count() {
        for (line, expected) in [("", 0), ("   ", 0), ("1.0", 1), ("1 2 3", 3)] {
            match parse_record(line) {
                Err(ProtocolError::WrongTokenCount { count, .. }) => assert_eq!(count, expected),
                other => panic!("Expected WrongTokenCount for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_parse_invalid_number() {
        match parse_record("0.1 abc") {
            Err(ProtocolError::InvalidNumber { token, .. }) => assert_eq!(token, "abc"),
            other => panic!("Expected InvalidNumber, got {:?}", other),
        }
        assert!(matches!(
            parse_record("1,5 2"),
            Err(ProtocolError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        for line in ["NaN 0", "0 inf", "-infinity 1"] {
            assert!(
                matches!(parse_record(line), Err(ProtocolError::NonFinite { .. })),
                "{:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_format_keeps_decimal_point() {
        assert_eq!(format_record(&MotionSample::new(0.0, 0.0)), "0.0 0.0\n");
        assert_eq!(
            format_record(&MotionSample::new(0.0005, -0.0002)),
            "0.0005 -0.0002\n"
        );
    }

    #[test]
    fn test_format_then_parse_is_exact() {
        let samples = [
            MotionSample::new(0.1 + 0.2, -1.0 / 3.0),
            MotionSample::new(1e-12, 123456.789),
            MotionSample::new(-0.0, f64::MIN_POSITIVE),
        ];
        for sample in samples {
            let line = format_record(&sample);
            let parsed = parse_record(line.trim_end_matches('\n')).unwrap();
            assert_eq!(parsed, sample);
        }
    }
}
