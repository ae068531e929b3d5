//! Recorded tracking feed
//!
//! Plain-text stand-in for the tracking engine, one event per line:
//!
//! ```text
//! # comment
//! F <id> <x> <y> <z> <r> <g> <b>   feature sighting
//! P <tx> <ty>                      pose tick
//! ```

use thiserror::Error;

/// One line of a feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedEvent {
    /// Feature sighting
    Feature {
        /// Stable identity
        id: i64,
        /// Position
        position: [f32; 3],
        /// Color
        color: [f32; 3],
    },
    /// Pose tick
    Pose {
        /// Horizontal pose
        tx: f64,
        /// Vertical pose
        ty: f64,
    },
}

/// Feed parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Line does not start with a known tag
    #[error("line {line}: unknown event '{tag}'")]
    UnknownEvent {
        /// 1-based line number
        line: usize,
        /// Offending tag
        tag: String,
    },

    /// Wrong number of fields for the tag
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// 1-based line number
        line: usize,
        /// Fields the tag needs
        expected: usize,
        /// Fields present
        found: usize,
    },

    /// Field is not a number
    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber {
        /// 1-based line number
        line: usize,
        /// Offending text
        value: String,
    },
}

fn number<T: std::str::FromStr>(line: usize, value: &str) -> Result<T, FeedError> {
    value.parse().map_err(|_| FeedError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

/// Parse one line; blank lines and comments yield `None`
pub fn parse_feed_line(line_no: usize, line: &str) -> Result<Option<FeedEvent>, FeedError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let arity = |expected: usize| {
        if fields.len() == expected {
            Ok(())
        } else {
            Err(FeedError::FieldCount {
                line: line_no,
                expected,
                found: fields.len(),
            })
        }
    };

    match fields[0] {
        "F" | "f" => {
            arity(8)?;
            let mut values = [0f32; 6];
            for (value, field) in values.iter_mut().zip(&fields[2..]) {
                *value = number(line_no, field)?;
            }
            Ok(Some(FeedEvent::Feature {
                id: number(line_no, fields[1])?,
                position: [values[0], values[1], values[2]],
                color: [values[3], values[4], values[5]],
            }))
        }
        "P" | "p" => {
            arity(3)?;
            Ok(Some(FeedEvent::Pose {
                tx: number(line_no, fields[1])?,
                ty: number(line_no, fields[2])?,
            }))
        }
        tag => Err(FeedError::UnknownEvent {
            line: line_no,
            tag: tag.to_string(),
        }),
    }
}

/// Parse a whole feed, stopping at the first bad line
pub fn parse_feed(text: &str) -> Result<Vec<FeedEvent>, FeedError> {
    let mut events = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(event) = parse_feed_line(i + 1, line)? {
            events.push(event);
        }
    }
    Ok(events)
}
