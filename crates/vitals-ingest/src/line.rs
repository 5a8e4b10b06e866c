//! Line-delimited text adapter for serial/USB transports.
//!
//! Consumes raw byte chunks from a continuous stream, frames them on
//! `\r\n`, and parses each complete line with two strategies:
//!
//! 1. structured JSON object parse
//! 2. fixed-arity CSV positional fallback:
//!    `heartRate,spo2,temperatureC,temperatureF`
//!
//! Partial lines stay buffered until their delimiter arrives. A malformed
//! line yields a [`ParseError`] and the stream continues.

use crate::ParseError;
use vitals_core::CandidateReading;

/// Line delimiter used by device firmware.
const DELIMITER: &[u8] = b"\r\n";

/// CSV fallback requires at least this many tokens.
const CSV_MIN_TOKENS: usize = 4;

/// Cap on buffered bytes while waiting for a delimiter. Anything beyond
/// this without a line break is garbage (wrong baud rate, binary noise)
/// and gets discarded.
const MAX_LINE_BYTES: usize = 8192;

/// Stateful framer + parser for one line-oriented connection.
#[derive(Debug, Default)]
pub struct LineAdapter {
    buf: Vec<u8>,
}

impl LineAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, yielding one result per complete line.
    ///
    /// Empty lines are skipped. Errors are per-line: the adapter keeps
    /// framing subsequent input regardless of earlier failures.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Result<CandidateReading, ParseError>> {
        self.buf.extend_from_slice(chunk);

        let mut results = Vec::new();
        while let Some(pos) = find_delimiter(&self.buf) {
            let line: Vec<u8> = self.buf.drain(..pos + DELIMITER.len()).collect();
            let text = String::from_utf8_lossy(&line[..pos]);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            results.push(parse_line(trimmed));
        }

        if self.buf.len() > MAX_LINE_BYTES {
            let dropped = self.buf.len();
            self.buf.clear();
            results.push(Err(ParseError::LineTooLong(dropped)));
        }

        results
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

/// Parse one complete line: JSON object first, CSV fallback second.
pub fn parse_line(line: &str) -> Result<CandidateReading, ParseError> {
    if let Ok(candidate) = serde_json::from_str::<CandidateReading>(line) {
        return Ok(candidate);
    }
    parse_csv(line)
}

/// Fixed-arity positional fallback: `heartRate,spo2,temperatureC,temperatureF`.
///
/// Succeeds only with at least four tokens; a malformed numeric token
/// fails the whole fallback rather than coercing to zero.
fn parse_csv(line: &str) -> Result<CandidateReading, ParseError> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() < CSV_MIN_TOKENS {
        return Err(ParseError::Unparseable(line.to_string()));
    }

    Ok(CandidateReading {
        heart_rate: Some(parse_int(tokens[0])?),
        spo2: Some(parse_int(tokens[1])?),
        temperature_c: Some(parse_float(tokens[2])?),
        temperature_f: Some(parse_float(tokens[3])?),
        ..Default::default()
    })
}

fn parse_int(token: &str) -> Result<i64, ParseError> {
    token.trim().parse().map_err(|_| ParseError::BadNumber {
        token: token.to_string(),
    })
}

fn parse_float(token: &str) -> Result<f64, ParseError> {
    token.trim().parse().map_err(|_| ParseError::BadNumber {
        token: token.to_string(),
    })
}
