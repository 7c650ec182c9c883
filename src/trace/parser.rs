//! Register Trace Parser
//!
//! Parses text register logs, one write per line:
//! `<clock> <register> <value>` as decimal integers.
//!
//! In `delta` mode (VICE sound dump) the clock column is the cycle count
//! since the previous write; absolute clocks are the running sum, rebased so
//! the first write lands on clock 0. In `absolute` mode the column is taken
//! verbatim and must not decrease.

use std::io::BufRead;

use super::{RegisterWrite, TraceClock};
use crate::sid::REGISTER_COUNT;
use crate::{Result, SidError};

/// Register trace parser
#[derive(Debug, Clone)]
pub struct TraceParser {
    clock_mode: TraceClock,
}

impl TraceParser {
    /// Create a parser for a clock encoding
    pub fn new(clock_mode: TraceClock) -> Self {
        TraceParser { clock_mode }
    }

    /// Parse a whole trace held in memory
    pub fn parse_str(&self, text: &str) -> Result<Vec<RegisterWrite>> {
        self.parse_lines(text.lines().map(|line| Ok(line.to_string())))
    }

    /// Parse a trace from a buffered reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Vec<RegisterWrite>> {
        self.parse_lines(reader.lines().map(|line| line.map_err(SidError::from)))
    }

    fn parse_lines<I>(&self, lines: I) -> Result<Vec<RegisterWrite>>
    where
        I: Iterator<Item = Result<String>>,
    {
        let mut writes = Vec::new();
        let mut elapsed = 0u64;
        let mut last_clock: Option<u64> = None;

        for (index, line) in lines.enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let line_no = index + 1;
            let (raw_clock, register, value) = Self::parse_fields(line_no, trimmed)?;

            let clock = match self.clock_mode {
                TraceClock::Delta => {
                    if last_clock.is_some() {
                        elapsed = elapsed.checked_add(raw_clock).ok_or_else(|| {
                            parse_error(line_no, trimmed, "clock overflows 64 bits".to_string())
                        })?;
                    }
                    elapsed
                }
                TraceClock::Absolute => {
                    if let Some(previous) = last_clock {
                        if raw_clock < previous {
                            return Err(parse_error(
                                line_no,
                                trimmed,
                                format!("clock {} goes back from {}", raw_clock, previous),
                            ));
                        }
                    }
                    raw_clock
                }
            };
            last_clock = Some(clock);
            writes.push(RegisterWrite {
                clock,
                register,
                value,
            });
        }

        Ok(writes)
    }

    /// Split and range-check the three columns of one line
    fn parse_fields(line_no: usize, line: &str) -> Result<(u64, u8, u8)> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(parse_error(
                line_no,
                line,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        }

        let clock = fields[0]
            .parse::<u64>()
            .map_err(|e| parse_error(line_no, line, format!("bad clock: {}", e)))?;
        let register = fields[1]
            .parse::<u8>()
            .map_err(|e| parse_error(line_no, line, format!("bad register: {}", e)))?;
        if register as usize >= REGISTER_COUNT {
            return Err(parse_error(
                line_no,
                line,
                format!("register {} out of range 0-{}", register, REGISTER_COUNT - 1),
            ));
        }
        let value = fields[2]
            .parse::<u8>()
            .map_err(|e| parse_error(line_no, line, format!("bad value: {}", e)))?;

        Ok((clock, register, value))
    }
}

impl Default for TraceParser {
    fn default() -> Self {
        Self::new(TraceClock::default())
    }
}

fn parse_error(line: usize, content: &str, reason: String) -> SidError {
    SidError::Parse {
        line,
        content: content.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "1 24 15\n1 7 255\n1 8 128\n1 13 255\n100 11 129\n100000 11 0\n";

    #[test]
    fn test_delta_clocks_are_rebased_running_sums() {
        let writes = TraceParser::default().parse_str(TRACE).unwrap();
        let clocks: Vec<u64> = writes.iter().map(|w| w.clock).collect();
        assert_eq!(clocks, vec![0, 1, 2, 3, 103, 100_103]);
        assert_eq!(writes[4].register, 11);
        assert_eq!(writes[4].value, 129);
    }

    #[test]
    fn test_absolute_clocks() {
        let writes = TraceParser::new(TraceClock::Absolute)
            .parse_str("5 0 1\n5 1 2\n9 4 17\n")
            .unwrap();
        let clocks: Vec<u64> = writes.iter().map(|w| w.clock).collect();
        assert_eq!(clocks, vec![5, 5, 9]);
    }

    #[test]
    fn test_absolute_regression_rejected() {
        let result = TraceParser::new(TraceClock::Absolute).parse_str("9 0 1\n5 0 2\n");
        assert!(matches!(result, Err(SidError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let writes = TraceParser::default()
            .parse_str("# header\n\n1 0 1\n")
            .unwrap();
        assert_eq!(writes.len(), 1);
    }

    #[test]
    fn test_malformed_lines() {
        let parser = TraceParser::default();
        assert!(matches!(
            parser.parse_str("1 2\n"),
            Err(SidError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parser.parse_str("1 0 1\nx 0 1\n"),
            Err(SidError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parser.parse_str("1 25 1\n"),
            Err(SidError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parser.parse_str("1 0 256\n"),
            Err(SidError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_delta_overflow() {
        let text = format!("1 0 1\n{} 0 2\n1 0 3\n", u64::MAX);
        let result = TraceParser::default().parse_str(&text);
        assert!(matches!(result, Err(SidError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_parse_reader() {
        let writes = TraceParser::default()
            .parse_reader(std::io::Cursor::new(TRACE))
            .unwrap();
        assert_eq!(writes.len(), 6);
    }
}
