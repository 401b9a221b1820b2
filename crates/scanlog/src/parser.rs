//! Line parser for the device's text output.
//!
//! The firmware interleaves structured lines such as
//! `Angle: 45 | Distance: 1.23 m.` with free-form status text
//! (`Moving servo...`, `Stopped.`). Only the structured part is extracted;
//! everything else is [`ParseOutcome::NoMatch`].

use std::sync::OnceLock;

use regex::Regex;

use crate::reading::Measurement;

/// Pattern for a structured measurement, matched anywhere in the line.
///
/// Both numbers take an optional `-` or `+` sign.
const MEASUREMENT_PATTERN: &str =
    r"Angle: ([-+]?\d+) \| Distance: ([-+]?(?:\d+\.?\d*|\.\d+)) m\.";

/// Result of parsing one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseOutcome {
    /// The line carried a measurement.
    Reading(Measurement),
    /// The line is diagnostic noise.
    NoMatch,
}

impl ParseOutcome {
    /// The measurement, if any.
    #[must_use]
    pub fn measurement(self) -> Option<Measurement> {
        match self {
            Self::Reading(measurement) => Some(measurement),
            Self::NoMatch => None,
        }
    }
}

/// Compiled measurement parser.
#[derive(Debug, Clone)]
pub struct LineParser {
    regex: Regex,
}

impl LineParser {
    /// Compile the measurement pattern.
    ///
    /// # Panics
    ///
    /// Panics if the built-in pattern fails to compile, which is a bug.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regex: Regex::new(MEASUREMENT_PATTERN).expect("Invalid measurement pattern"),
        }
    }

    /// Parse one decoded, trimmed line.
    ///
    /// Captured text that does not convert (an angle outside `i64`, a
    /// non-finite distance) counts as no match.
    #[must_use]
    pub fn parse(&self, line: &str) -> ParseOutcome {
        let Some(caps) = self.regex.captures(line) else {
            return ParseOutcome::NoMatch;
        };

        let Ok(angle) = caps[1].parse::<i64>() else {
            return ParseOutcome::NoMatch;
        };
        let distance_m = match caps[2].parse::<f64>() {
            Ok(d) if d.is_finite() => d,
            _ => return ParseOutcome::NoMatch,
        };

        ParseOutcome::Reading(Measurement::new(angle, distance_m))
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a line with a process-wide parser.
#[must_use]
pub fn parse_line(line: &str) -> ParseOutcome {
    static PARSER: OnceLock<LineParser> = OnceLock::new();
    PARSER.get_or_init(LineParser::new).parse(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(angle: i64, distance_m: f64) -> ParseOutcome {
        ParseOutcome::Reading(Measurement::new(angle, distance_m))
    }

    #[test]
    fn test_parse_basic_line() {
        assert_eq!(
            parse_line("Angle: 45 | Distance: 1.23 m."),
            reading(45, 1.23)
        );
    }

    #[test]
    fn test_parse_negative_values() {
        assert_eq!(
            parse_line("Angle: -10 | Distance: -1 m."),
            reading(-10, -1.0)
        );
    }

    #[test]
    fn test_parse_noise() {
        assert_eq!(parse_line("Moving servo..."), ParseOutcome::NoMatch);
        assert_eq!(parse_line("Stopped."), ParseOutcome::NoMatch);
        assert_eq!(parse_line(""), ParseOutcome::NoMatch);
    }

    #[test]
    fn test_parse_unanchored() {
        assert_eq!(
            parse_line("[12345] Angle: 180 | Distance: 0.5 m. (ok)"),
            reading(180, 0.5)
        );
    }

    #[test]
    fn test_parse_explicit_plus_sign() {
        assert_eq!(
            parse_line("Angle: +90 | Distance: +2.0 m."),
            reading(90, 2.0)
        );
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!(parse_line("Angle: 0 | Distance: 5 m."), reading(0, 5.0));
        assert_eq!(parse_line("Angle: 0 | Distance: 5. m."), reading(0, 5.0));
        assert_eq!(parse_line("Angle: 0 | Distance: .5 m."), reading(0, 0.5));
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert_eq!(
            parse_line("Angle: 4.5 | Distance: 1.0 m."),
            ParseOutcome::NoMatch
        );
        assert_eq!(
            parse_line("Angle: 45 | Distance: 1.2.3 m."),
            ParseOutcome::NoMatch
        );
        assert_eq!(
            parse_line("Angle: | Distance: 1.0 m."),
            ParseOutcome::NoMatch
        );
    }

    #[test]
    fn test_parse_requires_exact_separators() {
        assert_eq!(
            parse_line("Angle: 45 / Distance: 1.23 m."),
            ParseOutcome::NoMatch
        );
        assert_eq!(
            parse_line("Angle: 45 | Distance: 1.23 m"),
            ParseOutcome::NoMatch
        );
        assert_eq!(
            parse_line("angle: 45 | distance: 1.23 m."),
            ParseOutcome::NoMatch
        );
    }

    #[test]
    fn test_parse_angle_overflow_is_no_match() {
        let line = "Angle: 99999999999999999999999 | Distance: 1.0 m.";
        assert_eq!(parse_line(line), ParseOutcome::NoMatch);
    }

    #[test]
    fn test_parse_non_finite_distance_is_no_match() {
        let line = format!("Angle: 1 | Distance: {} m.", "9".repeat(400));
        assert_eq!(parse_line(&line), ParseOutcome::NoMatch);
    }

    #[test]
    fn test_parse_takes_first_match() {
        let line = "Angle: 1 | Distance: 1 m. Angle: 2 | Distance: 2 m.";
        assert_eq!(parse_line(line), reading(1, 1.0));
    }

    #[test]
    fn test_parse_skips_malformed_leading_occurrence() {
        // the first well-formed occurrence wins, even if an earlier one is broken
        let line = "Angle: x | Distance: 1 m. Angle: 2 | Distance: 2 m.";
        assert_eq!(parse_line(line), reading(2, 2.0));
    }

    #[test]
    fn test_outcome_measurement() {
        assert_eq!(
            reading(3, 4.0).measurement(),
            Some(Measurement::new(3, 4.0))
        );
        assert_eq!(ParseOutcome::NoMatch.measurement(), None);
    }

    #[test]
    fn test_parser_instance_matches_shared() {
        let parser = LineParser::default();
        for line in [
            "Angle: 45 | Distance: 1.23 m.",
            "Moving servo...",
            "Angle: -10 | Distance: -1 m.",
        ] {
            assert_eq!(parser.parse(line), parse_line(line));
        }
    }

    #[test]
    fn test_parse_exact_for_range() {
        for angle in (-180..=180).step_by(15) {
            for distance in [0.0, 0.25, 1.5, 12.75, -1.0] {
                let line = format!("Angle: {angle} | Distance: {distance} m.");
                assert_eq!(parse_line(&line), reading(angle, distance), "{line}");
            }
        }
    }
}
