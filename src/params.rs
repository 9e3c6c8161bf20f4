//! Broadcast parameters and the parsing of the operator's raw input.
//!
//! The control panel collects two kinds of settings:
//!
//! * [`GlobalParams`]: one set of timing values applied to every client
//!   in a broadcast.
//! * [`ClientParams`]: values specific to one registered client, typed
//!   into that client's product card.
//!
//! Both are built fresh from the GUI inputs every time a broadcast is
//! triggered and are never persisted.

use chrono::{Duration, NaiveTime, Timelike};
use log::warn;
use serde::{Deserialize, Serialize};

/// Settings applied uniformly to all clients in one broadcast.
///
/// Serialises to the `globalParams` object of the wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalParams {
    pub target_hour: u32,
    pub target_minute: u32,
    pub target_second: u32,
    pub decrement_value: f64,
    /// Milliseconds between target-time checks on the client.
    pub check_delay: u64,
    /// Milliseconds to wait before checking a submission result.
    pub result_check_delay: u64,
    /// Milliseconds to wait before resubmitting.
    pub resubmit_delay: u64,
}

/// Settings for a single client, keyed by its identifier at broadcast time.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientParams {
    pub min_values: Vec<f64>,
    pub sku_prices: Vec<f64>,
    pub auto_decrement: bool,
    /// Random start jitter in milliseconds.  Only meaningful for `start`.
    pub random_delay: Option<u64>,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            min_values: Vec::new(),
            sku_prices: Vec::new(),
            auto_decrement: true,
            random_delay: None,
        }
    }
}

/// Raw text of the global settings entries, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalFields {
    pub hour: String,
    pub minute: String,
    pub second: String,
    pub decrement_value: String,
    pub check_delay: String,
    pub result_check_delay: String,
    pub resubmit_delay: String,
}

/// A global settings entry that could not be turned into a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {value:?}")]
pub struct ParamError {
    pub field: &'static str,
    pub value: String,
}

impl GlobalFields {
    /// Build fields pre-filled with the given target time and defaults.
    pub fn with_target(
        (hour, minute, second): (u32, u32, u32),
        decrement_value: f64,
        check_delay: u64,
        result_check_delay: u64,
        resubmit_delay: u64,
    ) -> Self {
        Self {
            hour: format!("{:02}", hour),
            minute: format!("{:02}", minute),
            second: format!("{:02}", second),
            decrement_value: decrement_value.to_string(),
            check_delay: check_delay.to_string(),
            result_check_delay: result_check_delay.to_string(),
            resubmit_delay: resubmit_delay.to_string(),
        }
    }

    /// Parse every field.  The first invalid field aborts the whole parse.
    pub fn parse(&self) -> Result<GlobalParams, ParamError> {
        Ok(GlobalParams {
            target_hour: parse_bounded("target hour", &self.hour, 24)?,
            target_minute: parse_bounded("target minute", &self.minute, 60)?,
            target_second: parse_bounded("target second", &self.second, 60)?,
            decrement_value: parse_finite("decrement value", &self.decrement_value)?,
            check_delay: parse_millis("check delay", &self.check_delay)?,
            result_check_delay: parse_millis("result check delay", &self.result_check_delay)?,
            resubmit_delay: parse_millis("resubmit delay", &self.resubmit_delay)?,
        })
    }
}

fn parse_bounded(field: &'static str, raw: &str, upper: u32) -> Result<u32, ParamError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v < upper)
        .ok_or_else(|| ParamError {
            field,
            value: raw.to_string(),
        })
}

fn parse_finite(field: &'static str, raw: &str) -> Result<f64, ParamError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParamError {
            field,
            value: raw.to_string(),
        })
}

fn parse_millis(field: &'static str, raw: &str) -> Result<u64, ParamError> {
    raw.trim().parse::<u64>().map_err(|_| ParamError {
        field,
        value: raw.to_string(),
    })
}

/// Parse a multi-line numeric input, one value per line.
///
/// Blank lines are ignored.  Lines that are not finite numbers are skipped
/// with a warning naming `label` and `identifier`; they never fail the
/// whole input.
pub fn parse_number_lines(text: &str, label: &str, identifier: &str) -> Vec<f64> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!("invalid {} skipped for {}: {:?}", label, identifier, line);
                None
            }
        })
        .collect()
}

/// Split a wall-clock time into `(hour, minute, second)` after adding
/// `offset_secs`, wrapping around midnight.
pub fn target_time(now: NaiveTime, offset_secs: i64) -> (u32, u32, u32) {
    let (t, _) = now.overflowing_add_signed(Duration::seconds(offset_secs));
    (t.hour(), t.minute(), t.second())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> GlobalFields {
        GlobalFields {
            hour: "10".into(),
            minute: "30".into(),
            second: "0".into(),
            decrement_value: "0.1".into(),
            check_delay: "500".into(),
            result_check_delay: "1500".into(),
            resubmit_delay: "500".into(),
        }
    }

    #[test]
    fn parse_valid_global_fields() {
        let p = fields().parse().unwrap();
        assert_eq!(p.target_hour, 10);
        assert_eq!(p.target_minute, 30);
        assert_eq!(p.target_second, 0);
        assert_eq!(p.decrement_value, 0.1);
        assert_eq!(p.check_delay, 500);
        assert_eq!(p.result_check_delay, 1500);
        assert_eq!(p.resubmit_delay, 500);
    }

    #[test]
    fn global_fields_tolerate_surrounding_whitespace() {
        let mut f = fields();
        f.hour = " 09 ".into();
        assert_eq!(f.parse().unwrap().target_hour, 9);
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let mut f = fields();
        f.hour = "24".into();
        let err = f.parse().unwrap_err();
        assert_eq!(err.field, "target hour");
        assert_eq!(err.value, "24");
    }

    #[test]
    fn non_numeric_delay_is_rejected() {
        let mut f = fields();
        f.resubmit_delay = "fast".into();
        assert_eq!(f.parse().unwrap_err().field, "resubmit delay");
    }

    #[test]
    fn negative_delay_is_rejected() {
        let mut f = fields();
        f.check_delay = "-5".into();
        assert_eq!(f.parse().unwrap_err().field, "check delay");
    }

    #[test]
    fn nan_decrement_is_rejected() {
        let mut f = fields();
        f.decrement_value = "NaN".into();
        assert_eq!(f.parse().unwrap_err().field, "decrement value");
    }

    #[test]
    fn number_lines_skip_garbage() {
        let v = parse_number_lines("1.0\nabc\n2.5\n", "min value", "p1");
        assert_eq!(v, vec![1.0, 2.5]);
    }

    #[test]
    fn number_lines_ignore_blank_and_trim() {
        let v = parse_number_lines("  3 \n\n\t4.25\n   \n", "sku price", "p1");
        assert_eq!(v, vec![3.0, 4.25]);
    }

    #[test]
    fn number_lines_reject_non_finite() {
        let v = parse_number_lines("inf\nnan\n7", "sku price", "p1");
        assert_eq!(v, vec![7.0]);
    }

    #[test]
    fn number_lines_empty_input() {
        assert!(parse_number_lines("", "min value", "p1").is_empty());
    }

    #[test]
    fn target_time_adds_offset() {
        let now = NaiveTime::from_hms_opt(10, 29, 45).unwrap();
        assert_eq!(target_time(now, 30), (10, 30, 15));
    }

    #[test]
    fn target_time_wraps_midnight() {
        let now = NaiveTime::from_hms_opt(23, 59, 50).unwrap();
        assert_eq!(target_time(now, 30), (0, 0, 20));
    }

    #[test]
    fn fields_round_trip_through_defaults() {
        let f = GlobalFields::with_target((7, 5, 3), 0.1, 500, 1500, 500);
        assert_eq!(f.hour, "07");
        assert_eq!(f.minute, "05");
        let p = f.parse().unwrap();
        assert_eq!((p.target_hour, p.target_minute, p.target_second), (7, 5, 3));
        assert_eq!(p.result_check_delay, 1500);
    }
}
