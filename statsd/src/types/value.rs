/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeValue {
    Absolute(f64),
    Delta(f64),
}

impl GaugeValue {
    pub fn apply_to(self, current: Option<f64>) -> f64 {
        match self {
            GaugeValue::Absolute(v) => v,
            GaugeValue::Delta(d) => current.unwrap_or_default() + d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Counter increment, already scaled by the sample rate.
    Counter(f64),
    Timer(f64),
    Gauge(GaugeValue),
    Set(Arc<str>),
}

/// Parse a finite f64, as required by counters, timers and gauges.
pub(crate) fn parse_number(s: &str) -> anyhow::Result<f64> {
    if s.is_empty() {
        return Err(anyhow!("empty string"));
    }
    let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 string: {e}"))?;
    if !f.is_finite() {
        return Err(anyhow!("{s} is not a finite number"));
    }
    Ok(f)
}

/// Render a number with at most 6 decimal places and no trailing zeros.
pub fn format_number(v: f64) -> String {
    let mut s = format!("{v:.6}");
    if s.contains('.') {
        let len = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(len);
    }
    if s == "-0" {
        s.remove(0);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number() {
        assert_eq!(parse_number("1.23").unwrap(), 1.23);
        assert_eq!(parse_number("-4").unwrap(), -4.0);
        assert_eq!(parse_number("+4").unwrap(), 4.0);
        assert!(parse_number("").is_err());
        assert!(parse_number("abc").is_err());
        assert!(parse_number("inf").is_err());
        assert!(parse_number("NaN").is_err());
    }

    #[test]
    fn format() {
        assert_eq!(format_number(1.23), "1.23");
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(3.4 + 12.1 + 13.1 + 33.7), "62.3");
        assert_eq!(format_number(1.23 / 1.002), "1.227545");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn gauge() {
        assert_eq!(GaugeValue::Absolute(3.0).apply_to(Some(10.0)), 3.0);
        assert_eq!(GaugeValue::Delta(-3.0).apply_to(Some(10.0)), 7.0);
        assert_eq!(GaugeValue::Delta(2.5).apply_to(None), 2.5);
    }
}
