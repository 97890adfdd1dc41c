// src/engine/signal.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::error::{BacktestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    /// +1 for long, -1 for short.
    pub fn direction(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Price has moved far enough in the profitable direction to hit `target`.
    pub fn reached_target(self, price: f64, target: f64) -> bool {
        match self {
            Side::Long => price >= target,
            Side::Short => price <= target,
        }
    }

    /// Price has moved far enough against the position to hit `stop`.
    pub fn reached_stop(self, price: f64, stop: f64) -> bool {
        match self {
            Side::Long => price <= stop,
            Side::Short => price >= stop,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per‐bar decision coming from an external signal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Long,
    Short,
    #[default]
    Hold,
}

impl Signal {
    /// Parse a `"long" | "short" | none` tag; missing, empty and `"none"` all mean hold.
    pub fn from_tag(tag: Option<&str>) -> Result<Signal> {
        let Some(tag) = tag else {
            return Ok(Signal::Hold);
        };
        match tag.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Signal::Long),
            "short" => Ok(Signal::Short),
            "" | "none" => Ok(Signal::Hold),
            _ => Err(BacktestError::UnknownSignal(tag.to_string())),
        }
    }

    pub fn from_tags<S: AsRef<str>>(tags: &[Option<S>]) -> Result<Vec<Signal>> {
        tags.iter()
            .map(|t| Signal::from_tag(t.as_ref().map(S::as_ref)))
            .collect()
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
            Signal::Hold => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("long"), Signal::Long ; "lowercase long")]
    #[test_case(Some("SHORT"), Signal::Short ; "uppercase short")]
    #[test_case(Some(" Long "), Signal::Long ; "padded")]
    #[test_case(Some("none"), Signal::Hold ; "explicit none")]
    #[test_case(Some(""), Signal::Hold ; "empty")]
    #[test_case(None, Signal::Hold ; "missing")]
    fn parses_tags(tag: Option<&str>, expected: Signal) {
        assert_eq!(Signal::from_tag(tag).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(
            Signal::from_tag(Some("buy")),
            Err(BacktestError::UnknownSignal("buy".into()))
        );
    }

    #[test]
    fn side_comparisons_mirror_each_other() {
        assert!(Side::Long.reached_target(103.0, 102.0));
        assert!(!Side::Short.reached_target(103.0, 102.0));
        assert!(Side::Short.reached_stop(103.0, 102.0));
        assert!(Side::Long.reached_stop(101.0, 102.0));
    }
}
