//! Named query time windows and their resolution to concrete timestamps.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RejectReason;

/// Named time window selector exposed to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSelector {
    #[serde(rename = "24h")]
    Last24h,
    #[serde(rename = "7d")]
    Last7d,
    #[serde(rename = "30d")]
    Last30d,
    All,
}

/// Default window when the selector is missing or unrecognized.
pub const DEFAULT_RANGE: RangeSelector = RangeSelector::Last7d;

impl RangeSelector {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last24h => "24h",
            Self::Last7d => "7d",
            Self::Last30d => "30d",
            Self::All => "all",
        }
    }

    /// Strict parse; unknown selectors are an invalid-range reject.
    pub fn parse(s: &str) -> Result<Self, RejectReason> {
        match s {
            "24h" => Ok(Self::Last24h),
            "7d" => Ok(Self::Last7d),
            "30d" => Ok(Self::Last30d),
            "all" => Ok(Self::All),
            _ => Err(RejectReason::InvalidRange),
        }
    }

    /// Forgiving parse: unknown or missing selectors resolve to the
    /// default window, reporting the reject for diagnostics instead of
    /// failing the request.
    pub fn parse_or_default(s: Option<&str>) -> (Self, Option<RejectReason>) {
        match s {
            None => (DEFAULT_RANGE, None),
            Some(s) => match Self::parse(s) {
                Ok(sel) => (sel, None),
                Err(reason) => (DEFAULT_RANGE, Some(reason)),
            },
        }
    }

    /// Resolves the selector to a concrete window anchored at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeRange {
        let from = match self {
            Self::Last24h => Some(now - Duration::hours(24)),
            Self::Last7d => Some(now - Duration::days(7)),
            Self::Last30d => Some(now - Duration::days(30)),
            Self::All => None,
        };
        TimeRange { from, to: now }
    }
}

impl std::fmt::Display for RangeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete half-open window `[from, to)`; `from = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && ts < self.to
    }

    /// Whether the window is unbounded on the left.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selectors() {
        assert_eq!(RangeSelector::parse("24h").unwrap(), RangeSelector::Last24h);
        assert_eq!(RangeSelector::parse("all").unwrap(), RangeSelector::All);
        assert_eq!(
            RangeSelector::parse("foo").unwrap_err(),
            RejectReason::InvalidRange
        );
    }

    #[test]
    fn test_unknown_selector_defaults_to_7d() {
        let (sel, reject) = RangeSelector::parse_or_default(Some("foo"));
        assert_eq!(sel, RangeSelector::Last7d);
        assert_eq!(reject, Some(RejectReason::InvalidRange));

        let (sel, reject) = RangeSelector::parse_or_default(None);
        assert_eq!(sel, RangeSelector::Last7d);
        assert!(reject.is_none());
    }

    #[test]
    fn test_resolve_windows() {
        let now = Utc::now();

        let range = RangeSelector::Last24h.resolve(now);
        assert_eq!(range.from.unwrap(), now - Duration::hours(24));
        assert_eq!(range.to, now);

        let range = RangeSelector::All.resolve(now);
        assert!(range.is_unbounded());
    }

    #[test]
    fn test_contains_is_half_open() {
        let now = Utc::now();
        let range = RangeSelector::Last24h.resolve(now);

        assert!(range.contains(now - Duration::hours(1)));
        assert!(range.contains(now - Duration::hours(24)));
        assert!(!range.contains(now));
        assert!(!range.contains(now - Duration::hours(25)));
    }
}
