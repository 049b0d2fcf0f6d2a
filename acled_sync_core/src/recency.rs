use crate::models::Feature;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Trailing event-date window, truncated to calendar days.
///
/// Computed once per run; the global feed passes the cutoff to the provider
/// as a query lower bound, the region feed is filtered client-side with
/// [`retain_recent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    cutoff: NaiveDate,
}

impl RecencyWindow {
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            cutoff: (now - Duration::days(i64::from(days))).date_naive(),
        }
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// Inclusive at the cutoff: an event dated exactly `cutoff` is in.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.cutoff
    }
}

/// Keep only features whose `event_date` falls inside the window.
///
/// Order-preserving. A date that does not parse as `YYYY-MM-DD` is dropped;
/// normalization already guarantees the format, so this only catches records
/// that bypassed it.
pub fn retain_recent(features: Vec<Feature>, window: &RecencyWindow) -> Vec<Feature> {
    features
        .into_iter()
        .filter(|f| {
            NaiveDate::parse_from_str(&f.attributes.event_date, "%Y-%m-%d")
                .map(|date| window.contains(date))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventAttributes, Feature, Geometry};

    fn dated(event_date: &str) -> Feature {
        Feature {
            geometry: Geometry::default(),
            attributes: EventAttributes {
                event_date: event_date.to_string(),
                ..Default::default()
            },
        }
    }

    fn window() -> RecencyWindow {
        let now = "2026-08-27T10:30:00Z".parse::<DateTime<Utc>>().unwrap();
        RecencyWindow::trailing(now, 14)
    }

    #[test]
    fn cutoff_is_now_minus_days_truncated_to_day() {
        assert_eq!(
            window().cutoff(),
            NaiveDate::from_ymd_opt(2026, 8, 13).unwrap()
        );
    }

    #[test]
    fn record_on_cutoff_day_is_retained() {
        let kept = retain_recent(vec![dated("2026-08-13")], &window());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn record_one_day_before_cutoff_is_excluded() {
        let kept = retain_recent(vec![dated("2026-08-12")], &window());
        assert!(kept.is_empty());
    }

    #[test]
    fn unparseable_date_is_excluded() {
        let kept = retain_recent(vec![dated("not a date")], &window());
        assert!(kept.is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let kept = retain_recent(
            vec![dated("2026-08-20"), dated("2026-08-01"), dated("2026-08-14")],
            &window(),
        );
        let dates: Vec<&str> = kept
            .iter()
            .map(|f| f.attributes.event_date.as_str())
            .collect();
        assert_eq!(dates, vec!["2026-08-20", "2026-08-14"]);
    }
}
