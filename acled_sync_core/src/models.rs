use crate::config::StoreCredentials;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point geometry in WGS84: `x` is longitude, `y` is latitude.
///
/// Values are carried as parsed; out-of-range coordinates are the store's
/// problem to reject.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
}

/// The canonical ACLED event attribute set.
///
/// Every field the feature layer knows about is enumerated here explicitly so
/// schema drift in either feed shows up at compile time, not as silently
/// dropped columns. `data_id` and `timestamp` are populated by the global
/// feed only; the region feed fixes `iso3` to its literal country code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<i64>,
    pub iso: String,
    pub event_id_cnty: String,
    pub event_id_no_cnty: String,
    /// Always normalized to `YYYY-MM-DD`.
    pub event_date: String,
    pub year: Option<i32>,
    pub time_precision: String,
    pub event_type: String,
    pub sub_event_type: String,
    pub actor1: String,
    pub assoc_actor_1: String,
    pub inter1: String,
    pub actor2: String,
    pub assoc_actor_2: String,
    pub inter2: String,
    pub interaction: String,
    pub region: String,
    pub country: String,
    pub admin1: String,
    pub admin2: String,
    pub admin3: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geo_precision: String,
    pub source: String,
    pub source_scale: String,
    pub notes: String,
    pub fatalities: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub iso3: String,
}

/// Canonical feature record: one normalized event, geometry plus attributes.
///
/// Constructed once per raw feed record and immutable afterward. The store
/// assigns object ids on insert; this system never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: EventAttributes,
}

/// Authenticated handle required by every store operation.
///
/// Built once per run, read-only afterward, discarded at run end.
#[derive(Clone)]
pub struct Session {
    username: String,
    password: String,
}

impl Session {
    pub fn new(credentials: &StoreCredentials) -> Result<Self> {
        if credentials.username.trim().is_empty() {
            return Err(Error::AuthSetup("service username is empty".to_string()));
        }
        if credentials.password.trim().is_empty() {
            return Err(Error::AuthSetup("service password is empty".to_string()));
        }
        Ok(Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What started a run. `past_due` mirrors the external timer's overdue flag
/// and only affects logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    OnDemand,
    Scheduled { past_due: bool },
}

/// Folded per-item results of one bulk store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// What one feed contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedOutcome {
    pub features: usize,
    pub error: Option<String>,
}

/// Aggregate of one batched store phase (delete or insert).
///
/// `succeeded` counts items, `batches`/`failed_batches` count calls. `error`
/// holds the first failure message so the report stays bounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub batches: usize,
    pub succeeded: usize,
    pub failed_batches: usize,
    pub error: Option<String>,
}

/// End-of-run summary, logged as the run's only persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: SyncTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub global: FeedOutcome,
    pub region: FeedOutcome,
    pub deleted: PhaseSummary,
    pub inserted: PhaseSummary,
    /// True when both feeds came back empty and the store was never touched.
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_rejects_empty_credentials() {
        let err = Session::new(&StoreCredentials {
            username: "  ".to_string(),
            password: "secret".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::AuthSetup(_)));

        let err = Session::new(&StoreCredentials {
            username: "svc".to_string(),
            password: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::AuthSetup(_)));
    }

    #[test]
    fn session_debug_redacts_password() {
        let session = Session::new(&StoreCredentials {
            username: "svc".to_string(),
            password: "secret".to_string(),
        })
        .unwrap();
        let dbg = format!("{session:?}");
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn region_shaped_attributes_omit_global_only_fields() {
        let attrs = EventAttributes {
            iso3: "USA".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&attrs).unwrap();
        assert!(json.get("data_id").is_none());
        assert!(json.get("timestamp").is_none());
        assert_eq!(json["iso3"], "USA");
        // Parse failures serialize as null, not as a sentinel.
        assert!(json["fatalities"].is_null());
    }
}
