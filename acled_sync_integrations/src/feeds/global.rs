//! Global ACLED feed.
//!
//! Pulls recent events from the ACLED read API with a server-side
//! event-date lower bound, then maps the all-string wire records into
//! canonical features.

use crate::feeds::{format_event_date, parse_f64, parse_i32, parse_i64};
use acled_sync_core::models::{EventAttributes, Feature, Geometry};
use acled_sync_core::recency::RecencyWindow;
use acled_sync_core::{Error, Feed, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const FEED_ID: &str = "acled_global";

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    data: Vec<RawEvent>,
}

/// Wire record from `/acled/read`. The API serializes every field as a
/// string; typed parsing happens in [`normalize`].
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(default)]
    pub data_id: String,
    #[serde(default)]
    pub iso: String,
    #[serde(default)]
    pub event_id_cnty: String,
    #[serde(default)]
    pub event_id_no_cnty: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub time_precision: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub sub_event_type: String,
    #[serde(default)]
    pub actor1: String,
    #[serde(default)]
    pub assoc_actor_1: String,
    #[serde(default)]
    pub inter1: String,
    #[serde(default)]
    pub actor2: String,
    #[serde(default)]
    pub assoc_actor_2: String,
    #[serde(default)]
    pub inter2: String,
    #[serde(default)]
    pub interaction: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub admin1: String,
    #[serde(default)]
    pub admin2: String,
    #[serde(default)]
    pub admin3: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub geo_precision: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_scale: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub fatalities: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub iso3: String,
}

pub struct GlobalFeed {
    client: Client,
    api_base: String,
    api_key: String,
    api_email: String,
}

impl GlobalFeed {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        api_email: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            api_email: api_email.into(),
        }
    }
}

#[async_trait]
impl Feed for GlobalFeed {
    fn id(&self) -> &'static str {
        FEED_ID
    }

    #[instrument(level = "info", skip(self, window))]
    async fn fetch(&self, window: &RecencyWindow) -> Result<Vec<Feature>> {
        let url = format!("{}/acled/read", self.api_base);
        let cutoff = window.cutoff().format("%Y-%m-%d").to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("event_date", cutoff.as_str()),
                ("event_date_where", ">="),
                ("limit", "0"),
                ("terms", "accept"),
                ("key", self.api_key.as_str()),
                ("email", self.api_email.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::feed_fetch(FEED_ID, e))?;

        let body: ReadResponse = resp.json().await.map_err(|e| Error::feed_fetch(FEED_ID, e))?;
        if body.count == 0 || body.data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(normalize(&body.data))
    }
}

/// Map wire records to canonical features, order-preserving.
///
/// A record whose coordinates or event date cannot be parsed is skipped with
/// a warning; other parse failures degrade field-by-field to null.
pub(crate) fn normalize(events: &[RawEvent]) -> Vec<Feature> {
    let mut out = Vec::with_capacity(events.len());
    for ev in events {
        let (Some(x), Some(y)) = (parse_f64(&ev.longitude), parse_f64(&ev.latitude)) else {
            tracing::warn!(
                feed = FEED_ID,
                event_id = %ev.event_id_cnty,
                "skipping record with unparseable coordinates"
            );
            continue;
        };
        let Some(event_date) = format_event_date(&ev.event_date) else {
            tracing::warn!(
                feed = FEED_ID,
                event_id = %ev.event_id_cnty,
                "skipping record with unparseable event date"
            );
            continue;
        };

        out.push(Feature {
            geometry: Geometry { x, y },
            attributes: EventAttributes {
                data_id: parse_i64(&ev.data_id),
                iso: ev.iso.clone(),
                event_id_cnty: ev.event_id_cnty.clone(),
                event_id_no_cnty: ev.event_id_no_cnty.clone(),
                event_date,
                year: parse_i32(&ev.year),
                time_precision: ev.time_precision.clone(),
                event_type: ev.event_type.clone(),
                sub_event_type: ev.sub_event_type.clone(),
                actor1: ev.actor1.clone(),
                assoc_actor_1: ev.assoc_actor_1.clone(),
                inter1: ev.inter1.clone(),
                actor2: ev.actor2.clone(),
                assoc_actor_2: ev.assoc_actor_2.clone(),
                inter2: ev.inter2.clone(),
                interaction: ev.interaction.clone(),
                region: ev.region.clone(),
                country: ev.country.clone(),
                admin1: ev.admin1.clone(),
                admin2: ev.admin2.clone(),
                admin3: ev.admin3.clone(),
                location: ev.location.clone(),
                latitude: y,
                longitude: x,
                geo_precision: ev.geo_precision.clone(),
                source: ev.source.clone(),
                source_scale: ev.source_scale.clone(),
                notes: ev.notes.clone(),
                fatalities: parse_i64(&ev.fatalities),
                timestamp: (!ev.timestamp.trim().is_empty()).then(|| ev.timestamp.clone()),
                iso3: ev.iso3.clone(),
            },
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(event_id: &str) -> RawEvent {
        RawEvent {
            data_id: "8012345".to_string(),
            iso: "804".to_string(),
            event_id_cnty: event_id.to_string(),
            event_date: "2026-08-14".to_string(),
            year: "2026".to_string(),
            event_type: "Battles".to_string(),
            latitude: "50.4501".to_string(),
            longitude: "30.5234".to_string(),
            fatalities: "3".to_string(),
            timestamp: "1755160000".to_string(),
            iso3: "UKR".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_geometry_date_and_numerics() {
        let features = normalize(&[raw("UKR123")]);
        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(f.geometry.x, 30.5234);
        assert_eq!(f.geometry.y, 50.4501);
        assert_eq!(f.attributes.event_date, "2026-08-14");
        assert_eq!(f.attributes.data_id, Some(8_012_345));
        assert_eq!(f.attributes.year, Some(2026));
        assert_eq!(f.attributes.fatalities, Some(3));
        assert_eq!(f.attributes.latitude, 50.4501);
        assert_eq!(f.attributes.longitude, 30.5234);
        assert_eq!(f.attributes.timestamp.as_deref(), Some("1755160000"));
        assert_eq!(f.attributes.iso3, "UKR");
    }

    #[test]
    fn unparseable_numeric_attribute_becomes_null() {
        let mut ev = raw("UKR124");
        ev.fatalities = "unknown".to_string();
        ev.data_id = String::new();
        let features = normalize(&[ev]);
        assert_eq!(features[0].attributes.fatalities, None);
        assert_eq!(features[0].attributes.data_id, None);
    }

    #[test]
    fn unparseable_coordinates_skip_the_record() {
        let mut bad = raw("UKR125");
        bad.longitude = "east-ish".to_string();
        let features = normalize(&[raw("UKR124"), bad, raw("UKR126")]);
        let ids: Vec<&str> = features
            .iter()
            .map(|f| f.attributes.event_id_cnty.as_str())
            .collect();
        assert_eq!(ids, vec!["UKR124", "UKR126"]);
    }

    #[test]
    fn empty_response_yields_no_features() {
        let body: ReadResponse = serde_json::from_str(r#"{"count": 0, "data": []}"#).unwrap();
        assert_eq!(body.count, 0);
        assert!(body.data.is_empty());
    }

    #[test]
    fn response_records_tolerate_missing_fields() {
        let body: ReadResponse = serde_json::from_str(
            r#"{"count": 1, "data": [{"event_id_cnty": "UKR1", "event_date": "2026-08-14",
                "latitude": "50.0", "longitude": "30.0"}]}"#,
        )
        .unwrap();
        let features = normalize(&body.data);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attributes.year, None);
        assert_eq!(features[0].attributes.actor1, "");
    }
}
