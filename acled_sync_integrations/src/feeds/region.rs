//! USA-region ACLED feed.
//!
//! Downloads the region spreadsheet artifact, reads its first worksheet
//! (columns keyed by uppercase names), and maps rows into canonical
//! features. The region shape carries no `data_id` or `timestamp`, and its
//! ISO3 country code is fixed.

use crate::feeds::format_event_date;
use acled_sync_core::models::{EventAttributes, Feature, Geometry};
use acled_sync_core::recency::RecencyWindow;
use acled_sync_core::{Error, Feed, Result};
use async_trait::async_trait;
use calamine::{Data, DataType, Range, Reader, Xlsx};
use reqwest::Client;
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use tracing::instrument;

const FEED_ID: &str = "acled_usa";
const REGION_ISO3: &str = "USA";

pub struct RegionFeed {
    client: Client,
    artifact_url: String,
}

impl RegionFeed {
    pub fn new(artifact_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            client,
            artifact_url: artifact_url.into(),
        }
    }
}

#[async_trait]
impl Feed for RegionFeed {
    fn id(&self) -> &'static str {
        FEED_ID
    }

    #[instrument(level = "info", skip(self, _window))]
    async fn fetch(&self, _window: &RecencyWindow) -> Result<Vec<Feature>> {
        let resp = self
            .client
            .get(&self.artifact_url)
            .send()
            .await
            .map_err(|e| Error::feed_fetch(FEED_ID, e))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::feed_fetch(FEED_ID, e))?;

        let mut workbook =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| Error::feed_parse(FEED_ID, e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::feed_parse(FEED_ID, "workbook has no worksheets"))?
            .map_err(|e| Error::feed_parse(FEED_ID, e.to_string()))?;

        let rows = read_rows(&range);
        Ok(normalize(&rows))
    }
}

/// One worksheet row, typed. Numeric and date cells that fail to convert are
/// `None` here and resolve per the normalization policy.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegionRow {
    pub iso: String,
    pub event_id_cnty: String,
    pub event_id_no_cnty: String,
    pub event_date: Option<String>,
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
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geo_precision: String,
    pub source: String,
    pub source_scale: String,
    pub notes: String,
    pub fatalities: Option<i64>,
}

/// Extract typed rows from the worksheet. The first row is the header;
/// column lookup is by uppercase name, so column order in the artifact does
/// not matter.
pub(crate) fn read_rows(range: &Range<Data>) -> Vec<RegionRow> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let index: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| cell.get_string().map(|s| (s.trim().to_uppercase(), i)))
        .collect();
    let col = |name: &str| index.get(name).copied();

    let mut out = Vec::new();
    for row in rows {
        out.push(RegionRow {
            iso: cell_string(row, col("ISO")),
            event_id_cnty: cell_string(row, col("EVENT_ID_CNTY")),
            event_id_no_cnty: cell_string(row, col("EVENT_ID_NO_CNTY")),
            event_date: cell_date(row, col("EVENT_DATE")),
            year: cell_i64(row, col("YEAR")).and_then(|v| i32::try_from(v).ok()),
            time_precision: cell_string(row, col("TIME_PRECISION")),
            event_type: cell_string(row, col("EVENT_TYPE")),
            sub_event_type: cell_string(row, col("SUB_EVENT_TYPE")),
            actor1: cell_string(row, col("ACTOR1")),
            assoc_actor_1: cell_string(row, col("ASSOC_ACTOR_1")),
            inter1: cell_string(row, col("INTER1")),
            actor2: cell_string(row, col("ACTOR2")),
            assoc_actor_2: cell_string(row, col("ASSOC_ACTOR_2")),
            inter2: cell_string(row, col("INTER2")),
            interaction: cell_string(row, col("INTERACTION")),
            region: cell_string(row, col("REGION")),
            country: cell_string(row, col("COUNTRY")),
            admin1: cell_string(row, col("ADMIN1")),
            admin2: cell_string(row, col("ADMIN2")),
            admin3: cell_string(row, col("ADMIN3")),
            location: cell_string(row, col("LOCATION")),
            latitude: cell_f64(row, col("LATITUDE")),
            longitude: cell_f64(row, col("LONGITUDE")),
            geo_precision: cell_string(row, col("GEO_PRECISION")),
            source: cell_string(row, col("SOURCE")),
            source_scale: cell_string(row, col("SOURCE_SCALE")),
            notes: cell_string(row, col("NOTES")),
            fatalities: cell_i64(row, col("FATALITIES")),
        });
    }
    out
}

/// Map typed rows to canonical features, order-preserving. Same skip policy
/// as the global feed: no usable coordinates or event date, no feature.
pub(crate) fn normalize(rows: &[RegionRow]) -> Vec<Feature> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(x), Some(y)) = (row.longitude, row.latitude) else {
            tracing::warn!(
                feed = FEED_ID,
                event_id = %row.event_id_cnty,
                "skipping record with unparseable coordinates"
            );
            continue;
        };
        let Some(event_date) = row.event_date.clone() else {
            tracing::warn!(
                feed = FEED_ID,
                event_id = %row.event_id_cnty,
                "skipping record with unparseable event date"
            );
            continue;
        };

        out.push(Feature {
            geometry: Geometry { x, y },
            attributes: EventAttributes {
                data_id: None,
                iso: row.iso.clone(),
                event_id_cnty: row.event_id_cnty.clone(),
                event_id_no_cnty: row.event_id_no_cnty.clone(),
                event_date,
                year: row.year,
                time_precision: row.time_precision.clone(),
                event_type: row.event_type.clone(),
                sub_event_type: row.sub_event_type.clone(),
                actor1: row.actor1.clone(),
                assoc_actor_1: row.assoc_actor_1.clone(),
                inter1: row.inter1.clone(),
                actor2: row.actor2.clone(),
                assoc_actor_2: row.assoc_actor_2.clone(),
                inter2: row.inter2.clone(),
                interaction: row.interaction.clone(),
                region: row.region.clone(),
                country: row.country.clone(),
                admin1: row.admin1.clone(),
                admin2: row.admin2.clone(),
                admin3: row.admin3.clone(),
                location: row.location.clone(),
                latitude: y,
                longitude: x,
                geo_precision: row.geo_precision.clone(),
                source: row.source.clone(),
                source_scale: row.source_scale.clone(),
                notes: row.notes.clone(),
                fatalities: row.fatalities,
                timestamp: None,
                iso3: REGION_ISO3.to_string(),
            },
        });
    }
    out
}

fn cell<'a>(row: &'a [Data], idx: Option<usize>) -> Option<&'a Data> {
    idx.and_then(|i| row.get(i))
}

fn cell_string(row: &[Data], idx: Option<usize>) -> String {
    cell(row, idx).and_then(|c| c.as_string()).unwrap_or_default()
}

fn cell_i64(row: &[Data], idx: Option<usize>) -> Option<i64> {
    cell(row, idx).and_then(|c| c.as_i64())
}

fn cell_f64(row: &[Data], idx: Option<usize>) -> Option<f64> {
    cell(row, idx).and_then(|c| c.as_f64())
}

/// Spreadsheet date cells arrive as native datetimes; exported artifacts
/// have also shipped plain-text dates, so both are accepted.
fn cell_date(row: &[Data], idx: Option<usize>) -> Option<String> {
    let cell = cell(row, idx)?;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    cell.get_string().and_then(format_event_date)
}
