//! Concrete feed and store implementations for the ACLED live sync: the
//! global read API, the USA-region spreadsheet artifact, and the ArcGIS
//! feature-layer client.

pub mod arcgis;
pub mod feeds;

pub use arcgis::ArcGisFeatureLayer;
pub use feeds::global::GlobalFeed;
pub use feeds::region::RegionFeed;
