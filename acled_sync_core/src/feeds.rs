use crate::models::Feature;
use crate::recency::RecencyWindow;
use crate::Result;
use async_trait::async_trait;

/// An external source of event records, already normalized to the canonical
/// feature schema.
///
/// Implementations live in `acled_sync_integrations`. Fetching is a pure
/// read: a failed feed must not leave partial state anywhere, so the engine
/// can treat its contribution as empty and carry on.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Stable feed identifier used in logs and error messages.
    fn id(&self) -> &'static str;

    /// Fetch and normalize recent records.
    ///
    /// `window` is the run's trailing event-date window; feeds that can
    /// filter server-side pass the cutoff upstream, the rest return
    /// everything and rely on the engine's client-side filter.
    async fn fetch(&self, window: &RecencyWindow) -> Result<Vec<Feature>>;
}
