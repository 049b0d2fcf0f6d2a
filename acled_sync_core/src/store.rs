use crate::models::{EditSummary, Feature, Session};
use crate::Result;
use async_trait::async_trait;

/// Store-assigned identifier of an existing feature.
pub type ObjectId = i64;

/// Uniform interface over the remote feature layer's query/delete/insert
/// operations.
///
/// Every call takes the run's [`Session`] explicitly so the dependency stays
/// visible and tests can substitute an in-memory fake. Each method is one
/// network round-trip: no internal retry, and callers pre-batch `ids` and
/// `features` to the store's per-call ceiling.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Every existing object id in the target layer (match-all predicate).
    async fn query_object_ids(&self, session: &Session) -> Result<Vec<ObjectId>>;

    /// Delete exactly the given object ids.
    async fn delete_features(&self, session: &Session, ids: &[ObjectId]) -> Result<EditSummary>;

    /// Whole-layer reset: delete every feature with one match-all call.
    ///
    /// The batched sync path never uses this; it exists for operator-driven
    /// resets.
    async fn delete_all(&self, session: &Session) -> Result<EditSummary>;

    /// Insert the given features. Object ids assigned by the store are not
    /// read back.
    async fn add_features(&self, session: &Session, features: &[Feature]) -> Result<EditSummary>;
}
