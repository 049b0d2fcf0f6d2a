use std::error::Error as StdError;

/// Common error type for the ACLED sync workspace.
///
/// Only `AuthSetup` is fatal to a run. Every stage after authentication
/// catches its own errors and logs them; nothing else propagates past the
/// engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to get authentication setup: {0}")]
    AuthSetup(String),

    #[error("feed '{feed}' fetch failed")]
    FeedFetch {
        feed: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("feed '{feed}' parse failed: {message}")]
    FeedParse { feed: &'static str, message: String },

    #[error("store query failed: {context}")]
    StoreQuery {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("store write failed: {context}")]
    StoreWrite {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn feed_fetch(feed: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::FeedFetch {
            feed,
            source: Box::new(source),
        }
    }

    pub fn feed_parse(feed: &'static str, message: impl Into<String>) -> Self {
        Self::FeedParse {
            feed,
            message: message.into(),
        }
    }

    pub fn store_query(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::StoreQuery {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn store_write(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::StoreWrite {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
