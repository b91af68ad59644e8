use thiserror::Error;

use crate::market::ImpurityId;

/// Errors returned by the auction engine, the rankers and the log store.
#[derive(Debug, Error)]
pub enum Error {
    /// No impurity with a positive anomaly score was supplied.
    #[error("empty input: no impurity has a positive anomaly score")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the scored impurities.
    #[error("invalid cluster count: requested {requested}, but only {n_items} impurities are scored above zero")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of impurities with a positive score.
        n_items: usize,
    },

    /// An impurity record cannot take part in an auction.
    #[error("malformed impurity {id}: {reason}")]
    MalformedImpurity {
        /// Offending impurity.
        id: ImpurityId,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A cluster or extractor output refers to an impurity that does not exist.
    #[error("unknown impurity {0}")]
    UnknownImpurity(ImpurityId),

    /// The auction hit the configured sweep limit before converging.
    #[error("auction did not converge within {sweeps} sweeps")]
    NotConverged {
        /// Number of sweeps performed.
        sweeps: usize,
    },

    /// The rendering collaborator failed.
    #[error("render failed: {0}")]
    Render(String),

    /// Filesystem failure while reading or writing a log.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A log could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
