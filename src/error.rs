use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy shared by the data layer
// ---------------------------------------------------------------------------

/// Failures of the fetch → parse → select pipeline.
///
/// Every variant aborts the current render; nothing retries.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Transport failure or a non-success HTTP status.
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// Markup missing expected elements, malformed CSV, undecodable text.
    #[error("parse error: {0}")]
    Parse(String),

    /// A dropdown ended up with zero options.
    #[error("no options available for '{0}'")]
    EmptySelection(&'static str),
}

impl DashboardError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        DashboardError::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        DashboardError::Parse(msg.into())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(e: csv::Error) -> Self {
        DashboardError::Parse(format!("malformed CSV: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
