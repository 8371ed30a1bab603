use countysel_core::error::SelectorError;
use countysel_core::models::{BufferedGeometry, ExportRecord, MatchResult};
use serde::Serialize;
use std::fmt;

use crate::overlay::Overlay;

/// How a query run ended.
///
/// Every variant is a successful evaluation; failures are `SelectorError`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum QueryStatus {
    /// Nothing drawn yet
    NoGeometry,
    /// No positive buffer distance entered
    NoBuffer,
    /// The buffer touches no reference feature
    EmptyMatch,
    /// This many distinct reference features matched
    Matched(usize),
}

impl QueryStatus {
    /// True for the "try again" states that produce nothing to display
    pub fn is_idle(&self) -> bool {
        matches!(self, QueryStatus::NoGeometry | QueryStatus::NoBuffer)
    }

    /// Plain user-facing message
    pub fn message(&self) -> String {
        match self {
            QueryStatus::NoGeometry => SelectorError::NoGeometry.to_string(),
            QueryStatus::NoBuffer => SelectorError::NoBuffer.to_string(),
            QueryStatus::EmptyMatch => {
                "The buffer does not touch any reference feature. Try a larger distance".to_string()
            }
            QueryStatus::Matched(1) => "1 feature matched".to_string(),
            QueryStatus::Matched(n) => format!("{} features matched", n),
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Everything one interaction hands back to the collaborators
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub status: QueryStatus,
    /// The buffer, when one was computed
    pub buffer: Option<BufferedGeometry>,
    pub matches: MatchResult,
    pub record: ExportRecord,
    /// Session overlays after this query, in draw order
    pub overlays: Vec<Overlay>,
}
