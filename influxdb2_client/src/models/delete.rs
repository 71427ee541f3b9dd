//! Delete

use serde::{Deserialize, Serialize};

/// The delete predicate request.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePredicateRequest {
    /// RFC3339Nano
    pub start: String,
    /// RFC3339Nano
    pub stop: String,
    /// InfluxQL-like delete statement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}
