//! Bucket

use serde::{Deserialize, Serialize};

/// A bucket as returned by `GET /api/v2/buckets`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Server assigned ID, used to scope deletes
    pub id: String,
    /// Bucket name, unique within its organization
    pub name: String,
    /// ID of the owning organization
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// `user` or `system`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response body of a bucket listing
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Buckets {
    /// Buckets matching the request, possibly none
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}
