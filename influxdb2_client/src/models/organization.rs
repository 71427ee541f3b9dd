//! Organization

use serde::{Deserialize, Serialize};

/// An organization as returned by `GET /api/v2/orgs`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Server assigned ID, used to scope deletes and writes
    pub id: String,
    /// Unique name
    pub name: String,
    /// `active` or `inactive`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Response body of an organization listing
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Organizations {
    /// Organizations matching the request, possibly none
    #[serde(default)]
    pub orgs: Vec<Organization>,
}
