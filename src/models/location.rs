//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::default_published;

/// Maximum location name length
pub const LOCATION_NAME_MAX_LEN: usize = 256;

/// A place a post can be geotagged with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    /// Unpublished locations are not shown on posts
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocationInput {
    pub name: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

impl CreateLocationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_published: true,
        }
    }
}

/// Input for updating a location; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLocationInput {
    pub name: Option<String>,
    pub is_published: Option<bool>,
}
