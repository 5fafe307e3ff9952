//! Resources exposed by the bridge and how a request addresses them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Payments,
    Customers,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Payments, Resource::Customers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Payments => "payments",
            Resource::Customers => "customers",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource `{0}`")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payments" => Ok(Resource::Payments),
            "customers" => Ok(Resource::Customers),
            other => Err(UnknownResource(other.to_string())),
        }
    }
}

/// Single record or list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    ById(String),
    List(Vec<(String, String)>),
}

impl Lookup {
    /// Legacy path segments below the prefix.
    pub fn segments(&self, resource: Resource) -> Vec<String> {
        match self {
            Lookup::ById(id) => vec![resource.as_str().to_string(), id.clone()],
            Lookup::List(_) => vec![resource.as_str().to_string()],
        }
    }

    pub fn cache_key(&self, resource: Resource) -> CacheKey {
        match self {
            Lookup::ById(id) => CacheKey::by_id(resource.as_str(), id),
            Lookup::List(query) => CacheKey::list(resource.as_str(), query),
        }
    }

    pub fn query(&self) -> &[(String, String)] {
        match self {
            Lookup::ById(_) => &[],
            Lookup::List(query) => query,
        }
    }
}
