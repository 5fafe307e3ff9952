//! Deterministic cache keys.
//!
//! ```text
//! v2:{resource}:id:{form-encoded id}
//! v2:{resource}:list?{sorted form-encoded query}
//! ```
//!
//! Ids are encoded, so `:`, `?` and `&` inside an id cannot forge another key.

use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn by_id(resource: &str, id: &str) -> Self {
        let encoded: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
        Self(format!("{}id:{}", Self::resource_prefix(resource), encoded))
    }

    /// Key for a list query. Parameter order does not matter.
    pub fn list(resource: &str, query: &[(String, String)]) -> Self {
        let mut pairs: Vec<&(String, String)> = query.iter().collect();
        pairs.sort();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in pairs {
            serializer.append_pair(k, v);
        }
        Self(format!("{}list?{}", Self::resource_prefix(resource), serializer.finish()))
    }

    /// Prefix shared by every key of one resource.
    pub fn resource_prefix(resource: &str) -> String {
        format!("v2:{}:", resource)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
