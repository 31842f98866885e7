//! Ordered query parameters.
//!
//! Keys are kept sorted so the rendered query string is identical for
//! identical inputs, which request signing depends on.

use crate::encoding::pam_encode;
use std::collections::BTreeMap;
use std::fmt;

/// An ordered set of query parameters holding raw (unencoded) values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    /// Create an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Set a parameter only when the value is non-empty.
    pub fn set_non_empty(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.params.insert(key.into(), value);
        }
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check whether a parameter is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Merge another set of parameters on top of this one.
    pub fn extend<K, V>(&mut self, other: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.params.insert(k.into(), v.into());
        }
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the query has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Render as `k1=v1&k2=v2` with values percent-encoded.
    #[must_use]
    pub fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, pam_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        query.extend(iter);
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_sorted() {
        let mut query = Query::new();
        query.set("uuid", "u-1");
        query.set("auth", "key");
        query.set("pnsdk", "Pulse-Rust/0.1.1");

        let keys: Vec<_> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["auth", "pnsdk", "uuid"]);
    }

    #[test]
    fn test_query_encode() {
        let query: Query = [("meta", "\"a\""), ("channel-group", "g1,g2")]
            .into_iter()
            .collect();
        assert_eq!(query.encode(), "channel-group=g1%2Cg2&meta=%22a%22");
    }

    #[test]
    fn test_set_non_empty() {
        let mut query = Query::new();
        query.set_non_empty("channel-group", "");
        assert!(!query.contains("channel-group"));
        query.set_non_empty("channel-group", "g");
        assert_eq!(query.get("channel-group"), Some("g"));
    }
}
