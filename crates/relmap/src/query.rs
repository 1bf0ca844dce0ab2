//! The rendered query contract.
//!
//! A [`Query`] is the immutable output of a builder's render pass: one SQL
//! string with canonical `%(name)s` bind markers, a parameter map, and (for
//! batched inserts) one parameter map per row. It is ready for either a
//! blocking or a suspending execution path; the core never executes anything
//! itself.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static PARAM_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    // %(name)s markers; compile once per process.
    Regex::new(r"%\((\w+)\)s").unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// A rendered statement plus its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: BTreeMap<String, Value>,
    /// One parameter map per row, for batched execution. Empty except for
    /// multi-row inserts.
    pub many_params: Vec<BTreeMap<String, Value>>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
            many_params: Vec::new(),
        }
    }

    /// True when this query binds per-row parameter maps for batching.
    pub fn is_batch(&self) -> bool {
        !self.many_params.is_empty()
    }

    /// Rewrite `%(name)s` markers to `:name` style.
    ///
    /// Adapter step for engines that do not accept the canonical marker
    /// syntax; purely textual, parameters are unchanged.
    pub fn to_colon_style(&self) -> String {
        PARAM_MARKER.replace_all(&self.sql, ":$1").into_owned()
    }

    /// The distinct marker names appearing in the SQL, in first-use order.
    pub fn marker_names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for caps in PARAM_MARKER.captures_iter(&self.sql) {
            let name = &caps[1];
            if !seen.iter().any(|s| s == name) {
                seen.push(name.to_string());
            }
        }
        seen
    }
}
