//! Search request types and multi-target expansion.
//!
//! A search call may name one base/filter pair or many. Expansion turns the
//! scalar-or-sequence inputs into a positionally ordered target list, with
//! any scalar side broadcast across the sequence side.

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};

/// One base/filter pair of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    /// Search base DN.
    pub base: String,
    /// Search filter.
    pub filter: String,
}

/// A scalar-or-sequence search argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single value, broadcast across all targets when the other side is a
    /// sequence.
    One(String),
    /// One value per target.
    Many(Vec<String>),
}

impl TargetSpec {
    fn broadcast(self, count: usize) -> Vec<String> {
        match self {
            Self::One(value) => vec![value; count],
            Self::Many(values) => values,
        }
    }
}

impl From<&str> for TargetSpec {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for TargetSpec {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for TargetSpec {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for TargetSpec {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TargetSpec {
    fn from(values: &[&str]) -> Self {
        Self::Many(values.iter().map(|v| (*v).to_string()).collect())
    }
}

/// Expands base and filter into the target list for one parallel query.
///
/// When both sides are sequences their lengths must match exactly; a scalar
/// side is replicated to the sequence length. Runs entirely before any
/// network interaction.
pub(crate) fn expand(base: TargetSpec, filter: TargetSpec) -> LdapResult<Vec<SearchTarget>> {
    let count = match (&base, &filter) {
        (TargetSpec::Many(b), TargetSpec::Many(f)) if b.len() != f.len() => {
            return Err(LdapError::precondition(
                "base and filter argument counts must match for a parallel query",
            ));
        }
        (TargetSpec::Many(b), _) => b.len(),
        (_, TargetSpec::Many(f)) => f.len(),
        (TargetSpec::One(_), TargetSpec::One(_)) => 1,
    };
    if count == 0 {
        return Err(LdapError::precondition(
            "a search requires at least one target",
        ));
    }

    let bases = base.broadcast(count);
    let filters = filter.broadcast(count);
    Ok(bases
        .into_iter()
        .zip(filters)
        .map(|(base, filter)| SearchTarget { base, filter })
        .collect())
}

/// Alias dereference policy for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DerefPolicy {
    /// Never dereference aliases.
    #[default]
    Never,
    /// Dereference while descending the tree.
    Searching,
    /// Dereference only when locating the base.
    Finding,
    /// Always dereference.
    Always,
}

impl DerefPolicy {
    /// Converts to the ldap3 representation.
    #[must_use]
    pub const fn to_ldap3(self) -> ldap3::DerefAliases {
        match self {
            Self::Never => ldap3::DerefAliases::Never,
            Self::Searching => ldap3::DerefAliases::Searching,
            Self::Finding => ldap3::DerefAliases::Finding,
            Self::Always => ldap3::DerefAliases::Always,
        }
    }
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// One level below the base.
    OneLevel,
    /// The entire subtree.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Converts to the ldap3 representation.
    #[must_use]
    pub const fn to_ldap3(self) -> ldap3::Scope {
        match self {
            Self::Base => ldap3::Scope::Base,
            Self::OneLevel => ldap3::Scope::OneLevel,
            Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

/// A protocol-level request control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapControl {
    /// Control OID.
    pub oid: String,
    /// Whether the server must honor the control.
    pub critical: bool,
    /// BER-encoded control value, when the control takes one.
    pub value: Option<Vec<u8>>,
}

impl LdapControl {
    /// Converts to the ldap3 raw control representation.
    #[must_use]
    pub fn to_ldap3(&self) -> ldap3::controls::RawControl {
        ldap3::controls::RawControl {
            ctype: self.oid.clone(),
            crit: self.critical,
            val: self.value.clone(),
        }
    }
}

/// Options common to all targets of one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Attributes to return; empty means all user attributes.
    pub attributes: Vec<String>,
    /// Return attribute names without values.
    pub attributes_only: bool,
    /// Protocol-level size limit hint; negative means no client limit.
    pub size_limit: i32,
    /// Protocol-level time limit hint in seconds; negative means no client
    /// limit.
    pub time_limit: i32,
    /// Alias dereference policy.
    pub deref: DerefPolicy,
    /// Search scope.
    pub scope: SearchScope,
    /// Request controls applied to every target.
    pub controls: Option<Vec<LdapControl>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            attributes_only: false,
            size_limit: -1,
            time_limit: -1,
            deref: DerefPolicy::Never,
            scope: SearchScope::Subtree,
            controls: None,
        }
    }
}

impl SearchOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attributes to return.
    #[must_use]
    pub fn attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Requests attribute names without values.
    #[must_use]
    pub const fn attributes_only(mut self, flag: bool) -> Self {
        self.attributes_only = flag;
        self
    }

    /// Sets the size limit hint.
    #[must_use]
    pub const fn size_limit(mut self, limit: i32) -> Self {
        self.size_limit = limit;
        self
    }

    /// Sets the time limit hint in seconds.
    #[must_use]
    pub const fn time_limit(mut self, limit: i32) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the alias dereference policy.
    #[must_use]
    pub const fn deref(mut self, policy: DerefPolicy) -> Self {
        self.deref = policy;
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the request controls.
    #[must_use]
    pub fn controls(mut self, controls: Vec<LdapControl>) -> Self {
        self.controls = Some(controls);
        self
    }
}
