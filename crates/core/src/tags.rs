//! Named tag rules evaluated against every normalized record
//!
//! A rule is either a regex tested against the abbreviated `url`, or an
//! arbitrary predicate over the whole record. Rules can also be described
//! in configuration with [`TagSpec`] and compiled into a [`TagRule`].

use crate::data::{RequestRecord, ResourceType};
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Predicate signature for code-defined rules
pub type RecordPredicate = Box<dyn Fn(&RequestRecord) -> bool + Send + Sync>;

/// A single tag rule
pub enum TagRule {
    /// Regex tested against the abbreviated URL
    Pattern(Regex),
    /// Arbitrary logic over the record
    Predicate(RecordPredicate),
}

impl TagRule {
    /// Compile a URL pattern rule
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(TagRule::Pattern(Regex::new(pattern)?))
    }

    /// Wrap a closure as a predicate rule
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RequestRecord) -> bool + Send + Sync + 'static,
    {
        TagRule::Predicate(Box::new(f))
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        match self {
            TagRule::Pattern(re) => re.is_match(&record.url),
            TagRule::Predicate(f) => f(record),
        }
    }
}

impl fmt::Debug for TagRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRule::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            TagRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Ordered set of named rules
#[derive(Debug, Default)]
pub struct TagSet {
    rules: Vec<(String, TagRule)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a rule
    pub fn insert(&mut self, name: impl Into<String>, rule: TagRule) {
        let name = name.into();
        match self.rules.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = rule,
            None => self.rules.push((name, rule)),
        }
    }

    /// Builder form of [`TagSet::insert`] for a URL pattern
    pub fn with_pattern(mut self, name: impl Into<String>, pattern: &str) -> Result<Self> {
        self.insert(name, TagRule::pattern(pattern)?);
        Ok(self)
    }

    /// Builder form of [`TagSet::insert`] for a predicate
    pub fn with_predicate<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RequestRecord) -> bool + Send + Sync + 'static,
    {
        self.insert(name, TagRule::predicate(f));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule. Each configured name is present in the result.
    pub fn evaluate(&self, record: &RequestRecord) -> BTreeMap<String, bool> {
        self.rules
            .iter()
            .map(|(name, rule)| (name.clone(), rule.matches(record)))
            .collect()
    }
}

/// Configuration form of a tag rule
///
/// ```json
/// { "analytics": "google-analytics\\.com|/collect",
///   "stats": { "all": [ { "first_party": true }, { "path_prefix": "/stats/" } ] } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TagSpec {
    /// Bare string: regex over the abbreviated URL
    Url(String),
    Match(TagMatch),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    Pattern(String),
    Domain(String),
    PathPrefix(String),
    Kind(ResourceType),
    FirstParty(bool),
    All(Vec<TagSpec>),
    Any(Vec<TagSpec>),
    Not(Box<TagSpec>),
}

impl TagSpec {
    /// Compile into a rule. `first_party` is the primary domain of the page,
    /// required only when the rule uses `first_party`.
    pub fn compile(&self, first_party: Option<&str>) -> Result<TagRule> {
        match self {
            TagSpec::Url(pattern) | TagSpec::Match(TagMatch::Pattern(pattern)) => {
                TagRule::pattern(pattern)
            }
            TagSpec::Match(_) => {
                let f = self.compile_predicate(first_party)?;
                Ok(TagRule::Predicate(f))
            }
        }
    }

    fn compile_predicate(&self, first_party: Option<&str>) -> Result<RecordPredicate> {
        let spec = match self {
            TagSpec::Url(pattern) => {
                let re = Regex::new(pattern)?;
                return Ok(Box::new(move |r: &RequestRecord| re.is_match(&r.url)));
            }
            TagSpec::Match(spec) => spec,
        };

        let f: RecordPredicate = match spec {
            TagMatch::Pattern(pattern) => {
                let re = Regex::new(pattern)?;
                Box::new(move |r: &RequestRecord| re.is_match(&r.url))
            }
            TagMatch::Domain(domain) => {
                let domain = domain.clone();
                Box::new(move |r: &RequestRecord| r.is_under_domain(&domain))
            }
            TagMatch::PathPrefix(prefix) => {
                let prefix = prefix.clone();
                Box::new(move |r: &RequestRecord| r.path.starts_with(&prefix))
            }
            TagMatch::Kind(kind) => {
                let kind = *kind;
                Box::new(move |r: &RequestRecord| r.kind == kind)
            }
            TagMatch::FirstParty(expected) => {
                let base = first_party
                    .ok_or_else(|| {
                        Error::ConfigError(
                            "first_party rule needs the page's primary domain".to_string(),
                        )
                    })?
                    .to_string();
                let expected = *expected;
                Box::new(move |r: &RequestRecord| r.is_under_domain(&base) == expected)
            }
            TagMatch::All(specs) => {
                let parts = specs
                    .iter()
                    .map(|s| s.compile_predicate(first_party))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(move |r: &RequestRecord| parts.iter().all(|p| p(r)))
            }
            TagMatch::Any(specs) => {
                let parts = specs
                    .iter()
                    .map(|s| s.compile_predicate(first_party))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(move |r: &RequestRecord| parts.iter().any(|p| p(r)))
            }
            TagMatch::Not(inner) => {
                let inner = inner.compile_predicate(first_party)?;
                Box::new(move |r: &RequestRecord| !inner(r))
            }
        };

        Ok(f)
    }
}

/// Compile a whole name -> spec map into a [`TagSet`], in name order
pub fn compile_tag_specs(
    specs: &BTreeMap<String, TagSpec>,
    first_party: Option<&str>,
) -> Result<TagSet> {
    let mut set = TagSet::new();
    for (name, spec) in specs {
        set.insert(name.clone(), spec.compile(first_party)?);
    }
    Ok(set)
}
