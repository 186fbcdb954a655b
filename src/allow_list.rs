//! Compiles the operator supplied allow-list into a single matcher.
//!
//! The specification is a comma separated list of full addresses
//! (`only.me@example.org`) and/or domain fragments (`@example.com`).  Tokens
//! are matched literally and case-insensitively anywhere in the address.

use regex::{Regex, RegexBuilder};

use crate::error::GuardError;

/// Organization domain used for the default allow-list when none is
/// configured.
pub const DEFAULT_ORGANIZATION_DOMAIN: &str = "netzstrategen.com";

/// Parsed allow-list tokens.  Construction trims tokens and drops empty
/// ones; an absent specification yields the organization default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListSpec {
    tokens: Vec<String>,
}

impl AllowListSpec {
    /// Parse a raw comma separated specification.
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Self { tokens }
    }

    /// Default specification: the organization's own domain only.
    pub fn organization_default(organization_domain: &str) -> Self {
        let domain = organization_domain.trim().trim_start_matches('@');
        let tokens = if domain.is_empty() {
            Vec::new()
        } else {
            vec![format!("@{}", domain)]
        };
        Self { tokens }
    }

    /// Resolve an optional raw specification against the organization
    /// default.
    pub fn from_optional(raw: Option<&str>, organization_domain: &str) -> Self {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Self::organization_default(organization_domain),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Compiled, immutable allow-list matcher.  Built once at activation and
/// shared read-only by every hook.
#[derive(Debug, Clone)]
pub struct AllowListPredicate {
    pattern: Regex,
    tokens: Vec<String>,
}

impl AllowListPredicate {
    /// True when `address` contains any allow-listed token, ignoring case.
    pub fn matches(&self, address: &str) -> bool {
        self.pattern.is_match(address)
    }

    /// Tokens the predicate was compiled from, sorted.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Compile an optional raw specification.  An absent specification falls
/// back to `@<organization_domain>`.
pub fn compile(
    spec: Option<&str>,
    organization_domain: &str,
) -> Result<AllowListPredicate, GuardError> {
    compile_spec(&AllowListSpec::from_optional(spec, organization_domain))
}

/// Compile a parsed specification into a predicate.
///
/// Fails with [`GuardError::Configuration`] when no tokens remain.
pub fn compile_spec(spec: &AllowListSpec) -> Result<AllowListPredicate, GuardError> {
    if spec.is_empty() {
        return Err(GuardError::Configuration(
            "allow-list specification contains no usable entries".into(),
        ));
    }
    // Sorted and deduplicated so equal specs compile to equal patterns.
    let mut tokens: Vec<String> = spec.tokens().iter().map(|t| t.to_lowercase()).collect();
    tokens.sort();
    tokens.dedup();
    let alternation = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .map_err(|e| GuardError::Configuration(format!("allow-list failed to compile: {}", e)))?;
    tracing::debug!(tokens = ?tokens, "compiled allow-list");
    Ok(AllowListPredicate { pattern, tokens })
}
