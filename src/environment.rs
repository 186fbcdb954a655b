//! Decides whether the current deployment is non-production and the guard
//! must be switched on.
//!
//! The identity may be a bare host name (`SERVER_NAME`) or a full site URL.
//! Matching is anchored to dot-separated host segments so that a production
//! domain such as `teststrategen.com` is not mistaken for a test host.

use once_cell::sync::Lazy;
use regex::Regex;

// Segment prefixes that mark a non-production host, optionally followed by
// digits and/or a dash-separated suffix (`staging42`, `qa-2`, `test-shop`).
static NON_PRODUCTION_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:sandbox|stage|staging|qa|test)\d*(?:-[a-z0-9-]*)?$").unwrap()
});

/// Top-level labels reserved for development hosts.
const NON_PRODUCTION_TLDS: &[&str] = &["dev", "local", "nest", "test"];

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Outcome of classifying the runtime environment, with the reason kept for
/// logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The operator forced guarding on.
    Forced,
    /// No identity was available; guarding fails closed.
    MissingIdentity,
    /// The host looks like a local, test or staging deployment.
    NonProduction { host: String },
    /// The host looks like production; guarding stays off.
    Production { host: String },
}

impl Activation {
    pub fn is_active(&self) -> bool {
        !matches!(self, Activation::Production { .. })
    }

    /// Short label used in structured log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Activation::Forced => "forced",
            Activation::MissingIdentity => "missing_identity",
            Activation::NonProduction { .. } => "non_production_host",
            Activation::Production { .. } => "production_host",
        }
    }
}

/// Classify a site identity.  `explicit_override` wins over everything else.
pub fn classify(site_identity: Option<&str>, explicit_override: bool) -> Activation {
    if explicit_override {
        return Activation::Forced;
    }
    let host = match site_identity.map(host_of).filter(|h| !h.is_empty()) {
        Some(host) => host,
        None => return Activation::MissingIdentity,
    };
    if is_non_production_host(&host) {
        Activation::NonProduction { host }
    } else {
        Activation::Production { host }
    }
}

/// Boolean shorthand for [`classify`].
pub fn should_activate(site_identity: Option<&str>, explicit_override: bool) -> bool {
    classify(site_identity, explicit_override).is_active()
}

/// Reduce a URL or host string to a lower-cased host name without port.
fn host_of(identity: &str) -> String {
    let mut rest = identity.trim();
    if let Some(idx) = rest.find("://") {
        rest = &rest[idx + 3..];
    }
    if let Some(end) = rest.find(['/', '?', '#']) {
        rest = &rest[..end];
    }
    if let Some(at) = rest.rfind('@') {
        rest = &rest[at + 1..];
    }
    let host = if let Some(bracketed) = rest.strip_prefix('[') {
        // IPv6 literal, e.g. [::1]:8080
        bracketed.split(']').next().unwrap_or("")
    } else if rest.matches(':').count() == 1 {
        rest.split(':').next().unwrap_or("")
    } else {
        rest
    };
    host.trim_end_matches('.').to_lowercase()
}

fn is_non_production_host(host: &str) -> bool {
    if LOOPBACK_HOSTS.contains(&host) {
        return true;
    }
    let segments: Vec<&str> = host.split('.').collect();
    if segments.iter().any(|s| *s == "localhost") {
        return true;
    }
    if segments.len() > 1 {
        if let Some(tld) = segments.last() {
            if NON_PRODUCTION_TLDS.contains(tld) {
                return true;
            }
        }
    }
    segments.iter().any(|s| NON_PRODUCTION_SEGMENT.is_match(s))
}
