//! Per-recipient and per-message allow decisions.
//!
//! A message is allowed only when every non-empty recipient matches the
//! predicate.  One external address is enough to block it.

use crate::allow_list::AllowListPredicate;

/// Whole-message decision.  `offending` holds the first address that
/// failed the predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub offending: Option<String>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            offending: None,
        }
    }

    fn block(address: &str) -> Self {
        Self {
            allowed: false,
            offending: Some(address.to_string()),
        }
    }
}

/// True when `address` matches the allow-list.  Empty addresses count as
/// allowed since they reach nobody.
pub fn is_allowed(address: &str, predicate: &AllowListPredicate) -> bool {
    let address = address.trim();
    address.is_empty() || predicate.matches(address)
}

/// AND over all recipients, stopping at the first failure.
pub fn decide<I, S>(recipients: I, predicate: &AllowListPredicate) -> Decision
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for recipient in recipients {
        let address = recipient.as_ref().trim();
        if !is_allowed(address, predicate) {
            return Decision::block(address);
        }
    }
    Decision::allow()
}

/// Split an address list on commas that are not inside quotes or angle
/// brackets.  Empty entries are dropped.  An unclosed quote or bracket falls
/// back to a plain comma split, which is how most hosts read the field.
pub fn split_addresses(field: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut angle_depth = 0usize;
    let mut escaped = false;
    let mut start = 0;
    for (idx, ch) in field.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            ',' | ';' if !in_quotes && angle_depth == 0 => {
                parts.push(&field[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    if in_quotes || angle_depth > 0 {
        return plain_split(field);
    }
    parts.push(&field[start..]);
    parts
        .into_iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect()
}

fn plain_split(field: &str) -> Vec<&str> {
    field
        .split([',', ';'])
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect()
}

fn bracketed(entry: &str) -> Option<&str> {
    match (entry.rfind('<'), entry.rfind('>')) {
        (Some(open), Some(close)) if open < close => Some(entry[open + 1..close].trim()),
        _ => None,
    }
}

/// Bare address of a `"Name" <addr>` entry; entries without angle brackets
/// are returned trimmed.
pub fn extract_address(entry: &str) -> &str {
    let entry = entry.trim();
    bracketed(entry).unwrap_or(entry)
}

/// Every address a host could deliver to from a raw recipient field.
/// Entries with a bracketed address yield that address; anything else is
/// also split on bare commas so a quoted list cannot hide a recipient.
pub fn recipient_addresses(field: &str) -> Vec<&str> {
    split_addresses(field)
        .into_iter()
        .flat_map(|entry| match bracketed(entry) {
            Some(address) => vec![address],
            None => plain_split(entry),
        })
        .collect()
}

/// Decide over a raw recipient field such as `to` or a `Cc:` value.
pub fn decide_field(field: &str, predicate: &AllowListPredicate) -> Decision {
    decide(recipient_addresses(field), predicate)
}
