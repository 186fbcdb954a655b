//! Pre-send sanitizer for the structured message.
//!
//! Fields are handled whole: a disallowed primary recipient clears `to` and
//! removes cc and bcc entirely; otherwise a cc or bcc field holding any
//! disallowed address is removed entirely.  Individual addresses are never
//! dropped from a field.  Header blocks that cannot be parsed are left as-is
//! and the transport-level hook takes over.

use crate::allow_list::AllowListPredicate;
use crate::error::GuardError;
use crate::filter::decide_field;
use crate::message::{Headers, OutgoingMessage};

const COPY_FIELDS: &[&str] = &["cc", "bcc"];

/// What the pre-send sanitizer changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreSendReport {
    pub to_cleared: bool,
    /// Header fields removed, lower-cased (`cc`, `bcc`).
    pub stripped: Vec<&'static str>,
    /// The header block could not be parsed and was left untouched.
    pub malformed: bool,
}

impl PreSendReport {
    pub fn modified(&self) -> bool {
        self.to_cleared || !self.stripped.is_empty()
    }
}

/// Sanitize `msg` in place.
pub fn sanitize(msg: &mut OutgoingMessage, predicate: &AllowListPredicate) -> PreSendReport {
    let mut report = PreSendReport::default();

    let to_decision = msg.to.as_deref().map(|to| decide_field(to, predicate));
    if let Some(decision) = to_decision.filter(|d| !d.allowed) {
        tracing::warn!(
            hook = "pre_send",
            offending = ?decision.offending,
            "clearing primary recipient and copies"
        );
        msg.to = None;
        report.to_cleared = true;
    }

    let Some(headers) = msg.headers.as_mut() else {
        return report;
    };
    if headers.is_empty() {
        return report;
    }
    let strip_all = report.to_cleared;
    let result = match headers {
        Headers::Map(map) => Ok(strip_map(map, predicate, strip_all)),
        Headers::Raw(raw) => {
            let result = {
                let lines: Vec<&str> = raw.split_inclusive('\n').collect();
                strip_lines(&lines, predicate, strip_all).map(|(keep, stripped)| {
                    let text: Option<String> = (!stripped.is_empty()).then(|| {
                        lines
                            .iter()
                            .zip(&keep)
                            .filter(|(_, keep)| **keep)
                            .map(|(line, _)| *line)
                            .collect()
                    });
                    (text, stripped)
                })
            };
            result.map(|(text, stripped)| {
                if let Some(text) = text {
                    *raw = text;
                }
                stripped
            })
        }
        Headers::Lines(lines) => {
            let view: Vec<&str> = lines.iter().map(String::as_str).collect();
            let result = strip_lines(&view, predicate, strip_all);
            if let Ok((keep, _)) = &result {
                let mut keep = keep.iter();
                lines.retain(|_| keep.next().copied().unwrap_or(true));
            }
            result.map(|(_, stripped)| stripped)
        }
    };
    match result {
        Ok(stripped) => {
            for field in &stripped {
                tracing::warn!(hook = "pre_send", field = %field, "removed copy recipients");
            }
            report.stripped = stripped;
        }
        Err(err) => {
            tracing::warn!(hook = "pre_send", error = %err, "leaving header block untouched");
            report.malformed = true;
        }
    }
    report
}

fn copy_field(name: &str) -> Option<&'static str> {
    COPY_FIELDS
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(name.trim()))
}

fn should_strip(value: &str, predicate: &AllowListPredicate, strip_all: bool) -> bool {
    strip_all || !decide_field(value, predicate).allowed
}

fn strip_map(
    map: &mut std::collections::BTreeMap<String, String>,
    predicate: &AllowListPredicate,
    strip_all: bool,
) -> Vec<&'static str> {
    let mut stripped = Vec::new();
    map.retain(|key, value| match copy_field(key) {
        Some(field) if should_strip(value, predicate, strip_all) => {
            if !stripped.contains(&field) {
                stripped.push(field);
            }
            false
        }
        _ => true,
    });
    stripped
}

/// One header with its continuation lines.  `name` is `None` for blank
/// lines, which are carried through verbatim.
struct RawField<'a> {
    name: Option<&'a str>,
    start: usize,
    lines: Vec<&'a str>,
}

impl RawField<'_> {
    fn value(&self) -> String {
        let mut value = String::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let line = if idx == 0 {
                line.split_once(':').map(|(_, v)| v).unwrap_or("")
            } else {
                line
            };
            value.push_str(line.trim());
            value.push(' ');
        }
        value
    }
}

fn parse_lines<'a>(lines: &[&'a str]) -> Result<Vec<RawField<'a>>, GuardError> {
    let mut fields: Vec<RawField<'a>> = Vec::new();
    for (idx, line) in lines.iter().copied().enumerate() {
        if line.trim().is_empty() {
            fields.push(RawField {
                name: None,
                start: idx,
                lines: vec![line],
            });
            continue;
        }
        if line.starts_with([' ', '\t']) {
            match fields.last_mut() {
                Some(field) if field.name.is_some() => {
                    field.lines.push(line);
                    continue;
                }
                _ => {
                    return Err(GuardError::MalformedMessage(format!(
                        "continuation line without header: {:?}",
                        line.trim_end()
                    )))
                }
            }
        }
        // Obsolete syntax allows whitespace before the colon (`Cc : x`).
        let name = match line.split_once(':') {
            Some((name, _)) if is_header_name(name.trim_end()) => name.trim_end(),
            _ => {
                return Err(GuardError::MalformedMessage(format!(
                    "not a header line: {:?}",
                    line.trim_end()
                )))
            }
        };
        fields.push(RawField {
            name: Some(name),
            start: idx,
            lines: vec![line],
        });
    }
    Ok(fields)
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

/// Returns a keep flag per input line and the removed field names.
fn strip_lines(
    lines: &[&str],
    predicate: &AllowListPredicate,
    strip_all: bool,
) -> Result<(Vec<bool>, Vec<&'static str>), GuardError> {
    let fields = parse_lines(lines)?;
    let mut keep = vec![true; lines.len()];
    let mut stripped = Vec::new();
    for field in &fields {
        let removable = field
            .name
            .and_then(copy_field)
            .filter(|_| should_strip(&field.value(), predicate, strip_all));
        if let Some(name) = removable {
            keep[field.start..field.start + field.lines.len()].fill(false);
            if !stripped.contains(&name) {
                stripped.push(name);
            }
        }
    }
    Ok((keep, stripped))
}
