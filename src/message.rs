//! Typed message shapes handed to the hooks.
//!
//! Hosts convert their own representations into these at the boundary.  Both
//! structures derive `serde` so JSON-shaped host values can be bridged
//! directly; field names use camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header block of an [`OutgoingMessage`].  Hosts pass a key/value map, a
/// raw `Name: value` block, or the same lines as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Headers {
    Map(BTreeMap<String, String>),
    Raw(String),
    Lines(Vec<String>),
}

impl Headers {
    pub fn is_empty(&self) -> bool {
        match self {
            Headers::Map(map) => map.is_empty(),
            Headers::Raw(raw) => raw.trim().is_empty(),
            Headers::Lines(lines) => lines.iter().all(|line| line.trim().is_empty()),
        }
    }
}

/// The structured message seen by the pre-send hook, before the host
/// packages it for transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Primary recipient field; may hold several comma separated addresses.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub headers: Option<Headers>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// A resolved address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Mailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// The fully assembled message seen by the transport-level hook just before
/// network transmission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportMessage {
    #[serde(default)]
    pub from: Option<Mailbox>,
    #[serde(default)]
    pub to: Vec<Mailbox>,
    #[serde(default)]
    pub cc: Vec<Mailbox>,
    #[serde(default)]
    pub bcc: Vec<Mailbox>,
    #[serde(default)]
    pub reply_to: Vec<Mailbox>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub custom_headers: Vec<(String, String)>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl TransportMessage {
    /// Every resolved recipient, in to, cc, bcc order.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Remove every recipient, attachment, custom header and reply-to
    /// address.  Sender, subject and body are kept so the host can still log
    /// what was suppressed.
    pub fn clear_all(&mut self) {
        self.to.clear();
        self.cc.clear();
        self.bcc.clear();
        self.attachments.clear();
        self.custom_headers.clear();
        self.reply_to.clear();
    }
}
