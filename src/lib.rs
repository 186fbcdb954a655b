//! Core library for Mailguard.  This module wires the environment
//! classifier, the compiled allow-list and the hook sanitizers into a single
//! immutable `MailGuard` value that the host registers at startup.
//!
//! Typical use from a host's startup routine:
//!
//! ```
//! use mailguard::{activate_with, GuardConfig, HookRegistry, OutgoingMessage};
//!
//! let config = GuardConfig {
//!     site_identity: Some("staging.example.com".into()),
//!     ..GuardConfig::default()
//! };
//! let mut hooks = HookRegistry::new();
//! let guard = activate_with(&config, &mut hooks).unwrap();
//! assert!(guard.is_some());
//!
//! let msg = hooks.run_pre_send(OutgoingMessage::new("customer@example.com"));
//! assert!(msg.to.is_none());
//! ```

pub mod allow_list;
mod config;
pub mod environment;
mod error;
pub mod filter;
pub mod hooks;
pub mod message;

pub use config::{GuardConfig, GuardSettings};
pub use error::GuardError;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use crate::allow_list::{AllowListPredicate, AllowListSpec};
pub use crate::environment::Activation;
pub use crate::filter::Decision;
pub use crate::hooks::pre_send::PreSendReport;
pub use crate::hooks::{ExtensionPoints, HookRegistry};
pub use crate::message::{Attachment, Headers, Mailbox, OutgoingMessage, TransportMessage};

use crate::hooks::{active_plugins, pre_send, transport, DEFAULT_PRIORITY, TRANSPORT_PRIORITY};

/// Lock-free counters updated by the hooks.
#[derive(Debug, Default)]
pub struct GuardStats {
    pre_send_inspected: AtomicU64,
    pre_send_modified: AtomicU64,
    fields_stripped: AtomicU64,
    transport_inspected: AtomicU64,
    transport_blocked: AtomicU64,
    plugins_disabled: AtomicU64,
}

/// Point-in-time copy of [`GuardStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pre_send_inspected: u64,
    pub pre_send_modified: u64,
    pub fields_stripped: u64,
    pub transport_inspected: u64,
    pub transport_blocked: u64,
    pub plugins_disabled: u64,
}

impl GuardStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pre_send_inspected: self.pre_send_inspected.load(Ordering::Relaxed),
            pre_send_modified: self.pre_send_modified.load(Ordering::Relaxed),
            fields_stripped: self.fields_stripped.load(Ordering::Relaxed),
            transport_inspected: self.transport_inspected.load(Ordering::Relaxed),
            transport_blocked: self.transport_blocked.load(Ordering::Relaxed),
            plugins_disabled: self.plugins_disabled.load(Ordering::Relaxed),
        }
    }
}

/// The activated guard.  Decision state is fixed at construction and only
/// read afterwards; share it behind an `Arc`.
#[derive(Debug)]
pub struct MailGuard {
    predicate: AllowListPredicate,
    disabled_plugins: BTreeSet<String>,
    activation: Activation,
    stats: GuardStats,
}

impl MailGuard {
    /// Build a guard from already compiled parts.
    pub fn new(
        predicate: AllowListPredicate,
        disabled_plugins: BTreeSet<String>,
        activation: Activation,
    ) -> Self {
        Self {
            predicate,
            disabled_plugins,
            activation,
            stats: GuardStats::default(),
        }
    }

    /// Classify the environment and, when guarding is needed, compile the
    /// allow-list.  Returns `Ok(None)` on production hosts.
    pub fn activate(config: &GuardConfig) -> Result<Option<Self>, GuardError> {
        let activation = environment::classify(config.site_identity.as_deref(), config.force);
        if !activation.is_active() {
            tracing::info!(
                reason = activation.reason(),
                identity = ?config.site_identity,
                "mail guard inactive"
            );
            return Ok(None);
        }
        let predicate = allow_list::compile(
            config.allowed_recipients.as_deref(),
            &config.organization_domain,
        )?;
        let disabled_plugins = active_plugins::disabled_plugin_set(&config.disabled_plugins);
        tracing::info!(
            reason = activation.reason(),
            identity = ?config.site_identity,
            allowed = ?predicate.tokens(),
            "mail guard active"
        );
        Ok(Some(Self::new(predicate, disabled_plugins, activation)))
    }

    pub fn predicate(&self) -> &AllowListPredicate {
        &self.predicate
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn disabled_plugins(&self) -> &BTreeSet<String> {
        &self.disabled_plugins
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// True when `address` may receive mail.
    pub fn is_allowed(&self, address: &str) -> bool {
        filter::is_allowed(address, &self.predicate)
    }

    /// Pre-send hook: returns the message with disallowed fields removed.
    pub fn pre_send(&self, mut msg: OutgoingMessage) -> OutgoingMessage {
        let report = self.inspect_pre_send(&mut msg);
        tracing::trace!(?report, "pre-send inspection finished");
        msg
    }

    /// Pre-send sanitizing in place, reporting what changed.
    pub fn inspect_pre_send(&self, msg: &mut OutgoingMessage) -> PreSendReport {
        self.stats.pre_send_inspected.fetch_add(1, Ordering::Relaxed);
        let report = pre_send::sanitize(msg, &self.predicate);
        if report.modified() {
            self.stats.pre_send_modified.fetch_add(1, Ordering::Relaxed);
            self.stats
                .fields_stripped
                .fetch_add(report.stripped.len() as u64, Ordering::Relaxed);
        }
        report
    }

    /// Transport-level hook: blanks the message when any recipient is
    /// disallowed.
    pub fn transport(&self, msg: &mut TransportMessage) -> Decision {
        self.stats.transport_inspected.fetch_add(1, Ordering::Relaxed);
        let decision = transport::sanitize(msg, &self.predicate);
        if !decision.allowed {
            self.stats.transport_blocked.fetch_add(1, Ordering::Relaxed);
        }
        decision
    }

    /// Active-plugin hook: drops plugins that would bypass the default
    /// transport path.
    pub fn active_plugins(&self, active: BTreeSet<String>) -> BTreeSet<String> {
        let before = active.len();
        let kept = active_plugins::filter_active_plugins(active, &self.disabled_plugins);
        self.stats
            .plugins_disabled
            .fetch_add((before - kept.len()) as u64, Ordering::Relaxed);
        kept
    }

    /// Register the pre-send, transport and active-plugin hooks on `host`.
    pub fn register<H: ExtensionPoints + ?Sized>(self: &Arc<Self>, host: &mut H) {
        let guard = Arc::clone(self);
        host.add_pre_send(
            DEFAULT_PRIORITY,
            Box::new(move |msg: OutgoingMessage| guard.pre_send(msg)),
        );
        let guard = Arc::clone(self);
        host.add_transport(
            TRANSPORT_PRIORITY,
            Box::new(move |msg: &mut TransportMessage| {
                guard.transport(msg);
            }),
        );
        let guard = Arc::clone(self);
        host.add_active_plugins(
            DEFAULT_PRIORITY,
            Box::new(move |plugins: BTreeSet<String>| guard.active_plugins(plugins)),
        );
    }
}

/// Activation hook: activate the guard for `config` and register it on
/// `host`.  Nothing is registered on production hosts.
pub fn activate_with<H: ExtensionPoints + ?Sized>(
    config: &GuardConfig,
    host: &mut H,
) -> Result<Option<Arc<MailGuard>>, GuardError> {
    let guard = match MailGuard::activate(config)? {
        Some(guard) => Arc::new(guard),
        None => return Ok(None),
    };
    guard.register(host);
    Ok(Some(guard))
}
