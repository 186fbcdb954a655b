//! Hook infrastructure for Mailguard.
//!
//! The host application exposes named extension points; the guard registers
//! one plain closure per point.  `HookRegistry` is an in-process host that
//! runs the registered closures in ascending priority order, with
//! registration order breaking ties.

use std::collections::BTreeSet;

use crate::message::{OutgoingMessage, TransportMessage};

pub mod active_plugins;
pub mod pre_send;
pub mod transport;

/// Default priority for hooks that have no ordering requirement.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Priority of the transport-level hook.  Runs after ordinary transport
/// customisations so it sees the final recipient lists.
pub const TRANSPORT_PRIORITY: i32 = 99;

pub type PreSendHook = Box<dyn Fn(OutgoingMessage) -> OutgoingMessage + Send + Sync>;
pub type TransportHook = Box<dyn Fn(&mut TransportMessage) + Send + Sync>;
pub type ActivePluginsHook = Box<dyn Fn(BTreeSet<String>) -> BTreeSet<String> + Send + Sync>;

/// Named extension points a host offers to the guard.
pub trait ExtensionPoints {
    /// Called with the structured message before transport packaging.
    fn add_pre_send(&mut self, priority: i32, hook: PreSendHook);
    /// Called with the assembled message just before network transmission.
    fn add_transport(&mut self, priority: i32, hook: TransportHook);
    /// Called with the set of enabled transport plugin identifiers.
    fn add_active_plugins(&mut self, priority: i32, hook: ActivePluginsHook);
}

struct Registered<H> {
    priority: i32,
    hook: H,
}

fn insert_sorted<H>(list: &mut Vec<Registered<H>>, priority: i32, hook: H) {
    let pos = list
        .iter()
        .position(|r| r.priority > priority)
        .unwrap_or(list.len());
    list.insert(pos, Registered { priority, hook });
}

/// In-process extension point host.
#[derive(Default)]
pub struct HookRegistry {
    pre_send: Vec<Registered<PreSendHook>>,
    transport: Vec<Registered<TransportHook>>,
    active_plugins: Vec<Registered<ActivePluginsHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_pre_send(&self, msg: OutgoingMessage) -> OutgoingMessage {
        self.pre_send
            .iter()
            .fold(msg, |msg, registered| (registered.hook)(msg))
    }

    pub fn run_transport(&self, msg: &mut TransportMessage) {
        for registered in &self.transport {
            (registered.hook)(msg);
        }
    }

    pub fn run_active_plugins(&self, plugins: BTreeSet<String>) -> BTreeSet<String> {
        self.active_plugins
            .iter()
            .fold(plugins, |plugins, registered| (registered.hook)(plugins))
    }

    /// Total number of registered hooks across all extension points.
    pub fn len(&self) -> usize {
        self.pre_send.len() + self.transport.len() + self.active_plugins.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExtensionPoints for HookRegistry {
    fn add_pre_send(&mut self, priority: i32, hook: PreSendHook) {
        insert_sorted(&mut self.pre_send, priority, hook);
    }

    fn add_transport(&mut self, priority: i32, hook: TransportHook) {
        insert_sorted(&mut self.transport, priority, hook);
    }

    fn add_active_plugins(&mut self, priority: i32, hook: ActivePluginsHook) {
        insert_sorted(&mut self.active_plugins, priority, hook);
    }
}
