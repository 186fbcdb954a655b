use std::collections::HashMap;

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    #[allow(dead_code)]
    pub fn set_many(&mut self, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    /// Remove every variable the guard reads so tests start from defaults.
    #[allow(dead_code)]
    pub fn clear_mailguard(&mut self) {
        for key in [
            "MAILGUARD_CONFIG",
            "MAILGUARD_ALLOWED_RECIPIENTS",
            "MAILGUARD_FORCE",
            "MAILGUARD_SITE_URL",
            "MAILGUARD_ORGANIZATION_DOMAIN",
            "SERVER_NAME",
        ] {
            self.remove(key);
        }
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Route `tracing` output through the test harness.  Honours RUST_LOG.
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
