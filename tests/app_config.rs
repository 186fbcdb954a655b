#[path = "common/mod.rs"]
mod common;

use common::EnvGuard;
use mailguard::{
    activate_with, Activation, GuardConfig, GuardError, HookRegistry, OutgoingMessage,
};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::sync::Mutex;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn rejects_invalid_boolean_env_values() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.clear_mailguard();

    env.set("MAILGUARD_FORCE", "maybe");
    let err = GuardConfig::from_env().expect_err("expected invalid boolean to error");
    assert!(format!("{}", err).contains("MAILGUARD_FORCE"));
}

#[test]
fn forced_guard_uses_configured_allow_list() {
    let _guard = ENV_MUTEX.lock().unwrap();
    common::init_tracing();
    let mut env = EnvGuard::new();
    env.clear_mailguard();
    env.set_many(&[
        ("MAILGUARD_FORCE", "1"),
        ("MAILGUARD_SITE_URL", "https://www.example.com"),
        ("MAILGUARD_ALLOWED_RECIPIENTS", "@example.com, only.me@other.org"),
    ]);

    let config = GuardConfig::from_env().unwrap();
    let mut hooks = HookRegistry::new();
    let guard = activate_with(&config, &mut hooks).unwrap().expect("forced guard");
    assert_eq!(guard.activation(), &Activation::Forced);
    assert!(guard.is_allowed("x@example.com"));
    assert!(guard.is_allowed("only.me@other.org"));
    assert!(!guard.is_allowed("only.me@external.net"));

    let msg = hooks.run_pre_send(OutgoingMessage::new("only.me@external.net"));
    assert!(msg.to.is_none());
}

#[test]
fn blank_allow_list_env_fails_like_separator_only_list() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.clear_mailguard();
    env.set("MAILGUARD_SITE_URL", "https://staging.example.com");

    for value in ["", "   ", " , "] {
        env.set("MAILGUARD_ALLOWED_RECIPIENTS", value);
        let config = GuardConfig::from_env().unwrap();
        let mut hooks = HookRegistry::new();
        let err = activate_with(&config, &mut hooks).expect_err("blank allow-list");
        assert!(matches!(err, GuardError::Configuration(_)), "value {:?}", value);
        assert!(hooks.is_empty());
    }
}

#[test]
fn production_site_url_leaves_mail_alone() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.clear_mailguard();
    env.set("MAILGUARD_SITE_URL", "https://www.example.com");

    let config = GuardConfig::from_env().unwrap();
    let mut hooks = HookRegistry::new();
    assert!(activate_with(&config, &mut hooks).unwrap().is_none());
    let msg = OutgoingMessage::new("customer@external.com");
    assert_eq!(hooks.run_pre_send(msg.clone()), msg);
}

#[test]
fn server_name_fallback_and_settings_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.clear_mailguard();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mailguard.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "organizationDomain": "example.org",
            "disabledPlugins": ["post-smtp/postman-smtp.php"]
        })
        .to_string(),
    )
    .unwrap();
    env.set("MAILGUARD_CONFIG", path.to_str().unwrap());
    env.set("SERVER_NAME", "shop.nest");

    let config = GuardConfig::from_env().unwrap();
    let mut hooks = HookRegistry::new();
    let guard = activate_with(&config, &mut hooks).unwrap().expect("dev host");
    assert!(guard.is_allowed("dev@example.org"));
    assert!(!guard.is_allowed("dev@netzstrategen.com"));

    let active: BTreeSet<String> = [
        "post-smtp/postman-smtp.php",
        "wp-mail-smtp/wp_mail_smtp.php",
        "woocommerce/woocommerce.php",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let kept = hooks.run_active_plugins(active);
    assert_eq!(kept.len(), 1);
    assert!(kept.contains("woocommerce/woocommerce.php"));
}
