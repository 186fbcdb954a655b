use std::collections::BTreeSet;

/// Third-party SMTP plugins that replace the default transport path and
/// would bypass a local mail catcher.
pub const KNOWN_SMTP_PLUGINS: &[&str] = &["gmail-smtp/main.php", "wp-mail-smtp/wp_mail_smtp.php"];

/// The built-in plugin identifiers plus any extra ones from configuration.
pub fn disabled_plugin_set<I, S>(extra: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    KNOWN_SMTP_PLUGINS
        .iter()
        .map(|s| s.to_string())
        .chain(
            extra
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty()),
        )
        .collect()
}

/// Set difference `active - disabled`.
pub fn filter_active_plugins(
    active: BTreeSet<String>,
    disabled: &BTreeSet<String>,
) -> BTreeSet<String> {
    let (removed, kept): (BTreeSet<String>, BTreeSet<String>) =
        active.into_iter().partition(|p| disabled.contains(p));
    for plugin in &removed {
        tracing::info!(plugin = %plugin, "disabling smtp plugin while mail guard is active");
    }
    kept
}
