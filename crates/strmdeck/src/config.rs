//! CLI configuration: a thin wrapper around `strmdeck_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--server, --timeout, etc.).

use std::time::Duration;

use strmdeck_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use strmdeck_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build the session configuration from the config file, the active
/// profile and CLI overrides.
///
/// Without a matching profile, `--server` alone is enough; a profile that
/// was asked for by name must exist.
pub fn resolve_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match (cfg.profiles.get(&profile_name), &global.server) {
        (Some(profile), _) => profile.clone(),
        (None, Some(server)) if global.profile.is_none() => Profile::new(server.clone()),
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(&cfg),
                name: profile_name,
            });
        }
        (None, _) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    resolve_profile(&profile, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `SessionConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    // 1. Server URL (flag > env > profile)
    let mut profile = profile.clone();
    if let Some(server) = &global.server {
        profile.server.clone_from(server);
    }

    let mut config = strmdeck_config::profile_to_session_config(&profile, defaults)?;

    // 2. TLS
    if global.insecure {
        config.insecure = true;
    }

    // 3. Per-attempt deadline
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.retry.timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["strmdeck"];
        argv.extend_from_slice(args);
        argv.push("stats");
        Cli::parse_from(argv).global
    }

    #[test]
    fn flags_override_profile() {
        let mut profile = Profile::new("http://nas.local:8000");
        profile.timeout = Some(30);

        let opts = global(&["--server", "http://media.lan:9000", "--timeout", "5", "-k"]);
        let cfg = resolve_profile(&profile, &Defaults::default(), &opts).unwrap();

        assert_eq!(cfg.server.as_str(), "http://media.lan:9000/");
        assert_eq!(cfg.retry.timeout, Duration::from_secs(5));
        assert!(cfg.insecure);
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let mut profile = Profile::new("http://nas.local:8000");
        profile.timeout = Some(30);

        let cfg = resolve_profile(&profile, &Defaults::default(), &global(&[])).unwrap();

        assert_eq!(cfg.retry.timeout, Duration::from_secs(30));
        assert!(!cfg.insecure);
    }

    #[test]
    fn zero_timeout_flag_is_rejected() {
        let profile = Profile::new("http://nas.local:8000");
        let err = resolve_profile(&profile, &Defaults::default(), &global(&["--timeout", "0"]))
            .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }
}
