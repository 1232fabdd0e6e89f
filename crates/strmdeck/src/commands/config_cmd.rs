//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_url() -> Result<String, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: "required when not running interactively".into(),
        });
    }
    Input::new()
        .with_prompt("Service URL")
        .default("http://localhost:8000".into())
        .interact_text()
        .map_err(prompt_err)
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to render config");
        String::new()
    })
}

/// Add or replace `name` in `cfg`, validating the profile first.
fn upsert_profile(
    cfg: &mut Config,
    name: &str,
    url: &str,
    make_default: bool,
    force: bool,
) -> Result<(), CliError> {
    if cfg.profiles.contains_key(name) && !force {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: format!("profile '{name}' already exists (use --force to overwrite)"),
        });
    }

    let profile = Profile::new(url.trim());
    strmdeck_config::profile_to_session_config(&profile, &cfg.defaults)?;

    let first = cfg.profiles.is_empty();
    cfg.profiles.insert(name.to_owned(), profile);
    if make_default || first {
        cfg.default_profile = Some(name.to_owned());
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            url,
            name,
            default,
            force,
        } => {
            let url = match url {
                Some(url) => url,
                None => prompt_url()?,
            };
            let mut cfg = config::load_config()?;
            upsert_profile(&mut cfg, &name, &url, default, force)?;

            let path = config::save_config(&cfg)?;
            output::print_done(
                &format!("Profile '{name}' saved to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.profiles.keys().cloned().collect::<Vec<_>>().join("\n")
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
