//! config command - Show or change configuration values

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{Config, EngineConfig, LoggingConfig};

/// The file `set` writes to and `path` reports.
fn target_path(ctx: &Context) -> Result<std::path::PathBuf> {
    if let Some(path) = &ctx.config_path {
        return Ok(path.clone());
    }
    if let Some(path) = ctx.config.loaded_from() {
        return Ok(path.to_path_buf());
    }
    Config::default_path().context("Failed to locate config directory")
}

fn value_of(ctx: &Context, key: &str) -> Result<String> {
    let options = ctx.navigator_options();
    Ok(match key {
        "strict" => options.strict.to_string(),
        "max_substitutions" => options.max_substitutions.to_string(),
        "logging.level" => ctx.config.log_level().to_string(),
        _ => bail!("Unknown configuration key: {}", key),
    })
}

/// Print one configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    println!("{}", value_of(ctx, key)?);
    Ok(())
}

/// Set a configuration value in the config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let path = target_path(ctx)?;
    let mut engine: EngineConfig = if path.exists() {
        Config::load_from(&path)
            .context("Failed to load config")?
            .engine
    } else {
        EngineConfig::default()
    };

    match key {
        "strict" => {
            let strict: bool = value
                .parse()
                .with_context(|| format!("Invalid boolean: {}", value))?;
            engine.strict = Some(strict);
        }
        "max_substitutions" => {
            let max: u32 = value
                .parse()
                .with_context(|| format!("Invalid number: {}", value))?;
            engine.max_substitutions = Some(max);
        }
        "logging.level" => {
            engine.logging = Some(LoggingConfig {
                level: Some(value.to_string()),
            });
        }
        _ => bail!("Unknown configuration key: {}", key),
    }

    Config::write(&path, &engine).context("Failed to write config")?;

    if !ctx.quiet {
        println!("Set {} = {}", key, value);
    }
    Ok(())
}

/// List all effective configuration values.
pub fn list(ctx: &Context) -> Result<()> {
    match ctx.config.loaded_from() {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found; using defaults"),
    }
    for key in ["strict", "max_substitutions", "logging.level"] {
        println!("{} = {}", key, value_of(ctx, key)?);
    }
    Ok(())
}

/// Print the config file path.
pub fn path(ctx: &Context) -> Result<()> {
    println!("{}", target_path(ctx)?.display());
    Ok(())
}
