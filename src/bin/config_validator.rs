//! Load and validate a control plane configuration file.
//!
//! ```text
//! config-validator --config config/outreach/base.toml
//! OUTREACH_CONFIG_PATH=config/outreach/base.toml config-validator --json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use outreach_core::shared::config::{ConfigManager, ControlPlaneConfig};
use outreach_core::shared::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "config-validator", version, about = "Validate an outreach control plane config file")]
struct Cli {
    /// Config file to validate; defaults to $OUTREACH_CONFIG_PATH
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print the resolved configuration as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path)
            .with_context(|| format!("validating {}", path.display()))?,
        None => ConfigManager::load().context("validating config from environment")?,
    };

    let source = manager
        .source_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    info!(path = %source, "Configuration is valid");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(manager.config())?);
    } else {
        print_summary(&source, manager.config());
    }
    Ok(())
}

fn print_summary(source: &str, config: &ControlPlaneConfig) {
    println!("✓ {source}");
    println!(
        "  retry: {} retries, {}ms base, {}ms cap, x{} backoff, ±{:.0}% jitter",
        config.retry.max_retries,
        config.retry.base_delay_ms,
        config.retry.max_delay_ms,
        config.retry.exponential_base,
        config.retry.jitter_ratio * 100.0
    );

    let breakers = &config.circuit_breakers;
    println!(
        "  circuit breakers: default threshold {}, recovery {}s",
        breakers.default_config.failure_threshold, breakers.default_config.recovery_timeout_seconds
    );
    let mut components: Vec<_> = breakers.component_configs.iter().collect();
    components.sort_by(|a, b| a.0.cmp(b.0));
    for (name, component) in components {
        println!(
            "    {name}: threshold {}, recovery {}s, {} trial success(es)",
            component.failure_threshold,
            component.recovery_timeout_seconds,
            component.success_threshold
        );
    }

    println!(
        "  degradation: {} override(s), reset after {} healthy checks",
        config.degradation.component_levels.len(),
        config.degradation.recovery_streak
    );
    println!(
        "  learning: lr {}, gamma {}, epsilon {} (decay {}, floor {})",
        config.learning.learning_rate,
        config.learning.discount_factor,
        config.learning.epsilon,
        config.learning.epsilon_decay,
        config.learning.min_epsilon
    );
    println!(
        "  drift: {} bins, mean shift > {}, variance ratio outside [{}, {}], PSI > {} (high > {})",
        config.drift.histogram_bins,
        config.drift.mean_shift_threshold,
        config.drift.variance_ratio_min,
        config.drift.variance_ratio_max,
        config.drift.psi_threshold,
        config.drift.psi_high_threshold
    );
    println!(
        "  assurance: verify every {}s",
        config.assurance.verification_interval_seconds
    );
}
