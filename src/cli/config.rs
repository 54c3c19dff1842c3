//! `switchyard config` subcommands

use crate::cli::ConfigInitArgs;
use crate::config::SwitchyardConfig;
use std::fs;
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../switchyard.example.toml");

/// Write the annotated example configuration to `args.output`.
///
/// Missing parent directories are created. An existing file is only
/// replaced with `--force`.
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let output = args.output.as_path();
    if output.exists() && !args.force {
        return Err(format!(
            "{} already exists; pass --force to replace it",
            output.display()
        )
        .into());
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, EXAMPLE_CONFIG)?;

    print_summary(output)?;
    Ok(())
}

/// Echo what the written file configures, read back through the loader.
fn print_summary(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = SwitchyardConfig::load(Some(output))?;
    config.validate()?;

    println!("✓ Wrote {}", output.display());
    println!(
        "  listen {}:{}, {:?} buckets, {} policy overrides",
        config.server.host,
        config.server.port,
        config.admission.storage.backend,
        config.admission.policies.len()
    );
    println!("  Edit [admission] for quotas and [routing.weights] for model selection.");
    Ok(())
}
