//! `funnel validate`: structural checks without execution.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use funnel_core::funnel::{load_funnel_file, validate_funnel};

use crate::state::AppState;

pub fn validate(state: &AppState, file: &Path, json: bool, quiet: bool) -> Result<()> {
    let funnel = load_funnel_file(file).with_context(|| format!("failed to load funnel from {}", file.display()))?;
    let result = validate_funnel(&funnel, &state.factory, &state.config.engine);

    if json {
        let report = serde_json::json!({
            "funnelId": funnel.id,
            "nodes": funnel.nodes.len(),
            "isValid": result.is_valid,
            "errors": result.errors,
            "warnings": result.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        println!();
        if result.is_valid {
            println!(
                "  {} {} is valid ({} nodes)",
                style("✓").green().bold(),
                style(&funnel.id).cyan(),
                funnel.nodes.len()
            );
        } else {
            println!("  {} {} is invalid", style("✗").red().bold(), style(&funnel.id).cyan());
        }
        for error in &result.errors {
            println!("    {} {error}", style("error").red());
        }
        for warning in &result.warnings {
            println!("    {} {warning}", style("warning").yellow());
        }
        println!();
    }

    if !result.is_valid {
        bail!("funnel '{}' failed validation with {} error(s)", funnel.id, result.errors.len());
    }
    Ok(())
}
