//! `funnel run`: execute a funnel file and report the outcome.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use funnel_core::engine::ExecutionEngine;
use funnel_core::funnel::{load_funnel_file, validate_funnel};
use funnel_core::repository::cache::ExecutionCache;
use funnel_infra::cache::InMemoryExecutionCache;
use funnel_types::execution::{ExecutionContext, ExecutionStatus, LogLevel};
use funnel_types::funnel::Funnel;
use serde_json::Value;

use super::RunArgs;
use crate::state::{AppState, open_sqlite_cache};

pub async fn run(state: &AppState, args: RunArgs, json: bool, quiet: bool) -> Result<()> {
    let funnel = load_funnel_file(&args.file)
        .with_context(|| format!("failed to load funnel from {}", args.file.display()))?;

    let validation = validate_funnel(&funnel, &state.factory, &state.config.engine);
    for warning in &validation.warnings {
        tracing::warn!(funnel_id = funnel.id.as_str(), "{warning}");
    }
    if !validation.is_valid {
        if !args.skip_validation {
            bail!(
                "funnel '{}' is invalid:\n  - {}\n(use --skip-validation to run anyway)",
                funnel.id,
                validation.errors.join("\n  - ")
            );
        }
        tracing::warn!(funnel_id = funnel.id.as_str(), errors = validation.errors.len(), "running invalid funnel");
    }

    let variables = parse_variables(args.vars_json.as_deref(), &args.vars)?;

    let context = match &args.cache_db {
        Some(url) => {
            let cache = open_sqlite_cache(url).await?;
            execute(state, state.engine(cache), &funnel, args.trigger, variables).await
        }
        None => {
            let engine = state.engine(InMemoryExecutionCache::new());
            execute(state, engine, &funnel, args.trigger, variables).await
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else if !quiet {
        print_summary(&funnel, &context);
    }

    if context.status == ExecutionStatus::Failed {
        bail!("execution {} failed", context.id);
    }
    Ok(())
}

/// Run to completion; Ctrl+C cancels the run cooperatively and still waits
/// for the final context.
async fn execute<C: ExecutionCache>(
    state: &AppState,
    engine: ExecutionEngine<C>,
    funnel: &Funnel,
    trigger_id: Option<String>,
    variables: HashMap<String, Value>,
) -> ExecutionContext {
    let run = engine.execute_funnel(funnel, trigger_id, variables);
    tokio::pin!(run);

    tokio::select! {
        context = &mut run => context,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("  {} cancelling...", style("!").yellow().bold());
            for active in state.manager.active_executions() {
                state.manager.cancel(&active.id);
            }
            run.await
        }
    }
}

/// Build the seed variables from `--vars` JSON and `--var KEY=VALUE` pairs.
pub fn parse_variables(json: Option<&str>, pairs: &[String]) -> Result<HashMap<String, Value>> {
    let mut variables: HashMap<String, Value> = match json {
        Some(raw) => serde_json::from_str(raw).context("--vars must be a JSON object")?,
        None => HashMap::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("invalid --var '{pair}': expected KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --var '{pair}': empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        variables.insert(key.to_string(), value);
    }
    Ok(variables)
}

fn print_summary(funnel: &Funnel, context: &ExecutionContext) {
    let status = match context.status {
        ExecutionStatus::Completed => style("✓ completed").green().bold(),
        ExecutionStatus::Failed => style("✗ failed").red().bold(),
        ExecutionStatus::Cancelled => style("○ cancelled").yellow().bold(),
        other => style(other.as_str()).dim(),
    };
    let duration = Duration::from_millis(u64::try_from(context.duration_ms()).unwrap_or(0));

    println!();
    println!(
        "  {} {} {}",
        style(&funnel.id).cyan().bold(),
        status,
        style(format!("in {duration:.2?}")).dim()
    );
    println!("  {}", style(format!("execution {}", context.id)).dim());
    if let Some(node) = &context.current_node_id {
        println!("  Last node: {}", style(node).bold());
    }
    println!();

    if !context.variables.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("Variable").fg(Color::White), Cell::new("Value").fg(Color::White)]);

        let mut keys: Vec<&String> = context.variables.keys().collect();
        keys.sort();
        for key in keys {
            table.add_row(vec![
                Cell::new(key).fg(Color::Cyan),
                Cell::new(context.variables[key].to_string()),
            ]);
        }
        println!("{table}");
        println!();
    }

    for error in &context.errors {
        let node = error.node_id.as_deref().unwrap_or("-");
        println!("  {} [{}] {}", style("✗").red(), style(node).dim(), error.message);
    }

    let notable = context
        .logs
        .iter()
        .filter(|l| matches!(l.level, LogLevel::Warn | LogLevel::Error));
    for log in notable {
        let node = log.node_id.as_deref().unwrap_or("-");
        println!("  {} [{}] {}", style("!").yellow(), style(node).dim(), log.message);
    }
    if !context.errors.is_empty() {
        println!();
    }
}
