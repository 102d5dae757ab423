//! `funnel inspect`: show a persisted execution snapshot.

use anyhow::{Result, bail};
use console::style;
use funnel_infra::sqlite::default_database_url;
use uuid::Uuid;

use crate::state::{AppState, open_sqlite_cache};

pub async fn inspect(state: &AppState, id: Uuid, cache_db: Option<String>, json: bool) -> Result<()> {
    let url = cache_db.unwrap_or_else(default_database_url);
    let engine = state.engine(open_sqlite_cache(&url).await?);

    let Some(context) = engine.get_execution(&id).await? else {
        bail!("no snapshot for execution {id} (expired or never persisted to {url})");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Execution").bold(), style(context.id).cyan());
    println!("  Funnel:    {}", context.funnel_id);
    println!("  Status:    {}", style(context.status).bold());
    println!("  Started:   {}", context.started_at.to_rfc3339());
    if let Some(ended) = context.ended_at {
        println!("  Ended:     {}", ended.to_rfc3339());
    }
    if let Some(node) = &context.current_node_id {
        println!("  Last node: {node}");
    }
    println!("  Logs:      {}", context.logs.len());
    println!("  Errors:    {}", context.errors.len());
    println!();
    Ok(())
}
