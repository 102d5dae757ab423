//! `funnel node-types`: list executable node types.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use funnel_types::funnel::NodeType;

use crate::state::AppState;

fn describe(node_type: &NodeType) -> &'static str {
    match node_type {
        NodeType::Trigger => "Entry point; records when the run was triggered",
        NodeType::SendMessage => "Send a message on the configured channel",
        NodeType::SendWhatsapp => "Send a WhatsApp message",
        NodeType::SendEmail => "Send an email",
        NodeType::SendSms => "Send an SMS",
        NodeType::AiResponse => "Generate text with the AI provider",
        NodeType::Condition => "Evaluate a condition and branch",
        NodeType::Delay => "Wait before continuing",
        NodeType::Webhook => "Call an external HTTP endpoint",
        NodeType::ApiCall => "Call an external HTTP API",
        NodeType::UpdateContact => "Update fields on the contact record",
        NodeType::TrackEvent => "Emit an analytics event",
        NodeType::End => "Finish the run, optionally saving data",
        NodeType::Custom(_) => "Custom executor",
    }
}

pub fn list(state: &AppState, json: bool) -> Result<()> {
    let types = state.factory.supported_types();

    if json {
        let entries: Vec<_> = types
            .iter()
            .map(|t| serde_json::json!({ "type": t.as_str(), "description": describe(t) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Type").fg(Color::White), Cell::new("Description").fg(Color::White)]);
    for node_type in &types {
        table.add_row(vec![Cell::new(node_type.as_str()).fg(Color::Cyan), Cell::new(describe(node_type))]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
