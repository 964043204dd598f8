//! `hookgate executions`: execution history of a workflow.

use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use hookgate_core::repository::WorkflowRepository;
use hookgate_types::workflow::ExecutionStatus;

use crate::state::AppState;

fn status_color(status: ExecutionStatus) -> Color {
    match status {
        ExecutionStatus::Completed => Color::Green,
        ExecutionStatus::Failed => Color::Red,
        ExecutionStatus::Cancelled => Color::DarkGrey,
        ExecutionStatus::Pending | ExecutionStatus::Running => Color::Yellow,
    }
}

pub async fn list_executions(
    state: &AppState,
    workflow_id: &str,
    limit: u32,
    json: bool,
) -> Result<()> {
    let workflow_id: Uuid = workflow_id
        .parse()
        .with_context(|| format!("Invalid workflow ID: {workflow_id}"))?;

    let workflow = state
        .repo
        .get_workflow(&workflow_id)
        .await
        .map_err(|e| anyhow!("Failed to look up workflow: {e}"))?
        .ok_or_else(|| anyhow!("Workflow '{workflow_id}' not found"))?;

    let executions = state
        .repo
        .list_executions(&workflow_id, limit.max(1))
        .await
        .map_err(|e| anyhow!("Failed to list executions: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!();
        println!("  No executions for '{}' yet.", style(&workflow.name).cyan());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Execution").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Trigger"),
            Cell::new("Started"),
            Cell::new("Duration"),
            Cell::new("Error"),
        ]);

    for execution in &executions {
        table.add_row(vec![
            Cell::new(execution.id),
            Cell::new(execution.status).fg(status_color(execution.status)),
            Cell::new(execution.trigger_type),
            Cell::new(execution.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(
                execution
                    .duration_ms
                    .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms")),
            ),
            Cell::new(execution.error.as_deref().unwrap_or("")),
        ]);
    }

    println!();
    println!("  Executions of '{}'", style(&workflow.name).cyan());
    println!("{table}");
    println!();
    Ok(())
}
