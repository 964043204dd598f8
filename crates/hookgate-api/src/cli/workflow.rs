//! CLI workflow management subcommands.
//!
//! Workflows are authored in the visual builder and exported as JSON; this
//! module imports them, lists them and runs them manually.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Deserialize;
use uuid::Uuid;

use hookgate_core::repository::WorkflowRepository;
use hookgate_core::workflow::validate_workflow;
use hookgate_types::workflow::{
    CanvasDefinition, ExecutionStatus, TriggerType, WebhookBinding, WorkflowDefinition,
};

use crate::state::AppState;

/// Workflow management subcommands.
#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Import (create or replace) a workflow from a JSON file.
    Import {
        /// Path to the workflow JSON file.
        file: std::path::PathBuf,
    },

    /// List stored workflows.
    #[command(alias = "ls")]
    List,

    /// Run a workflow manually and wait for it to finish.
    Run {
        /// Workflow UUID.
        id: String,

        /// Optional JSON payload for the trigger.
        #[arg(long)]
        payload: Option<String>,
    },

    /// Delete a workflow and its execution history.
    #[command(alias = "rm")]
    Delete {
        /// Workflow UUID.
        id: String,
    },
}

/// Handle a workflow subcommand.
pub async fn handle_workflow_command(
    cmd: WorkflowCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        WorkflowCommand::Import { file } => handle_import(&file, state, json).await,
        WorkflowCommand::List => handle_list(state, json).await,
        WorkflowCommand::Run { id, payload } => {
            handle_run(&id, payload.as_deref(), state, json).await
        }
        WorkflowCommand::Delete { id } => handle_delete(&id, state, json).await,
    }
}

/// Workflow file as exported by the builder. `id` and timestamps are optional.
#[derive(Debug, Deserialize)]
pub struct WorkflowFile {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub webhook: Option<WebhookBinding>,
    #[serde(default)]
    pub canvas: CanvasDefinition,
}

fn default_active() -> bool {
    true
}

/// Parse a workflow file, merging it with the stored version (if any).
///
/// A file without `id` gets a fresh UUIDv7. Re-importing an existing id keeps
/// its `created_at`.
pub fn build_definition(
    raw: &str,
    existing: Option<&WorkflowDefinition>,
) -> Result<WorkflowDefinition> {
    let file: WorkflowFile = serde_json::from_str(raw).context("Invalid workflow JSON")?;
    if file.name.trim().is_empty() {
        bail!("Workflow name must not be empty");
    }

    let now = Utc::now();
    Ok(WorkflowDefinition {
        id: file.id.unwrap_or_else(Uuid::now_v7),
        name: file.name,
        description: file.description,
        is_active: file.is_active,
        webhook: file.webhook,
        canvas: file.canvas,
        created_at: existing.map_or(now, |w| w.created_at),
        updated_at: now,
    })
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

async fn handle_import(file: &Path, state: &AppState, json: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let parsed = build_definition(&raw, None)?;
    let existing = state
        .repo
        .get_workflow(&parsed.id)
        .await
        .map_err(|e| anyhow!("Failed to look up workflow: {e}"))?;
    let def = match &existing {
        Some(stored) => build_definition(&raw, Some(stored))?,
        None => parsed,
    };

    let warnings = match validate_workflow(&def) {
        Ok(()) => Vec::new(),
        Err(e) => e.problems,
    };

    state
        .repo
        .save_workflow(&def)
        .await
        .map_err(|e| anyhow!("Failed to save workflow: {e}"))?;

    // Drop this process's cached secrets for the old and the new binding.
    let stale = existing.as_ref().and_then(|w| w.webhook_id());
    for webhook_id in [stale, def.webhook_id()].into_iter().flatten() {
        state.ingress.secrets().forget(webhook_id).await?;
    }

    tracing::info!(workflow_id = %def.id, name = %def.name, "workflow imported");

    if json {
        let out = serde_json::json!({
            "id": def.id,
            "name": def.name,
            "webhook_id": def.webhook_id(),
            "nodes": def.canvas.nodes.len(),
            "edges": def.canvas.edges.len(),
            "replaced": existing.is_some(),
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} {} workflow '{}'",
            style("*").green().bold(),
            if existing.is_some() { "Updated" } else { "Imported" },
            style(&def.name).cyan()
        );
        println!("  ID: {}", def.id);
        println!(
            "  Nodes: {}  Edges: {}",
            def.canvas.nodes.len(),
            def.canvas.edges.len()
        );
        if let Some(webhook_id) = def.webhook_id() {
            println!(
                "  Webhook: {}",
                style(format!("POST /api/v1/webhooks/{webhook_id}")).dim()
            );
        }
        for warning in &warnings {
            println!("  {} {}", style("!").yellow().bold(), warning);
        }
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

async fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let defs = state
        .repo
        .list_workflows()
        .await
        .map_err(|e| anyhow!("Failed to list workflows: {e}"))?;

    if json {
        let out: Vec<_> = defs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "is_active": d.is_active,
                    "webhook_id": d.webhook_id(),
                    "nodes": d.canvas.nodes.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if defs.is_empty() {
        println!();
        println!("  No workflows stored.");
        println!(
            "  Import one with: {}",
            style("hookgate workflow import <file.json>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("ID"),
            Cell::new("Webhook"),
            Cell::new("Active"),
            Cell::new("Nodes"),
        ]);

    for def in &defs {
        let active = if def.is_active {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&def.name),
            Cell::new(def.id),
            Cell::new(def.webhook_id().unwrap_or("-")),
            active,
            Cell::new(def.canvas.nodes.len()),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn handle_run(id: &str, payload: Option<&str>, state: &AppState, json: bool) -> Result<()> {
    let id: Uuid = id.parse().with_context(|| format!("Invalid workflow ID: {id}"))?;
    let def = state
        .repo
        .get_workflow(&id)
        .await
        .map_err(|e| anyhow!("Failed to look up workflow: {e}"))?
        .ok_or_else(|| anyhow!("Workflow '{id}' not found"))?;

    let payload = match payload {
        Some(raw) => serde_json::from_str(raw).context("Invalid JSON payload")?,
        None => serde_json::json!({}),
    };

    let execution = state
        .trigger
        .run(&def, payload, TriggerType::Manual)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
        return Ok(());
    }

    let status = match execution.status {
        ExecutionStatus::Completed => style(execution.status.to_string()).green(),
        ExecutionStatus::Failed => style(execution.status.to_string()).red(),
        _ => style(execution.status.to_string()).yellow(),
    };

    println!();
    println!(
        "  {} Ran workflow '{}'",
        style("*").green().bold(),
        style(&def.name).cyan()
    );
    println!("  Execution ID: {}", execution.id);
    println!("  Status: {status}");
    if let Some(ms) = execution.duration_ms {
        println!("  Duration: {ms}ms");
    }
    if let Some(outcome) = &execution.outcome {
        println!("  Nodes: {}", outcome.processed_nodes.join(" -> "));
        for (node, error) in &outcome.node_errors {
            println!("  {} {}: {}", style("x").red().bold(), node, error);
        }
    } else if let Some(error) = &execution.error {
        println!("  Error: {error}");
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

async fn handle_delete(id: &str, state: &AppState, json: bool) -> Result<()> {
    let id: Uuid = id.parse().with_context(|| format!("Invalid workflow ID: {id}"))?;
    let def = state
        .repo
        .get_workflow(&id)
        .await
        .map_err(|e| anyhow!("Failed to look up workflow: {e}"))?
        .ok_or_else(|| anyhow!("Workflow '{id}' not found"))?;

    state
        .repo
        .delete_workflow(&id)
        .await
        .map_err(|e| anyhow!("Failed to delete workflow: {e}"))?;
    if let Some(webhook_id) = def.webhook_id() {
        state.ingress.secrets().forget(webhook_id).await?;
    }

    tracing::info!(workflow_id = %id, name = %def.name, "workflow deleted");

    if json {
        let out = serde_json::json!({ "id": id, "name": def.name, "deleted": true });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Deleted workflow '{}'",
            style("*").green().bold(),
            style(&def.name).cyan()
        );
        println!();
    }
    Ok(())
}
