//! CLI command definitions for the `hookgate` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod execution;
pub mod sign;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Signature-verified, rate-limited webhook gateway for canvas workflows.
#[derive(Parser)]
#[command(name = "hookgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config.toml (defaults to <data dir>/config.toml).
    #[arg(long, global = true, env = "HOOKGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "HOOKGATE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind (overrides server.host).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Compute the signature header for a payload.
    Sign {
        /// Shared webhook secret.
        #[arg(long, env = "HOOKGATE_SIGN_SECRET", hide_env_values = true)]
        secret: String,

        /// Payload file (reads stdin when omitted).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Manage workflows (import, list, run).
    Workflow {
        #[command(subcommand)]
        action: workflow::WorkflowCommand,
    },

    /// Show recent executions of a workflow.
    Executions {
        /// Workflow UUID.
        workflow_id: String,

        /// Maximum number of executions to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}
