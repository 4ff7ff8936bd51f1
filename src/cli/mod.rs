use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::workflows::WorkflowState;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "moveitright")]
#[command(version)]
#[command(about = "Asset transfer requests routed through an approval workflow")]
#[command(long_about = "MoveItRight drives asset transfer requests from draft through transport \
                       allocation, HOD and asset-manager approval to delivery. Every command runs \
                       as the user given with --user and prints a JSON response envelope.")]
pub struct Cli {
    /// User to act as; roles come from the user table
    #[arg(long, global = true, help = "User id whose roles authorize the command")]
    pub user: Option<String>,

    /// Extra configuration file layered over moveitright.toml
    #[arg(long, global = true, help = "Path to an additional TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List movement requests visible to you, with items and next actions
    Movements,
    /// Show the workflow actions you can take on a request
    Actions {
        record: String,
        /// Use this state instead of reading the request
        #[arg(long)]
        state: Option<WorkflowState>,
    },
    /// Create a draft transfer request for an asset
    Create {
        #[arg(long)]
        asset: String,
        #[arg(long = "from")]
        from_location: String,
        #[arg(long = "to")]
        to_location: String,
        /// Expected transfer date (YYYY-MM-DD)
        #[arg(long)]
        expected_date: NaiveDate,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Apply a workflow action (Submit, Approve, Reject, ...)
    Apply {
        record: String,
        action: String,
        /// Fail unless the request is still in this state
        #[arg(long)]
        expected_state: Option<WorkflowState>,
    },
    /// Per-state counts, recent requests and role-specific metrics
    Dashboard,
    /// List enabled locations
    Locations,
    /// List submitted assets at a location
    Assets {
        location: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List enabled asset categories
    Categories,
    /// Search submitted assets by name, item code or id
    Search {
        term: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Record why a request was rejected
    RejectReason { record: String, reason: String },
    /// Show your profile and roles
    Whoami,
    /// List enabled transporters
    Transporters,
    /// Append transport details to a request's remarks
    AssignTransport {
        record: String,
        #[arg(long, default_value = "")]
        vehicle_type: String,
        #[arg(long)]
        transporter: Option<String>,
        #[arg(long)]
        driver: Option<String>,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Movements => "movements",
            Commands::Actions { .. } => "actions",
            Commands::Create { .. } => "create",
            Commands::Apply { .. } => "apply",
            Commands::Dashboard => "dashboard",
            Commands::Locations => "locations",
            Commands::Assets { .. } => "assets",
            Commands::Categories => "categories",
            Commands::Search { .. } => "search",
            Commands::RejectReason { .. } => "reject-reason",
            Commands::Whoami => "whoami",
            Commands::Transporters => "transporters",
            Commands::AssignTransport { .. } => "assign-transport",
            Commands::ShowConfig => "show-config",
        }
    }
}
