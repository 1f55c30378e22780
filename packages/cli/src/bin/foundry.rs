use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

#[derive(Parser)]
#[command(name = "foundry")]
#[command(about = "Foundry - compile agent specifications into persisted entity graphs")]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a new agent from a JSON request
    Compile {
        /// Request file: a full graph or a feature list
        #[arg(short, long)]
        input: PathBuf,
        /// Owner of the new agent (overrides the file)
        #[arg(long)]
        owner: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add models, actions and schedules to an existing agent
    Update {
        /// Agent ID to update
        #[arg(long)]
        agent: String,
        /// File with modelsToAdd, actionsToAdd and schedulesToAdd
        #[arg(short, long)]
        input: PathBuf,
        /// Owner making the change (overrides the file)
        #[arg(long)]
        owner: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show an agent with its models, actions and schedules
    Show {
        /// Agent ID to show
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List agents of one owner
    List {
        /// Owner to list agents for
        #[arg(long, default_value = foundry_cli::input::DEFAULT_OWNER)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    foundry_cli::init_tracing(&cli.log_level);

    if let Err(e) = handle_command(cli.command).await {
        cli::print_error(&e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Compile { input, owner, json } => {
            cli::agents::compile(&input, owner.as_deref(), json).await
        }
        Commands::Update {
            agent,
            input,
            owner,
            json,
        } => cli::agents::update(&agent, &input, owner.as_deref(), json).await,
        Commands::Show { id, json } => cli::agents::show(&id, json).await,
        Commands::List { owner, json } => cli::agents::list(&owner, json).await,
    }
}
