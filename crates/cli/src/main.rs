//! Blinker CLI: the main entry point.
//!
//! Commands:
//! - `init`     : Create the config directory and a default config
//! - `status`   : Show the effective configuration
//! - `mcp`      : List or call tools on configured MCP servers
//! - `sandbox`  : Run a command in the sandbox or get a preview link
//! - `thread`   : Inspect a stored thread

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "blinker",
    about = "Blinker: autonomous agent runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Status,

    /// Work with MCP tool servers
    Mcp {
        #[command(subcommand)]
        command: McpCommand,
    },

    /// Work with the sandbox
    Sandbox {
        #[command(subcommand)]
        command: SandboxCommand,
    },

    /// Inspect threads
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },
}

#[derive(Subcommand)]
enum McpCommand {
    /// Connect to every configured server and list its tools
    Tools,

    /// Call a routed tool, e.g. `mcp_exa_web_search`
    Call {
        /// Routed tool id: mcp_{qualifiedName}_{toolName}
        tool_id: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[derive(Subcommand)]
enum SandboxCommand {
    /// Run a shell command
    Exec {
        /// The command line, passed to `sh -c`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the preview URL for a port
    Link {
        port: u16,
    },
}

#[derive(Subcommand)]
enum ThreadCommand {
    /// Print every message of a thread
    Show {
        thread_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Mcp { command } => match command {
            McpCommand::Tools => commands::mcp::tools().await?,
            McpCommand::Call { tool_id, args } => commands::mcp::call(&tool_id, &args).await?,
        },
        Commands::Sandbox { command } => match command {
            SandboxCommand::Exec { command } => commands::sandbox::exec(&command.join(" ")).await?,
            SandboxCommand::Link { port } => commands::sandbox::link(port).await?,
        },
        Commands::Thread { command } => match command {
            ThreadCommand::Show { thread_id } => commands::thread::show(&thread_id).await?,
        },
    }

    Ok(())
}
