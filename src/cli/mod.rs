mod commands;
pub mod error;


use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

pub use commands::{Action, describe_tools, parse_arguments, render_result, run_server};
pub use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "toolbelt")]
#[command(
    author,
    version,
    about = "MCP tool servers for web search, GitHub, git, email, Todoist, files, system stats and raw HTTP",
    long_about = None
)]
pub struct Cli {
    /// Directory the filesystem server may access (repeatable; adds to TOOLBELT_ALLOWED_DIRS)
    #[arg(long = "allow-dir", global = true, value_name = "DIR")]
    pub allow_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a server's tools over MCP stdio
    Serve {
        /// Which server to run
        server: ServerKind,
    },
    /// Print a server's tool descriptors as JSON
    Tools {
        /// Which server to describe
        server: ServerKind,
    },
    /// Invoke a single tool and print the normalized result
    Call {
        /// Which server the tool belongs to
        server: ServerKind,
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ServerKind {
    Search,
    Github,
    Git,
    Email,
    Todoist,
    Filesystem,
    System,
    WebApi,
}

/// Logs go to stderr; stdout belongs to the MCP transport.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolbelt=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

impl Cli {
    /// Resolve the parsed command line into a server and an action.
    pub fn action(&self) -> CliResult<(ServerKind, Action)> {
        Ok(match &self.command {
            Commands::Serve { server } => (*server, Action::Serve),
            Commands::Tools { server } => (*server, Action::Tools),
            Commands::Call { server, tool, args } => (
                *server,
                Action::Call {
                    tool: tool.clone(),
                    arguments: parse_arguments(args)?,
                },
            ),
        })
    }
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let (server, action) = cli.action()?;
    let config = Config::from_env()
        .map_err(CliError::from)?
        .with_allowed_dirs(cli.allow_dirs);

    run_server(server, &config, action).await?;
    Ok(())
}
