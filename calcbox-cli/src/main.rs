mod commands;
mod config;

use anyhow::Result;
use calcbox_sandbox::ToolRegistry;
use clap::{Parser, Subcommand};
use commands::{CodeSource, DataSource};
use config::CliConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "calcbox")]
#[command(about = "Run calculation snippets in an isolated V8 sandbox")]
#[command(version)]
pub struct Cli {
    /// Config file (default: ~/.config/calcbox/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compact JSON output
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a snippet against a data payload
    Exec {
        /// Snippet source
        #[arg(short, long, conflicts_with = "code_file", required_unless_present = "code_file")]
        code: Option<String>,

        /// Read the snippet from a file
        #[arg(long)]
        code_file: Option<PathBuf>,

        /// Data payload as a JSON object
        #[arg(short, long, conflicts_with = "data_file")]
        data: Option<String>,

        /// Read the data payload from a JSON file
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Check a snippet against the denylist without running it
    Validate {
        /// Snippet source
        code: String,
    },
    /// List available tools (default if no subcommand provided)
    Tools,
    /// Call a tool by name
    Call {
        /// Tool name (e.g., "execute_calculation")
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },
}

fn init_logging(config: &CliConfig, verbose: bool) {
    let level = if verbose {
        "calcbox_sandbox=debug,calcbox=debug".to_string()
    } else {
        config.logging.level.clone()
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    let pretty = config.output.pretty && !cli.compact;
    let registry = ToolRegistry::with_defaults();

    let succeeded = match cli.command {
        Some(Commands::Exec {
            code,
            code_file,
            data,
            data_file,
        }) => {
            let code = match (code, code_file) {
                (Some(code), _) => CodeSource::Inline(code),
                (None, Some(path)) => CodeSource::File(path),
                (None, None) => anyhow::bail!("either --code or --code-file is required"),
            };
            let data = match (data, data_file) {
                (Some(data), _) => DataSource::Inline(data),
                (None, Some(path)) => DataSource::File(path),
                (None, None) => DataSource::Empty,
            };
            commands::execute_calculation(code, data, pretty).await?
        }
        Some(Commands::Validate { code }) => commands::execute_validate(code, pretty)?,
        Some(Commands::Call { tool, args }) => {
            commands::execute_tool_call(&registry, tool, args, pretty).await?
        }
        Some(Commands::Tools) | None => commands::execute_list_tools(&registry, pretty)?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
