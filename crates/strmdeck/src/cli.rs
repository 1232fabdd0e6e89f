//! Clap derive structures for the `strmdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use strmdeck_core::{OrganizeStrategy, TaskStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// strmdeck -- command-line client for STRM Poller
#[derive(Debug, Parser)]
#[command(
    name = "strmdeck",
    version,
    about = "Manage STRM media-library organizer tasks from the command line",
    long_about = "Drives a STRM Poller service over its HTTP command surface and\n\
        follows its real-time push channel.\n\n\
        Commands are retried on timeouts and network failures; application\n\
        errors are reported with the service's own detail text.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "STRMDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service base URL (overrides profile)
    #[arg(long, short = 's', env = "STRMDECK_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "STRMDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "STRMDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds (overrides profile)
    #[arg(long, env = "STRMDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, env = "STRMDECK_LOG_FILE", global = true, value_name = "DIR")]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage organize tasks
    #[command(alias = "t")]
    Tasks(TasksArgs),

    /// Manage metadata scrapers
    #[command(alias = "sc")]
    Scrapers(ScrapersArgs),

    /// View and change service settings
    Settings(SettingsArgs),

    /// Show dashboard statistics
    Stats,

    /// View and clear service logs
    Logs(LogsArgs),

    /// Follow real-time updates until interrupted
    Watch,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Tasks ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub command: TasksCommand,
}

#[derive(Debug, Subcommand)]
pub enum TasksCommand {
    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Only show tasks in this state
        #[arg(long)]
        status: Option<TaskStatusArg>,
    },

    /// Create a new organize task
    Create {
        /// Task name
        name: String,

        /// Directory to scan
        source: String,

        /// Directory to write organized files to
        destination: String,

        /// How organized files are laid out
        #[arg(long, default_value = "category")]
        strategy: StrategyArg,
    },

    /// Start a pending or paused task
    Start {
        /// Task ID
        id: i64,
    },

    /// Pause a running task
    Pause {
        /// Task ID
        id: i64,
    },

    /// Cancel a task
    Cancel {
        /// Task ID
        id: i64,
    },

    /// Re-queue a failed or cancelled task
    Retry {
        /// Task ID
        id: i64,
    },

    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task ID
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Group by media category
    Category,
    /// Group by file type
    Type,
    /// Keep a flat layout
    None,
}

impl From<StrategyArg> for OrganizeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Category => Self::Category,
            StrategyArg::Type => Self::Type,
            StrategyArg::None => Self::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TaskStatusArg {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl From<TaskStatusArg> for TaskStatus {
    fn from(arg: TaskStatusArg) -> Self {
        match arg {
            TaskStatusArg::Pending => Self::Pending,
            TaskStatusArg::Running => Self::Running,
            TaskStatusArg::Paused => Self::Paused,
            TaskStatusArg::Completed => Self::Completed,
            TaskStatusArg::Failed => Self::Failed,
            TaskStatusArg::Cancelled => Self::Cancelled,
        }
    }
}

// ── Scrapers ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScrapersArgs {
    #[command(subcommand)]
    pub command: ScrapersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScrapersCommand {
    /// List scrapers in run order
    #[command(alias = "ls")]
    List,

    /// Change a scraper's configuration
    Update(ScraperUpdateArgs),

    /// Probe a scraper's upstream
    Test {
        /// Scraper ID or name
        scraper: String,
    },

    /// Set the run order: named scrapers first, the rest after
    Reorder {
        /// Scraper names, highest priority first
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct ScraperUpdateArgs {
    /// Scraper ID or name
    pub scraper: String,

    /// Enable or disable the scraper
    #[arg(long)]
    pub enabled: Option<bool>,

    /// Run priority (lower runs first)
    #[arg(long)]
    pub priority: Option<i32>,

    /// Upstream API key
    #[arg(long, env = "STRMDECK_SCRAPER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Upstream session cookie
    #[arg(long, hide_env_values = true)]
    pub cookie: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub upstream_timeout: Option<u32>,

    /// Upstream retry count
    #[arg(long)]
    pub retry_count: Option<u32>,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show system settings with proxy and memory status
    Show,

    /// Set a system setting
    Set {
        /// Setting key (e.g., max_workers)
        key: String,

        /// New value
        value: String,

        /// Description stored alongside the value
        #[arg(long)]
        description: Option<String>,
    },

    /// Test the configured proxy
    ProxyTest,
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// Show recent service log lines
    Show {
        /// Only lines at this level (e.g., error)
        #[arg(long)]
        level: Option<String>,

        /// Max lines to fetch
        #[arg(long, short = 'l', default_value = "100")]
        limit: u32,
    },

    /// Clear the service's log history
    Clear,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile
    Init {
        /// Service base URL (prompted when omitted)
        url: Option<String>,

        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Make this the default profile
        #[arg(long)]
        default: bool,

        /// Overwrite an existing profile
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
