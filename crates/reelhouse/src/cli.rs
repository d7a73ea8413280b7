//! Clap derive structures for the `reelhouse` CLI.
//!
//! Only clap and clap_complete may be used here: build.rs includes this
//! file to render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// reelhouse -- your movie-streaming account from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "reelhouse",
    version,
    about = "Browse films, manage playlists and follow notifications from the command line",
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
    /// Website URL (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub url: Option<String>,

    /// Use this access token for one invocation instead of the keyring
    #[arg(long, env = "REELHOUSE_TOKEN", global = true, hide = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "REELHOUSE_OUTPUT",
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

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Store an access token and check it against the backend
    Login(LoginArgs),

    /// Forget the stored access token
    Logout,

    /// Manage your playlists
    #[command(alias = "pl")]
    Playlists(PlaylistsArgs),

    /// Read and clear your notification inbox
    #[command(alias = "notif")]
    Notifications(NotificationsArgs),

    /// Search the film catalogue
    Search(SearchArgs),

    /// Stay connected and print realtime messages as they arrive
    Listen(ListenArgs),

    /// Publish one message on the realtime channel
    Send(SendArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Read the token from stdin instead of prompting
    #[arg(long)]
    pub token_stdin: bool,
}

// ── Playlists ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlaylistsArgs {
    #[command(subcommand)]
    pub command: PlaylistsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PlaylistsCommand {
    /// List your playlists
    #[command(alias = "ls")]
    List,

    /// Create a playlist
    Create {
        /// Playlist name
        name: String,
    },

    /// Delete a playlist
    #[command(alias = "rm")]
    Delete {
        /// Playlist ID
        id: i64,
    },

    /// Add a film to a playlist
    AddFilm {
        /// Playlist ID
        #[arg(long)]
        playlist: i64,

        /// Film ID
        #[arg(long)]
        film: i64,
    },
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List notifications, newest first
    #[command(alias = "ls")]
    List,

    /// Delete one notification
    #[command(alias = "rm")]
    Delete {
        /// Notification ID
        id: i64,
    },

    /// Delete every notification
    Clear,
}

// ── Search ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search text
    pub query: String,

    /// Page number
    #[arg(long)]
    pub page: Option<u32>,

    /// Results per page
    #[arg(long)]
    pub size: Option<u32>,
}

// ── Realtime ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Extra destinations to subscribe to (notifications are always followed)
    #[arg(long = "topic", short = 't')]
    pub topics: Vec<String>,

    /// Exit after this many messages
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Destination, e.g. /app/watch-party
    pub destination: String,

    /// JSON body
    pub body: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Set the website URL
    SetUrl {
        /// e.g. https://stream.example.com
        url: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
