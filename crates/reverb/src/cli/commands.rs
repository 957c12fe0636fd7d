//! Argument definitions.

use clap::{Parser, Subcommand};
use reverb_core::{Platform, ReviewStatus};
use std::path::PathBuf;

/// Reply automation for social platforms.
#[derive(Parser, Debug)]
#[command(name = "reverb")]
#[command(about = "Generate, review and publish replies under API quotas")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides the platform config directory)
    #[arg(short, long, global = true, env = "REVERB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile whose queue and tokens are used
    #[arg(short, long, global = true, default_value = "default", env = "REVERB_PROFILE")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show quota usage recorded in the call log
    Quota {
        /// Service name
        #[arg(long, default_value = "gemini")]
        service: String,

        /// Method name
        #[arg(long, default_value = "generate")]
        method: String,

        /// Model name (defaults to the configured model)
        #[arg(long)]
        model: Option<String>,

        /// Restrict to calls made with the key ending in this suffix
        #[arg(long)]
        key_suffix: Option<String>,
    },

    /// List the API keys in the pool by suffix
    Keys {
        /// Comma-separated keys (defaults to the pool's environment variable)
        #[arg(long)]
        api_keys: Option<String>,
    },

    /// Report which platform tokens are set for a profile
    Credentials {
        /// Profile to check (defaults to --profile)
        #[arg(value_name = "PROFILE")]
        name: Option<String>,
    },

    /// Generate replies for collected items into the review queue
    Generate {
        /// JSON array of collected items
        input: PathBuf,

        /// Comma-separated API keys (defaults to the pool's environment variable)
        #[arg(long)]
        api_keys: Option<String>,

        /// Use only this key
        #[arg(long, conflicts_with = "api_keys")]
        api_key: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Concurrent generations
        #[arg(long)]
        workers: Option<usize>,

        /// Run number stamped on every entry
        #[arg(long)]
        run: Option<u32>,

        /// Process at most this many items
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect and edit the review queue
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Publish approved replies
    Post {
        /// Platform to post to
        #[arg(long, default_value = "x")]
        platform: Platform,

        /// Post at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Review queue operations.
#[derive(Subcommand, Debug)]
pub enum ReviewAction {
    /// List entries
    List {
        /// Only entries with this status
        #[arg(long)]
        status: Option<ReviewStatus>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Approve entries for posting
    Approve {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Reject entries
    Reject {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Replace an entry's reply text
    Edit {
        /// Entry id
        id: String,

        /// New reply text
        reply: String,
    },

    /// Remove an entry
    Delete {
        /// Entry id
        id: String,
    },
}
