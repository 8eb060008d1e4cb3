//! Command-Line Interface

use crate::app::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gesture Engine - record, train and recognize 3D controller gestures
#[derive(Parser, Debug)]
#[command(name = "gesture-engine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides storage.data_dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and data directory
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Manage gestures
    Gesture {
        #[command(subcommand)]
        action: GestureAction,
    },

    /// Record a path file as a new example of a gesture
    Record {
        /// Gesture to add the example to
        #[arg(short, long)]
        gesture: String,

        /// JSON file with an array of path samples
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Manage classifiers
    Net {
        #[command(subcommand)]
        action: NetAction,
    },

    /// Classify a path file
    Classify {
        /// Classifier to use (defaults to the first configured one)
        #[arg(short, long)]
        net: Option<String>,

        /// JSON file with an array of path samples
        #[arg(short, long)]
        input: PathBuf,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Gesture subcommands
#[derive(Subcommand, Debug)]
pub enum GestureAction {
    /// List gestures
    List {
        /// Show example counts
        #[arg(short, long)]
        detailed: bool,
    },

    /// Create a gesture
    Create {
        /// Gesture name (defaults to "Gesture N")
        name: Option<String>,
    },

    /// Delete a gesture and all of its examples
    Delete {
        name: String,
    },

    /// List the examples of a gesture
    Examples {
        name: String,
    },

    /// Delete one example by index
    DeleteExample {
        name: String,

        /// Example index as shown by `gesture examples`
        index: usize,
    },
}

/// Classifier subcommands
#[derive(Subcommand, Debug)]
pub enum NetAction {
    /// List classifiers
    List,

    /// Train a classifier on all recorded examples
    Train {
        name: String,

        /// Give up waiting after this many seconds
        #[arg(short, long, default_value = "300")]
        timeout: u64,
    },

    /// Delete a classifier and its saved model
    Delete {
        name: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "detection.confidence_floor")
        key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Data directory after applying `--data-dir`
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| config.storage.data_dir.clone())
    }

    /// Config file path after applying `--config`
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
