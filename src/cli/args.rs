//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Nested set forests: interval-encoded ordered trees with atomic mutations
#[derive(Parser, Debug)]
#[command(name = "nestree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Forest file (default: forest_file setting)
    #[arg(short = 'f', long = "file", global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Directory holding a local .nestree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Tree selector shared by most commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct TreeArg {
    /// Tree id (may be omitted while the forest holds a single tree)
    #[arg(short, long)]
    pub tree: Option<u64>,
}

/// Target position for inserts and moves; exactly one must be given.
#[derive(Args, Debug, Clone, Copy)]
pub struct PositionArgs {
    /// Place as left sibling of this node
    #[arg(long, conflicts_with_all = ["after", "parent"])]
    pub before: Option<u64>,

    /// Place as right sibling of this node
    #[arg(long, conflicts_with = "parent")]
    pub after: Option<u64>,

    /// Place under this node (last child unless --index is given)
    #[arg(long)]
    pub parent: Option<u64>,

    /// Child index under --parent; negative counts from the end
    #[arg(long, requires = "parent", allow_negative_numbers = true)]
    pub index: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show trees as text
    Show {
        #[command(flatten)]
        tree: TreeArg,
        /// Subtree root
        node: Option<u64>,
    },

    /// List trees with root and size
    Trees,

    /// Append a child (or create the root of a new tree without --parent)
    Add {
        #[command(flatten)]
        tree: TreeArg,
        /// Parent node
        #[arg(long)]
        parent: Option<u64>,
        /// Field values as KEY=VALUE
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Insert a node at a position
    Insert {
        #[command(flatten)]
        tree: TreeArg,
        #[command(flatten)]
        position: PositionArgs,
        /// Field values as KEY=VALUE
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Move a node and its subtree
    Move {
        /// Node to move
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
        /// Destination tree (default: source tree)
        #[arg(long)]
        to_tree: Option<u64>,
        #[command(flatten)]
        position: PositionArgs,
    },

    /// Delete a node and its subtree
    Delete {
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
        /// Leave gaps in the numbering (see close-gaps)
        #[arg(long)]
        keep_gaps: bool,
    },

    /// Renumber a tree contiguously
    CloseGaps {
        #[command(flatten)]
        tree: TreeArg,
    },

    /// Set field values on a node
    Update {
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
        /// Field values as KEY=VALUE
        #[arg(short, long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Show one node
    Get {
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
    },

    /// Path from the root to a node
    Path {
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
        /// Fields to show per node (default: id)
        #[arg(short = 'F', long = "field")]
        fields: Vec<String>,
    },

    /// Direct children of a node
    Children {
        node: u64,
        #[command(flatten)]
        tree: TreeArg,
        /// At most N children
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Right to left
        #[arg(short, long)]
        reverse: bool,
        /// Only the child at this index; negative counts from the end
        #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["limit", "reverse"])]
        index: Option<i64>,
    },

    /// Leaves of a tree or subtree
    Leaves {
        #[command(flatten)]
        tree: TreeArg,
        node: Option<u64>,
    },

    /// Level of every node
    Levels {
        #[command(flatten)]
        tree: TreeArg,
    },

    /// Number of levels
    Height {
        #[command(flatten)]
        tree: TreeArg,
    },

    /// Node count of a tree or subtree
    Size {
        #[command(flatten)]
        tree: TreeArg,
        node: Option<u64>,
    },

    /// Descendant ids of a node (or all non-root nodes)
    Descendants {
        #[command(flatten)]
        tree: TreeArg,
        node: Option<u64>,
    },

    /// Verify interval invariants
    Check {
        /// Tree id (default: all trees)
        #[arg(short, long)]
        tree: Option<u64>,
    },

    /// Write trees in the exchange format
    Export {
        /// Trees to export (default: all)
        #[arg(short, long = "tree")]
        trees: Vec<u64>,
        /// Fields to export (default: declared fields)
        #[arg(short = 'F', long = "field")]
        fields: Vec<String>,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Add trees from an exchange document
    Import {
        /// Exchange document
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },

    /// Show the effective configuration
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Whether the command changes the forest file.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Add { .. }
                | Commands::Insert { .. }
                | Commands::Move { .. }
                | Commands::Delete { .. }
                | Commands::CloseGaps { .. }
                | Commands::Update { .. }
                | Commands::Import { .. }
        )
    }
}
