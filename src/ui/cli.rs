// Tue Jan 13 2026 - Alex

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "heap-inspector")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Walks, verifies and summarizes a captured managed GC heap")]
#[command(long_about = None)]
pub struct CliInterface {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, help = "Heap image (JSON) to inspect")]
    pub image: PathBuf,

    #[arg(short, long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Print results as JSON")]
    pub json: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Skip card table checks during verification")]
    pub no_cards: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "List the heaps and their segments")]
    Heap,

    #[command(about = "Object counts and sizes by type")]
    Stat {
        #[arg(short, long, help = "Show only the largest N types")]
        top: Option<usize>,
    },

    #[command(about = "String objects grouped by content")]
    Strings {
        #[arg(short, long, help = "Show only the largest N groups")]
        top: Option<usize>,
    },

    #[command(about = "Walk the heap and check every object")]
    Verify {
        #[arg(long, default_value = "100", help = "Stop recording issues after this many")]
        max_issues: usize,
    },

    #[command(about = "Mark everything reachable from the roots")]
    Live {
        #[arg(long, help = "List every live object")]
        objects: bool,
    },

    #[command(about = "Find the segment and object holding an address")]
    Locate {
        #[arg(help = "Address (hex)")]
        address: String,
    },

    #[command(about = "Shortest reference chain from a root to an object")]
    Gcroot {
        #[arg(help = "Object address (hex)")]
        address: String,
    },

    #[command(about = "Allocated, committed and free bytes per generation")]
    Usage {
        #[arg(long, help = "Also compute unrooted bytes")]
        live: bool,
    },

    #[command(about = "Finalize queue contents")]
    Finalizers {
        #[arg(long, help = "Also list registered objects no root reaches")]
        live: bool,
    },
}

impl CliInterface {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
