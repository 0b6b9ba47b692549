use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Zabbix Template Synchronization Tool
///
/// Export templates from the server to local XML files, import local files
/// into the server, or diff local definitions against server state
#[derive(Parser, Debug)]
#[command(name = "zbxsync")]
#[command(long_about = None, version)]
#[command(group(
    ArgGroup::new("verb")
        .required(true)
        .args(["export_all", "export", "compare", "import_files"])
))]
pub struct Cli {
    /// Export every template on the server
    #[arg(short = 'a', long)]
    pub export_all: bool,

    /// Export the named template(s)
    #[arg(short = 'e', long, value_name = "NAME", num_args = 1..)]
    pub export: Vec<String>,

    /// Compare local file(s) against the server definition
    #[arg(short = 'c', long, value_name = "FILE", num_args = 1..)]
    pub compare: Vec<PathBuf>,

    /// Import local file(s) into the server
    #[arg(short = 'i', long = "import", value_name = "FILE", num_args = 1..)]
    pub import_files: Vec<PathBuf>,

    /// Destination directory for exports (overrides the configured export_dir)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dest_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
