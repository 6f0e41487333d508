use clap::Args;
use std::path::PathBuf;

use nsmigrate::log::{Logger, Verbosity};
use nsmigrate::migrate::MigrateOptions;
use nsmigrate::rewrite::WriteMode;

pub type CmdResult<T> = nsmigrate::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub verbosity: Verbosity,
}

impl GlobalArgs {
    pub fn logger(&self) -> Logger {
        Logger::stderr(self.verbosity)
    }
}

/// Inputs shared by every command: the tree, the tables and the config file.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Root of the tree to migrate
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Symbol table: URL, file:// URL or local CSV path
    #[arg(long, value_name = "SRC")]
    pub symbols: Option<String>,

    /// Artifact table: URL, file:// URL or local CSV path
    #[arg(long, value_name = "SRC")]
    pub artifacts: Option<String>,

    /// Config file (default: <root>/nsmigrate.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip directories whose path matches this regex (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    pub excludes: Vec<String>,
}

impl TreeArgs {
    pub fn to_options(&self, mode: WriteMode) -> MigrateOptions {
        MigrateOptions {
            root: PathBuf::from(shellexpand::tilde(&self.root.to_string_lossy()).into_owned()),
            symbols: self.symbols.clone(),
            artifacts: self.artifacts.clone(),
            config: self.config.clone(),
            excludes: self.excludes.clone(),
            mode,
        }
    }
}

pub mod mapping;
pub mod run;
pub mod scan;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (nsmigrate::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Scan(args) => dispatch!(args, global, scan),
        crate::Commands::Mapping(args) => dispatch!(args, global, mapping),
    }
}
