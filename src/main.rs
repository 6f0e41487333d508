use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod output;

use commands::{mapping, run, scan, GlobalArgs};
use nsmigrate::log::Verbosity;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "nsmigrate")]
#[command(version = VERSION)]
#[command(about = "Rewrite Android support-library references to their AndroidX equivalents")]
struct Cli {
    /// Increase diagnostic output on stderr (-v info, -vv debug, -vvv every substitution)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite sources, build files and config files under a tree
    Run(run::RunArgs),
    /// Classify the tree and report version placeholders without rewriting
    Scan(scan::ScanArgs),
    /// Load the mapping tables and report what they contain
    Mapping(mapping::MappingArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        verbosity: if cli.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from_count(cli.verbose)
        },
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
