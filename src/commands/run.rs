use clap::Args;
use serde::Serialize;

use nsmigrate::log_status;
use nsmigrate::migrate::{self, MigrationReport};
use nsmigrate::rewrite::WriteMode;

use super::{CmdResult, GlobalArgs, TreeArgs};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    tree: TreeArgs,

    /// Apply changes to disk (default is dry-run)
    #[arg(long)]
    write: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RunOutput {
    #[serde(rename = "migrate.run")]
    Run {
        #[serde(flatten)]
        report: MigrationReport,
        applied: bool,
    },
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let mode = if args.write {
        WriteMode::Apply
    } else {
        WriteMode::DryRun
    };
    let options = args.tree.to_options(mode);
    let log = global.logger();

    log_status!(
        "run",
        "Migrating {}{}",
        options.root.display(),
        if args.write { "" } else { " (dry run)" }
    );
    let report = migrate::run(&options, &log)?;
    log_status!(
        "run",
        "{} files, {} lines changed",
        report.files_changed,
        report.lines_changed
    );

    Ok((
        RunOutput::Run {
            applied: args.write && report.files_changed > 0,
            report,
        },
        0,
    ))
}
