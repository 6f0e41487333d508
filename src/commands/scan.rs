use clap::Args;
use serde::Serialize;

use nsmigrate::migrate::{self, ScanReport};
use nsmigrate::rewrite::WriteMode;

use super::{CmdResult, GlobalArgs, TreeArgs};

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    tree: TreeArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ScanOutput {
    #[serde(rename = "migrate.scan")]
    Scan {
        #[serde(flatten)]
        report: ScanReport,
    },
}

pub fn run(args: ScanArgs, global: &GlobalArgs) -> CmdResult<ScanOutput> {
    let options = args.tree.to_options(WriteMode::DryRun);
    let report = migrate::scan(&options, &global.logger())?;
    Ok((ScanOutput::Scan { report }, 0))
}
