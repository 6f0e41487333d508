use clap::Args;
use serde::Serialize;

use nsmigrate::migrate::{self, MappingSummary};
use nsmigrate::rewrite::WriteMode;

use super::{CmdResult, GlobalArgs, TreeArgs};

#[derive(Args)]
pub struct MappingArgs {
    #[command(flatten)]
    tree: TreeArgs,

    /// Only list wildcard packages that map to more than one destination
    #[arg(long)]
    ambiguous: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum MappingOutput {
    #[serde(rename = "migrate.mapping")]
    Mapping {
        #[serde(flatten)]
        summary: MappingSummary,
    },
}

pub fn run(args: MappingArgs, global: &GlobalArgs) -> CmdResult<MappingOutput> {
    let options = args.tree.to_options(WriteMode::DryRun);
    let mut summary = migrate::describe_mapping(&options, &global.logger())?;

    if args.ambiguous {
        summary.projections.retain(|p| !p.unique);
    }

    Ok((MappingOutput::Mapping { summary }, 0))
}
