use std::{ops::RangeInclusive, path::PathBuf};

use clap::{ArgAction, Args};

use super::parse::parse_range_inclusive;

const TASK_COUNT_RANGE: RangeInclusive<usize> = 1..=1024;

fn parse_task_count(s: &str) -> Result<usize, String> {
    parse_range_inclusive(s, TASK_COUNT_RANGE)
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Files, directories or glob patterns to back up
    #[arg(required = true, value_name = "PATHS")]
    pub inputs: Vec<String>,

    /// Directory that keeps the local copies of each archive
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Number of parts to upload at once (overrides `upload.max_in_flight`)
    #[arg(short = 'j', long, value_name = "NUM", value_parser = parse_task_count)]
    pub tasks: Option<usize>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Config file (defaults to `$BOXUP_CONFIG`, then ~/.boxup/config.yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print stats after completion
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}
