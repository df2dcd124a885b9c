mod args;
mod backup;
mod common;
mod parse;

use std::process::ExitCode;

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use log::error;

use crate::logger;

use self::args::{BackupArgs, GlobalArgs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Archive files, upload the archive and prune old backups
    Backup(BackupArgs),
}

impl Command {
    fn global(&self) -> &GlobalArgs {
        match self {
            Command::Backup(args) => &args.global,
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.command.global());

    let result = match cli.command {
        Command::Backup(args) => backup::main(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(args: &GlobalArgs) {
    let level = logger::level_from_args(args.logger.verbose, args.logger.quiet);
    logger::init(level);
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn backup_args_parse() {
        let cli = Cli::try_parse_from([
            "boxup", "backup", "-o", "/tmp/out", "-j", "4", "-vv", "--stats", "/etc/*.conf", "/srv",
        ])
        .unwrap();
        let Command::Backup(args) = cli.command;
        assert_eq!(args.inputs, ["/etc/*.conf", "/srv"]);
        assert_eq!(args.output.to_str(), Some("/tmp/out"));
        assert_eq!(args.tasks, Some(4));
        assert_eq!(args.global.logger.verbose, 2);
        assert!(args.global.stats);
    }

    #[test]
    fn backup_requires_output_and_paths() {
        assert!(Cli::try_parse_from(["boxup", "backup", "/srv"]).is_err());
        assert!(Cli::try_parse_from(["boxup", "backup", "-o", "/tmp/out"]).is_err());
        assert!(Cli::try_parse_from(["boxup", "backup", "-o", "/tmp", "-j", "0", "/srv"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["boxup", "backup", "-o", "/tmp", "-v", "-q", "/srv"]).is_err());
    }
}
