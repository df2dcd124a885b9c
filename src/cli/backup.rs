use humantime::format_duration;

use crate::{
    error::Result,
    format::{format_path, format_size},
    ops::backup::{run, BackupPlan},
    stats::BackupStats,
};

use super::{
    args::BackupArgs,
    common::{create_client, load_config, print_stat},
};

pub async fn main(args: BackupArgs) -> Result<()> {
    let mut stats = BackupStats::new();
    let mut config = load_config(&args.global)?;
    if let Some(tasks) = args.tasks {
        config.upload.max_in_flight = tasks;
    }
    config.validate()?;

    let plan = BackupPlan {
        inputs: args.inputs,
        output_dir: args.output,
        folder_name: config.remote.backup_folder_name.clone(),
        retention: config.retention_policy()?,
        upload: config.upload_options(),
    };
    let client = create_client(&config)?;
    let outcome = run(plan, &client, &mut stats).await?;
    let elapsed = stats.end();

    if args.global.stats {
        print_stat("archive", format_path(&outcome.archive.path));
        print_stat("files archived", stats.files_archived);
        print_stat("bytes archived", format_size(stats.bytes_archived));
        print_stat("archive size", format_size(stats.archive_size));
        print_stat("upload mode", format!("{:?}", outcome.upload.mode));
        print_stat("parts uploaded", stats.parts_uploaded);
        print_stat("local backups pruned", outcome.local.deleted.len());
        print_stat("remote backups pruned", outcome.remote.deleted.len());
        print_stat("elapsed time", format_duration(elapsed));
    }

    Ok(())
}
