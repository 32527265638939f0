use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use std::io;

use pinsetup::{builtin_profiles, run, select_profile, Cli, SysfsWriter};

fn main() -> Result<()> {
    // usage errors print help and exit non-zero before anything is touched
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if cli.list_boards {
        for profile in builtin_profiles() {
            println!("{}", profile);
        }
        return Ok(());
    }

    let profile = select_profile(&cli.board, cli.board_file.as_deref(), cli.sysfs_root.as_deref())?;
    debug!("Using board profile {} at {}", profile, profile.sysfs_root.display());

    let pins = profile.legal_pins();
    let writer = SysfsWriter::new(&profile.sysfs_root);

    let summary = run(
        &cli,
        &pins,
        writer,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
    .context("Failed to write to the terminal")?;
    debug!(
        "{} succeeded, {} failed, {} invalid",
        summary.succeeded, summary.failed, summary.invalid
    );

    Ok(())
}
