mod args;

use std::fs;
use std::io::ErrorKind;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use args::CliArgs;
use ioctlsyn_core::dispatch::SupportedSyscall;
use ioctlsyn_core::{Emitter, HandlerOutcome, MemoryCodeDb, Pipeline};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    let text = fs::read_to_string(&args.codedb)
        .with_context(|| format!("reading CodeDB snapshot at {}", args.codedb.display()))?;
    let db = MemoryCodeDb::from_json(&text).context("parsing CodeDB snapshot")?;

    let supported = parse_supported_syscalls(&args.generate)?;
    let pipeline = Pipeline::new().with_supported_syscalls(supported);
    let (mut survivors, report) = pipeline.run(&db)?;

    for (name, outcome) in &report {
        if let HandlerOutcome::Discarded { pass } = outcome {
            warn!(handler = %name, pass, "handler discarded");
        }
    }
    info!(survivors = survivors.len(), total = report.len(), "pipeline finished");

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    let today = today_utc();
    let mut emitter = Emitter::new();
    for handler in &mut survivors {
        let emitted = emitter.emit(&db, handler, &today)?;

        let description_path = args.output.join(format!("{}.txt", handler.name));
        let constants_path = args.output.join(format!("{}_{}.const", handler.name, args.arch));

        write_create_exclusive(&description_path, &emitted.description)?;
        write_create_exclusive(&constants_path, &emitted.constants)?;
        info!(handler = %handler.name, "wrote description and constants");
    }

    Ok(())
}

fn parse_supported_syscalls(generate: &[String]) -> Result<Vec<SupportedSyscall>> {
    if generate.is_empty() {
        return Ok(ioctlsyn_core::dispatch::default_supported_syscalls());
    }
    generate
        .iter()
        .map(|entry| {
            let Some((dispatch_type, slot_name)) = entry.split_once(':') else {
                bail!("--generate entries must be `dispatch_type:slot_name`, got `{entry}`");
            };
            Ok(SupportedSyscall::new(dispatch_type, slot_name))
        })
        .collect()
}

/// Files are written once, create-exclusive: an existing file at the target
/// path is a hard error surfaced to the caller without cleanup.
fn write_create_exclusive(path: &std::path::Path, contents: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            bail!("output file already exists: {}", path.display());
        }
        Err(err) => return Err(err).with_context(|| format!("creating {}", path.display())),
    };
    file.write_all(contents.as_bytes())
        .with_context(|| format!("writing {}", path.display()))
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("ioctlsyn={level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2))
        .init();
}

/// Today's UTC date as `YYYY-MM-DD`, computed without pulling in a date
/// crate just for a header comment. Civil-date conversion follows Howard
/// Hinnant's `civil_from_days` algorithm.
fn today_utc() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = (secs / 86_400) as i64;
    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}")
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
