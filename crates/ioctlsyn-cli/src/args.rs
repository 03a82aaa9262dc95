use std::path::PathBuf;

use clap::Parser;

/// Command-line front end for the ioctl-description synthesis pipeline.
///
/// Not part of the analysis core (it is an external collaborator per the
/// pipeline's scope): it loads a JSON-serialized CodeDB snapshot, runs the
/// pipeline, and writes the two output files per surviving handler.
#[derive(Parser, Debug)]
#[command(name = "ioctlsyn", version, about = "Synthesizes fuzzer ioctl descriptions from a CodeDB snapshot")]
pub struct CliArgs {
    /// Path to a JSON-serialized CodeDB snapshot.
    pub codedb: PathBuf,

    /// Output directory for the generated `.txt`/`.const` files. Created if
    /// absent; an existing file at either target path is a hard error.
    #[arg(short = 'o', long = "output", default_value = "syzdescriptor_out")]
    pub output: PathBuf,

    /// `dispatch_type:slot_name` pair to scan for, repeatable. Defaults to
    /// the three built-in supported syscalls when omitted.
    #[arg(short = 'g', long = "generate")]
    pub generate: Vec<String>,

    /// Architecture tag embedded in `.const` filenames.
    #[arg(short = 'a', long = "arch", default_value = "amd64")]
    pub arch: String,

    /// Increase log verbosity (info -> debug -> trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
