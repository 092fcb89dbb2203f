use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::commands::{ConvertOptions, DiffMode, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// Per-file progress on stdout
    Text,
    /// A JSON summary on stdout, progress only in the log file
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pyqt4to5")]
#[command(about = "Convert source code written for PyQt4 into valid code for PyQt5", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path of a file or a directory. The file may be Python source or a
    /// text file listing the files to convert, one per line.
    pub path: PathBuf,

    /// Name of the generated file, or directory if PATH is a directory
    /// [default: PATH_PyQt5]
    #[arg(short)]
    pub o: Option<PathBuf>,

    /// Don't process sub-directories
    #[arg(long)]
    pub nosubdir: bool,

    /// Visit directories pointed to by symlinks
    #[arg(long)]
    pub followlinks: bool,

    /// Write a diff file. With more than one file converted all diffs go
    /// into one file; without a value it is named after the source.
    #[arg(long, num_args = 0..=1, default_missing_value = "same_as")]
    pub diff: Option<String>,

    /// Write one diff file per converted file, next to it
    #[arg(long)]
    pub diffs: bool,

    /// Do not create a log file
    #[arg(long)]
    pub nolog: bool,

    /// Class membership tables to use instead of the built-in ones
    #[arg(long, value_name = "FILE")]
    pub tables: Option<PathBuf>,

    /// Number of worker threads [default: available parallelism]
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Process files sequentially
    #[arg(long)]
    pub no_parallel: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: Format,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn into_options(self) -> ConvertOptions {
        let diff = if self.diffs {
            DiffMode::PerFile
        } else {
            match self.diff {
                Some(value) => DiffMode::Combined(value),
                None => DiffMode::Off,
            }
        };
        ConvertOptions {
            path: self.path,
            output: self.o,
            nosubdir: self.nosubdir,
            followlinks: self.followlinks,
            diff,
            nolog: self.nolog,
            tables: self.tables,
            jobs: self.jobs,
            no_parallel: self.no_parallel,
            format: match self.format {
                Format::Text => OutputFormat::Text,
                Format::Json => OutputFormat::Json,
            },
        }
    }
}
