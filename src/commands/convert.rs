//! Destination resolution, copy-then-convert plumbing and the per-file
//! conversion driver.
//!
//! Three input shapes are accepted, mirroring the classic tool:
//!
//! * a directory: the Python files are copied to `<dir>_PyQt5` (or `-o`)
//!   and converted in place there;
//! * a Python file: converted to `<stem>_PyQt5.<ext>` (or `-o`);
//! * any other file: treated as a newline-separated list of Python files,
//!   copied flat into `__PyQt5__` (or `-o`) and converted there.
//!
//! Originals are never modified.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::config;
use crate::io::{self, is_python_file};
use crate::passes::migrate_source;
use crate::report::{Annotation, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// What the `--diff`/`--diffs` flags asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffMode {
    Off,
    /// `--diff [NAME]`: one combined diff file. The value is either the
    /// literal `same_as` (flag given without a value), a directory, or a
    /// file name.
    Combined(String),
    /// `--diffs`: one diff file next to each converted file.
    PerFile,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub nosubdir: bool,
    pub followlinks: bool,
    pub diff: DiffMode,
    pub nolog: bool,
    pub tables: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub no_parallel: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
    pub fixmes_added: usize,
}

const LOG_NAME: &str = "pyqt4_to_pyqt5.log";

pub fn run(opts: &ConvertOptions) -> Result<Summary> {
    config::init_tables(opts.tables.as_deref())?;

    if let Some(jobs) = opts.jobs {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
        {
            log::debug!("thread pool already initialized: {err}");
        }
    }

    let log_path = (!opts.nolog).then(|| PathBuf::from(LOG_NAME));
    let quiet = opts.format == OutputFormat::Json;
    let reporter = Reporter::open(log_path.as_deref(), quiet)?;

    let summary = if opts.path.is_dir() {
        run_directory(opts, &reporter)?
    } else if opts.path.is_file() {
        if is_python_file(&opts.path) {
            run_single_file(opts, &reporter)?
        } else {
            run_file_list(opts, &reporter)?
        }
    } else {
        bail!("no such file or directory: `{}`", opts.path.display());
    };

    match opts.format {
        OutputFormat::Text => {
            reporter.note(&format!(
                "Done: {} updated, {} unchanged, {} errors, {} FIXMEs added.",
                summary.updated, summary.unchanged, summary.errors, summary.fixmes_added
            ));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(summary)
}

fn run_directory(opts: &ConvertOptions, reporter: &Reporter) -> Result<Summary> {
    let dest_root = opts
        .output
        .clone()
        .unwrap_or_else(|| suffixed_path(&opts.path, "_PyQt5"));
    fs::create_dir_all(&dest_root)
        .with_context(|| format!("can't create the dir `{}`", dest_root.display()))?;

    let sources = io::collect_python_files(&opts.path, opts.nosubdir, opts.followlinks)?;
    let mut pairs = Vec::with_capacity(sources.len());
    for src in sources {
        let rel: PathBuf = if opts.nosubdir {
            src.file_name().map(PathBuf::from).unwrap_or_default()
        } else {
            src.strip_prefix(&opts.path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| src.clone())
        };
        let dest = dest_root.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("can't create the dir `{}`", parent.display()))?;
        }
        fs::copy(&src, &dest)
            .with_context(|| format!("can't copy `{}` to `{}`", src.display(), dest.display()))?;
        pairs.push(FilePair { orig: src, dest });
    }

    reporter.note(&format!("Beginning into: {}\n", dest_root.display()));
    let sink = DiffSink::for_directory(&opts.diff, &dest_root);
    Ok(process_all(&pairs, reporter, &sink, !opts.no_parallel))
}

fn run_single_file(opts: &ConvertOptions, reporter: &Reporter) -> Result<Summary> {
    let dest = opts
        .output
        .clone()
        .unwrap_or_else(|| file_dest(&opts.path, "_PyQt5"));
    let sink = DiffSink::for_file(&opts.diff, &dest);
    let pair = FilePair {
        orig: opts.path.clone(),
        dest,
    };
    Ok(process_all(std::slice::from_ref(&pair), reporter, &sink, false))
}

fn run_file_list(opts: &ConvertOptions, reporter: &Reporter) -> Result<Summary> {
    let listing = fs::read_to_string(&opts.path)
        .with_context(|| format!("can't read the file `{}`", opts.path.display()))?;
    let mut names: Vec<&str> = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    names.sort_unstable();

    let dest_root = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("__PyQt5__"));
    fs::create_dir_all(&dest_root)
        .with_context(|| format!("can't create the dir `{}`", dest_root.display()))?;

    let mut pairs = Vec::new();
    for name in names {
        let src = PathBuf::from(name);
        if !src.is_file() {
            reporter.note(&format!("File `{name}` not found, ignored"));
            continue;
        }
        let Some(base) = src.file_name() else {
            continue;
        };
        let dest = dest_root.join(base);
        fs::copy(&src, &dest)
            .with_context(|| format!("can't copy `{}` to `{}`", src.display(), dest.display()))?;
        pairs.push(FilePair { orig: src, dest });
    }

    reporter.note(&format!("Beginning into: {}\n", dest_root.display()));
    let sink = DiffSink::for_directory(&opts.diff, &dest_root);
    Ok(process_all(&pairs, reporter, &sink, !opts.no_parallel))
}

struct FilePair {
    orig: PathBuf,
    dest: PathBuf,
}

enum Outcome {
    Unchanged,
    Updated(Vec<Annotation>),
}

/// Convert one file. In copy-then-convert mode `source` and `dest` are the
/// same path (the copy); in single-file mode the destination is only
/// written when something changed.
fn convert_file(source: &Path, dest: &Path) -> crate::core::Result<Outcome> {
    let raw = io::read_source(source)?;
    let migration = migrate_source(&raw.text())?;
    if !migration.changed {
        return Ok(Outcome::Unchanged);
    }
    io::write_source(source, dest, &migration.text, raw.encoding, raw.crlf)?;
    Ok(Outcome::Updated(migration.annotations))
}

fn process_all(
    pairs: &[FilePair],
    reporter: &Reporter,
    sink: &DiffSink,
    parallel: bool,
) -> Summary {
    let updated = AtomicUsize::new(0);
    let unchanged = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);
    let fixmes = AtomicUsize::new(0);

    let work = |pair: &FilePair| match convert_file(&pair.dest_or_orig(), &pair.dest) {
        Ok(Outcome::Unchanged) => {
            reporter.unchanged(&pair.orig);
            unchanged.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Outcome::Updated(annotations)) => {
            reporter.updated(&pair.orig, &annotations);
            updated.fetch_add(1, Ordering::Relaxed);
            fixmes.fetch_add(annotations.len(), Ordering::Relaxed);
            sink.emit(&pair.orig, &pair.dest);
        }
        Err(err) => {
            reporter.error(&pair.orig, &err.to_string());
            errors.fetch_add(1, Ordering::Relaxed);
        }
    };

    if parallel {
        pairs.par_iter().for_each(work);
    } else {
        pairs.iter().for_each(work);
    }

    Summary {
        updated: updated.into_inner(),
        unchanged: unchanged.into_inner(),
        errors: errors.into_inner(),
        fixmes_added: fixmes.into_inner(),
    }
}

impl FilePair {
    /// Where the current content lives: the copy when one was made, the
    /// original otherwise.
    fn dest_or_orig(&self) -> PathBuf {
        if self.dest.is_file() {
            self.dest.clone()
        } else {
            self.orig.clone()
        }
    }
}

/// Where unified diffs go, resolved once per run.
enum DiffSink {
    Off,
    /// `<dest stem>.diff` next to each converted file.
    PerFile,
    /// All diffs appended to one file, writes serialized.
    Single { path: PathBuf, lock: Mutex<()> },
}

impl DiffSink {
    fn single(path: PathBuf) -> Self {
        Self::Single {
            path,
            lock: Mutex::new(()),
        }
    }

    fn for_file(mode: &DiffMode, dest: &Path) -> Self {
        match mode {
            DiffMode::Off => Self::Off,
            DiffMode::PerFile => Self::PerFile,
            DiffMode::Combined(value) if value == "same_as" => Self::PerFile,
            DiffMode::Combined(value) => {
                let given = PathBuf::from(value);
                if given.is_dir() {
                    let name = dest
                        .with_extension("diff")
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("DIFFs.diff"));
                    Self::single(given.join(name))
                } else {
                    Self::single(given)
                }
            }
        }
    }

    fn for_directory(mode: &DiffMode, dest_root: &Path) -> Self {
        match mode {
            DiffMode::Off => Self::Off,
            DiffMode::PerFile => Self::PerFile,
            DiffMode::Combined(value) if value == "same_as" => {
                Self::single(dest_root.join("DIFFs.diff"))
            }
            DiffMode::Combined(value) => {
                let given = PathBuf::from(value);
                if given.is_dir() {
                    Self::single(given.join("DIFFs.diff"))
                } else {
                    Self::single(given)
                }
            }
        }
    }

    fn emit(&self, orig: &Path, dest: &Path) {
        let target = match self {
            Self::Off => return,
            Self::PerFile => dest.with_extension("diff"),
            Self::Single { path, .. } => path.clone(),
        };

        let output = match Command::new("diff").arg("-u").arg(orig).arg(dest).output() {
            Ok(output) => output,
            Err(err) => {
                log::warn!("could not run diff: {err}");
                return;
            }
        };
        // diff exits 1 when the files differ, which is the point.
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            log::warn!("diff failed for {}: {}", dest.display(), output.status);
            return;
        }

        let guard = match self {
            Self::Single { lock, .. } => Some(lock.lock()),
            _ => None,
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .and_then(|mut file| file.write_all(&output.stdout));
        if let Err(err) = result {
            log::warn!("can't write diff file {}: {err}", target.display());
        }
        drop(guard);
    }
}

fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// `pkg/tool.py` -> `pkg/tool_PyQt5.py`
fn file_dest(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}
