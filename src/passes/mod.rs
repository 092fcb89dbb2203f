//! The rewrite pass pipeline.
//!
//! Passes run in a fixed total order with load-bearing dependencies: the
//! signal/slot call rewrites run first (they may introduce new class
//! references), module reclassification runs next (it decides, per class,
//! the new owning submodule and records it in [`MigrationState`]), import
//! rewriting consumes that state, and the cosmetic renames come last.
//!
//! A pass that cannot safely determine a rewrite never guesses: it inserts a
//! `# FIXME$ ...` sentinel comment immediately before the unmodified line.
//! The annotation finalizer later turns the sentinels into the report.

pub mod compat;
pub mod fixmes;
pub mod graphics;
pub mod imports;
pub mod methods;
pub mod modules;
pub mod signals;
pub mod synthesize;

use crate::core::{Result, SourceDocument};
use crate::parse;
use crate::report::{self, Annotation};
use crate::state::MigrationState;

/// Marker spelled into inserted comments; rewritten to a plain `FIXME` by
/// the finalizer so a second run never re-counts old annotations.
pub const SENTINEL: &str = "FIXME$";

pub(crate) fn sentinel_line(indent: &str, message: &str) -> String {
    format!("{indent}# {SENTINEL} {message}\n")
}

/// What the pre-pipeline scan found in the file; gates entire pass groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageScan {
    /// Any PyQt4 import at all.
    pub qt4: bool,
    /// Old-style SIGNAL/SLOT/emit usage anywhere in the code.
    pub signals: bool,
    /// A QtGui import (or the `.Qt` umbrella, which implies it).
    pub gui: bool,
    /// A QtWebKit import (or the `.Qt` umbrella).
    pub web: bool,
}

impl UsageScan {
    pub fn any(&self) -> bool {
        self.qt4 || self.signals || self.gui || self.web
    }
}

/// Scan the document once to decide which pass groups need to run.
pub fn scan_usage(doc: &SourceDocument) -> UsageScan {
    let mut scan = UsageScan::default();
    for line in doc.iter() {
        let text = &line.text;
        if line.is_code()
            && (text.contains("SIGNAL(") || text.contains("SLOT(") || text.contains(".emit("))
        {
            scan.signals = true;
        }
        let stripped = text.trim_start();
        if (stripped.starts_with("import ") || stripped.starts_with("from "))
            && text.contains("PyQt4")
        {
            scan.qt4 = true;
            if text.contains(".Qt ") || text.contains(".Qt\n") || text.contains("PyQt4.Qt import")
            {
                scan.gui = true;
                scan.web = true;
            }
            if text.contains("QtGui") {
                scan.gui = true;
            }
            if text.contains("QtWebKit") {
                scan.web = true;
            }
        }
    }
    scan
}

/// Which scan flag enables a pass.
#[derive(Debug, Clone, Copy)]
pub enum Gate {
    Always,
    Signals,
    Gui,
    Web,
}

pub struct Pass {
    pub name: &'static str,
    pub gate: Gate,
    pub run: fn(&mut SourceDocument, &mut MigrationState),
}

/// The fixed pass order. Reordering entries here breaks the cross-pass
/// contracts spelled out in the module docs.
pub fn pipeline() -> &'static [Pass] {
    const PASSES: &[Pass] = &[
        Pass {
            name: "strip_from_utf8",
            gate: Gate::Always,
            run: compat::strip_from_utf8,
        },
        Pass {
            name: "rewrite_emit",
            gate: Gate::Signals,
            run: signals::rewrite_emit,
        },
        Pass {
            name: "rewrite_connect",
            gate: Gate::Signals,
            run: signals::rewrite_connect,
        },
        Pass {
            name: "rewrite_disconnect",
            gate: Gate::Signals,
            run: signals::rewrite_disconnect,
        },
        Pass {
            name: "clean_signal_decorators",
            gate: Gate::Signals,
            run: signals::clean_signal_decorators,
        },
        Pass {
            name: "rename_slot_decorators",
            gate: Gate::Signals,
            run: signals::rename_slot_decorators,
        },
        Pass {
            name: "reclassify_qtgui_to_qtcore",
            gate: Gate::Gui,
            run: modules::reclassify_qtgui_to_qtcore,
        },
        Pass {
            name: "reclassify_qtgui_to_qtwidgets",
            gate: Gate::Gui,
            run: modules::reclassify_qtgui_to_qtwidgets,
        },
        Pass {
            name: "reclassify_qtgui_to_qtprintsupport",
            gate: Gate::Gui,
            run: modules::reclassify_qtgui_to_qtprintsupport,
        },
        Pass {
            name: "reclassify_qtwebkit",
            gate: Gate::Web,
            run: modules::reclassify_qtwebkit,
        },
        Pass {
            name: "rewrite_imports",
            gate: Gate::Always,
            run: imports::rewrite_imports,
        },
        Pass {
            name: "fix_qfiledialog",
            gate: Gate::Always,
            run: methods::fix_qfiledialog,
        },
        Pass {
            name: "fix_qdir",
            gate: Gate::Always,
            run: methods::fix_qdir,
        },
        Pass {
            name: "ensure_widgets_import",
            gate: Gate::Always,
            run: modules::ensure_widgets_import,
        },
        Pass {
            name: "flag_qtscript",
            gate: Gate::Always,
            run: fixmes::flag_qtscript,
        },
        Pass {
            name: "flag_qtxml",
            gate: Gate::Always,
            run: fixmes::flag_qtxml,
        },
        Pass {
            name: "flag_qtdeclarative",
            gate: Gate::Always,
            run: fixmes::flag_qtdeclarative,
        },
        Pass {
            name: "flag_qgraphicsitemanimation",
            gate: Gate::Always,
            run: fixmes::flag_qgraphicsitemanimation,
        },
        Pass {
            name: "flag_qtopengl",
            gate: Gate::Always,
            run: fixmes::flag_qtopengl,
        },
        Pass {
            name: "fix_translations",
            gate: Gate::Always,
            run: methods::fix_translations,
        },
        Pass {
            name: "fix_wheelevent",
            gate: Gate::Always,
            run: methods::fix_wheelevent,
        },
        Pass {
            name: "fix_layout_margin",
            gate: Gate::Always,
            run: methods::fix_layout_margin,
        },
        Pass {
            name: "fix_qdesktopservices",
            gate: Gate::Always,
            run: methods::fix_qdesktopservices,
        },
        Pass {
            name: "fix_qdate",
            gate: Gate::Always,
            run: methods::fix_qdate,
        },
        Pass {
            name: "fix_qgraphicsitem",
            gate: Gate::Always,
            run: graphics::fix_qgraphicsitem,
        },
        Pass {
            name: "fix_qheader",
            gate: Gate::Always,
            run: methods::fix_qheader,
        },
        Pass {
            name: "fix_qinputdialog",
            gate: Gate::Always,
            run: methods::fix_qinputdialog,
        },
        Pass {
            name: "fix_qchar",
            gate: Gate::Always,
            run: compat::fix_qchar,
        },
        Pass {
            name: "fix_qstring",
            gate: Gate::Always,
            run: compat::fix_qstring,
        },
        Pass {
            name: "fix_qglobal",
            gate: Gate::Always,
            run: methods::fix_qglobal,
        },
        Pass {
            name: "fix_qvariant",
            gate: Gate::Always,
            run: methods::fix_qvariant,
        },
        Pass {
            name: "rename_classes",
            gate: Gate::Always,
            run: methods::rename_classes,
        },
        Pass {
            name: "replace_qapp",
            gate: Gate::Always,
            run: compat::replace_qapp,
        },
    ];
    PASSES
}

/// Run every enabled pass, in order, over the document.
pub fn run_pipeline(doc: &mut SourceDocument, state: &mut MigrationState, scan: &UsageScan) {
    for pass in pipeline() {
        let enabled = match pass.gate {
            Gate::Always => true,
            Gate::Signals => scan.signals,
            Gate::Gui => scan.gui,
            Gate::Web => scan.web,
        };
        if !enabled {
            continue;
        }
        log::debug!("running pass {}", pass.name);
        (pass.run)(doc, state);
    }
}

/// Result of migrating one file's text.
#[derive(Debug)]
pub struct Migration {
    pub text: String,
    pub changed: bool,
    pub annotations: Vec<Annotation>,
}

/// The whole engine, file I/O excluded: segment, probe, run the pipeline,
/// finalize annotations. `changed` is false when the scan found nothing to
/// migrate (the caller then leaves the file alone).
pub fn migrate_source(source: &str) -> Result<Migration> {
    let physical: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();
    let mut doc = parse::segment(&physical)?;

    let scan = scan_usage(&doc);
    if !scan.any() {
        return Ok(Migration {
            text: source.to_owned(),
            changed: false,
            annotations: Vec::new(),
        });
    }

    let unit = parse::indentation_unit(&doc);
    let mut state = MigrationState::new(unit);
    run_pipeline(&mut doc, &mut state, &scan);
    let annotations = report::finalize_annotations(&mut doc);

    Ok(Migration {
        text: doc.text(),
        changed: true,
        annotations,
    })
}
