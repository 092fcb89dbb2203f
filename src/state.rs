//! Cross-pass migration state.
//!
//! The reclassification passes decide where classes now live; import
//! reconciliation later consumes those decisions. One `MigrationState` value
//! is created per file and threaded through every pass; no globals.

/// Which PyQt5 submodules the rewritten source now references.
#[derive(Debug, Default, Clone)]
pub struct ModuleUsage {
    pub qt_core: bool,
    pub qt_gui: bool,
    pub qt_widgets: bool,
    pub qt_print_support: bool,
    pub qt_multimedia: bool,
    pub qt_webkit: bool,
    pub qt_webkit_widgets: bool,
    /// QSound specifically: `from PyQt4 import ...` lines must gain
    /// QtMultimedia even when it never appeared before.
    pub qsound: bool,
    /// QStandardPaths moved conditionally: only flagged when
    /// displayName/storageLocation rewrites actually fired.
    pub qstandard_paths: bool,
}

impl ModuleUsage {
    /// Mark a destination module as referenced, by its PyQt5 name.
    pub fn mark(&mut self, module: &str) {
        match module {
            "QtCore" => self.qt_core = true,
            "QtGui" => self.qt_gui = true,
            "QtWidgets" => self.qt_widgets = true,
            "QtPrintSupport" => self.qt_print_support = true,
            "QtMultimedia" => self.qt_multimedia = true,
            "QtWebKit" => self.qt_webkit = true,
            "QtWebKitWidgets" => self.qt_webkit_widgets = true,
            _ => {}
        }
    }
}

/// Per-file state shared by the rewrite passes.
#[derive(Debug, Default, Clone)]
pub struct MigrationState {
    pub usage: ModuleUsage,
    /// A `pyqtSignal` declaration was synthesized; import rewriting keeps
    /// (renames) the `SIGNAL` import instead of dropping it.
    pub added_pyqt_signal: bool,
    /// The file already imports QtWidgets (or a star-import was inserted).
    pub has_widgets_import: bool,
    /// Indentation unit from the probe, used when wrapping import lines.
    pub indent_unit: char,
}

impl MigrationState {
    pub fn new(indent_unit: char) -> Self {
        Self {
            indent_unit,
            ..Self::default()
        }
    }
}
