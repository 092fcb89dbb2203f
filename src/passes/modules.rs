//! Module reclassification.
//!
//! Qt5 split the old monolithic `QtGui` into `QtGui`, `QtWidgets` and
//! `QtPrintSupport`, and moved the WebKit widget classes into
//! `QtWebKitWidgets`. These passes rewrite qualified references on usage
//! lines (`QtGui.QDialog` becomes `QtWidgets.QDialog`) and record which
//! destination modules the file now needs, for the import rewrite to
//! consume. Import lines themselves are left alone here.

use crate::config::tables;
use crate::core::SourceDocument;
use crate::passes::sentinel_line;
use crate::state::MigrationState;

/// Map one class reference. Two classes escape the general tables: `QSound`
/// moved to QtMultimedia and `QStringListModel` to QtCore regardless of
/// which split is running.
fn destination(class: &str, old_mod: &str, new_mod: &str, state: &mut MigrationState) -> String {
    if class == "QSound" {
        state.usage.mark("QtMultimedia");
        state.usage.qsound = true;
        return "QtMultimedia".to_owned();
    }
    if class == "QStringListModel" {
        state.usage.mark("QtCore");
        return "QtCore".to_owned();
    }
    if tables().belongs_to(new_mod, class) {
        state.usage.mark(new_mod);
        new_mod.to_owned()
    } else {
        state.usage.mark(old_mod);
        old_mod.to_owned()
    }
}

/// Rewrite every `OLD.Class` reference on one code line. Returns `None` when
/// an occurrence of the module name is not followed by a dotted class
/// reference, in which case the caller annotates instead of guessing.
fn reclassify_line(
    text: &str,
    old_mod: &str,
    new_mod: &str,
    state: &mut MigrationState,
) -> Option<String> {
    let dotted = format!("{old_mod}.");
    if !text.contains(&dotted) {
        return Some(text.to_owned());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(old_mod) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + old_mod.len()..];
        if !after.starts_with('.') {
            return None;
        }
        let class: String = after[1..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        out.push_str(&destination(class.trim(), old_mod, new_mod, state));
        rest = after;
    }
    out.push_str(rest);
    Some(out)
}

fn reclassify(doc: &mut SourceDocument, state: &mut MigrationState, old_mod: &str, new_mod: &str) {
    doc.rebuild(|line, out| {
        if !line.is_code() || line.text.contains(" import ") || !line.text.contains(old_mod) {
            out.keep(line);
            return;
        }
        match reclassify_line(&line.text, old_mod, new_mod, state) {
            Some(text) => out.replace(line, text),
            None => {
                out.emit(
                    line,
                    sentinel_line(line.indent(), "Ambiguous syntax, can't refactor it."),
                );
                out.keep(line);
            }
        }
    });
}

pub fn reclassify_qtgui_to_qtcore(doc: &mut SourceDocument, state: &mut MigrationState) {
    reclassify(doc, state, "QtGui", "QtCore");
}

pub fn reclassify_qtgui_to_qtwidgets(doc: &mut SourceDocument, state: &mut MigrationState) {
    reclassify(doc, state, "QtGui", "QtWidgets");
}

pub fn reclassify_qtgui_to_qtprintsupport(doc: &mut SourceDocument, state: &mut MigrationState) {
    reclassify(doc, state, "QtGui", "QtPrintSupport");
}

pub fn reclassify_qtwebkit(doc: &mut SourceDocument, state: &mut MigrationState) {
    reclassify(doc, state, "QtWebKit", "QtWebKitWidgets");
}

/// Last-resort import: a file that references QtWidgets classes unqualified
/// but ended the import rewrite without any QtWidgets import gets a star
/// import right after the first import statement.
pub fn ensure_widgets_import(doc: &mut SourceDocument, state: &mut MigrationState) {
    if state.has_widgets_import {
        return;
    }
    let needs_widgets = doc.iter().any(|line| {
        line.is_code()
            && tables()
                .classes("QtWidgets")
                .iter()
                .any(|cls| line.text.contains(cls.as_str()))
    });
    if !needs_widgets {
        return;
    }
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        let stripped = line.text.trim_start();
        if line.is_code()
            && (stripped.starts_with("import ") || stripped.starts_with("from "))
            && !line.text.contains("__future__")
        {
            let indent = line.indent().to_owned();
            doc.insert(idx + 1, format!("{indent}from PyQt5.QtWidgets import *\n"));
            state.has_widgets_import = true;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::segment;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> SourceDocument {
        let lines: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();
        segment(&lines).unwrap()
    }

    #[test]
    fn widget_reference_moves_to_qtwidgets() {
        let mut d = doc("d = QtGui.QDialog(self)\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert_eq!(d.text(), "d = QtWidgets.QDialog(self)\n");
        assert!(st.usage.qt_widgets);
    }

    #[test]
    fn genuine_gui_class_stays_put() {
        let mut d = doc("p = QtGui.QPainter(self)\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert_eq!(d.text(), "p = QtGui.QPainter(self)\n");
        assert!(st.usage.qt_gui);
    }

    #[test]
    fn proxy_model_moves_to_qtcore() {
        let mut d = doc("m = QtGui.QSortFilterProxyModel()\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtcore(&mut d, &mut st);
        assert_eq!(d.text(), "m = QtCore.QSortFilterProxyModel()\n");
        assert!(st.usage.qt_core);
    }

    #[test]
    fn qsound_is_special_cased() {
        let mut d = doc("s = QtGui.QSound('beep.wav')\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert_eq!(d.text(), "s = QtMultimedia.QSound('beep.wav')\n");
        assert!(st.usage.qsound);
    }

    #[test]
    fn mixed_references_on_one_line() {
        let mut d = doc("x = QtGui.QDialog(QtGui.QCursor())\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert_eq!(d.text(), "x = QtWidgets.QDialog(QtGui.QCursor())\n");
    }

    #[test]
    fn bare_module_reference_is_annotated() {
        let mut d = doc("mod = QtGui.QDialog if flag else QtGui\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert!(d.text().starts_with("# FIXME$ Ambiguous syntax"));
        assert!(d.text().contains("mod = QtGui.QDialog if flag else QtGui\n"));
    }

    #[test]
    fn import_lines_are_untouched() {
        let mut d = doc("from PyQt4.QtGui import QDialog\n");
        let mut st = MigrationState::new(' ');
        reclassify_qtgui_to_qtwidgets(&mut d, &mut st);
        assert_eq!(d.text(), "from PyQt4.QtGui import QDialog\n");
    }

    #[test]
    fn star_import_added_when_widgets_unimported() {
        let mut d = doc("import sys\n\napp = QApplication(sys.argv)\n");
        let mut st = MigrationState::new(' ');
        ensure_widgets_import(&mut d, &mut st);
        assert_eq!(
            d.text(),
            "import sys\nfrom PyQt5.QtWidgets import *\n\napp = QApplication(sys.argv)\n"
        );
        assert!(st.has_widgets_import);
    }

    #[test]
    fn star_import_skipped_when_flagged() {
        let mut d = doc("import sys\napp = QApplication(sys.argv)\n");
        let mut st = MigrationState::new(' ');
        st.has_widgets_import = true;
        ensure_widgets_import(&mut d, &mut st);
        assert_eq!(d.text(), "import sys\napp = QApplication(sys.argv)\n");
    }
}
