//! Import reconciliation.
//!
//! Runs after the usage-site passes so [`MigrationState`] already knows
//! which destination modules the file needs. Legacy import lines are torn
//! apart, their names classified through the membership tables, and one
//! import per destination module is emitted, re-wrapped at 80 columns.
//! Names the new API dropped (`SIGNAL`, `SLOT`, `QString`, `QStringList`)
//! disappear here; `SIGNAL` turns into `pyqtSignal` when declaration
//! synthesis added one.

use crate::config::tables;
use crate::core::{DocBuilder, LogicalLine, SourceDocument};
use crate::state::MigrationState;

/// Elements of an import list: everything after `import `, with wrapping
/// punctuation and continuations stripped. Comment fragments of a
/// parenthesized multi-line import survive as their own elements.
fn import_elements(tail: &str) -> Vec<String> {
    tail.split(|c| c == ',' || c == '\n')
        .map(|e| {
            e.replace('\\', "")
                .replace('(', "")
                .replace(')', "")
                .trim()
                .to_owned()
        })
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Offset of `name` in `text` as a standalone token, skipping occurrences
/// inside `#` comments.
fn find_name_token(text: &str, name: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find(name) {
        let at = from + pos;
        from = at + name.len();
        let line_start = text[..at].rfind('\n').map(|n| n + 1).unwrap_or(0);
        if text[line_start..at].contains('#') {
            continue;
        }
        let before_ok = at == 0 || !is_ident_byte(bytes[at - 1]);
        let after_ok = from >= bytes.len() || !is_ident_byte(bytes[from]);
        if before_ok && after_ok {
            return Some(at);
        }
    }
    None
}

/// Rename or drop one imported name on an import line. The rest of the
/// line, parentheses, continuations and comments included, is untouched;
/// a line without the name comes back unchanged.
pub(crate) fn replace_import_name(line: &str, old: &str, new: Option<&str>) -> String {
    let Some((head, tail)) = line.split_once("import ") else {
        return line.to_owned();
    };
    let base = head.len() + "import ".len();
    let Some(at) = find_name_token(tail, old).map(|p| base + p) else {
        return line.to_owned();
    };
    if let Some(n) = new {
        return format!("{}{}{}", &line[..at], n, &line[at + old.len()..]);
    }

    // Drop the name and one adjacent comma, the following one preferred.
    let bytes = line.as_bytes();
    let mut end = at + old.len();
    while end < line.len() && bytes[end] == b' ' {
        end += 1;
    }
    if end < line.len() && bytes[end] == b',' {
        end += 1;
        while end < line.len() && bytes[end] == b' ' {
            end += 1;
        }
        return format!("{}{}", &line[..at], &line[end..]);
    }
    let mut start = at;
    while start > base && bytes[start - 1] == b' ' {
        start -= 1;
    }
    if start > base && bytes[start - 1] == b',' {
        start -= 1;
    }
    format!("{}{}", &line[..start], &line[at + old.len()..])
}

/// Column-aligned 80-character wrap: names move into parentheses and
/// continuation lines start at the opening parenthesis column.
pub(crate) fn reindent_import_line(line: &str, indent_unit: char) -> String {
    if line.len() < 81 {
        return format!("{line}\n");
    }
    let Some((begin, end)) = line.split_once("import ") else {
        return format!("{line}\n");
    };
    let mut text = format!("{begin}import (");
    let indent = if indent_unit == ' ' {
        " ".repeat(text.len() - 1)
    } else {
        indent_unit.to_string().repeat((text.len() - 1) / 4)
    };
    let mut wrapped = String::new();
    for cl in end.trim_start().split(',') {
        let cl = format!("{},", cl.trim_end());
        if text.len() + cl.len() < 81 {
            text.push_str(&cl);
        } else {
            text.push('\n');
            wrapped.push_str(&text);
            text = format!("{indent}{cl}");
        }
    }
    text.pop();
    wrapped.push_str(&text);
    wrapped.push(')');
    wrapped.push('\n');
    wrapped
}

/// Rewrite a `from PyQt4 import QtCore, QtGui, ...` module list against the
/// recorded usage. `None` means every module vanished and the line goes.
fn refactor_modules_import(line: &str, state: &mut MigrationState) -> Option<String> {
    let (head, tail) = line.split_once("import ")?;
    let chain = format!("{}import ", head.replace("PyQt4", "PyQt5"));
    let mut modules: Vec<String> = import_elements(tail);

    let remove = |modules: &mut Vec<String>, name: &str| {
        modules.retain(|m| m != name);
    };
    let add = |modules: &mut Vec<String>, name: &str| {
        if !modules.iter().any(|m| m == name) {
            modules.push(name.to_owned());
        }
    };

    if !state.usage.qt_gui {
        remove(&mut modules, "QtGui");
    }
    if state.usage.qt_core {
        add(&mut modules, "QtCore");
    }
    if state.usage.qt_widgets {
        add(&mut modules, "QtWidgets");
        state.has_widgets_import = true;
    }
    if !state.usage.qt_webkit {
        remove(&mut modules, "QtWebKit");
    }
    if state.usage.qt_webkit_widgets {
        add(&mut modules, "QtWebKitWidgets");
    }
    if state.usage.qt_multimedia {
        add(&mut modules, "QtMultimedia");
    }
    if state.usage.qt_print_support {
        add(&mut modules, "QtPrintSupport");
    }

    if modules.is_empty() {
        return None;
    }
    modules.sort();
    modules.dedup();
    Some(format!("{chain}{}", modules.join(", ")))
}

/// Buckets an umbrella-import's names classify into, in emission order.
#[derive(Default)]
struct SortedClasses {
    core: Vec<String>,
    gui: Vec<String>,
    widgets: Vec<String>,
    printer: Vec<String>,
    media: Vec<String>,
    opengl: Vec<String>,
    comments: Vec<String>,
}

fn sort_umbrella_classes(tail: &str, split_opengl: bool) -> SortedClasses {
    let t = tables();
    let mut sorted = SortedClasses::default();
    for cls in import_elements(tail) {
        if cls.starts_with('#') {
            sorted.comments.push(cls);
        } else if t.belongs_to("QtCore", &cls) {
            sorted.core.push(cls);
        } else if t.belongs_to("QtWidgets", &cls) {
            sorted.widgets.push(cls);
        } else if t.belongs_to("QtMultimedia", &cls) {
            sorted.media.push(cls);
        } else if t.belongs_to("QtPrintSupport", &cls) {
            sorted.printer.push(cls);
        } else if split_opengl && t.belongs_to("QtOpenGL", &cls) {
            sorted.opengl.push(cls);
        } else {
            let cls = t.renamed(&cls).map(str::to_owned).unwrap_or(cls);
            sorted.gui.push(cls);
        }
    }
    sorted
}

/// WebKit names split two ways: widgets go to QtWebKitWidgets, the rest
/// stay in QtWebKit.
fn sort_webkit_classes(tail: &str) -> (Vec<String>, Vec<String>) {
    let t = tables();
    let mut old = Vec::new();
    let mut widgets = Vec::new();
    for cls in import_elements(tail) {
        if t.belongs_to("QtWebKitWidgets", &cls) {
            widgets.push(cls);
        } else {
            old.push(cls);
        }
    }
    (old, widgets)
}

/// A deferred `QStandardPaths` need (recorded by the QDesktopServices
/// rewrite) attaches to whichever Qt import block comes first.
fn emit_qstandardpaths(
    out: &mut DocBuilder,
    line: &LogicalLine,
    state: &mut MigrationState,
    prefix: &str,
) {
    if state.usage.qstandard_paths {
        out.emit(
            line,
            format!(
                "{}.QtCore import QStandardPaths\n",
                prefix.replace("PyQt4", "PyQt5")
            ),
        );
        state.usage.qstandard_paths = false;
    }
}

/// The import rewrite pass.
pub fn rewrite_imports(doc: &mut SourceDocument, state: &mut MigrationState) {
    let unit = state.indent_unit;
    doc.rebuild(|line, out| {
        if !line.is_code() {
            out.keep(line);
            return;
        }

        let mut text = line.text.clone();
        let is_import = {
            let ls = text.trim_start();
            ls.starts_with("import ") || ls.starts_with("from ")
        };
        if is_import {
            text = format!("{}\n", text.trim_end());
            text = if state.added_pyqt_signal {
                replace_import_name(&text, "SIGNAL", Some("pyqtSignal"))
            } else {
                replace_import_name(&text, "SIGNAL", None)
            };
            text = replace_import_name(&text, "SLOT", None);
            text = replace_import_name(&text, "QStringList", None);
            text = replace_import_name(&text, "QString", None);
            let rest = text.trim_end();
            if rest == "import"
                || rest.ends_with(" import")
                || rest.ends_with(" import ()")
            {
                return;
            }
        }

        let ls = text.trim_start().to_owned();
        let head = |marker: &str| -> String {
            text.split_once(marker)
                .map(|(h, _)| h.to_owned())
                .unwrap_or_default()
        };
        if ls.starts_with("from PyQt4.QtCore ") && state.usage.qstandard_paths {
            out.replace(
                line,
                format!("{}, QStandardPaths\n", text.replace("PyQt4", "PyQt5").trim_end()),
            );
            state.usage.qstandard_paths = false;
        } else if ls.starts_with("from PyQt4.QtCore ") && text.contains("QChar") {
            let names: Vec<String> = text
                .split_once(" import ")
                .map(|(_, tail)| import_elements(tail))
                .unwrap_or_default()
                .into_iter()
                .filter(|n| n != "QChar")
                .collect();
            if !names.is_empty() {
                out.emit(
                    line,
                    format!("from PyQt5.QtCore import {}\n", names.join(", ")),
                );
            }
        } else if ls.starts_with("from PyQt4 import ") {
            if let Some(rebuilt) = refactor_modules_import(&text, state) {
                out.emit(line, reindent_import_line(&rebuilt, unit));
                emit_qstandardpaths(out, line, state, &head(" import "));
            }
        } else if ls.starts_with("from PyQt4.Qt import ") {
            let tail = text.split_once("import ").map(|(_, t)| t).unwrap_or("");
            let sorted = sort_umbrella_classes(tail, true);
            let buckets = [
                (&sorted.core, "QtCore"),
                (&sorted.gui, "QtGui"),
                (&sorted.widgets, "QtWidgets"),
                (&sorted.printer, "QtPrintSupport"),
                (&sorted.media, "QtMultimedia"),
                (&sorted.opengl, "QtOpenGL"),
            ];
            for (bucket, module) in buckets {
                if bucket.is_empty() {
                    continue;
                }
                let chain = format!(
                    "{}from PyQt5.{module} import {}",
                    line.indent(),
                    bucket.join(", ")
                );
                out.emit(line, reindent_import_line(&chain, unit));
                if module == "QtWidgets" {
                    state.has_widgets_import = true;
                }
            }
            if !sorted.comments.is_empty() {
                out.emit(line, format!("{}\n", sorted.comments.join("\n")));
            }
            emit_qstandardpaths(out, line, state, &head(".Qt"));
        } else if ls.starts_with("from PyQt4.QtGui ") {
            let tail = text.split_once("import ").map(|(_, t)| t).unwrap_or("");
            let sorted = sort_umbrella_classes(tail, false);
            let buckets = [
                (&sorted.core, "QtCore"),
                (&sorted.gui, "QtGui"),
                (&sorted.widgets, "QtWidgets"),
                (&sorted.printer, "QtPrintSupport"),
                (&sorted.media, "QtMultimedia"),
            ];
            for (bucket, module) in buckets {
                if bucket.is_empty() {
                    continue;
                }
                let chain = format!(
                    "{}from PyQt5.{module} import {}",
                    line.indent(),
                    bucket.join(", ")
                );
                out.emit(line, reindent_import_line(&chain, unit));
                if module == "QtWidgets" {
                    state.has_widgets_import = true;
                }
            }
            if !sorted.comments.is_empty() {
                out.emit(line, format!("{}\n", sorted.comments.join("\n")));
            }
            emit_qstandardpaths(out, line, state, &head(".QtGui"));
        } else if ls.starts_with("from PyQt4.QtWebKit ") {
            let tail = text.split_once("import ").map(|(_, t)| t).unwrap_or("");
            let (old, widgets) = sort_webkit_classes(tail);
            if !old.is_empty() {
                let chain = format!(
                    "{}from PyQt5.QtWebKit import {}",
                    line.indent(),
                    old.join(", ")
                );
                out.emit(line, reindent_import_line(&chain, unit));
            }
            if !widgets.is_empty() {
                let chain = format!(
                    "{}from PyQt5.QtWebKitWidgets import {}",
                    line.indent(),
                    widgets.join(", ")
                );
                out.emit(line, reindent_import_line(&chain, unit));
            }
        } else {
            out.replace(line, text.replace("PyQt4", "PyQt5"));
        }
    });
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

    fn state() -> MigrationState {
        MigrationState::new(' ')
    }

    #[test]
    fn qtgui_import_splits_by_destination() {
        let mut d = doc("from PyQt4.QtGui import QDialog, QPainter, QSortFilterProxyModel\n");
        let mut st = state();
        rewrite_imports(&mut d, &mut st);
        assert_eq!(
            d.text(),
            "from PyQt5.QtCore import QSortFilterProxyModel\n\
             from PyQt5.QtGui import QPainter\n\
             from PyQt5.QtWidgets import QDialog\n"
        );
        assert!(st.has_widgets_import);
    }

    #[test]
    fn parenthesized_import_is_flattened_and_split() {
        let mut d = doc("from PyQt4.QtGui import (QDialog,\n                         QPainter)\n");
        let mut st = state();
        rewrite_imports(&mut d, &mut st);
        assert_eq!(
            d.text(),
            "from PyQt5.QtGui import QPainter\nfrom PyQt5.QtWidgets import QDialog\n"
        );
    }

    #[test]
    fn signal_import_dropped_or_renamed() {
        let mut d = doc("from PyQt4.QtCore import SIGNAL, QTimer\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "from PyQt5.QtCore import QTimer\n");

        let mut d = doc("from PyQt4.QtCore import SIGNAL, QTimer\n");
        let mut st = state();
        st.added_pyqt_signal = true;
        rewrite_imports(&mut d, &mut st);
        assert_eq!(d.text(), "from PyQt5.QtCore import pyqtSignal, QTimer\n");
    }

    #[test]
    fn emptied_import_line_is_removed() {
        let mut d = doc("from PyQt4.QtCore import SIGNAL, SLOT\nx = 1\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "x = 1\n");
    }

    #[test]
    fn module_list_import_follows_recorded_usage() {
        let mut d = doc("from PyQt4 import QtCore, QtGui\n");
        let mut st = state();
        st.usage.qt_gui = true;
        st.usage.qt_widgets = true;
        rewrite_imports(&mut d, &mut st);
        assert_eq!(d.text(), "from PyQt5 import QtCore, QtGui, QtWidgets\n");
    }

    #[test]
    fn unused_qtgui_module_is_dropped() {
        let mut d = doc("from PyQt4 import QtCore, QtGui\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "from PyQt5 import QtCore\n");
    }

    #[test]
    fn fully_dropped_module_import_vanishes() {
        let mut d = doc("from PyQt4 import QtGui\nx = 1\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "x = 1\n");
    }

    #[test]
    fn webkit_import_splits() {
        let mut d = doc("from PyQt4.QtWebKit import QWebView, QWebSettings\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "from PyQt5.QtWebKit import QWebSettings\nfrom PyQt5.QtWebKitWidgets import QWebView\n"
        );
    }

    #[test]
    fn qchar_is_dropped_from_qtcore_import() {
        let mut d = doc("from PyQt4.QtCore import QChar, QTimer\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "from PyQt5.QtCore import QTimer\n");
    }

    #[test]
    fn pending_qstandardpaths_rides_a_qtcore_import() {
        let mut d = doc("from PyQt4.QtCore import QTimer\n");
        let mut st = state();
        st.usage.qstandard_paths = true;
        rewrite_imports(&mut d, &mut st);
        assert_eq!(
            d.text(),
            "from PyQt5.QtCore import QTimer, QStandardPaths\n"
        );
        assert!(!st.usage.qstandard_paths);
    }

    #[test]
    fn long_import_wraps_at_paren_column() {
        let wrapped = reindent_import_line(
            "from PyQt5.QtWidgets import QDialog, QWidget, QPushButton, QVBoxLayout, QHBoxLayout, QLabel",
            ' ',
        );
        for physical in wrapped.lines() {
            assert!(physical.len() <= 80, "line too long: {physical}");
        }
        assert!(wrapped.starts_with("from PyQt5.QtWidgets import (QDialog,"));
        assert!(wrapped.ends_with("QLabel)\n"));
        let continuation = wrapped.lines().nth(1).unwrap();
        let column = "from PyQt5.QtWidgets import ".len();
        assert!(continuation.starts_with(&" ".repeat(column)));
    }

    #[test]
    fn absent_name_leaves_the_line_byte_identical() {
        let src = "from os.path import (join,  # helper\n                     split)\n";
        assert_eq!(replace_import_name(src, "SIGNAL", None), src);
        assert_eq!(
            replace_import_name(src, "SIGNAL", Some("pyqtSignal")),
            src
        );
    }

    #[test]
    fn parenthesized_comment_import_survives_the_pass() {
        let src = "from os.path import (join,  # helper\n                     split)\nx = 1\n";
        let mut d = doc(src);
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), src);
    }

    #[test]
    fn multi_line_import_keeps_its_shape() {
        let src = "from collections import (OrderedDict,\n                         defaultdict)\n";
        let mut d = doc(src);
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), src);
    }

    #[test]
    fn rename_inside_parentheses_preserves_layout() {
        let src = "from PyQt4.QtCore import (SIGNAL,\n                          QTimer)\n";
        assert_eq!(
            replace_import_name(src, "SIGNAL", Some("pyqtSignal")),
            "from PyQt4.QtCore import (pyqtSignal,\n                          QTimer)\n"
        );
    }

    #[test]
    fn dropped_name_takes_one_comma_with_it() {
        assert_eq!(
            replace_import_name("from m import SIGNAL, QTimer\n", "SIGNAL", None),
            "from m import QTimer\n"
        );
        assert_eq!(
            replace_import_name("from m import QTimer, SIGNAL\n", "SIGNAL", None),
            "from m import QTimer\n"
        );
        assert_eq!(
            replace_import_name("from m import (QTimer, SIGNAL)\n", "SIGNAL", None),
            "from m import (QTimer)\n"
        );
    }

    #[test]
    fn name_in_trailing_comment_is_not_a_match() {
        let src = "from m import QTimer  # SIGNAL legacy\n";
        assert_eq!(replace_import_name(src, "SIGNAL", None), src);
    }

    #[test]
    fn plain_code_line_gets_package_rename() {
        let mut d = doc("w = PyQt4.QtCore.QTimer()\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "w = PyQt5.QtCore.QTimer()\n");
    }

    #[test]
    fn non_qt_imports_survive() {
        let mut d = doc("import os\nfrom collections import OrderedDict\n");
        rewrite_imports(&mut d, &mut state());
        assert_eq!(d.text(), "import os\nfrom collections import OrderedDict\n");
    }
}
