//! Python-level compatibility rewrites.
//!
//! The old API leaned on `QString`, `QStringList`, `QChar` and the
//! `_fromUtf8` idiom; Qt5 builds on native Python strings. These passes
//! strip the wrappers and, where the names survive as plain identifiers,
//! inject small shims near the top of the module so the file keeps running
//! under both Python 2 and 3.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::tables;
use crate::core::SourceDocument;
use crate::parse::find_call_parens;
use crate::state::MigrationState;

/// Unwrap every `_fromUtf8(X)` call to `X` and remove the usual try/except
/// definition shim.
pub fn strip_from_utf8(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            idx += 1;
            continue;
        }

        if line.text.trim() == "_fromUtf8 = QtCore.QString.fromUtf8" {
            if let Some(end) = shim_extent(doc, idx) {
                let start = idx - 1;
                doc.remove_range(start..end);
                idx = start;
                continue;
            }
            let indent = line.indent().to_owned();
            doc.set_text(idx, format!("{indent}_fromUtf8 = lambda s: s\n"));
            continue;
        }

        let mut text = line
            .text
            .replace("PyQt4.QtCore.QString.fromUtf8(", "_fromUtf8(")
            .replace("PyQt4.Qt.QString.fromUtf8(", "_fromUtf8(")
            .replace("QtCore.QString.fromUtf8(", "_fromUtf8(")
            .replace("Qt.QString.fromUtf8(", "_fromUtf8(")
            .replace("QString.fromUtf8(", "_fromUtf8(");
        while let Some((start, open, close)) = find_call_parens(&text, "_fromUtf8") {
            text = format!(
                "{}{}{}",
                &text[..start],
                &text[open + 1..close],
                &text[close + 1..]
            );
        }
        doc.set_text(idx, text);
        idx += 1;
    }
}

/// When `idx` holds the `_fromUtf8 = ...` assignment of the classic
/// try/except shim, return the exclusive end index of the shim block
/// (including one trailing blank line).
fn shim_extent(doc: &SourceDocument, idx: usize) -> Option<usize> {
    if idx == 0 || doc.line(idx - 1).text.trim() != "try:" {
        return None;
    }
    if doc.get(idx + 1)?.text.trim() != "except AttributeError:" {
        return None;
    }
    let mut end = if doc.get(idx + 2)?.text.trim() == "_fromUtf8 = lambda s: s" {
        idx + 3
    } else if doc.get(idx + 2)?.text.trim() == "def _fromUtf8(s):"
        && doc.get(idx + 3)?.text.trim() == "return s"
    {
        idx + 4
    } else {
        return None;
    };
    if doc.get(end).is_some_and(|l| l.text.trim().is_empty()) {
        end += 1;
    }
    Some(end)
}

/// Where the QChar/QString shims go: before the first statement that is
/// neither an import nor a dunder assignment.
fn shim_insertion_point(doc: &SourceDocument) -> Option<usize> {
    (0..doc.len()).find(|&idx| {
        let line = doc.line(idx);
        let stripped = line.text.trim_start();
        line.is_code()
            && !stripped.starts_with("import ")
            && !stripped.starts_with("from ")
            && !stripped.starts_with("__")
    })
}

fn shim_indent(doc: &SourceDocument, from: usize) -> String {
    doc.next_indent(from)
        .map(str::to_owned)
        .unwrap_or_else(|| "    ".to_owned())
}

/// `QChar` has no Qt5 counterpart: usage keeps working through a `chr`
/// alias, except in signal signatures where it stays a quoted overload
/// marker.
pub fn fix_qchar(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut is_qchar = false;
    for idx in 0..doc.len() {
        if !doc.line(idx).is_code() {
            continue;
        }
        let mut text = doc
            .line(idx)
            .text
            .replace("PyQt5.QtCore.QChar", "QChar")
            .replace("PyQt5.Qt.QChar", "QChar")
            .replace("QtCore.QChar", "QChar")
            .replace("Qt.QChar", "QChar");
        if text.contains("].connect(") || text.contains("pyqtSignal(") {
            text = text
                .replace("'QChar'", "QChar")
                .replace("\"QChar\"", "QChar")
                .replace("QChar", "'QChar'");
        }
        if text
            .replace("'QChar'", "")
            .replace("\"QChar\"", "")
            .contains("QChar")
        {
            is_qchar = true;
        }
        doc.set_text(idx, text);
    }

    if !is_qchar {
        return;
    }
    if let Some(idx) = shim_insertion_point(doc) {
        let ind = shim_indent(doc, idx);
        doc.insert(idx, "\n".to_owned());
        doc.insert(
            idx,
            format!(
                "try:\n{ind}QChar = unichr\nexcept NameError:\n{ind}# Python 3\n{ind}QChar = chr\n"
            ),
        );
    }
}

/// Same treatment for `QString` and `QStringList`: wrappers dropped from
/// code, shims injected when the bare names remain in use.
pub fn fix_qstring(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut is_qstring = false;
    let mut is_qstring_list = false;
    for idx in 0..doc.len() {
        if !doc.line(idx).is_code() {
            continue;
        }
        let mut text = doc
            .line(idx)
            .text
            .replace("PyQt5.QtCore.QString", "QString")
            .replace("PyQt5.Qt.QString", "QString")
            .replace("QtCore.QString", "QString")
            .replace("Qt.QString", "QString");
        if text.contains("].connect(") || text.contains("pyqtSignal(") {
            text = text
                .replace("'QString'", "QString")
                .replace("\"QString\"", "QString")
                .replace("'QStringList'", "QStringList")
                .replace("\"QStringList\"", "QStringList")
                .replace("QString", "'QString'")
                .replace("'QString'List", "'QStringList'")
                .replace("'QStringList'Model", "QStringListModel");
        }
        if text
            .replace("QStringListModel", "")
            .replace("QStringList", "")
            .replace("'QString'", "")
            .replace("\"QString\"", "")
            .contains("QString")
        {
            is_qstring = true;
        }
        if text
            .replace("QStringListModel", "")
            .replace("'QStringList'", "")
            .replace("\"QStringList\"", "")
            .contains("QStringList")
        {
            is_qstring_list = true;
        }
        doc.set_text(idx, text);
    }

    if !is_qstring && !is_qstring_list {
        return;
    }
    if let Some(idx) = shim_insertion_point(doc) {
        let ind = shim_indent(doc, idx);
        doc.insert(idx, "\n".to_owned());
        if is_qstring_list {
            doc.insert(idx, "QStringList = list\n".to_owned());
        }
        if is_qstring {
            doc.insert(
                idx,
                format!(
                    "try:\n{ind}QString = unicode\nexcept NameError:\n{ind}# Python 3\n{ind}QString = str\n"
                ),
            );
        }
    }
}

static QAPP_BARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\A|[^a-zA-Z0-9_.'"]|Qt\.|QtWidgets\.)qApp($|[^a-zA-Z0-9_])"#).unwrap()
});

/// `qApp` is gone: static methods move to `QApplication`, everything else
/// goes through `QApplication.instance()`.
pub fn replace_qapp(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let statics: Vec<String> = tables()
        .qapp_static_methods
        .iter()
        .map(|m| regex::escape(m))
        .collect();
    let static_re = Lazy::new(|| {
        Regex::new(&format!(
            r#"(\A|[^a-zA-Z0-9_.'"]|Qt\.|QtWidgets\.)qApp\.({})($|[^a-zA-Z0-9_])"#,
            statics.join("|")
        ))
        .unwrap()
    });

    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() || !line.text.contains("qApp") {
            continue;
        }
        let stripped = line.text.trim_start();
        if stripped.starts_with("import ") || stripped.starts_with("from ") {
            let text =
                crate::passes::imports::replace_import_name(&line.text, "qApp", Some("QApplication"));
            doc.set_text(idx, text);
        } else {
            let text = static_re
                .replace_all(&line.text, "${1}QApplication.${2}${3}")
                .into_owned();
            let text = QAPP_BARE_RE
                .replace_all(&text, "${1}QApplication.instance()${2}")
                .into_owned();
            doc.set_text(idx, text);
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

    fn state() -> MigrationState {
        MigrationState::new(' ')
    }

    #[test]
    fn from_utf8_shim_block_removed() {
        let mut d = doc("\
try:
    _fromUtf8 = QtCore.QString.fromUtf8
except AttributeError:
    _fromUtf8 = lambda s: s

x = _fromUtf8('text')
");
        strip_from_utf8(&mut d, &mut state());
        assert_eq!(d.text(), "x = 'text'\n");
    }

    #[test]
    fn nested_from_utf8_calls_unwrap() {
        let mut d = doc("w.setText(QtCore.QString.fromUtf8(name))\n");
        strip_from_utf8(&mut d, &mut state());
        assert_eq!(d.text(), "w.setText(name)\n");
    }

    #[test]
    fn lone_from_utf8_assignment_becomes_identity() {
        let mut d = doc("_fromUtf8 = QtCore.QString.fromUtf8\n");
        strip_from_utf8(&mut d, &mut state());
        assert_eq!(d.text(), "_fromUtf8 = lambda s: s\n");
    }

    #[test]
    fn qstring_constructor_gets_shim() {
        let mut d = doc("import sys\n\ns = QtCore.QString('abc')\n");
        fix_qstring(&mut d, &mut state());
        let text = d.text();
        assert!(text.contains("QString = unicode"));
        assert!(text.contains("QString = str"));
        assert!(text.contains("s = QString('abc')\n"));
        let shim_pos = text.find("try:").unwrap();
        let use_pos = text.find("s = QString").unwrap();
        assert!(shim_pos < use_pos);
    }

    #[test]
    fn quoted_qstring_overload_needs_no_shim() {
        let mut d = doc("sig.valueChanged['QString'].connect(self.on_change)\n");
        fix_qstring(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "sig.valueChanged['QString'].connect(self.on_change)\n"
        );
    }

    #[test]
    fn qchar_shim_injected() {
        let mut d = doc("import sys\n\nc = QtCore.QChar(0x41)\n");
        fix_qchar(&mut d, &mut state());
        let text = d.text();
        assert!(text.contains("QChar = unichr"));
        assert!(text.contains("QChar = chr"));
        assert!(text.contains("c = QChar(0x41)\n"));
    }

    #[test]
    fn qapp_static_method_goes_to_qapplication() {
        let mut d = doc("qApp.aboutQt()\n");
        replace_qapp(&mut d, &mut state());
        assert_eq!(d.text(), "QApplication.aboutQt()\n");
    }

    #[test]
    fn qapp_instance_method_goes_through_instance() {
        let mut d = doc("qApp.installTranslator(tr)\n");
        replace_qapp(&mut d, &mut state());
        assert_eq!(d.text(), "QApplication.instance().installTranslator(tr)\n");
    }

    #[test]
    fn qualified_qapp_keeps_prefix() {
        let mut d = doc("QtWidgets.qApp.beep()\n");
        replace_qapp(&mut d, &mut state());
        assert_eq!(d.text(), "QtWidgets.QApplication.beep()\n");
    }

    #[test]
    fn qapp_import_renamed() {
        let mut d = doc("from PyQt5.QtWidgets import qApp, QWidget\n");
        replace_qapp(&mut d, &mut state());
        assert_eq!(d.text(), "from PyQt5.QtWidgets import QApplication, QWidget\n");
    }

    #[test]
    fn attribute_qapp_untouched() {
        let mut d = doc("self.qApp.quit()\n");
        replace_qapp(&mut d, &mut state());
        assert_eq!(d.text(), "self.qApp.quit()\n");
    }
}
