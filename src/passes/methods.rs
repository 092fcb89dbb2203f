//! Per-class method rewrites.
//!
//! Each pass handles one API change: renamed methods, reshaped return
//! values, dropped conveniences. Most are receiver-tracked: the pass first
//! collects which local names were bound to the relevant class, then only
//! rewrites calls through those names.

use crate::core::SourceDocument;
use crate::parse::find_call_parens;
use crate::passes::sentinel_line;
use crate::state::MigrationState;

/// Left-hand side of the first `=` before `marker` on a trimmed line.
/// Mirrors the assignment-capture used for layouts, QDesktopServices and
/// QDate receiver tracking.
fn assignment_lhs<'a>(line: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let trimmed = line.trim_start();
    let pos = trimmed.find(marker)?;
    let eq = trimmed[..pos].find('=')?;
    Some((&trimmed[..eq], &trimmed[eq + 1..pos]))
}

/// The static QFileDialog getters: the `AndFilter` variants folded into the
/// plain names, and the plain names now return a tuple, so non-unpacking
/// call sites get a `[0]` subscript.
pub fn fix_qfiledialog(doc: &mut SourceDocument, _state: &mut MigrationState) {
    const WITH_FILTER: [&str; 3] = [
        ".getOpenFileNamesAndFilter",
        ".getOpenFileNameAndFilter",
        ".getSaveFileNameAndFilter",
    ];
    const PLAIN: [&str; 3] = [
        ".getOpenFileNames",
        ".getOpenFileName",
        ".getSaveFileName",
    ];
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            continue;
        }
        let text = line.text.clone();
        if text.contains("AndFilter") {
            if WITH_FILTER.iter().any(|old| text.contains(old)) {
                doc.set_text(idx, text.replace("AndFilter", ""));
            }
        } else if text.contains("FileName") {
            for method in PLAIN {
                if !text.contains(method) {
                    continue;
                }
                let trimmed = text.trim_end();
                // Tuple unpacking already consumes both return values.
                let lhs = trimmed.split('=').next().unwrap_or("");
                if lhs.split(',').count() == 2 {
                    break;
                }
                if let Some((_, _, close)) = find_call_parens(trimmed, method) {
                    let patched =
                        format!("{}[0]{}\n", &trimmed[..=close], &trimmed[close + 1..]);
                    doc.set_text(idx, patched);
                }
                break;
            }
        }
    }
}

/// `QDir.NoDotAndDotDot` split into two filters, and `convertSeparators`
/// was renamed.
pub fn fix_qdir(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            continue;
        }
        let mut text = line.text.clone();
        let mut changed = false;
        if text.contains(".NoDotAndDotDot") {
            let trimmed = text.trim_start();
            if let Some(open) = trimmed.find('(') {
                if let Some(end) = trimmed[open..].find(".NoDotAndDotDot") {
                    let inner = &trimmed[open + 1..open + end];
                    let name = inner.rsplit('|').next().unwrap_or(inner).trim_start();
                    let rep = format!(".NoDot | {name}.NoDotDot");
                    text = text.replace(".NoDotAndDotDot", &rep);
                    changed = true;
                }
            }
        }
        if text.contains(".convertSeparators(") {
            text = text.replace("convertSeparators", "toNativeSeparators");
            changed = true;
        }
        if changed {
            doc.set_text(idx, text);
        }
    }
}

/// `QApplication.translate` moved to `QCoreApplication` and lost its
/// encoding argument; `trUtf8` folded into `tr`.
pub fn fix_translations(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            continue;
        }
        let text = line.text.clone();
        if text.contains(".translate") {
            let mut ln = String::new();
            for part in text.split(".translate") {
                if let Some(head) = part.strip_suffix("QtWidgets.QApplication") {
                    ln.push_str(head);
                    ln.push_str("QtCore.QCoreApplication");
                } else if let Some(head) = part.strip_suffix("QApplication") {
                    ln.push_str(head);
                    ln.push_str("QCoreApplication");
                } else {
                    ln.push_str(part);
                }
                ln.push_str(".translate");
            }
            ln.truncate(ln.len() - ".translate".len());
            if ln.contains(".UnicodeUTF8") {
                let parts: Vec<String> =
                    ln.split(".UnicodeUTF8").map(str::to_owned).collect();
                ln = String::new();
                for part in parts {
                    let part = if let Some(head) = part.strip_suffix("QtWidgets.QApplication")
                    {
                        head.to_owned()
                    } else if let Some(head) = part.strip_suffix("QApplication") {
                        head.to_owned()
                    } else {
                        part
                    };
                    // Keep multi-line call syntax intact.
                    let part = part
                        .trim_end_matches(',')
                        .trim_end()
                        .trim_end_matches(',');
                    ln.push_str(part);
                }
            }
            let ln = format!("{}\n", ln.trim_end_matches('\n'));
            doc.set_text(idx, ln);
        } else if text.contains(".trUtf8(") {
            doc.set_text(idx, text.replace("trUtf8(", "tr("));
        }
    }
}

/// Inside a `wheelEvent` handler the event's `delta()` became
/// `angleDelta().y()`.
pub fn fix_wheelevent(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx);
        if line.is_code() && line.text.contains("wheelEvent(") {
            let param = line
                .text
                .split_once("def wheelEvent(self,")
                .and_then(|(_, rest)| rest.split_once("):"))
                .map(|(param, _)| param.trim().to_owned());
            if let Some(param) = param {
                let body_indent = doc.line(idx).indent().len();
                let target = format!("{param}.delta()");
                idx += 1;
                while idx < doc.len() {
                    let inner = doc.line(idx);
                    if inner.is_code() {
                        if inner.indent().len() <= body_indent {
                            idx -= 1;
                            break;
                        }
                        if inner.text.contains(&target) {
                            let patched =
                                inner.text.replace(".delta()", ".angleDelta().y()");
                            doc.set_text(idx, patched);
                        }
                    }
                    idx += 1;
                }
            }
        }
        idx += 1;
    }
}

/// `QLayout.setMargin(n)` became `setContentsMargins(n, n, n, n)` and
/// `margin()` reads back the first contents margin. Only calls through
/// names bound to a box or grid layout are rewritten.
pub fn fix_layout_margin(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut layouts: Vec<String> = Vec::new();
    for line in doc.iter() {
        if !line.text.contains("Layout(") {
            continue;
        }
        if let Some((lhs, ctor)) = assignment_lhs(&line.text, "Layout(") {
            if ctor.ends_with("QGrid") || ctor.ends_with("QVBox") || ctor.ends_with("QHBox") {
                layouts.push(lhs.trim().to_owned());
            }
        }
    }
    if layouts.is_empty() {
        return;
    }

    let is_ref_char = |c: char| matches!(c, ',' | ' ' | '=' | '(' | '-' | '+');
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            continue;
        }
        let text = line.text.clone();
        if text.contains(".setMargin(") {
            let Some((before, after)) = text.split_once(".setMargin(") else {
                continue;
            };
            if layouts.iter().any(|l| l == before.trim_start()) {
                let val = after.trim().trim_end_matches(')').trim();
                let vals = vec![val; 4].join(", ");
                doc.set_text(idx, format!("{before}.setContentsMargins({vals})\n"));
            }
        } else if text.contains(".margin(") {
            let before = text.split(".margin").next().unwrap_or("");
            let reference = before.rsplit(is_ref_char).next().unwrap_or("");
            if layouts.iter().any(|l| l == reference) {
                doc.set_text(idx, text.replace(".margin()", ".getContentsMargins()[0]"));
            }
        }
    }
}

/// `QDesktopServices.storageLocation`/`displayName` moved to
/// `QStandardPaths`. A location argument that is not a dotted constant is
/// ambiguous and gets annotated instead.
pub fn fix_qdesktopservices(doc: &mut SourceDocument, state: &mut MigrationState) {
    let mut services: Vec<String> = vec![
        "QDesktopServices()".to_owned(),
        "QtGui.QDesktopServices()".to_owned(),
        "QDesktopServices".to_owned(),
        "QtGui.QDesktopServices".to_owned(),
    ];
    for line in doc.iter() {
        if line.text.contains("QDesktopServices") {
            if let Some((lhs, _)) = assignment_lhs(&line.text, "QDesktopServices(") {
                services.push(lhs.trim().to_owned());
            }
        }
    }

    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            idx += 1;
            continue;
        }
        let text = line.text.clone();
        let method = if text.contains(".displayName(") {
            ".displayName("
        } else if text.contains(".storageLocation(") {
            ".storageLocation("
        } else {
            idx += 1;
            continue;
        };

        let Some((before, after)) = text.split_once(method) else {
            idx += 1;
            continue;
        };
        let mut assign = before.splitn(2, '=');
        let (lhs, receiver) = match (assign.next(), assign.next()) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                idx += 1;
                continue;
            }
        };
        if services.iter().any(|s| s == receiver.trim()) {
            let val = after.trim().trim_end_matches(')').trim();
            match val.split('.').nth(1) {
                None => {
                    let indent = doc.line(idx).indent().to_owned();
                    doc.insert(
                        idx,
                        sentinel_line(
                            &indent,
                            "Ambiguous syntax for QDesktopServices, can't refactor it.",
                        ),
                    );
                    idx += 1;
                }
                Some(location) => {
                    let method = method.replace("storage", "writable");
                    doc.set_text(
                        idx,
                        format!(
                            "{} = QStandardPaths{}QStandardPaths.{})\n",
                            lhs.trim_end(),
                            method,
                            location
                        ),
                    );
                    state.usage.qstandard_paths = true;
                }
            }
        }
        idx += 1;
    }
}

/// `QDate.setYMD` became `setDate`, both on tracked instances and inside
/// subclasses of QDate.
pub fn fix_qdate(doc: &mut SourceDocument, _state: &mut MigrationState) {
    // Subclasses first: any self.setYMD inside a class deriving QDate.
    let subclass_starts: Vec<usize> = doc
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            line.is_class()
                && line
                    .text
                    .split_once('(')
                    .is_some_and(|(_, bases)| bases.contains("QDate"))
        })
        .map(|(idx, _)| idx)
        .collect();
    for start in subclass_starts {
        for idx in start + 1..doc.len() {
            if doc.line(idx).is_class() {
                break;
            }
            let text = doc.line(idx).text.clone();
            if text.contains("self.setYMD(") {
                doc.set_text(idx, text.replace("setYMD", "setDate"));
            }
        }
    }

    let mut dates: Vec<String> = Vec::new();
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        if !line.is_code() {
            continue;
        }
        let text = line.text.clone();
        if text.contains("QDate(") {
            if let Some((lhs, _)) = assignment_lhs(&text, "QDate(") {
                dates.push(lhs.trim().to_owned());
            }
        }
        if text.contains(".setYMD(") {
            let instance = text.split(".setYMD").next().unwrap_or("").trim_start();
            if dates.iter().any(|d| d == instance) {
                doc.set_text(idx, text.replace("setYMD", "setDate"));
            }
        }
    }
}

/// QHeaderView renamed its section accessors; rewrites apply to calls on
/// `horizontalHeader()`/`verticalHeader()` results and names bound to them.
pub fn fix_qheader(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let mut headers: Vec<String> =
        vec!["horizontalHeader()".to_owned(), "verticalHeader()".to_owned()];
    for line in doc.iter() {
        if line.text.contains(".horizontalHeader()") || line.text.contains(".verticalHeader()")
        {
            let mut parts = line.text.split('=');
            if let (Some(lhs), Some(_), None) = (parts.next(), parts.next(), parts.next()) {
                headers.push(lhs.trim().to_owned());
            }
        }
    }

    const OLDS: [&str; 6] = [
        ".setMovable",
        ".isMovable",
        ".setClickable",
        ".isClickable",
        ".setResizeMode",
        ".resizeMode",
    ];
    const NEWS: [&str; 6] = [
        ".setSectionsMovable",
        ".sectionsMovable",
        ".setSectionsClickable",
        ".sectionsClickable",
        ".setSectionResizeMode",
        ".sectionResizeMode",
    ];
    for (old, new) in OLDS.iter().zip(NEWS.iter()) {
        for idx in 0..doc.len() {
            let text = doc.line(idx).text.clone();
            if let Some((begin, _)) = text.split_once(old) {
                if headers.iter().any(|h| begin.ends_with(h.as_str())) {
                    doc.set_text(idx, text.replace(old, new));
                }
            }
        }
    }
}

pub fn fix_qinputdialog(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        let text = doc.line(idx).text.clone();
        if text.contains("QInputDialog.getInteger(") {
            doc.set_text(idx, text.replace(".getInteger(", ".getInt("));
        }
    }
}

pub fn fix_qglobal(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        if !doc.line(idx).is_code() {
            continue;
        }
        let text = doc.line(idx).text.clone();
        if text.contains("qInstallMsgHandler(") {
            doc.set_text(
                idx,
                text.replace("qInstallMsgHandler(", "qInstallMessageHandler("),
            );
        }
    }
}

/// QVariant conversion getters became implicit; the calls simply disappear.
pub fn fix_qvariant(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let methods = &crate::config::tables().qvariant_obsolete_methods;
    for idx in 0..doc.len() {
        if !doc.line(idx).is_code() {
            continue;
        }
        let mut text = doc.line(idx).text.clone();
        let mut changed = false;
        for method in methods {
            let call = format!(".{method}()");
            if text.contains(&call) {
                text = text.replace(&call, "");
                changed = true;
            }
        }
        if changed {
            doc.set_text(idx, text);
        }
    }
}

/// Straight class renames from the membership tables.
pub fn rename_classes(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let renames = &crate::config::tables().renames;
    for idx in 0..doc.len() {
        if !doc.line(idx).is_code() {
            continue;
        }
        let mut text = doc.line(idx).text.clone();
        let mut changed = false;
        for (old, new) in renames {
            if text.contains(old.as_str()) {
                text = text.replace(old.as_str(), new.as_str());
                changed = true;
            }
        }
        if changed {
            doc.set_text(idx, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::segment;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> SourceDocument {
        let lines: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();
        segment(&lines).unwrap()
    }

    fn state() -> MigrationState {
        MigrationState::new(' ')
    }

    #[test]
    fn filedialog_tuple_subscript_inserted() {
        let mut d = doc("name = QFileDialog.getOpenFileName(self, 'Open', '.')\n");
        fix_qfiledialog(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "name = QFileDialog.getOpenFileName(self, 'Open', '.')[0]\n"
        );
    }

    #[test]
    fn filedialog_unpacking_left_alone() {
        let src = "name, filt = QFileDialog.getOpenFileName(self, 'Open', '.')\n";
        let mut d = doc(src);
        fix_qfiledialog(&mut d, &mut state());
        assert_eq!(d.text(), src);
    }

    #[test]
    fn filedialog_and_filter_variant_renamed() {
        let mut d =
            doc("name, filt = QFileDialog.getSaveFileNameAndFilter(self, 'Save')\n");
        fix_qfiledialog(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "name, filt = QFileDialog.getSaveFileName(self, 'Save')\n"
        );
    }

    #[test]
    fn qdir_filter_splits() {
        let mut d = doc("d.setFilter(QDir.NoDotAndDotDot | QDir.Files)\n");
        fix_qdir(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "d.setFilter(QDir.NoDot | QDir.NoDotDot | QDir.Files)\n"
        );
    }

    #[test]
    fn translate_loses_encoding_argument() {
        let mut d = doc(
            "t = QtWidgets.QApplication.translate('Ctx', 'text', None, QtWidgets.QApplication.UnicodeUTF8)\n",
        );
        fix_translations(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "t = QtCore.QCoreApplication.translate('Ctx', 'text', None)\n"
        );
    }

    #[test]
    fn trutf8_becomes_tr() {
        let mut d = doc("t = self.trUtf8('text')\n");
        fix_translations(&mut d, &mut state());
        assert_eq!(d.text(), "t = self.tr('text')\n");
    }

    #[test]
    fn wheelevent_delta_rewritten_inside_handler_only() {
        let mut d = doc(indoc! {"
            def wheelEvent(self, event):
                steps = event.delta() / 120
                self.scroll(steps)

            def other(self, event):
                x = event.delta()
        "});
        fix_wheelevent(&mut d, &mut state());
        let text = d.text();
        assert!(text.contains("steps = event.angleDelta().y() / 120"));
        assert!(text.contains("x = event.delta()"));
    }

    #[test]
    fn layout_margin_expansion() {
        let mut d = doc("\
lay = QtWidgets.QVBoxLayout()
lay.setMargin(4)
m = lay.margin()
");
        fix_layout_margin(&mut d, &mut state());
        assert_eq!(
            d.text(),
            "\
lay = QtWidgets.QVBoxLayout()
lay.setContentsMargins(4, 4, 4, 4)
m = lay.getContentsMargins()[0]
"
        );
    }

    #[test]
    fn desktop_services_to_standard_paths() {
        let mut d = doc("path = QDesktopServices().storageLocation(QDesktopServices.DocumentsLocation)\n");
        let mut st = state();
        fix_qdesktopservices(&mut d, &mut st);
        assert_eq!(
            d.text(),
            "path = QStandardPaths.writableLocation(QStandardPaths.DocumentsLocation)\n"
        );
        assert!(st.usage.qstandard_paths);
    }

    #[test]
    fn desktop_services_ambiguous_location_annotated() {
        let mut d = doc("path = QDesktopServices().storageLocation(loc)\n");
        fix_qdesktopservices(&mut d, &mut state());
        assert!(d
            .text()
            .starts_with("# FIXME$ Ambiguous syntax for QDesktopServices"));
    }

    #[test]
    fn qdate_setymd_on_tracked_instance() {
        let mut d = doc("d = QDate(2000, 1, 1)\nd.setYMD(2001, 2, 3)\nother.setYMD(1, 2, 3)\n");
        fix_qdate(&mut d, &mut state());
        let text = d.text();
        assert!(text.contains("d.setDate(2001, 2, 3)"));
        assert!(text.contains("other.setYMD(1, 2, 3)"));
    }

    #[test]
    fn qdate_subclass_self_calls() {
        let mut d = doc("\
class MyDate(QDate):
    def reset(self):
        self.setYMD(2000, 1, 1)
");
        fix_qdate(&mut d, &mut state());
        assert!(d.text().contains("self.setDate(2000, 1, 1)"));
    }

    #[test]
    fn header_methods_renamed_on_header_receivers() {
        let mut d = doc("\
hdr = table.horizontalHeader()
hdr.setMovable(True)
table.horizontalHeader().setResizeMode(QHeaderView.Stretch)
box.setMovable(True)
");
        fix_qheader(&mut d, &mut state());
        let text = d.text();
        assert!(text.contains("hdr.setSectionsMovable(True)"));
        assert!(text.contains(".setSectionResizeMode(QHeaderView.Stretch)"));
        assert!(text.contains("box.setMovable(True)"));
    }

    #[test]
    fn inputdialog_getint() {
        let mut d = doc("n, ok = QInputDialog.getInteger(self, 't', 'l')\n");
        fix_qinputdialog(&mut d, &mut state());
        assert_eq!(d.text(), "n, ok = QInputDialog.getInt(self, 't', 'l')\n");
    }

    #[test]
    fn qvariant_conversions_dropped() {
        let mut d = doc("x = v.toString()\ny = v.toInt()\n");
        fix_qvariant(&mut d, &mut state());
        assert_eq!(d.text(), "x = v\ny = v\n");
    }

    #[test]
    fn classname_renames() {
        let mut d = doc("m = QMatrix()\ne = QIconEngineV2()\n");
        rename_classes(&mut d, &mut state());
        assert_eq!(d.text(), "m = QTransform()\ne = QIconEngine()\n");
    }
}
