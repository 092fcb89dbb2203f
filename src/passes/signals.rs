//! Old-style signal and slot rewrites.
//!
//! `obj.connect(sender, SIGNAL("sig(int)"), handler)` and friends become the
//! new-style bound-signal form `sender.sig.connect(handler)`. Overloaded
//! signals keep their C++ argument list as a `[int]` subscript. A chained
//! SIGNAL in slot position additionally triggers declaration synthesis, as
//! does every rewritten `emit`.

use crate::core::SourceDocument;
use crate::parse::split_arguments;
use crate::passes::{sentinel_line, synthesize};
use crate::state::MigrationState;

/// How the slot position of a connect/disconnect call was written.
enum SlotShape {
    /// `SLOT("name(args)")`, optionally behind a receiver object.
    Handler {
        obj: String,
        name: String,
    },
    /// `SIGNAL("name(args)")` in slot position. Keeps the raw expression so
    /// the matching `pyqtSignal` declaration can be synthesized.
    Chained {
        obj: String,
        name: String,
        args: String,
        raw: String,
    },
    /// A plain Python callable, passed through untouched.
    Callable(String),
    Invalid,
}

/// The argument text of the outermost call: everything between the opening
/// parenthesis and the last closing parenthesis on the logical line. Greedy
/// on purpose, trailing-argument imbalance is repaired by the caller.
fn call_interior(tail: &str) -> Option<&str> {
    tail.rfind(')').map(|close| &tail[..close])
}

fn paren_balance(text: &str) -> i32 {
    let opened = text.matches('(').count() as i32;
    let closed = text.matches(')').count() as i32;
    opened - closed
}

/// Strip `n` closing parentheses from the right end of `text`, wherever they
/// sit among trailing characters.
fn drop_trailing_closers(text: &str, mut n: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().rev() {
        if n > 0 && ch == ')' {
            n -= 1;
            continue;
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Normalize the C++ flavoured argument text of a SIGNAL/SLOT signature:
/// qualifiers and reference/pointer sigils go away, `QString` becomes the
/// quoted overload marker PyQt5 expects.
pub(crate) fn clean_signature_args(args: &str) -> String {
    let cleaned = args
        .replace("const char*", "str")
        .replace("const char *", "str")
        .replace(" const ", "")
        .replace("const ", "")
        .replace(" * ", "")
        .replace(" *", "")
        .replace("* ", "")
        .replace('*', "")
        .replace(" & ", "")
        .replace(" &", "")
        .replace("& ", "")
        .replace('&', "")
        .replace("PyQt_PyObject", "'PyQt_PyObject'");
    cleaned
        .replace("PyQt4.QtCore.QString", "QString")
        .replace("PyQt4.Qt.QString", "QString")
        .replace("QtCore.QString", "QString")
        .replace("Qt.QString", "QString")
        // Already-quoted spellings are normalized first so re-quoting
        // never doubles the quotes.
        .replace("'QStringList'", "QStringList")
        .replace("\"QStringList\"", "QStringList")
        .replace("'QString'", "QString")
        .replace("\"QString\"", "QString")
        .replace("QString", "'QString'")
        .replace("'QString'List", "'QStringList'")
        .replace("'QStringList'Model", "QStringListModel")
}

/// Take a `SIGNAL("name(args)")` or `SLOT("name(args)")` expression apart.
///
/// Returns the bare name followed by its cleaned argument types. An
/// expression without the wrapper comes back whole, as does one whose quoted
/// content is malformed.
pub(crate) fn signature_parts(el: &str) -> Vec<String> {
    if !el.contains("SIGNAL(") && !el.contains("SLOT(") {
        return vec![el.to_owned()];
    }
    let (open, close) = match (el.find('('), el.rfind(')')) {
        (Some(o), Some(c)) if c > o => (o, c),
        _ => return vec![el.to_owned()],
    };
    let content = el[open + 1..close].trim();
    if !content.starts_with('\'') && !content.starts_with('"') {
        log::warn!("invalid signal/slot declaration syntax: {content}");
        return vec![content.to_owned()];
    }
    let content = content.trim_matches(|c| c == '\'' || c == '"');
    match content.split_once('(') {
        None => vec![content.trim_start().to_owned()],
        Some((name, rest)) => {
            let cleaned = clean_signature_args(&rest.replace(')', ""));
            let mut parts = vec![name.trim_start().to_owned()];
            parts.extend(split_arguments(&cleaned));
            parts
        }
    }
}

/// Overload subscript text for a parsed signature, empty when the signal
/// takes no arguments. `sslErrors` always collapses to the no-arg form since
/// its PyQt5 signature dropped the list argument.
fn overload_args(parts: &[String]) -> String {
    if parts.len() > 1 && parts[0] != "sslErrors" {
        parts[1..].join(", ").replace("::", ".")
    } else {
        String::new()
    }
}

/// `strict_fourth` rejects a fourth argument that is not a SIGNAL/SLOT
/// wrapper; disconnect() has no trailing connection-type argument, so a bare
/// fourth argument there means the call was malformed.
fn classify_slot(args: &[String], strict_fourth: bool) -> (SlotShape, String) {
    let wrapped = |s: &str| s.contains("SLOT(") || s.contains("SIGNAL(");
    if wrapped(&args[2]) {
        let chained = args[2].contains("SIGNAL(");
        let parts = signature_parts(&args[2]);
        let name = parts[0].clone();
        let other = args.get(3..).unwrap_or(&[]).join(", ");
        let shape = if chained {
            SlotShape::Chained {
                obj: "self".to_owned(),
                args: overload_args(&parts),
                name,
                raw: args[2].clone(),
            }
        } else {
            SlotShape::Handler {
                obj: String::new(),
                name,
            }
        };
        (shape, other)
    } else if args.len() > 3 && wrapped(&args[3]) {
        let chained = args[3].contains("SIGNAL(");
        let parts = signature_parts(&args[3]);
        let name = parts[0].clone();
        let other = args.get(4..).unwrap_or(&[]).join(", ");
        let shape = if chained {
            SlotShape::Chained {
                obj: args[2].clone(),
                args: overload_args(&parts),
                name,
                raw: args[3].clone(),
            }
        } else {
            SlotShape::Handler {
                obj: args[2].clone(),
                name,
            }
        };
        (shape, other)
    } else if strict_fourth && args.len() > 3 {
        (SlotShape::Invalid, String::new())
    } else {
        (
            SlotShape::Callable(args[2].clone()),
            args.get(3..).unwrap_or(&[]).join(", "),
        )
    }
}

/// Rewrite `receiver.emit(SIGNAL("sig(types)"), a, b)` into
/// `receiver.sig.emit(a, b)` and synthesize the declaration.
pub fn rewrite_emit(doc: &mut SourceDocument, state: &mut MigrationState) {
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx).text.clone();
        if line_has_call(&line, doc, idx, ".emit(") {
            if let Some((prefix, tail)) = line.split_once(".emit(") {
                if let Some(interior) = call_interior(tail) {
                    let mut args = split_arguments(interior);
                    if !args.is_empty() {
                        let last = args.len() - 1;
                        let diff = paren_balance(&args[last]);
                        let trailing = ")".repeat(diff.unsigned_abs() as usize);
                        if diff < 0 {
                            args[last] =
                                drop_trailing_closers(&args[last], diff.unsigned_abs() as usize);
                        }
                        if args.len() == 2 && args[1] == "()" {
                            args.pop();
                        }
                        let name = signature_parts(&args[0])[0].clone();
                        doc.set_text(
                            idx,
                            format!(
                                "{}.{}.emit({}){}\n",
                                prefix,
                                name,
                                args[1..].join(", "),
                                trailing
                            ),
                        );
                        idx += synthesize::declare_signal(doc, state, idx, &args[0]);
                    }
                }
            }
        }
        idx += 1;
    }
}

fn line_has_call(line: &str, doc: &SourceDocument, idx: usize, call: &str) -> bool {
    doc.get(idx).map(|l| l.is_code()).unwrap_or(false)
        && line.contains(call)
        && line.contains("SIGNAL(")
}

fn rewrite_connect_like(
    doc: &mut SourceDocument,
    state: &mut MigrationState,
    call: &str,
    max_args: usize,
    synthesize_chained: bool,
    strict_fourth: bool,
) {
    let split_at = format!(".{call}(");
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx).text.clone();
        if !line_has_call(&line, doc, idx, &split_at) {
            idx += 1;
            continue;
        }
        let indent = doc.line(idx).indent().to_owned();
        let annotate = |doc: &mut SourceDocument, idx: &mut usize| {
            let msg = format!("Ambiguous {call}() call, can't refactor it.");
            doc.insert(*idx, sentinel_line(&indent, &msg));
            *idx += 2;
        };

        let Some((_, tail)) = line.split_once(&split_at) else {
            idx += 1;
            continue;
        };
        let Some(interior) = call_interior(tail) else {
            idx += 1;
            continue;
        };
        let args = split_arguments(interior);
        if args.len() < 3 || args.len() > max_args || !args[1].contains("SIGNAL(") {
            annotate(doc, &mut idx);
            continue;
        }

        let signal_obj = args[0].clone();
        let signal = signature_parts(&args[1]);
        let signal_args = overload_args(&signal);
        let (slot, other) = classify_slot(&args, strict_fourth);
        if matches!(slot, SlotShape::Invalid) {
            annotate(doc, &mut idx);
            continue;
        }

        let mut text = format!("{indent}{signal_obj}.{}", signal[0]);
        if !signal_args.is_empty() {
            text.push_str(&format!("[{signal_args}]"));
        }
        text.push_str(&format!(".{call}("));
        let mut chained_raw = None;
        match &slot {
            SlotShape::Handler { obj, name } => {
                if !obj.is_empty() {
                    text.push_str(&format!("{obj}."));
                }
                text.push_str(name);
            }
            SlotShape::Chained {
                obj,
                name,
                args: slot_args,
                raw,
            } => {
                if !obj.is_empty() {
                    text.push_str(&format!("{obj}."));
                }
                text.push_str(name);
                if !slot_args.is_empty() {
                    text.push_str(&format!("[{slot_args}]"));
                }
                chained_raw = Some(raw.clone());
            }
            SlotShape::Callable(name) => text.push_str(name),
            SlotShape::Invalid => unreachable!(),
        }
        // disconnect() has no trailing connection-type argument to carry over.
        if !other.is_empty() && !strict_fourth {
            text.push_str(&format!(", {other}"));
        }
        text.push_str(")\n");
        doc.set_text(idx, text);

        if synthesize_chained {
            if let Some(raw) = chained_raw {
                idx += synthesize::declare_signal(doc, state, idx, &raw);
            }
        }
        idx += 1;
    }
}

/// Rewrite the five old-style `connect()` shapes.
pub fn rewrite_connect(doc: &mut SourceDocument, state: &mut MigrationState) {
    rewrite_connect_like(doc, state, "connect", 5, true, false);
}

/// Rewrite the old-style `disconnect()` shapes. No declaration synthesis:
/// a signal only ever disconnected was never emitted from this class.
pub fn rewrite_disconnect(doc: &mut SourceDocument, state: &mut MigrationState) {
    rewrite_connect_like(doc, state, "disconnect", 4, false, true);
}

/// Clean the C++ type spellings inside `@pyqtSignal(...)` decorators.
pub fn clean_signal_decorators(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        let text = &doc.line(idx).text;
        if text.contains("@pyqtSignal") {
            let cleaned = clean_signature_args(text)
                .replace("'str'", "str")
                .replace("\"str\"", "str");
            doc.set_text(idx, cleaned);
        }
    }
}

/// `@pyqtSignature` became `@pyqtSlot`; its arguments get the same cleanup.
pub fn rename_slot_decorators(doc: &mut SourceDocument, _state: &mut MigrationState) {
    for idx in 0..doc.len() {
        let mut line = doc.line(idx).text.replace("@pyqtSignature", "@pyqtSlot");
        if line.contains("@pyqtSlot") {
            line = clean_signature_args(&line)
                .replace("'str'", "str")
                .replace("\"str\"", "str");
        }
        doc.set_text(idx, line);
    }
}
