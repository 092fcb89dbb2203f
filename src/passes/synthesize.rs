//! Signal declaration synthesis.
//!
//! Rewriting an old-style `emit` (or a chained SIGNAL in slot position)
//! produces a bound-signal attribute that must exist as a `pyqtSignal` class
//! member. This pass-helper walks back from the use site to the enclosing
//! `class` statement and inserts the declaration at the top of the class
//! body, once per signal name.

use crate::core::SourceDocument;
use crate::passes::signals::signature_parts;
use crate::state::MigrationState;

/// Insert a `name = pyqtSignal(types)` declaration for `signal_expr` (the
/// raw `SIGNAL("name(types)")` text, possibly module-prefixed) into the
/// class enclosing `use_idx`. Returns the number of lines inserted so the
/// calling pass can keep its cursor stable.
pub fn declare_signal(
    doc: &mut SourceDocument,
    state: &mut MigrationState,
    use_idx: usize,
    signal_expr: &str,
) -> usize {
    // A prefix like `QtCore.` on the SIGNAL call carries over to pyqtSignal.
    let module = signal_expr
        .split("SIGNAL(")
        .next()
        .unwrap_or("")
        .to_owned();
    let parts = signature_parts(signal_expr);
    let name = parts[0].clone();

    // Walk back to the enclosing class statement. A module-level emit has no
    // home for the declaration; leave it alone.
    let mut idx = use_idx;
    loop {
        let line = match doc.get(idx) {
            Some(l) => l,
            None => return 0,
        };
        if line.is_code() && line.text.contains("class ") {
            break;
        }
        if idx == 0 {
            return 0;
        }
        idx -= 1;
    }

    // Skip past any declarations already at the top of the class body; bail
    // out if ours is among them.
    idx += 1;
    loop {
        let line = match doc.get(idx) {
            Some(l) => l,
            None => return 0,
        };
        if line.is_code() && line.text.contains(&name) {
            return 0;
        }
        if line.is_code() && !line.text.contains("pyqtSignal") {
            break;
        }
        idx += 1;
    }

    let indent = doc.line(idx).indent().to_owned();
    if idx > 0 && doc.line(idx - 1).text == "\n" {
        idx -= 1;
    }
    let declaration = if parts.len() == 1 || name == "sslErrors" {
        format!("{indent}{name} = {module}pyqtSignal()\n")
    } else {
        let types = parts[1..].join(", ").replace("::", ".");
        format!("{indent}{name} = {module}pyqtSignal({types})\n")
    };
    doc.insert(idx, declaration);
    state.added_pyqt_signal = true;

    // A blank line between the declaration and a directly following def.
    idx += 1;
    let follows_def = doc
        .get(idx)
        .map(|l| l.text.trim_start().starts_with("def "))
        .unwrap_or(false);
    if follows_def {
        doc.insert(idx, "\n".to_owned());
        2
    } else {
        1
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
    fn declaration_lands_at_class_body_top() {
        let mut d = doc("\
class W(QObject):
    \"\"\"Widget.\"\"\"
    def go(self):
        self.changed.emit(3)
");
        let mut st = MigrationState::new(' ');
        let inserted = declare_signal(&mut d, &mut st, 3, "SIGNAL('changed(int)')");
        assert_eq!(inserted, 2);
        assert_eq!(
            d.text(),
            "\
class W(QObject):
    \"\"\"Widget.\"\"\"
    changed = pyqtSignal(int)

    def go(self):
        self.changed.emit(3)
"
        );
    }

    #[test]
    fn existing_declaration_is_not_duplicated() {
        let mut d = doc("\
class W(QObject):
    changed = pyqtSignal(int)

    def go(self):
        self.changed.emit(3)
");
        let mut st = MigrationState::new(' ');
        assert_eq!(declare_signal(&mut d, &mut st, 4, "SIGNAL('changed(int)')"), 0);
        assert!(!st.added_pyqt_signal);
    }

    #[test]
    fn module_prefix_carries_over() {
        let mut d = doc("\
class W(QObject):
    def go(self):
        self.done.emit()
");
        let mut st = MigrationState::new(' ');
        declare_signal(&mut d, &mut st, 2, "QtCore.SIGNAL('done()')");
        assert!(d.text().contains("    done = QtCore.pyqtSignal()\n"));
    }

    #[test]
    fn module_level_use_is_left_alone() {
        let mut d = doc("obj.changed.emit(3)\n");
        let mut st = MigrationState::new(' ');
        assert_eq!(declare_signal(&mut d, &mut st, 0, "SIGNAL('changed(int)')"), 0);
    }
}
