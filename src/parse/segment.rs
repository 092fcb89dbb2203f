//! Logical Line Segmenter and Indentation Probe.
//!
//! Physical lines group into logical statements: a statement ends at the
//! first physical line that leaves the lexer with no open bracket, no open
//! string and no pending backslash continuation. Blank lines and standalone
//! comments each form their own logical line. Segmentation is lossless;
//! concatenating the result reproduces the input exactly.

use crate::core::{LineKind, LogicalLine, Result, SourceDocument};
use crate::parse::lexer::ScanState;

/// Group physical lines (each keeping its trailing newline) into a document.
pub fn segment(physical: &[String]) -> Result<SourceDocument> {
    let mut out = Vec::new();
    let mut state = ScanState::default();
    let mut buf = String::new();
    let mut buf_start = 1usize;

    for (i, phys) in physical.iter().enumerate() {
        let lineno = i + 1;
        state.scan_line(phys, lineno)?;
        if buf.is_empty() {
            buf_start = lineno;
        }
        buf.push_str(phys);
        if !state.is_open() {
            out.push(LogicalLine::new(std::mem::take(&mut buf), buf_start));
        }
    }
    state.finish(physical.len())?;

    Ok(SourceDocument::new(out))
}

/// Indentation unit of the file: the first character of the first indented
/// statement's indent run, one space when nothing is indented.
pub fn indentation_unit(doc: &SourceDocument) -> char {
    for line in doc.iter() {
        if matches!(line.kind(), LineKind::Comment | LineKind::Blank) {
            continue;
        }
        if let Some(c) = line.indent().chars().next() {
            return c;
        }
    }
    ' '
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(src: &str) -> Vec<String> {
        src.split_inclusive('\n').map(str::to_owned).collect()
    }

    fn texts(doc: &SourceDocument) -> Vec<String> {
        doc.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn one_statement_per_line() {
        let doc = segment(&lines("a = 1\nb = 2\n")).unwrap();
        assert_eq!(texts(&doc), vec!["a = 1\n", "b = 2\n"]);
        assert_eq!(doc.line(1).start, 2);
    }

    #[test]
    fn bracketed_call_is_one_logical_line() {
        let src = "self.connect(a,\n             b,\n             c)\nx = 1\n";
        let doc = segment(&lines(src)).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.line(0).start, 1);
        assert_eq!(doc.line(0).end(), 3);
        assert_eq!(doc.line(1).start, 4);
    }

    #[test]
    fn blank_and_comment_lines_stand_alone() {
        let doc = segment(&lines("x = 1\n\n# note\ny = 2\n")).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.line(1).kind(), LineKind::Blank);
        assert_eq!(doc.line(2).kind(), LineKind::Comment);
    }

    #[test]
    fn docstring_spanning_lines_is_one_statement() {
        let src = "def f():\n    '''first\n    second'''\n    pass\n";
        let doc = segment(&lines(src)).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.line(1).text, "    '''first\n    second'''\n");
    }

    #[test]
    fn backslash_continuation_joins_lines() {
        let doc = segment(&lines("total = 1 + \\\n        2\n")).unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn segmentation_is_lossless() {
        let src = "import os\n\nclass C(object):\n    '''doc\n    string'''\n    def f(self):\n        return [1,\n                2]\n# tail comment\n";
        let doc = segment(&lines(src)).unwrap();
        assert_eq!(doc.text(), src);
    }

    #[test]
    fn error_token_aborts_segmentation() {
        assert!(segment(&lines("x = 'unclosed\ny = 1\n")).is_err());
        assert!(segment(&lines("f(a,\n")).is_err());
    }

    #[test]
    fn probes_space_indent() {
        let doc = segment(&lines("class C:\n    def f(self):\n        pass\n")).unwrap();
        assert_eq!(indentation_unit(&doc), ' ');
    }

    #[test]
    fn probes_tab_indent() {
        let doc = segment(&lines("class C:\n\tdef f(self):\n\t\tpass\n")).unwrap();
        assert_eq!(indentation_unit(&doc), '\t');
    }

    #[test]
    fn probe_defaults_to_space() {
        let doc = segment(&lines("x = 1\ny = 2\n")).unwrap();
        assert_eq!(indentation_unit(&doc), ' ');
    }

    #[test]
    fn comment_indent_is_not_the_unit() {
        let doc = segment(&lines("x = 1\n\t# tab comment\nif x:\n    pass\n")).unwrap();
        assert_eq!(indentation_unit(&doc), ' ');
    }
}
