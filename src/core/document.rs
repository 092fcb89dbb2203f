//! Logical-line document model.
//!
//! The engine never works on physical lines: the segmenter groups them into
//! logical statements and every rewrite pass mutates this document. The one
//! structural invariant is that concatenating the lines in order always
//! reproduces a syntactically valid program (and, before any pass has run,
//! the original input byte for byte).

use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+(\w+)\s*[(:]").unwrap());

/// Classification of a logical line, mirroring what the rewrite passes need
/// to know: only `Code` lines are ever rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Code,
    Comment,
    StringLiteral,
    Blank,
}

/// One logical statement, possibly spanning several physical lines.
///
/// `text` keeps every physical newline, so multi-line statements round-trip
/// unchanged through passes that do not touch them.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    pub text: String,
    /// First physical line (1-based) at segmentation time. Insertions during
    /// the pipeline do not renumber; the annotation finalizer recounts.
    pub start: usize,
}

impl LogicalLine {
    pub fn new(text: impl Into<String>, start: usize) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }

    /// Last physical line (1-based) covered at segmentation time.
    pub fn end(&self) -> usize {
        self.start + self.text.matches('\n').count().saturating_sub(1)
    }

    pub fn kind(&self) -> LineKind {
        let trimmed = self.text.trim_start();
        if trimmed.trim().is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with('#') {
            LineKind::Comment
        } else if trimmed.starts_with('"') || trimmed.starts_with('\'') {
            LineKind::StringLiteral
        } else {
            LineKind::Code
        }
    }

    /// True for lines the rewrite passes may touch: not blank, not a
    /// comment, not a bare string/docstring statement.
    pub fn is_code(&self) -> bool {
        self.kind() == LineKind::Code
    }

    pub fn is_comment(&self) -> bool {
        self.kind() == LineKind::Comment
    }

    pub fn is_class(&self) -> bool {
        self.text.trim_start().starts_with("class ")
    }

    pub fn is_def(&self) -> bool {
        self.text.trim_start().starts_with("def ")
    }

    /// Leading whitespace of the first physical line.
    pub fn indent(&self) -> &str {
        let end = self
            .text
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(self.text.len());
        &self.text[..end]
    }

    /// Name from a `class Foo(Base):` introducer line.
    pub fn class_name(&self) -> Option<&str> {
        CLASS_NAME_RE
            .captures(&self.text)
            .map(|c| c.get(1).unwrap().as_str())
    }
}

/// Ordered sequence of logical lines for one file.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    lines: Vec<LogicalLine>,
}

impl SourceDocument {
    pub fn new(lines: Vec<LogicalLine>) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&LogicalLine> {
        self.lines.get(idx)
    }

    pub fn line(&self, idx: usize) -> &LogicalLine {
        &self.lines[idx]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogicalLine> {
        self.lines.iter()
    }

    /// Replace the text of a line in place.
    pub fn set_text(&mut self, idx: usize, text: impl Into<String>) {
        self.lines[idx].text = text.into();
    }

    /// Insert a new logical line before `idx`. The inserted line inherits
    /// the physical position of the line it displaces.
    pub fn insert(&mut self, idx: usize, text: impl Into<String>) {
        let start = self.lines.get(idx).map(|l| l.start).unwrap_or_else(|| {
            self.lines.last().map(|l| l.end() + 1).unwrap_or(1)
        });
        self.lines.insert(idx, LogicalLine::new(text, start));
    }

    pub fn remove_range(&mut self, range: std::ops::Range<usize>) {
        self.lines.drain(range);
    }

    /// Rebuild the document by iterating a snapshot of the current lines.
    ///
    /// Passes that insert or delete lines go through this so later indices
    /// never shift under them mid-iteration; the callback appends whatever
    /// the output should contain for each input line.
    pub fn rebuild<F>(&mut self, mut f: F)
    where
        F: FnMut(&LogicalLine, &mut DocBuilder),
    {
        let mut builder = DocBuilder {
            lines: Vec::with_capacity(self.lines.len()),
        };
        for line in &self.lines {
            f(line, &mut builder);
        }
        self.lines = builder.lines;
    }

    /// Concatenation of all logical lines, in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
        }
        out
    }

    /// First indentation found at or after `idx`, used when synthesizing a
    /// block where none exists yet.
    pub fn next_indent(&self, idx: usize) -> Option<&str> {
        for line in &self.lines[idx.min(self.lines.len())..] {
            let ind = line.indent();
            if !ind.is_empty() {
                return Some(ind);
            }
        }
        None
    }
}

/// Output accumulator for [`SourceDocument::rebuild`].
pub struct DocBuilder {
    lines: Vec<LogicalLine>,
}

impl DocBuilder {
    /// Keep a line as-is.
    pub fn keep(&mut self, line: &LogicalLine) {
        self.lines.push(line.clone());
    }

    /// Emit a line with replaced text at the same physical position.
    pub fn replace(&mut self, line: &LogicalLine, text: impl Into<String>) {
        self.lines.push(LogicalLine::new(text, line.start));
    }

    /// Emit a brand-new line anchored at the given line's position.
    pub fn emit(&mut self, at: &LogicalLine, text: impl Into<String>) {
        self.lines.push(LogicalLine::new(text, at.start));
    }
}
