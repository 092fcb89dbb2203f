//! Annotation passes for Qt4 modules that have no Qt5 counterpart.
//!
//! Nothing here rewrites code. Each pass marks the offending lines with a
//! sentinel comment so the finalizer can surface them in the report while
//! the source keeps its meaning for a human to sort out.

use crate::config::tables;
use crate::core::SourceDocument;
use crate::passes::sentinel_line;
use crate::state::MigrationState;

fn flag_matching<F>(doc: &mut SourceDocument, message: &str, mut matches: F)
where
    F: FnMut(&str) -> bool,
{
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx);
        if line.is_code() && matches(&line.text) {
            let marker = sentinel_line(line.indent(), message);
            doc.insert(idx, marker);
            idx += 2;
        } else {
            idx += 1;
        }
    }
}

pub fn flag_qtscript(doc: &mut SourceDocument, _state: &mut MigrationState) {
    flag_matching(
        doc,
        "QtScript and QtScriptTools are no longer supported.",
        |text| text.contains("QtScript") || text.contains("QScript"),
    );
}

pub fn flag_qtxml(doc: &mut SourceDocument, _state: &mut MigrationState) {
    flag_matching(doc, "QtXml is no longer supported.", |text| {
        text.contains("QtXml")
    });
}

pub fn flag_qtdeclarative(doc: &mut SourceDocument, _state: &mut MigrationState) {
    flag_matching(
        doc,
        "QtDeclarative module is no longer supported.",
        |text| {
            text.contains("QtDeclarative")
                || text.contains("QDeclarative")
                || text.contains("QPyDeclarative")
        },
    );
}

pub fn flag_qgraphicsitemanimation(doc: &mut SourceDocument, _state: &mut MigrationState) {
    flag_matching(
        doc,
        "QGraphicsItemAnimation class is no longer supported.",
        |text| text.contains("QGraphicsItemAnimation"),
    );
}

pub fn flag_qtopengl(doc: &mut SourceDocument, _state: &mut MigrationState) {
    let dropped = tables().discarded("QtOpenGL");
    flag_matching(
        doc,
        "Only QGLContext, QGLFormat and QGLWidget are supported.",
        |text| {
            text.contains("QGL") && dropped.iter().any(|cls| text.contains(cls.as_str()))
        },
    );
}
