//! Static membership tables.
//!
//! The Qt4 -> Qt5 module split is data, not code: which class lands in which
//! PyQt5 submodule, which classes were discontinued, which `qApp` methods
//! are static, and which QVariant conversions became implicit. The default
//! tables ship embedded in the binary; `--tables` swaps in an external TOML
//! file with the same shape.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::core::Error;

const EMBEDDED_TABLES: &str = include_str!("../data/membership.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipTables {
    /// Destination module -> classes that moved there out of the PyQt4
    /// umbrella modules.
    #[serde(default)]
    modules: BTreeMap<String, Vec<String>>,

    /// Module -> classes with no PyQt5 counterpart.
    #[serde(default)]
    discarded: BTreeMap<String, Vec<String>>,

    /// Old class name -> new class name.
    #[serde(default)]
    pub renames: BTreeMap<String, String>,

    #[serde(default)]
    pub qapp_static_methods: Vec<String>,

    #[serde(default)]
    pub qvariant_obsolete_methods: Vec<String>,

    #[serde(skip)]
    module_sets: BTreeMap<String, HashSet<String>>,
}

impl MembershipTables {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let mut tables: MembershipTables =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        tables.module_sets = tables
            .modules
            .iter()
            .map(|(m, classes)| (m.clone(), classes.iter().cloned().collect()))
            .collect();
        Ok(tables)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn embedded() -> Result<Self, Error> {
        Self::from_toml(EMBEDDED_TABLES)
    }

    /// True when `class` now belongs to `module`.
    pub fn belongs_to(&self, module: &str, class: &str) -> bool {
        self.module_sets
            .get(module)
            .is_some_and(|set| set.contains(class))
    }

    /// Classes of `module` in table order (used when scanning source text
    /// for bare class references).
    pub fn classes(&self, module: &str) -> &[String] {
        self.modules.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn discarded(&self, module: &str) -> &[String] {
        self.discarded.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    /// New name for a renamed class, if any.
    pub fn renamed(&self, class: &str) -> Option<&str> {
        self.renames.get(class).map(String::as_str)
    }
}

static TABLES: OnceLock<MembershipTables> = OnceLock::new();

/// Install the process-wide tables, from `path` when given. May only be
/// called once; later calls are ignored.
pub fn init_tables(path: Option<&Path>) -> Result<(), Error> {
    let tables = match path {
        Some(p) => MembershipTables::from_file(p)?,
        None => MembershipTables::embedded()?,
    };
    let _ = TABLES.set(tables);
    Ok(())
}

/// Process-wide tables; falls back to the embedded defaults when
/// [`init_tables`] was never called (tests, library use).
pub fn tables() -> &'static MembershipTables {
    TABLES.get_or_init(|| {
        MembershipTables::embedded().expect("embedded membership tables must parse")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tables_parse() {
        let t = MembershipTables::embedded().unwrap();
        assert!(t.belongs_to("QtWidgets", "QDialog"));
        assert!(t.belongs_to("QtCore", "QSortFilterProxyModel"));
        assert!(t.belongs_to("QtPrintSupport", "QPrinter"));
        assert!(!t.belongs_to("QtWidgets", "QCursor"));
    }

    #[test]
    fn renames_present() {
        let t = MembershipTables::embedded().unwrap();
        assert_eq!(t.renamed("QMatrix"), Some("QTransform"));
        assert_eq!(t.renamed("QIconEngineV2"), Some("QIconEngine"));
        assert_eq!(t.renamed("QDialog"), None);
    }

    #[test]
    fn unknown_module_is_empty() {
        let t = MembershipTables::embedded().unwrap();
        assert!(t.classes("QtNoSuchModule").is_empty());
        assert!(!t.belongs_to("QtNoSuchModule", "QDialog"));
    }

    #[test]
    fn method_tables_deserialize_as_arrays() {
        let t = MembershipTables::embedded().unwrap();
        assert!(t.qapp_static_methods.contains(&"beep".to_string()));
        assert!(t.qapp_static_methods.contains(&"quit".to_string()));
        assert!(t.qvariant_obsolete_methods.contains(&"toString".to_string()));
        assert!(!t.renames.contains_key("qapp_static_methods"));
    }

    #[test]
    fn discarded_opengl_classes() {
        let t = MembershipTables::embedded().unwrap();
        assert!(t.discarded("QtOpenGL").contains(&"QGLShader".to_string()));
        assert!(t.belongs_to("QtOpenGL", "QGLWidget"));
    }
}
