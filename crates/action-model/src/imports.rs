//! Per-compilation-unit import tables and type-name resolution.
//!
//! Resolution is best-effort text matching against the import list, not
//! semantic lookup: an unresolved name passes through unchanged and the
//! generated code inherits whatever the developer wrote.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

/// The import table of one annotated source file.
#[derive(Debug, Default, Clone)]
pub struct CompilationUnitImports {
    imports: Vec<String>,
    static_aliases: IndexMap<SmolStr, String>,
    ensured: IndexSet<String>,
}

impl CompilationUnitImports {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declared import (fully qualified).
    pub fn add_import(&mut self, fq: impl Into<String>) {
        let fq = fq.into();
        if !self.imports.contains(&fq) {
            self.imports.push(fq);
        }
    }

    /// Resolves a possibly partially-qualified type name against the import
    /// list.
    ///
    /// Trailing `[]` suffixes and a nested `.Inner` path are detached, the
    /// leading segment is matched against import simple names, and the
    /// suffixes are reattached to the qualified result. Names that match no
    /// import come back unchanged.
    pub fn resolve(&self, name: &str) -> String {
        let base = name.trim_end_matches("[]");
        let array_suffix = &name[base.len()..];

        let (head, nested) = match base.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (base, None),
        };

        let resolved_head = self
            .imports
            .iter()
            .find(|imp| imp.rsplit('.').next() == Some(head));

        match resolved_head {
            Some(fq) => {
                let mut out = fq.clone();
                if let Some(nested) = nested {
                    out.push('.');
                    out.push_str(nested);
                }
                out.push_str(array_suffix);
                out
            }
            None => name.to_string(),
        }
    }

    /// Resolves a name and records the result as an import the generated
    /// file must carry.
    pub fn resolve_and_ensure(&mut self, name: &str) -> String {
        let resolved = self.resolve(name);
        let base = resolved.trim_end_matches("[]");
        if base.contains('.') {
            self.ensure_import(base.to_string());
        }
        resolved
    }

    /// Records an import that must be present in the generated file.
    pub fn ensure_import(&mut self, fq: impl Into<String>) {
        self.ensured.insert(fq.into());
    }

    /// Records a static-import alias for later whole-word macro expansion.
    pub fn register_static_alias(&mut self, alias: impl Into<SmolStr>, fq: impl Into<String>) {
        self.static_aliases.insert(alias.into(), fq.into());
    }

    /// Looks up a static-import alias.
    pub fn static_alias(&self, alias: &str) -> Option<&str> {
        self.static_aliases.get(alias).map(|s| s.as_str())
    }

    /// All registered static aliases, in registration order.
    pub fn static_aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.static_aliases
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Imports the generated file must declare, in registration order.
    pub fn ensured(&self) -> impl Iterator<Item = &str> {
        self.ensured.iter().map(|s| s.as_str())
    }

    /// Declared imports in source order.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports() -> CompilationUnitImports {
        let mut imports = CompilationUnitImports::new();
        imports.add_import("java.util.List");
        imports.add_import("java.util.Map");
        imports.add_import("com.example.ui.MainView");
        imports
    }

    #[test]
    fn test_resolve_simple() {
        assert_eq!(imports().resolve("List"), "java.util.List");
    }

    #[test]
    fn test_resolve_with_array_suffix() {
        assert_eq!(imports().resolve("List[]"), "java.util.List[]");
        assert_eq!(imports().resolve("List[][]"), "java.util.List[][]");
    }

    #[test]
    fn test_resolve_nested_type() {
        assert_eq!(imports().resolve("Map.Entry"), "java.util.Map.Entry");
        assert_eq!(imports().resolve("Map.Entry[]"), "java.util.Map.Entry[]");
    }

    #[test]
    fn test_resolve_unknown_passes_through() {
        assert_eq!(imports().resolve("Widget"), "Widget");
    }

    #[test]
    fn test_resolve_and_ensure_records_import() {
        let mut imports = imports();
        imports.resolve_and_ensure("List[]");
        assert_eq!(imports.ensured().collect::<Vec<_>>(), vec!["java.util.List"]);
    }

    #[test]
    fn test_static_alias() {
        let mut imports = imports();
        imports.register_static_alias("runOnUi", "com.example.Threads.runOnUi");
        assert_eq!(
            imports.static_alias("runOnUi"),
            Some("com.example.Threads.runOnUi")
        );
    }

    #[test]
    fn test_static_aliases_keep_registration_order() {
        let mut imports = imports();
        imports.register_static_alias("zulu", "com.example.Z.zulu");
        imports.register_static_alias("alpha", "com.example.A.alpha");
        imports.register_static_alias("mike", "com.example.M.mike");
        let aliases: Vec<&str> = imports.static_aliases().map(|(alias, _)| alias).collect();
        assert_eq!(aliases, ["zulu", "alpha", "mike"]);
    }
}
