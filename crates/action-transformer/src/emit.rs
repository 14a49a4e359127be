//! Generated-Java emission primitives.
//!
//! Code synthesis builds [`CodeBlock`] trees; a block holds declarations,
//! statements and nested blocks in arrival order. Blocks are shared through
//! [`BlockRef`] handles because several independent handlers may keep
//! appending to one listener body after it has been materialized.

use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a code block under construction.
pub type BlockRef = Rc<RefCell<CodeBlock>>;

/// Creates a fresh shared block.
pub fn block() -> BlockRef {
    Rc::new(RefCell::new(CodeBlock::default()))
}

#[derive(Debug, Clone)]
enum BlockItem {
    Stmt(String),
    Nested {
        header: String,
        body: BlockRef,
        footer: String,
    },
}

/// A brace-delimited block of generated statements.
///
/// Declarations render before statements regardless of interleaving, matching
/// how buffered listener declarations are flushed ahead of the first
/// statement.
#[derive(Debug, Clone, Default)]
pub struct CodeBlock {
    decls: Vec<String>,
    items: Vec<BlockItem>,
    tails: Vec<String>,
}

impl CodeBlock {
    /// Appends a declaration. Declarations render at the top of the block.
    pub fn add_decl(&mut self, decl: impl Into<String>) {
        self.decls.push(decl.into());
    }

    /// Appends a statement. A trailing `;` is added if missing.
    pub fn add_statement(&mut self, stmt: impl Into<String>) {
        let mut stmt = stmt.into();
        let trimmed = stmt.trim_end();
        if !trimmed.ends_with(';') && !trimmed.ends_with('}') && !trimmed.is_empty() {
            stmt = format!("{};", trimmed);
        }
        self.items.push(BlockItem::Stmt(stmt));
    }

    /// Opens a nested block rendered as `header { ... } footer-tail`.
    ///
    /// `footer` replaces the closing brace line, so anonymous-class call
    /// arguments can close with `}});` and similar.
    pub fn add_nested(&mut self, header: impl Into<String>, footer: impl Into<String>) -> BlockRef {
        let body = block();
        self.items.push(BlockItem::Nested {
            header: header.into(),
            body: Rc::clone(&body),
            footer: footer.into(),
        });
        body
    }

    /// Appends a statement that renders after everything else, even
    /// statements added later. Used for mandatory trailing returns.
    pub fn add_tail(&mut self, stmt: impl Into<String>) {
        self.tails.push(stmt.into());
    }

    /// Returns true if nothing has been emitted into this block.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty() && self.items.is_empty() && self.tails.is_empty()
    }

    /// Renders the block contents at the given indent depth.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        let pad = "    ".repeat(depth);

        for decl in &self.decls {
            out.push_str(&pad);
            out.push_str(decl);
            if !decl.trim_end().ends_with(';') {
                out.push(';');
            }
            out.push('\n');
        }

        for item in &self.items {
            match item {
                BlockItem::Stmt(stmt) => {
                    out.push_str(&pad);
                    out.push_str(stmt);
                    out.push('\n');
                }
                BlockItem::Nested {
                    header,
                    body,
                    footer,
                } => {
                    out.push_str(&pad);
                    out.push_str(header);
                    out.push_str(" {\n");
                    out.push_str(&body.borrow().render(depth + 1));
                    // An empty footer means the next item supplies the close,
                    // as in try/catch chains.
                    if !footer.is_empty() {
                        out.push_str(&pad);
                        out.push_str(footer);
                        out.push('\n');
                    }
                }
            }
        }

        for tail in &self.tails {
            out.push_str(&pad);
            out.push_str(tail);
            out.push('\n');
        }

        out
    }
}

/// Renders one generated compilation unit.
#[derive(Debug)]
pub struct JavaWriter {
    package: String,
    imports: Vec<String>,
    class_name: String,
    extends: Option<String>,
    members: Vec<String>,
    methods: Vec<(String, BlockRef)>,
}

impl JavaWriter {
    /// Starts a compilation unit for `package.class_name`.
    pub fn new(package: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            imports: Vec::new(),
            class_name: class_name.into(),
            extends: None,
            members: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declares the superclass.
    pub fn extends(&mut self, superclass: impl Into<String>) {
        self.extends = Some(superclass.into());
    }

    /// Adds an import declaration, deduplicated.
    pub fn add_import(&mut self, fq: impl Into<String>) {
        let fq = fq.into();
        if !self.imports.contains(&fq) {
            self.imports.push(fq);
        }
    }

    /// Adds a field or other single-line member.
    pub fn add_member(&mut self, member: impl Into<String>) {
        self.members.push(member.into());
    }

    /// Adds a method with the given signature; returns the body block.
    pub fn add_method(&mut self, signature: impl Into<String>) -> BlockRef {
        let body = block();
        self.methods.push((signature.into(), Rc::clone(&body)));
        body
    }

    /// The simple class name being generated.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The fully qualified name of the generated class.
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.package, self.class_name)
        }
    }

    /// Renders the whole compilation unit.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.package.is_empty() {
            out.push_str(&format!("package {};\n\n", self.package));
        }

        for import in &self.imports {
            out.push_str(&format!("import {};\n", import));
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }

        match &self.extends {
            Some(superclass) => out.push_str(&format!(
                "public final class {} extends {} {{\n",
                self.class_name, superclass
            )),
            None => out.push_str(&format!("public final class {} {{\n", self.class_name)),
        }

        for member in &self.members {
            out.push_str("    ");
            out.push_str(member);
            if !member.trim_end().ends_with(';') {
                out.push(';');
            }
            out.push('\n');
        }
        if !self.members.is_empty() {
            out.push('\n');
        }

        for (signature, body) in &self.methods {
            out.push_str("    ");
            out.push_str(signature);
            out.push_str(" {\n");
            out.push_str(&body.borrow().render(2));
            out.push_str("    }\n\n");
        }

        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_renders_decls_first() {
        let mut block = CodeBlock::default();
        block.add_statement("doWork()");
        block.add_decl("int count = 0");

        assert_eq!(block.render(0), "int count = 0;\ndoWork();\n");
    }

    #[test]
    fn test_nested_block_with_footer() {
        let mut outer = CodeBlock::default();
        let inner = outer.add_nested("run(new Runnable() { public void run()", "}});");
        inner.borrow_mut().add_statement("step()");

        assert_eq!(
            outer.render(0),
            "run(new Runnable() { public void run() {\n    step();\n}});\n"
        );
    }

    #[test]
    fn test_shared_handle_appends_after_materialization() {
        let mut outer = CodeBlock::default();
        let inner = outer.add_nested("if (ready)", "}");
        inner.borrow_mut().add_statement("first()");

        let alias = Rc::clone(&inner);
        alias.borrow_mut().add_statement("second()");

        let rendered = outer.render(0);
        assert!(rendered.contains("first();\n    second();"));
    }

    #[test]
    fn test_writer_renders_unit() {
        let mut writer = JavaWriter::new("com.example", "MainActivity_");
        writer.extends("MainActivity");
        writer.add_import("java.util.List");
        let body = writer.add_method("public void show()");
        body.borrow_mut().add_statement("render()");

        let unit = writer.render();
        assert!(unit.starts_with("package com.example;\n"));
        assert!(unit.contains("import java.util.List;"));
        assert!(unit.contains("public final class MainActivity_ extends MainActivity {"));
        assert!(unit.contains("public void show() {\n        render();\n    }"));
        assert_eq!(writer.qualified_name(), "com.example.MainActivity_");
    }
}
