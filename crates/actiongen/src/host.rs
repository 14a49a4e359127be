//! Java source scanning and element extraction.
//!
//! Annotated sources are tokenized with logos and folded into an
//! [`ElementArena`]: the compilation unit's package and imports, each
//! top-level type with its annotations, and every field and method with
//! captured body text. Strings and comments are single tokens, so brace
//! matching over the token stream is literal-safe.

use action_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use action_model::{
    ActionInfo, ActionMethodParam, ActionRegistry, Annotation, CompilationUnitImports, Element,
    ElementArena, ElementId, ElementKind, TypeRef,
};
use indexmap::IndexMap;
use logos::Logos;
use smol_str::SmolStr;
use source_span::Span;

/// Token kinds for the Java subset the generator inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Default)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum TokenKind {
    /// `package`
    #[token("package")]
    Package,

    /// `import`
    #[token("import")]
    Import,

    /// `static`
    #[token("static")]
    Static,

    /// `class`
    #[token("class")]
    Class,

    /// `interface`
    #[token("interface")]
    Interface,

    /// `extends`
    #[token("extends")]
    Extends,

    /// `implements`
    #[token("implements")]
    Implements,

    /// `@`
    #[token("@")]
    At,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    /// `;`
    #[token(";")]
    Semi,

    /// `,`
    #[token(",")]
    Comma,

    /// `.`
    #[token(".")]
    Dot,

    /// `=`
    #[token("=")]
    Assign,

    /// `<`
    #[token("<")]
    Lt,

    /// `>`
    #[token(">")]
    Gt,

    /// `*`
    #[token("*")]
    Star,

    /// A string literal, kept as one token so braces inside never count.
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    /// A character literal.
    #[regex(r"'([^'\\]|\\.)'")]
    CharLit,

    /// An identifier or keyword the parser treats textually.
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    /// A numeric literal.
    #[regex(r"[0-9][0-9_\.xXa-fA-F]*[lLfFdD]?")]
    Number,

    /// Any other single operator character.
    #[regex(r"[^ \t\r\n\fA-Za-z0-9_$]", priority = 1)]
    Punct,

    /// Invalid/unknown token.
    #[default]
    Error,
}

/// One parsed compilation unit.
#[derive(Debug, Default)]
pub struct SourceUnit {
    /// Declared package, empty for the default package.
    pub package: String,
    /// Import table, static aliases included.
    pub imports: CompilationUnitImports,
    /// All elements of the unit.
    pub arena: ElementArena,
    /// Top-level type elements in declaration order.
    pub types: Vec<ElementId>,
    /// Captured method body text, keyed by method element.
    pub bodies: IndexMap<ElementId, String>,
}

impl SourceUnit {
    /// Collects `@Define` entries attached to the unit's types.
    pub fn define_entries(&self) -> Vec<(String, Span)> {
        let mut entries = Vec::new();
        for id in &self.types {
            let Some(element) = self.arena.get(*id) else {
                continue;
            };
            for annotation in &element.annotations {
                if annotation.name == "Define" {
                    for (_, value) in &annotation.args {
                        entries.push((value.clone(), annotation.span));
                    }
                }
            }
        }
        entries
    }
}

/// Parses one Java source file into a [`SourceUnit`].
pub fn parse_unit(source: &str, sink: &mut DiagnosticSink) -> SourceUnit {
    Parser::new(source, sink).parse()
}

/// Registers every `@ActionFor` holder of the unit into the registry.
pub fn register_actions(unit: &SourceUnit, registry: &mut ActionRegistry) {
    for id in &unit.types {
        let Some(element) = unit.arena.get(*id) else {
            continue;
        };
        let Some(annotation) = element.annotations.iter().find(|a| a.name == "ActionFor") else {
            continue;
        };
        let Some(action_name) = annotation.value() else {
            continue;
        };

        let mut info = ActionInfo::new(
            element.qualified_name.clone(),
            annotation.bool_arg("global", false),
            element.span,
        );

        for method in unit
            .arena
            .children(*id)
            .filter(|m| m.kind == ElementKind::Method)
        {
            let params: Vec<ActionMethodParam> = unit
                .arena
                .children(method.id)
                .filter(|p| p.kind == ElementKind::Parameter)
                .map(|p| {
                    ActionMethodParam::new(
                        p.name.clone(),
                        TypeRef::new(unit.imports.resolve(p.ty.as_str())),
                    )
                })
                .collect();

            let result = TypeRef::new(unit.imports.resolve(method.ty.as_str()));
            // Constructors and malformed members are skipped, not fatal.
            let _ = info.add_method(
                method.name.clone(),
                result,
                params,
                method.annotations.clone(),
                None,
            );
        }

        registry.register(SmolStr::new(action_name), info);
    }
}

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "default",
];

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(TokenKind, std::ops::Range<usize>)>,
    pos: usize,
    sink: &'s mut DiagnosticSink,
    unit: SourceUnit,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, sink: &'s mut DiagnosticSink) -> Self {
        let mut tokens = Vec::new();
        let mut lexer = TokenKind::lexer(source);
        while let Some(result) = lexer.next() {
            let kind = result.unwrap_or(TokenKind::Error);
            tokens.push((kind, lexer.span()));
        }
        Self {
            source,
            tokens,
            pos: 0,
            sink,
            unit: SourceUnit::default(),
        }
    }

    fn peek(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|(kind, _)| *kind)
            .unwrap_or(TokenKind::Error)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn text(&self) -> &'s str {
        self.tokens
            .get(self.pos)
            .map(|(_, range)| &self.source[range.clone()])
            .unwrap_or("")
    }

    fn token_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, range)) => Span::new(range.start as u32, range.end as u32),
            None => Span::empty(self.source.len() as u32),
        }
    }

    fn report_parse_error(&mut self, message: impl Into<String>) {
        let span = self.token_span();
        self.sink
            .report(Diagnostic::new(DiagnosticCode::ParseError, message, span));
    }

    fn parse(mut self) -> SourceUnit {
        if self.eat(TokenKind::Package) {
            self.unit.package = self.qualified_name();
            self.eat(TokenKind::Semi);
        }

        while self.eat(TokenKind::Import) {
            let is_static = self.eat(TokenKind::Static);
            let name = self.qualified_name();
            self.eat(TokenKind::Semi);
            if name.ends_with(".*") || name.is_empty() {
                continue;
            }
            if is_static {
                let alias = name.rsplit('.').next().unwrap_or(&name).to_string();
                self.unit.imports.register_static_alias(alias, name);
            } else {
                self.unit.imports.add_import(name);
            }
        }

        while !self.at_end() {
            let annotations = self.parse_annotations();
            let modifiers = self.parse_modifiers();
            match self.peek() {
                TokenKind::Class | TokenKind::Interface => {
                    self.parse_type(annotations, modifiers, None);
                }
                _ => {
                    if !self.at_end() {
                        self.bump();
                    }
                }
            }
        }

        self.unit
    }

    /// `a.b.C` or `a.b.*`, joined without intervening trivia.
    fn qualified_name(&mut self) -> String {
        let mut name = String::new();
        if self.peek() != TokenKind::Ident {
            return name;
        }
        name.push_str(self.text());
        self.bump();

        while self.peek() == TokenKind::Dot {
            let next = self
                .tokens
                .get(self.pos + 1)
                .map(|(kind, _)| *kind)
                .unwrap_or(TokenKind::Error);
            if next != TokenKind::Ident && next != TokenKind::Star {
                break;
            }
            self.bump();
            name.push('.');
            name.push_str(self.text());
            self.bump();
        }
        name
    }

    fn parse_modifiers(&mut self) -> Vec<SmolStr> {
        let mut modifiers = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Static => {
                    modifiers.push(SmolStr::new("static"));
                    self.bump();
                }
                TokenKind::Ident if MODIFIERS.contains(&self.text()) => {
                    modifiers.push(SmolStr::new(self.text()));
                    self.bump();
                }
                _ => break,
            }
        }
        modifiers
    }

    fn parse_annotations(&mut self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        while self.peek() == TokenKind::At {
            let start = self.token_span();
            self.bump();
            if self.peek() != TokenKind::Ident {
                self.report_parse_error("expected annotation name after `@`");
                break;
            }
            let name = self.qualified_name();
            let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
            let mut annotation = Annotation::marker(simple, start);

            if self.eat(TokenKind::LParen) {
                self.parse_annotation_args(&mut annotation);
            }
            annotation.span = start.cover(self.previous_span());
            annotations.push(annotation);
        }
        annotations
    }

    fn previous_span(&self) -> Span {
        match self.tokens.get(self.pos.saturating_sub(1)) {
            Some((_, range)) => Span::new(range.start as u32, range.end as u32),
            None => Span::empty(0u32),
        }
    }

    fn parse_annotation_args(&mut self, annotation: &mut Annotation) {
        while !self.at_end() && self.peek() != TokenKind::RParen {
            // `key = value` or a positional value stored under `value`.
            let key = if self.peek() == TokenKind::Ident
                && self
                    .tokens
                    .get(self.pos + 1)
                    .map(|(kind, _)| *kind == TokenKind::Assign)
                    .unwrap_or(false)
            {
                let key = SmolStr::new(self.text());
                self.bump();
                self.bump();
                key
            } else {
                SmolStr::new("value")
            };

            if self.eat(TokenKind::LBrace) {
                // Array initializer, one argument entry per element.
                while !self.at_end() && self.peek() != TokenKind::RBrace {
                    if let Some(value) = self.annotation_value() {
                        annotation.args.push((key.clone(), value));
                    } else {
                        self.bump();
                    }
                    self.eat(TokenKind::Comma);
                }
                self.eat(TokenKind::RBrace);
            } else if let Some(value) = self.annotation_value() {
                annotation.args.push((key, value));
            } else {
                self.bump();
            }

            self.eat(TokenKind::Comma);
        }
        self.eat(TokenKind::RParen);
    }

    fn annotation_value(&mut self) -> Option<String> {
        match self.peek() {
            TokenKind::Str => {
                let value = unquote(self.text());
                self.bump();
                Some(value)
            }
            TokenKind::Number | TokenKind::CharLit => {
                let value = self.text().to_string();
                self.bump();
                Some(value)
            }
            TokenKind::Ident => Some(self.qualified_name()),
            _ => None,
        }
    }

    fn parse_type(
        &mut self,
        annotations: Vec<Annotation>,
        modifiers: Vec<SmolStr>,
        enclosing: Option<ElementId>,
    ) {
        let kind = if self.peek() == TokenKind::Interface {
            ElementKind::Interface
        } else {
            ElementKind::Class
        };
        let decl_span = self.token_span();
        self.bump();

        if self.peek() != TokenKind::Ident {
            self.report_parse_error("expected type name");
            return;
        }
        let name = SmolStr::new(self.text());
        self.bump();
        self.skip_generics();

        if self.eat(TokenKind::Extends) {
            self.qualified_name();
            self.skip_generics();
        }
        if self.eat(TokenKind::Implements) {
            loop {
                self.qualified_name();
                self.skip_generics();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.eat(TokenKind::LBrace) {
            self.report_parse_error(format!("expected `{{` after type `{}`", name));
            return;
        }

        let qualified_name = if self.unit.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.unit.package, name)
        };

        let id = self.unit.arena.alloc(Element {
            id: 0,
            kind,
            name: name.clone(),
            qualified_name,
            ty: TypeRef::new(name.as_str()),
            annotations,
            enclosing,
            modifiers,
            span: decl_span,
        });
        if enclosing.is_none() {
            self.unit.types.push(id);
        }

        self.parse_members(id);
    }

    fn parse_members(&mut self, class_id: ElementId) {
        while !self.at_end() && self.peek() != TokenKind::RBrace {
            let annotations = self.parse_annotations();
            let modifiers = self.parse_modifiers();

            match self.peek() {
                TokenKind::Class | TokenKind::Interface => {
                    self.parse_type(annotations, modifiers, Some(class_id));
                }
                TokenKind::Ident => {
                    self.parse_member(class_id, annotations, modifiers);
                }
                // Static and instance initializer blocks are not modeled.
                TokenKind::LBrace => {
                    self.capture_braced_body();
                }
                TokenKind::Semi => self.bump(),
                _ => self.bump(),
            }
        }
        self.eat(TokenKind::RBrace);
    }

    fn parse_member(
        &mut self,
        class_id: ElementId,
        annotations: Vec<Annotation>,
        modifiers: Vec<SmolStr>,
    ) {
        let decl_span = self.token_span();
        let ty_text = self.parse_type_ref();

        // Constructor: the "type" is directly followed by `(`.
        if self.peek() == TokenKind::LParen {
            let name = SmolStr::new(ty_text.rsplit('.').next().unwrap_or(&ty_text));
            self.finish_method(
                class_id,
                name,
                TypeRef::new("void"),
                annotations,
                modifiers,
                decl_span,
            );
            return;
        }

        if self.peek() != TokenKind::Ident {
            // Not a declaration we model; recover at the next boundary.
            self.skip_to_member_boundary();
            return;
        }
        let name = SmolStr::new(self.text());
        self.bump();

        if self.peek() == TokenKind::LParen {
            self.finish_method(
                class_id,
                name,
                TypeRef::new(ty_text),
                annotations,
                modifiers,
                decl_span,
            );
        } else {
            // Field, initializer skipped.
            self.skip_to_member_boundary();
            self.unit.arena.alloc(Element {
                id: 0,
                kind: ElementKind::Field,
                name,
                qualified_name: String::new(),
                ty: TypeRef::new(ty_text),
                annotations,
                enclosing: Some(class_id),
                modifiers,
                span: decl_span,
            });
        }
    }

    fn finish_method(
        &mut self,
        class_id: ElementId,
        name: SmolStr,
        result: TypeRef,
        annotations: Vec<Annotation>,
        modifiers: Vec<SmolStr>,
        decl_span: Span,
    ) {
        let params = self.parse_params();

        // throws clause
        if self.peek() == TokenKind::Ident && self.text() == "throws" {
            self.bump();
            loop {
                self.qualified_name();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let method_id = self.unit.arena.alloc(Element {
            id: 0,
            kind: ElementKind::Method,
            name,
            qualified_name: String::new(),
            ty: result,
            annotations,
            enclosing: Some(class_id),
            modifiers,
            span: decl_span,
        });

        for (ty, name, annotations) in params {
            self.unit.arena.alloc(Element {
                id: 0,
                kind: ElementKind::Parameter,
                name,
                qualified_name: String::new(),
                ty,
                annotations,
                enclosing: Some(method_id),
                modifiers: Vec::new(),
                span: decl_span,
            });
        }

        if self.peek() == TokenKind::LBrace {
            let body = self.capture_braced_body();
            self.unit.bodies.insert(method_id, body);
        } else {
            self.eat(TokenKind::Semi);
        }
    }

    fn parse_params(&mut self) -> Vec<(TypeRef, SmolStr, Vec<Annotation>)> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::LParen) {
            return params;
        }
        while !self.at_end() && self.peek() != TokenKind::RParen {
            let annotations = self.parse_annotations();
            if self.peek() == TokenKind::Ident && self.text() == "final" {
                self.bump();
            }
            let ty = self.parse_type_ref();
            if self.peek() == TokenKind::Ident {
                let name = SmolStr::new(self.text());
                self.bump();
                params.push((TypeRef::new(ty), name, annotations));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::RParen);
        params
    }

    /// `a.b.C<...>[][]` collapsed to raw text with generics dropped.
    fn parse_type_ref(&mut self) -> String {
        let mut ty = self.qualified_name();
        self.skip_generics();
        while self.peek() == TokenKind::LBracket {
            self.bump();
            if self.eat(TokenKind::RBracket) {
                ty.push_str("[]");
            }
        }
        ty
    }

    fn skip_generics(&mut self) {
        if self.peek() != TokenKind::Lt {
            return;
        }
        let mut depth = 0usize;
        while !self.at_end() {
            match self.peek() {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Captures the source text between the current `{` and its match.
    fn capture_braced_body(&mut self) -> String {
        debug_assert_eq!(self.peek(), TokenKind::LBrace);
        let open = self.tokens[self.pos].1.clone();
        self.bump();
        let mut depth = 1usize;
        let mut close = open.end;

        while !self.at_end() {
            match self.peek() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        close = self.tokens[self.pos].1.start;
                        self.bump();
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }

        self.source[open.end..close].to_string()
    }

    /// Skips a field initializer or unmodeled member, brace and paren aware.
    fn skip_to_member_boundary(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.peek() {
                TokenKind::LBrace | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RParen => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semi if depth == 0 => {
                    self.bump();
                    return;
                }
                _ => {}
            }
            self.bump();
        }
    }
}

fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (SourceUnit, Vec<Diagnostic>) {
        let mut sink = DiagnosticSink::new();
        let unit = parse_unit(source, &mut sink);
        (unit, sink.into_diagnostics())
    }

    const HOLDER: &str = r#"
        package com.example.actions;

        import com.actiongen.api.ActionFor;
        import java.lang.Runnable;
        import static com.example.Util.format;

        @ActionFor(value = "Toast", global = true)
        public class ToastHolder {
            private String title;

            public ToastHolder init(String title) {
                this.title = title;
                return this;
            }

            public ToastHolder init(String title, int duration) {
                this.title = title;
                return this;
            }

            void build(Runnable Done, Runnable Failed) {
            }

            void execute() {
                show(title);
            }
        }
    "#;

    #[test]
    fn test_package_and_imports() {
        let (unit, diags) = parse(HOLDER);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.package, "com.example.actions");
        assert_eq!(
            unit.imports.resolve("ActionFor"),
            "com.actiongen.api.ActionFor"
        );
        assert_eq!(
            unit.imports.static_aliases().collect::<Vec<_>>(),
            vec![("format", "com.example.Util.format")]
        );
    }

    #[test]
    fn test_type_annotations_and_members() {
        let (unit, _) = parse(HOLDER);
        assert_eq!(unit.types.len(), 1);
        let class = unit.arena.get(unit.types[0]).unwrap();
        assert_eq!(class.name, "ToastHolder");
        assert_eq!(class.qualified_name, "com.example.actions.ToastHolder");

        let action_for = class.annotations.iter().find(|a| a.name == "ActionFor").unwrap();
        assert_eq!(action_for.value(), Some("Toast"));
        assert!(action_for.bool_arg("global", false));

        let methods: Vec<&str> = unit
            .arena
            .children(class.id)
            .filter(|m| m.kind == ElementKind::Method)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(methods, vec!["init", "init", "build", "execute"]);
    }

    #[test]
    fn test_method_body_capture_is_literal_safe() {
        let (unit, _) = parse(
            r#"
            package p;
            class A {
                void run() {
                    log("closing } brace");
                }
            }
            "#,
        );
        let body = unit.bodies.values().next().unwrap();
        assert!(body.contains(r#"log("closing } brace");"#));
    }

    #[test]
    fn test_register_actions_builds_overload_groups() {
        let (unit, _) = parse(HOLDER);
        let mut registry = ActionRegistry::new("_");
        register_actions(&unit, &mut registry);

        let info = registry.get("Toast").unwrap();
        assert_eq!(info.holder, "com.example.actions.ToastHolder");
        assert!(info.global);
        assert_eq!(info.overloads("init").len(), 2);
        assert_eq!(info.overloads("init")[1].params.len(), 2);
        assert_eq!(info.overloads("build")[0].params[0].name, "Done");
        assert_eq!(
            info.overloads("build")[0].params[0].ty.as_str(),
            "java.lang.Runnable"
        );
    }

    #[test]
    fn test_define_entries_from_array() {
        let (unit, _) = parse(
            r#"
            package p;
            @Define({"appName=Demo", "$version=\\d+"})
            class Config {}
            "#,
        );
        let entries: Vec<String> = unit
            .define_entries()
            .into_iter()
            .map(|(value, _)| value)
            .collect();
        assert_eq!(entries, vec!["appName=Demo", "$version=\\d+"]);
    }

    #[test]
    fn test_field_extraction_with_annotation() {
        let (unit, _) = parse(
            r#"
            package p;
            class MainActivity {
                @Model(async = true, query = "id = {id}")
                User user;

                @Click("saveButton")
                void onSave() { save(); }
            }
            "#,
        );
        let class = unit.arena.get(unit.types[0]).unwrap();
        let field = unit
            .arena
            .children(class.id)
            .find(|e| e.kind == ElementKind::Field)
            .unwrap();
        assert_eq!(field.name, "user");
        assert_eq!(field.ty.as_str(), "User");
        let model = field.annotations.iter().find(|a| a.name == "Model").unwrap();
        assert_eq!(model.arg("async"), Some("true"));
        assert_eq!(model.arg("query"), Some("id = {id}"));

        let method = unit
            .arena
            .children(class.id)
            .find(|e| e.kind == ElementKind::Method)
            .unwrap();
        let click = method.annotations.iter().find(|a| a.name == "Click").unwrap();
        assert_eq!(click.value(), Some("saveButton"));
    }

    #[test]
    fn test_generics_and_arrays_in_types() {
        let (unit, _) = parse(
            r#"
            package p;
            class A {
                java.util.List<String> names;
                int[] counts;
            }
            "#,
        );
        let class = unit.arena.get(unit.types[0]).unwrap();
        let fields: Vec<(&str, &str)> = unit
            .arena
            .children(class.id)
            .map(|f| (f.name.as_str(), f.ty.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![("names", "java.util.List"), ("counts", "int[]")]
        );
    }
}
