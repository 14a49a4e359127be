//! Call-site synthesis for `$Name(...)` action invocations.
//!
//! A method body is split into statements, action calls are expanded into
//! construct/init/build/execute sequences, and `if ($Name.Selector)` blocks
//! that follow a call become the bodies of generated continuation objects.

use action_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use action_model::{ActionMethod, ActionRegistry, CompilationUnitImports, ElementId};
use source_span::Span;
use thiserror::Error;

use crate::emit::BlockRef;
use crate::rewriter::{rewrite, split_top_level_args, RewriteContext};

/// Runtime dispatcher for `$Background` statements.
pub const BACKGROUND_EXECUTOR: &str = "com.actiongen.api.BackgroundExecutor";
/// Runtime dispatcher for `$UIThread` statements.
pub const UI_THREAD_EXECUTOR: &str = "com.actiongen.api.UIThreadExecutor";

/// Structural failures that abort synthesis for the current element.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The body invokes an action on `super`; the caller must emit a plain
    /// delegating override instead of an expanded call site.
    #[error("action call targets super, element {element} must delegate")]
    ActionCallSuper {
        /// The element whose body contained the call.
        element: ElementId,
    },
}

/// Thread the statements of a block are dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Emit statements inline.
    #[default]
    Default,
    /// Wrap statements in a background-executor runnable.
    Background,
    /// Wrap statements in a UI-thread runnable.
    UiThread,
}

/// Everything synthesis needs while walking one method body.
#[derive(Debug)]
pub struct BuildContext<'a> {
    /// Registered action holders.
    pub registry: &'a ActionRegistry,
    /// The method element whose body is being processed.
    pub element: ElementId,
    /// Simple name of the generated subclass.
    pub generated_class: &'a str,
    /// Simple name of the annotated class.
    pub annotated_class: &'a str,
    /// Import table of the compilation unit.
    pub imports: &'a mut CompilationUnitImports,
    /// Sink for validation diagnostics.
    pub sink: &'a mut DiagnosticSink,
    /// Source location of the method body.
    pub span: Span,
    counter: u32,
}

impl<'a> BuildContext<'a> {
    /// Creates a context for one method body.
    pub fn new(
        registry: &'a ActionRegistry,
        element: ElementId,
        generated_class: &'a str,
        annotated_class: &'a str,
        imports: &'a mut CompilationUnitImports,
        sink: &'a mut DiagnosticSink,
        span: Span,
    ) -> Self {
        Self {
            registry,
            element,
            generated_class,
            annotated_class,
            imports,
            sink,
            span,
            counter: 0,
        }
    }

    fn next_index(&mut self) -> u32 {
        let idx = self.counter;
        self.counter += 1;
        idx
    }

    fn rewrite(&mut self, text: &str, selector: Option<&str>) -> String {
        let mut rctx = RewriteContext {
            generated_class: self.generated_class,
            annotated_class: self.annotated_class,
            selector,
            imports: &mut *self.imports,
        };
        rewrite(text, &mut rctx, self.span, &mut *self.sink)
    }

    fn report(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.sink.report(Diagnostic::new(code, message, self.span));
    }
}

/// One statement of a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stmt {
    /// A `;`-terminated statement, terminator stripped.
    Line(String),
    /// A statement with a braced body, braces stripped.
    Braced { header: String, body: String },
}

/// Splits body text into statements at top-level `;` and `{...}` boundaries.
fn split_statements(text: &str) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut header = None;

    for ch in text.chars() {
        if in_string {
            buf.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                buf.push(ch);
                in_string = true;
            }
            ';' if depth == 0 => {
                let line = buf.trim();
                if !line.is_empty() {
                    stmts.push(Stmt::Line(line.to_string()));
                }
                buf.clear();
            }
            '{' => {
                if depth == 0 {
                    header = Some(std::mem::take(&mut buf));
                } else {
                    buf.push(ch);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(h) = header.take() {
                        stmts.push(Stmt::Braced {
                            header: h.trim().to_string(),
                            body: std::mem::take(&mut buf),
                        });
                    }
                } else {
                    buf.push(ch);
                }
            }
            _ => buf.push(ch),
        }
    }

    let line = buf.trim();
    if !line.is_empty() {
        stmts.push(Stmt::Line(line.to_string()));
    }
    stmts
}

/// A parsed `$Name(args)` invocation.
#[derive(Debug)]
struct ActionCall<'t> {
    name: &'t str,
    args: &'t str,
    on_super: bool,
}

fn parse_action_call(line: &str) -> Option<ActionCall<'_>> {
    let line = line.trim();
    let (on_super, rest) = match line.strip_prefix("super.") {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let rest = rest.strip_prefix('$')?;

    let name_len = rest
        .char_indices()
        .take_while(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
        .map(|(idx, ch)| idx + ch.len_utf8())
        .last()?;
    let name = &rest[..name_len];
    if !name.chars().next().is_some_and(|ch| ch.is_ascii_uppercase()) {
        return None;
    }

    let rest = rest[name_len..].strip_prefix('(')?;
    let args = rest.strip_suffix(')')?;
    Some(ActionCall {
        name,
        args,
        on_super,
    })
}

/// Parses an `if ($Name.Selector)` continuation header.
fn parse_branch_header(header: &str) -> Option<(&str, &str)> {
    let rest = header.trim().strip_prefix("if")?.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.strip_suffix(')')?;
    let rest = rest.trim().strip_prefix('$')?;
    let (name, selector) = rest.split_once('.')?;
    let valid = |s: &str| {
        !s.is_empty() && s.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    };
    (valid(name) && valid(selector)).then_some((name, selector))
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Classifies a literal argument for overload matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Expr,
}

fn classify_arg(arg: &str) -> ArgKind {
    let arg = arg.trim();
    if arg.starts_with('"') {
        ArgKind::Str
    } else if arg == "true" || arg == "false" {
        ArgKind::Bool
    } else if arg == "null" {
        ArgKind::Null
    } else if arg.chars().all(|ch| ch.is_ascii_digit() || ch == '-') && !arg.is_empty() {
        ArgKind::Int
    } else if arg.parse::<f64>().is_ok() {
        ArgKind::Float
    } else {
        ArgKind::Expr
    }
}

fn is_primitive(ty: &str) -> bool {
    matches!(
        ty,
        "boolean" | "byte" | "short" | "int" | "long" | "float" | "double" | "char"
    )
}

fn arg_compatible(kind: ArgKind, param_ty: &str) -> bool {
    let ty = param_ty.rsplit('.').next().unwrap_or(param_ty);
    match kind {
        ArgKind::Expr => true,
        ArgKind::Null => !is_primitive(ty),
        ArgKind::Str => matches!(ty, "String" | "CharSequence" | "Object"),
        ArgKind::Bool => matches!(ty, "boolean" | "Boolean" | "Object"),
        ArgKind::Int => matches!(
            ty,
            "int" | "long" | "short" | "byte" | "float" | "double" | "Integer" | "Long"
                | "Short" | "Byte" | "Float" | "Double" | "Number" | "Object"
        ),
        ArgKind::Float => matches!(
            ty,
            "float" | "double" | "Float" | "Double" | "Number" | "Object"
        ),
    }
}

/// Picks the first declared overload compatible with the given arguments.
fn match_overload<'m>(overloads: &'m [ActionMethod], args: &[&str]) -> Option<&'m ActionMethod> {
    overloads.iter().find(|method| {
        method.params.len() == args.len()
            && method
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| arg_compatible(classify_arg(arg), param.ty.as_str()))
    })
}

/// Processes a method body into `block`, expanding action calls.
pub fn process_block(
    text: &str,
    block: &BlockRef,
    ctx: &mut BuildContext<'_>,
) -> Result<(), SynthesisError> {
    process_into(
        text,
        block,
        ctx,
        DispatchMode::Default,
        DispatchMode::Default,
        None,
    )
}

/// `ambient` is the mode the statements of `block` already run on.
/// Requesting the same mode emits inline; only a genuine switch opens a
/// dispatch wrapper, so a nested block never re-dispatches onto the
/// executor it is already inside.
fn dispatch_target(
    block: &BlockRef,
    mode: DispatchMode,
    ambient: DispatchMode,
    wrapper: &mut Option<(DispatchMode, BlockRef)>,
    ctx: &mut BuildContext<'_>,
) -> BlockRef {
    if mode == ambient || mode == DispatchMode::Default {
        return block.clone();
    }
    if let Some((open_mode, open)) = wrapper {
        if *open_mode == mode {
            return open.clone();
        }
    }
    let header = match mode {
        DispatchMode::Background => {
            ctx.imports.ensure_import(BACKGROUND_EXECUTOR);
            "BackgroundExecutor.execute(new Runnable() { public void run()"
        }
        _ => {
            ctx.imports.ensure_import(UI_THREAD_EXECUTOR);
            "UIThreadExecutor.post(new Runnable() { public void run()"
        }
    };
    let body = block.borrow_mut().add_nested(header, "}});");
    *wrapper = Some((mode, body.clone()));
    body
}

fn process_into(
    text: &str,
    block: &BlockRef,
    ctx: &mut BuildContext<'_>,
    inherited: DispatchMode,
    ambient: DispatchMode,
    selector: Option<&str>,
) -> Result<(), SynthesisError> {
    let stmts = split_statements(text);
    let mut iter = stmts.into_iter().peekable();
    let mut mode = inherited;
    let mut wrapper: Option<(DispatchMode, BlockRef)> = None;

    while let Some(stmt) = iter.next() {
        match stmt {
            Stmt::Line(line) => {
                match line.trim().trim_end_matches("()") {
                    "$Background" => {
                        mode = DispatchMode::Background;
                        continue;
                    }
                    "$UIThread" => {
                        mode = DispatchMode::UiThread;
                        continue;
                    }
                    _ => {}
                }

                if let Some(call) = parse_action_call(&line) {
                    if call.on_super {
                        return Err(SynthesisError::ActionCallSuper {
                            element: ctx.element,
                        });
                    }
                    if ctx.registry.contains(call.name) {
                        // Consume the continuation branches written after the
                        // call before emitting anything.
                        let mut branches = Vec::new();
                        while let Some(Stmt::Braced { header, .. }) = iter.peek() {
                            match parse_branch_header(header) {
                                Some((name, _)) if name == call.name => {}
                                _ => break,
                            }
                            if let Some(Stmt::Braced { header, body }) = iter.next() {
                                if let Some((_, sel)) = parse_branch_header(&header) {
                                    branches.push((sel.to_string(), body));
                                }
                            }
                        }
                        let target = dispatch_target(block, mode, ambient, &mut wrapper, ctx);
                        emit_action_call(&call, branches, &target, ctx)?;
                        continue;
                    }
                    ctx.report(
                        DiagnosticCode::UnknownAction,
                        format!("no action named `${}` is registered", call.name),
                    );
                    continue;
                }

                let target = dispatch_target(block, mode, ambient, &mut wrapper, ctx);
                let rewritten = ctx.rewrite(&line, selector);
                target.borrow_mut().add_statement(rewritten);
            }
            Stmt::Braced { header, body } => {
                let target = dispatch_target(block, mode, ambient, &mut wrapper, ctx);
                let rewritten = ctx.rewrite(&header, selector);
                let nested = target.borrow_mut().add_nested(rewritten, "}");
                // The nested block's statements already run on `mode`.
                process_into(&body, &nested, ctx, mode, mode, selector)?;
            }
        }
    }

    Ok(())
}

/// Emits construct, init, build and execute for one action call.
fn emit_action_call(
    call: &ActionCall<'_>,
    branches: Vec<(String, String)>,
    target: &BlockRef,
    ctx: &mut BuildContext<'_>,
) -> Result<(), SynthesisError> {
    let Some(info) = ctx.registry.get(call.name) else {
        return Ok(());
    };

    let idx = ctx.next_index();
    let var = format!("{}Action{}", lower_first(call.name), idx);

    let holder_simple = match info.holder.rsplit_once('.') {
        Some((_, simple)) => {
            let simple = simple.to_string();
            ctx.imports.ensure_import(info.holder.clone());
            simple
        }
        None => info.holder.clone(),
    };

    target.borrow_mut().add_statement(format!(
        "final {holder_simple} {var} = new {holder_simple}()"
    ));

    // init
    let args: Vec<&str> = if call.args.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level_args(call.args)
    };
    let init_overloads = info.overloads("init");
    if !init_overloads.is_empty() || !args.is_empty() {
        match match_overload(init_overloads, &args) {
            Some(_) => {
                let rewritten = ctx.rewrite(call.args, None);
                target
                    .borrow_mut()
                    .add_statement(format!("{var}.init({rewritten})"));
            }
            None => {
                ctx.report(
                    DiagnosticCode::NoMatchingOverload,
                    format!(
                        "no init overload of `${}` accepts {} argument(s)",
                        call.name,
                        args.len()
                    ),
                );
            }
        }
    }

    // build, one continuation object per declared callback parameter
    let build = info.overloads("build").first().cloned();
    let mut unmatched: Vec<&str> = branches.iter().map(|(sel, _)| sel.as_str()).collect();
    if let Some(build) = build {
        let mut cont_args = Vec::with_capacity(build.params.len());
        for param in &build.params {
            let sel = param.name.trim_start_matches('$');
            let branch = branches.iter().find(|(name, _)| name == sel);
            match branch {
                Some((sel_name, body)) => {
                    unmatched.retain(|s| s != sel_name);
                    let cont_var = format!("{}{}{}", lower_first(call.name), sel_name, idx);
                    let cont_ty = param.ty.simple_name().to_string();
                    let header = format!(
                        "final {cont_ty} {cont_var} = new {cont_ty}() {{ public void run()"
                    );
                    let cont_body = target.borrow_mut().add_nested(header, "}};");
                    let strip = format!("${}.{}", call.name, sel_name);
                    process_into(
                        body,
                        &cont_body,
                        ctx,
                        DispatchMode::Default,
                        DispatchMode::Default,
                        Some(&strip),
                    )?;
                    cont_args.push(cont_var);
                }
                None => cont_args.push("null".to_string()),
            }
        }
        target
            .borrow_mut()
            .add_statement(format!("{var}.build({})", cont_args.join(", ")));
    }

    for sel in unmatched {
        ctx.report(
            DiagnosticCode::NoMatchingOverload,
            format!("`${}` declares no `{}` callback", call.name, sel),
        );
    }

    target.borrow_mut().add_statement(format!("{var}.execute()"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit;
    use action_model::{ActionInfo, ActionMethodParam, TypeRef};
    use pretty_assertions::assert_eq;

    fn toast_registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new("_");
        let mut info = ActionInfo::new("com.example.actions.ToastHolder", true, Span::default());
        info.add_method(
            "init",
            TypeRef::new("ToastHolder"),
            vec![ActionMethodParam::new("title", TypeRef::new("String"))],
            Vec::new(),
            None,
        )
        .unwrap();
        info.add_method(
            "init",
            TypeRef::new("ToastHolder"),
            vec![
                ActionMethodParam::new("title", TypeRef::new("String")),
                ActionMethodParam::new("duration", TypeRef::new("int")),
            ],
            Vec::new(),
            None,
        )
        .unwrap();
        info.add_method(
            "build",
            TypeRef::new("void"),
            vec![
                ActionMethodParam::new("Done", TypeRef::new("Runnable")),
                ActionMethodParam::new("Failed", TypeRef::new("Runnable")),
            ],
            Vec::new(),
            None,
        )
        .unwrap();
        info.add_method("execute", TypeRef::new("void"), Vec::new(), Vec::new(), None)
            .unwrap();
        registry.register("Toast", info);
        registry
    }

    fn synthesize(registry: &ActionRegistry, body: &str) -> (String, Vec<Diagnostic>) {
        let mut imports = CompilationUnitImports::default();
        let mut sink = DiagnosticSink::new();
        let mut ctx = BuildContext::new(
            registry,
            0,
            "MainActivity_",
            "MainActivity",
            &mut imports,
            &mut sink,
            Span::default(),
        );
        let block = emit::block();
        process_block(body, &block, &mut ctx).unwrap();
        let rendered = block.borrow().render(0);
        (rendered, sink.into_diagnostics())
    }

    #[test]
    fn test_split_statements_mixes_lines_and_blocks() {
        let stmts = split_statements("a(); if (x) { b(); } c();");
        assert_eq!(
            stmts,
            vec![
                Stmt::Line("a()".into()),
                Stmt::Braced {
                    header: "if (x)".into(),
                    body: " b(); ".into(),
                },
                Stmt::Line("c()".into()),
            ]
        );
    }

    #[test]
    fn test_split_statements_ignores_literal_braces() {
        let stmts = split_statements(r#"log("a; {b}");"#);
        assert_eq!(stmts, vec![Stmt::Line(r#"log("a; {b}")"#.into())]);
    }

    #[test]
    fn test_action_call_synthesis_order() {
        let registry = toast_registry();
        let (out, diags) = synthesize(
            &registry,
            r#"$Toast("Hi"); if ($Toast.Done) { log("ok"); }"#,
        );

        assert!(diags.is_empty(), "{diags:?}");
        let construct = out.find("final ToastHolder toastAction0 = new ToastHolder();");
        let done = out.find("final Runnable toastDone0 = new Runnable() { public void run() {");
        let init = out.find(r#"toastAction0.init("Hi");"#);
        let build = out.find("toastAction0.build(toastDone0, null);");
        let execute = out.find("toastAction0.execute();");
        assert!(construct.is_some() && init.is_some() && done.is_some(), "{out}");
        assert!(construct < init && init < done && done < build && build < execute, "{out}");
        assert!(out.contains(r#"log("ok");"#));
    }

    #[test]
    fn test_branch_body_is_inside_continuation() {
        let registry = toast_registry();
        let (out, _) = synthesize(
            &registry,
            r#"$Toast("Hi"); if ($Toast.Done) { after(); } tail();"#,
        );

        let run_open = out.find("public void run() {").unwrap();
        let run_close = out[run_open..].find("}};").unwrap() + run_open;
        let after = out.find("after();").unwrap();
        assert!(run_open < after && after < run_close, "{out}");
        assert!(out.find("tail();").unwrap() > run_close);
    }

    #[test]
    fn test_no_matching_overload_reports() {
        let registry = toast_registry();
        let (out, diags) = synthesize(&registry, "$Toast(1, 2, 3);");

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::NoMatchingOverload);
        assert!(!out.contains(".init("), "{out}");
        assert!(out.contains("toastAction0.execute();"));
    }

    #[test]
    fn test_overload_matched_by_arity_and_kind() {
        let registry = toast_registry();
        let (out, diags) = synthesize(&registry, r#"$Toast("Hi", 5);"#);

        assert!(diags.is_empty(), "{diags:?}");
        assert!(out.contains(r#"toastAction0.init("Hi", 5);"#));
    }

    #[test]
    fn test_unknown_action_reports() {
        let registry = toast_registry();
        let (_, diags) = synthesize(&registry, "$Missing();");

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UnknownAction);
    }

    #[test]
    fn test_super_call_aborts_with_structural_error() {
        let registry = toast_registry();
        let mut imports = CompilationUnitImports::default();
        let mut sink = DiagnosticSink::new();
        let mut ctx = BuildContext::new(
            &registry,
            7,
            "MainActivity_",
            "MainActivity",
            &mut imports,
            &mut sink,
            Span::default(),
        );
        let block = emit::block();
        let err = process_block(r#"super.$Toast("Hi");"#, &block, &mut ctx).unwrap_err();
        assert_eq!(err, SynthesisError::ActionCallSuper { element: 7 });
    }

    #[test]
    fn test_background_groups_consecutive_statements() {
        let registry = toast_registry();
        let (out, _) = synthesize(&registry, "$Background; a(); b();");

        assert_eq!(
            out,
            "BackgroundExecutor.execute(new Runnable() { public void run() {\n    a();\n    b();\n}});\n"
        );
    }

    #[test]
    fn test_mode_switch_opens_new_wrapper() {
        let registry = toast_registry();
        let (out, _) = synthesize(&registry, "$Background; a(); $UIThread; b();");

        let bg = out.find("BackgroundExecutor.execute").unwrap();
        let ui = out.find("UIThreadExecutor.post").unwrap();
        assert!(bg < ui, "{out}");
        assert!(out.contains("a();"));
        assert!(out.contains("b();"));
    }

    #[test]
    fn test_nested_block_stays_on_active_executor() {
        let registry = toast_registry();
        let (out, _) = synthesize(&registry, "$Background; if (x) { a(); } b();");

        // One wrapper: the nested block must not re-dispatch onto the
        // executor it already runs on, or its statements detach as a
        // separate task and lose ordering against the trailing ones.
        assert_eq!(out.matches("BackgroundExecutor.execute").count(), 1, "{out}");
        let close = out.find("}});").unwrap();
        let a = out.find("a();").unwrap();
        let b = out.find("b();").unwrap();
        assert!(a < close && b < close, "{out}");
        assert!(a < b, "{out}");
    }

    #[test]
    fn test_nested_block_can_switch_modes() {
        let registry = toast_registry();
        let (out, _) = synthesize(&registry, "$Background; if (x) { $UIThread; a(); } b();");

        assert_eq!(out.matches("BackgroundExecutor.execute").count(), 1, "{out}");
        let ui = out.find("UIThreadExecutor.post").unwrap();
        let bg = out.find("BackgroundExecutor.execute").unwrap();
        assert!(bg < ui, "{out}");
        // b() still runs on the background wrapper, after the block closes.
        let b = out.find("b();").unwrap();
        assert!(ui < b, "{out}");
    }

    #[test]
    fn test_mode_is_scoped_to_enclosing_block() {
        let registry = toast_registry();
        let (out, _) = synthesize(&registry, "if (x) { $Background; a(); } b();");

        let wrapper = out.find("BackgroundExecutor.execute").unwrap();
        let outer_tail = out.rfind("b();").unwrap();
        assert!(wrapper < outer_tail, "{out}");
        // b() renders at the outer depth, outside the wrapper.
        assert!(out.lines().any(|line| line == "b();"), "{out}");
    }

    #[test]
    fn test_nested_action_inside_continuation() {
        let registry = toast_registry();
        let (out, diags) = synthesize(
            &registry,
            r#"$Toast("a"); if ($Toast.Done) { $Toast("b"); }"#,
        );

        assert!(diags.is_empty(), "{diags:?}");
        assert!(out.contains("toastAction0"), "{out}");
        assert!(out.contains("toastAction1"), "{out}");
        let inner = out.find(r#"toastAction1.init("b");"#).unwrap();
        let done_open = out.find("toastDone0").unwrap();
        assert!(done_open < inner, "{out}");
    }
}
