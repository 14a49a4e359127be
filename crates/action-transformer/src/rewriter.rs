//! Expression rewriting for annotated method bodies.
//!
//! Bodies are split at string-literal boundaries so rewrites only ever touch
//! code. Injection markers leave a sentinel behind; joining the segments back
//! together resolves each sentinel against the literal that follows it.

use action_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use action_model::CompilationUnitImports;
use source_span::Span;

/// Runtime support class referenced by injected calls.
pub const ACTIONS_TOOLS: &str = "com.actiongen.api.ActionsTools";

const CAST_SENTINEL: &str = "\u{1}c\u{1}";
const ITEM_SENTINEL: &str = "\u{1}i\u{1}";

/// One segment of a split body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Code between string literals.
    Code(String),
    /// The contents of a string literal, quotes stripped.
    Literal(String),
}

/// Splits a body at unescaped double quotes.
///
/// Segments alternate starting with code; adjacent quotes produce empty
/// literal segments so positions stay faithful to the input.
pub fn split_literals(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_literal {
            if escaped {
                current.push(ch);
                escaped = false;
            } else if ch == '\\' {
                current.push(ch);
                escaped = true;
            } else if ch == '"' {
                segments.push(Segment::Literal(std::mem::take(&mut current)));
                in_literal = false;
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            segments.push(Segment::Code(std::mem::take(&mut current)));
            in_literal = true;
        } else {
            current.push(ch);
        }
    }

    if in_literal {
        // Unterminated literal, keep the text as a literal tail.
        segments.push(Segment::Literal(current));
    } else {
        segments.push(Segment::Code(current));
    }

    segments
}

/// Context for one rewriting pass over a method body.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    /// Simple name of the generated subclass, target of `this`/`super`.
    pub generated_class: &'a str,
    /// Simple name of the user's annotated class.
    pub annotated_class: &'a str,
    /// Action member selector to strip from a consumed branch body.
    pub selector: Option<&'a str>,
    /// Import table of the compilation unit being processed.
    pub imports: &'a mut CompilationUnitImports,
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn is_word_start(prev: Option<char>) -> bool {
    match prev {
        Some(ch) => !is_ident_char(ch) && ch != '.',
        None => true,
    }
}

/// Replaces whole-word occurrences of `word` in `code`.
///
/// A match must not be preceded by an identifier character or `.`, and must
/// not be followed by an identifier character, so `x.this` and `thisValue`
/// are left alone. The word itself may be a dotted path.
fn replace_word(code: &str, word: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while i < code.len() {
        if code[i..].starts_with(word) {
            let prev = code[..i].chars().next_back();
            let next = code[i + word.len()..].chars().next();
            if is_word_start(prev) && !next.is_some_and(is_ident_char) {
                out.push_str(replacement);
                i += word.len();
                continue;
            }
        }
        let ch = code[i..].chars().next().unwrap_or('\0');
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

fn rewrite_code(code: &str, ctx: &mut RewriteContext<'_>) -> String {
    // Qualified `Annotated.this` first so the bare pass below cannot
    // double-rewrite its tail.
    let qualified_this = format!("{}.this", ctx.annotated_class);
    let generated_this = format!("{}.this", ctx.generated_class);
    let mut code = replace_word(code, &qualified_this, &generated_this);

    code = replace_word(&code, "this", &generated_this);
    code = replace_word(
        &code,
        "super",
        &format!("{}.super", ctx.generated_class),
    );

    if let Some(selector) = ctx.selector {
        code = replace_word(&code, selector, "");
    }

    for (alias, target) in ctx.imports.static_aliases() {
        code = replace_word(&code, alias, target);
    }

    if code.contains("$inject") {
        ctx.imports.ensure_import(ACTIONS_TOOLS);
        code = apply_inject_macros(&code);
    }

    code
}

/// Expands `$inject` / `$injectItem` markers within one code segment.
///
/// `$injectItem` rotates its first argument to the last position. When the
/// argument list runs out of the segment (the first argument is a string
/// literal), a sentinel defers the rotation to [`join_segments`].
fn apply_inject_macros(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;

    while let Some(idx) = rest.find("$inject") {
        out.push_str(&rest[..idx]);
        let after = &rest[idx..];

        // Most specific marker first, same as ordered pattern lists elsewhere.
        if let Some(tail) = after.strip_prefix("$injectItem(") {
            out.push_str("ActionsTools.$item(");
            match find_matching_paren(tail) {
                Some(close) => {
                    out.push_str(&rotate_first_arg(&tail[..close]));
                    rest = &tail[close..];
                }
                None => {
                    out.push_str(ITEM_SENTINEL);
                    rest = tail;
                }
            }
        } else if let Some(tail) = after.strip_prefix("$inject()") {
            out.push_str("()");
            rest = tail;
        } else if let Some(tail) = after.strip_prefix("$inject(") {
            out.push_str("ActionsTools.$cast(");
            out.push_str(CAST_SENTINEL);
            rest = tail;
        } else {
            out.push('$');
            rest = &after[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Splits an argument list at top-level commas, string literal aware.
pub(crate) fn split_top_level_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in args.char_indices() {
        if in_string {
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
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts
}

fn rotate_first_arg(args: &str) -> String {
    let parts = split_top_level_args(args);
    if parts.len() < 2 {
        return args.to_string();
    }
    let mut rotated: Vec<&str> = parts[1..].to_vec();
    rotated.push(parts[0]);
    rotated.join(", ")
}

/// Advances `depth` through `code`; returns the offset where the open
/// parenthesis closes, if it closes in this piece.
fn close_paren_at(code: &str, depth: &mut usize) -> Option<usize> {
    for (idx, ch) in code.char_indices() {
        match ch {
            '(' => *depth += 1,
            ')' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the offset of the `)` closing an already-open parenthesis.
fn find_matching_paren(code: &str) -> Option<usize> {
    let mut depth = 1usize;
    close_paren_at(code, &mut depth)
}

fn quote(literal: &str) -> String {
    format!("\"{}\"", literal)
}

/// Joins rewritten segments, resolving injection sentinels.
fn join_segments(
    segments: Vec<Segment>,
    span: Span,
    sink: &mut DiagnosticSink,
) -> String {
    let mut out = String::new();
    let mut iter = segments.into_iter().peekable();

    while let Some(segment) = iter.next() {
        match segment {
            Segment::Literal(text) => {
                out.push_str(&quote(&text));
            }
            Segment::Code(mut code) => {
                // Mid-segment sentinels mean the injected argument is plain
                // code already in place; the sentinel just vanishes.
                resolve_inner_sentinels(&mut code);

                if let Some(stripped) = code.strip_suffix(CAST_SENTINEL) {
                    out.push_str(stripped);
                    match iter.next() {
                        Some(Segment::Literal(literal)) => {
                            out.push_str(&quote(&literal));
                        }
                        other => {
                            report_dangling(span, sink);
                            if let Some(seg) = other {
                                push_segment(&mut out, seg);
                            }
                        }
                    }
                } else if let Some(stripped) = code.strip_suffix(ITEM_SENTINEL) {
                    out.push_str(stripped);
                    match iter.next() {
                        Some(Segment::Literal(literal)) => {
                            push_rotated_item(&mut out, &literal, &mut iter);
                        }
                        other => {
                            report_dangling(span, sink);
                            if let Some(seg) = other {
                                push_segment(&mut out, seg);
                            }
                        }
                    }
                } else {
                    out.push_str(&code);
                }
            }
        }
    }

    out
}

/// Reorders `$item("key", rest...)` so the literal key lands last.
///
/// The remaining arguments may span further literal segments, so segments
/// are consumed up to the call's closing paren, re-quoting any literal
/// arguments passed on the way.
fn push_rotated_item(
    out: &mut String,
    key: &str,
    iter: &mut std::iter::Peekable<std::vec::IntoIter<Segment>>,
) {
    let mut args = String::new();
    let mut depth = 1usize;

    while let Some(segment) = iter.next() {
        match segment {
            Segment::Literal(text) => args.push_str(&quote(&text)),
            Segment::Code(code) => match close_paren_at(&code, &mut depth) {
                Some(close) => {
                    args.push_str(&code[..close]);
                    let rest = args.trim_start().trim_start_matches(',').trim();
                    if rest.is_empty() {
                        out.push_str(&quote(key));
                    } else {
                        out.push_str(rest);
                        out.push_str(", ");
                        out.push_str(&quote(key));
                    }
                    out.push_str(&code[close..]);
                    return;
                }
                None => args.push_str(&code),
            },
        }
    }

    // The call never closes in this fragment; keep the key in place.
    out.push_str(&quote(key));
    out.push_str(&args);
}

fn resolve_inner_sentinels(code: &mut String) {
    loop {
        let Some(idx) = code.find('\u{1}') else { break };
        if code[idx..].starts_with(CAST_SENTINEL) && idx + CAST_SENTINEL.len() == code.len() {
            break;
        }
        if code[idx..].starts_with(ITEM_SENTINEL) && idx + ITEM_SENTINEL.len() == code.len() {
            break;
        }
        code.replace_range(idx..idx + CAST_SENTINEL.len(), "");
    }
}

fn push_segment(out: &mut String, segment: Segment) {
    match segment {
        Segment::Code(code) => out.push_str(&code),
        Segment::Literal(text) => out.push_str(&quote(&text)),
    }
}

fn report_dangling(span: Span, sink: &mut DiagnosticSink) {
    sink.report(Diagnostic::new(
        DiagnosticCode::DanglingInject,
        "injection marker is not followed by an argument",
        span,
    ));
}

/// Rewrites a method body fragment for emission into the generated class.
pub fn rewrite(
    text: &str,
    ctx: &mut RewriteContext<'_>,
    span: Span,
    sink: &mut DiagnosticSink,
) -> String {
    let segments = split_literals(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Code(code) => Segment::Code(rewrite_code(&code, ctx)),
            literal => literal,
        })
        .collect();

    join_segments(segments, span, sink)
}
