//! View listener installation with two-phase buffering.
//!
//! Handlers register declarations and statements for a view field before the
//! listener object exists. The first `create_listener` call for a field
//! materializes the anonymous listener and flushes the buffers in arrival
//! order; later calls return the same body so every handler lands in one
//! callback.

use action_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use action_model::CompilationUnitImports;
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_span::Span;

use crate::emit::BlockRef;

/// Supported view callback kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Click,
    LongClick,
    ItemClick,
    ItemLongClick,
    EditorAction,
    Touch,
    FocusChange,
}

impl ListenerKind {
    /// The listener interface to instantiate.
    pub fn interface(&self) -> &'static str {
        match self {
            Self::Click => "View.OnClickListener",
            Self::LongClick => "View.OnLongClickListener",
            Self::ItemClick => "AdapterView.OnItemClickListener",
            Self::ItemLongClick => "AdapterView.OnItemLongClickListener",
            Self::EditorAction => "TextView.OnEditorActionListener",
            Self::Touch => "View.OnTouchListener",
            Self::FocusChange => "View.OnFocusChangeListener",
        }
    }

    /// The setter invoked on the view.
    pub fn setter(&self) -> &'static str {
        match self {
            Self::Click => "setOnClickListener",
            Self::LongClick => "setOnLongClickListener",
            Self::ItemClick => "setOnItemClickListener",
            Self::ItemLongClick => "setOnItemLongClickListener",
            Self::EditorAction => "setOnEditorActionListener",
            Self::Touch => "setOnTouchListener",
            Self::FocusChange => "setOnFocusChangeListener",
        }
    }

    /// The callback method signature.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Click => "public void onClick(View v)",
            Self::LongClick => "public boolean onLongClick(View v)",
            Self::ItemClick => {
                "public void onItemClick(AdapterView<?> parent, View view, int position, long id)"
            }
            Self::ItemLongClick => {
                "public boolean onItemLongClick(AdapterView<?> parent, View view, int position, long id)"
            }
            Self::EditorAction => {
                "public boolean onEditorAction(TextView v, int actionId, KeyEvent event)"
            }
            Self::Touch => "public boolean onTouch(View v, MotionEvent event)",
            Self::FocusChange => "public void onFocusChange(View v, boolean hasFocus)",
        }
    }

    /// The value returned after the handler body, for boolean callbacks.
    pub fn default_return(&self) -> Option<&'static str> {
        match self {
            Self::LongClick | Self::ItemLongClick | Self::EditorAction | Self::Touch => {
                Some("true")
            }
            _ => None,
        }
    }

    fn imports(&self) -> &'static [&'static str] {
        match self {
            Self::Click | Self::LongClick | Self::FocusChange => &["android.view.View"],
            Self::ItemClick | Self::ItemLongClick => {
                &["android.view.View", "android.widget.AdapterView"]
            }
            Self::EditorAction => &["android.widget.TextView", "android.view.KeyEvent"],
            Self::Touch => &["android.view.View", "android.view.MotionEvent"],
        }
    }
}

#[derive(Debug)]
struct ListenerEntry {
    kind: ListenerKind,
    decls: Vec<String>,
    stmts: Vec<String>,
    body: Option<BlockRef>,
}

/// Per-class buffer of listener contributions, keyed by view field.
///
/// A dotted field path reduces to its last segment for identity, so
/// `binding.saveButton` and `saveButton` address the same listener.
#[derive(Debug, Default)]
pub struct ViewListenerHolder {
    entries: IndexMap<SmolStr, ListenerEntry>,
}

fn field_key(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

impl ViewListenerHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a declaration for the field's callback body.
    pub fn add_decl(&mut self, field: &str, kind: ListenerKind, decl: impl Into<String>) {
        let entry = self.entry(field, kind);
        match &entry.body {
            Some(body) => body.borrow_mut().add_decl(decl),
            None => entry.decls.push(decl.into()),
        }
    }

    /// Buffers a statement for the field's callback body.
    pub fn add_statement(&mut self, field: &str, kind: ListenerKind, stmt: impl Into<String>) {
        let entry = self.entry(field, kind);
        match &entry.body {
            Some(body) => body.borrow_mut().add_statement(stmt),
            None => entry.stmts.push(stmt.into()),
        }
    }

    fn entry(&mut self, field: &str, kind: ListenerKind) -> &mut ListenerEntry {
        self.entries
            .entry(SmolStr::new(field_key(field)))
            .or_insert_with(|| ListenerEntry {
                kind,
                decls: Vec::new(),
                stmts: Vec::new(),
                body: None,
            })
    }

    /// Installs the listener for `field_path` into `block` and returns the
    /// callback body.
    ///
    /// Idempotent per field key. The first call emits the setter with an
    /// anonymous listener, flushes any buffered contributions and appends
    /// the default return for boolean callbacks. Later calls return the
    /// existing body; a later call with a different kind keeps the first
    /// kind and reports a `duplicate-listener` warning.
    pub fn create_listener(
        &mut self,
        kind: ListenerKind,
        field_path: &str,
        block: &BlockRef,
        imports: &mut CompilationUnitImports,
        sink: &mut DiagnosticSink,
        span: Span,
    ) -> BlockRef {
        let key = field_key(field_path);
        if key.is_empty() {
            sink.report(Diagnostic::new(
                DiagnosticCode::InvalidEventTarget,
                "event annotation names no view field",
                span,
            ));
        }

        let entry = self.entry(field_path, kind);
        if let Some(body) = &entry.body {
            if entry.kind != kind {
                let first = entry.kind;
                sink.report(Diagnostic::new(
                    DiagnosticCode::DuplicateListener,
                    format!(
                        "`{}` already has a {:?} listener, {:?} handler merged into it",
                        key, first, kind
                    ),
                    span,
                ));
            }
            return body.clone();
        }

        for fq in entry.kind.imports() {
            imports.ensure_import(*fq);
        }
        let install = block.borrow_mut().add_nested(
            format!(
                "{}.{}(new {}()",
                field_path,
                entry.kind.setter(),
                entry.kind.interface()
            ),
            "});",
        );
        let body = install
            .borrow_mut()
            .add_nested(entry.kind.signature().to_string(), "}");

        for decl in entry.decls.drain(..) {
            body.borrow_mut().add_decl(decl);
        }
        for stmt in entry.stmts.drain(..) {
            body.borrow_mut().add_statement(stmt);
        }
        if let Some(ret) = entry.kind.default_return() {
            body.borrow_mut().add_tail(format!("return {};", ret));
        }

        entry.body = Some(body.clone());
        body
    }

    /// Field keys with buffered contributions but no installed listener.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.body.is_none())
            .map(|(key, _)| key.as_str())
    }
}
