//! Load/put orchestration for model-typed declarations.
//!
//! Each model field carries a small lifecycle state machine; the generators
//! here emit the load, put and recollect call chains with their Done/Failed
//! continuations and lifecycle callbacks.

use action_model::CompilationUnitImports;
use indexmap::IndexMap;

use crate::builder::{BACKGROUND_EXECUTOR, UI_THREAD_EXECUTOR};
use crate::emit::BlockRef;

/// Local-storage gateway referenced by generated code.
pub const MODEL_STORE: &str = "com.actiongen.api.model.ModelStore";
/// Remote gateway referenced by generated code.
pub const REMOTE_GATEWAY: &str = "com.actiongen.api.model.RemoteGateway";

/// Lifecycle of one model-typed declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Putting,
    Put,
    Failed,
}

/// Events that drive the model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    /// A load was requested, explicitly or by lazy first access.
    Load,
    /// The backend satisfied the load.
    LoadDone,
    /// The backend failed the load.
    LoadFailed,
    /// A put was requested.
    Put,
    /// The backend accepted the put.
    PutDone,
    /// The backend rejected the put.
    PutFailed,
    /// A put completed and must chain into a reconciling re-load.
    Recollect,
}

/// Applies `event` to `state`, or `None` when the transition is invalid.
pub fn next_state(state: ModelState, event: ModelEvent) -> Option<ModelState> {
    use ModelEvent as E;
    use ModelState as S;
    match (state, event) {
        (S::Unloaded | S::Loaded | S::Failed, E::Load) => Some(S::Loading),
        (S::Loading, E::LoadDone) => Some(S::Loaded),
        (S::Loading, E::LoadFailed) => Some(S::Failed),
        (S::Unloaded | S::Loaded | S::Put, E::Put) => Some(S::Putting),
        (S::Putting, E::PutDone) => Some(S::Put),
        (S::Putting, E::PutFailed) => Some(S::Failed),
        (S::Putting, E::Recollect) => Some(S::Loading),
        _ => None,
    }
}

/// How a remote put serializes the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
}

impl BodyEncoding {
    fn as_java(&self) -> &'static str {
        match self {
            Self::Json => "RemoteGateway.JSON",
            Self::Form => "RemoteGateway.FORM",
        }
    }
}

/// A declarative remote request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: String,
    /// URL template with `{query}` and `{field}` placeholders.
    pub url: String,
    /// Extra headers sent with the request.
    pub headers: Vec<(String, String)>,
    /// Body serialization for puts.
    pub encoding: BodyEncoding,
    /// When set, the generated code short-circuits to the canned response.
    pub mock: bool,
    /// Canned response body for mocked requests.
    pub mock_response: Option<String>,
}

/// Where a model's data lives.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Local storage addressed by a query string.
    Local,
    /// A remote endpoint.
    Remote(RequestDescriptor),
}

/// Everything declared about one model-typed field.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Field name in the annotated class.
    pub field: String,
    /// Simple model type name.
    pub ty: String,
    /// Dispatch loads on a background worker.
    pub async_load: bool,
    /// Dispatch puts on a background worker.
    pub async_put: bool,
    /// Load on first access instead of eagerly.
    pub lazy: bool,
    /// Swallow backend exceptions after the Failed branch ran.
    pub handle_exceptions: bool,
    /// Query string, may contain `{field}` placeholders.
    pub query: String,
    /// Field subset serialized on put; empty means all fields.
    pub fields: Vec<String>,
    /// Backing store.
    pub backend: Backend,
    /// `@AfterLoad` callback method, if the class declares one.
    pub after_load: Option<String>,
    /// `@AfterPut` callback method, if the class declares one.
    pub after_put: Option<String>,
}

/// Expands `{query}` and `{name}` placeholders in a URL or query template.
pub fn expand_template(
    template: &str,
    query: &str,
    fields: &IndexMap<String, String>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        match tail.find('}') {
            Some(close) => {
                let name = &tail[..close];
                if name == "query" {
                    out.push_str(query);
                } else if let Some(value) = fields.get(name) {
                    out.push_str(value);
                } else {
                    // Unknown placeholder survives verbatim.
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The continuation bodies of an emitted model operation.
#[derive(Debug)]
pub struct OperationBlocks {
    /// Runs after the backend succeeded, on the original thread.
    pub done: BlockRef,
    /// Runs when the backend failed.
    pub failed: BlockRef,
}

fn open_dispatch(block: &BlockRef, imports: &mut CompilationUnitImports) -> BlockRef {
    imports.ensure_import(BACKGROUND_EXECUTOR);
    block.borrow_mut().add_nested(
        "BackgroundExecutor.execute(new Runnable() { public void run()",
        "}});",
    )
}

fn open_ui_post(block: &BlockRef, imports: &mut CompilationUnitImports) -> BlockRef {
    imports.ensure_import(UI_THREAD_EXECUTOR);
    block.borrow_mut().add_nested(
        "UIThreadExecutor.post(new Runnable() { public void run()",
        "}});",
    )
}

fn fetch_statement(spec: &ModelSpec) -> String {
    match &spec.backend {
        Backend::Local => format!(
            "{} = ModelStore.load({}.class, \"{}\")",
            spec.field, spec.ty, spec.query
        ),
        Backend::Remote(request) => {
            if request.mock {
                let canned = request.mock_response.as_deref().unwrap_or("");
                format!(
                    "{} = RemoteGateway.mock({}.class, \"{}\")",
                    spec.field, spec.ty, canned
                )
            } else {
                format!(
                    "{} = RemoteGateway.request(\"{}\", \"{}\", {}.class)",
                    spec.field, request.method, request.url, spec.ty
                )
            }
        }
    }
}

fn put_statement(spec: &ModelSpec) -> String {
    let subset = if spec.fields.is_empty() {
        "null".to_string()
    } else {
        let names: Vec<String> = spec.fields.iter().map(|f| format!("\"{f}\"")).collect();
        format!("new String[] {{{}}}", names.join(", "))
    };
    match &spec.backend {
        Backend::Local => format!(
            "ModelStore.put({}, \"{}\", {})",
            spec.field, spec.query, subset
        ),
        Backend::Remote(request) => format!(
            "RemoteGateway.send(\"{}\", \"{}\", {}, {}, {})",
            request.method,
            request.url,
            spec.field,
            request.encoding.as_java(),
            subset
        ),
    }
}

fn ensure_backend_import(spec: &ModelSpec, imports: &mut CompilationUnitImports) {
    match spec.backend {
        Backend::Local => imports.ensure_import(MODEL_STORE),
        Backend::Remote(_) => imports.ensure_import(REMOTE_GATEWAY),
    }
}

/// Emits the body of one backend operation with its try/catch shell.
///
/// `work` is the fetch or put statement, `callback` the lifecycle method to
/// invoke after success. Returns the Done and Failed bodies. Without
/// `handle_exceptions` the exception is rethrown after the Failed branch.
fn emit_operation(
    spec: &ModelSpec,
    block: &BlockRef,
    imports: &mut CompilationUnitImports,
    asynchronous: bool,
    work: String,
    callback: Option<&str>,
) -> OperationBlocks {
    ensure_backend_import(spec, imports);

    let op_root = if asynchronous {
        open_dispatch(block, imports)
    } else {
        block.clone()
    };

    let try_block = op_root.borrow_mut().add_nested("try", "");
    try_block.borrow_mut().add_statement(work);
    if let Some(callback) = callback {
        try_block
            .borrow_mut()
            .add_statement(format!("{callback}()"));
    }
    let done = if asynchronous {
        open_ui_post(&try_block, imports)
    } else {
        try_block.clone()
    };

    let failed = op_root
        .borrow_mut()
        .add_nested("} catch (Exception e)", "}");
    if !spec.handle_exceptions {
        failed
            .borrow_mut()
            .add_tail("throw new RuntimeException(e);");
    }

    OperationBlocks { done, failed }
}

/// Emits a load chain for `spec` into `block`.
pub fn emit_load(
    spec: &ModelSpec,
    block: &BlockRef,
    imports: &mut CompilationUnitImports,
) -> OperationBlocks {
    emit_operation(
        spec,
        block,
        imports,
        spec.async_load,
        fetch_statement(spec),
        spec.after_load.as_deref(),
    )
}

/// Emits a put chain for `spec` into `block`.
pub fn emit_put(
    spec: &ModelSpec,
    block: &BlockRef,
    imports: &mut CompilationUnitImports,
) -> OperationBlocks {
    emit_operation(
        spec,
        block,
        imports,
        spec.async_put,
        put_statement(spec),
        spec.after_put.as_deref(),
    )
}

/// Emits a put chained into a mandatory reconciling re-load.
///
/// The re-load runs inside the put's Done continuation so backend-assigned
/// fields are visible before the caller's Done branch. With `validate` the
/// reloaded model is checked first.
pub fn emit_recollect(
    spec: &ModelSpec,
    block: &BlockRef,
    imports: &mut CompilationUnitImports,
    validate: bool,
) -> OperationBlocks {
    let put = emit_put(spec, block, imports);
    let load = emit_load(spec, &put.done, imports);
    if validate {
        imports.ensure_import(MODEL_STORE);
        load.done
            .borrow_mut()
            .add_statement(format!("ModelStore.validate({})", spec.field));
    }
    OperationBlocks {
        done: load.done,
        failed: put.failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit;
    use pretty_assertions::assert_eq;

    fn local_spec() -> ModelSpec {
        ModelSpec {
            field: "user".to_string(),
            ty: "User".to_string(),
            async_load: false,
            async_put: false,
            lazy: false,
            handle_exceptions: true,
            query: "id = 1".to_string(),
            fields: Vec::new(),
            backend: Backend::Local,
            after_load: Some("afterUserLoad".to_string()),
            after_put: None,
        }
    }

    #[test]
    fn test_lifecycle_happy_paths() {
        use ModelEvent as E;
        use ModelState as S;
        assert_eq!(next_state(S::Unloaded, E::Load), Some(S::Loading));
        assert_eq!(next_state(S::Loading, E::LoadDone), Some(S::Loaded));
        assert_eq!(next_state(S::Loaded, E::Put), Some(S::Putting));
        assert_eq!(next_state(S::Putting, E::PutDone), Some(S::Put));
    }

    #[test]
    fn test_lifecycle_failures_and_recollect() {
        use ModelEvent as E;
        use ModelState as S;
        assert_eq!(next_state(S::Loading, E::LoadFailed), Some(S::Failed));
        assert_eq!(next_state(S::Putting, E::PutFailed), Some(S::Failed));
        assert_eq!(next_state(S::Failed, E::Load), Some(S::Loading));
        // Recollect chains the put straight into a re-load.
        assert_eq!(next_state(S::Putting, E::Recollect), Some(S::Loading));
        assert_eq!(next_state(S::Unloaded, E::PutDone), None);
    }

    #[test]
    fn test_expand_template() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), "42".to_string());
        let url = expand_template("/users/{id}?q={query}&x={other}", "name", &fields);
        assert_eq!(url, "/users/42?q=name&x={other}");
    }

    #[test]
    fn test_sync_local_load_shape() {
        let spec = local_spec();
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        let blocks = emit_load(&spec, &block, &mut imports);
        blocks.done.borrow_mut().add_statement("render()");

        let out = block.borrow().render(0);
        assert!(out.contains("try {"), "{out}");
        assert!(out.contains("user = ModelStore.load(User.class, \"id = 1\");"));
        assert!(out.contains("afterUserLoad();"));
        assert!(out.contains("render();"));
        assert!(out.contains("} catch (Exception e) {"));
        // handleExceptions swallows, no rethrow.
        assert!(!out.contains("throw new RuntimeException"));
    }

    #[test]
    fn test_unhandled_exceptions_rethrow_after_failed_branch() {
        let mut spec = local_spec();
        spec.handle_exceptions = false;
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        let blocks = emit_load(&spec, &block, &mut imports);
        blocks.failed.borrow_mut().add_statement("warn()");

        let out = block.borrow().render(0);
        let warn = out.find("warn();").unwrap();
        let rethrow = out.find("throw new RuntimeException(e);").unwrap();
        assert!(warn < rethrow, "{out}");
    }

    #[test]
    fn test_async_load_dispatches_and_posts_back() {
        let mut spec = local_spec();
        spec.async_load = true;
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        let blocks = emit_load(&spec, &block, &mut imports);
        blocks.done.borrow_mut().add_statement("render()");

        let out = block.borrow().render(0);
        let bg = out.find("BackgroundExecutor.execute").unwrap();
        let fetch = out.find("ModelStore.load").unwrap();
        let post = out.find("UIThreadExecutor.post").unwrap();
        let render = out.find("render();").unwrap();
        assert!(bg < fetch && fetch < post && post < render, "{out}");
    }

    #[test]
    fn test_put_serializes_field_subset() {
        let mut spec = local_spec();
        spec.fields = vec!["name".to_string(), "email".to_string()];
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        emit_put(&spec, &block, &mut imports);

        let out = block.borrow().render(0);
        assert!(
            out.contains("ModelStore.put(user, \"id = 1\", new String[] {\"name\", \"email\"});"),
            "{out}"
        );
    }

    #[test]
    fn test_remote_put_carries_encoding() {
        let mut spec = local_spec();
        spec.backend = Backend::Remote(RequestDescriptor {
            method: "POST".to_string(),
            url: "/users".to_string(),
            headers: Vec::new(),
            encoding: BodyEncoding::Form,
            mock: false,
            mock_response: None,
        });
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        emit_put(&spec, &block, &mut imports);

        let out = block.borrow().render(0);
        assert!(
            out.contains("RemoteGateway.send(\"POST\", \"/users\", user, RemoteGateway.FORM, null);"),
            "{out}"
        );
    }

    #[test]
    fn test_mocked_remote_load_short_circuits() {
        let mut spec = local_spec();
        spec.backend = Backend::Remote(RequestDescriptor {
            method: "GET".to_string(),
            url: "/users/1".to_string(),
            headers: Vec::new(),
            encoding: BodyEncoding::Json,
            mock: true,
            mock_response: Some("{}".to_string()),
        });
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        emit_load(&spec, &block, &mut imports);

        let out = block.borrow().render(0);
        assert!(out.contains("RemoteGateway.mock(User.class, \"{}\");"), "{out}");
        assert!(!out.contains("RemoteGateway.request"), "{out}");
    }

    #[test]
    fn test_recollect_reloads_inside_put_done() {
        let spec = local_spec();
        let block = emit::block();
        let mut imports = CompilationUnitImports::default();
        let blocks = emit_recollect(&spec, &block, &mut imports, true);
        blocks.done.borrow_mut().add_statement("resume()");

        let out = block.borrow().render(0);
        let put = out.find("ModelStore.put(user").unwrap();
        let load = out.find("ModelStore.load(User.class").unwrap();
        let validate = out.find("ModelStore.validate(user);").unwrap();
        let resume = out.find("resume();").unwrap();
        assert!(put < load && load < validate && validate < resume, "{out}");
    }
}
