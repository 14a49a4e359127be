//! The Action registry.
//!
//! One [`ActionInfo`] per discovered holder class describes its overload
//! groups and carries the processor chain that validates and transforms the
//! metadata before synthesis. Structure (method and parameter lists) is
//! rebuilt incrementally across rounds; transient metadata never leaks
//! between rounds ([`ActionInfo::clear_metadata`]).

use crate::element::{Annotation, TypeRef};
use action_diagnostics::DiagnosticSink;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use source_span::Span;
use thiserror::Error;

/// Errors raised while building registry structure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// `add_method` was called with an empty method name.
    #[error("action method requires a name")]
    MissingName,

    /// `add_method` was called with an empty result type.
    #[error("action method '{0}' requires a result type")]
    MissingResultType(String),
}

/// One parameter of an Action method overload.
#[derive(Debug, Clone)]
pub struct ActionMethodParam {
    /// Parameter name.
    pub name: SmolStr,
    /// Resolved parameter type.
    pub ty: TypeRef,
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Transient per-round metadata.
    pub metadata: FxHashMap<SmolStr, String>,
    /// Opaque processor linkage slot (a back-reference, not ownership).
    pub internal: Option<SmolStr>,
}

impl ActionMethodParam {
    /// Creates a parameter with no annotations.
    pub fn new(name: impl Into<SmolStr>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            metadata: FxHashMap::default(),
            internal: None,
        }
    }
}

/// One overload of an Action lifecycle method.
///
/// Structure is immutable after construction; only the metadata map changes,
/// and only within a round.
#[derive(Debug, Clone)]
pub struct ActionMethod {
    /// Method name (`init`, `build`, `execute`, or a synthesized helper).
    pub name: SmolStr,
    /// Result type name.
    pub result: TypeRef,
    /// Ordered parameter list.
    pub params: Vec<ActionMethodParam>,
    /// Javadoc carried over into generated call-site documentation.
    pub javadoc: Option<String>,
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Transient per-round metadata.
    pub metadata: FxHashMap<SmolStr, String>,
}

/// Context handed to each processor in the chain.
pub struct ProcessorContext<'a> {
    /// Sink for validation diagnostics.
    pub sink: &'a mut DiagnosticSink,
    /// Location of the holder declaration, for reporting.
    pub span: Span,
}

/// A pluggable validator/transformer over one holder's metadata.
///
/// Validators run first and must not mutate; generators run second and may
/// rewrite metadata, including adding synthesized methods visible to later
/// processors in the same chain.
pub trait ActionProcessor: Send + Sync {
    /// Identifies the processor in debug output.
    fn name(&self) -> &str;

    /// Validation pass. Reports problems through the context sink.
    fn validate(&self, info: &ActionInfo, ctx: &mut ProcessorContext<'_>) {
        let _ = (info, ctx);
    }

    /// Generation pass. May read and rewrite metadata.
    fn generate(&self, info: &mut ActionInfo, ctx: &mut ProcessorContext<'_>) {
        let _ = (info, ctx);
    }
}

/// Everything known about one Action holder class.
#[derive(Default)]
pub struct ActionInfo {
    /// Fully qualified holder class name.
    pub holder: String,
    /// Whether the action is visible outside its declaring library.
    pub global: bool,
    /// Where the holder was declared.
    pub span: Span,
    /// Transient per-round metadata.
    pub metadata: FxHashMap<SmolStr, String>,
    methods: IndexMap<SmolStr, Vec<ActionMethod>>,
    processors: Vec<Box<dyn ActionProcessor>>,
}

impl std::fmt::Debug for ActionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInfo")
            .field("holder", &self.holder)
            .field("global", &self.global)
            .field("methods", &self.methods)
            .field("processors", &self.processors.len())
            .finish()
    }
}

impl ActionInfo {
    /// Creates an empty descriptor for a holder class.
    pub fn new(holder: impl Into<String>, global: bool, span: Span) -> Self {
        Self {
            holder: holder.into(),
            global,
            span,
            metadata: FxHashMap::default(),
            methods: IndexMap::new(),
            processors: Vec::new(),
        }
    }

    /// Appends an overload to the named method group.
    ///
    /// Declaration order is preserved within a group and across groups.
    /// Errors on an empty name or result type.
    pub fn add_method(
        &mut self,
        name: impl Into<SmolStr>,
        result: TypeRef,
        params: Vec<ActionMethodParam>,
        annotations: Vec<Annotation>,
        javadoc: Option<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::MissingName);
        }
        if result.as_str().is_empty() {
            return Err(RegistryError::MissingResultType(name.to_string()));
        }

        self.methods.entry(name.clone()).or_default().push(ActionMethod {
            name,
            result,
            params,
            javadoc,
            annotations,
            metadata: FxHashMap::default(),
        });
        Ok(())
    }

    /// The overload group for a method name, in declaration order.
    pub fn overloads(&self, name: &str) -> &[ActionMethod] {
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All method groups in declaration order.
    pub fn method_groups(&self) -> impl Iterator<Item = (&str, &[ActionMethod])> {
        self.methods.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Attaches a processor to the end of the chain.
    pub fn add_processor(&mut self, processor: Box<dyn ActionProcessor>) {
        self.processors.push(processor);
    }

    /// Runs the validation pass of every processor, in registration order.
    pub fn validate_processors(&self, ctx: &mut ProcessorContext<'_>) {
        for processor in &self.processors {
            processor.validate(self, ctx);
        }
    }

    /// Runs the generation pass of every processor, in registration order.
    ///
    /// Processors may mutate metadata, so the chain is detached for the
    /// duration of the walk and reattached afterwards.
    pub fn call_processors(&mut self, ctx: &mut ProcessorContext<'_>) {
        let processors = std::mem::take(&mut self.processors);
        for processor in &processors {
            processor.generate(self, ctx);
        }
        // keep processors added by generators, then restore the originals first
        let added = std::mem::replace(&mut self.processors, processors);
        self.processors.extend(added);
    }

    /// Clears all transient metadata while preserving structure.
    ///
    /// Called between annotation-processing rounds: the top-level map plus
    /// every method's and parameter's map are emptied; names, result types
    /// and parameter lists stay intact.
    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
        for group in self.methods.values_mut() {
            for method in group {
                method.metadata.clear();
                for param in &mut method.params {
                    param.metadata.clear();
                }
            }
        }
    }
}

/// All Actions known in the current run, keyed by their `$Name`.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: IndexMap<SmolStr, ActionInfo>,
    generation_suffix: SmolStr,
}

impl ActionRegistry {
    /// Creates a registry using the host framework's generation suffix.
    pub fn new(generation_suffix: impl Into<SmolStr>) -> Self {
        Self {
            actions: IndexMap::new(),
            generation_suffix: generation_suffix.into(),
        }
    }

    /// Registers (or replaces) an Action under its `$Name`.
    pub fn register(&mut self, name: impl Into<SmolStr>, info: ActionInfo) {
        self.actions.insert(name.into(), info);
    }

    /// Looks up an Action by name.
    pub fn get(&self, name: &str) -> Option<&ActionInfo> {
        self.actions.get(name)
    }

    /// Mutable lookup, for the generation pass.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ActionInfo> {
        self.actions.get_mut(name)
    }

    /// Returns true if `name` refers to a registered Action.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// All registered actions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionInfo)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Maps an annotated class's simple name to its generated counterpart.
    pub fn generated_name(&self, simple_name: &str) -> String {
        format!("{}{}", simple_name, self.generation_suffix)
    }

    /// Clears transient metadata on every registered Action.
    pub fn clear_round_metadata(&mut self) {
        for info in self.actions.values_mut() {
            info.clear_metadata();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_diagnostics::{Diagnostic, DiagnosticCode};

    fn toast_info() -> ActionInfo {
        let mut info = ActionInfo::new("com.example.ToastActionHolder", true, Span::default());
        info.add_method(
            "init",
            TypeRef::new("void"),
            vec![ActionMethodParam::new("message", TypeRef::new("String"))],
            Vec::new(),
            None,
        )
        .unwrap();
        info
    }

    #[test]
    fn test_add_method_requires_name() {
        let mut info = toast_info();
        let err = info
            .add_method("", TypeRef::new("void"), Vec::new(), Vec::new(), None)
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingName);
    }

    #[test]
    fn test_add_method_requires_result_type() {
        let mut info = toast_info();
        let err = info
            .add_method("build", TypeRef::new(""), Vec::new(), Vec::new(), None)
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingResultType("build".to_string()));
    }

    #[test]
    fn test_add_method_appends_preserving_order() {
        let mut info = toast_info();
        info.add_method(
            "init",
            TypeRef::new("void"),
            vec![
                ActionMethodParam::new("message", TypeRef::new("String")),
                ActionMethodParam::new("duration", TypeRef::new("int")),
            ],
            Vec::new(),
            None,
        )
        .unwrap();

        let overloads = info.overloads("init");
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[0].params.len(), 1);
        assert_eq!(overloads[1].params.len(), 2);
    }

    #[test]
    fn test_clear_metadata_preserves_structure() {
        let mut info = toast_info();
        info.metadata.insert("k".into(), "v".into());
        {
            let group = info.methods.get_mut("init").unwrap();
            group[0].metadata.insert("m".into(), "v".into());
            group[0].params[0].metadata.insert("p".into(), "v".into());
        }

        info.clear_metadata();

        assert!(info.metadata.is_empty());
        let method = &info.overloads("init")[0];
        assert!(method.metadata.is_empty());
        assert!(method.params[0].metadata.is_empty());
        assert_eq!(method.name, "init");
        assert_eq!(method.result.as_str(), "void");
        assert_eq!(method.params[0].name, "message");
    }

    struct RejectingValidator;

    impl ActionProcessor for RejectingValidator {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn validate(&self, info: &ActionInfo, ctx: &mut ProcessorContext<'_>) {
            if info.overloads("build").is_empty() {
                ctx.sink.report(Diagnostic::new(
                    DiagnosticCode::NoMatchingOverload,
                    "holder declares no build method",
                    info.span,
                ));
            }
        }
    }

    struct HelperSynthesizer;

    impl ActionProcessor for HelperSynthesizer {
        fn name(&self) -> &str {
            "helper"
        }

        fn generate(&self, info: &mut ActionInfo, _ctx: &mut ProcessorContext<'_>) {
            info.add_method("fire", TypeRef::new("void"), Vec::new(), Vec::new(), None)
                .unwrap();
        }
    }

    #[test]
    fn test_processor_chain_runs_in_order() {
        let mut info = toast_info();
        info.add_processor(Box::new(RejectingValidator));
        info.add_processor(Box::new(HelperSynthesizer));

        let mut sink = DiagnosticSink::new();
        let mut ctx = ProcessorContext {
            sink: &mut sink,
            span: Span::default(),
        };
        info.validate_processors(&mut ctx);
        assert!(sink.has_errors());

        let mut ctx = ProcessorContext {
            sink: &mut sink,
            span: Span::default(),
        };
        info.call_processors(&mut ctx);
        assert_eq!(info.overloads("fire").len(), 1);
    }

    #[test]
    fn test_registry_generated_name() {
        let registry = ActionRegistry::new("_");
        assert_eq!(registry.generated_name("MainActivity"), "MainActivity_");
    }
}
