//! Data model for actiongen.
//!
//! This crate holds everything the generator knows about a compilation round
//! before any code is synthesized:
//! - the element model mirroring the host framework's immutable language
//!   elements, plus the [`VirtualElement`] decorator for substituting
//!   characteristics without touching the original;
//! - per-compilation-unit import tables and best-effort type resolution;
//! - the Action registry: one [`ActionInfo`] per discovered holder with its
//!   overload groups and processor chain;
//! - `@Define` literal/regex substitution tables.
//!
//! All of it is process-wide, mutated only during a single run, and rebuilt
//! from source each invocation; only the generated-class cache survives on
//! disk (owned by the binary crate).

mod defines;
mod element;
mod imports;
mod registry;

pub use defines::{DefineEntry, Defines};
pub use element::{
    Annotation, Element, ElementArena, ElementId, ElementKind, ElementView, TypeRef,
    VirtualElement,
};
pub use imports::CompilationUnitImports;
pub use registry::{
    ActionInfo, ActionMethod, ActionMethodParam, ActionProcessor, ActionRegistry,
    ProcessorContext, RegistryError,
};
