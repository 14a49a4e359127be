//! Transformation of annotated method bodies into generated Java.
//!
//! The pipeline: [`rewriter`] normalizes expression text (self references,
//! injection macros, static-import aliases), [`builder`] expands `$Name(...)`
//! action calls into construct/init/build/execute chains with continuation
//! objects, [`listener`] merges event handlers into per-view listener
//! installs, and [`model_ops`] generates model load/put/recollect chains.
//! [`emit`] holds the block and compilation-unit renderers everything
//! writes into.

pub mod builder;
pub mod emit;
pub mod listener;
pub mod model_ops;
pub mod rewriter;

pub use builder::{process_block, BuildContext, DispatchMode, SynthesisError};
pub use emit::{block, BlockRef, CodeBlock, JavaWriter};
pub use listener::{ListenerKind, ViewListenerHolder};
pub use model_ops::{
    emit_load, emit_put, emit_recollect, next_state, Backend, BodyEncoding, ModelEvent,
    ModelSpec, ModelState, OperationBlocks, RequestDescriptor,
};
pub use rewriter::{rewrite, split_literals, RewriteContext, Segment};
