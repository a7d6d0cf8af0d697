//! Downcast seam for registry nodes.
//!
//! Components and entities are handled as trait objects; type-filtered
//! lookup needs a way back to the concrete type. The blanket impl means
//! node types get both views for free.

use std::any::Any;
use std::sync::Arc;

/// Uniform access to the [`Any`] views of a node.
pub trait AsAny: Any {
    /// Borrowed view for `TypeId` queries and reference downcasts.
    fn as_any(&self) -> &dyn Any;

    /// Shared-ownership view for `Arc` downcasts.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
