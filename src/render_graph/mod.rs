//! Render Graph System
//!
//! Passes declare the resource versions they read and write; the graph culls
//! whatever no target depends on, allocates the survivors through the
//! [`ResourceAllocator`](crate::allocator::ResourceAllocator), and runs the
//! live passes in declaration order.

pub mod dag;
pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;
mod state;

pub use dag::{DependencyGraph, Edge, EdgeId, GraphvizLabel, NodeId};
pub use executor::PassContext;
pub use graph::{FrameStats, RenderGraph};
pub use pass::{PassAccess, PassBuilder, PassNode, QueueDependency};
pub use resource::{
    Access, AccessKind, GraphNode, LogicalResource, ResourceHandle, ResourceNode, ResourceOrigin,
};
pub use state::Transition;
