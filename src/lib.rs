//! Frame Graph - a per-frame render graph with culling and transient resource aliasing
//!
//! Rendering stages declare which resources they create, read and write. The
//! graph then:
//! - culls passes whose outputs no frame target depends on
//! - computes each transient resource's lifetime in pass indices
//! - places resources with disjoint lifetimes into shared device heaps
//! - records the state transitions every pass needs
//! - runs the surviving passes in declaration order
//!
//! # Example
//!
//! ```
//! use frame_graph::backend::*;
//! use frame_graph::{RenderGraph, ResourceHandle};
//!
//! #[derive(Clone, Copy, Default)]
//! struct Lighting {
//!     hdr: ResourceHandle,
//! }
//!
//! let mut device = DummyDevice::new();
//! let mut recorder = DummyCommandRecorder::new();
//! let mut graph = RenderGraph::default();
//!
//! let lighting = graph.add_pass(
//!     "lighting",
//!     QueueType::Graphics,
//!     |data: &mut Lighting, builder| {
//!         let desc = TextureDescriptor::new_2d(
//!             1280,
//!             720,
//!             TextureFormat::Rgba16Float,
//!             TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
//!         );
//!         let hdr = builder.create_texture(&desc, "hdr");
//!         data.hdr = builder.write(hdr, ResourceState::RenderTarget);
//!     },
//!     |data, ctx| {
//!         let target = ctx.view(data.hdr, &ViewDescriptor::render_target())?;
//!         ctx.recorder().begin_render_pass(&[target], None);
//!         ctx.recorder().draw(0..3, 0..1);
//!         ctx.recorder().end_render_pass();
//!         Ok(())
//!     },
//! );
//! graph.present(lighting.hdr);
//!
//! graph.compile(&mut device).unwrap();
//! graph.execute(&mut device, &mut recorder).unwrap();
//! graph.clear(&mut device);
//! ```

pub mod allocator;
pub mod backend;
pub mod config;
pub mod error;
pub mod render_graph;

pub use allocator::{Allocation, Lifetime, ResourceAllocator};
pub use config::FrameGraphConfig;
pub use error::{GraphError, GraphResult};
pub use render_graph::{
    FrameStats, PassBuilder, PassContext, QueueDependency, RenderGraph, ResourceHandle, Transition,
};
