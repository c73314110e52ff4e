//! Device and command recording contracts
//!
//! The frame graph never talks to a native graphics API directly. It creates
//! memory through a [`Device`] and records state transitions and pass scopes
//! through a [`CommandRecorder`]; both are implemented by the host renderer.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create heap: {0}")]
    HeapCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create view: {0}")]
    ViewCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Resource and memory creation
pub trait Device {
    /// Create a memory heap that placed resources can be created in
    fn create_heap(&mut self, desc: &HeapDescriptor) -> BackendResult<HeapHandle>;

    /// Destroy a heap. Every resource placed in it must already be destroyed.
    fn destroy_heap(&mut self, heap: HeapHandle);

    /// Create a texture at `offset` inside `heap`
    fn create_placed_texture(
        &mut self,
        heap: HeapHandle,
        offset: u64,
        desc: &TextureDescriptor,
        initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<TextureHandle>;

    /// Create a buffer at `offset` inside `heap`
    fn create_placed_buffer(
        &mut self,
        heap: HeapHandle,
        offset: u64,
        desc: &BufferDescriptor,
        initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<BufferHandle>;

    /// Create a texture with its own dedicated memory
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
        initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<TextureHandle>;

    /// Create a buffer with its own dedicated memory
    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
        initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<BufferHandle>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Create a shader-read, read/write or attachment view of a resource
    fn create_view(
        &mut self,
        resource: PhysicalResource,
        desc: &ViewDescriptor,
    ) -> BackendResult<ViewHandle>;

    fn destroy_view(&mut self, view: ViewHandle);

    /// Bytes a placed texture with this description occupies
    fn texture_allocation_size(&self, desc: &TextureDescriptor) -> u64;

    /// Bytes a placed buffer with this description occupies
    fn buffer_allocation_size(&self, desc: &BufferDescriptor) -> u64;

    /// Monotonic index of the frame currently being recorded
    fn frame_index(&self) -> u64;
}

/// Command recording used while executing a compiled graph
pub trait CommandRecorder {
    /// Open a named debug scope
    fn begin_debug_scope(&mut self, name: &str);

    /// Close the innermost debug scope
    fn end_debug_scope(&mut self);

    /// Record an explicit state transition
    fn transition(
        &mut self,
        resource: PhysicalResource,
        before: ResourceState,
        after: ResourceState,
        subresource: Subresource,
    );

    /// Bind attachments and begin a render pass
    fn begin_render_pass(&mut self, color: &[ViewHandle], depth_stencil: Option<ViewHandle>);

    /// End the current render pass
    fn end_render_pass(&mut self);

    /// Dispatch compute work
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Draw primitives
    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>);
}
