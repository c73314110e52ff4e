//! Dummy backend for testing and tooling.
//!
//! This backend doesn't touch a GPU. It hands out unique handles, keeps track
//! of which objects are alive and records every command, so the frame graph
//! can be exercised and inspected without hardware.

use std::collections::{HashMap, HashSet};

use crate::backend::traits::*;
use crate::backend::types::*;

/// Placement alignment of placed resources.
pub const DUMMY_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Creation and destruction counters of a [`DummyDevice`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyDeviceStats {
    pub heaps_created: u32,
    pub heaps_destroyed: u32,
    pub textures_created: u32,
    pub textures_destroyed: u32,
    pub buffers_created: u32,
    pub buffers_destroyed: u32,
    pub views_created: u32,
    pub views_destroyed: u32,
}

/// Dummy device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_handle: u64,
    frame_index: u64,
    heaps: HashMap<HeapHandle, HeapDescriptor>,
    textures: HashMap<TextureHandle, Option<HeapHandle>>,
    buffers: HashMap<BufferHandle, Option<HeapHandle>>,
    views: HashSet<ViewHandle>,
    out_of_memory: bool,
    stats: DummyDeviceStats,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move on to the next frame.
    pub fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// Make every following heap or resource creation fail with `OutOfMemory`.
    pub fn set_out_of_memory(&mut self, out_of_memory: bool) {
        self.out_of_memory = out_of_memory;
    }

    pub fn stats(&self) -> DummyDeviceStats {
        self.stats
    }

    pub fn live_heaps(&self) -> usize {
        self.heaps.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_views(&self) -> usize {
        self.views.len()
    }

    pub fn is_texture_alive(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn is_view_alive(&self, view: ViewHandle) -> bool {
        self.views.contains(&view)
    }

    /// Heap a placed texture lives in, `None` for dedicated textures.
    pub fn texture_heap(&self, texture: TextureHandle) -> Option<HeapHandle> {
        self.textures.get(&texture).copied().flatten()
    }

    pub fn heap_descriptor(&self, heap: HeapHandle) -> Option<HeapDescriptor> {
        self.heaps.get(&heap).copied()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_placement(
        &self,
        heap: HeapHandle,
        offset: u64,
        size: u64,
        failed: fn(String) -> BackendError,
    ) -> BackendResult<()> {
        let Some(heap_desc) = self.heaps.get(&heap) else {
            return Err(failed(format!("heap {:?} does not exist", heap)));
        };
        if offset + size > heap_desc.size {
            return Err(BackendError::OutOfMemory);
        }
        Ok(())
    }
}

impl Device for DummyDevice {
    fn create_heap(&mut self, desc: &HeapDescriptor) -> BackendResult<HeapHandle> {
        if self.out_of_memory {
            return Err(BackendError::OutOfMemory);
        }
        if desc.size == 0 {
            return Err(BackendError::HeapCreationFailed(format!(
                "{:?} heap of zero bytes",
                desc.kind
            )));
        }
        let heap = HeapHandle(self.next());
        log::trace!(
            "DummyDevice: creating {:?} heap {:?} ({} bytes)",
            desc.kind,
            heap,
            desc.size
        );
        self.heaps.insert(heap, *desc);
        self.stats.heaps_created += 1;
        Ok(heap)
    }

    fn destroy_heap(&mut self, heap: HeapHandle) {
        let still_placed = self.textures.values().any(|h| *h == Some(heap))
            || self.buffers.values().any(|h| *h == Some(heap));
        assert!(!still_placed, "heap {:?} destroyed while resources live in it", heap);
        if self.heaps.remove(&heap).is_some() {
            self.stats.heaps_destroyed += 1;
        }
    }

    fn create_placed_texture(
        &mut self,
        heap: HeapHandle,
        offset: u64,
        desc: &TextureDescriptor,
        _initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<TextureHandle> {
        if self.out_of_memory {
            return Err(BackendError::OutOfMemory);
        }
        let size = self.texture_allocation_size(desc);
        self.check_placement(heap, offset, size, BackendError::TextureCreationFailed)?;
        let texture = TextureHandle(self.next());
        log::trace!(
            "DummyDevice: placing texture {:?} '{}' ({}x{}) in {:?}",
            texture,
            name,
            desc.width,
            desc.height,
            heap
        );
        self.textures.insert(texture, Some(heap));
        self.stats.textures_created += 1;
        Ok(texture)
    }

    fn create_placed_buffer(
        &mut self,
        heap: HeapHandle,
        offset: u64,
        desc: &BufferDescriptor,
        _initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<BufferHandle> {
        if self.out_of_memory {
            return Err(BackendError::OutOfMemory);
        }
        let size = self.buffer_allocation_size(desc);
        self.check_placement(heap, offset, size, BackendError::BufferCreationFailed)?;
        let buffer = BufferHandle(self.next());
        log::trace!(
            "DummyDevice: placing buffer {:?} '{}' ({} bytes) in {:?}",
            buffer,
            name,
            desc.size,
            heap
        );
        self.buffers.insert(buffer, Some(heap));
        self.stats.buffers_created += 1;
        Ok(buffer)
    }

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
        _initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<TextureHandle> {
        if self.out_of_memory {
            return Err(BackendError::OutOfMemory);
        }
        let texture = TextureHandle(self.next());
        log::trace!(
            "DummyDevice: creating texture {:?} '{}' ({}x{})",
            texture,
            name,
            desc.width,
            desc.height
        );
        self.textures.insert(texture, None);
        self.stats.textures_created += 1;
        Ok(texture)
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
        _initial_state: ResourceState,
        name: &str,
    ) -> BackendResult<BufferHandle> {
        if self.out_of_memory {
            return Err(BackendError::OutOfMemory);
        }
        let buffer = BufferHandle(self.next());
        log::trace!(
            "DummyDevice: creating buffer {:?} '{}' ({} bytes)",
            buffer,
            name,
            desc.size
        );
        self.buffers.insert(buffer, None);
        self.stats.buffers_created += 1;
        Ok(buffer)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.stats.textures_destroyed += 1;
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.stats.buffers_destroyed += 1;
        }
    }

    fn create_view(
        &mut self,
        resource: PhysicalResource,
        desc: &ViewDescriptor,
    ) -> BackendResult<ViewHandle> {
        let alive = match resource {
            PhysicalResource::Texture(texture) => self.textures.contains_key(&texture),
            PhysicalResource::Buffer(buffer) => self.buffers.contains_key(&buffer),
        };
        if !alive {
            return Err(BackendError::ViewCreationFailed(format!(
                "{:?} does not exist",
                resource
            )));
        }
        let view = ViewHandle(self.next());
        log::trace!("DummyDevice: creating {:?} view {:?} of {:?}", desc.kind, view, resource);
        self.views.insert(view);
        self.stats.views_created += 1;
        Ok(view)
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        if self.views.remove(&view) {
            self.stats.views_destroyed += 1;
        }
    }

    fn texture_allocation_size(&self, desc: &TextureDescriptor) -> u64 {
        let bpp = desc.format.bytes_per_pixel() as u64;
        let bytes: u64 = (0..desc.mip_levels)
            .map(|mip| {
                let width = (desc.width >> mip).max(1) as u64;
                let height = (desc.height >> mip).max(1) as u64;
                width * height * bpp
            })
            .sum();
        align_up(bytes * desc.depth_or_layers as u64, DUMMY_PLACEMENT_ALIGNMENT)
    }

    fn buffer_allocation_size(&self, desc: &BufferDescriptor) -> u64 {
        align_up(desc.size.max(1), DUMMY_PLACEMENT_ALIGNMENT)
    }

    fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

/// A command captured by [`DummyCommandRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginDebugScope(String),
    EndDebugScope,
    Transition {
        resource: PhysicalResource,
        before: ResourceState,
        after: ResourceState,
        subresource: Subresource,
    },
    BeginRenderPass {
        color: Vec<ViewHandle>,
        depth_stencil: Option<ViewHandle>,
    },
    EndRenderPass,
    Dispatch(u32, u32, u32),
    Draw {
        vertices: std::ops::Range<u32>,
        instances: std::ops::Range<u32>,
    },
}

/// Command recorder that stores everything it is asked to record.
#[derive(Debug, Default)]
pub struct DummyCommandRecorder {
    commands: Vec<RecordedCommand>,
}

impl DummyCommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Names of the debug scopes in the order they were opened.
    pub fn scopes(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::BeginDebugScope(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every recorded transition as `(resource, before, after)`.
    pub fn transitions(&self) -> Vec<(PhysicalResource, ResourceState, ResourceState)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::Transition {
                    resource,
                    before,
                    after,
                    ..
                } => Some((*resource, *before, *after)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl CommandRecorder for DummyCommandRecorder {
    fn begin_debug_scope(&mut self, name: &str) {
        self.commands
            .push(RecordedCommand::BeginDebugScope(name.to_string()));
    }

    fn end_debug_scope(&mut self) {
        self.commands.push(RecordedCommand::EndDebugScope);
    }

    fn transition(
        &mut self,
        resource: PhysicalResource,
        before: ResourceState,
        after: ResourceState,
        subresource: Subresource,
    ) {
        self.commands.push(RecordedCommand::Transition {
            resource,
            before,
            after,
            subresource,
        });
    }

    fn begin_render_pass(&mut self, color: &[ViewHandle], depth_stencil: Option<ViewHandle>) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            color: color.to_vec(),
            depth_stencil,
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch(x, y, z));
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        self.commands.push(RecordedCommand::Draw {
            vertices,
            instances,
        });
    }
}
