//! Transient resource allocator
//!
//! Maps logical resources with known pass lifetimes onto a small set of device
//! heaps. Resources whose lifetimes don't overlap share a heap, and an existing
//! slot with an identical description is reused before anything new is
//! created, which also carries the slot's last known state over to the new
//! owner. Slots and heaps nobody used for `grace_frames` frames are destroyed
//! by [`ResourceAllocator::reset`].
//!
//! Resources that must survive from one frame to the next unchanged (history
//! buffers) bypass lifetime aliasing and are recycled through a free list
//! keyed by their exact description instead.

mod descriptor_cache;
mod heap;

pub use descriptor_cache::DescriptorCache;
pub use heap::{AliasedResource, Heap, Lifetime};

use crate::backend::*;
use crate::config::FrameGraphConfig;
use crate::error::{GraphError, GraphResult};

/// Result of an allocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub resource: PhysicalResource,
    /// State the resource is currently in
    pub initial_state: ResourceState,
    /// Whether an existing resource was handed out instead of a new one
    pub reused: bool,
}

/// State a freshly created resource starts in.
pub fn initial_state_for(desc: &ResourceDescriptor) -> ResourceState {
    match desc {
        ResourceDescriptor::Texture(desc) if desc.format.is_depth_stencil() => {
            ResourceState::DepthWrite
        }
        ResourceDescriptor::Texture(desc)
            if desc.usage.contains(TextureUsage::RENDER_ATTACHMENT) =>
        {
            ResourceState::RenderTarget
        }
        ResourceDescriptor::Texture(desc) if desc.usage.contains(TextureUsage::STORAGE_BINDING) => {
            ResourceState::UnorderedAccess
        }
        ResourceDescriptor::Buffer(desc) if desc.usage.contains(BufferUsage::STORAGE) => {
            ResourceState::UnorderedAccess
        }
        _ => ResourceState::Undefined,
    }
}

/// A resource kept alive across frames outside of the heaps
#[derive(Debug)]
struct PersistentResource {
    resource: PhysicalResource,
    desc: ResourceDescriptor,
    state: ResourceState,
    name: String,
    last_used_frame: u64,
}

/// Heap-aliasing allocator for transient frame graph resources
#[derive(Debug)]
pub struct ResourceAllocator {
    heap_granularity: u64,
    grace_frames: u64,
    heaps: Vec<Heap>,
    descriptors: DescriptorCache,
    /// Non-overlapping resources currently handed out
    persistent: Vec<PersistentResource>,
    /// Non-overlapping resources waiting to be recycled
    free_list: Vec<PersistentResource>,
}

impl ResourceAllocator {
    pub fn new(config: &FrameGraphConfig) -> Self {
        Self {
            heap_granularity: config.heap_granularity,
            grace_frames: config.grace_frames,
            heaps: Vec::new(),
            descriptors: DescriptorCache::new(),
            persistent: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a texture alive for `lifetime`.
    pub fn allocate_texture(
        &mut self,
        device: &mut dyn Device,
        lifetime: Lifetime,
        desc: &TextureDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        self.allocate(device, lifetime, ResourceDescriptor::Texture(*desc), name)
    }

    /// Allocate a buffer alive for `lifetime`.
    pub fn allocate_buffer(
        &mut self,
        device: &mut dyn Device,
        lifetime: Lifetime,
        desc: &BufferDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        self.allocate(device, lifetime, ResourceDescriptor::Buffer(*desc), name)
    }

    /// Allocate a resource alive for `lifetime`.
    pub fn allocate(
        &mut self,
        device: &mut dyn Device,
        lifetime: Lifetime,
        desc: ResourceDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        let frame = device.frame_index();
        let size = match &desc {
            ResourceDescriptor::Texture(texture) => device.texture_allocation_size(texture),
            ResourceDescriptor::Buffer(buffer) => device.buffer_allocation_size(buffer),
        };
        if size == 0 {
            log::warn!("'{}' requested with a zero allocation size", name);
        }
        let kind = desc.heap_kind();

        // Prefer a heap with a matching free slot, then any heap with room.
        let reusable = self.heaps.iter().enumerate().find_map(|(index, heap)| {
            if !heap.can_hold(kind, size, &lifetime) {
                return None;
            }
            heap.find_reusable(&desc, &lifetime).map(|slot| (index, slot))
        });

        if let Some((heap_index, slot_index)) = reusable {
            let heap = &mut self.heaps[heap_index];
            let heap_handle = heap.handle();
            heap.claim(lifetime);
            let slot = &mut heap.resources[slot_index];
            slot.used = true;
            slot.lifetime = lifetime;
            slot.last_used_frame = frame;
            slot.owner = name.to_string();
            log::trace!(
                "  '{}' [{}, {}] - REUSE {:?} in {:?} (state {:?})",
                name,
                lifetime.first_pass,
                lifetime.last_pass,
                slot.resource,
                heap_handle,
                slot.state
            );
            return Ok(Allocation {
                resource: slot.resource,
                initial_state: slot.state,
                reused: true,
            });
        }

        let heap_index = match self
            .heaps
            .iter()
            .position(|heap| heap.can_hold(kind, size, &lifetime))
        {
            Some(index) => index,
            None => self.create_heap(device, kind, size, name)?,
        };

        let initial_state = initial_state_for(&desc);
        let heap = &mut self.heaps[heap_index];
        let resource = match &desc {
            ResourceDescriptor::Texture(texture) => device
                .create_placed_texture(heap.handle(), 0, texture, initial_state, name)
                .map(PhysicalResource::Texture),
            ResourceDescriptor::Buffer(buffer) => device
                .create_placed_buffer(heap.handle(), 0, buffer, initial_state, name)
                .map(PhysicalResource::Buffer),
        }
        .map_err(|source| GraphError::AllocationFailed {
            name: name.to_string(),
            source,
        })?;

        log::trace!(
            "  '{}' [{}, {}] - CREATE {:?} in {:?} (state {:?})",
            name,
            lifetime.first_pass,
            lifetime.last_pass,
            resource,
            heap.handle(),
            initial_state
        );

        heap.claim(lifetime);
        heap.resources.push(AliasedResource {
            resource,
            desc,
            lifetime,
            used: true,
            last_used_frame: frame,
            state: initial_state,
            owner: name.to_string(),
        });

        Ok(Allocation {
            resource,
            initial_state,
            reused: false,
        })
    }

    /// Heap size for a request: the power-of-two number of granules that fits it.
    pub fn heap_size_for(&self, size: u64) -> u64 {
        let granules = size.div_ceil(self.heap_granularity).max(1);
        granules.next_power_of_two() * self.heap_granularity
    }

    fn create_heap(
        &mut self,
        device: &mut dyn Device,
        kind: HeapKind,
        size: u64,
        name: &str,
    ) -> GraphResult<usize> {
        let desc = HeapDescriptor {
            size: self.heap_size_for(size),
            kind,
        };
        let handle = device
            .create_heap(&desc)
            .map_err(|source| GraphError::AllocationFailed {
                name: name.to_string(),
                source,
            })?;
        log::debug!(
            "Created {:?} heap {:?} of {} bytes for '{}'",
            kind,
            handle,
            desc.size,
            name
        );
        self.heaps.push(Heap::new(handle, &desc));
        Ok(self.heaps.len() - 1)
    }

    /// Physical resource that backed `name` in the previous frame, if it still
    /// exists with the same description.
    ///
    /// The slot is claimed for the whole current frame, so nothing else is
    /// placed in its heap until the next [`reset`](Self::reset).
    pub fn aliased_prev_resource(
        &mut self,
        device: &dyn Device,
        name: &str,
        desc: &ResourceDescriptor,
    ) -> Option<Allocation> {
        let frame = device.frame_index();
        let previous = frame.checked_sub(1)?;
        let lifetime = Lifetime::whole_frame();

        for heap in &mut self.heaps {
            let Some(index) = heap.resources.iter().position(|slot| {
                slot.owner == name && slot.desc == *desc && slot.last_used_frame == previous
            }) else {
                continue;
            };
            if !heap.can_hold(heap.kind(), 0, &lifetime) {
                return None;
            }
            heap.claim(lifetime);
            let slot = &mut heap.resources[index];
            slot.used = true;
            slot.lifetime = lifetime;
            slot.last_used_frame = frame;
            return Some(Allocation {
                resource: slot.resource,
                initial_state: slot.state,
                reused: true,
            });
        }
        None
    }

    /// Hand out a texture that keeps its contents across frames.
    pub fn allocate_non_overlapping_texture(
        &mut self,
        device: &mut dyn Device,
        desc: &TextureDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        self.allocate_non_overlapping(device, ResourceDescriptor::Texture(*desc), name)
    }

    /// Hand out a buffer that keeps its contents across frames.
    pub fn allocate_non_overlapping_buffer(
        &mut self,
        device: &mut dyn Device,
        desc: &BufferDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        self.allocate_non_overlapping(device, ResourceDescriptor::Buffer(*desc), name)
    }

    fn allocate_non_overlapping(
        &mut self,
        device: &mut dyn Device,
        desc: ResourceDescriptor,
        name: &str,
    ) -> GraphResult<Allocation> {
        let frame = device.frame_index();

        if let Some(index) = self.free_list.iter().position(|entry| entry.desc == desc) {
            let mut entry = self.free_list.swap_remove(index);
            entry.name = name.to_string();
            entry.last_used_frame = frame;
            let allocation = Allocation {
                resource: entry.resource,
                initial_state: entry.state,
                reused: true,
            };
            log::trace!("  '{}' - RECYCLE {:?}", name, entry.resource);
            self.persistent.push(entry);
            return Ok(allocation);
        }

        let initial_state = initial_state_for(&desc);
        let resource = match &desc {
            ResourceDescriptor::Texture(texture) => device
                .create_texture(texture, initial_state, name)
                .map(PhysicalResource::Texture),
            ResourceDescriptor::Buffer(buffer) => device
                .create_buffer(buffer, initial_state, name)
                .map(PhysicalResource::Buffer),
        }
        .map_err(|source| GraphError::AllocationFailed {
            name: name.to_string(),
            source,
        })?;

        log::trace!("  '{}' - CREATE persistent {:?}", name, resource);
        self.persistent.push(PersistentResource {
            resource,
            desc,
            state: initial_state,
            name: name.to_string(),
            last_used_frame: frame,
        });
        Ok(Allocation {
            resource,
            initial_state,
            reused: false,
        })
    }

    /// Return a non-overlapping texture to the free list, left in `state`.
    pub fn free_non_overlapping_texture(
        &mut self,
        device: &dyn Device,
        texture: TextureHandle,
        state: ResourceState,
    ) {
        self.free_non_overlapping(device, PhysicalResource::Texture(texture), state);
    }

    /// Return a non-overlapping resource to the free list, left in `state`.
    pub fn free_non_overlapping(
        &mut self,
        device: &dyn Device,
        resource: PhysicalResource,
        state: ResourceState,
    ) {
        let index = self
            .persistent
            .iter()
            .position(|entry| entry.resource == resource);
        let Some(index) = index else {
            panic!("{:?} was not allocated as a non-overlapping resource", resource);
        };
        let mut entry = self.persistent.swap_remove(index);
        entry.state = state;
        entry.last_used_frame = device.frame_index();
        self.free_list.push(entry);
    }

    /// Destroy a resource owned by the allocator right away, with its views.
    pub fn free(&mut self, device: &mut dyn Device, resource: PhysicalResource) {
        let persistent = self.persistent.iter().position(|e| e.resource == resource);
        let owned = if let Some(index) = persistent {
            self.persistent.swap_remove(index);
            true
        } else if let Some(index) = self.free_list.iter().position(|e| e.resource == resource) {
            self.free_list.swap_remove(index);
            true
        } else {
            self.heaps.iter_mut().any(|heap| {
                let slot = heap.resources.iter().position(|slot| slot.resource == resource);
                let Some(index) = slot else {
                    return false;
                };
                assert!(
                    !heap.resources[index].used,
                    "{:?} freed while in use this frame",
                    resource
                );
                heap.resources.swap_remove(index);
                true
            })
        };
        assert!(owned, "{:?} is not owned by the allocator", resource);

        self.descriptors.delete(device, resource);
        destroy_resource(device, resource);
    }

    /// Record the state `resource` was left in by the last pass touching it.
    pub fn set_resource_state(&mut self, resource: PhysicalResource, state: ResourceState) {
        for heap in &mut self.heaps {
            if let Some(slot) = heap.slot_mut(resource) {
                slot.state = state;
                return;
            }
        }
        if let Some(entry) = self.persistent.iter_mut().find(|e| e.resource == resource) {
            entry.state = state;
        }
    }

    /// Cached view of `resource` matching `desc`, created on first request.
    pub fn get_descriptor(
        &mut self,
        device: &mut dyn Device,
        resource: PhysicalResource,
        desc: &ViewDescriptor,
    ) -> GraphResult<ViewHandle> {
        Ok(self.descriptors.get_or_create(device, resource, desc)?)
    }

    /// Destroy every cached view of `resource`.
    pub fn delete_descriptor(&mut self, device: &mut dyn Device, resource: PhysicalResource) {
        let deleted = self.descriptors.delete(device, resource);
        if deleted > 0 {
            log::trace!("Deleted {} views of {:?}", deleted, resource);
        }
    }

    /// Start a new frame: evict slots unused for longer than the grace period,
    /// destroy heaps left empty, and forget the previous frame's claims.
    pub fn reset(&mut self, device: &mut dyn Device) {
        let frame = device.frame_index();
        let grace_frames = self.grace_frames;
        let mut evicted = 0;

        for heap in &mut self.heaps {
            for slot in heap.take_expired(frame, grace_frames) {
                self.descriptors.delete(device, slot.resource);
                destroy_resource(device, slot.resource);
                evicted += 1;
            }
            heap.begin_frame();
        }

        let heaps_before = self.heaps.len();
        self.heaps.retain(|heap| {
            if heap.resources().is_empty() {
                device.destroy_heap(heap.handle());
                false
            } else {
                true
            }
        });

        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.free_list)
            .into_iter()
            .partition(|entry| frame.saturating_sub(entry.last_used_frame) > grace_frames);
        self.free_list = kept;
        for entry in expired {
            self.descriptors.delete(device, entry.resource);
            destroy_resource(device, entry.resource);
            evicted += 1;
        }

        if evicted > 0 || heaps_before != self.heaps.len() {
            log::debug!(
                "Allocator reset at frame {}: evicted {} resources, destroyed {} heaps",
                frame,
                evicted,
                heaps_before - self.heaps.len()
            );
        }
    }

    /// Destroy everything the allocator owns.
    pub fn destroy(&mut self, device: &mut dyn Device) {
        self.descriptors.clear(device);
        for heap in self.heaps.drain(..) {
            for slot in &heap.resources {
                destroy_resource(device, slot.resource);
            }
            device.destroy_heap(heap.handle());
        }
        for entry in self.persistent.drain(..).chain(self.free_list.drain(..)) {
            destroy_resource(device, entry.resource);
        }
    }

    pub fn heaps(&self) -> &[Heap] {
        &self.heaps
    }

    pub fn heap_count(&self) -> usize {
        self.heaps.len()
    }

    /// Number of aliased slots across all heaps
    pub fn slot_count(&self) -> usize {
        self.heaps.iter().map(|heap| heap.resources().len()).sum()
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Non-overlapping resources waiting in the free list
    pub fn free_list_len(&self) -> usize {
        self.free_list.len()
    }

    pub fn contains_descriptor(&self, view: ViewHandle) -> bool {
        self.descriptors.contains(view)
    }
}

fn destroy_resource(device: &mut dyn Device, resource: PhysicalResource) {
    match resource {
        PhysicalResource::Texture(texture) => device.destroy_texture(texture),
        PhysicalResource::Buffer(buffer) => device.destroy_buffer(buffer),
    }
}
