//! Heaps and the aliased resources placed in them

use crate::backend::{
    HeapDescriptor, HeapHandle, HeapKind, PhysicalResource, ResourceDescriptor, ResourceState,
};

/// Inclusive range of pass indices a resource is alive for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lifetime {
    pub first_pass: usize,
    pub last_pass: usize,
}

impl Lifetime {
    pub fn new(first_pass: usize, last_pass: usize) -> Self {
        assert!(
            first_pass <= last_pass,
            "lifetime starts at pass {} after it ends at pass {}",
            first_pass,
            last_pass
        );
        Self {
            first_pass,
            last_pass,
        }
    }

    /// Lifetime spanning the whole frame.
    pub fn whole_frame() -> Self {
        Self::new(0, usize::MAX)
    }

    pub fn overlaps(&self, other: &Lifetime) -> bool {
        self.first_pass <= other.last_pass && other.first_pass <= self.last_pass
    }

    /// Grow the range so that it includes `pass`.
    pub fn include(&mut self, pass: usize) {
        self.first_pass = self.first_pass.min(pass);
        self.last_pass = self.last_pass.max(pass);
    }
}

/// A physical resource slot inside a heap.
///
/// Every slot is placed at the base of its heap, so two slots of the same heap
/// always share memory.
#[derive(Debug)]
pub struct AliasedResource {
    pub(crate) resource: PhysicalResource,
    pub(crate) desc: ResourceDescriptor,
    pub(crate) lifetime: Lifetime,
    pub(crate) used: bool,
    pub(crate) last_used_frame: u64,
    pub(crate) state: ResourceState,
    /// Name of the logical resource that last occupied the slot
    pub(crate) owner: String,
}

impl AliasedResource {
    pub fn resource(&self) -> PhysicalResource {
        self.resource
    }

    pub fn desc(&self) -> &ResourceDescriptor {
        &self.desc
    }

    /// Lifetime of the most recent claim. Only meaningful while [`is_used`](Self::is_used).
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Whether the slot backs a logical resource in the current frame
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn last_used_frame(&self) -> u64 {
        self.last_used_frame
    }

    /// State the resource was left in by its last user
    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// A memory arena holding aliased resources
#[derive(Debug)]
pub struct Heap {
    handle: HeapHandle,
    kind: HeapKind,
    size: u64,
    pub(crate) resources: Vec<AliasedResource>,
    /// Lifetimes claimed in this heap during the current frame
    claims: Vec<Lifetime>,
}

impl Heap {
    pub(crate) fn new(handle: HeapHandle, desc: &HeapDescriptor) -> Self {
        Self {
            handle,
            kind: desc.kind,
            size: desc.size,
            resources: Vec::new(),
            claims: Vec::new(),
        }
    }

    pub fn handle(&self) -> HeapHandle {
        self.handle
    }

    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn resources(&self) -> &[AliasedResource] {
        &self.resources
    }

    pub fn claims(&self) -> &[Lifetime] {
        &self.claims
    }

    /// Whether a resource of `size` bytes alive for `lifetime` fits without
    /// overlapping anything already claimed this frame.
    pub fn can_hold(&self, kind: HeapKind, size: u64, lifetime: &Lifetime) -> bool {
        self.kind == kind
            && self.size >= size
            && !self.claims.iter().any(|claim| claim.overlaps(lifetime))
    }

    /// Index of a slot with exactly this description that is free for `lifetime`.
    pub(crate) fn find_reusable(
        &self,
        desc: &ResourceDescriptor,
        lifetime: &Lifetime,
    ) -> Option<usize> {
        self.resources.iter().position(|slot| {
            slot.desc == *desc && (!slot.used || !slot.lifetime.overlaps(lifetime))
        })
    }

    pub(crate) fn claim(&mut self, lifetime: Lifetime) {
        self.claims.push(lifetime);
    }

    pub(crate) fn slot_mut(&mut self, resource: PhysicalResource) -> Option<&mut AliasedResource> {
        self.resources.iter_mut().find(|slot| slot.resource == resource)
    }

    /// Remove and return the slots unused for more than `grace_frames` frames.
    pub(crate) fn take_expired(&mut self, frame: u64, grace_frames: u64) -> Vec<AliasedResource> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.resources)
            .into_iter()
            .partition(|slot| frame.saturating_sub(slot.last_used_frame) > grace_frames);
        self.resources = kept;
        expired
    }

    /// Forget this frame's claims.
    pub(crate) fn begin_frame(&mut self) {
        self.claims.clear();
        for slot in &mut self.resources {
            slot.used = false;
        }
    }
}
