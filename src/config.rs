//! Frame graph configuration

use crate::backend::ResourceState;

/// Configuration for a [`RenderGraph`](crate::RenderGraph) and its allocator
#[derive(Debug, Clone)]
pub struct FrameGraphConfig {
    /// Heaps are sized in power-of-two multiples of this many bytes
    pub heap_granularity: u64,
    /// Frames an unused aliased resource survives before it is destroyed
    pub grace_frames: u64,
    /// State presented resources are left in after the last pass
    pub present_state: ResourceState,
}

impl FrameGraphConfig {
    pub fn with_heap_granularity(mut self, heap_granularity: u64) -> Self {
        assert!(heap_granularity > 0, "heap granularity must be non-zero");
        self.heap_granularity = heap_granularity;
        self
    }

    pub fn with_grace_frames(mut self, grace_frames: u64) -> Self {
        self.grace_frames = grace_frames;
        self
    }

    pub fn with_present_state(mut self, present_state: ResourceState) -> Self {
        self.present_state = present_state;
        self
    }
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            heap_granularity: 64 * 1024,
            grace_frames: 30,
            present_state: ResourceState::Present,
        }
    }
}
