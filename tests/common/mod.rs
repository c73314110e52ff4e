//! Common utilities for frame graph integration tests.

#![allow(dead_code)]

use frame_graph::backend::*;
use frame_graph::{FrameGraphConfig, RenderGraph};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A graph together with the dummy device and recorder it runs on.
pub struct TestContext {
    pub device: DummyDevice,
    pub recorder: DummyCommandRecorder,
    pub graph: RenderGraph,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(FrameGraphConfig::default())
    }

    pub fn with_config(config: FrameGraphConfig) -> Self {
        init_logging();
        Self {
            device: DummyDevice::new(),
            recorder: DummyCommandRecorder::new(),
            graph: RenderGraph::new(config),
        }
    }

    pub fn compile(&mut self) {
        self.graph.compile(&mut self.device).unwrap();
    }

    /// Compile and execute the declared frame.
    pub fn run(&mut self) {
        self.compile();
        self.graph
            .execute(&mut self.device, &mut self.recorder)
            .unwrap();
    }

    /// Clear the graph and move the device to the next frame.
    pub fn end_frame(&mut self) {
        self.graph.clear(&mut self.device);
        self.device.advance_frame();
        self.recorder.clear();
    }

    /// Number of heaps of `kind` currently owned by the allocator.
    pub fn heaps_of_kind(&self, kind: HeapKind) -> usize {
        self.graph
            .allocator()
            .heaps()
            .iter()
            .filter(|heap| heap.kind() == kind)
            .count()
    }
}

pub fn color_target(width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor::new_2d(
        width,
        height,
        TextureFormat::Rgba8Unorm,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

pub fn sampled_texture(width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor::new_2d(
        width,
        height,
        TextureFormat::Rgba8Unorm,
        TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
    )
}

pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(size, BufferUsage::STORAGE)
}
