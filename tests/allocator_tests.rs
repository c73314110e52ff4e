//! Integration tests for the transient resource allocator.

mod common;

use rstest::rstest;

use common::{color_target, init_logging, storage_buffer};
use frame_graph::allocator::initial_state_for;
use frame_graph::backend::*;
use frame_graph::{FrameGraphConfig, Lifetime, ResourceAllocator};

fn texture(format: TextureFormat, usage: TextureUsage) -> ResourceDescriptor {
    ResourceDescriptor::Texture(TextureDescriptor::new_2d(64, 64, format, usage))
}

#[rstest]
#[case::depth(
    texture(TextureFormat::Depth32Float, TextureUsage::RENDER_ATTACHMENT),
    ResourceState::DepthWrite
)]
#[case::color_target(
    ResourceDescriptor::Texture(color_target(64, 64)),
    ResourceState::RenderTarget
)]
#[case::storage_texture(
    texture(TextureFormat::R32Float, TextureUsage::STORAGE_BINDING),
    ResourceState::UnorderedAccess
)]
#[case::storage_buffer(
    ResourceDescriptor::Buffer(storage_buffer(512)),
    ResourceState::UnorderedAccess
)]
#[case::uniform_buffer(
    ResourceDescriptor::Buffer(BufferDescriptor::new(256, BufferUsage::UNIFORM)),
    ResourceState::Undefined
)]
#[case::sampled_texture(
    texture(TextureFormat::Rgba8Unorm, TextureUsage::TEXTURE_BINDING),
    ResourceState::Undefined
)]
fn test_fresh_resources_start_in_policy_state(
    #[case] desc: ResourceDescriptor,
    #[case] expected: ResourceState,
) {
    init_logging();
    let mut device = DummyDevice::new();
    let mut allocator = ResourceAllocator::new(&FrameGraphConfig::default());

    assert_eq!(initial_state_for(&desc), expected);
    let allocation = allocator
        .allocate(&mut device, Lifetime::new(0, 1), desc, "resource")
        .unwrap();
    assert!(!allocation.reused);
    assert_eq!(allocation.initial_state, expected);
}

#[rstest]
#[case::tiny(16, 64 * 1024)]
#[case::one_granule(128, 64 * 1024)]
#[case::three_granules(221, 256 * 1024)]
#[case::large(1024, 4 * 1024 * 1024)]
fn test_heap_size_for_square_targets(#[case] size: u32, #[case] heap_size: u64) {
    init_logging();
    let mut device = DummyDevice::new();
    let mut allocator = ResourceAllocator::new(&FrameGraphConfig::default());

    allocator
        .allocate_texture(&mut device, Lifetime::new(0, 0), &color_target(size, size), "target")
        .unwrap();
    assert_eq!(allocator.heaps()[0].size(), heap_size);
}

#[test]
fn test_many_disjoint_lifetimes_share_one_slot() {
    init_logging();
    let mut device = DummyDevice::new();
    let mut allocator = ResourceAllocator::new(&FrameGraphConfig::default());

    let allocations: Vec<_> = (0..8)
        .map(|pass| {
            let lifetime = Lifetime::new(pass, pass);
            allocator
                .allocate_texture(&mut device, lifetime, &color_target(128, 128), "temp")
                .unwrap()
        })
        .collect();

    assert!(allocations.iter().all(|a| a.resource == allocations[0].resource));
    assert_eq!(allocator.heap_count(), 1);
    assert_eq!(allocator.slot_count(), 1);
    assert_eq!(device.stats().textures_created, 1);
}

#[test]
fn test_smaller_granularity_gives_tighter_heaps() {
    init_logging();
    let mut device = DummyDevice::new();
    let config = FrameGraphConfig::default().with_heap_granularity(4 * 1024);
    let mut allocator = ResourceAllocator::new(&config);

    allocator
        .allocate_buffer(&mut device, Lifetime::new(0, 0), &storage_buffer(100), "small")
        .unwrap();
    // The dummy device aligns every placed resource to 64 KiB.
    assert_eq!(allocator.heaps()[0].size(), 64 * 1024);
    assert_eq!(allocator.heap_size_for(5 * 1024), 8 * 1024);
}
