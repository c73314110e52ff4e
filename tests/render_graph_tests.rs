//! Integration tests for the render graph.
//!
//! Every test runs against the dummy backend, which records commands and
//! tracks object lifetimes without a GPU.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use common::{TestContext, color_target, sampled_texture, storage_buffer};
use frame_graph::backend::*;
use frame_graph::{FrameGraphConfig, GraphError, QueueDependency, RenderGraph, ResourceHandle};

#[derive(Clone, Copy, Default)]
struct Single {
    output: ResourceHandle,
}

#[derive(Clone, Copy, Default)]
struct ReadWrite {
    input: ResourceHandle,
    output: ResourceHandle,
}

/// Pass A writes T, pass B reads T and writes O, O is presented.
fn build_two_pass_frame(
    graph: &mut RenderGraph,
    log: &Rc<RefCell<Vec<&'static str>>>,
) -> (Single, ReadWrite) {
    let a_log = log.clone();
    let a = graph.add_pass(
        "A",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let t = builder.create_texture(&color_target(256, 256), "T");
            data.output = builder.write(t, ResourceState::RenderTarget);
        },
        move |_, _| {
            a_log.borrow_mut().push("A");
            Ok(())
        },
    );

    let b_log = log.clone();
    let b = graph.add_pass(
        "B",
        QueueType::Graphics,
        |data: &mut ReadWrite, builder| {
            data.input = builder.read(a.output, ResourceState::ShaderRead);
            let o = builder.create_texture(&color_target(128, 128), "O");
            data.output = builder.write(o, ResourceState::RenderTarget);
        },
        move |_, _| {
            b_log.borrow_mut().push("B");
            Ok(())
        },
    );
    graph.present(b.output);
    (a, b)
}

// ============================================================================
// Versioning
// ============================================================================

/// N writes produce N+1 versions, and a read between the k-th and the
/// (k+1)-th write sees version k.
#[rstest]
#[case::one_write(1)]
#[case::three_writes(3)]
#[case::eight_writes(8)]
fn test_versions_follow_writes(#[case] writes: u32) {
    let mut ctx = TestContext::new();
    let mut handle = ctx.graph.create_texture(&color_target(64, 64), "accumulator");
    assert_eq!(handle.version(), 0);

    for k in 0..writes {
        let written: Single = ctx.graph.add_pass(
            &format!("write{}", k),
            QueueType::Graphics,
            |data: &mut Single, builder| {
                data.output = builder.write(handle, ResourceState::RenderTarget);
            },
            |_, _| Ok(()),
        );
        assert_eq!(written.output.version(), k + 1);
        handle = written.output;

        let read: ReadWrite = ctx.graph.add_pass(
            &format!("read{}", k),
            QueueType::Graphics,
            |data: &mut ReadWrite, builder| {
                data.input = builder.read(handle, ResourceState::ShaderRead);
                builder.side_effect();
            },
            |_, _| Ok(()),
        );
        assert_eq!(read.input.version(), k + 1);
    }

    ctx.graph.present(handle);
    ctx.run();

    assert_eq!(ctx.graph.resource(handle).version_count(), writes as usize + 1);
    assert_eq!(ctx.graph.stats().executed_passes, 2 * writes as usize);
}

#[test]
#[should_panic(expected = "'color' v0 written after v1 was written")]
fn test_writing_stale_handle_panics() {
    let mut ctx = TestContext::new();
    let color = ctx.graph.create_texture(&color_target(64, 64), "color");
    for name in ["first", "second"] {
        ctx.graph.add_pass(
            name,
            QueueType::Graphics,
            |_: &mut (), builder| {
                builder.write(color, ResourceState::RenderTarget);
            },
            |_, _| Ok(()),
        );
    }
}

#[test]
#[should_panic(expected = "belongs to another frame")]
fn test_handle_from_previous_frame_panics() {
    let mut ctx = TestContext::new();
    let color = ctx.graph.create_texture(&color_target(64, 64), "color");
    ctx.end_frame();

    ctx.graph.present(color);
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn test_reader_sees_writer_output() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = build_two_pass_frame(&mut ctx.graph, &log);
    ctx.run();

    assert!(!ctx.graph.pass(0).is_culled());
    assert!(!ctx.graph.pass(1).is_culled());
    assert_eq!(b.input, a.output);
    assert_eq!(b.input.version(), 1);
    assert_eq!(ctx.graph.pass(1).accesses()[0].handle.version(), 1);
    assert_eq!(*log.borrow(), vec!["A", "B"]);
    assert_eq!(ctx.recorder.scopes(), vec!["A", "B"]);
}

#[test]
fn test_pass_without_consumers_is_culled() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    build_two_pass_frame(&mut ctx.graph, &log);

    let c_log = log.clone();
    let c: Single = ctx.graph.add_pass(
        "C",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let u = builder.create_texture(&color_target(32, 32), "U");
            data.output = builder.write(u, ResourceState::RenderTarget);
        },
        move |_, _| {
            c_log.borrow_mut().push("C");
            Ok(())
        },
    );
    ctx.run();

    let pass = ctx.graph.find_pass("C").unwrap();
    assert!(pass.is_culled());
    assert!(ctx.graph.is_culled(c.output));
    assert_eq!(ctx.graph.physical(c.output), None);
    assert_eq!(*log.borrow(), vec!["A", "B"]);
    assert_eq!(ctx.graph.stats().culled_passes, 1);
    assert_eq!(ctx.graph.stats().executed_passes, 2);
}

#[test]
fn test_culling_removes_whole_unused_chain() {
    let mut ctx = TestContext::new();
    let first: Single = ctx.graph.add_pass(
        "debug_prepare",
        QueueType::Compute,
        |data: &mut Single, builder| {
            let buffer = builder.create_buffer(&storage_buffer(1024), "debug_lines");
            data.output = builder.write(buffer, ResourceState::UnorderedAccess);
        },
        |_, _| Ok(()),
    );
    ctx.graph.add_pass(
        "debug_draw",
        QueueType::Graphics,
        |data: &mut ReadWrite, builder| {
            data.input = builder.read(first.output, ResourceState::ShaderRead);
            let overlay = builder.create_texture(&color_target(64, 64), "overlay");
            data.output = builder.write(overlay, ResourceState::RenderTarget);
        },
        |_, _| Ok(()),
    );
    ctx.compile();

    assert!(ctx.graph.passes().iter().all(|pass| pass.is_culled()));
    assert_eq!(ctx.graph.stats().realized_resources, 0);
    assert_eq!(ctx.graph.allocator().heap_count(), 0);
}

#[test]
#[should_panic(expected = "used culled resource 'U'")]
fn test_using_culled_resource_panics() {
    let mut ctx = TestContext::new();
    let culled: Single = ctx.graph.add_pass(
        "C",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let u = builder.create_texture(&color_target(32, 32), "U");
            data.output = builder.write(u, ResourceState::RenderTarget);
        },
        |_, _| Ok(()),
    );
    let live: Single = ctx.graph.add_pass(
        "live",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let color = builder.create_texture(&color_target(32, 32), "color");
            data.output = builder.write(color, ResourceState::RenderTarget);
        },
        move |_, pass| {
            pass.texture(culled.output);
            Ok(())
        },
    );
    ctx.graph.present(live.output);
    ctx.run();
}

// ============================================================================
// Aliasing
// ============================================================================

/// Ten passes all append to a shared log buffer. X is written at `x.0` and
/// read until `x.1`, Y likewise.
fn build_lifetime_frame(
    graph: &mut RenderGraph,
    x: (usize, usize),
    y: (usize, usize),
) -> (ResourceHandle, ResourceHandle) {
    let mut log = graph.create_buffer(&storage_buffer(256), "log");
    let mut x_handle = graph.create_texture(&color_target(256, 256), "X");
    let mut y_handle = graph.create_texture(&color_target(256, 256), "Y");
    let (first_x, first_y) = (x_handle, y_handle);

    for index in 0..10 {
        graph.add_pass(
            &format!("pass{}", index),
            QueueType::Graphics,
            |_: &mut (), builder| {
                log = builder.write(log, ResourceState::UnorderedAccess);
                for (range, handle) in [(x, &mut x_handle), (y, &mut y_handle)] {
                    if index == range.0 {
                        *handle = builder.write(*handle, ResourceState::RenderTarget);
                    } else if index > range.0 && index <= range.1 {
                        builder.read(*handle, ResourceState::ShaderRead);
                    }
                }
            },
            |_, _| Ok(()),
        );
    }
    graph.make_target(log);
    (first_x, first_y)
}

#[rstest]
#[case::disjoint((2, 4), (6, 8), true)]
#[case::adjacent((0, 3), (4, 9), true)]
#[case::touching((2, 4), (4, 8), false)]
#[case::nested((1, 8), (3, 5), false)]
fn test_lifetime_aliasing(
    #[case] x: (usize, usize),
    #[case] y: (usize, usize),
    #[case] shared: bool,
) {
    let mut ctx = TestContext::new();
    let (x_handle, y_handle) = build_lifetime_frame(&mut ctx.graph, x, y);
    ctx.run();

    let x_resource = ctx.graph.resource(x_handle);
    let y_resource = ctx.graph.resource(y_handle);
    assert_eq!(x_resource.lifetime().unwrap().first_pass, x.0);
    assert_eq!(x_resource.lifetime().unwrap().last_pass, x.1);
    assert_eq!(y_resource.lifetime().unwrap().first_pass, y.0);
    assert_eq!(y_resource.lifetime().unwrap().last_pass, y.1);

    assert_eq!(x_resource.physical() == y_resource.physical(), shared);
    assert_eq!(y_resource.is_reused(), shared);
    let expected_heaps = if shared { 1 } else { 2 };
    assert_eq!(ctx.heaps_of_kind(HeapKind::RenderTargets), expected_heaps);

    // No heap ever holds two overlapping claims.
    for heap in ctx.graph.allocator().heaps() {
        let claims = heap.claims();
        for (i, a) in claims.iter().enumerate() {
            for b in &claims[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?} in {:?}", a, b, heap.handle());
            }
        }
    }
}

#[test]
fn test_aliased_slot_hands_state_to_next_owner() {
    let mut ctx = TestContext::new();
    let (x_handle, y_handle) = build_lifetime_frame(&mut ctx.graph, (2, 4), (6, 8));
    ctx.run();

    let physical = ctx.graph.physical(x_handle).unwrap();
    assert_eq!(ctx.graph.physical(y_handle), Some(physical));

    // X ends in shader-read after pass 4; Y's first write in pass 6 starts there.
    let transitions = ctx.graph.pass(6).transitions();
    assert!(transitions.iter().any(|t| t.resource == physical
        && t.before == ResourceState::ShaderRead
        && t.after == ResourceState::RenderTarget));
}

#[test]
fn test_resources_are_reused_across_frames() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (a, _) = build_two_pass_frame(&mut ctx.graph, &log);
    ctx.run();
    let first = ctx.graph.physical(a.output).unwrap();
    assert_eq!(ctx.graph.final_state(a.output), Some(ResourceState::ShaderRead));
    ctx.end_frame();

    let (a, _) = build_two_pass_frame(&mut ctx.graph, &log);
    ctx.run();

    assert_eq!(ctx.graph.physical(a.output), Some(first));
    assert!(ctx.graph.resource(a.output).is_reused());
    assert_eq!(ctx.graph.resource(a.output).initial_state(), ResourceState::ShaderRead);
    assert_eq!(ctx.graph.stats().reused_resources, 2);
    assert_eq!(ctx.device.stats().textures_created, 2);
    assert_eq!(
        ctx.graph.pass(0).transitions()[0].before,
        ResourceState::ShaderRead
    );
}

#[test]
fn test_target_outputs_are_not_aliased() {
    let mut ctx = TestContext::new();
    let mut targets = Vec::new();
    for name in ["debug_a", "debug_b"] {
        let pass: Single = ctx.graph.add_pass(
            name,
            QueueType::Graphics,
            |data: &mut Single, builder| {
                let target = builder.create_texture(&color_target(64, 64), name);
                data.output = builder.write(target, ResourceState::RenderTarget);
            },
            |_, _| Ok(()),
        );
        ctx.graph.make_target(pass.output);
        targets.push(pass.output);
    }
    ctx.run();

    let pass_count = ctx.graph.passes().len();
    for target in &targets {
        let lifetime = ctx.graph.resource(*target).lifetime().unwrap();
        assert_eq!(lifetime.last_pass, pass_count);
    }
    assert_ne!(ctx.graph.physical(targets[0]), ctx.graph.physical(targets[1]));
    assert_eq!(ctx.device.stats().textures_created, 2);
}

// ============================================================================
// Views
// ============================================================================

#[test]
fn test_same_view_from_two_passes() {
    let mut ctx = TestContext::new();
    let views = Rc::new(RefCell::new(Vec::new()));

    let source: Single = ctx.graph.add_pass(
        "upload",
        QueueType::Copy,
        |data: &mut Single, builder| {
            let texture = builder.create_texture(&sampled_texture(64, 64), "albedo");
            data.output = builder.write(texture, ResourceState::CopyDst);
        },
        |_, _| Ok(()),
    );

    for name in ["blur_h", "blur_v"] {
        let pass_views = views.clone();
        let input = source.output;
        let pass: Single = ctx.graph.add_pass(
            name,
            QueueType::Graphics,
            |data: &mut Single, builder| {
                builder.read(input, ResourceState::ShaderRead);
                let target = builder.create_texture(&color_target(64, 64), name);
                data.output = builder.write(target, ResourceState::RenderTarget);
            },
            move |_, pass| {
                let view = pass.view(input, &ViewDescriptor::shader_read())?;
                pass_views.borrow_mut().push(view);
                Ok(())
            },
        );
        ctx.graph.make_target(pass.output);
    }
    ctx.run();

    let views = views.borrow();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0], views[1]);
    assert_eq!(ctx.device.stats().views_created, 1);

    let physical = ctx.graph.physical(source.output).unwrap();
    ctx.graph
        .allocator_mut()
        .delete_descriptor(&mut ctx.device, physical);
    assert!(!ctx.device.is_view_alive(views[0]));
    assert!(!ctx.graph.allocator().contains_descriptor(views[0]));
}

// ============================================================================
// Eviction
// ============================================================================

#[rstest]
#[case::one_frame(1, true)]
#[case::at_threshold(2, true)]
#[case::past_threshold(3, false)]
#[case::long_unused(10, false)]
fn test_grace_period_eviction(#[case] unused_frames: u64, #[case] retained: bool) {
    let mut ctx = TestContext::with_config(FrameGraphConfig::default().with_grace_frames(2));
    let log = Rc::new(RefCell::new(Vec::new()));
    build_two_pass_frame(&mut ctx.graph, &log);
    ctx.run();
    ctx.end_frame();

    for _ in 0..unused_frames {
        ctx.run();
        ctx.end_frame();
    }

    let expected = if retained { 2 } else { 0 };
    assert_eq!(ctx.graph.allocator().slot_count(), expected);
    assert_eq!(ctx.device.live_textures(), expected);
    assert_eq!(ctx.device.live_heaps(), expected);
}

// ============================================================================
// Transitions and presentation
// ============================================================================

#[test]
fn test_imported_backbuffer_is_transitioned_back_to_present() {
    let mut ctx = TestContext::new();
    let desc = color_target(1920, 1080);
    let texture = ctx
        .device
        .create_texture(&desc, ResourceState::Present, "swapchain")
        .unwrap();

    let backbuffer = ctx
        .graph
        .import_texture("backbuffer", texture, &desc, ResourceState::Present);
    let draw: Single = ctx.graph.add_pass(
        "draw",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            data.output = builder.write(backbuffer, ResourceState::RenderTarget);
        },
        |_, _| Ok(()),
    );
    ctx.graph.present(draw.output);
    ctx.run();

    let resource = PhysicalResource::Texture(texture);
    assert_eq!(
        ctx.recorder.commands(),
        &[
            RecordedCommand::BeginDebugScope("draw".to_string()),
            RecordedCommand::Transition {
                resource,
                before: ResourceState::Present,
                after: ResourceState::RenderTarget,
                subresource: Subresource::All,
            },
            RecordedCommand::EndDebugScope,
            RecordedCommand::Transition {
                resource,
                before: ResourceState::RenderTarget,
                after: ResourceState::Present,
                subresource: Subresource::All,
            },
        ]
    );
    assert_eq!(ctx.graph.final_state(draw.output), Some(ResourceState::Present));

    // Imported memory is never allocated or freed by the graph.
    assert_eq!(ctx.graph.allocator().heap_count(), 0);
    assert_eq!(ctx.device.stats().textures_created, 1);
    ctx.end_frame();
    assert!(ctx.device.is_texture_alive(texture));
}

#[test]
fn test_mip_chain_transitions_per_subresource() {
    let mut ctx = TestContext::new();
    let desc = TextureDescriptor::new_2d(
        64,
        64,
        TextureFormat::Rgba16Float,
        TextureUsage::STORAGE_BINDING | TextureUsage::TEXTURE_BINDING,
    )
    .with_mip_levels(3);

    let mut pyramid = ctx.graph.create_texture(&desc, "pyramid");
    for mip in 1..3u32 {
        let output: Single = ctx.graph.add_pass(
            &format!("downsample{}", mip),
            QueueType::Compute,
            |data: &mut Single, builder| {
                builder.read_subresource(
                    pyramid,
                    ResourceState::ShaderRead,
                    Subresource::Index(mip - 1),
                );
                data.output = builder.write_subresource(
                    pyramid,
                    ResourceState::UnorderedAccess,
                    Subresource::Index(mip),
                );
            },
            |_, _| Ok(()),
        );
        pyramid = output.output;
    }
    ctx.graph.add_pass(
        "consume",
        QueueType::Graphics,
        |_: &mut (), builder| {
            builder.read(pyramid, ResourceState::ShaderRead);
            builder.side_effect();
        },
        |_, _| Ok(()),
    );
    ctx.run();

    // Mip 0 leaves unordered-access for shader-read on its own.
    let first = ctx.graph.pass(0).transitions();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].subresource, Subresource::Index(0));
    assert_eq!(first[0].before, ResourceState::UnorderedAccess);

    // The final whole-resource read only touches mips that are not readable yet.
    let last = ctx.graph.pass(2).transitions();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].subresource, Subresource::Index(2));
    assert_eq!(ctx.graph.final_state(pyramid), Some(ResourceState::ShaderRead));
}

#[test]
fn test_cross_queue_dependencies() {
    let mut ctx = TestContext::new();
    let recorded = Rc::new(RefCell::new(Vec::new()));

    let culling: Single = ctx.graph.add_pass(
        "gpu_culling",
        QueueType::Compute,
        |data: &mut Single, builder| {
            let args = builder.create_buffer(&storage_buffer(4096), "draw_args");
            data.output = builder.write(args, ResourceState::UnorderedAccess);
        },
        |_, _| Ok(()),
    );
    let prepass: Single = ctx.graph.add_pass(
        "depth_prepass",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let depth = builder.create_texture(
                &TextureDescriptor::new_2d(
                    64,
                    64,
                    TextureFormat::Depth32Float,
                    TextureUsage::RENDER_ATTACHMENT,
                ),
                "depth",
            );
            data.output = builder.write(depth, ResourceState::DepthWrite);
        },
        |_, _| Ok(()),
    );
    let pass_recorded = recorded.clone();
    let draw: Single = ctx.graph.add_pass(
        "draw",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            builder.read(culling.output, ResourceState::IndirectArgument);
            builder.read(prepass.output, ResourceState::DepthRead);
            let color = builder.create_texture(&color_target(64, 64), "color");
            data.output = builder.write(color, ResourceState::RenderTarget);
        },
        move |_, pass| {
            pass_recorded
                .borrow_mut()
                .extend_from_slice(pass.queue_dependencies());
            Ok(())
        },
    );
    ctx.graph.present(draw.output);
    ctx.run();

    let expected = vec![QueueDependency {
        pass: 0,
        queue: QueueType::Compute,
    }];
    assert_eq!(ctx.graph.queue_dependencies(2), expected.as_slice());
    assert_eq!(*recorded.borrow(), expected);
    assert!(ctx.graph.queue_dependencies(1).is_empty());
}

#[test]
fn test_overwrite_waits_for_reader_on_other_queue() {
    let mut ctx = TestContext::new();
    let produce: Single = ctx.graph.add_pass(
        "produce",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let buffer = builder.create_buffer(&storage_buffer(1024), "particles");
            data.output = builder.write(buffer, ResourceState::UnorderedAccess);
        },
        |_, _| Ok(()),
    );
    ctx.graph.add_pass(
        "async_read",
        QueueType::Compute,
        |_: &mut (), builder| {
            builder.read(produce.output, ResourceState::ShaderRead);
            builder.side_effect();
        },
        |_, _| Ok(()),
    );
    let overwrite: Single = ctx.graph.add_pass(
        "overwrite",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            data.output = builder.write(produce.output, ResourceState::UnorderedAccess);
        },
        |_, _| Ok(()),
    );
    ctx.graph.make_target(overwrite.output);
    ctx.run();

    assert_eq!(
        ctx.graph.queue_dependencies(1),
        &[QueueDependency {
            pass: 0,
            queue: QueueType::Graphics,
        }]
    );
    assert_eq!(
        ctx.graph.queue_dependencies(2),
        &[QueueDependency {
            pass: 1,
            queue: QueueType::Compute,
        }]
    );
}

// ============================================================================
// Errors and frame lifecycle
// ============================================================================

#[test]
fn test_allocation_failure_is_returned() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    build_two_pass_frame(&mut ctx.graph, &log);
    ctx.device.set_out_of_memory(true);

    let result = ctx.graph.compile(&mut ctx.device);
    assert!(matches!(
        result,
        Err(GraphError::AllocationFailed {
            ref name,
            source: BackendError::OutOfMemory,
        }) if name == "T"
    ));
}

#[test]
fn test_pass_error_stops_execution() {
    let mut ctx = TestContext::new();
    let ran_after = Rc::new(RefCell::new(false));

    let failing: Single = ctx.graph.add_pass(
        "failing",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            let color = builder.create_texture(&color_target(16, 16), "color");
            data.output = builder.write(color, ResourceState::RenderTarget);
        },
        |_, pass| {
            Err(GraphError::PassFailed {
                pass: pass.name().to_string(),
                message: "pipeline missing".to_string(),
            })
        },
    );
    let flag = ran_after.clone();
    let after: Single = ctx.graph.add_pass(
        "after",
        QueueType::Graphics,
        |data: &mut Single, builder| {
            data.output = builder.write(failing.output, ResourceState::RenderTarget);
        },
        move |_, _| {
            *flag.borrow_mut() = true;
            Ok(())
        },
    );
    ctx.graph.present(after.output);
    ctx.compile();

    let result = ctx.graph.execute(&mut ctx.device, &mut ctx.recorder);
    assert_eq!(
        result,
        Err(GraphError::PassFailed {
            pass: "failing".to_string(),
            message: "pipeline missing".to_string(),
        })
    );
    assert!(!*ran_after.borrow());
    assert_eq!(ctx.recorder.commands().last(), Some(&RecordedCommand::EndDebugScope));
}

#[test]
fn test_clear_runs_finalizers_once() {
    let mut ctx = TestContext::new();
    let count = Rc::new(RefCell::new(0));
    let finalizer_count = count.clone();
    ctx.graph
        .defer_until_clear(move || *finalizer_count.borrow_mut() += 1);

    ctx.run();
    assert_eq!(*count.borrow(), 0);
    ctx.end_frame();
    assert_eq!(*count.borrow(), 1);
    ctx.end_frame();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_destroy_releases_device_objects() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    build_two_pass_frame(&mut ctx.graph, &log);
    ctx.run();

    ctx.graph.destroy(&mut ctx.device);
    assert_eq!(ctx.device.live_heaps(), 0);
    assert_eq!(ctx.device.live_textures(), 0);
    assert_eq!(ctx.device.live_views(), 0);
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_writes_graphviz() {
    let mut ctx = TestContext::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    build_two_pass_frame(&mut ctx.graph, &log);
    ctx.graph.add_pass(
        "unused",
        QueueType::Graphics,
        |_: &mut (), builder| {
            let u = builder.create_texture(&color_target(8, 8), "U");
            builder.write(u, ResourceState::RenderTarget);
        },
        |_, _| Ok(()),
    );
    ctx.compile();

    let path = std::env::temp_dir().join(format!("frame_graph_export_{}.dot", std::process::id()));
    ctx.graph.export(&path).unwrap();
    let dot = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(dot.starts_with("digraph FrameGraph {"));
    assert!(dot.contains("label=\"A\", shape=box"));
    assert!(dot.contains("label=\"T v1\", shape=ellipse"));
    assert!(dot.contains("label=\"O v1\", shape=ellipse, style=\"bold\""));
    assert!(dot.contains("label=\"unused\", shape=box, style=\"dashed\", color=gray"));
    assert!(dot.contains(&format!("[label=\"{}\"]", ResourceState::ShaderRead.name())));
}
