//! Render graph definition and compilation

use crate::allocator::ResourceAllocator;
use crate::backend::*;
use crate::config::FrameGraphConfig;
use crate::error::GraphResult;
use crate::render_graph::executor::PassContext;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::render_graph::state::{StateTracker, Transition};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Counters for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: usize,
    pub culled_passes: usize,
    pub executed_passes: usize,
    pub resources: usize,
    pub realized_resources: usize,
    pub reused_resources: usize,
    pub transitions: usize,
}

/// The main render graph structure.
///
/// One graph is rebuilt every frame: declare passes, [`compile`](Self::compile),
/// [`execute`](Self::execute), then [`clear`](Self::clear). The allocator and
/// its heaps outlive the frame.
pub struct RenderGraph {
    pub(crate) config: FrameGraphConfig,
    pub(crate) frame: FrameResources,
    pub(crate) passes: Vec<PassNode>,
    pub(crate) allocator: ResourceAllocator,
    pub(crate) presented: Vec<ResourceHandle>,
    pub(crate) final_transitions: Vec<Transition>,
    pub(crate) final_states: Vec<(PhysicalResource, ResourceState)>,
    finalizers: Vec<Box<dyn FnOnce()>>,
    pub(crate) compiled: bool,
    pub(crate) executed: bool,
    pub(crate) stats: FrameStats,
}

impl RenderGraph {
    pub fn new(config: FrameGraphConfig) -> Self {
        Self {
            allocator: ResourceAllocator::new(&config),
            config,
            frame: FrameResources::default(),
            passes: Vec::new(),
            presented: Vec::new(),
            final_transitions: Vec::new(),
            final_states: Vec::new(),
            finalizers: Vec::new(),
            compiled: false,
            executed: false,
            stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Add a pass to the graph.
    ///
    /// `setup` runs immediately and fills the pass data through the builder.
    /// `execute` is stored and only runs if the pass survives culling. The
    /// populated pass data is returned so later passes can use its handles.
    pub fn add_pass<D, S, E>(&mut self, name: &str, queue: QueueType, setup: S, execute: E) -> D
    where
        D: Copy + Default + 'static,
        S: FnOnce(&mut D, &mut PassBuilder<'_>),
        E: FnMut(&D, &mut PassContext<'_>) -> GraphResult<()> + 'static,
    {
        assert!(!self.compiled, "pass '{}' added after compile", name);

        let index = self.passes.len();
        let node = self.frame.dag.add_node(GraphNode::Pass {
            index,
            name: name.to_string(),
        });

        let mut data = D::default();
        let (accesses, side_effect) = {
            let mut builder = PassBuilder::new(&mut self.frame, index, node);
            setup(&mut data, &mut builder);
            (builder.accesses, builder.side_effect)
        };
        if side_effect {
            self.frame.dag.make_target(node);
        }

        let mut pass = PassNode::new(name, index, queue, node, data, execute);
        pass.accesses = accesses;
        pass.side_effect = side_effect;
        self.passes.push(pass);
        data
    }

    /// Declare a transient texture outside of any pass.
    pub fn create_texture(&mut self, desc: &TextureDescriptor, name: &str) -> ResourceHandle {
        self.frame
            .create(name, ResourceDescriptor::Texture(*desc), ResourceOrigin::Transient)
    }

    /// Declare a transient buffer outside of any pass.
    pub fn create_buffer(&mut self, desc: &BufferDescriptor, name: &str) -> ResourceHandle {
        self.frame
            .create(name, ResourceDescriptor::Buffer(*desc), ResourceOrigin::Transient)
    }

    /// Wrap a texture the graph does not own. It is never allocated or freed
    /// by the graph; `state` is the state it is in when the frame starts.
    pub fn import_texture(
        &mut self,
        name: &str,
        texture: TextureHandle,
        desc: &TextureDescriptor,
        state: ResourceState,
    ) -> ResourceHandle {
        self.frame.create(
            name,
            ResourceDescriptor::Texture(*desc),
            ResourceOrigin::Imported {
                resource: PhysicalResource::Texture(texture),
                state,
            },
        )
    }

    /// Wrap a buffer the graph does not own.
    pub fn import_buffer(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        desc: &BufferDescriptor,
        state: ResourceState,
    ) -> ResourceHandle {
        self.frame.create(
            name,
            ResourceDescriptor::Buffer(*desc),
            ResourceOrigin::Imported {
                resource: PhysicalResource::Buffer(buffer),
                state,
            },
        )
    }

    /// Mark `handle` as a frame output that ends up in the present state.
    pub fn present(&mut self, handle: ResourceHandle) {
        self.make_target(handle);
        if !self.presented.contains(&handle) {
            self.presented.push(handle);
        }
    }

    /// Mark `handle` as a frame output. Everything it depends on survives culling.
    pub fn make_target(&mut self, handle: ResourceHandle) {
        assert!(!self.compiled, "{:?} made a target after compile", handle);
        let node = self.frame.node_of(handle).node;
        self.frame.dag.make_target(node);
    }

    /// Cull, compute lifetimes, allocate and resolve every live pass.
    pub fn compile(&mut self, device: &mut dyn Device) -> GraphResult<()> {
        assert!(!self.compiled, "frame compiled twice");
        let pass_count = self.passes.len();

        let culled_nodes = self.frame.dag.cull();
        let mut culled_passes = 0;
        for pass in &mut self.passes {
            pass.culled = self.frame.dag.is_culled(pass.node);
            if pass.culled {
                culled_passes += 1;
                log::trace!("Culled pass '{}'", pass.name);
            }
        }

        // Every live edge from a resource version to a live pass extends the
        // resource's lifetime.
        let dag = &self.frame.dag;
        for node in &self.frame.nodes {
            if dag.is_culled(node.node) {
                continue;
            }
            for edge in dag.outgoing_edges(node.node) {
                if dag.is_culled(edge.to) {
                    continue;
                }
                if let GraphNode::Pass { index, .. } = dag.node(edge.to) {
                    self.frame.resources[node.resource].resolve(*index);
                }
            }
        }
        // Targets outlive the last pass, so no later pass can alias them.
        for node in &self.frame.nodes {
            if dag.is_target(node.node) {
                self.frame.resources[node.resource].resolve(pass_count);
            }
        }

        let mut realized = 0;
        let mut reused = 0;
        for resource in &mut self.frame.resources {
            let first_version = self.frame.nodes[resource.versions[0]].node;
            if self.frame.dag.is_culled(first_version) {
                continue;
            }
            resource.realize(&mut self.allocator, device, pass_count)?;
            if !resource.is_imported() {
                realized += 1;
                if resource.is_reused() {
                    reused += 1;
                }
            }
        }

        let queues: Vec<QueueType> = self.passes.iter().map(|pass| pass.queue).collect();
        let mut tracker = StateTracker::default();
        let mut transitions = 0;
        for pass in &mut self.passes {
            if pass.culled {
                continue;
            }
            pass.resolve(&self.frame, &mut tracker, &queues);
            transitions += pass.transitions.len();
            for transition in &pass.transitions {
                log::trace!(
                    "  '{}': {:?} {:?} -> {:?} ({:?})",
                    pass.name,
                    transition.resource,
                    transition.before,
                    transition.after,
                    transition.subresource
                );
            }
        }

        self.final_transitions.clear();
        tracker.normalize(&mut self.final_transitions);
        for handle in &self.presented {
            let resource = &self.frame.resources[handle.resource_index()];
            if let Some(physical) = resource.physical() {
                tracker.transition(
                    physical,
                    resource.initial_state(),
                    resource.subresource_count(),
                    Subresource::All,
                    self.config.present_state,
                    &mut self.final_transitions,
                );
            }
        }
        self.final_states = tracker.final_states();

        self.stats = FrameStats {
            passes: pass_count,
            culled_passes,
            executed_passes: 0,
            resources: self.frame.resources.len(),
            realized_resources: realized,
            reused_resources: reused,
            transitions: transitions + self.final_transitions.len(),
        };
        self.compiled = true;

        log::debug!(
            "Compiled frame graph: {} passes ({} culled), {} nodes culled, \
             {} resources realized ({} reused), {} heaps",
            pass_count,
            culled_passes,
            culled_nodes,
            realized,
            reused,
            self.allocator.heap_count()
        );
        Ok(())
    }

    /// Register a callback that runs at the start of the next [`clear`](Self::clear).
    pub fn defer_until_clear(&mut self, finalizer: impl FnOnce() + 'static) {
        self.finalizers.push(Box::new(finalizer));
    }

    /// End the frame: run finalizers, drop every pass and resource, and let
    /// the allocator evict what has gone unused for too long.
    pub fn clear(&mut self, device: &mut dyn Device) {
        let finalizers = std::mem::take(&mut self.finalizers);
        for finalizer in finalizers {
            finalizer();
        }

        self.passes.clear();
        self.frame.clear();
        self.presented.clear();
        self.final_transitions.clear();
        self.final_states.clear();
        self.compiled = false;
        self.executed = false;
        self.stats = FrameStats::default();

        self.allocator.reset(device);
    }

    /// Release everything the allocator owns. The graph is empty afterwards.
    pub fn destroy(&mut self, device: &mut dyn Device) {
        self.clear(device);
        self.allocator.destroy(device);
    }

    /// Write the graph to `path` in Graphviz DOT format.
    pub fn export(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_graphviz(&mut out)?;
        out.flush()?;
        log::debug!("Exported frame graph to {}", path.display());
        Ok(())
    }

    pub fn write_graphviz<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.frame.dag.write_graphviz(out)
    }

    pub fn passes(&self) -> &[PassNode] {
        &self.passes
    }

    pub fn pass(&self, index: usize) -> &PassNode {
        &self.passes[index]
    }

    pub fn find_pass(&self, name: &str) -> Option<&PassNode> {
        self.passes.iter().find(|pass| pass.name == name)
    }

    /// Passes on other queues that `pass` waits for. Known after compile.
    pub fn queue_dependencies(&self, pass: usize) -> &[QueueDependency] {
        &self.passes[pass].queue_dependencies
    }

    pub fn resource(&self, handle: ResourceHandle) -> &LogicalResource {
        self.frame.resource_of(handle)
    }

    pub fn resources(&self) -> &[LogicalResource] {
        &self.frame.resources
    }

    /// Backing resource of `handle`. Known after compile.
    pub fn physical(&self, handle: ResourceHandle) -> Option<PhysicalResource> {
        self.frame.resource_of(handle).physical()
    }

    pub fn is_culled(&self, handle: ResourceHandle) -> bool {
        self.frame.is_culled(handle)
    }

    /// State the backing resource of `handle` is left in after the frame.
    ///
    /// Useful to re-import a resource with the right state next frame.
    pub fn final_state(&self, handle: ResourceHandle) -> Option<ResourceState> {
        let physical = self.physical(handle)?;
        self.final_states
            .iter()
            .find(|(resource, _)| *resource == physical)
            .map(|(_, state)| *state)
    }

    /// Transitions recorded after the last pass
    pub fn final_transitions(&self) -> &[Transition] {
        &self.final_transitions
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut ResourceAllocator {
        &mut self.allocator
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new(FrameGraphConfig::default())
    }
}
