//! Render pass declarations
//!
//! A pass is declared with two closures: a setup closure that runs right away
//! and records resource accesses through a [`PassBuilder`], and an execute
//! closure that runs during [`RenderGraph::execute`](super::RenderGraph::execute)
//! if the pass survived culling.

use crate::backend::*;
use crate::error::GraphResult;
use crate::render_graph::dag::NodeId;
use crate::render_graph::executor::PassContext;
use crate::render_graph::resource::*;
use crate::render_graph::state::{StateTracker, Transition};

/// A resource access recorded during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassAccess {
    /// Version the pass reads, or the version a write replaces
    pub handle: ResourceHandle,
    /// Version produced by a write
    pub output: Option<ResourceHandle>,
    pub kind: AccessKind,
    pub state: ResourceState,
    pub subresource: Subresource,
}

/// A pass on another queue whose output this pass consumes, or whose
/// input this pass overwrites.
///
/// The caller is expected to make the pass's queue wait on `queue` after
/// `pass` has been submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDependency {
    pub pass: usize,
    pub queue: QueueType,
}

/// Type-erased execute callback with its setup data
pub(crate) trait PassCallback {
    fn execute(&mut self, ctx: &mut PassContext<'_>) -> GraphResult<()>;
}

struct TypedPass<D, F> {
    data: D,
    execute: F,
}

impl<D, F> PassCallback for TypedPass<D, F>
where
    F: FnMut(&D, &mut PassContext<'_>) -> GraphResult<()>,
{
    fn execute(&mut self, ctx: &mut PassContext<'_>) -> GraphResult<()> {
        (self.execute)(&self.data, ctx)
    }
}

/// A declared pass
pub struct PassNode {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) queue: QueueType,
    pub(crate) node: NodeId,
    pub(crate) accesses: Vec<PassAccess>,
    pub(crate) side_effect: bool,
    pub(crate) culled: bool,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) queue_dependencies: Vec<QueueDependency>,
    pub(crate) callback: Box<dyn PassCallback>,
}

impl PassNode {
    pub(crate) fn new<D, F>(
        name: &str,
        index: usize,
        queue: QueueType,
        node: NodeId,
        data: D,
        execute: F,
    ) -> Self
    where
        D: 'static,
        F: FnMut(&D, &mut PassContext<'_>) -> GraphResult<()> + 'static,
    {
        Self {
            name: name.to_string(),
            index,
            queue,
            node,
            accesses: Vec::new(),
            side_effect: false,
            culled: false,
            transitions: Vec::new(),
            queue_dependencies: Vec::new(),
            callback: Box::new(TypedPass { data, execute }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    pub fn accesses(&self) -> &[PassAccess] {
        &self.accesses
    }

    pub fn has_side_effect(&self) -> bool {
        self.side_effect
    }

    /// Whether no target depends on this pass. Known after compile.
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    /// Transitions recorded before the pass runs. Known after compile.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn queue_dependencies(&self) -> &[QueueDependency] {
        &self.queue_dependencies
    }

    /// Work out the transitions this pass needs and the passes on other
    /// queues it waits for.
    pub(crate) fn resolve(
        &mut self,
        frame: &FrameResources,
        tracker: &mut StateTracker,
        queues: &[QueueType],
    ) {
        self.transitions.clear();
        self.queue_dependencies.clear();

        for access in &self.accesses {
            let resource = frame.resource_of(access.handle);
            let physical = resource.physical().unwrap_or_else(|| {
                panic!("'{}' used by '{}' was never realized", resource.name(), self.name)
            });
            tracker.transition(
                physical,
                resource.initial_state(),
                resource.subresource_count(),
                access.subresource,
                access.state,
                &mut self.transitions,
            );

            let node = frame.node_of(access.handle);
            if let Some(producer) = node.producer() {
                push_dependency(
                    &mut self.queue_dependencies,
                    self.index,
                    self.queue,
                    producer,
                    queues,
                );
            }

            // Overwriting a version has to wait for everyone still reading it.
            if access.kind == AccessKind::Write {
                for edge in frame.dag.outgoing_edges(node.node) {
                    if edge.payload.kind != AccessKind::Read || frame.dag.is_culled(edge.to) {
                        continue;
                    }
                    if let GraphNode::Pass { index, .. } = frame.dag.node(edge.to) {
                        push_dependency(
                            &mut self.queue_dependencies,
                            self.index,
                            self.queue,
                            *index,
                            queues,
                        );
                    }
                }
            }
        }
    }

    /// Open the pass's debug scope and record its transitions.
    pub(crate) fn begin(&self, recorder: &mut dyn CommandRecorder) {
        recorder.begin_debug_scope(&self.name);
        for transition in &self.transitions {
            recorder.transition(
                transition.resource,
                transition.before,
                transition.after,
                transition.subresource,
            );
        }
    }

    pub(crate) fn end(&self, recorder: &mut dyn CommandRecorder) {
        recorder.end_debug_scope();
    }
}

/// Record that pass `this` on `this_queue` waits for `pass`, unless both share a queue.
fn push_dependency(
    dependencies: &mut Vec<QueueDependency>,
    this: usize,
    this_queue: QueueType,
    pass: usize,
    queues: &[QueueType],
) {
    let queue = queues[pass];
    if pass != this && queue != this_queue && !dependencies.iter().any(|dep| dep.pass == pass) {
        dependencies.push(QueueDependency { pass, queue });
    }
}

impl std::fmt::Debug for PassNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassNode")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("queue", &self.queue)
            .field("accesses", &self.accesses)
            .field("culled", &self.culled)
            .finish()
    }
}

/// Records the resources a pass creates, reads and writes
pub struct PassBuilder<'a> {
    pub(crate) frame: &'a mut FrameResources,
    pub(crate) pass: usize,
    pub(crate) node: NodeId,
    pub(crate) accesses: Vec<PassAccess>,
    pub(crate) side_effect: bool,
}

impl<'a> PassBuilder<'a> {
    pub(crate) fn new(frame: &'a mut FrameResources, pass: usize, node: NodeId) -> Self {
        Self {
            frame,
            pass,
            node,
            accesses: Vec::new(),
            side_effect: false,
        }
    }

    pub fn pass_index(&self) -> usize {
        self.pass
    }

    /// Declare a transient texture. Returns its version 0.
    pub fn create_texture(&mut self, desc: &TextureDescriptor, name: &str) -> ResourceHandle {
        self.frame
            .create(name, ResourceDescriptor::Texture(*desc), ResourceOrigin::Transient)
    }

    /// Declare a transient buffer. Returns its version 0.
    pub fn create_buffer(&mut self, desc: &BufferDescriptor, name: &str) -> ResourceHandle {
        self.frame
            .create(name, ResourceDescriptor::Buffer(*desc), ResourceOrigin::Transient)
    }

    /// Read the whole resource in `state`.
    pub fn read(&mut self, handle: ResourceHandle, state: ResourceState) -> ResourceHandle {
        self.read_subresource(handle, state, Subresource::All)
    }

    /// Read one subresource in `state`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not the latest version of its resource.
    pub fn read_subresource(
        &mut self,
        handle: ResourceHandle,
        state: ResourceState,
        subresource: Subresource,
    ) -> ResourceHandle {
        self.frame.read(self.pass, self.node, handle, state, subresource);
        self.accesses.push(PassAccess {
            handle,
            output: None,
            kind: AccessKind::Read,
            state,
            subresource,
        });
        handle
    }

    /// Write the whole resource in `state`. Returns the new version.
    pub fn write(&mut self, handle: ResourceHandle, state: ResourceState) -> ResourceHandle {
        self.write_subresource(handle, state, Subresource::All)
    }

    /// Write one subresource in `state`. Returns the new version.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not the latest version of its resource, or if
    /// this pass produced it. Write every subresource through the handle the
    /// pass received.
    pub fn write_subresource(
        &mut self,
        handle: ResourceHandle,
        state: ResourceState,
        subresource: Subresource,
    ) -> ResourceHandle {
        let output = self.frame.write(self.pass, self.node, handle, state, subresource);
        self.accesses.push(PassAccess {
            handle,
            output: Some(output),
            kind: AccessKind::Write,
            state,
            subresource,
        });
        output
    }

    /// Keep the pass even if nothing it writes is consumed.
    pub fn side_effect(&mut self) {
        self.side_effect = true;
    }
}
