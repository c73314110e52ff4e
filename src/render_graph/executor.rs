//! Render graph execution

use crate::allocator::ResourceAllocator;
use crate::backend::*;
use crate::error::GraphResult;
use crate::render_graph::graph::RenderGraph;
use crate::render_graph::pass::{PassAccess, QueueDependency};
use crate::render_graph::resource::*;

/// Everything an execute callback may touch while its pass runs
pub struct PassContext<'a> {
    pub(crate) name: &'a str,
    pub(crate) index: usize,
    pub(crate) queue: QueueType,
    pub(crate) accesses: &'a [PassAccess],
    pub(crate) queue_dependencies: &'a [QueueDependency],
    pub(crate) frame: &'a FrameResources,
    pub(crate) allocator: &'a mut ResourceAllocator,
    pub(crate) device: &'a mut dyn Device,
    pub(crate) recorder: &'a mut dyn CommandRecorder,
}

impl<'a> PassContext<'a> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn pass_index(&self) -> usize {
        self.index
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Passes on other queues this pass has to wait for
    pub fn queue_dependencies(&self) -> &[QueueDependency] {
        self.queue_dependencies
    }

    pub fn recorder(&mut self) -> &mut dyn CommandRecorder {
        &mut *self.recorder
    }

    pub fn device(&mut self) -> &mut dyn Device {
        &mut *self.device
    }

    /// Backing resource of `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is from another frame, or if it was culled and
    /// this pass did not declare it.
    pub fn resource(&self, handle: ResourceHandle) -> PhysicalResource {
        let declared = self
            .accesses
            .iter()
            .any(|access| access.handle == handle || access.output == Some(handle));
        let logical = self.frame.resource_of(handle);
        if !declared {
            assert!(
                !self.frame.is_culled(handle),
                "pass '{}' used culled resource '{}' v{}",
                self.name,
                logical.name(),
                handle.version()
            );
        }
        logical.physical().unwrap_or_else(|| {
            panic!(
                "pass '{}' used '{}' which has no backing resource this frame",
                self.name,
                logical.name()
            )
        })
    }

    pub fn texture(&self, handle: ResourceHandle) -> TextureHandle {
        let resource = self.resource(handle);
        resource.as_texture().unwrap_or_else(|| {
            panic!(
                "'{}' is a buffer, not a texture",
                self.frame.resource_of(handle).name()
            )
        })
    }

    pub fn buffer(&self, handle: ResourceHandle) -> BufferHandle {
        let resource = self.resource(handle);
        resource.as_buffer().unwrap_or_else(|| {
            panic!(
                "'{}' is a texture, not a buffer",
                self.frame.resource_of(handle).name()
            )
        })
    }

    pub fn descriptor(&self, handle: ResourceHandle) -> &ResourceDescriptor {
        self.frame.resource_of(handle).desc()
    }

    /// Cached view of `handle`, created on first request.
    pub fn view(
        &mut self,
        handle: ResourceHandle,
        desc: &ViewDescriptor,
    ) -> GraphResult<ViewHandle> {
        let resource = self.resource(handle);
        self.allocator.get_descriptor(&mut *self.device, resource, desc)
    }
}

impl RenderGraph {
    /// Run every pass that survived culling, in declaration order.
    ///
    /// Each pass gets a debug scope named after it, its transitions, its
    /// execute callback, and a closing scope. Presented resources are then
    /// moved to the present state and the final states are handed back to
    /// the allocator.
    pub fn execute(
        &mut self,
        device: &mut dyn Device,
        recorder: &mut dyn CommandRecorder,
    ) -> GraphResult<()> {
        assert!(self.compiled, "execute called before compile");
        assert!(!self.executed, "frame executed twice");

        let mut executed = 0;
        for pass in &mut self.passes {
            if pass.culled {
                log::trace!("Skipping culled pass '{}'", pass.name);
                continue;
            }

            pass.begin(recorder);
            let result = {
                let mut ctx = PassContext {
                    name: &pass.name,
                    index: pass.index,
                    queue: pass.queue,
                    accesses: &pass.accesses,
                    queue_dependencies: &pass.queue_dependencies,
                    frame: &self.frame,
                    allocator: &mut self.allocator,
                    device: &mut *device,
                    recorder: &mut *recorder,
                };
                pass.callback.execute(&mut ctx)
            };
            pass.end(recorder);

            if let Err(err) = result {
                log::error!("Pass '{}' failed: {}", pass.name, err);
                return Err(err);
            }
            executed += 1;
        }

        for transition in &self.final_transitions {
            recorder.transition(
                transition.resource,
                transition.before,
                transition.after,
                transition.subresource,
            );
        }
        for (resource, state) in &self.final_states {
            self.allocator.set_resource_state(*resource, *state);
        }

        self.executed = true;
        self.stats.executed_passes = executed;
        log::debug!(
            "Executed {} of {} passes, {} trailing transitions",
            executed,
            self.passes.len(),
            self.final_transitions.len()
        );
        Ok(())
    }
}
