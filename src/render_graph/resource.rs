//! Logical resources and their versions
//!
//! Every write to a resource creates a new version node in the graph, so a
//! handle always names one specific version and readers depend on exactly the
//! write that produced it.

use crate::allocator::{Lifetime, ResourceAllocator};
use crate::backend::*;
use crate::error::GraphResult;
use crate::render_graph::dag::{DependencyGraph, GraphvizLabel, NodeId};
use std::fmt;

/// Handle to one version of a logical resource.
///
/// Handles are only valid for the frame they were created in.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub(crate) resource: u32,
    pub(crate) node: u32,
    pub(crate) version: u32,
    pub(crate) generation: u32,
}

impl ResourceHandle {
    pub fn resource_index(&self) -> usize {
        self.resource as usize
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({}.v{})", self.resource, self.version)
    }
}

impl Default for ResourceHandle {
    /// A handle that belongs to no frame. Using it panics.
    fn default() -> Self {
        Self {
            resource: u32::MAX,
            node: u32::MAX,
            version: 0,
            generation: u32::MAX,
        }
    }
}

/// Where the memory behind a logical resource comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOrigin {
    /// Allocated by the graph for the passes that use it
    Transient,
    /// Owned by the caller, in `state` when the frame starts
    Imported {
        resource: PhysicalResource,
        state: ResourceState,
    },
}

/// A resource declared in the current frame, across all of its versions
#[derive(Debug)]
pub struct LogicalResource {
    pub(crate) name: String,
    pub(crate) desc: ResourceDescriptor,
    pub(crate) origin: ResourceOrigin,
    /// Index into the frame's resource nodes, one per version
    pub(crate) versions: Vec<usize>,
    pub(crate) lifetime: Option<Lifetime>,
    pub(crate) physical: Option<PhysicalResource>,
    pub(crate) initial_state: ResourceState,
    pub(crate) reused: bool,
}

impl LogicalResource {
    pub(crate) fn new(name: &str, desc: ResourceDescriptor, origin: ResourceOrigin) -> Self {
        Self {
            name: name.to_string(),
            desc,
            origin,
            versions: Vec::new(),
            lifetime: None,
            physical: None,
            initial_state: ResourceState::Undefined,
            reused: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &ResourceDescriptor {
        &self.desc
    }

    pub fn origin(&self) -> ResourceOrigin {
        self.origin
    }

    pub fn is_imported(&self) -> bool {
        matches!(self.origin, ResourceOrigin::Imported { .. })
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Pass range the resource must stay alive for. Known after compile.
    pub fn lifetime(&self) -> Option<Lifetime> {
        self.lifetime
    }

    /// Backing resource. Known after compile, for resources that were not culled.
    pub fn physical(&self) -> Option<PhysicalResource> {
        self.physical
    }

    /// State the backing resource is in when the frame starts
    pub fn initial_state(&self) -> ResourceState {
        self.initial_state
    }

    /// Whether the backing resource was recycled from an earlier request
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn subresource_count(&self) -> u32 {
        match &self.desc {
            ResourceDescriptor::Texture(desc) => desc.subresource_count(),
            ResourceDescriptor::Buffer(_) => 1,
        }
    }

    /// Extend the lifetime so it covers `pass`.
    pub(crate) fn resolve(&mut self, pass: usize) {
        match &mut self.lifetime {
            Some(lifetime) => lifetime.include(pass),
            None => self.lifetime = Some(Lifetime::new(pass, pass)),
        }
    }

    /// Bind the resource to physical memory.
    ///
    /// Imported resources keep the caller's resource and state; transient ones
    /// are allocated for their lifetime. A live resource no pass touches gets
    /// a lifetime after the last pass.
    pub(crate) fn realize(
        &mut self,
        allocator: &mut ResourceAllocator,
        device: &mut dyn Device,
        pass_count: usize,
    ) -> GraphResult<()> {
        match self.origin {
            ResourceOrigin::Imported { resource, state } => {
                self.physical = Some(resource);
                self.initial_state = state;
            }
            ResourceOrigin::Transient => {
                let lifetime = *self
                    .lifetime
                    .get_or_insert_with(|| Lifetime::new(pass_count, pass_count));
                let allocation = allocator.allocate(device, lifetime, self.desc, &self.name)?;
                self.physical = Some(allocation.resource);
                self.initial_state = allocation.initial_state;
                self.reused = allocation.reused;
            }
        }
        Ok(())
    }
}

/// One version of a logical resource
#[derive(Debug, Clone, Copy)]
pub struct ResourceNode {
    pub(crate) resource: usize,
    pub(crate) version: u32,
    pub(crate) node: NodeId,
    /// Pass that wrote this version, `None` for version 0
    pub(crate) producer: Option<usize>,
}

impl ResourceNode {
    pub fn resource(&self) -> usize {
        self.resource
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn producer(&self) -> Option<usize> {
        self.producer
    }
}

/// Payload of a dependency graph node
#[derive(Debug, Clone)]
pub enum GraphNode {
    Pass { index: usize, name: String },
    Resource { index: usize, version: u32, name: String },
}

impl GraphvizLabel for GraphNode {
    fn graphviz_label(&self) -> String {
        match self {
            GraphNode::Pass { name, .. } => name.clone(),
            GraphNode::Resource { name, version, .. } => format!("{} v{}", name, version),
        }
    }

    fn graphviz_shape(&self) -> &'static str {
        match self {
            GraphNode::Pass { .. } => "box",
            GraphNode::Resource { .. } => "ellipse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Payload of a dependency graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub state: ResourceState,
    pub subresource: Subresource,
}

impl GraphvizLabel for Access {
    fn graphviz_label(&self) -> String {
        match self.subresource {
            Subresource::All => self.state.name().to_string(),
            Subresource::Index(index) => format!("{} [{}]", self.state.name(), index),
        }
    }
}

/// Per-frame declarations: the dependency graph plus every resource version
#[derive(Debug, Default)]
pub(crate) struct FrameResources {
    pub(crate) dag: DependencyGraph<GraphNode, Access>,
    pub(crate) resources: Vec<LogicalResource>,
    pub(crate) nodes: Vec<ResourceNode>,
}

impl FrameResources {
    /// Declare a logical resource and its version 0 node.
    pub(crate) fn create(
        &mut self,
        name: &str,
        desc: ResourceDescriptor,
        origin: ResourceOrigin,
    ) -> ResourceHandle {
        let index = self.resources.len();
        self.resources.push(LogicalResource::new(name, desc, origin));
        self.push_version(index, None)
    }

    fn push_version(&mut self, resource: usize, producer: Option<usize>) -> ResourceHandle {
        let logical = &mut self.resources[resource];
        let version = logical.versions.len() as u32;
        let node = self.dag.add_node(GraphNode::Resource {
            index: resource,
            version,
            name: logical.name.clone(),
        });
        let node_index = self.nodes.len();
        logical.versions.push(node_index);
        self.nodes.push(ResourceNode {
            resource,
            version,
            node,
            producer,
        });

        ResourceHandle {
            resource: resource as u32,
            node: node_index as u32,
            version,
            generation: self.dag.generation(),
        }
    }

    /// Validate a handle against the current frame.
    pub(crate) fn check(&self, handle: ResourceHandle) -> &ResourceNode {
        assert!(
            handle.generation == self.dag.generation(),
            "{:?} belongs to another frame",
            handle
        );
        assert!(
            (handle.node as usize) < self.nodes.len(),
            "{:?} does not exist",
            handle
        );
        &self.nodes[handle.node as usize]
    }

    fn check_latest(&self, handle: ResourceHandle, verb: &str) {
        self.check(handle);
        let resource = &self.resources[handle.resource as usize];
        let latest = resource.versions.len() as u32 - 1;
        assert!(
            handle.version == latest,
            "'{}' v{} {} after v{} was written",
            resource.name,
            handle.version,
            verb,
            latest
        );
    }

    /// Record that `pass` reads `handle`.
    pub(crate) fn read(
        &mut self,
        pass: usize,
        pass_node: NodeId,
        handle: ResourceHandle,
        state: ResourceState,
        subresource: Subresource,
    ) {
        self.check_latest(handle, "read");
        let node = self.nodes[handle.node as usize];
        assert!(
            node.producer != Some(pass),
            "pass reads '{}' v{} which it produces itself",
            self.resources[node.resource].name,
            node.version
        );
        self.dag.add_edge(
            node.node,
            pass_node,
            Access {
                kind: AccessKind::Read,
                state,
                subresource,
            },
        );
    }

    /// Record that `pass` writes `handle`, returning the new version.
    pub(crate) fn write(
        &mut self,
        pass: usize,
        pass_node: NodeId,
        handle: ResourceHandle,
        state: ResourceState,
        subresource: Subresource,
    ) -> ResourceHandle {
        self.check_latest(handle, "written");
        let node = self.nodes[handle.node as usize];
        assert!(
            node.producer != Some(pass),
            "pass writes '{}' v{} which it produces itself",
            self.resources[node.resource].name,
            node.version
        );
        let access = Access {
            kind: AccessKind::Write,
            state,
            subresource,
        };
        self.dag.add_edge(node.node, pass_node, access);

        let output = self.push_version(handle.resource as usize, Some(pass));
        let next = self.nodes[output.node as usize].node;
        self.dag.add_edge(pass_node, next, access);
        output
    }

    pub(crate) fn node_of(&self, handle: ResourceHandle) -> &ResourceNode {
        self.check(handle)
    }

    pub(crate) fn resource_of(&self, handle: ResourceHandle) -> &LogicalResource {
        self.check(handle);
        &self.resources[handle.resource as usize]
    }

    pub(crate) fn is_culled(&self, handle: ResourceHandle) -> bool {
        let node = self.check(handle).node;
        self.dag.is_culled(node)
    }

    pub(crate) fn clear(&mut self) {
        self.dag.clear();
        self.resources.clear();
        self.nodes.clear();
    }
}
