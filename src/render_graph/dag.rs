//! Generic dependency graph with reachability-based culling
//!
//! Nodes and edges are stored in dense vectors and referenced by index. The
//! graph is append-only for the lifetime of a frame; [`DependencyGraph::clear`]
//! drops everything and bumps a generation counter so ids kept from an older
//! frame are caught instead of silently aliasing new nodes.

use std::io::{self, Write};

/// Identifier of a node, valid only for the frame that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Identifier of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(u32);

/// A directed edge with its payload
#[derive(Debug, Clone)]
pub struct Edge<E> {
    pub from: NodeId,
    pub to: NodeId,
    pub payload: E,
}

#[derive(Debug)]
struct NodeEntry<N> {
    payload: N,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
    target: bool,
    culled: bool,
}

/// Text used for a node or an edge in Graphviz output
pub trait GraphvizLabel {
    fn graphviz_label(&self) -> String;

    fn graphviz_shape(&self) -> &'static str {
        "ellipse"
    }
}

/// Directed acyclic graph of typed nodes and edges
#[derive(Debug)]
pub struct DependencyGraph<N, E> {
    nodes: Vec<NodeEntry<N>>,
    edges: Vec<Edge<E>>,
    generation: u32,
}

impl<N, E> DependencyGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            generation: 0,
        }
    }

    /// Generation stamped into every id handed out until the next clear
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn add_node(&mut self, payload: N) -> NodeId {
        let id = NodeId {
            index: self.nodes.len() as u32,
            generation: self.generation,
        };
        self.nodes.push(NodeEntry {
            payload,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            target: false,
            culled: false,
        });
        id
    }

    /// Add an edge `from -> to`.
    ///
    /// # Panics
    ///
    /// Panics if either node belongs to another frame or if the edge is a
    /// self loop.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, payload: E) -> EdgeId {
        self.check(from);
        self.check(to);
        assert!(from != to, "edge from node {} to itself", from.index);

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { from, to, payload });
        self.nodes[from.index()].outgoing.push(id);
        self.nodes[to.index()].incoming.push(id);
        id
    }

    fn check(&self, id: NodeId) {
        assert!(
            id.generation == self.generation,
            "node {} is from frame generation {}, the graph is at generation {}",
            id.index,
            id.generation,
            self.generation
        );
        assert!(id.index() < self.nodes.len(), "node {} does not exist", id.index);
    }

    /// Mark a node as an output the frame must keep.
    pub fn make_target(&mut self, id: NodeId) {
        self.check(id);
        self.nodes[id.index()].target = true;
    }

    pub fn is_target(&self, id: NodeId) -> bool {
        self.check(id);
        self.nodes[id.index()].target
    }

    /// Cull every node that no target can be reached from.
    ///
    /// Walks edges backwards from the targets; whatever is not visited is
    /// marked culled. Returns the number of culled nodes.
    pub fn cull(&mut self) -> usize {
        let mut stack = Vec::new();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.culled = !node.target;
            if node.target {
                stack.push(index);
            }
        }

        while let Some(index) = stack.pop() {
            for i in 0..self.nodes[index].incoming.len() {
                let edge = self.nodes[index].incoming[i];
                let from = self.edges[edge.0 as usize].from.index();
                if self.nodes[from].culled {
                    self.nodes[from].culled = false;
                    stack.push(from);
                }
            }
        }

        self.nodes.iter().filter(|node| node.culled).count()
    }

    pub fn is_culled(&self, id: NodeId) -> bool {
        self.check(id);
        self.nodes[id.index()].culled
    }

    pub fn node(&self, id: NodeId) -> &N {
        self.check(id);
        &self.nodes[id.index()].payload
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut N {
        self.check(id);
        &mut self.nodes[id.index()].payload
    }

    pub fn edge(&self, id: EdgeId) -> &Edge<E> {
        &self.edges[id.0 as usize]
    }

    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge<E>> + '_ {
        self.check(id);
        self.nodes[id.index()]
            .outgoing
            .iter()
            .map(move |edge| &self.edges[edge.0 as usize])
    }

    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge<E>> + '_ {
        self.check(id);
        self.nodes[id.index()]
            .incoming
            .iter()
            .map(move |edge| &self.edges[edge.0 as usize])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let generation = self.generation;
        (0..self.nodes.len() as u32).map(move |index| NodeId { index, generation })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drop every node and edge and start a new generation.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<N: GraphvizLabel, E: GraphvizLabel> DependencyGraph<N, E> {
    /// Write the graph in Graphviz DOT format.
    ///
    /// Culled nodes are dashed grey, targets are drawn bold.
    pub fn write_graphviz<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "digraph FrameGraph {{")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    node [fontname=\"Helvetica\"];")?;

        for (index, node) in self.nodes.iter().enumerate() {
            let mut style = Vec::new();
            if node.culled {
                style.push("dashed");
            }
            if node.target {
                style.push("bold");
            }
            let color = if node.culled { "gray" } else { "black" };
            writeln!(
                out,
                "    n{} [label=\"{}\", shape={}, style=\"{}\", color={}];",
                index,
                escape(&node.payload.graphviz_label()),
                node.payload.graphviz_shape(),
                style.join(","),
                color
            )?;
        }

        for edge in &self.edges {
            writeln!(
                out,
                "    n{} -> n{} [label=\"{}\"];",
                edge.from.index,
                edge.to.index,
                escape(&edge.payload.graphviz_label())
            )?;
        }

        writeln!(out, "}}")
    }
}

impl<N, E> Default for DependencyGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
