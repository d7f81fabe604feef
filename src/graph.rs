//! The Graph Store (`spec.md` §4.1): the mutable node+edge model with
//! topological sort and the node-mutation primitives the repair planner
//! builds on.
//!
//! Nodes live in a `petgraph::Graph`, which already gives the "arena
//! allocated with stable handles" shape Design Notes §9 asks for — dense
//! `Vec` storage, indices stable across insertion (nothing is ever
//! removed from this graph, only added). `NodeId` wraps
//! `petgraph::graph::NodeIndex<u32>` rather than exposing it directly so
//! callers can't construct one from an unrelated graph.

use fxhash::FxHashSet;
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;

use crate::effect::Effect;
use crate::format::{AlphaType, ColorSpace, GammaCurve};

/// A stable handle to a node. Cheap to copy; only valid for the `Graph`
/// that produced it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) NodeIndex<u32>);

impl NodeId {
    pub(crate) fn index(&self) -> usize {
        self.0.index()
    }
}

/// A node's derived attributes plus its owned effect. `spec.md` §3 lists
/// the invariants: `incoming.len() == effect.num_inputs()` after
/// finalize, no cycles, and exactly one node with empty `outgoing` at
/// finalize time.
pub struct Node {
    pub effect: Box<dyn Effect>,
    pub(crate) incoming: SmallVec<[NodeId; 4]>,
    pub(crate) outgoing: Vec<NodeId>,
    pub disabled: bool,
    pub output_color_space: ColorSpace,
    pub output_gamma_curve: GammaCurve,
    pub output_alpha_type: AlphaType,
    pub needs_mipmaps: bool,
    pub one_to_one_sampling: bool,
    pub output_width: u32,
    pub output_height: u32,
    /// Index into the owning chain's phase list, set by the partitioner.
    /// Purely a debug/test lookup aid, per Design Notes §9 — not an
    /// ownership relationship.
    pub containing_phase: Option<usize>,
    /// Sampler unit this node's texture is bound to at render time, set
    /// by the executor (external collaborator) and otherwise unused by
    /// the compiler.
    pub bound_sampler_num: Option<u32>,
}

impl Node {
    fn new(effect: Box<dyn Effect>) -> Node {
        Node {
            incoming: SmallVec::new(),
            outgoing: Vec::new(),
            disabled: false,
            output_color_space: ColorSpace::Invalid,
            output_gamma_curve: GammaCurve::Invalid,
            output_alpha_type: AlphaType::Invalid,
            needs_mipmaps: false,
            one_to_one_sampling: false,
            output_width: 0,
            output_height: 0,
            containing_phase: None,
            bound_sampler_num: None,
            effect,
        }
    }

    pub fn incoming(&self) -> &[NodeId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[NodeId] {
        &self.outgoing
    }
}

/// The node+edge graph. `NodeId` ordering (the order nodes were added)
/// is itself semantically load-bearing: it's the tiebreak
/// `topological_sort` uses to stay deterministic across runs that build
/// the same graph the same way (`spec.md` §8, "Topological sort is
/// stable").
pub struct Graph {
    inner: petgraph::graph::Graph<Node, (), petgraph::Directed, u32>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph { inner: petgraph::graph::Graph::new() }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.inner[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.inner[id.0]
    }

    /// Nodes in insertion order. This is the canonical "input list order"
    /// `topological_sort` uses as its outer-loop order and tiebreak.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    /// Registers a zero-input (texture-source) node. Asserts
    /// `effect.num_inputs() == 0`.
    pub fn add_input(&mut self, effect: Box<dyn Effect>) -> NodeId {
        assert_eq!(effect.num_inputs(), 0, "add_input: effect declares non-zero num_inputs");
        NodeId(self.inner.add_node(Node::new(effect)))
    }

    /// Registers a node with no edges yet, for callers (the repair
    /// planner) that immediately wire it up themselves via `connect`,
    /// `insert_between` or `replace_sender`/`replace_receiver`. Unlike
    /// `add_input`, doesn't require `num_inputs() == 0` — the caller is
    /// responsible for giving the node exactly as many incoming edges as
    /// its effect declares before the graph is used again.
    pub(crate) fn add_detached(&mut self, effect: Box<dyn Effect>) -> NodeId {
        NodeId(self.inner.add_node(Node::new(effect)))
    }

    /// Registers an effect node connected to `parents`, preserving input
    /// order. Asserts `parents.len() == effect.num_inputs()`.
    pub fn add_effect(&mut self, effect: Box<dyn Effect>, parents: &[NodeId]) -> NodeId {
        assert_eq!(
            parents.len(),
            effect.num_inputs(),
            "add_effect: got {} parents for an effect declaring {} inputs",
            parents.len(),
            effect.num_inputs()
        );
        let id = NodeId(self.inner.add_node(Node::new(effect)));
        for &parent in parents {
            self.connect(parent, id);
        }
        id
    }

    /// Adds a directed edge `sender -> receiver`, appending to both
    /// sides. Does not touch `incoming` ordering semantics beyond
    /// appending, so callers that need a specific input slot must call
    /// `connect` in the order they want the slots filled.
    pub fn connect(&mut self, sender: NodeId, receiver: NodeId) {
        self.inner.add_edge(sender.0, receiver.0, ());
        self.node_mut(sender).outgoing.push(receiver);
        self.node_mut(receiver).incoming.push(sender);
    }

    /// Transfers all of `old`'s outgoing edges to `new`, fixing up each
    /// receiver's `incoming` slot that pointed at `old`.
    pub fn replace_sender(&mut self, old: NodeId, new: NodeId) {
        let receivers = std::mem::take(&mut self.node_mut(old).outgoing);
        for &receiver in &receivers {
            for slot in self.node_mut(receiver).incoming.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.inner.add_edge(new.0, receiver.0, ());
        }
        self.node_mut(new).outgoing.extend(receivers);
    }

    /// Symmetric to `replace_sender`: transfers all of `old`'s incoming
    /// edges to `new`.
    pub fn replace_receiver(&mut self, old: NodeId, new: NodeId) {
        let senders = std::mem::take(&mut self.node_mut(old).incoming);
        for &sender in &senders {
            for slot in self.node_mut(sender).outgoing.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.inner.add_edge(sender.0, new.0, ());
        }
        self.node_mut(new).incoming.extend(senders);
    }

    /// Replaces exactly the edge `sender -> receiver` with
    /// `sender -> middle -> receiver`. Asserts that `middle` ends up with
    /// exactly as many inputs as its effect declares.
    pub fn insert_between(&mut self, sender: NodeId, middle: NodeId, receiver: NodeId) {
        {
            let recv_incoming = &mut self.node_mut(receiver).incoming;
            let mut found = false;
            for slot in recv_incoming.iter_mut() {
                if *slot == sender {
                    *slot = middle;
                    found = true;
                    break;
                }
            }
            assert!(found, "insert_between: sender is not connected to receiver");
        }
        {
            let send_outgoing = &mut self.node_mut(sender).outgoing;
            let pos = send_outgoing.iter().position(|&n| n == receiver);
            let pos = pos.expect("insert_between: sender is not connected to receiver");
            send_outgoing[pos] = middle;
        }
        self.inner.add_edge(sender.0, middle.0, ());
        self.inner.add_edge(middle.0, receiver.0, ());
        self.node_mut(middle).outgoing.push(receiver);
        self.node_mut(middle).incoming.push(sender);

        assert_eq!(
            self.node(middle).incoming.len(),
            self.node(middle).effect.num_inputs(),
            "insert_between: middle node's input count doesn't match its effect after splice"
        );
    }

    /// Stable topological sort: a reverse-finish-order DFS whose outer
    /// loop visits `nodes` in the given order, recursing over each
    /// node's `outgoing` edges before appending it to the result, then
    /// reversing. This is the exact algorithm
    /// `EffectChain::topological_sort`/`topological_sort_visit_node` use
    /// in the original Movit source this spec was distilled from —
    /// confirmed there rather than guessed, since `spec.md` §4.1 and §9
    /// describe it two different ways ("Kahn-style" vs. "reverse-finish
    /// order DFS").
    pub fn topological_sort(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut visited = FxHashSet::default();
        let mut sorted = Vec::with_capacity(nodes.len());
        for &n in nodes {
            self.visit(n, &mut visited, &mut sorted);
        }
        sorted.reverse();
        sorted
    }

    fn visit(&self, node: NodeId, visited: &mut FxHashSet<NodeId>, sorted: &mut Vec<NodeId>) {
        if !visited.insert(node) {
            return;
        }
        for &next in self.node(node).outgoing() {
            self.visit(next, visited, sorted);
        }
        sorted.push(node);
    }

    /// The unique node with no outgoing edges. Asserts exactly one
    /// exists among non-disabled nodes.
    pub fn find_terminal_node(&self) -> NodeId {
        let mut terminal = None;
        for id in self.node_ids() {
            let node = self.node(id);
            if node.disabled {
                continue;
            }
            if node.outgoing().is_empty() {
                assert!(terminal.is_none(), "graph has more than one terminal node");
                terminal = Some(id);
            }
        }
        terminal.expect("graph has no terminal node")
    }
}

impl Default for Graph {
    fn default() -> Graph {
        Graph::new()
    }
}
