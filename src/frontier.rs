use crate::layout::Layout;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

/// Stable handle to a layout stored in a `Frontier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node<L> {
    layout: L,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

/// The BFS worklist and the visited set in one structure.
///
/// Layouts are appended in discovery order and never removed. A read cursor
/// marks the next layout to expand. Layouts are also bucketed by their box
/// hash so duplicate lookups only scan layouts with the same hash.
#[derive(Debug, Clone)]
pub struct Frontier<L> {
    nodes: Vec<Node<L>>,
    buckets: FxHashMap<u64, SmallVec<[NodeId; 2]>>,
    cursor: usize,
}

impl<L: Layout> Frontier<L> {
    pub fn new() -> Self {
        Frontier {
            nodes: Vec::new(),
            buckets: FxHashMap::default(),
            cursor: 0,
        }
    }

    /// Append `layout`, linking it under `parent` if given.
    pub fn add(&mut self, layout: L, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = match parent {
            Some(parent) => {
                let node = &mut self.nodes[parent.0];
                node.children.push(id);
                node.depth + 1
            }
            None => 0,
        };
        self.buckets.entry(layout.box_hash()).or_default().push(id);
        self.nodes.push(Node {
            layout,
            parent,
            children: Vec::new(),
            depth,
        });
        id
    }

    pub fn add_all(
        &mut self,
        layouts: impl IntoIterator<Item = (L, Option<NodeId>)>,
    ) -> Vec<NodeId> {
        layouts
            .into_iter()
            .map(|(layout, parent)| self.add(layout, parent))
            .collect()
    }

    /// The next layout to expand, advancing the cursor.
    pub fn next(&mut self) -> Option<NodeId> {
        if self.cursor < self.nodes.len() {
            let id = NodeId(self.cursor);
            self.cursor += 1;
            Some(id)
        } else {
            None
        }
    }

    /// Number of layouts added but not yet handed out by `next`.
    pub fn pending(&self) -> usize {
        self.nodes.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn layout(&self, id: NodeId) -> &L {
        &self.nodes[id.0].layout
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &L)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i), &node.layout))
    }

    /// Indexed layouts with the same boxes as `layout` that also satisfy
    /// `accept`, in discovery order.
    pub fn find_equal_or_equivalent<'a, F>(
        &'a self,
        layout: &'a L,
        accept: F,
    ) -> impl Iterator<Item = NodeId> + 'a
    where
        F: Fn(&L) -> bool + 'a,
    {
        self.buckets
            .get(&layout.box_hash())
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&id| {
                let prior = &self.nodes[id.0].layout;
                prior.same_boxes(layout) && accept(prior)
            })
    }

    pub fn find<F>(&self, layout: &L, accept: F) -> Option<NodeId>
    where
        F: Fn(&L) -> bool,
    {
        self.buckets
            .get(&layout.box_hash())?
            .iter()
            .copied()
            .find(|&id| {
                let prior = &self.nodes[id.0].layout;
                prior.same_boxes(layout) && accept(prior)
            })
    }

    /// Layouts from the root down to `id`, inclusive.
    pub fn path_to(&self, id: NodeId) -> Vec<&L> {
        let mut path = Vec::with_capacity(self.depth(id) + 1);
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(self.layout(node));
            current = self.parent(node);
        }
        path.reverse();
        path
    }
}

impl<L: Layout> Default for Frontier<L> {
    fn default() -> Self {
        Self::new()
    }
}
