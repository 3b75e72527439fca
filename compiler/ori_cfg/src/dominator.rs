//! Dominator tree and dominance frontiers of a CFG.
//!
//! # Algorithm
//!
//! Lengauer–Tarjan with path compression, run over DFS numbers:
//!
//! 1. Number the nodes reachable from the start in DFS preorder,
//!    recording each node's DFS-tree parent.
//! 2. In reverse preorder, compute each node's semidominator from its
//!    predecessors (Semidominator theorem), bucket the node under its
//!    semidominator, and link it into the forest. Emptying the parent's
//!    bucket fixes every idom that is decided by the Dominator theorem and
//!    defers the rest to an ancestor with the same dominator.
//! 3. A forward pass resolves the deferred idoms.
//!
//! The frontier is computed bottom-up over the dominator tree: `DF(n)` is
//! every successor of `n` plus everything in a child's frontier, minus the
//! nodes `n` strictly dominates.
//!
//! All three results (idoms, tree children, frontiers) are computed on
//! first use and cached. The tree borrows its graph, so any mutation of the
//! CFG requires building a new tree afterwards.
//!
//! # References
//!
//! - Lengauer, Tarjan: "A Fast Algorithm for Finding Dominators in a
//!   Flowgraph" (TOPLAS 1979)
//! - Cytron et al.: "Efficiently Computing Static Single Assignment Form
//!   and the Control Dependence Graph" (TOPLAS 1991)

use std::cell::OnceCell;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::NodeId;
use crate::CfgGraph;

/// Dominator information for one CFG.
///
/// Nodes unreachable from the start have no idom, no children and an
/// empty frontier, and are dominated by nothing.
pub struct DominatorTree<'g> {
    cfg: &'g CfgGraph,
    idom: OnceCell<FxHashMap<NodeId, NodeId>>,
    children: OnceCell<FxHashMap<NodeId, Vec<NodeId>>>,
    frontier: OnceCell<FxHashMap<NodeId, Vec<NodeId>>>,
}

impl<'g> DominatorTree<'g> {
    pub fn new(cfg: &'g CfgGraph) -> Self {
        DominatorTree {
            cfg,
            idom: OnceCell::new(),
            children: OnceCell::new(),
            frontier: OnceCell::new(),
        }
    }

    pub fn cfg(&self) -> &'g CfgGraph {
        self.cfg
    }

    /// Immediate dominator of `node`; `None` for the start and for
    /// unreachable nodes.
    pub fn idom(&self, node: NodeId) -> Option<NodeId> {
        self.idoms().get(&node).copied()
    }

    /// Every `(node, idom)` pair.
    pub fn idoms(&self) -> &FxHashMap<NodeId, NodeId> {
        self.idom.get_or_init(|| compute_idoms(self.cfg))
    }

    /// Nodes whose immediate dominator is `node`, in DFS order.
    pub fn children_of(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get_or_init(|| self.compute_children())
            .get(&node)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Dominance frontier of `node`, sorted by id.
    pub fn frontier_of(&self, node: NodeId) -> &[NodeId] {
        self.frontier
            .get_or_init(|| self.compute_frontiers())
            .get(&node)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Does `a` dominate `b`? Every reachable node dominates itself.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        let idoms = self.idoms();
        if b != self.cfg.start() && !idoms.contains_key(&b) {
            return false;
        }
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match idoms.get(&current) {
                Some(&dom) => current = dom,
                None => return false,
            }
        }
    }

    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Dominator-tree preorder from the start node.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.cfg.len());
        let mut stack = vec![self.cfg.start()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children_of(node).iter().rev().copied());
        }
        order
    }

    fn compute_children(&self) -> FxHashMap<NodeId, Vec<NodeId>> {
        // Each node has at most one idom, so the lists partition the
        // reachable nodes other than the start.
        let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for node in dfs_preorder(self.cfg).vertex {
            if let Some(parent) = self.idom(node) {
                children.entry(parent).or_default().push(node);
            }
        }
        children
    }

    fn compute_frontiers(&self) -> FxHashMap<NodeId, Vec<NodeId>> {
        let mut frontiers: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        // Children before parents.
        for node in self.preorder().into_iter().rev() {
            let mut frontier: FxHashSet<NodeId> = self
                .cfg
                .outgoing(node)
                .into_iter()
                .filter(|&succ| !self.strictly_dominates(node, succ))
                .collect();
            for &child in self.children_of(node) {
                let inherited = frontiers.get(&child).map_or(&[][..], Vec::as_slice);
                frontier.extend(
                    inherited
                        .iter()
                        .copied()
                        .filter(|&w| !self.strictly_dominates(node, w)),
                );
            }
            let mut frontier: Vec<NodeId> = frontier.into_iter().collect();
            frontier.sort_unstable();
            frontiers.insert(node, frontier);
        }
        tracing::trace!(nodes = frontiers.len(), "computed dominance frontiers");
        frontiers
    }
}

// ── DFS numbering ───────────────────────────────────────────────────

const NONE: usize = usize::MAX;

/// DFS spanning tree over the nodes reachable from the start.
struct DfsTree {
    /// `vertex[i]` is the node with DFS number `i`.
    vertex: Vec<NodeId>,
    dfnum: FxHashMap<NodeId, usize>,
    /// DFS number of each node's tree parent (`NONE` for the root).
    parent: Vec<usize>,
}

fn dfs_preorder(cfg: &CfgGraph) -> DfsTree {
    let start = cfg.start();
    let mut tree = DfsTree {
        vertex: vec![start],
        dfnum: FxHashMap::from_iter([(start, 0)]),
        parent: vec![NONE],
    };
    let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
    while let Some((node, next)) = stack.last_mut() {
        let node = *node;
        let Some(&succ) = cfg.outgoing(node).get(*next) else {
            stack.pop();
            continue;
        };
        *next += 1;
        if !tree.dfnum.contains_key(&succ) {
            let parent = tree.dfnum[&node];
            tree.dfnum.insert(succ, tree.vertex.len());
            tree.vertex.push(succ);
            tree.parent.push(parent);
            stack.push((succ, 0));
        }
    }
    tree
}

// ── Lengauer–Tarjan ─────────────────────────────────────────────────

struct Forest {
    semi: Vec<usize>,
    ancestor: Vec<usize>,
    /// Node with the lowest semidominator on the compressed path.
    best: Vec<usize>,
}

impl Forest {
    fn new(size: usize) -> Self {
        Forest {
            semi: (0..size).collect(),
            ancestor: vec![NONE; size],
            best: (0..size).collect(),
        }
    }

    fn link(&mut self, parent: usize, child: usize) {
        self.ancestor[child] = parent;
    }

    /// Ancestor of `v` (below the forest root) with the lowest
    /// semidominator, compressing the path on the way.
    fn eval(&mut self, v: usize) -> usize {
        let mut path = Vec::new();
        let mut u = v;
        while self.ancestor[u] != NONE && self.ancestor[self.ancestor[u]] != NONE {
            path.push(u);
            u = self.ancestor[u];
        }
        for &w in path.iter().rev() {
            let a = self.ancestor[w];
            let b = self.best[a];
            self.ancestor[w] = self.ancestor[a];
            if self.semi[b] < self.semi[self.best[w]] {
                self.best[w] = b;
            }
        }
        self.best[v]
    }
}

fn compute_idoms(cfg: &CfgGraph) -> FxHashMap<NodeId, NodeId> {
    let tree = dfs_preorder(cfg);
    let size = tree.vertex.len();
    let mut forest = Forest::new(size);
    let mut idom = vec![NONE; size];
    let mut same_dom = vec![NONE; size];
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); size];

    for i in (1..size).rev() {
        let node = tree.vertex[i];
        let parent = tree.parent[i];

        let mut semi = parent;
        for pred in cfg.incoming(node) {
            // Unreachable predecessors never enter the DFS tree.
            let Some(&v) = tree.dfnum.get(&pred) else {
                continue;
            };
            let candidate = if v <= i {
                v
            } else {
                let lowest = forest.eval(v);
                forest.semi[lowest]
            };
            semi = semi.min(candidate);
        }
        forest.semi[i] = semi;
        bucket[semi].push(i);
        forest.link(parent, i);

        for v in std::mem::take(&mut bucket[parent]) {
            let y = forest.eval(v);
            if forest.semi[y] == forest.semi[v] {
                idom[v] = parent;
            } else {
                same_dom[v] = y;
            }
        }
    }

    for i in 1..size {
        if same_dom[i] != NONE {
            idom[i] = idom[same_dom[i]];
        }
    }

    let idoms: FxHashMap<NodeId, NodeId> = (1..size)
        .map(|i| (tree.vertex[i], tree.vertex[idom[i]]))
        .collect();
    tracing::debug!(nodes = size, "computed immediate dominators");
    idoms
}
