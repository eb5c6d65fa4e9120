use std::fmt;
use std::mem;

use crate::policy::Combine;
use crate::traits::{Capabilities, Slot, Toggle, Yes};

/// Index of a node inside its [`NodePool`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const NIL: Self = Self(u32::MAX);

    #[inline(always)]
    pub(crate) fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline(always)]
    pub(crate) fn from_option(id: Option<NodeId>) -> Self {
        id.unwrap_or(Self::NIL)
    }

    #[inline(always)]
    pub(crate) fn to_option(self) -> Option<NodeId> {
        if self.is_nil() { None } else { Some(self) }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            f.write_str("#nil")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline(always)]
    fn idx(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    #[inline(always)]
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

type AggSlot<C, K> = <<K as Capabilities>::Queries as Toggle>::Slot<<C as Combine>::Data>;
type LazySlot<C, K> = <<K as Capabilities>::Updates as Toggle>::Slot<<C as Combine>::Lazy>;
type RevSlot<K> = <<K as Capabilities>::Reversals as Toggle>::Slot<bool>;
type ParentSlot<K> = <<K as Capabilities>::Parent as Toggle>::Slot<NodeId>;

/// One tree node. Fields that `K` switches off are zero-sized.
pub(crate) struct Node<C: Combine, K: Capabilities> {
    pub(crate) ch: [NodeId; 2],
    pub(crate) parent: ParentSlot<K>,
    /// Zero once the slot has been freed.
    pub(crate) size: u32,
    pub(crate) val: C::Data,
    pub(crate) agg: AggSlot<C, K>,
    pub(crate) lazy: LazySlot<C, K>,
    pub(crate) rev: RevSlot<K>,
}

impl<C: Combine, K: Capabilities> Node<C, K> {
    fn new(val: C::Data) -> Self {
        Self {
            ch: [NodeId::NIL; 2],
            parent: Slot::fill(|| NodeId::NIL),
            size: 1,
            agg: Slot::fill(|| val.clone()),
            lazy: Slot::fill(C::lazy_identity),
            rev: Slot::fill(|| false),
            val,
        }
    }

    pub(crate) fn is_freed(&self) -> bool {
        self.size == 0
    }
}

/// Arena that owns every node of one or more trees.
///
/// Child links are owning in the sense of the tree shape: a node is the child
/// of at most one node. Parent links, when `K` tracks them, are plain
/// back-references and never own anything.
///
/// The pool never propagates or updates on its own. Drivers call
/// [`propagate`](Self::propagate) before reading a node's children and
/// [`update`](Self::update) after changing them, bottom-up.
pub struct NodePool<C: Combine, K: Capabilities> {
    pub(crate) nodes: Vec<Node<C, K>>,
    pub(crate) free: Vec<NodeId>,
}

impl<C: Combine, K: Capabilities> Default for NodePool<C, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Combine, K: Capabilities> NodePool<C, K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates a detached node of size 1 holding `value`.
    pub fn alloc(&mut self, value: C::Data) -> NodeId {
        let node = Node::new(value);
        if let Some(x) = self.free.pop() {
            tracing::trace!(node = ?x, "recycling freed node slot");
            self.nodes[x.index()] = node;
            return x;
        }
        assert!(self.nodes.len() < u32::MAX as usize, "node pool exhausted");
        if self.nodes.len() == self.nodes.capacity() {
            tracing::trace!(capacity = self.nodes.capacity(), "growing node pool");
        }
        let x = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        x
    }

    /// Releases `x` and returns its value.
    ///
    /// Only `x` is released. Its children stay allocated and the caller is
    /// responsible for unlinking `x` from its parent first.
    pub fn free(&mut self, x: NodeId) -> C::Data {
        let node = self.node_mut(x);
        let old = mem::replace(node, Node::new(C::query_default()));
        node.size = 0;
        self.free.push(x);
        tracing::trace!(node = ?x, "freed node");
        old.val
    }

    #[inline(always)]
    pub(crate) fn node(&self, x: NodeId) -> &Node<C, K> {
        debug_assert!(!x.is_nil());
        let node = &self.nodes[x.index()];
        debug_assert!(!node.is_freed(), "access to freed node {x:?}");
        node
    }

    #[inline(always)]
    fn node_mut(&mut self, x: NodeId) -> &mut Node<C, K> {
        debug_assert!(!x.is_nil());
        let node = &mut self.nodes[x.index()];
        debug_assert!(!node.is_freed(), "access to freed node {x:?}");
        node
    }

    pub fn value(&self, x: NodeId) -> &C::Data {
        &self.node(x).val
    }

    /// Replaces the value of `x`. Call [`update`](Self::update) on `x` and
    /// its ancestors afterwards.
    pub fn set_value(&mut self, x: NodeId, value: C::Data) {
        self.node_mut(x).val = value;
    }

    pub fn size(&self, x: NodeId) -> usize {
        self.node(x).size as usize
    }

    /// Size of a possibly empty subtree.
    pub fn subtree_size(&self, x: Option<NodeId>) -> usize {
        x.map_or(0, |x| self.size(x))
    }

    #[inline(always)]
    fn sz(&self, x: NodeId) -> u32 {
        if x.is_nil() { 0 } else { self.node(x).size }
    }

    pub fn left(&self, x: NodeId) -> Option<NodeId> {
        self.node(x).ch[0].to_option()
    }

    pub fn right(&self, x: NodeId) -> Option<NodeId> {
        self.node(x).ch[1].to_option()
    }

    pub fn child(&self, x: NodeId, side: Side) -> Option<NodeId> {
        self.node(x).ch[side.idx()].to_option()
    }

    /// Links `child` under `x` on `side`, replacing whatever was there.
    ///
    /// The previous child is not detached; take it first if it must stay
    /// consistent. When parents are tracked, `child`'s parent becomes `x`.
    pub fn set_child(&mut self, x: NodeId, side: Side, child: Option<NodeId>) {
        let c = NodeId::from_option(child);
        self.node_mut(x).ch[side.idx()] = c;
        if !c.is_nil() {
            if let Some(p) = self.node_mut(c).parent.get_mut() {
                *p = x;
            }
        }
    }

    pub fn set_left(&mut self, x: NodeId, child: Option<NodeId>) {
        self.set_child(x, Side::Left, child);
    }

    pub fn set_right(&mut self, x: NodeId, child: Option<NodeId>) {
        self.set_child(x, Side::Right, child);
    }

    /// Detaches and returns the child of `x` on `side`.
    ///
    /// The detached child becomes a root. `x` is not updated.
    pub fn take_child(&mut self, x: NodeId, side: Side) -> Option<NodeId> {
        let c = mem::replace(&mut self.node_mut(x).ch[side.idx()], NodeId::NIL);
        if !c.is_nil() {
            if let Some(p) = self.node_mut(c).parent.get_mut() {
                *p = NodeId::NIL;
            }
        }
        c.to_option()
    }

    pub fn take_left(&mut self, x: NodeId) -> Option<NodeId> {
        self.take_child(x, Side::Left)
    }

    pub fn take_right(&mut self, x: NodeId) -> Option<NodeId> {
        self.take_child(x, Side::Right)
    }

    #[inline(always)]
    fn stored_agg(&self, x: NodeId) -> Option<&C::Data> {
        if x.is_nil() { None } else { self.node(x).agg.get() }
    }

    /// Recomputes size and aggregate of `x` from its children.
    ///
    /// Both children must already be propagated and updated. Children are
    /// not touched.
    pub fn update(&mut self, x: NodeId) {
        let [l, r] = self.node(x).ch;
        let size = 1 + self.sz(l) + self.sz(r);
        let agg = if K::RANGE_QUERIES {
            let mut agg = self.node(x).val.clone();
            if let Some(left) = self.stored_agg(l) {
                agg = C::merge(left, &agg);
            }
            if let Some(right) = self.stored_agg(r) {
                agg = C::merge(&agg, right);
            }
            Some(agg)
        } else {
            None
        };

        let node = self.node_mut(x);
        node.size = size;
        if let (Some(slot), Some(agg)) = (node.agg.get_mut(), agg) {
            *slot = agg;
        }
    }

    /// Pushes pending reversal, then pending lazy update, one level down.
    ///
    /// The push is shallow: children are marked, grandchildren are left
    /// alone. Does nothing when nothing is pending.
    pub fn propagate(&mut self, x: NodeId) {
        if K::RANGE_REVERSALS {
            let node = self.node_mut(x);
            let flipped = node.rev.get_mut().is_some_and(|flag| mem::take(flag));
            if flipped {
                node.ch.swap(0, 1);
                let [l, r] = node.ch;
                self.mark_reversed(l);
                self.mark_reversed(r);
            }
        }

        if K::RANGE_UPDATES {
            let node = self.node_mut(x);
            let lazy = match node.lazy.get_mut() {
                Some(lazy) if *lazy != C::lazy_identity() => {
                    Some(mem::replace(lazy, C::lazy_identity()))
                }
                _ => None,
            };
            if let Some(lazy) = lazy {
                let [l, r] = node.ch;
                if !l.is_nil() {
                    self.apply(l, &lazy);
                }
                if !r.is_nil() {
                    self.apply(r, &lazy);
                }
            }
        }
    }

    /// Applies `lazy` to the whole subtree of `x`.
    ///
    /// Eager on `x` itself (value, and aggregate scaled by the subtree size),
    /// deferred for the children through the pending update.
    pub fn apply(&mut self, x: NodeId, lazy: &C::Lazy) {
        let node = self.node_mut(x);
        node.val = C::apply_lazy(&node.val, lazy);
        let size = node.size as usize;
        if let Some(agg) = node.agg.get_mut() {
            *agg = if K::RANGE_UPDATES {
                C::apply_lazy(agg, &C::segment_lazy(lazy, size))
            } else {
                C::apply_lazy(agg, lazy)
            };
        }
        if let Some(pending) = node.lazy.get_mut() {
            *pending = C::merge_lazy(pending, lazy);
        }
    }

    fn mark_reversed(&mut self, x: NodeId) {
        if x.is_nil() {
            return;
        }
        let node = self.node_mut(x);
        if let Some(flag) = node.rev.get_mut() {
            *flag ^= true;
            if let Some(agg) = node.agg.get_mut() {
                C::reverse_data(agg);
            }
        }
    }

    /// Propagates every node of a root-to-node path, root first.
    pub fn propagate_path(&mut self, path: &[NodeId]) {
        for &x in path {
            self.propagate(x);
        }
    }

    /// Updates every node of a root-to-node path, deepest first.
    pub fn update_path(&mut self, path: &[NodeId]) {
        for &x in path.iter().rev() {
            self.update(x);
        }
    }

    /// Allocates `values` as a perfectly balanced subtree in sequence order
    /// and returns its root.
    pub fn build<I>(&mut self, values: I) -> Option<NodeId>
    where
        I: IntoIterator<Item = C::Data>,
    {
        let ids: Vec<NodeId> = values.into_iter().map(|value| self.alloc(value)).collect();
        self.link_balanced(&ids).to_option()
    }

    fn link_balanced(&mut self, ids: &[NodeId]) -> NodeId {
        if ids.is_empty() {
            return NodeId::NIL;
        }
        let mid = ids.len() / 2;
        let x = ids[mid];
        let l = self.link_balanced(&ids[..mid]);
        let r = self.link_balanced(&ids[mid + 1..]);
        self.set_left(x, l.to_option());
        self.set_right(x, r.to_option());
        self.update(x);
        x
    }

    /// Values of the subtree in sequence order.
    ///
    /// Propagates every visited node, so pending state is pushed all the way
    /// down to the leaves. Walks with an explicit stack.
    pub fn in_order(&mut self, root: Option<NodeId>) -> Vec<C::Data> {
        let mut out = Vec::with_capacity(self.subtree_size(root));
        let mut stack = Vec::new();
        let mut cur = NodeId::from_option(root);
        loop {
            while !cur.is_nil() {
                self.propagate(cur);
                stack.push(cur);
                cur = self.node(cur).ch[0];
            }
            let Some(x) = stack.pop() else {
                break;
            };
            out.push(self.node(x).val.clone());
            cur = self.node(x).ch[1];
        }
        out
    }
}

impl<C: Combine, K: Capabilities<Queries = Yes>> NodePool<C, K> {
    /// Aggregate of the subtree rooted at `x`, pending updates included.
    pub fn aggregate(&self, x: NodeId) -> &C::Data {
        &self.node(x).agg.0
    }

    /// Aggregate of a possibly empty subtree.
    pub fn subtree_aggregate(&self, x: Option<NodeId>) -> C::Data {
        match x {
            Some(x) => self.aggregate(x).clone(),
            None => C::query_default(),
        }
    }
}

impl<C: Combine, K: Capabilities<Updates = Yes>> NodePool<C, K> {
    /// Update still owed to the children of `x`.
    pub fn pending_lazy(&self, x: NodeId) -> &C::Lazy {
        &self.node(x).lazy.0
    }
}

impl<C: Combine, K: Capabilities<Reversals = Yes>> NodePool<C, K> {
    /// Reverses the subtree of `x`.
    ///
    /// The aggregate of `x` reflects the new order immediately; the children
    /// are swapped on the next [`propagate`](Self::propagate).
    pub fn reverse(&mut self, x: NodeId) {
        self.mark_reversed(x);
    }

    pub fn is_reversed(&self, x: NodeId) -> bool {
        self.node(x).rev.0
    }
}

impl<C: Combine, K: Capabilities<Parent = Yes>> NodePool<C, K> {
    pub fn parent(&self, x: NodeId) -> Option<NodeId> {
        self.node(x).parent.0.to_option()
    }

    /// Overwrites the parent link of `x` without touching any child link.
    ///
    /// Link-cut trees use this for path-parent pointers.
    pub fn set_parent(&mut self, x: NodeId, parent: Option<NodeId>) {
        self.node_mut(x).parent.0 = NodeId::from_option(parent);
    }

    /// Which child of its parent `x` is, or `None` if `x` is a root.
    ///
    /// A parent that does not list `x` as a child (a link-cut path-parent)
    /// makes `x` a root.
    pub fn side_of(&self, x: NodeId) -> Option<Side> {
        let p = self.node(x).parent.0;
        if p.is_nil() {
            return None;
        }
        let [l, r] = self.node(p).ch;
        if l == x {
            Some(Side::Left)
        } else if r == x {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn is_root(&self, x: NodeId) -> bool {
        self.side_of(x).is_none()
    }

    /// Path from the root of the tree containing `x` down to `x`.
    ///
    /// Feed it to [`propagate_path`](Self::propagate_path) before rotating
    /// `x` upwards.
    pub fn root_path(&self, x: NodeId) -> Vec<NodeId> {
        let mut path = vec![x];
        let mut y = x;
        while self.side_of(y).is_some() {
            y = self.node(y).parent.0;
            path.push(y);
        }
        path.reverse();
        path
    }
}
