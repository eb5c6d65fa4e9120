use crate::node::{NodeId, NodePool};
use crate::policy::Combine;
use crate::traits::{Capabilities, Slot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("node {node:?} is reachable twice")]
    SharedNode { node: NodeId },
    #[error("node {node:?} is freed but still linked")]
    FreedNode { node: NodeId },
    #[error("node {node:?} stores size {stored}, children give {expected}")]
    SizeMismatch {
        node: NodeId,
        stored: usize,
        expected: usize,
    },
    #[error("aggregate of node {node:?} disagrees with its children")]
    AggregateMismatch { node: NodeId },
    #[error("node {node:?} is checked as a root, but hangs under {parent:?}")]
    NotARoot { node: NodeId, parent: NodeId },
    #[error("node {node:?} records parent {recorded:?}, but hangs under {actual:?}")]
    ParentMismatch {
        node: NodeId,
        recorded: Option<NodeId>,
        actual: NodeId,
    },
}

fn report(err: InvariantError) -> InvariantError {
    tracing::debug!(%err, "subtree invariant violated");
    err
}

impl<C, K> NodePool<C, K>
where
    C: Combine,
    C::Data: PartialEq,
    K: Capabilities,
{
    /// Recomputes the size, aggregate and parent invariants of every node
    /// under `root` and reports the first violation.
    ///
    /// When parents are tracked, `root` itself must not be listed as a child
    /// of its recorded parent. A link-cut path-parent is fine.
    ///
    /// Nothing is propagated. A node's own pending update and reversal are
    /// folded into the expected aggregate, since they are already reflected
    /// in what the node stores but not yet in its children.
    pub fn check_subtree(&self, root: Option<NodeId>) -> Result<(), InvariantError> {
        let Some(root) = root else {
            return Ok(());
        };
        if let Some(&p) = self.nodes[root.index()].parent.get() {
            let lists_root = self
                .nodes
                .get(p.index())
                .is_some_and(|parent| parent.ch.contains(&root));
            if lists_root {
                return Err(report(InvariantError::NotARoot {
                    node: root,
                    parent: p,
                }));
            }
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(x) = stack.pop() {
            let node = &self.nodes[x.index()];
            if node.is_freed() {
                return Err(report(InvariantError::FreedNode { node: x }));
            }
            if std::mem::replace(&mut seen[x.index()], true) {
                return Err(report(InvariantError::SharedNode { node: x }));
            }

            let mut expected = 1;
            for c in node.ch {
                if c.is_nil() {
                    continue;
                }
                let child = &self.nodes[c.index()];
                if child.is_freed() {
                    return Err(report(InvariantError::FreedNode { node: c }));
                }
                expected += child.size as usize;
                if let Some(&p) = child.parent.get() {
                    if p != x {
                        return Err(report(InvariantError::ParentMismatch {
                            node: c,
                            recorded: p.to_option(),
                            actual: x,
                        }));
                    }
                }
                stack.push(c);
            }
            if node.size as usize != expected {
                return Err(report(InvariantError::SizeMismatch {
                    node: x,
                    stored: node.size as usize,
                    expected,
                }));
            }

            if let Some(stored) = node.agg.get() {
                if *stored != self.expected_aggregate(x) {
                    return Err(report(InvariantError::AggregateMismatch { node: x }));
                }
            }
        }
        Ok(())
    }

    fn expected_aggregate(&self, x: NodeId) -> C::Data {
        let node = &self.nodes[x.index()];
        let pending = node.lazy.get().filter(|lazy| **lazy != C::lazy_identity());
        let child_agg = |c: NodeId| {
            let child = &self.nodes[c.index()];
            let agg = child.agg.get()?;
            Some(match pending {
                Some(lazy) => C::apply_lazy(agg, &C::segment_lazy(lazy, child.size as usize)),
                None => agg.clone(),
            })
        };

        let [l, r] = node.ch;
        let mut agg = node.val.clone();
        if let Some(left) = (!l.is_nil()).then(|| child_agg(l)).flatten() {
            agg = C::merge(&left, &agg);
        }
        if let Some(right) = (!r.is_nil()).then(|| child_agg(r)).flatten() {
            agg = C::merge(&agg, &right);
        }
        if node.rev.get().copied().unwrap_or(false) {
            C::reverse_data(&mut agg);
        }
        agg
    }
}
