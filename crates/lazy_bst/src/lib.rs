mod check;
mod node;
mod policy;
mod traits;


pub use check::InvariantError;
pub use node::{NodeId, NodePool, Side};
pub use policy::{
    Affine, AffineComposite, Assign, Combine, Composite, Concat, RangeMinRangeAdd, RangeSum,
    RangeSumRangeAdd, RangeSumRangeAssign,
};
pub use traits::{
    AggCaps, Capabilities, Caps, LazyAggCaps, No, Off, On, Slot, Toggle, TreapCaps, ValCaps, Yes,
};

/// Plain value node with reversals and a parent link.
pub type ValPool<C> = NodePool<C, ValCaps>;
/// Aggregate node with reversals and a parent link.
pub type AggPool<C> = NodePool<C, AggCaps>;
/// Aggregate node with lazy range updates, reversals and a parent link.
pub type LazyAggPool<C> = NodePool<C, LazyAggCaps>;
