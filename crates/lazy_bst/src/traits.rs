//! Type-level capability switches for [`NodePool`](crate::NodePool).
//!
//! A node only carries storage for the capabilities its descriptor enables.
//! Disabled fields are [`Off`], which is zero-sized, so a plain value node pays
//! nothing for the aggregate or lazy machinery it does not use.

use std::marker::PhantomData;

/// Storage that exists only when its capability is switched on.
pub trait Slot<T> {
    fn fill(init: impl FnOnce() -> T) -> Self;
    fn get(&self) -> Option<&T>;
    fn get_mut(&mut self) -> Option<&mut T>;
}

/// Storage for a disabled capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Off;

/// Storage for an enabled capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct On<T>(pub T);

impl<T> Slot<T> for Off {
    #[inline(always)]
    fn fill(_init: impl FnOnce() -> T) -> Self {
        Off
    }

    #[inline(always)]
    fn get(&self) -> Option<&T> {
        None
    }

    #[inline(always)]
    fn get_mut(&mut self) -> Option<&mut T> {
        None
    }
}

impl<T> Slot<T> for On<T> {
    #[inline(always)]
    fn fill(init: impl FnOnce() -> T) -> Self {
        On(init())
    }

    #[inline(always)]
    fn get(&self) -> Option<&T> {
        Some(&self.0)
    }

    #[inline(always)]
    fn get_mut(&mut self) -> Option<&mut T> {
        Some(&mut self.0)
    }
}

pub trait Toggle {
    const ENABLED: bool;
    type Slot<T>: Slot<T>;
}

#[derive(Clone, Copy, Debug)]
pub enum Yes {}

#[derive(Clone, Copy, Debug)]
pub enum No {}

impl Toggle for Yes {
    const ENABLED: bool = true;
    type Slot<T> = On<T>;
}

impl Toggle for No {
    const ENABLED: bool = false;
    type Slot<T> = Off;
}

/// Which optional parts of a node exist.
///
/// Drivers can branch on the associated constants; the branches are resolved
/// at monomorphization time.
pub trait Capabilities {
    /// Subtree aggregate.
    type Queries: Toggle;
    /// Pending lazy update pushed to children on propagation.
    type Updates: Toggle;
    /// Pending reversal flag.
    type Reversals: Toggle;
    /// Non-owning parent link.
    type Parent: Toggle;

    const RANGE_QUERIES: bool = <Self::Queries as Toggle>::ENABLED;
    const RANGE_UPDATES: bool = <Self::Updates as Toggle>::ENABLED;
    const RANGE_REVERSALS: bool = <Self::Reversals as Toggle>::ENABLED;
    const HAS_PARENT: bool = <Self::Parent as Toggle>::ENABLED;
}

/// Capability descriptor assembled from four switches, in the order
/// queries, updates, reversals, parent.
pub struct Caps<Q, U, R, P>(PhantomData<(Q, U, R, P)>);

impl<Q: Toggle, U: Toggle, R: Toggle, P: Toggle> Capabilities for Caps<Q, U, R, P> {
    type Queries = Q;
    type Updates = U;
    type Reversals = R;
    type Parent = P;
}

/// Plain value with point assignment and reversals, for splay and link-cut trees.
pub type ValCaps = Caps<No, No, Yes, Yes>;

/// Subtree aggregate with point assignment and reversals.
pub type AggCaps = Caps<Yes, No, Yes, Yes>;

/// Subtree aggregate with lazy range updates and reversals.
pub type LazyAggCaps = Caps<Yes, Yes, Yes, Yes>;

/// [`LazyAggCaps`] without the parent link; enough for split/merge treaps.
pub type TreapCaps = Caps<Yes, Yes, Yes, No>;
