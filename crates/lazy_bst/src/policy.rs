//! Combine policies: the value-level algebra a node delegates to.

use std::marker::PhantomData;

/// Merge / lazy-update algebra over `Data` and `Lazy`.
///
/// `merge` and `merge_lazy` must be associative. `merge` need not be
/// commutative; aggregates are always folded left to right.
pub trait Combine {
    type Data: Clone;
    type Lazy: Clone + PartialEq;

    /// Result of a query over an empty range.
    fn query_default() -> Self::Data;

    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data;

    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data;

    /// The "nothing pending" update.
    fn lazy_identity() -> Self::Lazy;

    /// Compose `new` after `old`.
    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy;

    /// Scale a point-wise update so it applies to an aggregate over `size`
    /// elements. Assignment-style updates keep the default.
    fn segment_lazy(lazy: &Self::Lazy, _size: usize) -> Self::Lazy {
        lazy.clone()
    }

    /// Turn the aggregate of a sequence into the aggregate of the reversed
    /// sequence. Commutative merges keep the default.
    fn reverse_data(_data: &mut Self::Data) {}
}

/// Plain values with point assignment. `merge` keeps the right operand.
pub struct Assign<T>(PhantomData<T>);

impl<T: Clone + Default + PartialEq> Combine for Assign<T> {
    type Data = T;
    type Lazy = Option<T>;

    fn query_default() -> Self::Data {
        T::default()
    }

    fn merge(_left: &Self::Data, right: &Self::Data) -> Self::Data {
        right.clone()
    }

    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        match lazy {
            Some(value) => value.clone(),
            None => data.clone(),
        }
    }

    fn lazy_identity() -> Self::Lazy {
        None
    }

    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        new.clone().or_else(|| old.clone())
    }
}

/// Range sum with point assignment.
#[derive(Clone, Copy, Debug)]
pub enum RangeSum {}

impl Combine for RangeSum {
    type Data = i64;
    type Lazy = Option<i64>;

    #[inline(always)]
    fn query_default() -> Self::Data {
        0
    }

    #[inline(always)]
    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        left.wrapping_add(*right)
    }

    #[inline(always)]
    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        lazy.unwrap_or(*data)
    }

    #[inline(always)]
    fn lazy_identity() -> Self::Lazy {
        None
    }

    #[inline(always)]
    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        new.or(*old)
    }
}

/// Range sum with range add.
#[derive(Clone, Copy, Debug)]
pub enum RangeSumRangeAdd {}

impl Combine for RangeSumRangeAdd {
    type Data = i64;
    type Lazy = i64;

    #[inline(always)]
    fn query_default() -> Self::Data {
        0
    }

    #[inline(always)]
    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        left.wrapping_add(*right)
    }

    #[inline(always)]
    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        data.wrapping_add(*lazy)
    }

    #[inline(always)]
    fn lazy_identity() -> Self::Lazy {
        0
    }

    #[inline(always)]
    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        old.wrapping_add(*new)
    }

    #[inline(always)]
    fn segment_lazy(lazy: &Self::Lazy, size: usize) -> Self::Lazy {
        lazy.wrapping_mul(size as i64)
    }
}

/// Range sum with range assignment. The most recent assignment wins.
#[derive(Clone, Copy, Debug)]
pub enum RangeSumRangeAssign {}

impl Combine for RangeSumRangeAssign {
    type Data = i64;
    type Lazy = Option<i64>;

    #[inline(always)]
    fn query_default() -> Self::Data {
        0
    }

    #[inline(always)]
    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        left.wrapping_add(*right)
    }

    #[inline(always)]
    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        lazy.unwrap_or(*data)
    }

    #[inline(always)]
    fn lazy_identity() -> Self::Lazy {
        None
    }

    #[inline(always)]
    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        new.or(*old)
    }

    #[inline(always)]
    fn segment_lazy(lazy: &Self::Lazy, size: usize) -> Self::Lazy {
        lazy.map(|value| value.wrapping_mul(size as i64))
    }
}

/// Range minimum with range add.
#[derive(Clone, Copy, Debug)]
pub enum RangeMinRangeAdd {}

impl Combine for RangeMinRangeAdd {
    type Data = i64;
    type Lazy = i64;

    #[inline(always)]
    fn query_default() -> Self::Data {
        i64::MAX
    }

    #[inline(always)]
    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        *left.min(right)
    }

    #[inline(always)]
    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        data.wrapping_add(*lazy)
    }

    #[inline(always)]
    fn lazy_identity() -> Self::Lazy {
        0
    }

    #[inline(always)]
    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        old.wrapping_add(*new)
    }
}

/// Sequence concatenation with range assignment.
///
/// Order sensitive: the aggregate is the subtree read left to right.
pub struct Concat<T>(PhantomData<T>);

impl<T: Clone + PartialEq> Combine for Concat<T> {
    type Data = Vec<T>;
    type Lazy = Option<T>;

    fn query_default() -> Self::Data {
        Vec::new()
    }

    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        let mut out = Vec::with_capacity(left.len() + right.len());
        out.extend_from_slice(left);
        out.extend_from_slice(right);
        out
    }

    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        match lazy {
            Some(value) => vec![value.clone(); data.len()],
            None => data.clone(),
        }
    }

    fn lazy_identity() -> Self::Lazy {
        None
    }

    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        new.clone().or_else(|| old.clone())
    }

    fn reverse_data(data: &mut Self::Data) {
        data.reverse();
    }
}

/// `x -> a * x + b` over wrapping `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affine {
    pub a: i64,
    pub b: i64,
}

impl Affine {
    pub const IDENTITY: Self = Self { a: 1, b: 0 };

    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    pub fn eval(self, x: i64) -> i64 {
        self.a.wrapping_mul(x).wrapping_add(self.b)
    }

    /// `next ∘ self`: apply `self` first, then `next`.
    pub fn then(self, next: Self) -> Self {
        Self {
            a: next.a.wrapping_mul(self.a),
            b: next.a.wrapping_mul(self.b).wrapping_add(next.b),
        }
    }

    /// `self` applied `k` times.
    pub fn pow(self, mut k: usize) -> Self {
        let mut acc = Self::IDENTITY;
        let mut base = self;
        while k > 0 {
            if k & 1 == 1 {
                acc = acc.then(base);
            }
            base = base.then(base);
            k >>= 1;
        }
        acc
    }
}

/// Composite of a run of affine maps, read in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Composite {
    /// Left to right.
    pub forward: Affine,
    /// Right to left.
    pub backward: Affine,
}

impl Composite {
    pub fn single(f: Affine) -> Self {
        Self {
            forward: f,
            backward: f,
        }
    }
}

/// Path composition of affine maps with range assignment.
///
/// The forward and backward composites are both kept, so reversing a
/// segment is a swap.
#[derive(Clone, Copy, Debug)]
pub enum AffineComposite {}

impl Combine for AffineComposite {
    type Data = Composite;
    type Lazy = Option<Affine>;

    fn query_default() -> Self::Data {
        Composite::single(Affine::IDENTITY)
    }

    fn merge(left: &Self::Data, right: &Self::Data) -> Self::Data {
        Composite {
            forward: left.forward.then(right.forward),
            backward: right.backward.then(left.backward),
        }
    }

    fn apply_lazy(data: &Self::Data, lazy: &Self::Lazy) -> Self::Data {
        match lazy {
            Some(f) => Composite::single(*f),
            None => *data,
        }
    }

    fn lazy_identity() -> Self::Lazy {
        None
    }

    fn merge_lazy(old: &Self::Lazy, new: &Self::Lazy) -> Self::Lazy {
        new.or(*old)
    }

    fn segment_lazy(lazy: &Self::Lazy, size: usize) -> Self::Lazy {
        lazy.map(|f| f.pow(size))
    }

    fn reverse_data(data: &mut Self::Data) {
        std::mem::swap(&mut data.forward, &mut data.backward);
    }
}
