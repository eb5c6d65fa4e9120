use std::cmp::Ordering;
use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{apply_medium_runtime_config, apply_small_runtime_config, seed_base, seed_for_iter};
use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, BenchmarkId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lazy_bst::{Capabilities, Combine, NodeId, NodePool};

pub const SIZES: [usize; 4] = [1_000, 16_000, 256_000, 1_000_000];
const OPS_PER_ITER: usize = 1_000;
const VALUE_RANGE: std::ops::RangeInclusive<i64> = -1_000_000_000..=1_000_000_000;
const DELTA_RANGE: std::ops::RangeInclusive<i64> = -1_000..=1_000;
const REVERSE_RATIO: f64 = 0.25;

/// One root-to-node touch: descend to `index`, stop `depth` levels down the
/// path (wrapped), and modify the subtree hanging there.
#[derive(Clone, Copy, Debug)]
pub struct Op {
    pub index: usize,
    pub depth: u32,
    pub delta: i64,
    pub reverse: bool,
}

fn apply_runtime_config_for_size<M: Measurement>(size: usize, group: &mut BenchmarkGroup<'_, M>) {
    if size >= 256_000 {
        apply_medium_runtime_config(group);
    } else {
        apply_small_runtime_config(group);
    }
}

fn generate_ops<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<Op> {
    (0..OPS_PER_ITER)
        .map(|_| Op {
            index: rng.random_range(0..size),
            depth: rng.random(),
            delta: rng.random_range(DELTA_RANGE),
            reverse: rng.random_bool(REVERSE_RATIO),
        })
        .collect()
}

/// Walks from `root` to the `index`-th node in sequence order, propagating
/// every node on the way, and leaves the visited nodes in `path`.
pub fn descend<C: Combine, K: Capabilities>(
    pool: &mut NodePool<C, K>,
    root: NodeId,
    mut index: usize,
    path: &mut Vec<NodeId>,
) {
    path.clear();
    let mut cur = Some(root);
    while let Some(x) = cur {
        pool.propagate(x);
        path.push(x);
        let left = pool.left(x);
        let left_size = pool.subtree_size(left);
        cur = match index.cmp(&left_size) {
            Ordering::Less => left,
            Ordering::Equal => None,
            Ordering::Greater => {
                index -= left_size + 1;
                pool.right(x)
            }
        };
    }
}

/// Benchmarks `touch` on random root paths of a balanced tree of `size`
/// nodes. The touched node is the last element of the path handed to
/// `touch`; its ancestors are updated afterwards.
pub fn bench_paths<C, K, M>(
    group: &mut BenchmarkGroup<'_, M>,
    label: &str,
    size: usize,
    to_data: impl Fn(i64) -> C::Data,
    mut touch: impl FnMut(&mut NodePool<C, K>, NodeId, &Op),
) where
    C: Combine,
    K: Capabilities,
    M: Measurement<Value = Duration>,
{
    apply_runtime_config_for_size(size, group);
    let base_seed = seed_base(label, size as u64);
    let mut init_rng = StdRng::seed_from_u64(base_seed);
    let mut pool = NodePool::<C, K>::with_capacity(size);
    let values: Vec<i64> = (0..size).map(|_| init_rng.random_range(VALUE_RANGE)).collect();
    let Some(root) = pool.build(values.into_iter().map(&to_data)) else {
        return;
    };
    let mut path = Vec::new();

    group.bench_function(BenchmarkId::new(label, size), |bencher| {
        bencher.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for iter in 0..iters {
                let mut op_rng = StdRng::seed_from_u64(seed_for_iter(base_seed, iter));
                let ops = generate_ops(size, &mut op_rng);
                let start = Instant::now();
                for op in &ops {
                    descend(&mut pool, root, op.index, &mut path);
                    let keep = 1 + op.depth as usize % path.len();
                    path.truncate(keep);
                    touch(&mut pool, path[keep - 1], op);
                    pool.update_path(&path[..keep - 1]);
                }
                black_box(pool.value(root));
                total += start.elapsed();
            }
            total
        })
    });
}
