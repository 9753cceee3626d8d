use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fenwick_store::{
    BitF, BitL, ByteF, ByteL, FenwickTree, FixedF, FixedL, Hybrid, TypeF,
    TypeL,
};

const BOUND: u64 = 64;

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

//------------ Naive model ---------------------------------------------------

// The sequence itself, queried the slow way. Every variant must agree with
// this on everything except bit_count.
struct Naive {
    seq: Vec<u64>,
    bound: u64,
}

impl Naive {
    fn new(seq: &[u64], bound: u64) -> Self {
        Self { seq: seq.to_vec(), bound }
    }

    fn prefix(&self, idx: usize) -> u64 {
        self.seq[..idx].iter().sum()
    }

    fn add(&mut self, idx: usize, inc: i64) {
        self.seq[idx - 1] = (self.seq[idx - 1] as i64 + inc) as u64;
    }

    fn find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut sum = 0;
        for (i, &v) in self.seq.iter().enumerate() {
            if sum + v > *val {
                break;
            }
            sum += v;
            node = i + 1;
        }
        *val -= sum;
        node
    }

    fn comp_find(&self, val: &mut u64) -> usize {
        let complement: Vec<u64> =
            self.seq.iter().map(|&v| self.bound - v).collect();
        Naive::new(&complement, self.bound).find(val)
    }
}

fn random_sequence(rng: &mut StdRng, len: usize, bound: u64) -> Vec<u64> {
    (0..len).map(|_| rng.random_range(0..=bound)).collect()
}

// A random in-range adjustment for element idx: the element stays within
// 0..=bound no matter its current value.
fn random_adjustment(rng: &mut StdRng, current: u64, bound: u64) -> i64 {
    rng.random_range(0..=bound) as i64 - current as i64
}

//------------ Per-variant suite ---------------------------------------------

macro_rules! variant_suite {
    ($name:ident, $tree:ty) => {
        mod $name {
            use super::*;

            #[test]
            fn scenario_small_increments() {
                common::init();
                let mut tree = <$tree>::new(&[3, 1, 4, 1, 5, 9, 2, 6]);

                assert_eq!(tree.size(), 8);
                assert_eq!(tree.prefix(0), 0);
                assert_eq!(tree.prefix(4), 9);
                assert_eq!(tree.prefix(8), 31);

                let mut val = 8;
                assert_eq!(tree.find(&mut val), 3);
                assert_eq!(val, 0);

                tree.add(2, 10);
                assert_eq!(tree.prefix(2), 14);
                assert_eq!(tree.prefix(1), 3);
            }

            #[test]
            fn scenario_all_ones() {
                common::init();
                let tree = <$tree>::new(&[1; 15]);

                let mut val = 7;
                assert_eq!(tree.find(&mut val), 7);
                assert_eq!(tree.prefix(15), 15);

                let mut val = 0;
                assert_eq!(tree.comp_find(&mut val), 0);
                assert_eq!(val, 0);
            }

            #[test]
            fn scenario_all_zeros() {
                common::init();
                let tree = <$tree>::new(&[0; 16]);

                for k in 0..=16 {
                    assert_eq!(tree.prefix(k), 0);
                }
                // No prefix ever exceeds zero, so the whole range qualifies.
                let mut val = 0;
                assert_eq!(tree.find(&mut val), 16);
            }

            #[test]
            fn scenario_saturated() {
                common::init();
                let tree = <$tree>::new(&[64; 8]);

                assert_eq!(tree.prefix(8), 512);
                let mut val = 63;
                assert_eq!(tree.find(&mut val), 0);
                assert_eq!(val, 63);
                let mut val = 64;
                assert_eq!(tree.find(&mut val), 1);
                assert_eq!(val, 0);
                let mut val = 511;
                assert_eq!(tree.find(&mut val), 7);
                let mut val = 512;
                assert_eq!(tree.find(&mut val), 8);
            }

            #[test]
            fn empty_and_single() {
                common::init();
                let tree = <$tree>::new(&[]);
                assert_eq!(tree.size(), 0);
                assert_eq!(tree.prefix(0), 0);
                let mut val = 42;
                assert_eq!(tree.find(&mut val), 0);

                let mut tree = <$tree>::new(&[17]);
                assert_eq!(tree.prefix(1), 17);
                let mut val = 16;
                assert_eq!(tree.find(&mut val), 0);
                assert_eq!(val, 16);
                let mut val = 17;
                assert_eq!(tree.find(&mut val), 1);
                tree.add(1, -17);
                assert_eq!(tree.prefix(1), 0);
            }

            #[test]
            fn prefix_matches_model() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0x5eed);
                for len in [1, 2, 3, 7, 8, 9, 100, 1023, 1024, 1025] {
                    let seq = random_sequence(&mut rng, len, BOUND);
                    let tree = <$tree>::new(&seq);
                    let model = Naive::new(&seq, BOUND);

                    for k in 0..=len {
                        assert_eq!(
                            tree.prefix(k),
                            model.prefix(k),
                            "prefix({}) of {} elements",
                            k,
                            len
                        );
                    }
                }
            }

            #[test]
            fn find_inverse() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0xf1d0);
                let seq = random_sequence(&mut rng, 300, BOUND);
                let tree = <$tree>::new(&seq);
                let model = Naive::new(&seq, BOUND);
                let total = model.prefix(seq.len());

                for val in 0..total {
                    let mut tree_val = val;
                    let mut model_val = val;
                    let node = tree.find(&mut tree_val);
                    assert_eq!(node, model.find(&mut model_val));
                    assert_eq!(tree_val, model_val);
                    // The defining property of find.
                    assert!(tree.prefix(node) <= val);
                    if node < tree.size() {
                        assert!(tree.prefix(node + 1) > val);
                    }
                }
            }

            #[test]
            fn add_linearity() {
                common::init();
                let mut rng = StdRng::seed_from_u64(7);
                let seq = random_sequence(&mut rng, 200, BOUND);

                let mut split = <$tree>::new(&seq);
                let mut joint = <$tree>::new(&seq);

                for _ in 0..100 {
                    let idx = rng.random_range(1..=seq.len());
                    let current = split.prefix(idx) - split.prefix(idx - 1);
                    let d1 = random_adjustment(&mut rng, current, BOUND);
                    // Stay in range for both orders: land on a value, then
                    // split the move in two.
                    let d2 = -d1 / 2;
                    split.add(idx, d1);
                    split.add(idx, d2);
                    joint.add(idx, d1 + d2);
                }

                for k in 0..=seq.len() {
                    assert_eq!(split.prefix(k), joint.prefix(k));
                }
            }

            #[test]
            fn comp_find_matches_complement() {
                common::init();
                let mut rng = StdRng::seed_from_u64(11);
                let seq = random_sequence(&mut rng, 250, BOUND);
                let tree = <$tree>::new(&seq);
                let model = Naive::new(&seq, BOUND);
                let comp_total = BOUND * seq.len() as u64
                    - model.prefix(seq.len());

                for _ in 0..1000 {
                    let val = rng.random_range(0..comp_total.max(1));
                    let mut tree_val = val;
                    let mut model_val = val;
                    assert_eq!(
                        tree.comp_find(&mut tree_val),
                        model.comp_find(&mut model_val)
                    );
                    assert_eq!(tree_val, model_val);
                }
            }

            #[test]
            fn bit_count_is_positive() {
                common::init();
                let tree = <$tree>::new(&[1; 100]);
                assert!(tree.bit_count() > 0);
            }
        }
    };
}

variant_suite!(fixed_f, FixedF<BOUND>);
variant_suite!(fixed_l, FixedL<BOUND>);
variant_suite!(byte_f, ByteF<BOUND>);
variant_suite!(byte_l, ByteL<BOUND>);
variant_suite!(bit_f, BitF<BOUND>);
variant_suite!(bit_l, BitL<BOUND>);
variant_suite!(type_f, TypeF<BOUND>);
variant_suite!(type_l, TypeL<BOUND>);

//------------ Cross-variant equivalence -------------------------------------

// Build all eight variants from one random sequence, drive them through the
// same adds and compare all queries. Only bit_count may differ.
#[test]
fn cross_variant_equivalence() {
    common::init();
    let mut rng = StdRng::seed_from_u64(0xc0ffee);
    let seq = random_sequence(&mut rng, 10_000, BOUND);

    let mut fixed_f = FixedF::<BOUND>::new(&seq);
    let mut fixed_l = FixedL::<BOUND>::new(&seq);
    let mut byte_f = ByteF::<BOUND>::new(&seq);
    let mut byte_l = ByteL::<BOUND>::new(&seq);
    let mut bit_f = BitF::<BOUND>::new(&seq);
    let mut bit_l = BitL::<BOUND>::new(&seq);
    let mut type_f = TypeF::<BOUND>::new(&seq);
    let mut type_l = TypeL::<BOUND>::new(&seq);
    let mut model = Naive::new(&seq, BOUND);

    for _ in 0..10_000 {
        let idx = rng.random_range(1..=seq.len());
        let current = model.seq[idx - 1];
        let inc = random_adjustment(&mut rng, current, BOUND);

        fixed_f.add(idx, inc);
        fixed_l.add(idx, inc);
        byte_f.add(idx, inc);
        byte_l.add(idx, inc);
        bit_f.add(idx, inc);
        bit_l.add(idx, inc);
        type_f.add(idx, inc);
        type_l.add(idx, inc);
        model.add(idx, inc);
    }

    let total = fixed_f.prefix(seq.len());
    for _ in 0..10_000 {
        let k = rng.random_range(0..=seq.len());
        let expected = fixed_f.prefix(k);
        assert_eq!(fixed_l.prefix(k), expected);
        assert_eq!(byte_f.prefix(k), expected);
        assert_eq!(byte_l.prefix(k), expected);
        assert_eq!(bit_f.prefix(k), expected);
        assert_eq!(bit_l.prefix(k), expected);
        assert_eq!(type_f.prefix(k), expected);
        assert_eq!(type_l.prefix(k), expected);

        let val = rng.random_range(0..total + 100);
        let mut v = val;
        let expected_node = fixed_f.find(&mut v);
        let expected_rest = v;
        for (node, rest) in [
            { let mut v = val; (fixed_l.find(&mut v), v) },
            { let mut v = val; (byte_f.find(&mut v), v) },
            { let mut v = val; (byte_l.find(&mut v), v) },
            { let mut v = val; (bit_f.find(&mut v), v) },
            { let mut v = val; (bit_l.find(&mut v), v) },
            { let mut v = val; (type_f.find(&mut v), v) },
            { let mut v = val; (type_l.find(&mut v), v) },
        ] {
            assert_eq!(node, expected_node, "find({})", val);
            assert_eq!(rest, expected_rest, "find({}) residual", val);
        }

        let cval = rng.random_range(
            0..BOUND * seq.len() as u64 - total + 100,
        );
        let mut v = cval;
        let expected_node = fixed_f.comp_find(&mut v);
        for (node, _) in [
            { let mut v = cval; (fixed_l.comp_find(&mut v), v) },
            { let mut v = cval; (byte_f.comp_find(&mut v), v) },
            { let mut v = cval; (byte_l.comp_find(&mut v), v) },
            { let mut v = cval; (bit_f.comp_find(&mut v), v) },
            { let mut v = cval; (bit_l.comp_find(&mut v), v) },
            { let mut v = cval; (type_f.comp_find(&mut v), v) },
            { let mut v = cval; (type_l.comp_find(&mut v), v) },
        ] {
            assert_eq!(node, expected_node, "comp_find({})", cval);
        }
    }
}

//------------ ByteL growth --------------------------------------------------

#[test]
fn bytel_push_matches_rebuild() {
    common::init();
    let mut rng = StdRng::seed_from_u64(21);
    let mut seq = random_sequence(&mut rng, 100, BOUND);
    let mut tree = ByteL::<BOUND>::new(&seq);

    for _ in 0..200 {
        let inc = rng.random_range(0..=BOUND);
        seq.push(inc);
        tree.push(inc);

        let fresh = ByteL::<BOUND>::new(&seq);
        assert_eq!(tree.size(), fresh.size());
        assert_eq!(tree.prefix(tree.size()), fresh.prefix(fresh.size()));
    }

    let model = Naive::new(&seq, BOUND);
    for k in 0..=seq.len() {
        assert_eq!(tree.prefix(k), model.prefix(k));
    }
}

#[test]
fn bytel_pop_undoes_push() {
    common::init();
    let mut rng = StdRng::seed_from_u64(22);
    let seq = random_sequence(&mut rng, 77, BOUND);
    let mut tree = ByteL::<BOUND>::new(&seq);

    for inc in [0, 1, 64, 13] {
        tree.push(inc);
    }
    for _ in 0..4 {
        tree.pop();
    }

    assert_eq!(tree.size(), seq.len());
    let model = Naive::new(&seq, BOUND);
    for k in 0..=seq.len() {
        assert_eq!(tree.prefix(k), model.prefix(k));
    }
}

#[test]
fn bytel_push_from_empty() {
    common::init();
    let mut tree = ByteL::<BOUND>::new(&[]);
    for i in 0..64 {
        tree.push(i % 5);
    }
    assert_eq!(tree.size(), 64);
    let model =
        Naive::new(&(0..64).map(|i| i % 5).collect::<Vec<_>>(), BOUND);
    for k in 0..=64 {
        assert_eq!(tree.prefix(k), model.prefix(k));
    }

    let mut val = model.prefix(33);
    let mut model_val = val;
    assert_eq!(tree.find(&mut val), model.find(&mut model_val));
    assert_eq!(val, model_val);
}

#[test]
fn bytel_reserve_and_shrink() {
    common::init();
    let mut tree = ByteL::<BOUND>::new(&[5; 10]);
    let before = tree.bit_count();
    tree.reserve(1000);
    assert!(tree.bit_count() >= before);
    tree.shrink(0);
    for _ in 0..20 {
        tree.push(3);
    }
    assert_eq!(tree.prefix(30), 10 * 5 + 20 * 3);
}

//------------ Hybrid --------------------------------------------------------

#[test]
fn hybrid_agrees_with_flat() {
    common::init();
    let mut rng = StdRng::seed_from_u64(31);
    let seq = random_sequence(&mut rng, 1000, BOUND);

    let mut flat = FixedF::<BOUND>::new(&seq);
    let mut hybrid =
        Hybrid::<FixedF<512>, ByteF<BOUND>, BOUND, 3>::new(&seq);

    assert_eq!(hybrid.size(), flat.size());
    for k in 0..=seq.len() {
        assert_eq!(hybrid.prefix(k), flat.prefix(k), "prefix({})", k);
    }

    for _ in 0..2000 {
        let idx = rng.random_range(1..=seq.len());
        let current = flat.prefix(idx) - flat.prefix(idx - 1);
        let inc = random_adjustment(&mut rng, current, BOUND);
        flat.add(idx, inc);
        hybrid.add(idx, inc);
    }

    let total = flat.prefix(seq.len());
    for _ in 0..2000 {
        let k = rng.random_range(0..=seq.len());
        assert_eq!(hybrid.prefix(k), flat.prefix(k));

        let val = rng.random_range(0..total + 10);
        let mut hv = val;
        let mut fv = val;
        assert_eq!(hybrid.find(&mut hv), flat.find(&mut fv));
        assert_eq!(hv, fv);

        let cval =
            rng.random_range(0..BOUND * seq.len() as u64 - total + 10);
        let mut hv = cval;
        let mut fv = cval;
        assert_eq!(hybrid.comp_find(&mut hv), flat.comp_find(&mut fv));
    }
}

#[test]
fn hybrid_bit_packed_bottom() {
    common::init();
    let mut rng = StdRng::seed_from_u64(32);
    // Not a multiple of the block size: exercises the partial tail block.
    let seq = random_sequence(&mut rng, 531, BOUND);

    let flat = BitF::<BOUND>::new(&seq);
    let hybrid = Hybrid::<FixedL<1024>, BitL<BOUND>, BOUND, 4>::new(&seq);

    for k in 0..=seq.len() {
        assert_eq!(hybrid.prefix(k), flat.prefix(k));
    }
    let total = flat.prefix(seq.len());
    for val in (0..total).step_by(37) {
        let mut hv = val;
        let mut fv = val;
        assert_eq!(hybrid.find(&mut hv), flat.find(&mut fv));
    }
}

#[test]
#[should_panic(expected = "top tree bound")]
fn hybrid_rejects_mismatched_top_bound() {
    // Top bound of 256 does not cover blocks of 8 elements of up to 64.
    let _ = Hybrid::<FixedF<256>, ByteF<BOUND>, BOUND, 3>::new(&[1; 16]);
}

//------------ Contract violations -------------------------------------------

#[test]
#[should_panic(expected = "index out of range")]
fn prefix_rejects_out_of_range() {
    let tree = FixedF::<BOUND>::new(&[1; 8]);
    let _ = tree.prefix(9);
}

#[test]
#[should_panic(expected = "index out of range")]
fn add_rejects_index_zero() {
    let mut tree = BitL::<BOUND>::new(&[1; 8]);
    tree.add(0, 1);
}
