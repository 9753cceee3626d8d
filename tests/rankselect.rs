use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fenwick_store::{BitL, ByteF, FixedF, FixedL, Stride, TypeL};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

//------------ Naive bit model -----------------------------------------------

fn naive_rank(words: &[u64], pos: usize) -> u64 {
    (0..pos)
        .filter(|&i| words[i / 64] & (1 << (i % 64)) != 0)
        .count() as u64
}

fn naive_select(words: &[u64], rank: u64) -> Option<usize> {
    let mut seen = 0;
    for i in 0..words.len() * 64 {
        if words[i / 64] & (1 << (i % 64)) != 0 {
            if seen == rank {
                return Some(i);
            }
            seen += 1;
        }
    }
    None
}

fn random_words(rng: &mut StdRng, len: usize) -> Vec<u64> {
    (0..len).map(|_| rng.random::<u64>() & rng.random::<u64>()).collect()
}

//------------ Fixed scenarios -----------------------------------------------

#[test]
fn scenario_three_words() {
    common::init();
    let words = [0xF0F0_F0F0_F0F0_F0F0_u64, 0, 0x1];
    let bv = Stride::<FixedF<128>, 2>::new(&words);

    assert_eq!(bv.size(), 3);
    assert_eq!(bv.rank(64), 32);
    assert_eq!(bv.select(31), Some(63));
    assert_eq!(bv.select(32), Some(128));
    assert_eq!(bv.select_zero(0), Some(0));

    // 33 set bits in total.
    assert_eq!(bv.rank(192), 33);
    assert_eq!(bv.select(33), None);
}

#[test]
fn empty_bitvector() {
    common::init();
    let bv = Stride::<ByteF<128>, 2>::new(&[]);
    assert_eq!(bv.rank(0), 0);
    assert_eq!(bv.select(0), None);
    assert_eq!(bv.select_zero(0), None);
}

#[test]
#[should_panic(expected = "tree bound")]
fn stride_rejects_wrong_bound() {
    // W = 2 strides hold up to 128 set bits; a 64-bound tree cannot
    // summarise them.
    let _ = Stride::<FixedF<64>, 2>::new(&[0, 0]);
}

//------------ Properties over random bits -----------------------------------

macro_rules! stride_suite {
    ($name:ident, $stride:ty, $words:expr) => {
        mod $name {
            use super::*;

            #[test]
            fn rank_matches_naive() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0xb175);
                let words = random_words(&mut rng, $words);
                let bv = <$stride>::new(&words);

                for pos in (0..=words.len() * 64).step_by(7) {
                    assert_eq!(
                        bv.rank(pos),
                        naive_rank(&words, pos),
                        "rank({})",
                        pos
                    );
                    assert_eq!(
                        bv.rank_zero(pos),
                        pos as u64 - naive_rank(&words, pos)
                    );
                }
            }

            #[test]
            fn select_is_rank_inverse() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0x5e1e);
                let words = random_words(&mut rng, $words);
                let bv = <$stride>::new(&words);
                let total = bv.rank(words.len() * 64);

                for r in 0..total {
                    let pos = bv.select(r).expect("in-range rank");
                    assert_eq!(pos, naive_select(&words, r).unwrap());
                    assert_eq!(bv.rank(pos), r);
                    assert!(words[pos / 64] & (1 << (pos % 64)) != 0);
                }
                assert_eq!(bv.select(total), None);
            }

            #[test]
            fn select_zero_is_select_on_complement() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0x2e60);
                let words = random_words(&mut rng, $words);
                let complement: Vec<u64> =
                    words.iter().map(|&w| !w).collect();

                let bv = <$stride>::new(&words);
                let cbv = <$stride>::new(&complement);
                let zeros = bv.rank_zero(words.len() * 64);

                for r in (0..zeros).step_by(3) {
                    assert_eq!(bv.select_zero(r), cbv.select(r));
                }
                assert_eq!(bv.select_zero(zeros), None);
            }

            #[test]
            fn update_rewrites_summaries() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0x0dd);
                let mut words = random_words(&mut rng, $words);
                let mut bv = <$stride>::new(&words);

                for _ in 0..200 {
                    let i = rng.random_range(0..words.len());
                    let word = rng.random::<u64>();
                    let old = bv.update(i, word);
                    assert_eq!(old, words[i]);
                    words[i] = word;

                    let pos = rng.random_range(0..=words.len() * 64);
                    assert_eq!(bv.rank(pos), naive_rank(&words, pos));
                }
            }

            #[test]
            fn single_bit_mutation() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0x817);
                let mut words = random_words(&mut rng, $words);
                let mut bv = <$stride>::new(&words);

                for _ in 0..300 {
                    let bit = rng.random_range(0..words.len() * 64);
                    let was_set = words[bit / 64] & (1 << (bit % 64)) != 0;

                    match rng.random_range(0..3) {
                        0 => {
                            assert_eq!(bv.set(bit), was_set);
                            words[bit / 64] |= 1 << (bit % 64);
                        }
                        1 => {
                            assert_eq!(bv.clear(bit), was_set);
                            words[bit / 64] &= !(1 << (bit % 64));
                        }
                        _ => {
                            assert_eq!(bv.toggle(bit), was_set);
                            words[bit / 64] ^= 1 << (bit % 64);
                        }
                    }

                    let pos = rng.random_range(0..=words.len() * 64);
                    assert_eq!(bv.rank(pos), naive_rank(&words, pos));
                }

                // Everything still consistent after the mutation storm.
                let total = bv.rank(words.len() * 64);
                for r in (0..total).step_by(5) {
                    let pos = bv.select(r).unwrap();
                    assert_eq!(bv.rank(pos), r);
                }
            }

            #[test]
            fn rank_ranges() {
                common::init();
                let mut rng = StdRng::seed_from_u64(0xabc);
                let words = random_words(&mut rng, $words);
                let bv = <$stride>::new(&words);
                let bits = words.len() * 64;

                for _ in 0..200 {
                    let a = rng.random_range(0..=bits);
                    let b = rng.random_range(a..=bits);
                    assert_eq!(
                        bv.rank_range(a, b),
                        naive_rank(&words, b) - naive_rank(&words, a)
                    );
                    assert_eq!(
                        bv.rank_zero_range(a, b),
                        (b - a) as u64 - bv.rank_range(a, b)
                    );
                }
            }
        }
    };
}

stride_suite!(single_word_stride, Stride<BitL<64>, 1>, 130);
stride_suite!(two_word_stride, Stride<FixedF<128>, 2>, 97);
stride_suite!(four_word_stride, Stride<TypeL<256>, 4>, 64);
stride_suite!(wide_stride_fixed_l, Stride<FixedL<512>, 8>, 33);
