//! Unit tests for aim-core.

use crate::{AgentId, BlockId, SimConfig, SimRng, Tick};

// ── Ids ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod id_tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        let id = AgentId(7);
        assert_eq!(id.index(), 7);
        assert_eq!(usize::from(id), 7);
    }

    #[test]
    fn ids_order_by_inner_value() {
        let mut ids = vec![BlockId(3), BlockId(0), BlockId(2)];
        ids.sort();
        assert_eq!(ids, vec![BlockId(0), BlockId(2), BlockId(3)]);
    }

    #[test]
    fn display_names_the_type() {
        assert_eq!(AgentId(4).to_string(), "AgentId(4)");
        assert_eq!(BlockId(0).to_string(), "BlockId(0)");
    }

    #[test]
    fn invalid_is_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
    }
}

// ── Tick ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick_tests {
    use super::*;

    #[test]
    fn offset_and_since_are_inverses() {
        let t = Tick(10);
        assert_eq!(t.offset(5), Tick(15));
        assert_eq!(Tick(15).since(t), 5);
        assert_eq!(Tick(15) - t, 5);
        assert_eq!(t + 3, Tick(13));
    }

    #[test]
    fn end_tick_is_exclusive_bound() {
        let config = SimConfig::new(100, 42);
        assert_eq!(config.end_tick(), Tick(100));
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rng_tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SimRng::new(1);
        let mut b = SimRng::new(2);
        let va: Vec<u64> = (0..8).map(|_| a.random()).collect();
        let vb: Vec<u64> = (0..8).map(|_| b.random()).collect();
        assert_ne!(va, vb);
    }

    #[test]
    fn gen_range_stays_in_bounds() {
        let mut rng = SimRng::new(7);
        for _ in 0..1_000 {
            let v = rng.gen_range(0..10u32);
            assert!(v < 10);
        }
    }
}
