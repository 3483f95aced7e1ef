//! Gap key generation and relabeling.
//!
//! Keys live in `[0, max)`. A fresh key is placed between its neighbors when
//! a gap exists; when two neighbors are adjacent integers there is no room and
//! the caller relabels the whole block with [`LabelSpace::generate_keys`].

use arbor_common::GapKey;

/// Key range shared by every block of one order tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSpace {
    max: u64,
}

impl LabelSpace {
    pub fn new(max: u64) -> Self {
        Self { max }
    }

    /// Distance between neighbors when `capacity` keys are spread evenly.
    #[inline]
    pub fn step(&self, capacity: usize) -> u64 {
        self.max / (capacity as u64 + 1)
    }

    /// Picks a key strictly between `prev` and `next`.
    ///
    /// A missing bound stands for the matching end of the key range. Appends
    /// and prepends move one `step` away from the neighbor so runs of them
    /// stay spread out. Returns `None` when no integer fits, which means the
    /// block must be relabeled.
    pub fn generate_key(
        &self,
        capacity: usize,
        prev: Option<GapKey>,
        next: Option<GapKey>,
    ) -> Option<GapKey> {
        let step = self.step(capacity);
        match (prev, next) {
            (None, None) => Some(self.max / 2),
            (Some(prev), Some(next)) => midpoint(prev, next),
            (None, Some(next)) => {
                if next == 0 {
                    None
                } else if next > step {
                    Some(next - step)
                } else {
                    Some(next / 2)
                }
            }
            (Some(prev), None) => {
                if prev.saturating_add(1) >= self.max {
                    None
                } else if prev.saturating_add(step) < self.max {
                    Some(prev + step)
                } else {
                    Some(prev + (self.max - prev) / 2)
                }
            }
        }
    }

    /// Returns `n` strictly increasing keys evenly spaced across the range.
    pub fn generate_keys(&self, n: usize) -> Vec<GapKey> {
        let step = self.max / (n as u64 + 1);
        (1..=n as u64).map(|i| i * step).collect()
    }
}

#[inline]
fn midpoint(prev: GapKey, next: GapKey) -> Option<GapKey> {
    if next <= prev || next - prev < 2 {
        return None;
    }
    Some(prev + (next - prev) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block_key() {
        let label = LabelSpace::new(1000);
        assert_eq!(label.generate_key(4, None, None), Some(500));
    }

    #[test]
    fn test_key_between_neighbors() {
        let label = LabelSpace::new(1000);
        assert_eq!(label.generate_key(4, Some(100), Some(200)), Some(150));
        assert_eq!(label.generate_key(4, Some(100), Some(102)), Some(101));
        assert_eq!(label.generate_key(4, Some(100), Some(101)), None);
        assert_eq!(label.generate_key(4, Some(100), Some(100)), None);
    }

    #[test]
    fn test_key_before_first() {
        let label = LabelSpace::new(1000);
        // step = 1000 / 5 = 200
        assert_eq!(label.generate_key(4, None, Some(500)), Some(300));
        assert_eq!(label.generate_key(4, None, Some(150)), Some(75));
        assert_eq!(label.generate_key(4, None, Some(1)), Some(0));
        assert_eq!(label.generate_key(4, None, Some(0)), None);
    }

    #[test]
    fn test_key_after_last() {
        let label = LabelSpace::new(1000);
        assert_eq!(label.generate_key(4, Some(500), None), Some(700));
        assert_eq!(label.generate_key(4, Some(900), None), Some(950));
        assert_eq!(label.generate_key(4, Some(998), None), Some(999));
        assert_eq!(label.generate_key(4, Some(999), None), None);
    }

    #[test]
    fn test_generated_key_respects_bounds() {
        let label = LabelSpace::new(1 << 20);
        let mut prev = None;
        // Repeated appends stay strictly increasing until the range runs out.
        for _ in 0..64 {
            match label.generate_key(8, prev, None) {
                Some(key) => {
                    if let Some(p) = prev {
                        assert!(key > p);
                    }
                    assert!(key < label.max);
                    prev = Some(key);
                }
                None => break,
            }
        }
    }

    #[test]
    fn test_generate_keys_evenly_spaced() {
        let label = LabelSpace::new(100);
        let keys = label.generate_keys(4);
        assert_eq!(keys, vec![20, 40, 60, 80]);

        let keys = label.generate_keys(0);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_generate_keys_strictly_increasing() {
        let label = LabelSpace::new(10);
        // Smallest key space the config allows for capacity 4.
        let keys = label.generate_keys(4);
        assert_eq!(keys, vec![2, 4, 6, 8]);
        assert!(keys.windows(2).all(|w| w[1] - w[0] >= 2));
    }
}
