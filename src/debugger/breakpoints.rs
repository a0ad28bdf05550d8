use std::collections::HashSet;

use tracing::debug;

/// Instruction offsets at which continued execution pauses.
#[derive(Debug, Default, Clone)]
pub struct Breakpoints {
    points: HashSet<usize>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            points: HashSet::new(),
        }
    }

    /// Returns `false` when the offset was already set.
    pub fn add(&mut self, offset: usize) -> bool {
        let inserted = self.points.insert(offset);
        debug!(offset, inserted, "breakpoint set");
        inserted
    }

    pub fn remove(&mut self, offset: usize) -> bool {
        let removed = self.points.remove(&offset);
        debug!(offset, removed, "breakpoint removed");
        removed
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.points.contains(&offset)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Offsets in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut points: Vec<usize> = self.points.iter().copied().collect();
        points.sort_unstable();
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut bps = Breakpoints::new();
        assert!(bps.add(4));
        assert!(!bps.add(4));
        assert!(bps.add(2));
        assert_eq!(bps.len(), 2);
        assert_eq!(bps.sorted(), vec![2, 4]);
        assert!(bps.remove(4));
        assert!(!bps.contains(4));
        bps.clear();
        assert!(bps.is_empty());
    }
}
