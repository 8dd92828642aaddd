use crate::types::Units;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Positions closer than this are one breakpoint (0.005pt).
pub const DEFAULT_CUT_EPSILON: Units = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutPoint {
    pub position: Units,
    pub forced: bool,
}

/// Legal page-break positions of a table, keyed by vertical coordinate.
#[derive(Debug, Clone)]
pub struct CutRegistry {
    entries: BTreeMap<Units, bool>,
    epsilon: Units,
}

impl Default for CutRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CUT_EPSILON)
    }
}

impl CutRegistry {
    pub fn new(epsilon: Units) -> Self {
        Self {
            entries: BTreeMap::new(),
            epsilon: epsilon.max(0),
        }
    }

    pub fn epsilon(&self) -> Units {
        self.epsilon
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a break candidate. A candidate within epsilon of an existing
    /// entry merges into it; the stored position is kept and the forced flags
    /// are or-ed.
    pub fn put(&mut self, position: Units, forced: bool) -> CutPoint {
        if let Some(existing) = self.nearest(position) {
            let flag = self.entries.entry(existing.position).or_insert(false);
            *flag |= forced;
            return CutPoint {
                position: existing.position,
                forced: *flag,
            };
        }
        self.entries.insert(position, forced);
        CutPoint { position, forced }
    }

    /// Nearest recorded breakpoint within epsilon of `position`.
    pub fn get(&self, position: Units) -> Option<CutPoint> {
        self.nearest(position)
    }

    /// Last breakpoint not past `limit`, epsilon included: the lowest legal
    /// break for a page whose bottom edge sits at `limit`.
    pub fn previous(&self, limit: Units) -> Option<CutPoint> {
        self.entries
            .range(..=limit.saturating_add(self.epsilon))
            .next_back()
            .map(to_cut)
    }

    /// First forced breakpoint clearly after `from`.
    pub fn next_forced(&self, from: Units) -> Option<CutPoint> {
        self.entries
            .range((
                Bound::Excluded(from.saturating_add(self.epsilon)),
                Bound::Unbounded,
            ))
            .find(|(_, forced)| **forced)
            .map(to_cut)
    }

    /// Drops every breakpoint below `position`. Returns how many were removed.
    pub fn discard_before(&mut self, position: Units) -> usize {
        let kept = self.entries.split_off(&position);
        let removed = self.entries.len();
        self.entries = kept;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = CutPoint> + '_ {
        self.entries.iter().map(to_cut)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn nearest(&self, position: Units) -> Option<CutPoint> {
        let below = self.entries.range(..=position).next_back().map(to_cut);
        let above = self
            .entries
            .range((Bound::Excluded(position), Bound::Unbounded))
            .next()
            .map(to_cut);
        let closest = match (below, above) {
            (Some(b), Some(a)) => {
                if position.abs_diff(a.position) < position.abs_diff(b.position) {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (b, a) => b.or(a),
        };
        closest.filter(|cut| position.abs_diff(cut.position) <= self.epsilon as u64)
    }
}

fn to_cut((position, forced): (&Units, &bool)) -> CutPoint {
    CutPoint {
        position: *position,
        forced: *forced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_positions_merge() {
        let mut cuts = CutRegistry::new(10);
        cuts.put(1000, false);
        let merged = cuts.put(1005, true);
        assert_eq!(cuts.len(), 1);
        assert_eq!(merged, CutPoint { position: 1000, forced: true });
        assert_eq!(cuts.get(1000), Some(merged));
        assert_eq!(cuts.get(1005), Some(merged));
    }

    #[test]
    fn forced_flag_is_sticky() {
        let mut cuts = CutRegistry::new(10);
        cuts.put(0, true);
        let merged = cuts.put(3, false);
        assert!(merged.forced);
        assert_eq!(cuts.len(), 1);
    }

    #[test]
    fn lookups_outside_tolerance_miss() {
        let mut cuts = CutRegistry::new(10);
        cuts.put(1000, false);
        cuts.put(1011, false);
        assert_eq!(cuts.len(), 2);
        assert_eq!(cuts.get(989), None);
        assert_eq!(cuts.get(1022), None);
        assert_eq!(cuts.get(990).map(|c| c.position), Some(1000));
        assert_eq!(CutRegistry::new(10).get(0), None);

        // Equidistant lookups prefer the lower entry.
        let mut pair = CutRegistry::new(10);
        pair.put(0, false);
        pair.put(20, false);
        assert_eq!(pair.get(10).map(|c| c.position), Some(0));
        assert_eq!(pair.get(11).map(|c| c.position), Some(20));
    }

    #[test]
    fn negative_positions_are_allowed() {
        let mut cuts = CutRegistry::new(5);
        cuts.put(-1200, false);
        cuts.put(-1197, true);
        cuts.put(0, false);
        let all: Vec<CutPoint> = cuts.iter().collect();
        assert_eq!(
            all,
            vec![
                CutPoint { position: -1200, forced: true },
                CutPoint { position: 0, forced: false },
            ]
        );
    }

    #[test]
    fn page_walk_queries() {
        let mut cuts = CutRegistry::new(5);
        for (position, forced) in [(100, false), (250, false), (400, true), (600, false), (800, true)] {
            cuts.put(position, forced);
        }
        assert_eq!(cuts.previous(399).map(|c| c.position), Some(400));
        assert_eq!(cuts.previous(394).map(|c| c.position), Some(250));
        assert_eq!(cuts.previous(50), None);
        assert_eq!(cuts.next_forced(100).map(|c| c.position), Some(400));
        assert_eq!(cuts.next_forced(398).map(|c| c.position), Some(800));

        assert_eq!(cuts.discard_before(400), 2);
        assert_eq!(cuts.len(), 3);
        assert_eq!(cuts.iter().next().map(|c| c.position), Some(400));
        cuts.clear();
        assert!(cuts.is_empty());
    }
}
