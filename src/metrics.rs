#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutMetrics {
    pub rows: usize,
    pub settled_rows: usize,
    pub pruned_rows: usize,
    pub preferred_passes: u64,
    pub validated_passes: u64,
    pub rows_rescanned: u64,
    pub cache_refills: u64,
    pub cut_points: usize,
}
