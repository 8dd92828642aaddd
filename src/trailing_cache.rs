use crate::row::Row;
use crate::types::Units;

pub const DEFAULT_CACHE_GROWTH: usize = 2000;

/// Trailing sizes of the validated pass, kept across calls.
///
/// Rows below the watermark are settled: their entries are never refilled and
/// the validated pass never scans them again.
#[derive(Debug, Clone)]
pub struct TrailingSizeCache {
    sizes: Vec<Units>,
    watermark: usize,
    growth: usize,
    refills: u64,
}

impl Default for TrailingSizeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_GROWTH)
    }
}

impl TrailingSizeCache {
    pub fn new(growth: usize) -> Self {
        Self {
            sizes: Vec::new(),
            watermark: 0,
            growth: growth.max(1),
            refills: 0,
        }
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Number of entries refilled since construction or the last reset.
    pub fn refill_count(&self) -> u64 {
        self.refills
    }

    /// Returns the backing array with every entry in `[watermark, limit)`
    /// reset to zero. Entries at or past `limit` are stale.
    pub fn get(&mut self, limit: usize, rows: &[Row]) -> &mut [Units] {
        if self.sizes.len() < rows.len() {
            let new_len = rows.len().max(self.sizes.len() + self.growth);
            self.sizes.resize(new_len, 0);
        }
        let limit = limit.min(self.sizes.len());
        if limit > self.watermark {
            self.sizes[self.watermark..limit].fill(0);
            self.refills += (limit - self.watermark) as u64;
        }
        &mut self.sizes
    }

    /// Writes validated sizes for `[start, end)` and settles those rows.
    pub fn apply(&mut self, start: usize, end: usize, rows: &mut [Row]) {
        self.assign(start, end, rows);
        self.watermark = self.watermark.max(end);
    }

    /// Writes validated sizes for `[start, end)` without settling them.
    pub fn assign(&self, start: usize, end: usize, rows: &mut [Row]) {
        let end = end.min(rows.len()).min(self.sizes.len());
        for idx in start..end {
            let row = &mut rows[idx];
            let size = row
                .preferred_size()
                .max(self.sizes[idx] + row.leading_size());
            row.set_validated_size(size);
        }
    }

    /// Drops the first `removed` entries after the rows store collapsed that
    /// many rows into its aggregate row.
    pub fn shift(&mut self, removed: usize) {
        let removed = removed.min(self.sizes.len());
        self.sizes.drain(..removed);
        self.watermark = self.watermark.saturating_sub(removed);
    }

    pub fn reset(&mut self) {
        self.sizes.clear();
        self.watermark = 0;
        self.refills = 0;
    }
}
