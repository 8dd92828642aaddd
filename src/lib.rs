mod cuts;
mod debug;
mod distribute;
mod error;
mod metrics;
mod perf;
mod row;
mod row_store;
mod trailing_cache;
mod types;

pub use cuts::{CutPoint, CutRegistry, DEFAULT_CUT_EPSILON};
use debug::DebugLogger;
pub use distribute::{SpanDistributor, distribute};
pub use error::TableFlowError;
pub use metrics::LayoutMetrics;
use perf::PerfLogger;
pub use row::Row;
use row_store::{closed_rows, last_closed_row};
pub use row_store::{DEFAULT_ROW_CHUNK, RowStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
pub use trailing_cache::{DEFAULT_CACHE_GROWTH, TrailingSizeCache};
pub use types::{Pt, UNITS_PER_PT, Units};

fn table_debug_enabled() -> bool {
    static ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("TABLEFLOW_DEBUG")
            .ok()
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderCollapseMode {
    Collapse,
    Separate,
}

/// Row layout of one table section while its content is still streaming in.
///
/// Rows are appended as the section emits them and cells register their
/// extents per row span. The preferred pass sizes rows from content alone;
/// the validated pass adds page-flow leading space and settles every row after
/// which no span is open, so later passes only revisit the open tail.
pub struct TableLayout {
    table_id: u32,
    border_collapse: BorderCollapseMode,
    rows: RowStore,
    distributor: SpanDistributor,
    cache: TrailingSizeCache,
    cuts: CutRegistry,
    pruned_rows: usize,
    // Row spacing that sat between rows now folded into the aggregate row 0.
    pruned_spacing: Units,
    preferred_passes: u64,
    validated_passes: u64,
    rows_rescanned: u64,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
}

#[derive(Clone)]
pub struct TableLayoutBuilder {
    border_collapse: BorderCollapseMode,
    row_spacing: Pt,
    cut_epsilon: Pt,
    row_chunk: usize,
    cache_growth: usize,
    debug_path: Option<std::path::PathBuf>,
    perf_enabled: bool,
    perf_path: Option<std::path::PathBuf>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLayout {
    pub fn new() -> Self {
        Self::with_parts(
            BorderCollapseMode::Separate,
            0,
            DEFAULT_CUT_EPSILON,
            DEFAULT_ROW_CHUNK,
            DEFAULT_CACHE_GROWTH,
            None,
            None,
        )
    }

    pub fn builder() -> TableLayoutBuilder {
        TableLayoutBuilder::new()
    }

    fn with_parts(
        border_collapse: BorderCollapseMode,
        row_spacing: Units,
        cut_epsilon: Units,
        row_chunk: usize,
        cache_growth: usize,
        debug: Option<Arc<DebugLogger>>,
        perf: Option<Arc<PerfLogger>>,
    ) -> Self {
        static TABLE_COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(1);
        let table_id = TABLE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let row_spacing = match border_collapse {
            BorderCollapseMode::Collapse => 0,
            BorderCollapseMode::Separate => row_spacing,
        };
        Self {
            table_id,
            border_collapse,
            rows: RowStore::with_chunk(row_chunk),
            distributor: SpanDistributor::new(row_spacing),
            cache: TrailingSizeCache::new(cache_growth),
            cuts: CutRegistry::new(cut_epsilon),
            pruned_rows: 0,
            pruned_spacing: 0,
            preferred_passes: 0,
            validated_passes: 0,
            rows_rescanned: 0,
            debug,
            perf,
        }
    }

    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    pub fn border_collapse(&self) -> BorderCollapseMode {
        self.border_collapse
    }

    pub fn add_row(&mut self) -> usize {
        self.distributor.invalidate();
        self.rows.add_row()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows below this index are settled and no longer accept registrations.
    pub fn settled_rows(&self) -> usize {
        self.cache.watermark()
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn update_defined_size(
        &mut self,
        row: usize,
        span: usize,
        preferred: Units,
    ) -> Result<(), TableFlowError> {
        self.check_open(row)?;
        self.rows.update_defined_size(row, span, preferred)?;
        self.distributor.invalidate();
        Ok(())
    }

    pub fn update_validated_size(
        &mut self,
        row: usize,
        span: usize,
        leading: Units,
        height: Units,
    ) -> Result<(), TableFlowError> {
        self.check_open(row)?;
        self.rows.update_validated_size(row, span, leading, height)?;
        self.distributor.invalidate();
        Ok(())
    }

    /// Preferred pass over the whole section. Returns `false` when nothing was
    /// registered since the previous pass and the sizes were left as they are.
    pub fn validate_sizes(&mut self) -> bool {
        let started = std::time::Instant::now();
        let ran = self.distributor.validate_sizes(self.rows.rows_mut());
        if ran {
            self.preferred_passes += 1;
        }
        if let Some(logger) = self.debug.as_deref() {
            logger.log_validate(self.table_id, "preferred", self.rows.len(), !ran);
        }
        if ran {
            if let Some(perf) = self.perf.as_deref() {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                perf.log_span_ms("table.validate", self.table_id, elapsed_ms);
            }
            if table_debug_enabled() {
                eprintln!(
                    "[tableflow.validate] table_id={} rows={} max_span={}",
                    self.table_id,
                    self.rows.len(),
                    self.rows.max_row_span()
                );
            }
        }
        ran
    }

    /// Validated pass. Rows below the settled watermark are skipped; the
    /// watermark then advances to the last row after which no span is open.
    /// Trailing rows nothing was registered against yet stay open, so a row
    /// added before its cells report can still take their sizes.
    pub fn validate_actual_sizes(&mut self) {
        self.validate_sizes();
        let started = std::time::Instant::now();
        let row_count = self.rows.len();
        let start = self.cache.watermark().min(row_count);

        let trailing = self.cache.get(row_count, self.rows.rows());
        self.distributor
            .distribute_trailing(self.rows.rows(), start, trailing);
        let registered = self.rows.rows()[start..]
            .iter()
            .rposition(|row| row.maximum_row_span() > 0)
            .map_or(start, |idx| start + idx + 1);
        let settled = last_closed_row(&self.rows.rows()[start..registered])
            .map(|idx| start + idx + 1)
            .unwrap_or(start);

        let rows = self.rows.rows_mut();
        self.cache.assign(settled, row_count, rows);
        self.cache.apply(start, settled, rows);

        let rescanned = (row_count - start) as u64;
        self.validated_passes += 1;
        self.rows_rescanned += rescanned;
        if let Some(logger) = self.debug.as_deref() {
            logger.log_validate_actual(self.table_id, start, settled, row_count);
        }
        if let Some(perf) = self.perf.as_deref() {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            perf.log_span_ms("table.validate_actual", self.table_id, elapsed_ms);
            perf.log_counts(
                "table.validate_actual",
                self.table_id,
                &[
                    ("rows", row_count as u64),
                    ("rescanned", rescanned),
                    ("settled", settled as u64),
                ],
            );
        }
        if table_debug_enabled() {
            eprintln!(
                "[tableflow.validate_actual] table_id={} start={} settled={} rows={}",
                self.table_id, start, settled, row_count
            );
        }
    }

    pub fn preferred_row_size(&self, index: usize) -> Result<Units, TableFlowError> {
        Ok(self.rows.row(index)?.preferred_size())
    }

    pub fn validated_row_size(&self, index: usize) -> Result<Units, TableFlowError> {
        Ok(self.rows.row(index)?.validated_size())
    }

    pub fn validated_row_height(&self, index: usize) -> Result<Pt, TableFlowError> {
        self.validated_row_size(index).map(Pt::from_units)
    }

    pub fn maximum_row_span(&self, index: usize) -> Result<usize, TableFlowError> {
        Ok(self.rows.row(index)?.maximum_row_span())
    }

    pub fn row_spacing(&self) -> Units {
        self.distributor.row_spacing()
    }

    /// Collapses settled rows of `[0, n)` into one aggregate row. Only rows
    /// below the settled watermark are eligible. Returns the number of rows
    /// removed.
    pub fn prune(&mut self, n: usize) -> Result<usize, TableFlowError> {
        if n > self.rows.len() {
            return Err(TableFlowError::RowIndexOutOfRange {
                index: n,
                len: self.rows.len(),
            });
        }
        let started = std::time::Instant::now();
        let limit = n.min(self.cache.watermark());
        let removed = self.rows.prune(limit)?;
        if removed > 0 {
            self.cache.shift(removed);
            self.pruned_rows += removed;
            self.pruned_spacing += removed as Units * self.row_spacing();
            self.distributor.invalidate();
        }
        if let Some(logger) = self.debug.as_deref() {
            logger.log_prune(self.table_id, n, removed, self.rows.len());
        }
        if let Some(perf) = self.perf.as_deref() {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            perf.log_span_ms("table.prune", self.table_id, elapsed_ms);
        }
        if table_debug_enabled() && removed > 0 {
            eprintln!(
                "[tableflow.prune] table_id={} requested={} removed={} remaining={}",
                self.table_id,
                n,
                removed,
                self.rows.len()
            );
        }
        Ok(removed)
    }

    /// Top edge of every row relative to `origin`, followed by the bottom edge
    /// of the last row. Uses validated sizes.
    pub fn row_offsets(&self, origin: Units) -> Vec<Units> {
        let spacing = self.row_spacing();
        let rows = self.rows.rows();
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut y = origin;
        for (idx, row) in rows.iter().enumerate() {
            if idx > 0 {
                y += spacing;
            }
            offsets.push(y);
            y += row.validated_size();
            if idx == 0 {
                y += self.pruned_spacing;
            }
        }
        offsets.push(y);
        offsets
    }

    /// Registers a non-forced cut below every settled row that no span
    /// crosses. Returns how many boundaries were offered to the registry.
    pub fn register_row_cuts(&mut self, origin: Units) -> usize {
        let offsets = self.row_offsets(origin);
        let spacing = self.row_spacing();
        let len = self.rows.len();
        let settled = self.cache.watermark().min(len);
        let mut registered = 0;
        for idx in closed_rows(&self.rows.rows()[..settled]) {
            let gap = if idx + 1 < len { spacing } else { 0 };
            self.cuts.put(offsets[idx + 1] - gap, false);
            registered += 1;
        }
        registered
    }

    pub fn cuts(&self) -> &CutRegistry {
        &self.cuts
    }

    pub fn cuts_mut(&mut self) -> &mut CutRegistry {
        &mut self.cuts
    }

    pub fn metrics(&self) -> LayoutMetrics {
        LayoutMetrics {
            rows: self.rows.len(),
            settled_rows: self.cache.watermark(),
            pruned_rows: self.pruned_rows,
            preferred_passes: self.preferred_passes,
            validated_passes: self.validated_passes,
            rows_rescanned: self.rows_rescanned,
            cache_refills: self.cache.refill_count(),
            cut_points: self.cuts.len(),
        }
    }

    /// SHA-256 over the row count and every row's preferred and validated
    /// size, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.rows.len() as u64).to_le_bytes());
        hasher.update(self.pruned_spacing.to_le_bytes());
        for row in self.rows.rows() {
            hasher.update(row.preferred_size().to_le_bytes());
            hasher.update(row.validated_size().to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// Forgets all settled state; the next validated pass rescans every row.
    pub fn reset_validation(&mut self) {
        self.cache.reset();
        self.distributor.invalidate();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.cuts.clear();
        self.pruned_rows = 0;
        self.pruned_spacing = 0;
        self.reset_validation();
    }

    pub fn flush_logs(&self) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(&format!("table:{}", self.table_id));
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }

    fn check_open(&self, row: usize) -> Result<(), TableFlowError> {
        let settled = self.cache.watermark();
        if row < settled {
            return Err(TableFlowError::SettledRow { row, settled });
        }
        Ok(())
    }
}

impl Default for TableLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLayoutBuilder {
    pub fn new() -> Self {
        Self {
            border_collapse: BorderCollapseMode::Separate,
            row_spacing: Pt::ZERO,
            cut_epsilon: Pt::from_units(DEFAULT_CUT_EPSILON),
            row_chunk: DEFAULT_ROW_CHUNK,
            cache_growth: DEFAULT_CACHE_GROWTH,
            debug_path: None,
            perf_enabled: false,
            perf_path: None,
        }
    }

    pub fn border_collapse(mut self, mode: BorderCollapseMode) -> Self {
        self.border_collapse = mode;
        self
    }

    // Vertical border spacing between rows. Ignored for collapsed borders.
    pub fn row_spacing(mut self, spacing: Pt) -> Self {
        self.row_spacing = spacing;
        self
    }

    pub fn cut_epsilon(mut self, epsilon: Pt) -> Self {
        self.cut_epsilon = epsilon;
        self
    }

    pub fn row_chunk(mut self, rows: usize) -> Self {
        self.row_chunk = rows;
        self
    }

    pub fn cache_growth(mut self, rows: usize) -> Self {
        self.cache_growth = rows;
        self
    }

    pub fn debug_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    pub fn perf_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TableLayout, TableFlowError> {
        if self.row_spacing < Pt::ZERO {
            return Err(TableFlowError::InvalidConfiguration(
                "row_spacing must not be negative".to_string(),
            ));
        }
        if self.cut_epsilon < Pt::ZERO {
            return Err(TableFlowError::InvalidConfiguration(
                "cut_epsilon must not be negative".to_string(),
            ));
        }
        if self.row_chunk == 0 {
            return Err(TableFlowError::InvalidConfiguration(
                "row_chunk must be at least 1".to_string(),
            ));
        }
        if self.cache_growth == 0 {
            return Err(TableFlowError::InvalidConfiguration(
                "cache_growth must be at least 1".to_string(),
            ));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let perf = if self.perf_enabled || self.perf_path.is_some() {
            let path = self
                .perf_path
                .unwrap_or_else(|| std::path::PathBuf::from("tableflow_perf.log"));
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(TableLayout::with_parts(
            self.border_collapse,
            self.row_spacing.to_units(),
            self.cut_epsilon.to_units(),
            self.row_chunk,
            self.cache_growth,
            debug,
            perf,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_log_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "tableflow_{tag}_{}_{}.jsonl",
            std::process::id(),
            nanos
        ))
    }

    fn uniform_table(spacing: Units, rows: usize, size: Units) -> TableLayout {
        let mut layout = TableLayout::builder()
            .row_spacing(Pt::from_units(spacing))
            .build()
            .expect("build layout");
        for _ in 0..rows {
            let row = layout.add_row();
            layout.update_defined_size(row, 1, size).expect("defined");
            layout
                .update_validated_size(row, 1, 0, size)
                .expect("validated");
        }
        layout
    }

    fn validated(layout: &TableLayout) -> Vec<Units> {
        (0..layout.row_count())
            .map(|idx| layout.validated_row_size(idx).expect("row"))
            .collect()
    }

    #[test]
    fn worked_two_row_span() {
        let mut layout = TableLayout::new();
        for _ in 0..3 {
            layout.add_row();
        }
        layout.update_defined_size(0, 1, 10).expect("defined");
        layout.update_defined_size(1, 1, 20).expect("defined");
        layout.update_defined_size(0, 2, 50).expect("defined");
        assert!(layout.validate_sizes());
        assert_eq!(layout.preferred_row_size(0).expect("row"), 20);
        assert_eq!(layout.preferred_row_size(1).expect("row"), 30);
        assert_eq!(layout.preferred_row_size(2).expect("row"), 0);
        assert_eq!(layout.maximum_row_span(0).expect("row"), 2);
        assert!(!layout.validate_sizes());
        assert_eq!(layout.metrics().preferred_passes, 1);
    }

    #[test]
    fn validated_pass_settles_closed_rows_only() {
        let mut layout = TableLayout::new();
        layout.add_row();
        layout.add_row();
        layout.update_defined_size(0, 1, 10).expect("defined");
        layout.update_validated_size(0, 1, 0, 10).expect("validated");
        layout.update_defined_size(1, 2, 40).expect("defined");
        layout.update_validated_size(1, 2, 0, 40).expect("validated");

        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 1);
        assert_eq!(validated(&layout), vec![10, 40]);

        let row = layout.add_row();
        layout.update_defined_size(row, 1, 10).expect("defined");
        layout.update_validated_size(row, 1, 0, 10).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 3);
        assert_eq!(validated(&layout), vec![10, 15, 25]);
        assert_eq!(layout.metrics().rows_rescanned, 4);

        assert!(matches!(
            layout.update_validated_size(1, 1, 0, 5),
            Err(TableFlowError::SettledRow { row: 1, settled: 3 })
        ));
    }

    #[test]
    fn leading_space_never_shrinks_a_row() {
        let mut layout = TableLayout::new();
        layout.add_row();
        layout.add_row();
        layout.update_defined_size(0, 1, 30).expect("defined");
        layout.update_validated_size(0, 1, 0, 12).expect("validated");
        layout.update_defined_size(1, 1, 10).expect("defined");
        layout.update_validated_size(1, 1, 8, 12).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(validated(&layout), vec![30, 20]);
    }

    #[test]
    fn settled_rows_are_not_rescanned() {
        let mut layout = uniform_table(0, 5, 100);
        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 5);
        let refills = layout.metrics().cache_refills;
        let print = layout.fingerprint();

        layout.validate_actual_sizes();
        let metrics = layout.metrics();
        assert_eq!(metrics.cache_refills, refills);
        assert_eq!(metrics.rows_rescanned, 5);
        assert_eq!(layout.fingerprint(), print);
    }

    #[test]
    fn prune_keeps_offsets_and_sums() {
        let mut layout = uniform_table(2, 4, 100);
        layout.validate_actual_sizes();
        assert_eq!(layout.row_offsets(0), vec![0, 102, 204, 306, 406]);

        assert_eq!(layout.prune(3).expect("prune"), 2);
        assert_eq!(layout.row_count(), 2);
        assert_eq!(layout.settled_rows(), 2);
        assert_eq!(validated(&layout), vec![300, 100]);
        assert_eq!(layout.row_offsets(0), vec![0, 306, 406]);

        let row = layout.add_row();
        layout.update_defined_size(row, 1, 100).expect("defined");
        layout.update_validated_size(row, 1, 0, 100).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(layout.preferred_row_size(0).expect("row"), 300);
        assert_eq!(validated(&layout), vec![300, 100, 100]);
        assert_eq!(layout.row_offsets(0), vec![0, 306, 408, 508]);
        assert_eq!(layout.metrics().pruned_rows, 2);
    }

    #[test]
    fn prune_only_touches_settled_rows() {
        let mut layout = uniform_table(0, 4, 100);
        assert_eq!(layout.prune(4).expect("prune"), 0);
        assert!(matches!(
            layout.prune(5),
            Err(TableFlowError::RowIndexOutOfRange { index: 5, len: 4 })
        ));
        layout.validate_actual_sizes();
        assert_eq!(layout.prune(4).expect("prune"), 3);
        assert_eq!(validated(&layout), vec![400]);
    }

    #[test]
    fn row_cuts_skip_open_spans() {
        let mut layout = TableLayout::new();
        for _ in 0..3 {
            layout.add_row();
        }
        layout.update_defined_size(0, 2, 60).expect("defined");
        layout.update_validated_size(0, 2, 0, 60).expect("validated");
        layout.update_defined_size(2, 1, 25).expect("defined");
        layout.update_validated_size(2, 1, 0, 25).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(validated(&layout), vec![30, 30, 25]);

        assert_eq!(layout.register_row_cuts(-10), 2);
        assert_eq!(layout.cuts().get(20), None);
        assert_eq!(layout.cuts().get(50).map(|c| c.position), Some(50));
        assert_eq!(layout.cuts().get(75).map(|c| c.position), Some(75));

        layout.cuts_mut().put(52, true);
        assert_eq!(layout.cuts().len(), 2);
        assert_eq!(
            layout.cuts().get(50),
            Some(CutPoint {
                position: 50,
                forced: true
            })
        );
        assert_eq!(layout.metrics().cut_points, 2);
    }

    #[test]
    fn spaced_rows_cut_at_row_bottoms() {
        let mut layout = uniform_table(2, 3, 100);
        layout.validate_actual_sizes();
        assert_eq!(layout.register_row_cuts(0), 3);
        let positions: Vec<Units> = layout.cuts().iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![100, 202, 304]);
    }

    #[test]
    fn streaming_rows_stay_bounded() {
        let mut layout = TableLayout::new();
        let total_rows = 10_000;
        for i in 0..total_rows {
            let row = layout.add_row();
            layout.update_defined_size(row, 1, 1000).expect("defined");
            layout.update_validated_size(row, 1, 0, 1000).expect("validated");
            if i % 3 == 0 {
                layout.update_defined_size(row, 2, 2500).expect("defined");
            }
            layout.validate_actual_sizes();
            if i % 100 == 99 {
                layout.prune(layout.row_count()).expect("prune");
            }
        }
        let metrics = layout.metrics();
        assert!(layout.row_count() < 110);
        assert!(metrics.rows_rescanned <= 2 * total_rows as u64);
        let total: Units = validated(&layout).iter().sum();
        assert_eq!(total, 3333 * 3500 + 2500);
    }

    #[test]
    fn collapsed_borders_have_no_row_spacing() {
        let layout = TableLayout::builder()
            .border_collapse(BorderCollapseMode::Collapse)
            .row_spacing(Pt::from_i32(4))
            .build()
            .expect("build layout");
        assert_eq!(layout.row_spacing(), 0);
        assert_eq!(layout.border_collapse(), BorderCollapseMode::Collapse);

        let spaced = TableLayout::builder()
            .row_spacing(Pt::from_i32(4))
            .build()
            .expect("build layout");
        assert_eq!(spaced.row_spacing(), 4 * UNITS_PER_PT);
    }

    #[test]
    fn builder_rejects_invalid_configuration() {
        for builder in [
            TableLayout::builder().row_spacing(Pt::from_f32(-1.0)),
            TableLayout::builder().cut_epsilon(Pt::from_f32(-0.5)),
            TableLayout::builder().row_chunk(0),
            TableLayout::builder().cache_growth(0),
        ] {
            assert!(matches!(
                builder.build(),
                Err(TableFlowError::InvalidConfiguration(_))
            ));
        }
        let layout = TableLayout::builder()
            .cut_epsilon(Pt::from_f32(0.5))
            .build()
            .expect("build layout");
        assert_eq!(layout.cuts().epsilon(), 500);
    }

    #[test]
    fn registration_errors_surface() {
        let mut layout = TableLayout::new();
        layout.add_row();
        assert!(matches!(
            layout.update_defined_size(0, 0, 10),
            Err(TableFlowError::InvalidRowSpan { row: 0, span: 0 })
        ));
        assert!(matches!(
            layout.update_defined_size(0, 1, -10),
            Err(TableFlowError::NegativeSize { .. })
        ));
        assert!(matches!(
            layout.validated_row_size(1),
            Err(TableFlowError::RowIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn rows_awaiting_cells_stay_open() {
        let mut layout = uniform_table(0, 2, 40);
        let pending = layout.add_row();
        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 2);

        layout.update_defined_size(pending, 1, 15).expect("defined");
        layout
            .update_validated_size(pending, 1, 0, 15)
            .expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 3);
        assert_eq!(validated(&layout), vec![40, 40, 15]);
    }

    #[test]
    fn huge_row_span_is_accepted_without_allocating_it() {
        let mut layout = uniform_table(0, 2, 10);
        let row = layout.add_row();
        layout
            .update_defined_size(row, usize::MAX / 4, 10)
            .expect("defined");
        layout
            .update_validated_size(row, usize::MAX / 4, 0, 30)
            .expect("validated");
        assert_eq!(layout.maximum_row_span(row).expect("row"), usize::MAX / 4);

        layout.validate_actual_sizes();
        assert_eq!(validated(&layout), vec![10, 10, 30]);
        // The span is still open, so its row can't settle.
        assert_eq!(layout.settled_rows(), 2);

        let next = layout.add_row();
        layout.update_validated_size(next, 1, 0, 4).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(validated(&layout), vec![10, 10, 13, 17]);
        assert_eq!(layout.settled_rows(), 2);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let mut a = uniform_table(2, 6, 120);
        let mut b = uniform_table(2, 6, 120);
        a.validate_actual_sizes();
        b.validate_actual_sizes();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let row = b.add_row();
        b.update_defined_size(row, 1, 1).expect("defined");
        b.validate_actual_sizes();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn reset_and_clear() {
        let mut layout = uniform_table(0, 3, 50);
        layout.validate_actual_sizes();
        assert_eq!(layout.settled_rows(), 3);
        layout.reset_validation();
        assert_eq!(layout.settled_rows(), 0);
        layout.update_validated_size(0, 1, 0, 80).expect("validated");
        layout.validate_actual_sizes();
        assert_eq!(validated(&layout), vec![80, 50, 50]);

        layout.register_row_cuts(0);
        layout.clear();
        assert_eq!(layout.row_count(), 0);
        assert!(layout.cuts().is_empty());
        assert_eq!(layout.row_offsets(7), vec![7]);
    }

    #[test]
    fn debug_and_perf_logs_are_written() {
        let debug_path = temp_log_path("layout_debug");
        let perf_path = temp_log_path("layout_perf");
        {
            let mut layout = TableLayout::builder()
                .debug_log(&debug_path)
                .perf_log(&perf_path)
                .build()
                .expect("build layout");
            for _ in 0..3 {
                let row = layout.add_row();
                layout.update_defined_size(row, 1, 10).expect("defined");
            }
            layout.validate_actual_sizes();
            layout.prune(3).expect("prune");
            layout.flush_logs();
        }
        let debug = std::fs::read_to_string(&debug_path).expect("read debug log");
        assert!(debug.contains("\"type\":\"table.validate\""));
        assert!(debug.contains("\"type\":\"table.validate_actual\""));
        assert!(debug.contains("\"type\":\"table.prune\""));
        assert!(debug.contains("\"type\":\"debug.summary\""));
        let perf = std::fs::read_to_string(&perf_path).expect("read perf log");
        assert!(perf.contains("\"name\":\"table.validate_actual\""));
        assert!(perf.contains("\"rescanned\":3"));

        let hot_name = perf_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| format!("{s}_hot.log"))
            .expect("hot name");
        let hot_path = perf_path.with_file_name(hot_name);
        assert!(hot_path.exists());
        let _ = std::fs::remove_file(&debug_path);
        let _ = std::fs::remove_file(&perf_path);
        let _ = std::fs::remove_file(&hot_path);
    }
}
