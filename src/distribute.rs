use crate::row::Row;
use crate::types::Units;

/// Raises `all_spaces[col_idx..col_idx + span_len]` (clipped to the slice) so
/// that it sums to at least `used_space`.
///
/// The deficit is spread evenly with truncating division and the last row of
/// the span takes the remainder, so the span ends up summing to exactly
/// `used_space` whenever it grew.
pub fn distribute(used_space: Units, all_spaces: &mut [Units], col_idx: usize, span_len: usize) {
    if span_len == 0 || col_idx >= all_spaces.len() {
        return;
    }
    let max_span = col_idx.saturating_add(span_len).min(all_spaces.len()) - col_idx;
    let span = &mut all_spaces[col_idx..col_idx + max_span];
    let used_prev: Units = span.iter().sum();
    if used_space <= used_prev {
        return;
    }

    let dist_space = used_space - used_prev;
    let delta = dist_space / max_span as Units;
    let (head, last) = span.split_at_mut(max_span - 1);
    for slot in head {
        *slot += delta;
    }
    last[0] += dist_space - (max_span as Units - 1) * delta;
}

/// Size a span has to reach once the row spacing it crosses is taken out.
fn span_target(
    declared: Units,
    row_spacing: Units,
    col_idx: usize,
    span: usize,
    len: usize,
) -> Units {
    let covered = col_idx.saturating_add(span).min(len) - col_idx;
    declared - row_spacing * (covered as Units - 1)
}

// Collects `(span, row, size)` for every span registered by rows `[start, len)`,
// shortest spans first and rows in order within a span. Span lengths a row did
// not register carry the size of a shorter span the row already satisfies, so
// they are skipped.
fn collect_spans(
    rows: &[Row],
    start: usize,
    declared: fn(&Row) -> &[(usize, Units)],
    out: &mut Vec<(usize, usize, Units)>,
) {
    out.clear();
    for (idx, row) in rows.iter().enumerate().skip(start) {
        out.extend(
            declared(row)
                .iter()
                .filter(|(_, size)| *size != 0)
                .map(|&(span, size)| (span, idx, size)),
        );
    }
    out.sort_unstable();
}

/// Runs the per-span distribution passes for one table section.
///
/// Spans are processed shortest first: a span of length `n` is checked against
/// what spans `1..n` already allocated to the same rows.
#[derive(Debug, Clone)]
pub struct SpanDistributor {
    row_spacing: Units,
    validated: bool,
    scratch: Vec<Units>,
    spans: Vec<(usize, usize, Units)>,
}

impl SpanDistributor {
    pub fn new(row_spacing: Units) -> Self {
        Self {
            row_spacing,
            validated: false,
            scratch: Vec::new(),
            spans: Vec::new(),
        }
    }

    pub fn row_spacing(&self) -> Units {
        self.row_spacing
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Marks the preferred sizes stale; the next preferred pass recomputes
    /// everything.
    pub fn invalidate(&mut self) {
        self.validated = false;
    }

    /// Preferred pass. Returns `false` when nothing changed since the last run
    /// and the pass was skipped.
    pub fn validate_sizes(&mut self, rows: &mut [Row]) -> bool {
        if self.validated {
            return false;
        }
        let len = rows.len();
        collect_spans(rows, 0, Row::preferred_spans, &mut self.spans);
        self.scratch.clear();
        self.scratch.resize(len, 0);
        for &(span, idx, declared) in &self.spans {
            let target = span_target(declared, self.row_spacing, idx, span, len);
            distribute(target, &mut self.scratch, idx, span);
        }
        for (row, size) in rows.iter_mut().zip(&self.scratch) {
            row.set_preferred_size(*size);
        }
        self.validated = true;
        true
    }

    /// Distributes declared trailing sizes of the rows in `[start, len)` into
    /// `trailing`, which must already hold zero for those rows. Entries past
    /// `rows.len()` are left alone.
    pub fn distribute_trailing(&self, rows: &[Row], start: usize, trailing: &mut [Units]) {
        let len = rows.len().min(trailing.len());
        if start >= len {
            return;
        }
        let trailing = &mut trailing[..len];
        let mut spans = Vec::new();
        collect_spans(&rows[..len], start, Row::trailing_spans, &mut spans);
        for (span, idx, declared) in spans {
            let target = span_target(declared, self.row_spacing, idx, span, len);
            distribute(target, trailing, idx, span);
        }
    }
}
