use crate::error::TableFlowError;
use crate::row::Row;
use crate::types::Units;

pub const DEFAULT_ROW_CHUNK: usize = 1000;

/// Ordered rows of one table section. Rows are addressed by index only.
#[derive(Debug, Clone)]
pub struct RowStore {
    rows: Vec<Row>,
    chunk: usize,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStore {
    pub fn new() -> Self {
        Self::with_chunk(DEFAULT_ROW_CHUNK)
    }

    pub fn with_chunk(chunk: usize) -> Self {
        let chunk = chunk.max(1);
        Self {
            rows: Vec::with_capacity(chunk),
            chunk,
        }
    }

    pub fn add_row(&mut self) -> usize {
        if self.rows.len() == self.rows.capacity() {
            self.rows.reserve(self.chunk);
        }
        self.rows.push(Row::default());
        self.rows.len() - 1
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rows.capacity()
    }

    pub fn row(&self, index: usize) -> Result<&Row, TableFlowError> {
        self.rows
            .get(index)
            .ok_or(TableFlowError::RowIndexOutOfRange {
                index,
                len: self.rows.len(),
            })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn max_row_span(&self) -> usize {
        self.rows
            .iter()
            .map(Row::maximum_row_span)
            .max()
            .unwrap_or(0)
    }

    pub fn update_defined_size(
        &mut self,
        row: usize,
        span: usize,
        preferred: Units,
    ) -> Result<(), TableFlowError> {
        check_registration(row, span, preferred)?;
        self.row_mut(row)?.declare_preferred(span, preferred);
        Ok(())
    }

    pub fn update_validated_size(
        &mut self,
        row: usize,
        span: usize,
        leading: Units,
        height: Units,
    ) -> Result<(), TableFlowError> {
        check_registration(row, span, height)?;
        if leading < 0 {
            return Err(TableFlowError::NegativeSize {
                row,
                span,
                size: leading,
            });
        }
        self.row_mut(row)?.declare_trailing(span, leading, height);
        Ok(())
    }

    /// Collapses the longest prefix of `[0, n)` that no open span crosses into
    /// one aggregate row. Returns how many rows were removed.
    pub fn prune(&mut self, n: usize) -> Result<usize, TableFlowError> {
        if n > self.rows.len() {
            return Err(TableFlowError::RowIndexOutOfRange {
                index: n,
                len: self.rows.len(),
            });
        }
        if n <= 1 {
            return Ok(0);
        }
        let Some(split) = last_closed_row(&self.rows[..n]) else {
            return Ok(0);
        };
        if split == 0 {
            return Ok(0);
        }
        let aggregate = Row::aggregate(&self.rows[..=split]);
        self.rows.drain(..split);
        self.rows[0] = aggregate;
        Ok(split)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut Row, TableFlowError> {
        let len = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or(TableFlowError::RowIndexOutOfRange { index, len })
    }
}

fn check_registration(row: usize, span: usize, size: Units) -> Result<(), TableFlowError> {
    if span == 0 {
        return Err(TableFlowError::InvalidRowSpan { row, span });
    }
    if size < 0 {
        return Err(TableFlowError::NegativeSize { row, span, size });
    }
    Ok(())
}

/// Index of the last row in `rows` after which no span declared inside `rows`
/// is still open.
///
/// `open` counts how many more rows the longest running span still covers,
/// the current row included.
pub(crate) fn last_closed_row(rows: &[Row]) -> Option<usize> {
    let mut open = 0usize;
    let mut closed = None;
    for (idx, row) in rows.iter().enumerate() {
        open = open.saturating_sub(1).max(row.maximum_row_span().max(1));
        if open == 1 {
            closed = Some(idx);
        }
    }
    closed
}

/// Every index in `rows` after which no span is open, in ascending order.
pub(crate) fn closed_rows(rows: &[Row]) -> Vec<usize> {
    let mut open = 0usize;
    let mut closed = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        open = open.saturating_sub(1).max(row.maximum_row_span().max(1));
        if open == 1 {
            closed.push(idx);
        }
    }
    closed
}
