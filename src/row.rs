use crate::types::Units;

/// One row of a table section.
///
/// Cells starting at this row declare their extent per row-span length. Each
/// declared list holds `(span, size)` pairs for the span lengths actually
/// registered, sorted by span; sizes never decrease with the span length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    declared_preferred: Vec<(usize, Units)>,
    declared_trailing: Vec<(usize, Units)>,
    leading_size: Units,
    preferred_size: Units,
    validated_size: Units,
}

impl Row {
    pub fn preferred_size(&self) -> Units {
        self.preferred_size
    }

    pub fn validated_size(&self) -> Units {
        self.validated_size
    }

    pub fn leading_size(&self) -> Units {
        self.leading_size
    }

    /// Largest row span any cell starting at this row declared, 0 for a row
    /// without registrations.
    pub fn maximum_row_span(&self) -> usize {
        last_span(&self.declared_preferred).max(last_span(&self.declared_trailing))
    }

    /// Declared preferred size for `span`, 0 when nothing was declared at that
    /// length.
    pub fn declared_preferred(&self, span: usize) -> Units {
        declared_at(&self.declared_preferred, span)
    }

    pub fn declared_trailing(&self, span: usize) -> Units {
        declared_at(&self.declared_trailing, span)
    }

    /// Registered `(span, size)` pairs in ascending span order.
    pub(crate) fn preferred_spans(&self) -> &[(usize, Units)] {
        &self.declared_preferred
    }

    pub(crate) fn trailing_spans(&self) -> &[(usize, Units)] {
        &self.declared_trailing
    }

    pub(crate) fn declare_preferred(&mut self, span: usize, size: Units) {
        raise_from(&mut self.declared_preferred, span, size);
    }

    pub(crate) fn declare_trailing(&mut self, span: usize, leading: Units, height: Units) {
        raise_from(&mut self.declared_trailing, span, height);
        self.leading_size = self.leading_size.max(leading);
    }

    pub(crate) fn set_preferred_size(&mut self, size: Units) {
        self.preferred_size = size;
    }

    pub(crate) fn set_validated_size(&mut self, size: Units) {
        self.validated_size = size;
    }

    /// Folds `rows` into a single span-1 row carrying the summed sizes.
    pub(crate) fn aggregate(rows: &[Row]) -> Row {
        let preferred: Units = rows.iter().map(Row::preferred_size).sum();
        let validated: Units = rows.iter().map(Row::validated_size).sum();
        Row {
            declared_preferred: vec![(1, preferred)],
            declared_trailing: vec![(1, validated)],
            leading_size: 0,
            preferred_size: preferred,
            validated_size: validated,
        }
    }
}

fn last_span(sizes: &[(usize, Units)]) -> usize {
    sizes.last().map_or(0, |(span, _)| *span)
}

// Spans between two registered lengths carry the shorter one's size; past the
// longest registered span nothing is declared.
fn declared_at(sizes: &[(usize, Units)], span: usize) -> Units {
    if span == 0 || span > last_span(sizes) {
        return 0;
    }
    let at = sizes.partition_point(|(s, _)| *s <= span);
    at.checked_sub(1)
        .and_then(|idx| sizes.get(idx))
        .map_or(0, |(_, size)| *size)
}

// Raises every entry at `span` and above. A new entry starts from the size of
// the next shorter span so the list stays monotonic.
fn raise_from(sizes: &mut Vec<(usize, Units)>, span: usize, size: Units) {
    debug_assert!(span >= 1);
    let at = sizes.partition_point(|(s, _)| *s < span);
    if sizes.get(at).map(|(s, _)| *s) != Some(span) {
        let floor = at
            .checked_sub(1)
            .and_then(|idx| sizes.get(idx))
            .map_or(0, |(_, shorter)| *shorter);
        sizes.insert(at, (span, floor));
    }
    for (_, slot) in &mut sizes[at..] {
        if *slot < size {
            *slot = size;
        }
    }
}
