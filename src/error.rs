use std::fmt;

#[derive(Debug)]
pub enum TableFlowError {
    RowIndexOutOfRange { index: usize, len: usize },
    InvalidRowSpan { row: usize, span: usize },
    NegativeSize { row: usize, span: usize, size: i64 },
    SettledRow { row: usize, settled: usize },
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for TableFlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableFlowError::RowIndexOutOfRange { index, len } => {
                write!(f, "row index {} out of range for {} rows", index, len)
            }
            TableFlowError::InvalidRowSpan { row, span } => {
                write!(f, "row {}: row span must be at least 1, got {}", row, span)
            }
            TableFlowError::NegativeSize { row, span, size } => {
                write!(f, "row {} span {}: negative size {}", row, span, size)
            }
            TableFlowError::SettledRow { row, settled } => write!(
                f,
                "row {} is already settled (first open row is {})",
                row, settled
            ),
            TableFlowError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            TableFlowError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for TableFlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableFlowError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TableFlowError {
    fn from(value: std::io::Error) -> Self {
        TableFlowError::Io(value)
    }
}
