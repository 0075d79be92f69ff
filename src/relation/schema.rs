use std::fmt;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One of the three column types this engine supports, carrying its own
/// fixed byte width. `CHAR` and `VARCHAR` are indistinguishable on disk —
/// both are exactly `N` zero-padded bytes — so the parser collapses them
/// into the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    Char(usize),
}

impl ColumnType {
    pub fn byte_width(&self) -> usize {
        match self {
            ColumnType::Int | ColumnType::Float => 4,
            ColumnType::Char(n) => *n,
        }
    }

    /// Parses `INT`, `FLOAT`, `CHAR(N)`, or `VARCHAR(N)`, case-insensitive.
    pub fn parse(text: &str) -> Result<Self> {
        let upper = text.trim().to_uppercase();
        match upper.as_str() {
            "INT" => return Ok(ColumnType::Int),
            "FLOAT" => return Ok(ColumnType::Float),
            _ => {}
        }
        let rest = upper
            .strip_prefix("CHAR(")
            .or_else(|| upper.strip_prefix("VARCHAR("));
        if let Some(rest) = rest {
            let digits = rest
                .strip_suffix(')')
                .ok_or_else(|| Error::bad_request(format!("unterminated column type: {text}")))?;
            let n: usize = digits
                .parse()
                .map_err(|_| Error::bad_request(format!("bad column width in: {text}")))?;
            return Ok(ColumnType::Char(n));
        }
        Err(Error::bad_request(format!("unknown column type: {text}")))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Char(n) => write!(f, "CHAR({n})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Column {
    #[new(into)]
    pub name: String,
    pub col_type: ColumnType,
}

/// An ordered sequence of columns. Record width and slot count for a given
/// page size are both derived, never stored redundantly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn record_width(&self) -> usize {
        self.columns.iter().map(|c| c.col_type.byte_width()).sum()
    }

    /// `S = floor(pageSize / (1 + recordWidth))`.
    pub fn slot_count(&self, page_size: usize) -> usize {
        page_size / (1 + self.record_width())
    }

    pub fn column_offset(&self, idx: usize) -> usize {
        self.columns[..idx].iter().map(|c| c.col_type.byte_width()).sum()
    }

    /// Strips a leading `table.`/`alias.` qualifier before matching.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let bare = name.rsplit('.').next().unwrap_or(name);
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(bare))
    }

    /// Invariant I8: a schema whose record needs more than the page can
    /// hold (bitmap byte + at least one record slot) is rejected up front.
    pub fn validate_fits(&self, page_size: usize) -> Result<()> {
        if self.record_width() + 1 > page_size {
            return Err(Error::bad_request(format!(
                "record width {} + 1 exceeds page size {page_size}",
                self.record_width()
            )));
        }
        Ok(())
    }
}
