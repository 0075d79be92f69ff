use std::cmp::Ordering;

use crate::error::Result;
use crate::query::iterator::RecordIterator;
use crate::relation::{ColumnType, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Op {
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "=" => Op::Eq,
            "<>" | "!=" => Op::Ne,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::Le,
            ">=" => Op::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
enum Rhs {
    Column(usize),
    Literal(Value),
}

/// `col OP (col2 | literal)`, evaluated against one record. The literal
/// side is parsed once here, not per-record.
///
/// Grounded on `examples/original_source/query_engine/operators.py`'s
/// `Condition`.
#[derive(Debug, Clone)]
pub struct Condition {
    col_idx: usize,
    op: Op,
    rhs: Rhs,
}

impl Condition {
    pub fn column_vs_column(col_idx: usize, op: Op, rhs_col_idx: usize) -> Self {
        Self {
            col_idx,
            op,
            rhs: Rhs::Column(rhs_col_idx),
        }
    }

    /// `col_type` is the left column's type; it governs how the literal
    /// text is parsed (decimal-then-integer for `INT`, IEEE parse for
    /// `FLOAT`, raw string otherwise) per §4.4.
    pub fn column_vs_literal(col_idx: usize, op: Op, raw: &str, col_type: ColumnType) -> Result<Self> {
        let literal = match col_type {
            ColumnType::Int => {
                let as_f64: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| crate::error::Error::TypeMismatch {
                        value: raw.to_string(),
                        expected: "INT".to_string(),
                    })?;
                Value::Int(as_f64 as i32)
            }
            ColumnType::Float => {
                let as_f64: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| crate::error::Error::TypeMismatch {
                        value: raw.to_string(),
                        expected: "FLOAT".to_string(),
                    })?;
                Value::Float(as_f64 as f32)
            }
            ColumnType::Char(_) => Value::Text(raw.to_string()),
        };
        Ok(Self {
            col_idx,
            op,
            rhs: Rhs::Literal(literal),
        })
    }

    fn evaluate(&self, record: &Record) -> bool {
        let left = &record.values[self.col_idx];
        let right_owned;
        let right = match &self.rhs {
            Rhs::Column(idx) => &record.values[*idx],
            Rhs::Literal(v) => {
                right_owned = v.clone();
                &right_owned
            }
        };
        let ordering = compare_coerced(left, right);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Gt => ordering == Ordering::Greater,
            Op::Le => ordering != Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
        }
    }
}

/// Same-type values compare directly; mixed types attempt a numeric
/// coercion first, falling back to lexicographic string comparison.
fn compare_coerced(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => left.to_display_string().cmp(&right.to_display_string()),
        },
    }
}

/// Applies a conjunction of [`Condition`]s over a child iterator, yielding
/// the first record for which every condition holds.
pub struct Filter<I> {
    child: I,
    conditions: Vec<Condition>,
}

impl<I: RecordIterator> Filter<I> {
    pub fn new(child: I, conditions: Vec<Condition>) -> Self {
        Self { child, conditions }
    }
}

impl<I: RecordIterator> RecordIterator for Filter<I> {
    fn next(&mut self) -> Result<Option<Record>> {
        while let Some(record) = self.child.next()? {
            if self.conditions.iter().all(|c| c.evaluate(&record)) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<()> {
        self.child.reset()
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Record;

    struct Once(Option<Record>);
    impl RecordIterator for Once {
        fn next(&mut self) -> Result<Option<Record>> {
            Ok(self.0.take())
        }
        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn int_literal_condition_matches() {
        let rec = Record::new(vec![Value::Int(5)]);
        let cond = Condition::column_vs_literal(0, Op::Eq, "5", ColumnType::Int).unwrap();
        assert!(cond.evaluate(&rec));
    }

    #[test]
    fn mixed_type_falls_back_to_numeric_coercion() {
        let left = Value::Int(5);
        let right = Value::Text("5".to_string());
        assert_eq!(compare_coerced(&left, &right), Ordering::Equal);
    }

    #[test]
    fn filter_passes_through_matching_records_only() {
        let mut f = Filter::new(
            Once(Some(Record::new(vec![Value::Int(9)]))),
            vec![Condition::column_vs_literal(0, Op::Gt, "1", ColumnType::Int).unwrap()],
        );
        assert!(f.next().unwrap().is_some());
        assert!(f.next().unwrap().is_none());
    }
}
