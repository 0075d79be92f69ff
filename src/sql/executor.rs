use std::fmt::Write as _;

use comfy_table::Table;
use tracing::info;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::query::{Condition, Filter, Op, Project, RecordIterator, Scan};
use crate::relation::{Column, Schema, Value};
use crate::sql::csv_import;
use crate::sql::parser::{Command, Rhs, WhereTerm};

/// What a command produced: text to print, or a request to stop the REPL.
///
/// Grounded on `examples/original_source/sql/executor.py`'s verb dispatch
/// shape, retargeted at the paged Relation Layer/Query Iterators instead
/// of that prototype's whole-table pickling (see SPEC_FULL.md §9).
pub enum Outcome {
    Text(String),
    Exit,
}

pub fn execute(cmd: Command, db: &mut Database) -> Result<Outcome> {
    match cmd {
        Command::CreateTable { table, columns } => create_table(db, &table, columns),
        Command::DropTable { table } => drop_table(db, &table),
        Command::DropTables => {
            db.catalog.drop_all_tables();
            Ok(Outcome::Text("All tables dropped.".to_string()))
        }
        Command::Insert { table, values } => insert(db, &table, values),
        Command::ImportCsv { table, file } => csv_import::import(db, &table, &file),
        Command::Select {
            table,
            columns,
            where_clause,
        } => select(db, &table, columns, where_clause),
        Command::Delete { table, where_clause } => delete(db, &table, where_clause),
        Command::Update {
            table,
            assignments,
            where_clause,
        } => update(db, &table, assignments, where_clause),
        Command::DescribeTable { table } => describe_table(db, &table),
        Command::DescribeTables => describe_tables(db),
        Command::Exit => Ok(Outcome::Exit),
    }
}

fn create_table(db: &mut Database, table: &str, columns: Vec<(String, String)>) -> Result<Outcome> {
    let mut cols = Vec::with_capacity(columns.len());
    for (name, type_text) in columns {
        let col_type = crate::relation::ColumnType::parse(&type_text)?;
        cols.push(Column::new(name, col_type));
    }
    let schema = Schema::new(cols);
    db.catalog.create_table(table, schema, db.config.pagesize)?;
    info!(table, "created table");
    Ok(Outcome::Text(format!("Table {table} created.")))
}

fn drop_table(db: &mut Database, table: &str) -> Result<Outcome> {
    db.catalog.drop_table(table)?;
    Ok(Outcome::Text(format!("Table {table} dropped.")))
}

fn insert(db: &mut Database, table: &str, raw_values: Vec<String>) -> Result<Outcome> {
    let mut rel = db.catalog.relation(table, db.config.pagesize)?;
    if raw_values.len() != rel.schema.len() {
        return Err(Error::bad_request(format!(
            "table {table} has {} columns, got {} values",
            rel.schema.len(),
            raw_values.len()
        )));
    }
    let values = convert_row(&rel.schema, &raw_values)?;
    rel.insert_record(&mut db.pool, values)?;
    db.catalog.sync_relation(&rel);
    Ok(Outcome::Text(format!("Record inserted into {table}.")))
}

/// Shared by `INSERT` and CSV import: converts a row of literal text into
/// typed values against `schema`, in column order.
pub fn convert_row(schema: &Schema, raw_values: &[String]) -> Result<Vec<Value>> {
    schema
        .columns
        .iter()
        .zip(raw_values.iter())
        .map(|(col, raw)| Value::parse_literal(raw, col.col_type))
        .collect()
}

fn resolve_where(schema: &Schema, terms: &[WhereTerm]) -> Result<Vec<Condition>> {
    terms
        .iter()
        .map(|term| {
            let col_idx = schema
                .index_of(&term.column)
                .ok_or_else(|| Error::bad_request(format!("unknown column: {}", term.column)))?;
            let op = Op::parse(&term.op).ok_or_else(|| Error::bad_request(format!("unknown operator: {}", term.op)))?;
            let col_type = schema.columns[col_idx].col_type;
            match &term.rhs {
                Rhs::Literal(text) => Condition::column_vs_literal(col_idx, op, text, col_type),
                Rhs::Ambiguous(text) => match schema.index_of(text) {
                    Some(rhs_idx) => Ok(Condition::column_vs_column(col_idx, op, rhs_idx)),
                    None => Condition::column_vs_literal(col_idx, op, text, col_type),
                },
            }
        })
        .collect()
}

fn select(db: &mut Database, table: &str, columns: Vec<String>, where_clause: Vec<WhereTerm>) -> Result<Outcome> {
    let rel = db.catalog.relation(table, db.config.pagesize)?;
    let conditions = resolve_where(&rel.schema, &where_clause)?;
    let keep_indices: Option<Vec<usize>> = if columns.len() == 1 && columns[0] == "*" {
        None
    } else {
        Some(
            columns
                .iter()
                .map(|c| {
                    rel.schema
                        .index_of(c)
                        .ok_or_else(|| Error::bad_request(format!("unknown column: {c}")))
                })
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let scan = Scan::new(rel, &mut db.pool);
    let filtered = Filter::new(scan, conditions);
    let mut pipeline: Box<dyn RecordIterator + '_> = match keep_indices {
        None => Box::new(filtered),
        Some(keep) => Box::new(Project::new(filtered, keep)),
    };

    let mut out = String::new();
    let mut count = 0usize;
    while let Some(record) = pipeline.next()? {
        let line: Vec<String> = record.values.iter().map(|v| v.to_display_string()).collect();
        writeln!(out, "{} .", line.join(" ; ")).expect("writing to String never fails");
        count += 1;
    }
    write!(out, "Total selected records={count}").expect("writing to String never fails");
    Ok(Outcome::Text(out))
}

fn delete(db: &mut Database, table: &str, where_clause: Vec<WhereTerm>) -> Result<Outcome> {
    let rel = db.catalog.relation(table, db.config.pagesize)?;
    let conditions = resolve_where(&rel.schema, &where_clause)?;
    let rel_for_delete = rel.clone();
    let mut scan = Filter::new(Scan::new(rel, &mut db.pool), conditions);

    let mut addresses = Vec::new();
    while let Some(record) = scan.next()? {
        if let Some(addr) = record.address {
            addresses.push(addr);
        }
    }
    drop(scan);

    let mut count = 0usize;
    for addr in addresses {
        rel_for_delete.delete_record(&mut db.pool, addr)?;
        count += 1;
    }
    Ok(Outcome::Text(format!("Total deleted records={count}")))
}

fn update(
    db: &mut Database,
    table: &str,
    assignments: Vec<(String, String)>,
    where_clause: Vec<WhereTerm>,
) -> Result<Outcome> {
    let rel = db.catalog.relation(table, db.config.pagesize)?;
    let conditions = resolve_where(&rel.schema, &where_clause)?;

    let mut assignment_indices = Vec::with_capacity(assignments.len());
    for (col, raw) in &assignments {
        let idx = rel
            .schema
            .index_of(col)
            .ok_or_else(|| Error::bad_request(format!("unknown column: {col}")))?;
        let value = Value::parse_literal(raw, rel.schema.columns[idx].col_type)?;
        assignment_indices.push((idx, value));
    }

    let rel_for_update = rel.clone();
    let mut scan = Filter::new(Scan::new(rel, &mut db.pool), conditions);

    let mut targets = Vec::new();
    while let Some(record) = scan.next()? {
        if let Some(addr) = record.address {
            targets.push((addr, record.values));
        }
    }
    drop(scan);

    let mut count = 0usize;
    for (addr, mut values) in targets {
        for (idx, value) in &assignment_indices {
            values[*idx] = value.clone();
        }
        rel_for_update.update_record(&mut db.pool, addr, values)?;
        count += 1;
    }
    Ok(Outcome::Text(format!("Total updated records={count}")))
}

fn describe_table(db: &mut Database, table: &str) -> Result<Outcome> {
    let schema = db.catalog.schema(table)?;
    let mut out = Table::new();
    out.set_header(vec!["Column", "Type", "Bytes"]);
    for col in &schema.columns {
        out.add_row(vec![col.name.clone(), col.col_type.to_string(), col.col_type.byte_width().to_string()]);
    }
    Ok(Outcome::Text(out.to_string()))
}

fn describe_tables(db: &mut Database) -> Result<Outcome> {
    let mut out = Table::new();
    out.set_header(vec!["Table", "Columns"]);
    for name in db.catalog.table_names() {
        let schema = db.catalog.schema(&name)?;
        let cols = schema
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.col_type))
            .collect::<Vec<_>>()
            .join(", ");
        out.add_row(vec![name, cols]);
    }
    Ok(Outcome::Text(out.to_string()))
}

/// Integration-style tests driving `execute()` against a real
/// `Database::open` over a throwaway directory, the way the full
/// config -> page store -> buffer pool -> relation -> iterators ->
/// executor pipeline runs in the REPL. Covers spec.md's concrete
/// scenarios for SELECT...WHERE, DELETE count, and the UnknownTable
/// error surface.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::sql::parser::parse;
    use tempdir::TempDir;

    fn open_db(dir: &TempDir) -> Database {
        let config = DbConfig {
            dbpath: dir.path().to_string_lossy().to_string(),
            pagesize: 512,
            dm_maxfilecount: 4,
            bm_buffercount: 4,
            bm_policy: crate::buffer::ReplacementPolicy::Lru,
        };
        Database::open(config).unwrap()
    }

    fn run(db: &mut Database, line: &str) -> Result<Outcome> {
        let cmd = parse(line).unwrap();
        execute(cmd, db)
    }

    fn text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Text(t) => t,
            Outcome::Exit => panic!("expected Text outcome"),
        }
    }

    #[test]
    fn select_with_where_filters_to_matching_row() {
        let dir = TempDir::new("exec").unwrap();
        let mut db = open_db(&dir);
        run(&mut db, "CREATE TABLE Users (Id:INT, Nom:CHAR(10))").unwrap();
        run(&mut db, "INSERT INTO Users VALUES (1, 'Alice')").unwrap();
        run(&mut db, "INSERT INTO Users VALUES (2, 'Bob')").unwrap();

        let out = text(run(&mut db, "SELECT * FROM Users WHERE Id=2").unwrap());
        assert!(out.contains("Bob"));
        assert!(!out.contains("Alice"));
        assert!(out.contains("Total selected records=1"));
    }

    #[test]
    fn delete_then_reselect_reports_zero() {
        let dir = TempDir::new("exec").unwrap();
        let mut db = open_db(&dir);
        run(&mut db, "CREATE TABLE T (A:INT)").unwrap();
        run(&mut db, "INSERT INTO T VALUES (100)").unwrap();

        let deleted = text(run(&mut db, "DELETE FROM T WHERE A=100").unwrap());
        assert_eq!(deleted, "Total deleted records=1");

        let selected = text(run(&mut db, "SELECT * FROM T").unwrap());
        assert!(selected.contains("Total selected records=0"));
    }

    #[test]
    fn select_from_unknown_table_surfaces_unknown_table_error() {
        let dir = TempDir::new("exec").unwrap();
        let mut db = open_db(&dir);
        let err = run(&mut db, "SELECT * FROM Ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownTable { .. }));
    }

    #[test]
    fn csv_import_rows_are_visible_immediately_after_insert() {
        let dir = TempDir::new("exec").unwrap();
        let mut db = open_db(&dir);
        run(&mut db, "CREATE TABLE T (A:INT)").unwrap();

        let csv_path = dir.path().join("rows.csv");
        std::fs::write(&csv_path, "1\n2\n").unwrap();
        let loaded = text(run(&mut db, &format!("APPEND INTO T ALLRECORDS ({})", csv_path.display())).unwrap());
        assert_eq!(loaded, "Total records loaded=2");

        let selected = text(run(&mut db, "SELECT * FROM T").unwrap());
        assert!(selected.contains("Total selected records=2"));
    }
}
