use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Rhs {
    /// Right-hand side token that was quoted, or otherwise unambiguously
    /// a literal; the executor still type-checks it against the left
    /// column's type.
    Literal(String),
    /// An unquoted bare token: could be a literal or a column reference.
    /// The executor resolves it against the relation's schema.
    Ambiguous(String),
}

#[derive(Debug, Clone)]
pub struct WhereTerm {
    pub column: String,
    pub op: String,
    pub rhs: Rhs,
}

#[derive(Debug, Clone)]
pub enum Command {
    CreateTable {
        table: String,
        columns: Vec<(String, String)>,
    },
    DropTable {
        table: String,
    },
    DropTables,
    Insert {
        table: String,
        values: Vec<String>,
    },
    ImportCsv {
        table: String,
        file: String,
    },
    Select {
        table: String,
        columns: Vec<String>,
        where_clause: Vec<WhereTerm>,
    },
    Delete {
        table: String,
        where_clause: Vec<WhereTerm>,
    },
    Update {
        table: String,
        assignments: Vec<(String, String)>,
        where_clause: Vec<WhereTerm>,
    },
    DescribeTable {
        table: String,
    },
    DescribeTables,
    Exit,
}

/// Hand-rolled tokenizer/parser for this engine's non-standard grammar
/// (`col:TYPE` pairs, `APPEND ... ALLRECORDS (file)`). Grounded on
/// `examples/original_source/sql/parser.py` for the per-verb token shape;
/// extended with quoted-field splitting and `WHERE ... AND ...` clauses,
/// which that prototype did not need.
pub fn parse(line: &str) -> Result<Command> {
    let raw = line.trim().trim_end_matches(';').trim();
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(Error::bad_request("empty command"));
    }
    let action = tokens[0].to_uppercase();

    match action.as_str() {
        "CREATE" if tokens.len() > 2 && tokens[1].eq_ignore_ascii_case("TABLE") => parse_create_table(raw, tokens[2]),
        "DROP" if tokens.len() > 1 && tokens[1].eq_ignore_ascii_case("TABLES") => Ok(Command::DropTables),
        "DROP" if tokens.len() > 2 && tokens[1].eq_ignore_ascii_case("TABLE") => Ok(Command::DropTable {
            table: tokens[2].to_string(),
        }),
        "INSERT" if tokens.len() > 2 && tokens[1].eq_ignore_ascii_case("INTO") => parse_insert(raw, tokens[2]),
        "APPEND" => parse_append(raw, &tokens),
        "SELECT" => parse_select(raw),
        "DELETE" => parse_delete(raw, &tokens),
        "UPDATE" => parse_update(raw, &tokens),
        "DESCRIBE" if tokens.len() > 1 && tokens[1].eq_ignore_ascii_case("TABLES") => Ok(Command::DescribeTables),
        "DESCRIBE" if tokens.len() > 2 && tokens[1].eq_ignore_ascii_case("TABLE") => Ok(Command::DescribeTable {
            table: tokens[2].to_string(),
        }),
        "EXIT" | "QUIT" => Ok(Command::Exit),
        _ => Err(Error::bad_request(format!("unknown command: {raw}"))),
    }
}

fn paren_contents(raw: &str) -> Result<&str> {
    let start = raw.find('(').ok_or_else(|| Error::bad_request("missing ("))?;
    let end = raw.rfind(')').ok_or_else(|| Error::bad_request("missing )"))?;
    if end <= start {
        return Err(Error::bad_request("unbalanced parentheses"));
    }
    Ok(&raw[start + 1..end])
}

fn parse_create_table(raw: &str, table: &str) -> Result<Command> {
    let content = paren_contents(raw)?;
    let mut columns = Vec::new();
    for part in split_top_level(content, ',') {
        let parts: Vec<&str> = part.splitn(2, ':').collect();
        if parts.len() != 2 {
            return Err(Error::bad_request(format!("invalid column definition: {part}")));
        }
        columns.push((parts[0].trim().to_string(), parts[1].trim().to_string()));
    }
    if columns.is_empty() {
        return Err(Error::bad_request("CREATE TABLE needs at least one column"));
    }
    Ok(Command::CreateTable {
        table: table.to_string(),
        columns,
    })
}

fn parse_insert(raw: &str, table: &str) -> Result<Command> {
    let content = paren_contents(raw)?;
    let values = split_top_level(content, ',').into_iter().map(unquote).collect();
    Ok(Command::Insert {
        table: table.to_string(),
        values,
    })
}

fn parse_append(raw: &str, tokens: &[&str]) -> Result<Command> {
    if tokens.len() < 3 || !tokens[1].eq_ignore_ascii_case("INTO") {
        return Err(Error::bad_request("expected APPEND INTO <table> ALLRECORDS (<file>)"));
    }
    let table = tokens[2].to_string();
    let rest: Vec<&str> = tokens[3..].iter().copied().collect();
    let joined = rest.join(" ");
    if !joined.to_uppercase().starts_with("ALLRECORDS") {
        return Err(Error::bad_request("expected ALLRECORDS (<file>)"));
    }
    let file = paren_contents(raw)?.trim().to_string();
    Ok(Command::ImportCsv { table, file })
}

fn split_where(raw: &str) -> (String, Option<String>) {
    let upper = raw.to_uppercase();
    if let Some(pos) = upper.find("WHERE") {
        let before = raw[..pos].trim().to_string();
        let after = raw[pos + "WHERE".len()..].trim().to_string();
        (before, Some(after))
    } else {
        (raw.trim().to_string(), None)
    }
}

fn parse_where_clause(clause: &str) -> Result<Vec<WhereTerm>> {
    let upper = clause.to_uppercase();
    let parts: Vec<&str> = if upper.contains(" AND ") {
        split_case_insensitive(clause, "AND")
    } else {
        vec![clause]
    };
    parts.iter().map(|p| parse_where_term(p.trim())).collect()
}

fn split_case_insensitive<'a>(s: &'a str, word: &str) -> Vec<&'a str> {
    let upper = s.to_uppercase();
    let needle = format!(" {} ", word.to_uppercase());
    let mut out = Vec::new();
    let mut rest = s;
    let mut rest_upper = upper.as_str();
    while let Some(pos) = rest_upper.find(&needle) {
        out.push(&rest[..pos]);
        let advance = pos + needle.len();
        rest = &rest[advance..];
        rest_upper = &rest_upper[advance..];
    }
    out.push(rest);
    out
}

const OPERATORS: &[&str] = &[">=", "<=", "<>", "!=", "=", ">", "<"];

fn parse_where_term(term: &str) -> Result<WhereTerm> {
    let (op, pos) = OPERATORS
        .iter()
        .filter_map(|op| term.find(op).map(|pos| (*op, pos)))
        .min_by_key(|(_, pos)| *pos)
        .ok_or_else(|| Error::bad_request(format!("no comparison operator in: {term}")))?;
    let column = term[..pos].trim().to_string();
    let rhs_raw = term[pos + op.len()..].trim();
    let op = if op == "!=" { "<>".to_string() } else { op.to_string() };
    let rhs = if (rhs_raw.starts_with('\'') && rhs_raw.ends_with('\'') && rhs_raw.len() >= 2)
        || (rhs_raw.starts_with('"') && rhs_raw.ends_with('"') && rhs_raw.len() >= 2)
    {
        Rhs::Literal(unquote(rhs_raw.to_string()))
    } else {
        Rhs::Ambiguous(rhs_raw.to_string())
    };
    Ok(WhereTerm { column, op, rhs })
}

fn parse_select(raw: &str) -> Result<Command> {
    let (main, where_raw) = split_where(raw);
    let where_clause = where_raw.map(|w| parse_where_clause(&w)).transpose()?.unwrap_or_default();

    let main = main.replacen(',', " ", usize::MAX);
    let tokens: Vec<&str> = main.split_whitespace().collect();
    let from_idx = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("FROM"))
        .ok_or_else(|| Error::bad_request("SELECT requires FROM"))?;
    if from_idx + 1 >= tokens.len() {
        return Err(Error::bad_request("SELECT FROM requires a table name"));
    }
    let columns = tokens[1..from_idx].iter().map(|s| s.to_string()).collect();
    let table = tokens[from_idx + 1].to_string();
    Ok(Command::Select {
        table,
        columns,
        where_clause,
    })
}

fn parse_delete(raw: &str, _tokens: &[&str]) -> Result<Command> {
    let (main, where_raw) = split_where(raw);
    let where_clause = where_raw.map(|w| parse_where_clause(&w)).transpose()?.unwrap_or_default();
    let main_tokens: Vec<&str> = main.split_whitespace().collect();
    if main_tokens.len() < 2 {
        return Err(Error::bad_request("expected DELETE FROM <table>"));
    }
    let table = if main_tokens[1].eq_ignore_ascii_case("FROM") {
        main_tokens.get(2)
    } else {
        main_tokens.get(1)
    }
    .ok_or_else(|| Error::bad_request("expected DELETE FROM <table>"))?
    .to_string();
    Ok(Command::Delete { table, where_clause })
}

fn parse_update(raw: &str, _tokens: &[&str]) -> Result<Command> {
    let (main, where_raw) = split_where(raw);
    let where_clause = where_raw.map(|w| parse_where_clause(&w)).transpose()?.unwrap_or_default();

    let upper = main.to_uppercase();
    let set_pos = upper.find("SET").ok_or_else(|| Error::bad_request("UPDATE requires SET"))?;
    let head = main[..set_pos].trim();
    let set_body = main[set_pos + "SET".len()..].trim();

    let head_tokens: Vec<&str> = head.split_whitespace().collect();
    let table = head_tokens
        .get(1)
        .ok_or_else(|| Error::bad_request("expected UPDATE <table>"))?
        .to_string();

    let mut assignments = Vec::new();
    for pair in split_top_level(set_body, ',') {
        let parts: Vec<&str> = pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(Error::bad_request(format!("invalid assignment: {pair}")));
        }
        assignments.push((parts[0].trim().to_string(), unquote(parts[1].trim().to_string())));
    }
    Ok(Command::Update {
        table,
        assignments,
        where_clause,
    })
}

fn unquote(s: String) -> String {
    let t = s.trim();
    if t.len() >= 2
        && ((t.starts_with('\'') && t.ends_with('\'')) || (t.starts_with('"') && t.ends_with('"')))
    {
        t[1..t.len() - 1].to_string()
    } else {
        t.to_string()
    }
}

/// Splits on `sep` at top level only, ignoring separators inside `'...'`
/// or `"..."` quoted spans — so values like `'a, b'` survive intact.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == sep => {
                parts.push(std::mem::take(&mut current));
            }
            None => current.push(ch),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}
