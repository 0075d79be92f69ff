use std::io::{self, Write};

use tracing::error;

use pagedb::config::DbConfig;
use pagedb::database::Database;
use pagedb::sql::{execute, parse, Outcome};

/// Stdin read-eval-print loop, grounded on
/// `examples/original_source/main.py`'s `repl()` for the prompt/loop
/// shape and the `Erreur : ...` error rendering.
fn main() {
    tracing_subscriber::fmt::init();

    let config = match DbConfig::load("config.json") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Erreur : {e}");
            std::process::exit(1);
        }
    };

    let mut db = match Database::open(config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Erreur : {e}");
            std::process::exit(1);
        }
    };

    println!("=== pagedb ===");
    println!("dbpath: {}", db.config.dbpath);
    println!("Type EXIT to quit.\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("sql> ");
        io::stdout().flush().ok();
        line.clear();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse(input).and_then(|cmd| execute(cmd, &mut db)) {
            Ok(Outcome::Text(text)) => println!("{text}"),
            Ok(Outcome::Exit) => {
                if let Err(e) = db.close() {
                    eprintln!("Erreur : {e}");
                }
                println!("Bye.");
                break;
            }
            Err(e) => {
                error!(error = %e, "command failed");
                println!("Erreur : {e}");
            }
        }
    }
}
