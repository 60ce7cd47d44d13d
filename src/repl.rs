//! The line-oriented REPL: reads statements from stdin, dispatches them
//! against the storage engine, and renders results/errors as the literal
//! strings the end-to-end scenarios expect.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use tracing::info;

use crate::command::{self, MetaCommand, Statement};
use crate::errors::DbError;
use crate::storage::{ExecutionOutcome, Table};

const PROMPT: &str = "db > ";

const HELP: &str = "\
Meta-commands:
  .exit    flush and exit
  .help    show this message
  .btree   print the root leaf/tree structure
Statements:
  insert <id> <username> <email>
  select";

pub fn run<P: AsRef<Path>>(path: P) -> Result<ExitCode, DbError> {
    let mut table = Table::open(path)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_prompt();
        let line = match lines.next() {
            Some(line) => line?,
            None => {
                info!("EOF on stdin, shutting down");
                table.close()?;
                return Ok(ExitCode::SUCCESS);
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('.') {
            match command::parse_meta_command(input) {
                Some(MetaCommand::Exit) => {
                    table.close()?;
                    return Ok(ExitCode::SUCCESS);
                }
                Some(MetaCommand::Help) => println!("{}", HELP),
                Some(MetaCommand::Btree) => print!("{}", table.render_btree()?),
                None => println!("Unrecognized command: '{}'.", input),
            }
            continue;
        }

        match command::prepare_statement(input) {
            Ok(Statement::Insert(row)) => match table.insert(&row) {
                Ok(ExecutionOutcome::Success) => println!("Executed."),
                Ok(ExecutionOutcome::DuplicateKey) => println!("Error: Duplicate key."),
                Ok(ExecutionOutcome::TableFull) => println!("Error: Table full."),
                Err(e) => return Err(e),
            },
            Ok(Statement::Select) => match table.select() {
                Ok(rows) => {
                    for row in rows {
                        println!("({}, {}, {})", row.id, row.username_str(), row.email_str());
                    }
                    println!("Executed.");
                }
                Err(e) => return Err(e),
            },
            Err(prepare_err) => println!("{}", prepare_err),
        }
    }
}

fn print_prompt() {
    print!("{}", PROMPT);
    let _ = io::stdout().flush();
}
