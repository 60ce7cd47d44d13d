//! Statement preparation: turns a line of REPL input into either a meta
//! command or a `Statement` the storage engine can execute.
//!
//! Grammar is exactly `insert <id> <username> <email>` and `select`, plus
//! the leading-`.` meta-commands — this store has no general SQL layer,
//! so there is no tokenizer/AST beyond what those two statements need.

use crate::errors::PrepareError;
use crate::storage::row::{Row, EMAIL_SIZE, USERNAME_SIZE};

pub enum Statement {
    Insert(Row),
    Select,
}

pub enum MetaCommand {
    Exit,
    Help,
    Btree,
}

/// Recognizes a leading-`.` meta-command. Returns `None` for anything
/// that isn't one, including lines that merely start with `.` but don't
/// match — the caller renders the "unrecognized command" message.
pub fn parse_meta_command(input: &str) -> Option<MetaCommand> {
    match input {
        ".exit" => Some(MetaCommand::Exit),
        ".help" => Some(MetaCommand::Help),
        ".btree" => Some(MetaCommand::Btree),
        _ => None,
    }
}

pub fn prepare_statement(input: &str) -> Result<Statement, PrepareError> {
    if input.starts_with("insert") {
        prepare_insert(input)
    } else if input == "select" {
        Ok(Statement::Select)
    } else {
        Err(PrepareError::UnrecognizedKeyword(input.to_string()))
    }
}

fn prepare_insert(input: &str) -> Result<Statement, PrepareError> {
    let mut parts = input.split_whitespace();
    parts.next(); // "insert"
    let id_str = parts.next().ok_or(PrepareError::SyntaxError)?;
    let username = parts.next().ok_or(PrepareError::SyntaxError)?;
    let email = parts.next().ok_or(PrepareError::SyntaxError)?;
    if parts.next().is_some() {
        return Err(PrepareError::SyntaxError);
    }

    let id: i64 = id_str.parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    if id > u32::MAX as i64 {
        return Err(PrepareError::SyntaxError);
    }

    if username.len() > USERNAME_SIZE - 1 || email.len() > EMAIL_SIZE - 1 {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Statement::Insert(Row::new(id as u32, username, email)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepares_valid_insert() {
        match prepare_statement("insert 1 alice alice@x").unwrap() {
            Statement::Insert(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.username_str(), "alice");
                assert_eq!(row.email_str(), "alice@x");
            }
            _ => panic!("expected Insert"),
        }
    }

    #[test]
    fn prepares_select() {
        assert!(matches!(prepare_statement("select"), Ok(Statement::Select)));
    }

    #[test]
    fn rejects_negative_id() {
        assert_eq!(
            prepare_statement("insert -1 x y").unwrap_err(),
            PrepareError::NegativeId
        );
    }

    #[test]
    fn rejects_oversized_username() {
        let long_username = "a".repeat(USERNAME_SIZE);
        let input = format!("insert 1 {} e@x", long_username);
        assert_eq!(
            prepare_statement(&input).unwrap_err(),
            PrepareError::StringTooLong
        );
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            prepare_statement("insert 1 alice").unwrap_err(),
            PrepareError::SyntaxError
        );
    }

    #[test]
    fn rejects_unrecognized_keyword() {
        match prepare_statement("destroy everything") {
            Err(PrepareError::UnrecognizedKeyword(buf)) => {
                assert_eq!(buf, "destroy everything")
            }
            other => panic!("expected UnrecognizedKeyword, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn parses_meta_commands() {
        assert!(matches!(parse_meta_command(".exit"), Some(MetaCommand::Exit)));
        assert!(matches!(parse_meta_command(".help"), Some(MetaCommand::Help)));
        assert!(matches!(parse_meta_command(".btree"), Some(MetaCommand::Btree)));
        assert!(parse_meta_command(".bogus").is_none());
    }
}
