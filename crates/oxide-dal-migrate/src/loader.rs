//! SQL migration files.
//!
//! Files are named `YYYYMMDDHHmmss_name.sql` and look like:
//!
//! ```sql
//! -- migrate:transaction auto
//! -- migrate:up
//! create table users (id integer primary key, email text not null);
//! create index users_email on users (email);
//!
//! -- migrate:down
//! drop table users;
//! ```
//!
//! The `down` section and the transaction directive are optional.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::checksum::checksum;
use crate::descriptor::{MigrationDescriptor, SqlHandler, TransactionMode};
use crate::error::{MigrateError, Result};

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{14})_([A-Za-z0-9_\-]+)\.sql$").expect("valid regex")
});

static MIGRATION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid regex"));

const UP_MARKER: &str = "-- migrate:up";
const DOWN_MARKER: &str = "-- migrate:down";
const TRANSACTION_MARKER: &str = "-- migrate:transaction";

/// Splits `YYYYMMDDHHmmss_name.sql` into id and name.
#[must_use]
pub fn parse_file_name(file_name: &str) -> Option<(String, String)> {
    let captures = FILE_NAME.captures(file_name)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// A parsed migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub transaction: TransactionMode,
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Parses migration file content.
///
/// # Errors
///
/// Fails without an up section, on a repeated section, or on an unknown
/// transaction mode.
pub fn parse_sql(path: &Path, content: &str) -> Result<SqlMigration> {
    let error = |message: String| MigrateError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut section = Section::Preamble;
    let mut up: Option<String> = None;
    let mut down: Option<String> = None;
    let mut transaction = TransactionMode::default();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == UP_MARKER {
            if up.is_some() {
                return Err(error("duplicate up section".to_string()));
            }
            up = Some(String::new());
            section = Section::Up;
        } else if trimmed == DOWN_MARKER {
            if down.is_some() {
                return Err(error("duplicate down section".to_string()));
            }
            down = Some(String::new());
            section = Section::Down;
        } else if let Some(mode) = trimmed.strip_prefix(TRANSACTION_MARKER) {
            transaction = mode.parse().map_err(error)?;
        } else {
            let target = match section {
                Section::Preamble => continue,
                Section::Up => up.as_mut(),
                Section::Down => down.as_mut(),
            };
            if let Some(body) = target {
                body.push_str(line);
                body.push('\n');
            }
        }
    }

    let up = up.ok_or_else(|| error(format!("missing '{UP_MARKER}' section")))?;
    Ok(SqlMigration {
        up: split_statements(&up),
        down: down.as_deref().map(split_statements).unwrap_or_default(),
        transaction,
    })
}

/// Splits SQL on top-level `;`. Semicolons inside quotes, dollar-quoted
/// bodies (`$$ ... $$`, `$tag$ ... $tag$`) and comments don't count; blank
/// and comment-only statements are dropped. Inside `'` and `"` literals a
/// backslash escapes the next character, as MySQL reads them.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let end = match ch {
            '\'' | '"' | '`' => {
                has_code = true;
                quoted_end(&chars, i)
            }
            '$' => {
                has_code = true;
                dollar_tag(&chars, i).map_or(i + 1, |tag| dollar_end(&chars, i + tag.len(), &tag))
            }
            '-' if next == Some('-') => chars[i..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(chars.len(), |offset| i + offset + 1),
            '/' if next == Some('*') => (i + 2..chars.len().saturating_sub(1))
                .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
                .map_or(chars.len(), |j| j + 2),
            ';' => {
                if has_code {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                has_code = false;
                i += 1;
                continue;
            }
            _ => {
                has_code |= !ch.is_whitespace();
                i + 1
            }
        };
        current.extend(&chars[i..end]);
        i = end;
    }
    if has_code {
        statements.push(current.trim().to_string());
    }
    statements
}

/// End (exclusive) of the quoted literal opening at `start`. A doubled quote
/// keeps the literal open, and so does a backslash outside backticks.
fn quoted_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut j = start + 1;
    while j < chars.len() {
        let ch = chars[j];
        if ch == '\\' && quote != '`' {
            j += 2;
        } else if ch == quote {
            if chars.get(j + 1) == Some(&quote) {
                j += 2;
            } else {
                return j + 1;
            }
        } else {
            j += 1;
        }
    }
    chars.len()
}

/// The `$tag$` delimiter opening at `start`, if any. Tags follow identifier
/// rules, so `$1` placeholders never match.
fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut j = start + 1;
    while j < chars.len() {
        let ch = chars[j];
        if ch == '$' {
            return Some(chars[start..=j].iter().collect());
        }
        let valid = if j == start + 1 {
            ch.is_alphabetic() || ch == '_'
        } else {
            ch.is_alphanumeric() || ch == '_'
        };
        if !valid {
            return None;
        }
        j += 1;
    }
    None
}

/// End (exclusive) of a dollar-quoted body whose opening tag ends at
/// `body_start`.
fn dollar_end(chars: &[char], body_start: usize, tag: &str) -> usize {
    let tag: Vec<char> = tag.chars().collect();
    (body_start..chars.len())
        .find(|&j| chars[j..].starts_with(&tag))
        .map_or(chars.len(), |j| j + tag.len())
}

/// Builds a descriptor from one file. The checksum covers the raw content.
///
/// # Errors
///
/// Fails on a malformed file name or content, or on an IO error.
pub fn load_file(path: &Path) -> Result<MigrationDescriptor> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| MigrateError::InvalidFilename(path.to_path_buf()))?;
    let (id, name) =
        parse_file_name(file_name).ok_or_else(|| MigrateError::InvalidFilename(path.to_path_buf()))?;

    let content = std::fs::read_to_string(path)?;
    let parsed = parse_sql(path, &content)?;
    debug!(
        id = %id,
        up = parsed.up.len(),
        down = parsed.down.len(),
        "Loaded migration file"
    );

    Ok(MigrationDescriptor::new(
        id,
        name,
        checksum(content.as_bytes()),
        SqlHandler {
            up: parsed.up,
            down: parsed.down,
        },
    )
    .transaction(parsed.transaction))
}

/// Loads every `*.sql` file in `dir`, ordered by id. Other files are
/// ignored.
///
/// # Errors
///
/// Fails if the directory is missing, on a malformed file, or on a
/// duplicate id.
pub fn load_dir(dir: &Path) -> Result<Vec<MigrationDescriptor>> {
    if !dir.is_dir() {
        return Err(MigrateError::MigrationsDirNotFound(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sql"));
    paths.sort();

    let mut seen = HashSet::new();
    let mut migrations = Vec::with_capacity(paths.len());
    for path in paths {
        let migration = load_file(&path)?;
        if !seen.insert(migration.id.clone()) {
            return Err(MigrateError::DuplicateId(migration.id));
        }
        migrations.push(migration);
    }
    migrations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(migrations)
}

/// Writes an empty migration file named after `now` and returns its path.
///
/// # Errors
///
/// Fails on an invalid name, an existing file, or an IO error.
pub fn create_migration_file(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    if !MIGRATION_NAME.is_match(name) {
        return Err(MigrateError::InvalidFilename(PathBuf::from(name)));
    }

    let path = dir.join(format!("{}_{name}.sql", now.format("%Y%m%d%H%M%S")));
    if path.exists() {
        return Err(MigrateError::MigrationExists(path));
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, format!("{UP_MARKER}\n\n\n{DOWN_MARKER}\n\n"))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("20240101120000_create_users.sql"),
            Some(("20240101120000".to_string(), "create_users".to_string()))
        );
        assert_eq!(parse_file_name("2024_create_users.sql"), None);
        assert_eq!(parse_file_name("20240101120000_create users.sql"), None);
        assert_eq!(parse_file_name("20240101120000_create_users.txt"), None);
    }

    #[test]
    fn test_split_statements_respects_quotes_and_comments() {
        let sql = "insert into t values ('a;b', 'it''s');\n\
                   -- trailing; comment\n\
                   /* block; */ update t set x = \"q;\";\n\
                   ;\n";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "insert into t values ('a;b', 'it''s')");
        assert!(statements[1].ends_with("update t set x = \"q;\""));
    }

    #[test]
    fn test_split_keeps_dollar_quoted_bodies() {
        let sql = "create function touch() returns trigger as $$ begin new.x := 1; return new; end; $$ language plpgsql;\n\
                   do $body$ begin perform 1; end $body$;\n\
                   select $1, '$$';\n";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("create function touch()"));
        assert!(statements[0].ends_with("$$ language plpgsql"));
        assert_eq!(statements[1], "do $body$ begin perform 1; end $body$");
        assert_eq!(statements[2], "select $1, '$$'");
    }

    #[test]
    fn test_split_backslash_escaped_quotes() {
        assert_eq!(
            split_statements("insert into t values ('a\\';b');\nselect 1;"),
            vec!["insert into t values ('a\\';b')", "select 1"]
        );
    }

    #[test]
    fn test_split_drops_comment_only_tail() {
        assert_eq!(
            split_statements("select 1;\n-- nothing else\n"),
            vec!["select 1"]
        );
    }

    #[test]
    fn test_parse_sql_sections() {
        let content = "-- migrate:transaction none\n\
                       -- migrate:up\n\
                       create table a (id integer);\n\
                       create table b (id integer);\n\
                       -- migrate:down\n\
                       drop table b;\n\
                       drop table a;\n";
        let parsed = parse_sql(Path::new("x.sql"), content).unwrap();
        assert_eq!(parsed.transaction, TransactionMode::None);
        assert_eq!(parsed.up.len(), 2);
        assert_eq!(parsed.down, vec!["drop table b", "drop table a"]);
    }

    #[test]
    fn test_parse_sql_errors() {
        let path = Path::new("x.sql");
        assert!(matches!(
            parse_sql(path, "create table a (id integer);"),
            Err(MigrateError::Parse { .. })
        ));
        assert!(parse_sql(path, "-- migrate:up\n-- migrate:up\n").is_err());
        assert!(parse_sql(path, "-- migrate:transaction maybe\n-- migrate:up\n").is_err());
    }
}
