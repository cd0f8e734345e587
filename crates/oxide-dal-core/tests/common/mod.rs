#![allow(dead_code)]

use oxide_dal_core::schema::MigrationOp;
use oxide_dal_core::{compile_migration, compile_query, Dialect, Query, SqlStatement};

pub fn dialects() -> [Dialect; 3] {
    [Dialect::postgres(), Dialect::mysql(), Dialect::sqlite()]
}

pub fn query(query: &Query, dialect: &Dialect) -> SqlStatement {
    compile_query(query, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile for {}: {e}", dialect.name))
}

pub fn migration(op: &MigrationOp, dialect: &Dialect) -> Vec<String> {
    compile_migration(op, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile for {}: {e}", dialect.name))
        .into_iter()
        .map(|s| s.text)
        .collect()
}
