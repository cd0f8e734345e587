//! SHA-256 content checksums.

use oxide_dal_core::schema::MigrationOp;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Lowercase hex SHA-256 of `content`.
#[must_use]
pub fn checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Checksum of a code-defined migration: the JSON form of both operation
/// lists, so any change to either direction is detected as drift.
///
/// # Errors
///
/// Returns [`MigrateError::Serialization`](crate::MigrateError::Serialization)
/// if the operations can't be serialized.
pub fn operations_checksum(up: &[MigrationOp], down: &[MigrationOp]) -> Result<String> {
    let json = serde_json::to_vec(&(up, down))?;
    Ok(checksum(&json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(checksum(b"abc").len(), 64);
    }

    #[test]
    fn test_operations_checksum_covers_both_directions() {
        let up = vec![MigrationOp::raw("create table a (id integer)")];
        let down = vec![MigrationOp::drop_table("a")];
        let full = operations_checksum(&up, &down).unwrap();

        assert_eq!(full, operations_checksum(&up, &down).unwrap());
        assert_ne!(full, operations_checksum(&up, &[]).unwrap());
    }
}
