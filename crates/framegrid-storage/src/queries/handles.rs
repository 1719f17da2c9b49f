// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account-scoped resource handles.

use std::str::FromStr;

use framegrid_core::{FileType, GridError, ResourceHandle};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Upserts on `(file_type, unique_id, account_name)`. A conflict refreshes
/// `resource_id` and keeps the original `created_at`.
pub async fn upsert(
    db: &Database,
    file_type: FileType,
    unique_id: &str,
    resource_id: &str,
    account_name: &str,
) -> Result<(), GridError> {
    let (unique_id, resource_id, account_name) = (
        unique_id.to_string(),
        resource_id.to_string(),
        account_name.to_string(),
    );
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO resource_handles (file_type, unique_id, resource_id, account_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (file_type, unique_id, account_name)
                 DO UPDATE SET resource_id = excluded.resource_id",
                params![file_type.to_string(), unique_id, resource_id, account_name],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All handles for `unique_id`, oldest first.
pub async fn list(
    db: &Database,
    file_type: FileType,
    unique_id: &str,
) -> Result<Vec<ResourceHandle>, GridError> {
    let unique_id = unique_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ResourceHandle>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT file_type, unique_id, resource_id, account_name, created_at
                 FROM resource_handles
                 WHERE file_type = ?1 AND unique_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![file_type.to_string(), unique_id], |row| {
                let kind: String = row.get(0)?;
                Ok(ResourceHandle {
                    file_type: FileType::from_str(&kind).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    unique_id: row.get(1)?,
                    resource_id: row.get(2)?,
                    account_name: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
