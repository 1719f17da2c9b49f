// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job admission, claiming, and state transitions.

use std::str::FromStr;
use std::time::Duration;

use framegrid_core::{
    AdmitOutcome, AdmitRequest, ContentRef, FileType, GridError, Job, JobCounts, JobState,
    SourceRef,
};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err, storage_msg};

const JOB_COLUMNS: &str = "id, unique_id, resource_id, file_type, owner_account, state, \
     scheduled_at, started_at, finished_at, retry_count, chat_id, message_id, \
     result_handle, last_error";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let file_type: String = row.get(3)?;
    let state: String = row.get(5)?;
    Ok(Job {
        id: row.get(0)?,
        content: ContentRef {
            unique_id: row.get(1)?,
            resource_id: row.get(2)?,
        },
        file_type: FileType::from_str(&file_type).map_err(|e| bad_text(3, e))?,
        owner_account: row.get(4)?,
        state: JobState::from_str(&state).map_err(|e| bad_text(5, e))?,
        scheduled_at: row.get(6)?,
        started_at: row.get(7)?,
        finished_at: row.get(8)?,
        retry_count: row.get(9)?,
        source: SourceRef {
            chat_id: row.get(10)?,
            message_id: row.get(11)?,
        },
        result_handle: row.get(12)?,
        last_error: row.get(13)?,
    })
}

fn bad_text(column: usize, e: strum::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Inserts a job or re-arms the existing row for the same unique id.
///
/// A row that is currently processing only has its retry count bumped: the
/// active claim stays exclusive and the grid still replies to the message
/// that was claimed. Every other state goes back to pending with a fresh
/// `scheduled_at` and the new source. Rows whose retry count already reached
/// `max_retries` are left untouched.
pub async fn upsert_job(
    db: &Database,
    request: &AdmitRequest,
    max_retries: u32,
) -> Result<AdmitOutcome, GridError> {
    let req = request.clone();
    db.connection()
        .call(move |conn| -> Result<AdmitOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let existing: Option<(i64, u32, String)> = tx
                .query_row(
                    "SELECT id, retry_count, state FROM jobs WHERE unique_id = ?1",
                    params![req.content.unique_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let outcome = match existing {
                None => {
                    tx.execute(
                        "INSERT INTO jobs (unique_id, resource_id, file_type, owner_account,
                                           chat_id, message_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            req.content.unique_id,
                            req.content.resource_id,
                            req.file_type.to_string(),
                            req.owner_account,
                            req.source.chat_id,
                            req.source.message_id,
                        ],
                    )?;
                    AdmitOutcome::Inserted {
                        job_id: tx.last_insert_rowid(),
                    }
                }
                Some((job_id, retry_count, _)) if retry_count >= max_retries => {
                    AdmitOutcome::RetryLimitReached {
                        job_id,
                        retry_count,
                    }
                }
                Some((job_id, retry_count, state)) if state == "processing" => {
                    tx.execute(
                        "UPDATE jobs SET retry_count = retry_count + 1 WHERE id = ?1",
                        params![job_id],
                    )?;
                    AdmitOutcome::InProgress {
                        job_id,
                        retry_count: retry_count + 1,
                    }
                }
                Some((job_id, retry_count, _)) => {
                    tx.execute(
                        &format!(
                            "UPDATE jobs SET
                                 state = 'pending',
                                 started_at = NULL,
                                 finished_at = NULL,
                                 result_handle = NULL,
                                 last_error = NULL,
                                 scheduled_at = {NOW},
                                 retry_count = retry_count + 1,
                                 resource_id = ?2,
                                 owner_account = ?3,
                                 chat_id = ?4,
                                 message_id = ?5
                             WHERE id = ?1",
                            NOW = super::NOW
                        ),
                        params![
                            job_id,
                            req.content.resource_id,
                            req.owner_account,
                            req.source.chat_id,
                            req.source.message_id,
                        ],
                    )?;
                    AdmitOutcome::Rearmed {
                        job_id,
                        retry_count: retry_count + 1,
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Moves the oldest pending job to processing in one statement.
///
/// Returns `None` when nothing is pending. The single writer thread executes
/// the select and update as one unit, so concurrent callers never share a row.
pub async fn claim_next(db: &Database) -> Result<Option<Job>, GridError> {
    let sql = format!(
        "UPDATE jobs SET state = 'processing', started_at = {NOW}
         WHERE id = (SELECT id FROM jobs WHERE state = 'pending'
                     ORDER BY scheduled_at ASC, id ASC LIMIT 1)
         RETURNING {JOB_COLUMNS}",
        NOW = super::NOW
    );
    db.connection()
        .call(move |conn| -> Result<Option<Job>, rusqlite::Error> {
            conn.query_row(&sql, [], job_from_row).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Runs a `processing -> target` transition, failing if the job is not
/// currently processing.
async fn finish_processing(
    db: &Database,
    job_id: i64,
    target: JobState,
    result_handle: Option<String>,
    last_error: Option<String>,
) -> Result<(), GridError> {
    let sql = format!(
        "UPDATE jobs SET state = ?2, finished_at = {NOW}, result_handle = ?3, last_error = ?4
         WHERE id = ?1 AND state = 'processing'",
        NOW = super::NOW
    );
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                &sql,
                params![job_id, target.to_string(), result_handle, last_error],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(storage_msg(format!(
            "job {job_id} cannot move to {target}: it is not processing"
        )));
    }
    Ok(())
}

pub async fn complete(db: &Database, job_id: i64, result_handle: &str) -> Result<(), GridError> {
    finish_processing(db, job_id, JobState::Done, Some(result_handle.to_string()), None).await
}

/// Marks the job failed. The row and its retry count are kept.
pub async fn fail(db: &Database, job_id: i64, reason: &str) -> Result<(), GridError> {
    finish_processing(db, job_id, JobState::Failed, None, Some(reason.to_string())).await
}

/// Returns a processing job to pending. The retry count is unchanged.
pub async fn release(db: &Database, job_id: i64) -> Result<(), GridError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE jobs SET state = 'pending', started_at = NULL
                 WHERE id = ?1 AND state = 'processing'",
                params![job_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(storage_msg(format!(
            "job {job_id} cannot be released: it is not processing"
        )));
    }
    Ok(())
}

/// Resets processing jobs whose `started_at` is older than `older_than`.
pub async fn reclaim_stale(db: &Database, older_than: Duration) -> Result<u64, GridError> {
    let modifier = format!("-{} seconds", older_than.as_secs());
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE jobs SET state = 'pending', started_at = NULL
                 WHERE state = 'processing'
                   AND started_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                params![modifier],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, job_id: i64) -> Result<Option<Job>, GridError> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<Job>, rusqlite::Error> {
            conn.query_row(&sql, params![job_id], job_from_row).optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn counts(db: &Database) -> Result<JobCounts, GridError> {
    db.connection()
        .call(|conn| -> Result<JobCounts, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = JobCounts::default();
            for row in rows {
                let (state, n) = row?;
                let n = n as u64;
                match state.as_str() {
                    "pending" => counts.pending = n,
                    "processing" => counts.processing = n,
                    "done" => counts.done = n,
                    "failed" => counts.failed = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
