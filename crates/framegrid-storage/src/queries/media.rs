// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Video, document, and photo metadata.

use framegrid_core::{DocumentMeta, GridError, PhotoRecord, VideoMeta};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn size_to_sql(size: Option<u64>) -> Option<i64> {
    size.and_then(|s| i64::try_from(s).ok())
}

pub async fn upsert_video(db: &Database, meta: &VideoMeta) -> Result<(), GridError> {
    let meta = meta.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO videos (unique_id, size, duration_secs, width, height, mime_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (unique_id) DO UPDATE SET
                     size = excluded.size,
                     duration_secs = excluded.duration_secs,
                     width = excluded.width,
                     height = excluded.height,
                     mime_type = excluded.mime_type,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    meta.content.unique_id,
                    size_to_sql(meta.size),
                    meta.duration_secs,
                    meta.width,
                    meta.height,
                    meta.mime_type,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_document(
    db: &Database,
    meta: &DocumentMeta,
    caption: Option<&str>,
) -> Result<(), GridError> {
    let meta = meta.clone();
    let caption = caption.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO documents (unique_id, size, file_name, mime_type, caption)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (unique_id) DO UPDATE SET
                     size = excluded.size,
                     file_name = excluded.file_name,
                     mime_type = excluded.mime_type,
                     caption = excluded.caption,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    meta.content.unique_id,
                    size_to_sql(meta.size),
                    meta.file_name,
                    meta.mime_type,
                    caption,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_photo(db: &Database, photo: &PhotoRecord) -> Result<(), GridError> {
    let photo = photo.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO photos (unique_id, size, width, height, phash)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (unique_id) DO UPDATE SET
                     size = excluded.size,
                     width = excluded.width,
                     height = excluded.height,
                     phash = excluded.phash,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    photo.unique_id,
                    size_to_sql(photo.size),
                    photo.width,
                    photo.height,
                    photo.phash,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_photo(db: &Database, unique_id: &str) -> Result<Option<PhotoRecord>, GridError> {
    let unique_id = unique_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<PhotoRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT unique_id, size, width, height, phash FROM photos WHERE unique_id = ?1",
                params![unique_id],
                |row| {
                    Ok(PhotoRecord {
                        unique_id: row.get(0)?,
                        size: row.get::<_, Option<i64>>(1)?.map(|s| s as u64),
                        width: row.get(2)?,
                        height: row.get(3)?,
                        phash: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use framegrid_core::ContentRef;

    use super::*;

    #[tokio::test]
    async fn photo_roundtrip_keeps_phash() {
        let db = Database::open_in_memory().await.unwrap();
        let photo = PhotoRecord {
            unique_id: "thumb".into(),
            size: Some(52_000),
            width: 1920,
            height: 1080,
            phash: Some("c3a1f0e0d8c4b2a1".into()),
        };
        upsert_photo(&db, &photo).await.unwrap();
        assert_eq!(get_photo(&db, "thumb").await.unwrap(), Some(photo));
    }

    #[tokio::test]
    async fn video_and_document_upserts_are_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let content = ContentRef {
            resource_id: "res".into(),
            unique_id: "vid".into(),
        };
        let video = VideoMeta {
            content: content.clone(),
            size: Some(1_000_000),
            duration_secs: 90,
            width: 640,
            height: 360,
            mime_type: Some("video/mp4".into()),
        };
        upsert_video(&db, &video).await.unwrap();
        upsert_video(&db, &video).await.unwrap();

        let doc = DocumentMeta {
            content,
            size: None,
            file_name: Some("clip.mkv".into()),
            mime_type: Some("video/x-matroska".into()),
        };
        upsert_document(&db, &doc, Some("holiday")).await.unwrap();
        upsert_document(&db, &doc, None).await.unwrap();

        let (videos, caption) = db
            .connection()
            .call(|conn| -> Result<(i64, Option<String>), rusqlite::Error> {
                let videos = conn.query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;
                let caption = conn.query_row(
                    "SELECT caption FROM documents WHERE unique_id = 'vid'",
                    [],
                    |r| r.get(0),
                )?;
                Ok((videos, caption))
            })
            .await
            .unwrap();
        assert_eq!(videos, 1);
        assert_eq!(caption, None);
    }
}
