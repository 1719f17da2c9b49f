// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte-range reads from the Bot API file endpoint.

use framegrid_core::GridError;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use tracing::trace;

/// URL of a file previously resolved with `getFile`.
pub fn file_url(api_url: &str, token: &str, file_path: &str) -> String {
    format!("{}/file/bot{token}/{file_path}", api_url.trim_end_matches('/'))
}

/// Inclusive HTTP `Range` header value for `limit` bytes at `offset`.
pub fn range_header(offset: u64, limit: u64) -> String {
    format!("bytes={offset}-{}", offset + limit.max(1) - 1)
}

/// Fetches `[offset, offset + limit)` from `url`.
///
/// A 416 response means the offset is past the end and yields an empty chunk.
/// A server that ignores `Range` and answers 200 is accepted only for the
/// first chunk; past offset zero it is a transport error.
pub async fn fetch_range(
    client: &reqwest::Client,
    url: &str,
    offset: u64,
    limit: u64,
) -> Result<Vec<u8>, GridError> {
    let response = client
        .get(url)
        .header(RANGE, range_header(offset, limit))
        .send()
        .await
        .map_err(|e| GridError::Transport {
            message: format!("range request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    let status = response.status();
    if status == StatusCode::RANGE_NOT_SATISFIABLE {
        return Ok(Vec::new());
    }
    if !status.is_success() {
        return Err(GridError::transport(format!(
            "range request returned {status}"
        )));
    }

    let body = response.bytes().await.map_err(|e| GridError::Transport {
        message: format!("reading range body failed: {e}"),
        source: Some(Box::new(e)),
    })?;
    trace!(offset, len = body.len(), %status, "range response");
    window(status, &body, offset, limit)
}

fn window(
    status: StatusCode,
    body: &[u8],
    offset: u64,
    limit: u64,
) -> Result<Vec<u8>, GridError> {
    if status != StatusCode::PARTIAL_CONTENT && offset > 0 {
        return Err(GridError::transport(format!(
            "range request at offset {offset} returned {status} instead of 206"
        )));
    }
    let take = body.len().min(limit as usize);
    Ok(body[..take].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_is_inclusive() {
        assert_eq!(range_header(0, 131_072), "bytes=0-131071");
        assert_eq!(range_header(131_072, 131_072), "bytes=131072-262143");
    }

    #[test]
    fn file_url_joins_without_double_slash() {
        assert_eq!(
            file_url("https://api.telegram.org/", "1:abc", "videos/file_3.mp4"),
            "https://api.telegram.org/file/bot1:abc/videos/file_3.mp4"
        );
    }

    #[test]
    fn partial_content_is_capped_at_the_limit() {
        let body: Vec<u8> = (0u8..10).collect();
        assert_eq!(
            window(StatusCode::PARTIAL_CONTENT, &body, 4096, 3).unwrap(),
            vec![0, 1, 2]
        );
        assert_eq!(
            window(StatusCode::PARTIAL_CONTENT, &body, 4096, 64).unwrap(),
            body
        );
    }

    #[test]
    fn full_body_is_accepted_only_at_offset_zero() {
        let body: Vec<u8> = (0u8..10).collect();
        assert_eq!(window(StatusCode::OK, &body, 0, 4).unwrap(), vec![0, 1, 2, 3]);

        let err = window(StatusCode::OK, &body, 4, 4).unwrap_err();
        assert!(matches!(err, GridError::Transport { .. }));
        assert!(err.to_string().contains("offset 4"));
    }
}
