// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound messages and updates.
//!
//! Attachments use `res-{unique_id}` as their resource id, so a test can
//! register the matching object on [`crate::MockTransport`] up front.

use framegrid_core::{
    Attachment, ContentRef, DocumentMeta, InboundMessage, SourceRef, Update, VideoMeta,
};

pub fn resource_id(unique_id: &str) -> String {
    format!("res-{unique_id}")
}

fn content(unique_id: &str) -> ContentRef {
    ContentRef {
        resource_id: resource_id(unique_id),
        unique_id: unique_id.to_string(),
    }
}

pub fn video_message(
    chat_id: i64,
    message_id: i32,
    unique_id: &str,
    duration_secs: u32,
) -> InboundMessage {
    InboundMessage {
        source: SourceRef {
            chat_id,
            message_id,
        },
        caption: None,
        attachment: Some(Attachment::Video(VideoMeta {
            content: content(unique_id),
            size: None,
            duration_secs,
            width: 1280,
            height: 720,
            mime_type: Some("video/mp4".to_string()),
        })),
    }
}

pub fn document_message(
    chat_id: i64,
    message_id: i32,
    unique_id: &str,
    mime_type: &str,
) -> InboundMessage {
    InboundMessage {
        source: SourceRef {
            chat_id,
            message_id,
        },
        caption: Some("fwd".to_string()),
        attachment: Some(Attachment::Document(DocumentMeta {
            content: content(unique_id),
            size: None,
            file_name: Some(format!("{unique_id}.bin")),
            mime_type: Some(mime_type.to_string()),
        })),
    }
}

/// A message with no attachment.
pub fn text_message(chat_id: i64, message_id: i32) -> InboundMessage {
    InboundMessage {
        source: SourceRef {
            chat_id,
            message_id,
        },
        caption: Some("hello".to_string()),
        attachment: None,
    }
}

pub fn update(offset: i64, message: InboundMessage) -> Update {
    Update {
        offset,
        message: Some(message),
    }
}
