// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from teloxide updates to framegrid domain types.

use framegrid_core::{
    Attachment, ContentRef, DocumentMeta, InboundMessage, SourceRef, Update, VideoMeta,
};
use teloxide::types::{FileMeta, Message, UpdateKind};

fn content_ref(file: &FileMeta) -> ContentRef {
    ContentRef {
        resource_id: file.id.to_string(),
        unique_id: file.unique_id.to_string(),
    }
}

/// Converts a polled update. Non-message updates keep their offset and carry
/// no message.
pub fn to_update(update: &teloxide::types::Update) -> Update {
    let message = match &update.kind {
        UpdateKind::Message(msg) | UpdateKind::ChannelPost(msg) => Some(to_inbound(msg)),
        _ => None,
    };
    Update {
        offset: i64::from(update.id.0),
        message,
    }
}

/// Extracts the source reference, caption, and any video or document
/// attachment from a message.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let attachment = if let Some(video) = msg.video() {
        Some(Attachment::Video(VideoMeta {
            content: content_ref(&video.file),
            size: Some(u64::from(video.file.size)),
            duration_secs: video.duration.seconds(),
            width: video.width,
            height: video.height,
            mime_type: video.mime_type.as_ref().map(|m| m.to_string()),
        }))
    } else {
        msg.document().map(|doc| {
            Attachment::Document(DocumentMeta {
                content: content_ref(&doc.file),
                size: Some(u64::from(doc.file.size)),
                file_name: doc.file_name.clone(),
                mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            })
        })
    };

    InboundMessage {
        source: SourceRef {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        },
        caption: msg.caption().map(str::to_string),
        attachment,
    }
}
