// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API transport for framegrid.
//!
//! Implements [`TransportClient`] with teloxide for polling and publishing.
//! Binary content is read in byte ranges from the file endpoint with reqwest,
//! so downloads resume at any chunk boundary.

pub mod convert;
pub mod download;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use framegrid_config::model::TelegramConfig;
use framegrid_core::{
    AccountContext, AdapterType, DownloadSource, GridError, HealthStatus, InboundMessage,
    PluginAdapter, SentFile, SentPhoto, SourceRef, TransportClient, Update,
};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Message, MessageId, ReplyParameters};
use tracing::{debug, info};

/// One Bot API session.
pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
    config: TelegramConfig,
    token: String,
    /// `getFile` results by resource id: remote path and size.
    files: Mutex<HashMap<String, (String, u64)>>,
    /// Messages seen while polling, for `get_message`.
    seen: Mutex<HashMap<(i64, i32), InboundMessage>>,
}

impl TelegramTransport {
    /// Builds a transport. Requires `telegram.bot_token`.
    pub fn new(config: TelegramConfig) -> Result<Self, GridError> {
        let token = config
            .bot_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GridError::Config("telegram.bot_token is required".into()))?;

        let api_url = reqwest::Url::parse(&config.api_url)
            .map_err(|e| GridError::Config(format!("telegram.api_url is invalid: {e}")))?;
        let bot = Bot::new(&token).set_api_url(api_url);

        Ok(Self {
            bot,
            http: reqwest::Client::new(),
            config,
            token,
            files: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves and caches the remote path and size of a file.
    async fn resolve_file(&self, resource_id: &str) -> Result<(String, u64), GridError> {
        if let Some(hit) = self.files.lock().ok().and_then(|m| m.get(resource_id).cloned()) {
            return Ok(hit);
        }
        let file = self
            .bot
            .get_file(FileId(resource_id.to_string()))
            .await
            .map_err(|e| transport_err("resolve file", e))?;
        let entry = (file.path.clone(), u64::from(file.meta.size));
        if let Ok(mut files) = self.files.lock() {
            files.insert(resource_id.to_string(), entry.clone());
        }
        debug!(resource_id, path = %entry.0, size = entry.1, "resolved file");
        Ok(entry)
    }

    fn remember(&self, messages: &[InboundMessage]) {
        if let Ok(mut seen) = self.seen.lock() {
            for msg in messages {
                seen.insert((msg.source.chat_id, msg.source.message_id), msg.clone());
            }
        }
    }
}

fn transport_err(action: &str, e: RequestError) -> GridError {
    GridError::Transport {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Network failures stay retryable; API rejections of an upload do not.
fn publish_err(action: &str, e: RequestError) -> GridError {
    match e {
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_) => {
            transport_err(action, e)
        }
        other => GridError::Publish {
            message: format!("failed to {action}: {other}"),
            source: Some(Box::new(other)),
        },
    }
}

fn reply(reply_to: Option<i32>) -> Option<ReplyParameters> {
    reply_to.map(|id| ReplyParameters::new(MessageId(id)))
}

fn sent_photo(msg: &Message) -> Result<SentPhoto, GridError> {
    let largest = msg
        .photo()
        .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height))
        .ok_or_else(|| GridError::Publish {
            message: "photo reply carried no photo sizes".into(),
            source: None,
        })?;
    Ok(SentPhoto {
        resource_id: largest.file.id.to_string(),
        unique_id: largest.file.unique_id.to_string(),
        size: Some(u64::from(largest.file.size)),
        width: largest.width,
        height: largest.height,
    })
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Bot API unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        if let Ok(mut files) = self.files.lock() {
            files.clear();
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.clear();
        }
        debug!("telegram transport shut down");
        Ok(())
    }
}

#[async_trait]
impl TransportClient for TelegramTransport {
    async fn identity(&self) -> Result<AccountContext, GridError> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| transport_err("resolve bot identity", e))?;
        let name = me
            .user
            .username
            .clone()
            .unwrap_or_else(|| me.user.first_name.clone());
        let id = i64::try_from(me.user.id.0)
            .map_err(|_| GridError::Internal(format!("bot id {} overflows", me.user.id.0)))?;
        info!(account = %name, id, "resolved bot identity");
        Ok(AccountContext { name, id })
    }

    async fn fetch_updates_since(
        &self,
        offset: i64,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<Update>, GridError> {
        let offset = i32::try_from(offset)
            .map_err(|_| GridError::Internal(format!("update offset {offset} out of range")))?;
        let raw = self
            .bot
            .get_updates()
            .offset(offset)
            .limit(limit.clamp(1, 100) as u8)
            .timeout(timeout.as_secs() as u32)
            .await
            .map_err(|e| transport_err("fetch updates", e))?;

        let updates: Vec<Update> = raw.iter().map(convert::to_update).collect();
        let messages: Vec<InboundMessage> =
            updates.iter().filter_map(|u| u.message.clone()).collect();
        self.remember(&messages);
        Ok(updates)
    }

    async fn get_message(&self, source: SourceRef) -> Result<InboundMessage, GridError> {
        // The Bot API has no lookup by id; only messages polled by this
        // session can be returned.
        self.seen
            .lock()
            .ok()
            .and_then(|seen| seen.get(&(source.chat_id, source.message_id)).cloned())
            .ok_or_else(|| {
                GridError::Internal(format!(
                    "message {}/{} was not observed by this session",
                    source.chat_id, source.message_id
                ))
            })
    }

    async fn source_size(&self, source: &DownloadSource) -> Result<u64, GridError> {
        if let Some(size) = source.size_hint {
            return Ok(size);
        }
        Ok(self.resolve_file(&source.content.resource_id).await?.1)
    }

    async fn download_chunk(
        &self,
        source: &DownloadSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, GridError> {
        let (path, _) = self.resolve_file(&source.content.resource_id).await?;
        let url = download::file_url(&self.config.api_url, &self.token, &path);
        download::fetch_range(&self.http, &url, offset, limit).await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_path: &Path,
        reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError> {
        let mut request = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::file(image_path.to_path_buf()));
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        let msg = request.await.map_err(|e| publish_err("send photo", e))?;
        sent_photo(&msg)
    }

    async fn send_photo_by_handle(
        &self,
        chat_id: i64,
        resource_id: &str,
        caption: Option<&str>,
        reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError> {
        let mut request = self.bot.send_photo(
            ChatId(chat_id),
            InputFile::file_id(FileId(resource_id.to_string())),
        );
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        let msg = request
            .await
            .map_err(|e| publish_err("resend photo", e))?;
        sent_photo(&msg)
    }

    async fn send_file(
        &self,
        chat_id: i64,
        file_path: &Path,
        reply_to: Option<i32>,
        caption: Option<&str>,
    ) -> Result<SentFile, GridError> {
        let mut request = self
            .bot
            .send_document(ChatId(chat_id), InputFile::file(file_path.to_path_buf()));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        let msg = request
            .await
            .map_err(|e| publish_err("send document", e))?;
        let doc = msg.document().ok_or_else(|| GridError::Publish {
            message: "document reply carried no document".into(),
            source: None,
        })?;
        Ok(SentFile {
            resource_id: doc.file.id.to_string(),
            unique_id: doc.file.unique_id.to_string(),
            message_id: msg.id.0,
        })
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), GridError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        request.await.map_err(|e| publish_err("send text", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramTransport::new(config(None)).is_err());
        assert!(TelegramTransport::new(config(Some("  "))).is_err());
    }

    #[test]
    fn new_rejects_bad_api_url() {
        let mut cfg = config(Some("123:abc"));
        cfg.api_url = "not a url".into();
        assert!(matches!(
            TelegramTransport::new(cfg),
            Err(GridError::Config(_))
        ));
    }

    #[test]
    fn adapter_metadata() {
        let transport = TelegramTransport::new(config(Some("123:abc"))).unwrap();
        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.adapter_type(), AdapterType::Transport);
    }

    #[tokio::test]
    async fn get_message_serves_polled_messages_only() {
        let transport = TelegramTransport::new(config(Some("123:abc"))).unwrap();
        let msg = InboundMessage {
            source: SourceRef {
                chat_id: 5,
                message_id: 9,
            },
            caption: None,
            attachment: None,
        };
        transport.remember(std::slice::from_ref(&msg));

        assert_eq!(transport.get_message(msg.source).await.unwrap(), msg);
        let missing = SourceRef {
            chat_id: 5,
            message_id: 10,
        };
        assert!(transport.get_message(missing).await.is_err());
    }

    #[tokio::test]
    async fn size_hint_skips_the_api() {
        let transport = TelegramTransport::new(config(Some("123:abc"))).unwrap();
        let source = DownloadSource {
            content: framegrid_core::ContentRef {
                resource_id: "r".into(),
                unique_id: "u".into(),
            },
            origin: SourceRef {
                chat_id: 1,
                message_id: 1,
            },
            size_hint: Some(4096),
        };
        assert_eq!(transport.source_size(&source).await.unwrap(), 4096);
    }
}
