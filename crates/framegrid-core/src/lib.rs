// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the framegrid keyframe-grid pipeline.
//!
//! Provides the domain types, the [`GridError`] taxonomy, and the collaborator
//! traits that the storage, transport, and media crates implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::GridError;
pub use types::{
    AccountContext, AdapterType, AdmitOutcome, AdmitRequest, Attachment, ContentIdentity,
    ContentRef, Cursor, DedupRecord, DocumentMeta, DownloadSource, FileType, HealthStatus,
    InboundMessage, Job, JobCounts, JobState, PhotoRecord, ResourceHandle, SentFile, SentPhoto,
    SourceRef, Update, VideoMeta,
};

pub use traits::{
    ArchivePackager, ContentBypass, FrameSource, JobStore, LabelRenderer, PluginAdapter,
    TransportClient,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::types::{DEFAULT_CHUNK_SIZE, is_valid_chunk_size};

    #[test]
    fn default_chunk_size_satisfies_transfer_rules() {
        assert!(is_valid_chunk_size(DEFAULT_CHUNK_SIZE));
        assert!(is_valid_chunk_size(4096));
        assert!(is_valid_chunk_size(1024 * 1024));
    }

    #[test]
    fn chunk_size_rejects_off_granule_and_non_divisors() {
        assert!(!is_valid_chunk_size(0));
        assert!(!is_valid_chunk_size(1000));
        // multiple of 4096 but 1 MiB is not divisible by 12288
        assert!(!is_valid_chunk_size(3 * 4096));
        assert!(!is_valid_chunk_size(2 * 1024 * 1024));
    }

    #[test]
    fn job_state_strings_match_store_values() {
        for (state, s) in [
            (JobState::Pending, "pending"),
            (JobState::Processing, "processing"),
            (JobState::Done, "done"),
            (JobState::Failed, "failed"),
        ] {
            assert_eq!(state.to_string(), s);
            assert_eq!(JobState::from_str(s).unwrap(), state);
        }
        assert!(JobState::Done.is_terminal());
        assert!(!JobState::Processing.is_terminal());
    }

    #[test]
    fn file_type_serializes_lowercase() {
        let json = serde_json::to_string(&FileType::Document).unwrap();
        assert_eq!(json, "\"document\"");
        assert_eq!(FileType::from_str("video").unwrap(), FileType::Video);
    }

    #[test]
    fn video_documents_are_detected_by_mime() {
        let mut doc = DocumentMeta {
            content: ContentRef {
                resource_id: "r".into(),
                unique_id: "u".into(),
            },
            size: Some(10),
            file_name: Some("clip.mp4".into()),
            mime_type: Some("video/mp4".into()),
        };
        assert!(doc.is_video());
        doc.mime_type = Some("application/pdf".into());
        assert!(!doc.is_video());
        doc.mime_type = None;
        assert!(!doc.is_video());
    }

    #[test]
    fn admit_outcome_exposes_job_id() {
        assert_eq!(AdmitOutcome::Inserted { job_id: 4 }.job_id(), 4);
        assert_eq!(
            AdmitOutcome::RetryLimitReached {
                job_id: 9,
                retry_count: 5
            }
            .job_id(),
            9
        );
    }

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(GridError::transport("timeout").is_transient());
        assert!(!GridError::media("bad frame").is_transient());
        assert!(
            !GridError::DimensionMismatch {
                index: 1,
                expected: (2, 2),
                found: (3, 3)
            }
            .is_transient()
        );
        assert!(!GridError::Cancelled.is_transient());
    }

    #[test]
    fn dimension_mismatch_message_names_the_frame() {
        let err = GridError::DimensionMismatch {
            index: 4,
            expected: (640, 360),
            found: (320, 180),
        };
        assert_eq!(err.to_string(), "frame 4 is 320x180, expected 640x360");
    }

    #[test]
    fn all_collaborator_traits_are_exported() {
        fn _assert_transport<T: TransportClient>() {}
        fn _assert_store<T: JobStore>() {}
        fn _assert_frames<T: FrameSource>() {}
        fn _assert_label<T: LabelRenderer>() {}
        fn _assert_archive<T: ArchivePackager>() {}
        fn _assert_bypass<T: ContentBypass>() {}
        fn _assert_object_safe(_: &dyn JobStore, _: &dyn TransportClient) {}
    }
}
