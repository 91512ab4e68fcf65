//! Multipart upload types

use serde::{Deserialize, Serialize};

/// In-memory file handed to `upload_file`.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self { file_name: file_name.into(), content_type: content_type.into(), bytes }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Snapshot passed to upload progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    /// Whole percent in `0..=100`
    pub percentage: u8,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            u8::try_from(loaded.min(total).saturating_mul(100) / total).unwrap_or(100)
        };
        Self { loaded, total, percentage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_rounded_down_and_clamped() {
        assert_eq!(UploadProgress::new(0, 200).percentage, 0);
        assert_eq!(UploadProgress::new(199, 200).percentage, 99);
        assert_eq!(UploadProgress::new(300, 200).percentage, 100);
        assert_eq!(UploadProgress::new(0, 0).percentage, 100);
    }
}
