//! Upload ingestion: size limit, format detection, base64 encoding.
//!
//! Validation order matters:
//! 1. Size limit, before any decoding or encoding work
//! 2. Magic byte detection (authoritative over the declared type)
//! 3. Encoding

use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::defaults::MAX_UPLOAD_SIZE_BYTES;
use crate::error::{Error, Result};
use crate::image::{decode_data_url, detect_media_type, EncodedImage, MediaType};

/// Turns raw upload bytes into an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageIngestor {
    max_size_bytes: u64,
}

impl Default for ImageIngestor {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_SIZE_BYTES)
    }
}

impl ImageIngestor {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Validate and encode an in-memory upload.
    ///
    /// `declared_media_type` is what the client claimed. The stored type is
    /// always the one detected from the bytes.
    #[instrument(skip(self, bytes), fields(subsystem = "ingest", op = "ingest", size_bytes = bytes.len()))]
    pub fn ingest(&self, bytes: &[u8], declared_media_type: &str) -> Result<EncodedImage> {
        self.check_size(bytes.len() as u64)?;

        if bytes.is_empty() {
            return Err(Error::UnreadableInput("upload is empty".to_string()));
        }

        let media_type = detect_media_type(bytes)?;
        match MediaType::from_mime(declared_media_type) {
            Some(declared) if declared == media_type => {}
            _ => debug!(
                declared = declared_media_type,
                detected = %media_type,
                "Declared media type differs from content, using detected type"
            ),
        }

        Ok(EncodedImage::encode(media_type, bytes))
    }

    /// Validate and encode an image file.
    ///
    /// The size limit is checked against file metadata before the file is
    /// read. The file handle is closed before this returns.
    pub fn ingest_file(&self, path: &Path) -> Result<EncodedImage> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            Error::UnreadableInput(format!("cannot stat {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(Error::UnreadableInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        self.check_size(metadata.len())?;

        let bytes = std::fs::read(path).map_err(|e| {
            Error::UnreadableInput(format!("cannot read {}: {}", path.display(), e))
        })?;

        let declared = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::from_extension)
            .map(|m| m.mime_type())
            .unwrap_or("application/octet-stream");

        self.ingest(&bytes, declared)
    }

    /// Validate and encode a `data:<mime>;base64,<payload>` upload.
    ///
    /// The payload is decoded and goes through the same checks as
    /// [`ingest`](Self::ingest).
    pub fn ingest_data_url(&self, url: &str) -> Result<EncodedImage> {
        let (declared, bytes) = decode_data_url(url)?;
        self.ingest(&bytes, declared)
    }

    /// Apply the size limit to an image that was encoded elsewhere.
    pub fn check_encoded(&self, image: &EncodedImage) -> Result<()> {
        self.check_size(image.byte_len() as u64)
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_size_bytes {
            warn!(
                size_bytes = size,
                limit = self.max_size_bytes,
                "Upload rejected: size limit exceeded"
            );
            return Err(Error::SizeExceeded {
                size,
                limit: self.max_size_bytes,
            });
        }
        Ok(())
    }
}
