//! Encoded image representation handed from ingestion to classification.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Png, MediaType::Jpeg, MediaType::Webp];

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Map a MIME type to a supported format. `image/jpg` is accepted as an
    /// alias; parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Map a file extension (without dot, any case) to a supported format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_mime(s).ok_or_else(|| s.to_string())
    }
}

/// Media type plus transport-ready base64 payload of an uploaded picture.
///
/// Fields are private so a value can only come from ingestion or a checked
/// data URL; it is never modified afterwards.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    media_type: MediaType,
    // Snapshots carry the image metadata only.
    #[serde(skip_serializing)]
    payload: String,
    byte_len: usize,
}

impl EncodedImage {
    /// Encode raw bytes. Callers are expected to have validated them.
    pub(crate) fn encode(media_type: MediaType, bytes: &[u8]) -> Self {
        Self {
            media_type,
            payload: BASE64_STANDARD.encode(bytes),
            byte_len: bytes.len(),
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Standard base64 payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Length of the decoded image in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Render as a `data:` URL suitable for display.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.payload)
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    ///
    /// The decoded bytes must carry a supported image signature; the stored
    /// type is the detected one. No size limit applies here, use
    /// [`ImageIngestor::ingest_data_url`](crate::ImageIngestor::ingest_data_url)
    /// for uploads.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (_, bytes) = decode_data_url(url)?;
        if bytes.is_empty() {
            return Err(Error::UnreadableInput("data URL payload is empty".to_string()));
        }
        let media_type = detect_media_type(&bytes)?;
        Ok(Self::encode(media_type, &bytes))
    }
}

/// Split a base64 data URL into its declared MIME type and decoded bytes.
pub(crate) fn decode_data_url(url: &str) -> Result<(&str, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::UnreadableInput("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::UnreadableInput("data URL has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::UnreadableInput("data URL is not base64".to_string()))?;
    if MediaType::from_mime(mime).is_none() {
        return Err(Error::UnreadableInput(format!(
            "unsupported media type '{}'",
            mime
        )));
    }
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|e| Error::UnreadableInput(format!("invalid base64 payload: {}", e)))?;
    Ok((mime, bytes))
}

/// Detect a supported image format from magic bytes.
pub(crate) fn detect_media_type(bytes: &[u8]) -> Result<MediaType> {
    match infer::get(bytes) {
        Some(kind) => MediaType::from_mime(kind.mime_type()).ok_or_else(|| {
            Error::UnreadableInput(format!(
                "unsupported format {}, expected PNG, JPEG or WEBP",
                kind.mime_type()
            ))
        }),
        None => Err(Error::UnreadableInput(
            "content is not a recognizable image".to_string(),
        )),
    }
}

// Payloads are large; keep them out of debug output and logs.
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("media_type", &self.media_type)
            .field("byte_len", &self.byte_len)
            .finish_non_exhaustive()
    }
}
