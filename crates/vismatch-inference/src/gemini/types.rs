//! Gemini `generateContent` request and response types.
//!
//! Request types borrow from the encoded image so the base64 payload is not
//! copied before serialization.

use serde::{Deserialize, Serialize};

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    pub system_instruction: SystemInstruction<'a>,
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationConfig,
}

/// System instruction carrying the constrained-output prompt.
#[derive(Debug, Serialize)]
pub struct SystemInstruction<'a> {
    pub parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TextPart<'a> {
    pub text: &'a str,
}

/// One conversation turn.
#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub role: &'static str,
    pub parts: Vec<InlineDataPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataPart<'a> {
    pub inline_data: InlineData<'a>,
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    /// Single-image request asking for a JSON-only answer.
    pub fn image_json(instruction: &'a str, mime_type: &'a str, data: &'a str) -> Self {
        Self {
            system_instruction: SystemInstruction {
                parts: vec![TextPart { text: instruction }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![InlineDataPart {
                    inline_data: InlineData { mime_type, data },
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        }
    }
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Response from `generateContent`. Every level is optional so a partial
/// body still decodes and the missing piece can be reported precisely.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, if present and non-empty.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Error body returned by the Gemini API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiError,
}

#[derive(Debug, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
