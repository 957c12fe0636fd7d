//! Gemini REST client.
//!
//! Images travel inline as base64. Videos go through the Files API: upload,
//! poll until `ACTIVE`, reference by URI, delete afterwards.

mod client;
mod dto;

pub use client::{GEMINI_BASE_URL, GeminiClient};
pub use dto::{
    Blob, Candidate, Content, FileData, GeminiFile, GenerateContentRequest,
    GenerateContentResponse, Part, PromptFeedback, SafetyRating,
};
