//! Content generation for the Reverb engagement toolkit.
//!
//! [`ContentGenerator`] is the provider boundary: prompt, media, model and
//! credential in, text out. [`GeminiClient`] implements it over the Gemini
//! REST API. [`GuardedGenerator`] wraps any generator with the key pool,
//! rate limiter and call tracker from `reverb_rate_limit`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod gemini;
mod generator;
mod guarded;
mod request;

pub use config::GenerationConfig;
pub use gemini::{
    Blob, Candidate, Content, FileData, GEMINI_BASE_URL, GeminiClient, GeminiFile,
    GenerateContentRequest, GenerateContentResponse, Part, PromptFeedback, SafetyRating,
};
pub use generator::ContentGenerator;
pub use guarded::GuardedGenerator;
pub use request::{GenerationRequest, MediaAttachment, MediaKind};
