//! chatlens generation crate - the client side of the external reasoning
//! service.
//!
//! `GenerationService` is the seam; `GeminiClient` speaks the Gemini
//! `generateContent` API; `GenerationAdapter` bounds every call with a
//! timeout and never retries.

pub mod adapter;
pub mod error;
pub mod gemini;
pub mod request;

pub use adapter::{GenerationAdapter, GenerationService};
pub use error::{GenerationError, GenerationErrorKind};
pub use gemini::GeminiClient;
pub use request::GenerationRequest;
