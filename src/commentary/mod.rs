//! Match commentary generation.
//!
//! A batch of actions and its match context are serialized into a prompt,
//! sent to a chat-completion endpoint, and the reply is normalized into one
//! [`CommentaryLine`] per action. Unusable model output degrades to a
//! synthesized batch rather than an error.

pub mod aliases;
pub mod client;
pub mod envelope;
pub mod fallback;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod reconcile;
pub mod request;
pub mod serialize;
pub mod service;

pub use client::{CompletionBackend, HttpCompletionClient};
pub use envelope::CompletionEnvelope;
pub use models::{ActionEvent, CommentaryLine, CommentaryStyle, MatchContext, Prompt, Tone};
pub use parse::ParseError;
pub use reconcile::ReconcilePolicy;
pub use request::CommentaryRequest;
pub use service::{CommentarySource, CommentaryService, GeneratedCommentary};
