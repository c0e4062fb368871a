//! Intake Console - voice-enabled client for a medical onboarding service
//!
//! This library provides the conversation orchestration core:
//! - Session state machine (one in-flight request, server-driven transitions)
//! - Microphone capture and assistant speech playback
//! - Camera capture for document photos
//! - Append-only conversation log with generic extraction rendering
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Console                          │
//! │     text input │ /record │ /camera │ /attach        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                SessionController                     │
//! │  TurnState │ ConversationLog │ PendingUploads       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Session Service (HTTP)                  │
//! │   questions │ answers │ documents │ transcription   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod camera;
pub mod config;
pub mod console;
pub mod conversation;
pub mod error;
pub mod session;
pub mod voice;

pub use api::{HttpSessionClient, SessionApi};
pub use config::Config;
pub use console::Console;
pub use conversation::{ConversationLog, ExtractedDocument, Turn};
pub use error::{Error, Result};
pub use session::{Phase, SessionController, TurnState};
