//! Core types and configuration for newschat
//!
//! This crate provides the conversation data model, session-id persistence,
//! configuration, and logging bootstrap used by the other newschat crates.

pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod session;

pub use conversation::{ContextItem, ConversationState, Message, Sender};
pub use error::{Error, Result};
pub use session::{FileSessionStore, SessionId, SessionStore};
