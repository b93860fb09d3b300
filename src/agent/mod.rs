//! Agent module for the horoscope agent
//!
//! This module contains the run loop, the conversation it maintains, and the
//! events it emits while answering a turn.

pub mod conversation;
pub mod core;
pub mod events;

pub use conversation::Conversation;
pub use self::core::{Agent, MessageSession};
pub use events::AgentEvent;
