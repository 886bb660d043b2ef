//! Chat Integration - webhook-driven bot interface
//!
//! This crate provides the chat surfaces for linkbot:
//! - **Wire** (`wire`) - decoding of webhook payloads posted to the events path
//! - **Runner** (`runner`) - event loop that dispatches each envelope on its own task
//! - **Events** (`events`) - slash commands, shortcuts, modal interactions, new messages
//! - **Service** (`service`) - the shorten flows behind each surface
//! - **Blocks** (`blocks`) - modal view builders for the shorten form
//!
//! # Architecture
//!
//! ```text
//! Webhook → mpsc queue → EventLoopRunner → EventDispatcher → ShortenChatService
//!                                                                       ↓
//!                                            ChatClient ← ShortenOrchestrator (linkbot-core)
//! ```
//!
//! # Key Types
//!
//! - `EventLoopRunner` - pumps queued envelopes into the dispatcher concurrently
//! - `EventDispatcher` - routes events to the handler registered for their type
//! - `ModalBuilder` - constructs modal views
//! - `ChatClient` - outbound calls to the chat platform

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod input;
pub mod runner;
pub mod service;
pub mod state;
pub mod wire;
