//! Real-time room broker for clinic chats and AI interview sessions.
//!
//! Authenticated connections join a room (a doctor-patient chat or a patient's
//! AI interview session) after entity resolution and an access check against
//! the relationship graph. Chat messages are relayed to the other members;
//! AI utterances drive a per-session interview state machine.

pub mod config;

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
