//! Store implementations.
//!
//! The broker only reads rooms, users and mapping edges and appends turns;
//! the records themselves are owned by the CRUD backend. The in-memory stores
//! are populated from a seed fixture at startup.

pub mod inmemory;

pub use inmemory::{
    AiSessionRecord, ChatRecord, InMemoryRelationshipStore, InMemoryRoomStore, InMemoryTurnStore,
    InMemoryUserDirectory,
};
