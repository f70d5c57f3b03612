//! Data Transfer Objects (DTOs) for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: frames exchanged over both socket transports
//! - `http`: HTTP API request/response bodies
//! - `conversion`: mapping between DTOs and domain types

pub mod conversion;
pub mod http;
pub mod websocket;
