//! Infrastructure layer: implementations of the domain interfaces and wire formats.

pub mod auth;
pub mod codec;
pub mod dto;
pub mod generator;
pub mod message_pusher;
pub mod repository;
pub mod seed;
