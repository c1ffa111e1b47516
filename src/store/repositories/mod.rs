//! Row-oriented repositories over the conversation store

pub mod chat;
pub mod message;
