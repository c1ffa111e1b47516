//! Chat view state

pub mod handoff;
pub mod view;

pub use handoff::{start_chat, ChatHandoff};
pub use view::{ChatView, ChatViewError};
