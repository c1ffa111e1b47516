//! Signed-in user session

pub mod session;

pub use session::{Session, UserIdentity};
