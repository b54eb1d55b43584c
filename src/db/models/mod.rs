//! Database models split into domain-specific modules.

pub mod booking;
pub mod bookmark;
pub mod club;
pub mod common;
pub mod event;
pub mod user;

pub use booking::*;
pub use bookmark::*;
pub use club::*;
pub use common::*;
pub use event::*;
pub use user::*;
