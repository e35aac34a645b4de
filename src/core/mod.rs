//! Core building blocks shared by every module: identifiers, category enums and
//! the event publisher.

pub mod events;
pub mod identifier;
pub mod types;

pub use identifier::Identifier;
