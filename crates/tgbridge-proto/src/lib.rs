//! IRC wire-protocol support for the Telegram IRC bridge.
//!
//! This crate carries the small slice of the IRC line protocol the bridge
//! actually speaks: CRLF line framing, space tokenization, CTCP ACTION
//! framing, and the numeric replies the bridge emits. It deliberately does
//! not try to be a general IRC library.

pub mod ctcp;
pub mod error;
pub mod line;
pub mod message;
pub mod response;

pub use error::ProtocolError;
pub use line::LineCodec;
pub use message::TokenLine;
pub use response::{Numeric, UserPrefix};
