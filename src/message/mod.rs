//! Line-JSON wire protocol spoken with streaming child processes
//!
//! - [`parser`] - inbound lines to [`InboundEvent`]
//! - [`outbound`] - user turns to outbound lines

pub mod outbound;
pub mod parser;

pub use outbound::{user_turn_line, with_instructions};
pub use parser::{InboundEvent, classify, content_text, parse_line};
