//! Wire protocol
//!
//! Outbound frames are JSON envelopes `{"type": ..., "payload": ...}`; the
//! notification channel also accepts a few client commands in the same shape.

mod close_codes;
mod messages;

pub use close_codes::CloseCode;
pub use messages::{ClientCommand, Envelope};
