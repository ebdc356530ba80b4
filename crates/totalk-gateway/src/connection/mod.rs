//! Connection management
//!
//! Sessions own one WebSocket each; hubs own the session handles and fan
//! messages out to them.

mod error;
mod handle;
mod hub;
mod rooms;
mod session;

pub use error::SessionError;
pub use handle::{SessionHandle, SessionShared, SessionState};
pub use hub::{BroadcastReport, Hub, SendOutcome};
pub use rooms::ChatRooms;
pub use session::{read_loop, write_loop, Session};
