//! dmseat - seat and display provisioning for an X display manager
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │          Runtime (config, retry)         │
//! ├──────────────────────────────────────────┤
//! │  LocalSeat          RemoteSessionSeat    │
//! │      ↓                     ↓             │
//! │  LocalDisplayServer RemoteDisplayServer  │
//! │              ↘         ↙                 │
//! │                Display                   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! A seat turns "this user session needs a display" into a [`Display`]
//! bound to a server handle. The only thing that differs between seat
//! variants is how the handle is produced.

pub mod allocator;
pub mod authority;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod runtime;
pub mod seat;
pub mod server;
pub mod session;
pub mod signals;

pub use authority::{Authority, AuthorityFamily};
pub use display::{Display, DisplayId};
pub use error::{Result, SeatError};
pub use seat::{LocalSeat, LocalSeatSettings, RemoteSessionSeat, Seat, SeatEvent};
pub use server::{DisplayServer, LocalDisplayServer, RemoteDisplayServer, ServerKind};
pub use session::RemoteSession;
