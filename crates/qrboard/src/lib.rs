//! `qrboard` - dynamic content behind a permanent QR code
//!
//! The QR code always encodes the same visitor URL; what the visitor sees is
//! a title and message that an administrator can change at any time.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod qr;
pub mod render;
pub mod router;
pub mod server;
pub mod store;

pub use config::Config;
pub use content::ContentRecord;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use qr::QrEncoder;
pub use router::{route, ViewKind};
pub use server::AppState;
pub use store::{open_store, ContentStore, SharedStore, StoreBackend};
