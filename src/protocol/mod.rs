//! Protocol definitions for panel communication.
//!
//! This module contains the wire-level types:
//! - Inbound frame decoding (`$<digits>#`)
//! - Outbound command encoding (`<digits>#`)

pub mod command;
pub mod frame;

pub use command::Command;
pub use frame::{END_MARKER, FrameDecoder, MAX_PAYLOAD_DIGITS, START_MARKER};
