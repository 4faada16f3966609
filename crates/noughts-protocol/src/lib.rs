//! Wire protocol for Noughts.
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Envelope`]): the typed
//!   events exchanged with the room server.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how envelopes become frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Room server / GameController
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientEvent, Envelope, Payload, Recipient, ServerEvent};
