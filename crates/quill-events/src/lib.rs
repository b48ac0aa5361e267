//! Quill Events - Envelopes and fan-out
//!
//! Every domain change is normalized into one envelope:
//!
//! ```text
//! { "type": ..., "action": ..., "data": {...}, "metadata": { "timestamp": ..., "channel": ... } }
//! ```
//!
//! Envelopes are built by one typed constructor per event kind and handed to
//! the [`Publisher`], which writes one channel-correct payload per
//! destination through a [`DeliveryTransport`].

pub mod event;
pub mod builders;
pub mod transport;
pub mod publisher;

pub use event::*;
pub use transport::*;
pub use publisher::*;
