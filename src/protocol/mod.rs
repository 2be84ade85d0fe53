//! Topic protocol and message codec.
pub mod codec;
pub mod messages;
pub mod topics;

pub use codec::{decode, decode_or_log, encode, CodecError, WireMessage};
pub use messages::{
    AlertMessage, ControlMessage, IssueMessage, LifecycleMessage, MovingStateMessage, NegligenceMessage, SyncMessage, Telemetry,
};
pub use topics::Signal;
