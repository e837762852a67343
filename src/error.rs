// Error types surfaced by the codec core.

use thiserror::Error;

/// The two user-visible error kinds the codec core can raise.
///
/// An unsupported transport/address/adapter tag is not a variant here: an
/// unrecognized tag degrades silently to the `None` arm of the relevant
/// enum rather than failing, so it never reaches this type. See
/// [`crate::pdu::codec`] for where that degrade happens.
#[derive(Debug, Error)]
pub enum NCodecError {
    #[error("config error: {0}")]
    Config(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl NCodecError {
    pub fn config(msg: impl Into<String>) -> Self {
        NCodecError::Config(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        NCodecError::Decode(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NCodecError>;
