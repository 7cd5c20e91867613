//! # Codec Error Types
//!
//! Everything that can go wrong while encoding or decoding a movement message.

use thiserror::Error;

/// Errors raised by the movement codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The payload ended before a field was complete.
    #[error("unexpected end of message at byte {position}")]
    UnexpectedEnd {
        /// Read position when the data ran out.
        position: usize,
    },

    /// The message does not fit in the MTU-sized buffer.
    #[error("message exceeds {capacity} bytes")]
    BufferFull {
        /// Buffer capacity.
        capacity: usize,
    },

    /// A varint used more than five bytes.
    #[error("varint longer than 32 bits")]
    VarintOverflow,

    /// Unknown force apply mode.
    #[error("invalid force apply mode: {0}")]
    InvalidForceMode(u8),

    /// Unknown force source type.
    #[error("invalid force source type: {0}")]
    InvalidSourceType(u8),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
