//! # Movement Protocol
//!
//! Binary encoding of movement messages.
//!
//! ## Design Principles
//!
//! 1. **Differential input**: input messages carry only what changed
//! 2. **MTU-safe**: every message fits in 1200 bytes
//! 3. **Quantized angles**: facing travels as a compressed varint
//! 4. **Half-float forces**: force parameters use 2 bytes each
//!
//! Both message shapes exist in a 3D (`Vec3` + y-angle) and a 2D
//! (`Vec2` + direction) variant through [`WireSpatial`].

pub mod compression;
pub mod error;
pub mod messages;
pub mod serialization;

pub use compression::{compress_angle, decompress_angle, WireSpatial};
pub use error::{CodecError, CodecResult};
pub use messages::{InputMessage, MessageKind, OutboundMessage, StateMessage};
pub use serialization::{MessageReader, MessageWriter};
