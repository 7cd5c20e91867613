//! # Quantization
//!
//! Reduces precision where acceptable.
//!
//! Angles travel as `round(degrees * 1000)` in a zigzag varint: about 0.001°
//! of precision in three bytes for any facing in `[0, 360)`.

use locomote_shared::{Spatial, Vec2, Vec3, ANGLE_COMPRESSION_SCALE};

use super::error::CodecResult;
use super::serialization::{MessageReader, MessageWriter};

/// Quantizes an angle in degrees.
#[inline]
#[must_use]
pub fn compress_angle(degrees: f32) -> i32 {
    (degrees * ANGLE_COMPRESSION_SCALE).round() as i32
}

/// Restores a quantized angle.
#[inline]
#[must_use]
pub fn decompress_angle(compressed: i32) -> f32 {
    compressed as f32 / ANGLE_COMPRESSION_SCALE
}

/// Writes a compressed angle.
#[inline]
pub fn write_angle(writer: &mut MessageWriter, degrees: f32) -> CodecResult<()> {
    writer.write_signed_varint(compress_angle(degrees))
}

/// Reads a compressed angle.
#[inline]
pub fn read_angle(reader: &mut MessageReader<'_>) -> CodecResult<f32> {
    Ok(decompress_angle(reader.read_signed_varint()?))
}

/// Position and facing encoding for one dimensionality.
pub trait WireSpatial: Spatial {
    /// Writes a position (3 or 2 f32).
    fn write_position(self, writer: &mut MessageWriter) -> CodecResult<()>;

    /// Reads a position.
    fn read_position(reader: &mut MessageReader<'_>) -> CodecResult<Self>;

    /// Writes a facing as a compressed angle.
    fn write_facing(facing: Self::Facing, writer: &mut MessageWriter) -> CodecResult<()> {
        write_angle(writer, Self::facing_angle(facing))
    }

    /// Reads a compressed-angle facing.
    fn read_facing(reader: &mut MessageReader<'_>) -> CodecResult<Self::Facing> {
        Ok(Self::facing_from_angle(read_angle(reader)?))
    }
}

impl WireSpatial for Vec3 {
    fn write_position(self, writer: &mut MessageWriter) -> CodecResult<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)
    }

    fn read_position(reader: &mut MessageReader<'_>) -> CodecResult<Self> {
        Ok(Vec3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?))
    }
}

impl WireSpatial for Vec2 {
    fn write_position(self, writer: &mut MessageWriter) -> CodecResult<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)
    }

    fn read_position(reader: &mut MessageReader<'_>) -> CodecResult<Self> {
        Ok(Vec2::new(reader.read_f32()?, reader.read_f32()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_angle_round_trip_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let angle: f32 = rng.gen_range(0.0..360.0);
            let restored = decompress_angle(compress_angle(angle));
            assert!((restored - angle).abs() <= 0.001, "{angle} -> {restored}");
        }
    }

    #[test]
    fn test_angle_wire_size() {
        let mut writer = MessageWriter::new();
        write_angle(&mut writer, 359.999).unwrap();
        assert_eq!(writer.len(), 3);
        let mut reader = MessageReader::new(writer.as_slice());
        assert!((read_angle(&mut reader).unwrap() - 359.999).abs() <= 0.001);
    }

    #[test]
    fn test_direction_2d_travels_as_angle() {
        let facing = Vec2::new(0.0, -1.0);
        let mut writer = MessageWriter::new();
        Vec2::write_facing(facing, &mut writer).unwrap();
        let mut reader = MessageReader::new(writer.as_slice());
        let restored = Vec2::read_facing(&mut reader).unwrap();
        assert!(restored.x.abs() < 1e-4);
        assert!((restored.y + 1.0).abs() < 1e-4);
    }
}
