//! # Movement Messages
//!
//! Message layouts (all numeric fields little-endian):
//!
//! ```text
//! INPUT  (owner client → server, server-authoritative entities)
//! ┌────────────┬───────────────┬──────────────┬────────────────┬──────────────┐
//! │ mask u8    │ state varint  │ extra u8     │ position       │ facing       │
//! │            │               │ unless STOP  │ if POS_CHANGED │ if ROT_CHG.  │
//! └────────────┴───────────────┴──────────────┴────────────────┴──────────────┘
//!
//! STATE  (either direction)
//! ┌───────────────┬──────────┬──────────┬────────┬─────────────────────────────┐
//! │ state varint  │ extra u8 │ position │ facing │ forces (server → client):   │
//! │               │          │          │        │ count varint + entries      │
//! └───────────────┴──────────┴──────────┴────────┴─────────────────────────────┘
//!
//! FORCE ENTRY
//! ┌─────────┬────────────┬───────────┬─────────────────┬────────────────────────┐
//! │ mode u8 │ dir 3×f32  │ source u8 │ id, level varint│ speed, decel, duration,│
//! │         │            │           │ unless None     │ elapsed: 4×half        │
//! └─────────┴────────────┴───────────┴─────────────────┴────────────────────────┘
//! ```

use locomote_shared::{ExtraMovementState, MovementState, Spatial, Vec3};

use super::compression::WireSpatial;
use super::error::{CodecError, CodecResult};
use super::serialization::{MessageReader, MessageWriter};
use crate::force::{ForceApplier, ForceApplyMode, ForceSource, ForceSourceType};
use crate::input::{EntityMovementInput, EntityMovementInputState};

/// Which kind of movement message a payload holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Owner client input (server-authoritative entities).
    ClientInput,
    /// Owner client state (client-authoritative entities).
    ClientState,
    /// Server state.
    ServerState,
}

/// An encoded message ready for the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message kind.
    pub kind: MessageKind,
    /// Sender clock in milliseconds.
    pub timestamp: u32,
    /// Encoded payload.
    pub payload: Vec<u8>,
    /// Must be delivered on the reliable channel.
    pub reliable: bool,
}

/// Decoded input message. Absent fields were unchanged on the sender.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputMessage<S: Spatial> {
    /// Differential mask.
    pub input_state: EntityMovementInputState,
    /// Movement flags.
    pub movement_state: MovementState,
    /// Extra state, absent when stopped.
    pub extra_movement_state: Option<ExtraMovementState>,
    /// Direction or destination, absent when unchanged.
    pub position: Option<S>,
    /// Facing, absent when unchanged.
    pub facing: Option<S::Facing>,
}

impl<S: WireSpatial> InputMessage<S> {
    /// Selects the fields of `input` named by `input_state`.
    #[must_use]
    pub fn from_input(input: &EntityMovementInput<S>, input_state: EntityMovementInputState) -> Self {
        Self {
            input_state,
            movement_state: input.movement_state,
            extra_movement_state: (!input_state.contains(EntityMovementInputState::IS_STOPPED))
                .then_some(input.extra_movement_state),
            position: input_state
                .contains(EntityMovementInputState::POSITION_CHANGED)
                .then_some(input.position),
            facing: input_state
                .contains(EntityMovementInputState::ROTATION_CHANGED)
                .then_some(input.facing),
        }
    }

    /// Fills absent fields from the previously received input.
    #[must_use]
    pub fn merge_into(&self, previous: &EntityMovementInput<S>) -> EntityMovementInput<S> {
        EntityMovementInput {
            movement_state: self.movement_state,
            extra_movement_state: self
                .extra_movement_state
                .unwrap_or(previous.extra_movement_state),
            position: self.position.unwrap_or(previous.position),
            facing: self.facing.unwrap_or(previous.facing),
            is_key_movement: self.input_state.contains(EntityMovementInputState::IS_KEY_MOVEMENT),
            is_stopped: self.input_state.contains(EntityMovementInputState::IS_STOPPED),
        }
    }

    /// Encodes the message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BufferFull`] if the message does not fit.
    pub fn encode(&self, writer: &mut MessageWriter) -> CodecResult<()> {
        writer.write_u8(self.input_state.bits())?;
        writer.write_varint(self.movement_state.bits())?;
        if !self.input_state.contains(EntityMovementInputState::IS_STOPPED) {
            let extra = self.extra_movement_state.unwrap_or_default();
            writer.write_u8(extra.as_u8())?;
        }
        if self.input_state.contains(EntityMovementInputState::POSITION_CHANGED) {
            self.position.unwrap_or(S::ZERO).write_position(writer)?;
        }
        if self.input_state.contains(EntityMovementInputState::ROTATION_CHANGED) {
            let facing = self.facing.unwrap_or_else(S::default_facing);
            S::write_facing(facing, writer)?;
        }
        Ok(())
    }

    /// Decodes a message.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for truncated or malformed payloads.
    pub fn decode(reader: &mut MessageReader<'_>) -> CodecResult<Self> {
        let input_state = EntityMovementInputState::from_bits_truncate(reader.read_u8()?);
        let movement_state = MovementState::from_bits_truncate(reader.read_varint()?);
        let extra_movement_state = if input_state.contains(EntityMovementInputState::IS_STOPPED) {
            None
        } else {
            Some(ExtraMovementState::from_u8(reader.read_u8()?))
        };
        let position = if input_state.contains(EntityMovementInputState::POSITION_CHANGED) {
            Some(S::read_position(reader)?)
        } else {
            None
        };
        let facing = if input_state.contains(EntityMovementInputState::ROTATION_CHANGED) {
            Some(S::read_facing(reader)?)
        } else {
            None
        };
        Ok(Self {
            input_state,
            movement_state,
            extra_movement_state,
            position,
            facing,
        })
    }
}

/// Decoded state message.
#[derive(Clone, Debug, PartialEq)]
pub struct StateMessage<S: Spatial> {
    /// Movement flags.
    pub movement_state: MovementState,
    /// Extra state.
    pub extra_movement_state: ExtraMovementState,
    /// Position.
    pub position: S,
    /// Facing.
    pub facing: S::Facing,
    /// Active forces (server → client only).
    pub forces: Vec<ForceApplier>,
}

impl<S: WireSpatial> StateMessage<S> {
    /// Encodes the message; `with_forces` for server → client messages.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BufferFull`] if the message does not fit.
    pub fn encode(&self, writer: &mut MessageWriter, with_forces: bool) -> CodecResult<()> {
        writer.write_varint(self.movement_state.bits())?;
        writer.write_u8(self.extra_movement_state.as_u8())?;
        self.position.write_position(writer)?;
        S::write_facing(self.facing, writer)?;
        if with_forces {
            encode_forces(writer, &self.forces)?;
        }
        Ok(())
    }

    /// Decodes a message; `with_forces` for server → client messages.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for truncated or malformed payloads.
    pub fn decode(reader: &mut MessageReader<'_>, with_forces: bool) -> CodecResult<Self> {
        let movement_state = MovementState::from_bits_truncate(reader.read_varint()?);
        let extra_movement_state = ExtraMovementState::from_u8(reader.read_u8()?);
        let position = S::read_position(reader)?;
        let facing = S::read_facing(reader)?;
        let forces = if with_forces {
            decode_forces(reader)?
        } else {
            Vec::new()
        };
        Ok(Self {
            movement_state,
            extra_movement_state,
            position,
            facing,
            forces,
        })
    }
}

/// Writes a length-prefixed force list.
///
/// # Errors
///
/// Returns [`CodecError::BufferFull`] if the list does not fit.
pub fn encode_forces(writer: &mut MessageWriter, forces: &[ForceApplier]) -> CodecResult<()> {
    writer.write_varint(forces.len() as u32)?;
    for force in forces {
        encode_force(writer, force)?;
    }
    Ok(())
}

/// Reads a length-prefixed force list.
///
/// # Errors
///
/// Returns a [`CodecError`] for truncated or malformed entries.
pub fn decode_forces(reader: &mut MessageReader<'_>) -> CodecResult<Vec<ForceApplier>> {
    let count = reader.read_varint()? as usize;
    let mut forces = Vec::with_capacity(count.min(reader.remaining() / MIN_FORCE_ENTRY_SIZE));
    for _ in 0..count {
        forces.push(decode_force(reader)?);
    }
    Ok(forces)
}

/// Smallest possible encoded force entry.
const MIN_FORCE_ENTRY_SIZE: usize = 1 + 12 + 1 + 8;

fn encode_force(writer: &mut MessageWriter, force: &ForceApplier) -> CodecResult<()> {
    writer.write_u8(force.mode as u8)?;
    force.direction.write_position(writer)?;
    writer.write_u8(force.source.source_type as u8)?;
    if force.source.source_type != ForceSourceType::None {
        writer.write_varint(force.source.data_id)?;
        writer.write_varint(force.source.level)?;
    }
    writer.write_half(force.current_speed)?;
    writer.write_half(force.deceleration)?;
    writer.write_half(force.duration)?;
    writer.write_half(force.elapsed)
}

fn decode_force(reader: &mut MessageReader<'_>) -> CodecResult<ForceApplier> {
    let raw_mode = reader.read_u8()?;
    let mode = ForceApplyMode::from_u8(raw_mode).ok_or(CodecError::InvalidForceMode(raw_mode))?;
    let direction = Vec3::read_position(reader)?;
    let raw_source = reader.read_u8()?;
    let source_type =
        ForceSourceType::from_u8(raw_source).ok_or(CodecError::InvalidSourceType(raw_source))?;
    let source = if source_type == ForceSourceType::None {
        ForceSource::NONE
    } else {
        ForceSource::new(source_type, reader.read_varint()?, reader.read_varint()?)
    };
    let current_speed = reader.read_half()?;
    let deceleration = reader.read_half()?;
    let duration = reader.read_half()?;
    let mut elapsed = reader.read_half()?;
    if duration > 0.0 {
        elapsed = elapsed.min(duration);
    }
    Ok(ForceApplier {
        mode,
        direction,
        source,
        current_speed,
        deceleration,
        duration,
        elapsed,
    })
}
