//! Wire encoding for [`EffectContext`].
//!
//! Layout:
//!
//! ```text
//! [u8 wire major][u16 LE body length][u32 LE rep bits][present fields...]
//! ```
//!
//! The body is everything after the three header bytes. Each rep bit marks a
//! flag or an optional field; present fields follow in bit order, each encoded
//! with bincode.
//!
//! | Bit | Meaning                |
//! |-----|------------------------|
//! | 0   | blocked                |
//! | 1   | critical               |
//! | 2   | successful debuff      |
//! | 3   | debuff damage (f32)    |
//! | 4   | debuff duration (f32)  |
//! | 5   | debuff frequency (f32) |
//! | 6   | damage type (u8)       |
//! | 7   | death impulse (3×f32)  |
//! | 8   | knockback (3×f32)      |
//! | 9   | debuff chance (f32)    |

use aura_common::{AuraError, SchemaVersion};
use glam::Vec3;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::effect::EffectContext;
use crate::tags::DamageType;

/// Wire major version; matches [`SchemaVersion::EFFECT_CONTEXT`].
pub const WIRE_MAJOR: u8 = 1;

const HEADER_LEN: usize = 3;

const BIT_BLOCKED: u32 = 1 << 0;
const BIT_CRITICAL: u32 = 1 << 1;
const BIT_DEBUFF: u32 = 1 << 2;
const BIT_DEBUFF_DAMAGE: u32 = 1 << 3;
const BIT_DEBUFF_DURATION: u32 = 1 << 4;
const BIT_DEBUFF_FREQUENCY: u32 = 1 << 5;
const BIT_DAMAGE_TYPE: u32 = 1 << 6;
const BIT_DEATH_IMPULSE: u32 = 1 << 7;
const BIT_KNOCKBACK: u32 = 1 << 8;
const BIT_DEBUFF_CHANCE: u32 = 1 << 9;
const KNOWN_BITS: u32 = (1 << 10) - 1;

/// Errors produced while decoding a context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended early
    #[error("truncated input: needed {needed} bytes, had {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },
    /// Declared body length disagrees with the data
    #[error("length mismatch: header says {declared} bytes, found {actual}")]
    LengthMismatch {
        /// Length from the header
        declared: usize,
        /// Actual length
        actual: usize,
    },
    /// Wire major version not understood
    #[error("unknown wire version {0}")]
    UnknownVersion(u8),
    /// A field failed to encode or decode
    #[error("malformed field {field}: {reason}")]
    MalformedField {
        /// Field name
        field: &'static str,
        /// What went wrong
        reason: String,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

impl From<CodecError> for AuraError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownVersion(v) => Self::VersionMismatch {
                expected: SchemaVersion::EFFECT_CONTEXT.to_string(),
                actual: v.to_string(),
            },
            other => Self::Serialization(other.to_string()),
        }
    }
}

fn put<T: Serialize>(buf: &mut Vec<u8>, field: &'static str, value: &T) -> CodecResult<()> {
    bincode::serialize_into(buf, value).map_err(|e| CodecError::MalformedField {
        field,
        reason: e.to_string(),
    })
}

fn take<T: DeserializeOwned>(reader: &mut &[u8], field: &'static str) -> CodecResult<T> {
    bincode::deserialize_from(reader).map_err(|e| CodecError::MalformedField {
        field,
        reason: e.to_string(),
    })
}

impl EffectContext {
    /// Encodes the context.
    pub fn to_wire(&self) -> CodecResult<Vec<u8>> {
        let mut bits = 0u32;
        let mut fields = Vec::new();

        if self.is_blocked {
            bits |= BIT_BLOCKED;
        }
        if self.is_critical {
            bits |= BIT_CRITICAL;
        }
        if self.is_successful_debuff {
            bits |= BIT_DEBUFF;
        }
        if self.debuff.damage > 0.0 {
            bits |= BIT_DEBUFF_DAMAGE;
            put(&mut fields, "debuff_damage", &self.debuff.damage)?;
        }
        if self.debuff.duration > 0.0 {
            bits |= BIT_DEBUFF_DURATION;
            put(&mut fields, "debuff_duration", &self.debuff.duration)?;
        }
        if self.debuff.frequency > 0.0 {
            bits |= BIT_DEBUFF_FREQUENCY;
            put(&mut fields, "debuff_frequency", &self.debuff.frequency)?;
        }
        if let Some(damage_type) = self.damage_type {
            bits |= BIT_DAMAGE_TYPE;
            put(&mut fields, "damage_type", &damage_type.index())?;
        }
        if self.death_impulse != Vec3::ZERO {
            bits |= BIT_DEATH_IMPULSE;
            put(&mut fields, "death_impulse", &self.death_impulse.to_array())?;
        }
        if self.knockback != Vec3::ZERO {
            bits |= BIT_KNOCKBACK;
            put(&mut fields, "knockback", &self.knockback.to_array())?;
        }
        if self.debuff.chance > 0.0 {
            bits |= BIT_DEBUFF_CHANCE;
            put(&mut fields, "debuff_chance", &self.debuff.chance)?;
        }

        let body_len = 4 + fields.len();
        let declared = u16::try_from(body_len).map_err(|_| CodecError::MalformedField {
            field: "body",
            reason: format!("{body_len} bytes exceeds u16"),
        })?;

        let mut out = Vec::with_capacity(HEADER_LEN + body_len);
        out.push(WIRE_MAJOR);
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&fields);
        Ok(out)
    }

    /// Decodes a context produced by [`EffectContext::to_wire`].
    pub fn from_wire(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_LEN + 4 {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN + 4,
                available: bytes.len(),
            });
        }
        if bytes[0] != WIRE_MAJOR {
            return Err(CodecError::UnknownVersion(bytes[0]));
        }

        let declared = usize::from(u16::from_le_bytes([bytes[1], bytes[2]]));
        let body = &bytes[HEADER_LEN..];
        if body.len() != declared {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: body.len(),
            });
        }

        let bits = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
        if bits & !KNOWN_BITS != 0 {
            return Err(CodecError::MalformedField {
                field: "rep_bits",
                reason: format!("unknown bits {:#x}", bits & !KNOWN_BITS),
            });
        }

        let mut reader = &body[4..];
        let mut context = Self {
            is_blocked: bits & BIT_BLOCKED != 0,
            is_critical: bits & BIT_CRITICAL != 0,
            is_successful_debuff: bits & BIT_DEBUFF != 0,
            ..Self::default()
        };

        if bits & BIT_DEBUFF_DAMAGE != 0 {
            context.debuff.damage = take(&mut reader, "debuff_damage")?;
        }
        if bits & BIT_DEBUFF_DURATION != 0 {
            context.debuff.duration = take(&mut reader, "debuff_duration")?;
        }
        if bits & BIT_DEBUFF_FREQUENCY != 0 {
            context.debuff.frequency = take(&mut reader, "debuff_frequency")?;
        }
        if bits & BIT_DAMAGE_TYPE != 0 {
            let index: u8 = take(&mut reader, "damage_type")?;
            context.damage_type =
                Some(DamageType::from_index(index).ok_or_else(|| CodecError::MalformedField {
                    field: "damage_type",
                    reason: format!("unknown index {index}"),
                })?);
        }
        if bits & BIT_DEATH_IMPULSE != 0 {
            let v: [f32; 3] = take(&mut reader, "death_impulse")?;
            context.death_impulse = Vec3::from_array(v);
        }
        if bits & BIT_KNOCKBACK != 0 {
            let v: [f32; 3] = take(&mut reader, "knockback")?;
            context.knockback = Vec3::from_array(v);
        }
        if bits & BIT_DEBUFF_CHANCE != 0 {
            context.debuff.chance = take(&mut reader, "debuff_chance")?;
        }

        if !reader.is_empty() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: declared - reader.len(),
            });
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::DebuffParams;

    fn full_context() -> EffectContext {
        EffectContext {
            damage_type: Some(DamageType::Lightning),
            debuff: DebuffParams {
                chance: 20.0,
                damage: 5.0,
                duration: 4.0,
                frequency: 1.0,
            },
            death_impulse: Vec3::new(1.0, 2.0, 3.0),
            knockback: Vec3::new(-4.0, 0.0, 4.0),
            is_blocked: true,
            is_critical: false,
            is_successful_debuff: true,
        }
    }

    #[test]
    fn test_wire_major_matches_schema() {
        assert_eq!(u16::from(WIRE_MAJOR), SchemaVersion::EFFECT_CONTEXT.major);
    }

    #[test]
    fn test_empty_context_layout() {
        let bytes = EffectContext::default().to_wire().expect("encode");
        assert_eq!(bytes, vec![WIRE_MAJOR, 4, 0, 0, 0, 0, 0]);
        assert_eq!(EffectContext::from_wire(&bytes).expect("decode"), EffectContext::default());
    }

    #[test]
    fn test_bit_order_is_stable() {
        let context = EffectContext {
            is_critical: true,
            debuff: DebuffParams {
                damage: 2.0,
                ..DebuffParams::default()
            },
            damage_type: Some(DamageType::Physical),
            ..EffectContext::default()
        };
        let bytes = context.to_wire().expect("encode");
        let bits = u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]);
        assert_eq!(bits, BIT_CRITICAL | BIT_DEBUFF_DAMAGE | BIT_DAMAGE_TYPE);
        // f32 debuff damage, then the damage type index
        assert_eq!(&bytes[7..11], &2.0f32.to_le_bytes());
        assert_eq!(bytes[11], DamageType::Physical.index());
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_full_context_survives_the_wire() {
        let context = full_context();
        let decoded = EffectContext::from_wire(&context.to_wire().expect("encode")).expect("decode");
        assert_eq!(decoded, context);
    }

    #[test]
    fn test_decode_errors() {
        let bytes = full_context().to_wire().expect("encode");

        assert!(matches!(
            EffectContext::from_wire(&bytes[..5]),
            Err(CodecError::Truncated { .. })
        ));
        assert!(matches!(
            EffectContext::from_wire(&bytes[..bytes.len() - 1]),
            Err(CodecError::LengthMismatch { .. })
        ));

        let mut wrong_version = bytes.clone();
        wrong_version[0] = 9;
        assert_eq!(
            EffectContext::from_wire(&wrong_version),
            Err(CodecError::UnknownVersion(9))
        );

        let mut bad_type = EffectContext {
            damage_type: Some(DamageType::Fire),
            ..EffectContext::default()
        }
        .to_wire()
        .expect("encode");
        let last = bad_type.len() - 1;
        bad_type[last] = 77;
        assert!(matches!(
            EffectContext::from_wire(&bad_type),
            Err(CodecError::MalformedField { field: "damage_type", .. })
        ));
    }

    #[test]
    fn test_codec_error_into_aura_error() {
        let err: AuraError = CodecError::UnknownVersion(3).into();
        assert!(matches!(err, AuraError::VersionMismatch { .. }));
    }
}
