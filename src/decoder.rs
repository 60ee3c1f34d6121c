//! Register decoder
//!
//! Turns a contiguous block of holding-register words into scaled sensor
//! readings. Decoding is pure: no I/O, no logging and no state kept between
//! calls, so the same block always yields the same readings.

use crate::error::{Result, SolarmanError};
use crate::sensor::{DeviceClass, SensorDescriptor, StateClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest value the decoder accumulates, in 16-bit words
pub const MAX_WORD_COUNT: u16 = 4;

/// Scaled value of a reading
///
/// Integral scale factors keep integral results exact; everything else is a
/// float. Both serialize as plain JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Integer(i64),
    Float(f64),
}

impl ReadingValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ReadingValue::Integer(v) => v as f64,
            ReadingValue::Float(v) => v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ReadingValue::Integer(v) => Some(v),
            ReadingValue::Float(_) => None,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValue::Integer(v) => write!(f, "{}", v),
            ReadingValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One decoded sensor value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedReading {
    pub name: String,
    pub value: ReadingValue,
    pub unit: Option<String>,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
}

/// A descriptor that could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub sensor: String,
    pub error: SolarmanError,
}

/// Outcome of a decode pass that keeps going past failing descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Successful readings, in catalog order
    pub readings: Vec<DecodedReading>,
    /// Failed descriptors, in catalog order
    pub failures: Vec<DecodeFailure>,
}

impl DecodeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Reading for a sensor name, if it decoded
    pub fn get(&self, name: &str) -> Option<&DecodedReading> {
        self.readings.iter().find(|r| r.name == name)
    }
}

/// Decode every descriptor, failing on the first one that cannot be decoded
///
/// `raw[0]` holds register `base_offset`. The block must cover every
/// descriptor: coverage is checked for all of them before any is decoded,
/// so a short block reports `OutOfRange` even when an earlier descriptor
/// would fail with `UnsupportedEncoding`. The output has exactly one reading
/// per descriptor, in the same order.
pub fn decode(
    raw: &[u16],
    base_offset: u16,
    descriptors: &[SensorDescriptor],
) -> Result<Vec<DecodedReading>> {
    for descriptor in descriptors {
        words_for(raw, base_offset, descriptor)?;
    }
    descriptors
        .iter()
        .map(|d| decode_one(raw, base_offset, d))
        .collect()
}

/// Decode every descriptor independently, collecting failures instead of
/// stopping at them
pub fn decode_partial(
    raw: &[u16],
    base_offset: u16,
    descriptors: &[SensorDescriptor],
) -> DecodeReport {
    let mut report = DecodeReport::default();
    for descriptor in descriptors {
        match decode_one(raw, base_offset, descriptor) {
            Ok(reading) => report.readings.push(reading),
            Err(error) => report.failures.push(DecodeFailure {
                sensor: descriptor.name.clone(),
                error,
            }),
        }
    }
    report
}

/// Decode a single descriptor
pub fn decode_one(
    raw: &[u16],
    base_offset: u16,
    descriptor: &SensorDescriptor,
) -> Result<DecodedReading> {
    let words = words_for(raw, base_offset, descriptor)?;
    let magnitude = magnitude(words, descriptor)?;
    Ok(DecodedReading {
        name: descriptor.name.clone(),
        value: apply_scale(magnitude, descriptor.scale),
        unit: descriptor.unit.clone(),
        device_class: descriptor.device_class,
        state_class: descriptor.state_class,
    })
}

fn words_for<'a>(
    raw: &'a [u16],
    base_offset: u16,
    descriptor: &SensorDescriptor,
) -> Result<&'a [u16]> {
    let width = usize::from(descriptor.word_count);
    let Some(start) = descriptor.register_offset.checked_sub(base_offset) else {
        return Err(SolarmanError::out_of_range(
            descriptor.name.clone(),
            descriptor.register_offset,
            width,
            0,
        ));
    };
    let start = usize::from(start);
    let end = start + width;
    raw.get(start..end).ok_or_else(|| {
        SolarmanError::out_of_range(
            descriptor.name.clone(),
            descriptor.register_offset,
            end,
            raw.len(),
        )
    })
}

fn magnitude(words: &[u16], descriptor: &SensorDescriptor) -> Result<i128> {
    match words {
        [word] if descriptor.signed => Ok(i128::from(*word as i16)),
        [word] => Ok(i128::from(*word)),
        _ if descriptor.signed || descriptor.word_count > MAX_WORD_COUNT => {
            Err(SolarmanError::unsupported_encoding(
                descriptor.name.clone(),
                descriptor.word_count,
                descriptor.signed,
            ))
        }
        _ => Ok(i128::from(combine_big_endian(words))),
    }
}

/// Combine words high word first: `sum(word[i] * 0x10000^(n-1-i))`
///
/// Callers keep `words.len() <= MAX_WORD_COUNT`.
pub fn combine_big_endian(words: &[u16]) -> u64 {
    words
        .iter()
        .fold(0u64, |acc, &w| (acc << 16) | u64::from(w))
}

fn apply_scale(magnitude: i128, scale: f64) -> ReadingValue {
    if scale.fract() == 0.0 {
        let exact = magnitude
            .checked_mul(scale as i128)
            .and_then(|v| i64::try_from(v).ok());
        if let Some(v) = exact {
            return ReadingValue::Integer(v);
        }
    }
    ReadingValue::Float(magnitude as f64 * scale)
}
