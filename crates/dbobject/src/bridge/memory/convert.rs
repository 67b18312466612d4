// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar conversions between native tags and stored engine values.
//!
//! Every scalar is stored in the engine type's canonical form: NUMBER as
//! decimal text, native numbers as their own width, everything else as
//! received. Reads convert back to the requested tag.

use super::codes;
use crate::bridge::{BridgeError, EngineType, NativeData, NativeTag, Payload};
use crate::config::DECIMAL_BUFFER_WIDTH;

pub(super) type Outcome<T> = std::result::Result<T, BridgeError>;

fn not_implemented(engine: EngineType, tag: NativeTag) -> BridgeError {
    BridgeError::new(
        codes::CONVERSION,
        format!(
            "conversion between engine type {} and native type {} is not implemented",
            engine, tag
        ),
    )
}

fn payload_mismatch(tag: NativeTag, payload: &Payload) -> BridgeError {
    BridgeError::new(
        codes::PAYLOAD_MISMATCH,
        format!("payload {:?} does not match native type {}", payload, tag),
    )
}

fn out_of_range(text: &str, tag: NativeTag) -> BridgeError {
    BridgeError::new(
        codes::OUT_OF_RANGE,
        format!("value {} out of range for native type {}", text, tag),
    )
}

/// Canonical decimal text, or `None` if `text` is not a finite number.
fn canonical_decimal(text: &str) -> Option<String> {
    let text = text.trim();
    let valid = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    match text.parse::<f64>() {
        Ok(v) if valid && v.is_finite() => Some(text.trim_start_matches('+').to_string()),
        _ => None,
    }
}

/// Plain decimal text of a float, or its exponent form when the plain text
/// does not fit the decimal width.
fn float_decimal(plain: String, exponent: impl FnOnce() -> String) -> String {
    if plain.len() <= DECIMAL_BUFFER_WIDTH {
        plain
    } else {
        exponent()
    }
}

/// Convert a non-null incoming value to the stored form of `engine`.
pub(super) fn store(
    engine: EngineType,
    size: u32,
    tag: NativeTag,
    data: &NativeData,
) -> Outcome<Payload> {
    let payload = &data.payload;
    let stored = match (engine, tag) {
        (e, NativeTag::Bytes) if e.is_character() || e == EngineType::Raw => {
            let Payload::Bytes(buf) = payload else {
                return Err(payload_mismatch(tag, payload));
            };
            if size > 0 && buf.len() > size as usize {
                return Err(BridgeError::new(
                    codes::VALUE_TOO_LARGE,
                    format!(
                        "value too large for {} (actual: {}, maximum: {})",
                        engine,
                        buf.len(),
                        size
                    ),
                ));
            }
            Payload::Bytes(buf.clone())
        }
        (EngineType::Number, _) => {
            let text = match (tag, payload) {
                (NativeTag::Int64, Payload::Int64(v)) => v.to_string(),
                (NativeTag::Uint64, Payload::Uint64(v)) => v.to_string(),
                (NativeTag::Float, Payload::Float(v)) if v.is_finite() => {
                    float_decimal(v.to_string(), || format!("{:e}", v))
                }
                (NativeTag::Double, Payload::Double(v)) if v.is_finite() => {
                    float_decimal(v.to_string(), || format!("{:e}", v))
                }
                (NativeTag::Bytes, Payload::Bytes(buf)) => std::str::from_utf8(buf)
                    .ok()
                    .and_then(canonical_decimal)
                    .ok_or_else(|| {
                        BridgeError::new(
                            codes::INVALID_NUMBER,
                            format!("invalid number {:?}", String::from_utf8_lossy(buf)),
                        )
                    })?,
                (NativeTag::Float | NativeTag::Double, _) => {
                    return Err(BridgeError::new(
                        codes::INVALID_NUMBER,
                        "NUMBER cannot hold a non-finite value",
                    ))
                }
                (NativeTag::Int64 | NativeTag::Uint64, _) => {
                    return Err(payload_mismatch(tag, payload))
                }
                _ => return Err(not_implemented(engine, tag)),
            };
            // Every stored NUMBER must be readable into a decimal buffer.
            if text.len() > DECIMAL_BUFFER_WIDTH {
                return Err(out_of_range(&text, tag));
            }
            Payload::Bytes(text.into_bytes())
        }
        (EngineType::NativeInt, NativeTag::Int64) => match payload {
            Payload::Int64(v) => Payload::Int64(*v),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (EngineType::NativeInt, NativeTag::Uint64) => match payload {
            Payload::Uint64(v) => Payload::Int64(
                i64::try_from(*v).map_err(|_| out_of_range(&v.to_string(), NativeTag::Int64))?,
            ),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (EngineType::NativeFloat, NativeTag::Float | NativeTag::Double) => match payload {
            Payload::Float(v) => Payload::Float(*v),
            Payload::Double(v) => Payload::Float(*v as f32),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (EngineType::NativeDouble, NativeTag::Float | NativeTag::Double) => match payload {
            Payload::Float(v) => Payload::Double(f64::from(*v)),
            Payload::Double(v) => Payload::Double(*v),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (
            EngineType::Date | EngineType::Timestamp | EngineType::TimestampTz,
            NativeTag::Timestamp,
        ) => match payload {
            Payload::Timestamp(t) => Payload::Timestamp(*t),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (EngineType::IntervalDs, NativeTag::IntervalDs) => match payload {
            Payload::IntervalDs(d) => Payload::IntervalDs(*d),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        (EngineType::Boolean, NativeTag::Boolean) => match payload {
            Payload::Boolean(b) => Payload::Boolean(*b),
            _ => return Err(payload_mismatch(tag, payload)),
        },
        _ => return Err(not_implemented(engine, tag)),
    };
    Ok(stored)
}

/// Convert a non-null stored value of `engine` to `tag` into `out`.
///
/// NUMBER read as bytes writes into the caller's buffer, which must be at
/// least as long as the decimal text.
pub(super) fn load(
    engine: EngineType,
    tag: NativeTag,
    stored: &Payload,
    out: &mut NativeData,
) -> Outcome<()> {
    let loaded = match (engine, tag, stored) {
        (EngineType::Number, NativeTag::Bytes, Payload::Bytes(text)) => {
            let Payload::Bytes(buf) = &mut out.payload else {
                return Err(buffer_too_small(0, text.len()));
            };
            if buf.len() < text.len() {
                return Err(buffer_too_small(buf.len(), text.len()));
            }
            buf.clear();
            buf.extend_from_slice(text);
            out.is_null = false;
            return Ok(());
        }
        (EngineType::Number, _, Payload::Bytes(text)) => {
            let text = String::from_utf8_lossy(text);
            number_as(&text, tag).ok_or_else(|| match tag {
                NativeTag::Int64 | NativeTag::Uint64 => out_of_range(&text, tag),
                _ => not_implemented(engine, tag),
            })?
        }
        (_, NativeTag::Bytes, Payload::Bytes(buf)) => {
            out.set_bytes(buf);
            return Ok(());
        }
        (EngineType::NativeInt, NativeTag::Int64, Payload::Int64(v)) => Payload::Int64(*v),
        (EngineType::NativeInt, NativeTag::Uint64, Payload::Int64(v)) => Payload::Uint64(
            u64::try_from(*v).map_err(|_| out_of_range(&v.to_string(), tag))?,
        ),
        (EngineType::NativeFloat, NativeTag::Float, Payload::Float(v)) => Payload::Float(*v),
        (EngineType::NativeFloat, NativeTag::Double, Payload::Float(v)) => {
            Payload::Double(f64::from(*v))
        }
        (EngineType::NativeDouble, NativeTag::Double, Payload::Double(v)) => Payload::Double(*v),
        (EngineType::NativeDouble, NativeTag::Float, Payload::Double(v)) => {
            Payload::Float(*v as f32)
        }
        (_, NativeTag::Timestamp, Payload::Timestamp(t)) => Payload::Timestamp(*t),
        (_, NativeTag::IntervalDs, Payload::IntervalDs(d)) => Payload::IntervalDs(*d),
        (_, NativeTag::Boolean, Payload::Boolean(b)) => Payload::Boolean(*b),
        _ => return Err(not_implemented(engine, tag)),
    };
    out.is_null = false;
    out.payload = loaded;
    Ok(())
}

fn buffer_too_small(have: usize, need: usize) -> BridgeError {
    BridgeError::new(
        codes::BUFFER_TOO_SMALL,
        format!(
            "buffer of {} bytes too small for {} bytes of decimal text",
            have, need
        ),
    )
}

fn number_as(text: &str, tag: NativeTag) -> Option<Payload> {
    let text = text.trim();
    match tag {
        NativeTag::Int64 => text
            .parse::<i64>()
            .ok()
            .or_else(|| integral(text).and_then(|v| i64::try_from(v).ok()))
            .map(Payload::Int64),
        NativeTag::Uint64 => text
            .parse::<u64>()
            .ok()
            .or_else(|| integral(text).and_then(|v| u64::try_from(v).ok()))
            .map(Payload::Uint64),
        NativeTag::Float => text.parse::<f32>().ok().map(Payload::Float),
        NativeTag::Double => text.parse::<f64>().ok().map(Payload::Double),
        _ => None,
    }
}

/// Integral value of decimal text such as `12.000` or `1e3`.
fn integral(text: &str) -> Option<i128> {
    let v = text.parse::<f64>().ok()?;
    (v.fract() == 0.0 && v.abs() < 1e38).then_some(v as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> NativeData {
        NativeData::with(Payload::Bytes(s.as_bytes().to_vec()))
    }

    #[test]
    fn test_number_canonical_text() {
        let stored = store(
            EngineType::Number,
            0,
            NativeTag::Int64,
            &NativeData::with(Payload::Int64(-42)),
        )
        .expect("int into NUMBER");
        assert_eq!(stored, Payload::Bytes(b"-42".to_vec()));

        let stored =
            store(EngineType::Number, 0, NativeTag::Bytes, &bytes(" +12.50 ")).expect("text");
        assert_eq!(stored, Payload::Bytes(b"12.50".to_vec()));

        let err = store(EngineType::Number, 0, NativeTag::Bytes, &bytes("12a")).expect_err("bad");
        assert_eq!(err.code, codes::INVALID_NUMBER);
        let err = store(EngineType::Number, 0, NativeTag::Bytes, &bytes("inf")).expect_err("inf");
        assert_eq!(err.code, codes::INVALID_NUMBER);
    }

    #[test]
    fn test_number_from_extreme_doubles_fits_buffer() {
        for (v, text) in [(1e40_f64, "1e40"), (1e-300, "1e-300"), (-2.5e200, "-2.5e200")] {
            let stored = store(
                EngineType::Number,
                0,
                NativeTag::Double,
                &NativeData::with(Payload::Double(v)),
            )
            .expect("double into NUMBER");
            assert_eq!(stored, Payload::Bytes(text.as_bytes().to_vec()));

            let mut out = NativeData::null();
            out.presize_bytes(DECIMAL_BUFFER_WIDTH);
            load(EngineType::Number, NativeTag::Bytes, &stored, &mut out).expect("fits");
            assert_eq!(out.as_bytes(), Some(text.as_bytes()));
        }

        let stored = store(
            EngineType::Number,
            0,
            NativeTag::Double,
            &NativeData::with(Payload::Double(0.125)),
        )
        .expect("short stays plain");
        assert_eq!(stored, Payload::Bytes(b"0.125".to_vec()));

        let stored = store(
            EngineType::Number,
            0,
            NativeTag::Float,
            &NativeData::with(Payload::Float(f32::MAX)),
        )
        .expect("f32::MAX");
        let Payload::Bytes(text) = stored else {
            panic!("NUMBER stores text");
        };
        assert!(text.len() <= DECIMAL_BUFFER_WIDTH);

        let long = "1".repeat(DECIMAL_BUFFER_WIDTH + 1);
        let err = store(EngineType::Number, 0, NativeTag::Bytes, &bytes(&long)).expect_err("wide");
        assert_eq!(err.code, codes::OUT_OF_RANGE);
    }

    #[test]
    fn test_number_read_needs_buffer() {
        let stored = Payload::Bytes(b"12345.678".to_vec());
        let mut out = NativeData::null();
        let err = load(EngineType::Number, NativeTag::Bytes, &stored, &mut out)
            .expect_err("no buffer supplied");
        assert_eq!(err.code, codes::BUFFER_TOO_SMALL);

        out.presize_bytes(4);
        assert!(load(EngineType::Number, NativeTag::Bytes, &stored, &mut out).is_err());

        out.presize_bytes(39);
        load(EngineType::Number, NativeTag::Bytes, &stored, &mut out).expect("fits");
        assert_eq!(out.as_bytes(), Some(&b"12345.678"[..]));
        assert!(!out.is_null);
    }

    #[test]
    fn test_number_as_integers() {
        let mut out = NativeData::null();
        load(
            EngineType::Number,
            NativeTag::Int64,
            &Payload::Bytes(b"1e3".to_vec()),
            &mut out,
        )
        .expect("integral");
        assert_eq!(out.payload, Payload::Int64(1000));

        let err = load(
            EngineType::Number,
            NativeTag::Int64,
            &Payload::Bytes(b"2.5".to_vec()),
            &mut out,
        )
        .expect_err("fractional");
        assert_eq!(err.code, codes::OUT_OF_RANGE);
    }

    #[test]
    fn test_character_rules() {
        let err = store(EngineType::Varchar, 3, NativeTag::Bytes, &bytes("abcd")).expect_err("size");
        assert_eq!(err.code, codes::VALUE_TOO_LARGE);

        let err = store(
            EngineType::Varchar,
            0,
            NativeTag::Int64,
            &NativeData::with(Payload::Int64(1)),
        )
        .expect_err("int into VARCHAR2");
        assert_eq!(err.code, codes::CONVERSION);
    }

    #[test]
    fn test_native_widths() {
        let stored = store(
            EngineType::NativeDouble,
            0,
            NativeTag::Float,
            &NativeData::with(Payload::Float(1.5)),
        )
        .expect("float widens");
        assert_eq!(stored, Payload::Double(1.5));

        let err = store(
            EngineType::NativeInt,
            0,
            NativeTag::Uint64,
            &NativeData::with(Payload::Uint64(u64::MAX)),
        )
        .expect_err("too large");
        assert_eq!(err.code, codes::OUT_OF_RANGE);
    }
}
