//! Byte layout of persisted layer state.
//!
//! Integers are little endian. Reals are stored as 80-bit x87 extended precision
//! (64-bit mantissa with explicit integer bit, then sign and 15-bit exponent), so a
//! stream is interchangeable with one written from `long double` fields.

use std::io::{Read, Write};

use super::error::{PersistError, Shape};

pub const F80_SIZE: usize = 10;
pub const MAGIC: [u8; 4] = *b"CSYN";

const F64_BIAS: i32 = 1023;
const F80_BIAS: i32 = 16383;
const F64_FRACTION_MASK: u64 = (1 << 52) - 1;
const F64_EXPONENT_MASK: u64 = 0x7ff << 52;
const F64_QUIET_BIT: u64 = 1 << 51;
const EXPLICIT_ONE: u64 = 1 << 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LayerKind {
    Evolved = 1,
    Population = 2,
}

/// Widens an `f64` to 80-bit extended precision. Exact.
pub fn f64_to_f80(value: f64) -> [u8; F80_SIZE] {
    let bits = value.to_bits();
    let sign = ((bits >> 63) as u16) << 15;
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & F64_FRACTION_MASK;

    let (exponent80, mantissa) = if exponent == 0x7ff {
        (0x7fff, EXPLICIT_ONE | (fraction << 11))
    } else if exponent == 0 {
        if fraction == 0 {
            (0, 0)
        } else {
            // subnormal: normalize so the explicit integer bit is set
            let shift = fraction.leading_zeros();
            let unbiased = -1074 - shift as i32 + 63;
            ((unbiased + F80_BIAS) as u16, fraction << shift)
        }
    } else {
        ((exponent - F64_BIAS + F80_BIAS) as u16, EXPLICIT_ONE | (fraction << 11))
    };

    let mut bytes = [0u8; F80_SIZE];
    bytes[..8].copy_from_slice(&mantissa.to_le_bytes());
    bytes[8..].copy_from_slice(&(sign | exponent80).to_le_bytes());
    bytes
}

/// Narrows 80-bit extended precision to `f64`. Normal results round to nearest even,
/// subnormal results are truncated toward zero and overflow saturates to infinity.
pub fn f80_to_f64(bytes: [u8; F80_SIZE]) -> f64 {
    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&bytes[..8]);
    let mantissa = u64::from_le_bytes(mantissa_bytes);
    let sign_exponent = u16::from_le_bytes([bytes[8], bytes[9]]);
    let sign = ((sign_exponent >> 15) as u64) << 63;
    let exponent80 = (sign_exponent & 0x7fff) as i32;

    if exponent80 == 0x7fff {
        if mantissa << 1 == 0 {
            return f64::from_bits(sign | F64_EXPONENT_MASK);
        }
        let fraction = (mantissa >> 11) & F64_FRACTION_MASK;
        let fraction = if fraction == 0 { F64_QUIET_BIT } else { fraction };
        return f64::from_bits(sign | F64_EXPONENT_MASK | fraction);
    }
    if mantissa == 0 {
        return f64::from_bits(sign);
    }

    let shift = mantissa.leading_zeros();
    let mantissa = mantissa << shift;
    let mut unbiased = exponent80.max(1) - F80_BIAS - shift as i32;

    if unbiased >= 1 - F64_BIAS {
        let mut significand = mantissa >> 11;
        let rest = mantissa & 0x7ff;
        if rest > 0x400 || (rest == 0x400 && significand & 1 == 1) {
            significand += 1;
            if significand == 1 << 53 {
                significand >>= 1;
                unbiased += 1;
            }
        }
        if unbiased > F64_BIAS {
            return f64::from_bits(sign | F64_EXPONENT_MASK);
        }
        let biased = (unbiased + F64_BIAS) as u64;
        f64::from_bits(sign | (biased << 52) | (significand & F64_FRACTION_MASK))
    } else {
        // subnormal result, truncated
        let shift = (-1011 - unbiased) as u32;
        let fraction = if shift >= 64 { 0 } else { mantissa >> shift };
        f64::from_bits(sign | fraction)
    }
}

pub fn write_u8(out: &mut dyn Write, value: u8) -> Result<(), PersistError> {
    out.write_all(&[value])?;
    Ok(())
}

pub fn write_u16(out: &mut dyn Write, value: u16) -> Result<(), PersistError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn write_u32(out: &mut dyn Write, value: u32) -> Result<(), PersistError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn write_real(out: &mut dyn Write, value: f64) -> Result<(), PersistError> {
    out.write_all(&f64_to_f80(value))?;
    Ok(())
}

pub fn read_u8(input: &mut dyn Read) -> Result<u8, PersistError> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16(input: &mut dyn Read) -> Result<u16, PersistError> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_u32(input: &mut dyn Read) -> Result<u32, PersistError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_real(input: &mut dyn Read) -> Result<f64, PersistError> {
    let mut buf = [0u8; F80_SIZE];
    input.read_exact(&mut buf)?;
    Ok(f80_to_f64(buf))
}

fn dimension(value: usize) -> Result<u32, PersistError> {
    u32::try_from(value).map_err(|_| PersistError::Corrupt(format!("dimension {value} does not fit the header")))
}

pub fn write_header(out: &mut dyn Write, kind: LayerKind, shape: Shape) -> Result<(), PersistError> {
    out.write_all(&MAGIC)?;
    write_u8(out, kind as u8)?;
    write_u32(out, dimension(shape.input)?)?;
    write_u32(out, dimension(shape.output)?)?;
    write_u32(out, dimension(shape.populus)?)
}

/// Reads a header and checks it against the layer it is about to be loaded into.
pub fn read_header(input: &mut dyn Read, kind: LayerKind, expected: Shape) -> Result<(), PersistError> {
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(PersistError::Corrupt(format!("bad magic {magic:?}")));
    }
    let tag = read_u8(input)?;
    if tag != kind as u8 {
        return Err(PersistError::BadTag { expected: kind as u8, found: tag });
    }
    let found = Shape {
        input: read_u32(input)? as usize,
        output: read_u32(input)? as usize,
        populus: read_u32(input)? as usize,
    };
    if found != expected {
        return Err(PersistError::ShapeMismatch { expected, found });
    }
    Ok(())
}
