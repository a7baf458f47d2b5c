//! Wire codec for the two dynamic-length field kinds: fixed-capacity inline
//! lists and dynamic byte buffers. Both replicate the current length plus
//! the changed elements; growth appends trailing elements, shrink sends only
//! the new length. Both peers know the baseline length, so trailing (new)
//! elements need no per-element presence bit.

use thiserror::Error;
use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    ghost::value::{read_scalar, values_equal, write_scalar, FieldValue},
    schema::field::ScalarKind,
};

/// A dynamic field's current length exceeded its serializable cap at the
/// sender. Recoverable and field-scoped: the field is skipped this tick and
/// retried on the next one; sibling fields are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Field '{field}' length {length} exceeds its cap of {capacity}, skipping this tick")]
pub struct CapacityError {
    pub field: &'static str,
    pub length: usize,
    pub capacity: usize,
}

pub(crate) fn write_list(
    current: &[FieldValue],
    baseline: &[FieldValue],
    q: f32,
    writer: &mut dyn BitWrite,
) {
    UnsignedVariableInteger::<6>::new(current.len() as u64).ser(writer);

    let overlap = current.len().min(baseline.len());
    for index in 0..overlap {
        let changed = !values_equal(&current[index], &baseline[index], q);
        writer.write_bit(changed);
        if changed {
            write_scalar(&current[index], q, writer);
        }
    }
    // elements past the baseline length are always new; on shrink there are none
    for value in current.get(baseline.len()..).unwrap_or(&[]) {
        write_scalar(value, q, writer);
    }
}

pub(crate) fn read_list(
    baseline: &[FieldValue],
    elem: ScalarKind,
    capacity: usize,
    q: f32,
    reader: &mut BitReader,
) -> Result<Vec<FieldValue>, SerdeErr> {
    let length: usize = UnsignedVariableInteger::<6>::de(reader)?.to();
    if length > capacity {
        return Err(SerdeErr);
    }

    let mut values = Vec::with_capacity(length);
    let overlap = length.min(baseline.len());
    for index in 0..overlap {
        if reader.read_bit()? {
            values.push(read_scalar(elem, q, reader)?);
        } else {
            values.push(baseline[index].clone());
        }
    }
    for _ in baseline.len()..length {
        values.push(read_scalar(elem, q, reader)?);
    }
    Ok(values)
}

pub(crate) fn write_buffer(current: &[u8], baseline: &[u8], writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<9>::new(current.len() as u64).ser(writer);

    let overlap = current.len().min(baseline.len());
    for index in 0..overlap {
        let changed = current[index] != baseline[index];
        writer.write_bit(changed);
        if changed {
            writer.write_byte(current[index]);
        }
    }
    for byte in current.get(baseline.len()..).unwrap_or(&[]) {
        writer.write_byte(*byte);
    }
}

pub(crate) fn read_buffer(
    baseline: &[u8],
    capacity: usize,
    reader: &mut BitReader,
) -> Result<Vec<u8>, SerdeErr> {
    let length: usize = UnsignedVariableInteger::<9>::de(reader)?.to();
    if length > capacity {
        return Err(SerdeErr);
    }

    let mut bytes = Vec::with_capacity(length);
    let overlap = length.min(baseline.len());
    for index in 0..overlap {
        if reader.read_bit()? {
            bytes.push(reader.read_byte()?);
        } else {
            bytes.push(baseline[index]);
        }
    }
    for _ in baseline.len()..length {
        bytes.push(reader.read_byte()?);
    }
    Ok(bytes)
}
