use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr, SignedVariableInteger};

use crate::{
    schema::field::{FieldPath, ScalarKind},
    types::GhostId,
};

/// One replicated field's live value. This is the protocol-boundary value
/// model: the host component store is opaque to the protocol, so ghost state
/// crosses into it as explicit values rather than through reflection.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    GhostRef(GhostId),
    List(Vec<FieldValue>),
    Buffer(Vec<u8>),
}

/// The full replicated state of one ghost at one instant: root fields plus
/// one field set per linked child.
#[derive(Clone, Debug, PartialEq)]
pub struct GhostState {
    pub fields: Vec<FieldValue>,
    pub children: Vec<Vec<FieldValue>>,
}

impl GhostState {
    pub fn field(&self, path: FieldPath) -> Option<&FieldValue> {
        match path {
            FieldPath::Root(index) => self.fields.get(index),
            FieldPath::Child(child, index) => self.children.get(child)?.get(index),
        }
    }

    pub fn field_mut(&mut self, path: FieldPath) -> Option<&mut FieldValue> {
        match path {
            FieldPath::Root(index) => self.fields.get_mut(index),
            FieldPath::Child(child, index) => self.children.get_mut(child)?.get_mut(index),
        }
    }
}

/// Quantized integer form of a float: `round(value * Q)`.
pub fn quantize(value: f32, q: f32) -> i64 {
    (f64::from(value) * f64::from(q)).round() as i64
}

/// Reverses `quantize`, within 1/Q of the original value.
pub fn dequantize(raw: i64, q: f32) -> f32 {
    (raw as f64 / f64::from(q)) as f32
}

/// Value comparison as the wire will see it: floats compare through their
/// quantized form, so sub-precision jitter never dirties the change-mask.
pub(crate) fn values_equal(a: &FieldValue, b: &FieldValue, q: f32) -> bool {
    match (a, b) {
        (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
        (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
        (FieldValue::Float(a), FieldValue::Float(b)) => {
            if q > 0.0 {
                quantize(*a, q) == quantize(*b, q)
            } else {
                a.to_bits() == b.to_bits()
            }
        }
        (FieldValue::GhostRef(a), FieldValue::GhostRef(b)) => a == b,
        (FieldValue::List(a), FieldValue::List(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(a, b)| values_equal(a, b, q))
        }
        (FieldValue::Buffer(a), FieldValue::Buffer(b)) => a == b,
        // shape mismatch counts as changed; the serializer re-sends
        _ => false,
    }
}

pub(crate) fn write_scalar(value: &FieldValue, q: f32, writer: &mut dyn BitWrite) {
    match value {
        FieldValue::Bool(value) => value.ser(writer),
        FieldValue::Int(value) => SignedVariableInteger::<10>::new(*value).ser(writer),
        FieldValue::Float(value) => {
            if q > 0.0 {
                SignedVariableInteger::<10>::new(quantize(*value, q)).ser(writer);
            } else {
                value.ser(writer);
            }
        }
        FieldValue::GhostRef(value) => value.ser(writer),
        // lists and buffers go through the dynamic codec, never here
        FieldValue::List(_) | FieldValue::Buffer(_) => {
            debug_assert!(false, "dynamic value routed through scalar codec");
        }
    }
}

pub(crate) fn read_scalar(
    kind: ScalarKind,
    q: f32,
    reader: &mut BitReader,
) -> Result<FieldValue, SerdeErr> {
    match kind {
        ScalarKind::Bool => Ok(FieldValue::Bool(bool::de(reader)?)),
        ScalarKind::Int => {
            let raw: i64 = SignedVariableInteger::<10>::de(reader)?.to();
            Ok(FieldValue::Int(raw))
        }
        ScalarKind::Float => {
            if q > 0.0 {
                let raw: i64 = SignedVariableInteger::<10>::de(reader)?.to();
                Ok(FieldValue::Float(dequantize(raw, q)))
            } else {
                Ok(FieldValue::Float(f32::de(reader)?))
            }
        }
        ScalarKind::GhostRef => Ok(FieldValue::GhostRef(GhostId::de(reader)?)),
    }
}

pub(crate) fn scalar_bit_length(value: &FieldValue, q: f32) -> u32 {
    match value {
        FieldValue::Bool(_) => 1,
        FieldValue::Int(value) => SignedVariableInteger::<10>::new(*value).bit_length(),
        FieldValue::Float(value) => {
            if q > 0.0 {
                SignedVariableInteger::<10>::new(quantize(*value, q)).bit_length()
            } else {
                32
            }
        }
        FieldValue::GhostRef(value) => value.bit_length(),
        FieldValue::List(_) | FieldValue::Buffer(_) => 0,
    }
}
