//! Per-ghost delta encoding. An update is a baseline tick, a change-mask,
//! and a bit-length-prefixed payload: changed scalar fields in mask order,
//! then the dynamic (list/buffer) fields in a trailing region. The length
//! prefix lets a receiver that has lost the baseline skip the payload and
//! keep decoding the rest of the packet.

use wraith_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    ghost::{
        change_mask::ChangeMask,
        dynamic::{read_buffer, read_list, write_buffer, write_list, CapacityError},
        filter::{should_send_field, SendContext},
        value::{read_scalar, values_equal, write_scalar, FieldValue, GhostState},
    },
    schema::{
        field::{FieldDescriptor, FieldKind, FieldPath},
        ghost_type::GhostType,
    },
    types::Tick,
};

/// The leading portion of one ghost update, readable without the baseline.
/// A receiver that no longer holds the baseline tick skips `payload_bits`
/// and nacks instead of decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateHeader {
    /// `None` means the payload is a full snapshot against default state.
    pub baseline_tick: Option<Tick>,
    pub mask: ChangeMask,
    pub payload_bits: u32,
}

/// What one `write_update` call actually put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentUpdate {
    /// The mask as written: the input mask minus filtered and over-cap bits.
    pub mask: ChangeMask,
    pub capacity_errors: Vec<CapacityError>,
}

/// Compares two states field by field and returns the change-mask, with
/// floats compared through their quantized form.
pub fn diff_states(ghost_type: &GhostType, current: &GhostState, baseline: &GhostState) -> ChangeMask {
    let bit_count = ghost_type.mask_bit_count();
    let mut mask = ChangeMask::new(bit_count);
    for bit in 0..bit_count {
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            continue;
        };
        let changed = match (current.field(path), baseline.field(path)) {
            (Some(a), Some(b)) => !values_equal(a, b, descriptor.quantize),
            _ => true,
        };
        mask.set_bit(bit, changed);
    }
    mask
}

/// The state a receiver holds after applying an update carrying `mask`:
/// masked fields take the sender's current value, the rest keep the base.
/// The sender stores this, not its own current state, as the baseline for
/// the next delta, so a filtered or skipped field never desyncs the pair.
pub fn overlay_masked(
    ghost_type: &GhostType,
    base: &GhostState,
    current: &GhostState,
    mask: &ChangeMask,
) -> GhostState {
    let mut state = base.clone();
    for bit in 0..mask.bit_count() {
        if mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((_, path)) = ghost_type.descriptor_at(bit) else {
            continue;
        };
        if let (Some(value), Some(slot)) = (current.field(path), state.field_mut(path)) {
            *slot = value.clone();
        }
    }
    state
}

fn empty_dynamic_baseline(kind: &FieldKind) -> FieldValue {
    match kind {
        FieldKind::List { .. } => FieldValue::List(Vec::new()),
        FieldKind::Buffer { .. } => FieldValue::Buffer(Vec::new()),
        FieldKind::Scalar(_) => FieldValue::Bool(false),
    }
}

fn dynamic_length(value: &FieldValue) -> usize {
    match value {
        FieldValue::List(values) => values.len(),
        FieldValue::Buffer(bytes) => bytes.len(),
        _ => 0,
    }
}

fn write_dynamic_field(
    descriptor: &FieldDescriptor,
    current: &FieldValue,
    baseline: Option<&FieldValue>,
    writer: &mut dyn BitWrite,
) {
    match (&descriptor.kind, current) {
        (FieldKind::List { .. }, FieldValue::List(values)) => {
            let base: &[FieldValue] = match baseline {
                Some(FieldValue::List(base)) => base,
                _ => &[],
            };
            write_list(values, base, descriptor.quantize, writer);
        }
        (FieldKind::Buffer { .. }, FieldValue::Buffer(bytes)) => {
            let base: &[u8] = match baseline {
                Some(FieldValue::Buffer(base)) => base,
                _ => &[],
            };
            write_buffer(bytes, base, writer);
        }
        _ => {
            debug_assert!(false, "dynamic field holds a non-dynamic value");
        }
    }
}

fn read_dynamic_field(
    descriptor: &FieldDescriptor,
    baseline: Option<&FieldValue>,
    reader: &mut BitReader,
) -> Result<FieldValue, SerdeErr> {
    match descriptor.kind {
        FieldKind::List { elem, capacity } => {
            let base: &[FieldValue] = match baseline {
                Some(FieldValue::List(base)) => base,
                _ => &[],
            };
            Ok(FieldValue::List(read_list(
                base,
                elem,
                capacity,
                descriptor.quantize,
                reader,
            )?))
        }
        FieldKind::Buffer { capacity } => {
            let base: &[u8] = match baseline {
                Some(FieldValue::Buffer(base)) => base,
                _ => &[],
            };
            Ok(FieldValue::Buffer(read_buffer(base, capacity, reader)?))
        }
        FieldKind::Scalar(_) => Err(SerdeErr),
    }
}

/// Serializes one ghost update: filters the mask for this connection,
/// drops over-cap dynamic fields (reported, retried next tick), then writes
/// header and payload. Returns the mask as written and the capacity errors
/// hit along the way.
pub fn write_update(
    ghost_type: &GhostType,
    current: &GhostState,
    baseline: Option<(Tick, &GhostState)>,
    mask: &ChangeMask,
    ctx: &SendContext,
    writer: &mut dyn BitWrite,
) -> Result<SentUpdate, SerdeErr> {
    let mut send_mask = mask.clone();
    let mut capacity_errors = Vec::new();

    for bit in 0..send_mask.bit_count() {
        if send_mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            send_mask.set_bit(bit, false);
            continue;
        };
        let is_root = matches!(path, FieldPath::Root(_));
        if !should_send_field(descriptor, is_root, ctx) {
            send_mask.set_bit(bit, false);
            continue;
        }
        if let Some(cap) = descriptor.kind.capacity() {
            let length = current.field(path).map_or(0, dynamic_length);
            if length > cap {
                send_mask.set_bit(bit, false);
                capacity_errors.push(CapacityError {
                    field: descriptor.name,
                    length,
                    capacity: cap,
                });
            }
        }
    }

    let baseline_state = baseline.map(|(_, state)| state);
    let mut payload = BitWriter::new();

    // scalar region, in mask-bit order
    for bit in 0..send_mask.bit_count() {
        if send_mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            continue;
        };
        if descriptor.kind.is_dynamic() {
            continue;
        }
        if let Some(value) = current.field(path) {
            write_scalar(value, descriptor.quantize, &mut payload);
        }
    }

    // trailing dynamic region
    for bit in 0..send_mask.bit_count() {
        if send_mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            continue;
        };
        if !descriptor.kind.is_dynamic() {
            continue;
        }
        if let Some(value) = current.field(path) {
            let base = baseline_state.and_then(|state| state.field(path));
            write_dynamic_field(descriptor, value, base, &mut payload);
        }
    }

    baseline.map(|(tick, _)| tick).ser(writer);
    send_mask.ser(writer);

    let payload_bits = payload.bits_written();
    UnsignedVariableInteger::<9>::new(u64::from(payload_bits)).ser(writer);
    let payload_bytes = payload.to_bytes();
    let mut copy = BitReader::new(&payload_bytes);
    for _ in 0..payload_bits {
        writer.write_bit(copy.read_bit()?);
    }

    Ok(SentUpdate {
        mask: send_mask,
        capacity_errors,
    })
}

/// Reads the baseline tick, mask, and payload length of one update. Never
/// touches the payload, so it is safe to call before the baseline lookup.
pub fn read_update_header(
    ghost_type: &GhostType,
    reader: &mut BitReader,
) -> Result<UpdateHeader, SerdeErr> {
    let baseline_tick = Option::<Tick>::de(reader)?;
    let mask = ChangeMask::de(reader, ghost_type.mask_bit_count())?;
    let payload_bits: u32 = UnsignedVariableInteger::<9>::de(reader)?.to();
    Ok(UpdateHeader {
        baseline_tick,
        mask,
        payload_bits,
    })
}

/// Discards an update's payload, leaving the reader at the next item in
/// the packet. Used when the baseline lookup fails.
pub fn skip_update_payload(header: &UpdateHeader, reader: &mut BitReader) -> Result<(), SerdeErr> {
    for _ in 0..header.payload_bits {
        reader.read_bit()?;
    }
    Ok(())
}

/// Applies one update on top of its resolved baseline (or default state
/// when the update is a full snapshot) and returns the new state.
pub fn read_snapshot(
    ghost_type: &GhostType,
    header: &UpdateHeader,
    baseline: Option<&GhostState>,
    reader: &mut BitReader,
) -> Result<GhostState, SerdeErr> {
    let mut state = match baseline {
        Some(baseline) => baseline.clone(),
        None => ghost_type.default_state(),
    };

    // scalar region
    for bit in 0..header.mask.bit_count() {
        if header.mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            return Err(SerdeErr);
        };
        if descriptor.kind.is_dynamic() {
            continue;
        }
        let FieldKind::Scalar(kind) = descriptor.kind else {
            continue;
        };
        let value = read_scalar(kind, descriptor.quantize, reader)?;
        if let Some(slot) = state.field_mut(path) {
            *slot = value;
        }
    }

    // trailing dynamic region
    for bit in 0..header.mask.bit_count() {
        if header.mask.bit(bit) != Some(true) {
            continue;
        }
        let Some((descriptor, path)) = ghost_type.descriptor_at(bit) else {
            return Err(SerdeErr);
        };
        if !descriptor.kind.is_dynamic() {
            continue;
        }
        let base = baseline
            .and_then(|state| state.field(path))
            .filter(|value| matches!(value, FieldValue::List(_) | FieldValue::Buffer(_)));
        let fallback = empty_dynamic_baseline(&descriptor.kind);
        let value = read_dynamic_field(descriptor, base.or(Some(&fallback)), reader)?;
        if let Some(slot) = state.field_mut(path) {
            *slot = value;
        }
    }

    Ok(state)
}
