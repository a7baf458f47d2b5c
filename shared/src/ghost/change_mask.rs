use wraith_serde::{BitReader, BitWrite, SerdeErr};

/// One bit per replicated field: set means "differs from the baseline and is
/// present on the wire", clear means "unchanged, take the baseline value".
/// Bit order matches the ghost type's field order (root fields first, then
/// child fields); the wire form carries no length because both peers know
/// the field count from the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeMask {
    bytes: Vec<u8>,
    bit_count: usize,
}

impl ChangeMask {
    pub fn new(bit_count: usize) -> Self {
        Self {
            bytes: vec![0; bit_count.div_ceil(8)],
            bit_count,
        }
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_count {
            return None;
        }
        Some(self.bytes[index / 8] & (1 << (index % 8)) != 0)
    }

    pub fn set_bit(&mut self, index: usize, value: bool) {
        if index >= self.bit_count {
            return;
        }
        if value {
            self.bytes[index / 8] |= 1 << (index % 8);
        } else {
            self.bytes[index / 8] &= !(1 << (index % 8));
        }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn is_clear(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    pub fn ser(&self, writer: &mut dyn BitWrite) {
        for index in 0..self.bit_count {
            writer.write_bit(self.bytes[index / 8] & (1 << (index % 8)) != 0);
        }
    }

    pub fn de(reader: &mut BitReader, bit_count: usize) -> Result<Self, SerdeErr> {
        let mut mask = ChangeMask::new(bit_count);
        for index in 0..bit_count {
            if reader.read_bit()? {
                mask.set_bit(index, true);
            }
        }
        Ok(mask)
    }
}
