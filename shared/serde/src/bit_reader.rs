use crate::error::SerdeErr;

/// Reads bits back out of a byte buffer, in the order a `BitWriter` packed
/// them. Every read is bounds-checked; running off the end of the buffer is
/// a `SerdeErr`, never an out-of-bounds access.
pub struct BitReader<'b> {
    buffer: &'b [u8],
    buffer_index: usize,
    scratch: u8,
    scratch_index: u8,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            buffer_index: 0,
            scratch: 0,
            scratch_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.scratch_index == 0 {
            let Some(byte) = self.buffer.get(self.buffer_index) else {
                return Err(SerdeErr);
            };
            self.scratch = *byte;
            self.buffer_index += 1;
            self.scratch_index = 8;
        }

        let bit = self.scratch & 1 != 0;
        self.scratch >>= 1;
        self.scratch_index -= 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output: u8 = 0;
        for i in 0..8 {
            if self.read_bit()? {
                output |= 1 << i;
            }
        }
        Ok(output)
    }

    /// Bits remaining in the buffer, counting any padding in the final byte.
    pub fn bits_remaining(&self) -> u32 {
        let whole = (self.buffer.len() - self.buffer_index) as u32 * 8;
        whole + self.scratch_index as u32
    }
}
