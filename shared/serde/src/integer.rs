use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::ConstBitLength,
    serde::Serde,
};

pub trait PackedIntegerConversion<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    fn from(value: &PackedInteger<SIGNED, VARIABLE, BITS>) -> Self;
}

/// Fixed-width unsigned integer packed into exactly `BITS` bits.
pub type UnsignedInteger<const BITS: u8> = PackedInteger<false, false, BITS>;
/// Variable-width unsigned integer, in `BITS`-sized chunks with a continue
/// bit per chunk. Small values stay small on the wire.
pub type UnsignedVariableInteger<const BITS: u8> = PackedInteger<false, true, BITS>;
/// Variable-width signed integer.
pub type SignedVariableInteger<const BITS: u8> = PackedInteger<true, true, BITS>;

// The generic wrapper delegates to a non-generic inner type, to keep
// monomorphization from duplicating the encode/decode bodies per BITS value.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PackedInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: PackedIntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct PackedIntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl PackedIntegerInner {
    fn new(signed: bool, variable: bool, bits: u8, value: i128) -> Self {
        assert!((1..=127).contains(&bits), "bit width must be 1..=127");
        assert!(
            signed || value >= 0,
            "unsigned integer cannot hold {}",
            value
        );
        if !variable {
            let limit: i128 = 1 << bits;
            assert!(
                value < limit && (!signed || value > -limit),
                "{} does not fit in {} bits",
                value,
                bits
            );
        }

        Self {
            value,
            signed,
            variable,
            bits,
        }
    }

    fn magnitude(&self) -> u128 {
        self.value.unsigned_abs()
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        if self.signed {
            writer.write_bit(self.value < 0);
        }
        let mut value = self.magnitude();

        if self.variable {
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(
        reader: &mut BitReader,
        signed: bool,
        variable: bool,
        bits: u8,
    ) -> Result<Self, SerdeErr> {
        let mut negative = false;
        if signed {
            negative = reader.read_bit()?;
        }

        let mut output: u128 = 0;
        let mut shift: u32 = 0;

        if variable {
            loop {
                let proceed = reader.read_bit()?;
                for _ in 0..bits {
                    if shift >= 127 {
                        // a malformed stream could keep the continue bit lit forever
                        return Err(SerdeErr);
                    }
                    if reader.read_bit()? {
                        output |= 1 << shift;
                    }
                    shift += 1;
                }
                if !proceed {
                    break;
                }
            }
        } else {
            for _ in 0..bits {
                if reader.read_bit()? {
                    output |= 1 << shift;
                }
                shift += 1;
            }
        }

        let mut value = output as i128;
        if negative {
            value = -value;
        }
        Ok(Self {
            value,
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = 0;

        if self.signed {
            output += 1; // sign bit
        }

        if self.variable {
            let mut value = self.magnitude();
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                output += 1 + self.bits as u32;
                value >>= self.bits as u32;
                if !proceed {
                    break;
                }
            }
        } else {
            output += self.bits as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> PackedInteger<SIGNED, VARIABLE, BITS> {
    pub fn new<T: Into<i128>>(value: T) -> Self {
        Self {
            inner: PackedIntegerInner::new(SIGNED, VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    pub fn to<T: PackedIntegerConversion<SIGNED, VARIABLE, BITS>>(&self) -> T {
        T::from(self)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for PackedInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = PackedIntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for PackedInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let mut output: u32 = 0;
        if SIGNED {
            output += 1;
        }
        output + BITS as u32
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: TryFrom<i128>>
    PackedIntegerConversion<SIGNED, VARIABLE, BITS> for T
{
    fn from(value: &PackedInteger<SIGNED, VARIABLE, BITS>) -> Self {
        let Ok(t_value) = T::try_from(value.get()) else {
            panic!("PackedInteger's value is out of range to convert to this type.");
        };
        t_value
    }
}
