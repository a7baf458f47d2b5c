use crate::{
    bit_reader::BitReader,
    bit_writer::BitWrite,
    error::SerdeErr,
    integer::UnsignedVariableInteger,
};

/// A type that can be serialized to, and deserialized from, a bit stream.
pub trait Serde: Sized + Clone + PartialEq {
    fn ser(&self, writer: &mut dyn BitWrite);
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;
    fn bit_length(&self) -> u32;
}

/// A `Serde` type whose wire size does not depend on its value.
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}

// bool

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }

    fn bit_length(&self) -> u32 {
        1
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

// fixed-width unsigned primitives

macro_rules! impl_serde_unsigned {
    ($ty:ty, $bits:expr) => {
        impl Serde for $ty {
            fn ser(&self, writer: &mut dyn BitWrite) {
                let mut value = *self;
                for _ in 0..($bits / 8) {
                    writer.write_byte((value & 0xFF) as u8);
                    value >>= 8;
                }
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                let mut output: $ty = 0;
                for i in 0..($bits / 8) {
                    output |= (reader.read_byte()? as $ty) << (i * 8);
                }
                Ok(output)
            }

            fn bit_length(&self) -> u32 {
                $bits
            }
        }

        impl ConstBitLength for $ty {
            fn const_bit_length() -> u32 {
                $bits
            }
        }
    };
}

impl_serde_unsigned!(u16, 16);
impl_serde_unsigned!(u32, 32);
impl_serde_unsigned!(u64, 64);

impl Serde for u8 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }

    fn bit_length(&self) -> u32 {
        8
    }
}

impl ConstBitLength for u8 {
    fn const_bit_length() -> u32 {
        8
    }
}

// signed / floating primitives, through their bit patterns

impl Serde for i64 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        (*self as u64).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(u64::de(reader)? as i64)
    }

    fn bit_length(&self) -> u32 {
        64
    }
}

impl ConstBitLength for i64 {
    fn const_bit_length() -> u32 {
        64
    }
}

impl Serde for f32 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.to_bits().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(f32::from_bits(u32::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        32
    }
}

impl ConstBitLength for f32 {
    fn const_bit_length() -> u32 {
        32
    }
}

// Option

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => {
                writer.write_bit(false);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }

    fn bit_length(&self) -> u32 {
        match self {
            Some(value) => 1 + value.bit_length(),
            None => 1,
        }
    }
}

// String & byte buffers: variable-length prefix, then contents

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let length = UnsignedVariableInteger::<9>::new(self.len() as u64);
        length.ser(writer);
        for byte in self.as_bytes() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = UnsignedVariableInteger::<9>::de(reader)?.to();
        let mut bytes = Vec::with_capacity(length);
        for _ in 0..length {
            bytes.push(reader.read_byte()?);
        }
        String::from_utf8(bytes).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        UnsignedVariableInteger::<9>::new(self.len() as u64).bit_length()
            + (self.len() as u32) * 8
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let length = UnsignedVariableInteger::<9>::new(self.len() as u64);
        length.ser(writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = UnsignedVariableInteger::<9>::de(reader)?.to();
        let mut items = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            items.push(T::de(reader)?);
        }
        Ok(items)
    }

    fn bit_length(&self) -> u32 {
        let mut output = UnsignedVariableInteger::<9>::new(self.len() as u64).bit_length();
        for item in self {
            output += item.bit_length();
        }
        output
    }
}
