use std::fmt;

/// The data being deserialized does not match the expected wire layout, or
/// the incoming buffer ran out of bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerdeErr;

impl fmt::Display for SerdeErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Bin deserialize error")
    }
}

impl std::error::Error for SerdeErr {}
