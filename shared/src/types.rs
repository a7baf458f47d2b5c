use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// Simulation ticks are 16-bit wrapping sequence numbers; compare them with
/// `sequence_greater_than` / `sequence_less_than`, never with `<`.
pub type Tick = u16;

/// Server-unique id of a replicated entity. Id 0 is reserved as the null
/// reference ("unresolved"), so entity-reference fields can always encode.
/// Ids are pooled: a despawned ghost's id eventually returns for reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GhostId(u16);

impl GhostId {
    pub const NULL: GhostId = GhostId(0);

    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl Serde for GhostId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value: u16 = UnsignedVariableInteger::<7>::de(reader)?.to();
        Ok(Self(value))
    }

    fn bit_length(&self) -> u32 {
        UnsignedVariableInteger::<7>::new(self.0).bit_length()
    }
}

/// Index of a ghost type within the schema registry, in name order. The
/// registry sorts at build time so both peers agree on every id even when
/// their registration order differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GhostTypeId(u16);

impl GhostTypeId {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl Serde for GhostTypeId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<4>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value: u16 = UnsignedVariableInteger::<4>::de(reader)?.to();
        Ok(Self(value))
    }

    fn bit_length(&self) -> u32 {
        UnsignedVariableInteger::<4>::new(self.0).bit_length()
    }
}

/// Identity assigned to a connection when it reaches Connected. Survives a
/// reconnect with the same unique id (the "lineage" of the session).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetworkId(u32);

impl NetworkId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Serde for NetworkId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        32
    }
}
