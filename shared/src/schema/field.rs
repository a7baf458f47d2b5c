use crate::constants::{DEFAULT_DYNAMIC_BUFFER_CAPACITY, MAX_INLINE_LIST_CAPACITY};

/// Scalar shapes a field (or a list element) can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    /// An entity-to-entity reference. Serializes as the ghost id (0 when
    /// unresolved), never as anything pointer-like.
    GhostRef,
}

/// The wire/value shape of one replicated field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Fixed-capacity inline list. `capacity` is a hard cap, at most
    /// `MAX_INLINE_LIST_CAPACITY`.
    List { elem: ScalarKind, capacity: usize },
    /// Dynamic byte buffer with an enforced serializable cap.
    Buffer { capacity: usize },
}

impl FieldKind {
    /// Stable one-byte tag, folded into the schema hash.
    pub(crate) fn hash_tag(&self) -> u8 {
        match self {
            FieldKind::Scalar(ScalarKind::Bool) => 0,
            FieldKind::Scalar(ScalarKind::Int) => 1,
            FieldKind::Scalar(ScalarKind::Float) => 2,
            FieldKind::Scalar(ScalarKind::GhostRef) => 3,
            FieldKind::List { .. } => 4,
            FieldKind::Buffer { .. } => 5,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        match self {
            FieldKind::Scalar(_) => None,
            FieldKind::List { capacity, .. } => Some(*capacity),
            FieldKind::Buffer { capacity } => Some(*capacity),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, FieldKind::List { .. } | FieldKind::Buffer { .. })
    }
}

/// Controls which class of client a field goes to at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOptimization {
    DontSend,
    OnlyInterpolated,
    OnlyPredicted,
    AllClients,
}

/// Controls whether a field reaches the owning connection, everyone else,
/// both, or neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerSendType {
    None,
    SendToOwner,
    SendToNonOwner,
    All,
}

/// Immutable per-field descriptor inside a `GhostType`: everything the
/// serializer and the relevancy filter need to know about one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Quantization factor Q: floats encode as `round(value * Q)`.
    /// Q = 0.0 means unquantized (exact bit pattern on the wire).
    pub quantize: f32,
    pub interpolate: bool,
    pub send_rule: SendOptimization,
    pub owner_rule: OwnerSendType,
    /// Child-entity fields are suppressed by default; this opts one in.
    pub send_for_children: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            quantize: 0.0,
            interpolate: false,
            send_rule: SendOptimization::AllClients,
            owner_rule: OwnerSendType::All,
            send_for_children: false,
        }
    }

    pub fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self::new(name, FieldKind::Scalar(kind))
    }

    pub fn list(name: &'static str, elem: ScalarKind, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_INLINE_LIST_CAPACITY);
        Self::new(name, FieldKind::List { elem, capacity })
    }

    pub fn buffer(name: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Buffer {
                capacity: DEFAULT_DYNAMIC_BUFFER_CAPACITY,
            },
        )
    }

    pub fn buffer_with_capacity(name: &'static str, capacity: usize) -> Self {
        Self::new(name, FieldKind::Buffer { capacity })
    }

    pub fn with_quantize(mut self, quantize: f32) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn with_interpolate(mut self) -> Self {
        self.interpolate = true;
        self
    }

    pub fn with_send_rule(mut self, rule: SendOptimization) -> Self {
        self.send_rule = rule;
        self
    }

    pub fn with_owner_rule(mut self, rule: OwnerSendType) -> Self {
        self.owner_rule = rule;
        self
    }

    pub fn with_send_for_children(mut self) -> Self {
        self.send_for_children = true;
        self
    }
}

/// Where a field lives within a ghost: on the root entity, or on one of the
/// linked child entities (which have no ghost ids of their own).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Root(usize),
    Child(usize, usize),
}
