use crate::{
    ghost::value::{FieldValue, GhostState},
    schema::field::{FieldDescriptor, FieldKind, FieldPath, ScalarKind},
    types::GhostId,
};

/// Immutable schema of one ghost type: the ordered root field list, any
/// linked-child field sets, and the static-optimization flag. Built once at
/// registration through `GhostTypeBuilder`; never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct GhostType {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    child_sets: Vec<Vec<FieldDescriptor>>,
    is_static: bool,
}

impl GhostType {
    pub fn builder(name: &'static str) -> GhostTypeBuilder {
        GhostTypeBuilder {
            name,
            fields: Vec::new(),
            child_sets: Vec::new(),
            is_static: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn child_sets(&self) -> &[Vec<FieldDescriptor>] {
        &self.child_sets
    }

    pub fn has_child_fields(&self) -> bool {
        !self.child_sets.is_empty()
    }

    /// Whether this type opted into static optimization. Note the effective
    /// decision also depends on group membership; see
    /// `filter::replicates_statically`.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Total change-mask width: root fields first, then each child set's
    /// fields in declaration order.
    pub fn mask_bit_count(&self) -> usize {
        self.fields.len() + self.child_sets.iter().map(|set| set.len()).sum::<usize>()
    }

    /// Resolves a mask bit back to its descriptor and path.
    pub fn descriptor_at(&self, bit: usize) -> Option<(&FieldDescriptor, FieldPath)> {
        if bit < self.fields.len() {
            return Some((&self.fields[bit], FieldPath::Root(bit)));
        }
        let mut offset = self.fields.len();
        for (child_index, set) in self.child_sets.iter().enumerate() {
            if bit < offset + set.len() {
                let field_index = bit - offset;
                return Some((&set[field_index], FieldPath::Child(child_index, field_index)));
            }
            offset += set.len();
        }
        None
    }

    /// The all-default state every delta is measured against before any
    /// baseline has been acknowledged.
    pub fn default_state(&self) -> GhostState {
        GhostState {
            fields: self.fields.iter().map(default_value).collect(),
            children: self
                .child_sets
                .iter()
                .map(|set| set.iter().map(default_value).collect())
                .collect(),
        }
    }

    /// Whether `state` structurally matches this schema (field counts and
    /// value shapes). Values over capacity still match; capacity is a
    /// send-time concern, not a shape concern.
    pub fn state_matches(&self, state: &GhostState) -> bool {
        if state.fields.len() != self.fields.len()
            || state.children.len() != self.child_sets.len()
        {
            return false;
        }
        let root_ok = self
            .fields
            .iter()
            .zip(&state.fields)
            .all(|(desc, value)| value_matches(&desc.kind, value));
        let children_ok = self.child_sets.iter().zip(&state.children).all(|(set, values)| {
            set.len() == values.len()
                && set
                    .iter()
                    .zip(values)
                    .all(|(desc, value)| value_matches(&desc.kind, value))
        });
        root_ok && children_ok
    }
}

fn default_value(desc: &FieldDescriptor) -> FieldValue {
    match &desc.kind {
        FieldKind::Scalar(ScalarKind::Bool) => FieldValue::Bool(false),
        FieldKind::Scalar(ScalarKind::Int) => FieldValue::Int(0),
        FieldKind::Scalar(ScalarKind::Float) => FieldValue::Float(0.0),
        FieldKind::Scalar(ScalarKind::GhostRef) => FieldValue::GhostRef(GhostId::NULL),
        FieldKind::List { .. } => FieldValue::List(Vec::new()),
        FieldKind::Buffer { .. } => FieldValue::Buffer(Vec::new()),
    }
}

fn value_matches(kind: &FieldKind, value: &FieldValue) -> bool {
    match (kind, value) {
        (FieldKind::Scalar(ScalarKind::Bool), FieldValue::Bool(_)) => true,
        (FieldKind::Scalar(ScalarKind::Int), FieldValue::Int(_)) => true,
        (FieldKind::Scalar(ScalarKind::Float), FieldValue::Float(_)) => true,
        (FieldKind::Scalar(ScalarKind::GhostRef), FieldValue::GhostRef(_)) => true,
        (FieldKind::List { elem, .. }, FieldValue::List(values)) => values
            .iter()
            .all(|value| value_matches(&FieldKind::Scalar(*elem), value)),
        (FieldKind::Buffer { .. }, FieldValue::Buffer(_)) => true,
        _ => false,
    }
}

pub struct GhostTypeBuilder {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    child_sets: Vec<Vec<FieldDescriptor>>,
    is_static: bool,
}

impl GhostTypeBuilder {
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn child_set(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.child_sets.push(fields);
        self
    }

    pub fn static_optimized(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn build(self) -> GhostType {
        GhostType {
            name: self.name,
            fields: self.fields,
            child_sets: self.child_sets,
            is_static: self.is_static,
        }
    }
}
