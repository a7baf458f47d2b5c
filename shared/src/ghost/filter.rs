use crate::schema::{
    field::{FieldDescriptor, OwnerSendType, SendOptimization},
    ghost_type::GhostType,
};

/// How the receiving client simulates this ghost. Drives the
/// `OnlyInterpolated` / `OnlyPredicted` send rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictionMode {
    Interpolated,
    Predicted,
}

/// Everything the relevancy decision knows about one (ghost, connection)
/// pairing this tick.
#[derive(Clone, Copy, Debug)]
pub struct SendContext {
    pub is_owner: bool,
    pub prediction: PredictionMode,
}

/// The relevancy/ownership decision for one field: pure function of the
/// field's rules and the receiver's context, no other state.
pub fn should_send_field(descriptor: &FieldDescriptor, is_root: bool, ctx: &SendContext) -> bool {
    if !is_root && !descriptor.send_for_children {
        return false;
    }

    let owner_allows = match descriptor.owner_rule {
        OwnerSendType::None => false,
        OwnerSendType::SendToOwner => ctx.is_owner,
        OwnerSendType::SendToNonOwner => !ctx.is_owner,
        OwnerSendType::All => true,
    };
    if !owner_allows {
        return false;
    }

    match descriptor.send_rule {
        SendOptimization::DontSend => false,
        SendOptimization::OnlyInterpolated => ctx.prediction == PredictionMode::Interpolated,
        SendOptimization::OnlyPredicted => ctx.prediction == PredictionMode::Predicted,
        SendOptimization::AllClients => true,
    }
}

/// Whether a ghost of this type may skip resending while unchanged.
/// Group members and types with replicated child fields must degrade to
/// always-dynamic behavior.
pub fn replicates_statically(ghost_type: &GhostType, is_group_member: bool) -> bool {
    ghost_type.is_static() && !is_group_member && !ghost_type.has_child_fields()
}
