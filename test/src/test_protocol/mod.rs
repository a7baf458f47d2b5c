/// Minimal test protocol for E2E testing

use wraith_shared::{
    FieldDescriptor, FieldValue, GhostState, GhostType, GhostTypeId, OwnerSendType,
    RpcDescriptor, ScalarKind, SchemaRegistry,
};

// Type ids are positions in name order, regardless of registration order.
pub const MARKER: GhostTypeId = GhostTypeId::new(0);
pub const POSITION: GhostTypeId = GhostTypeId::new(1);
pub const UNIT: GhostTypeId = GhostTypeId::new(2);
pub const VEHICLE: GhostTypeId = GhostTypeId::new(3);

pub const INVENTORY_CAPACITY: usize = 8;
pub const NAME_CAPACITY: usize = 16;

fn position_type() -> GhostType {
    GhostType::builder("Position")
        .field(FieldDescriptor::scalar("x", ScalarKind::Float).with_quantize(10.0))
        .field(FieldDescriptor::scalar("y", ScalarKind::Float).with_quantize(10.0))
        .build()
}

fn unit_type() -> GhostType {
    GhostType::builder("Unit")
        .field(FieldDescriptor::scalar("health", ScalarKind::Int))
        .field(
            FieldDescriptor::scalar("secret", ScalarKind::Int)
                .with_owner_rule(OwnerSendType::SendToOwner),
        )
        .field(FieldDescriptor::list(
            "inventory",
            ScalarKind::Int,
            INVENTORY_CAPACITY,
        ))
        .field(FieldDescriptor::buffer_with_capacity("name", NAME_CAPACITY))
        .build()
}

fn vehicle_type() -> GhostType {
    GhostType::builder("Vehicle")
        .field(FieldDescriptor::scalar("speed", ScalarKind::Float).with_quantize(10.0))
        .child_set(vec![
            FieldDescriptor::scalar("turret_angle", ScalarKind::Float)
                .with_quantize(10.0)
                .with_send_for_children(),
            // no send_for_children: stays local to the sender
            FieldDescriptor::scalar("turret_ammo", ScalarKind::Int),
        ])
        .build()
}

fn marker_type() -> GhostType {
    GhostType::builder("Marker")
        .field(FieldDescriptor::scalar("kind", ScalarKind::Int))
        .static_optimized()
        .build()
}

pub fn protocol() -> SchemaRegistry {
    protocol_with_game_version(1)
}

/// The canonical test protocol under a different game version. Useful for
/// provoking a version reject with matching schemas.
pub fn protocol_with_game_version(game_version: u32) -> SchemaRegistry {
    let mut builder = SchemaRegistry::builder(1, game_version);
    builder.add_ghost_type(position_type()).unwrap();
    builder.add_ghost_type(unit_type()).unwrap();
    builder.add_ghost_type(marker_type()).unwrap();
    builder.add_ghost_type(vehicle_type()).unwrap();
    builder
        .add_rpc(RpcDescriptor::new("fire", vec![ScalarKind::Int]))
        .unwrap();
    builder.build()
}

/// Same ghost types registered in a different order. Must hash identically
/// to `protocol()`.
pub fn protocol_reordered() -> SchemaRegistry {
    let mut builder = SchemaRegistry::builder(1, 1);
    builder.add_ghost_type(vehicle_type()).unwrap();
    builder.add_ghost_type(marker_type()).unwrap();
    builder.add_ghost_type(position_type()).unwrap();
    builder.add_ghost_type(unit_type()).unwrap();
    builder
        .add_rpc(RpcDescriptor::new("fire", vec![ScalarKind::Int]))
        .unwrap();
    builder.build()
}

/// A protocol whose Unit component differs from `protocol()`. Handshakes
/// against `protocol()` must be rejected with a component hash mismatch.
pub fn protocol_modified_unit() -> SchemaRegistry {
    let mut builder = SchemaRegistry::builder(1, 1);
    builder.add_ghost_type(position_type()).unwrap();
    builder
        .add_ghost_type(
            GhostType::builder("Unit")
                .field(FieldDescriptor::scalar("health", ScalarKind::Float))
                .build(),
        )
        .unwrap();
    builder.add_ghost_type(marker_type()).unwrap();
    builder.add_ghost_type(vehicle_type()).unwrap();
    builder
        .add_rpc(RpcDescriptor::new("fire", vec![ScalarKind::Int]))
        .unwrap();
    builder.build()
}

pub fn position_state(x: f32, y: f32) -> GhostState {
    GhostState {
        fields: vec![FieldValue::Float(x), FieldValue::Float(y)],
        children: Vec::new(),
    }
}

pub fn unit_state(health: i64, secret: i64, inventory: Vec<i64>, name: &str) -> GhostState {
    GhostState {
        fields: vec![
            FieldValue::Int(health),
            FieldValue::Int(secret),
            FieldValue::List(inventory.into_iter().map(FieldValue::Int).collect()),
            FieldValue::Buffer(name.as_bytes().to_vec()),
        ],
        children: Vec::new(),
    }
}

pub fn vehicle_state(speed: f32, turret_angle: f32, turret_ammo: i64) -> GhostState {
    GhostState {
        fields: vec![FieldValue::Float(speed)],
        children: vec![vec![
            FieldValue::Float(turret_angle),
            FieldValue::Int(turret_ammo),
        ]],
    }
}

pub fn marker_state(kind: i64) -> GhostState {
    GhostState {
        fields: vec![FieldValue::Int(kind)],
        children: Vec::new(),
    }
}
