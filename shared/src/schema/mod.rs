pub mod error;
pub mod field;
pub mod ghost_type;
pub mod registry;
