pub mod change_mask;
pub mod delta;
pub mod dynamic;
pub mod error;
pub mod filter;
pub mod group;
pub mod history;
pub mod value;
