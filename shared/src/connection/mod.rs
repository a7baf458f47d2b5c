pub mod disconnect_reason;
pub mod messages;
pub mod packet_type;
