//! Data models for the turnero server

pub mod catalog;
pub mod chat;
pub mod device;
pub mod staff;
pub mod turn;

// Re-export commonly used types
pub use catalog::Catalog;
pub use chat::{ChatMessage, ChatOrigin};
pub use device::{DeviceRegistration, Platform};
pub use staff::{Role, StaffUser};
pub use turn::{Turn, TurnDetails, TurnFilter, TurnState};
