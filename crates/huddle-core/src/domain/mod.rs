pub mod channel;
pub mod error;
pub mod identity;
pub mod signal;
