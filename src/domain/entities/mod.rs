pub mod balance;
pub mod order;
pub mod position;
pub mod signal;
