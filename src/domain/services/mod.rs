pub mod close_gateway;
pub mod order_gateway;
pub mod position_sizer;
pub mod symbol_lock;
