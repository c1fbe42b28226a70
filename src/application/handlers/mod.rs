pub mod signal_handler;
