pub mod bybit_client;
pub mod mock_exchange_client;
