pub mod in_memory;
pub mod models;
pub mod order_repo;
pub mod paytm;
pub mod price_repo;
pub mod user_repo;
