pub mod file_store;
pub mod gateway;
pub mod health;
pub mod reporter;
pub mod storage_up;
