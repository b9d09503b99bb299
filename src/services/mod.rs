pub mod db;
pub mod history_store;
pub mod inference_client;
pub mod report;
pub mod session;
pub mod upload;
