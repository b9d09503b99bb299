pub mod classify_types;
pub mod history_types;
pub mod session_types;
