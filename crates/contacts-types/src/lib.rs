pub mod api;
pub mod email;
pub mod models;
