pub mod contacts;
pub mod error;
pub mod media;
pub mod notify;
pub mod router;
pub mod state;
pub mod verification;
