
pub mod common;
pub(crate) mod fields;
pub mod media;
pub mod session;
pub mod state;
