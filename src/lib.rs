#![warn(rust_2018_idioms)]

pub mod description;
pub mod util;

mod error;
pub(crate) mod lexer;

pub use description::media::MediaDescription;
pub use description::session::SessionDescription;
pub use error::{Error, Result};
pub use util::{Codec, ConnectionRole};
