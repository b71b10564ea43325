mod color;
mod message;
pub mod simplify;
mod stroke_store;
mod types;

pub use color::*;
pub use message::*;
pub use simplify::{simplify, simplify_positions};
pub use stroke_store::*;
pub use types::*;

pub extern crate chrono;
pub extern crate euclid;
pub extern crate serde;
pub extern crate serde_json;
