//! Credential models and the bearer attacher.

pub mod attach;
pub mod token;

pub use attach::*;
pub use token::{access::*, credentials::*, secret::*};
