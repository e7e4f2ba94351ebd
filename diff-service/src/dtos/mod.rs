pub mod diff;

pub use diff::{DiffRequest, DiffResponse};
