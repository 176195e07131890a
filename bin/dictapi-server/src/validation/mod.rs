//! Request validation.
//!
//! [`method::guard`] runs first; [`upload::validate`] only sees requests
//! that passed it. Both return a [`crate::error::Problem`] on the first
//! failure.

pub mod method;
pub mod upload;

pub use upload::Conversion;
