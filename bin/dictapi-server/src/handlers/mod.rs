//! Request processing behind the routes.

pub mod convert;
