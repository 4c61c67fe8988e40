//! Request builder modules
//!
//! Fluent construction of queue-ready requests: headers, authentication,
//! bodies and scheduling options, finished by a method-named terminal.

pub mod auth;
pub mod body;
pub mod core;
pub mod headers;
pub mod methods;

pub use self::core::*;
pub use headers::*;
pub use methods::*;
