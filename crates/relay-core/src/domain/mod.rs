//! Domain model (messages, unit response, type keys, errors).

pub mod errors;
pub mod message;
pub mod unit;

pub use self::errors::{AggregateError, BoxError, HandlerFailure, HandlerPanicked, HandlerResult, MediatorError};
pub use self::message::{Notification, Request, RequestKey, TypeKey};
pub use self::unit::Unit;
