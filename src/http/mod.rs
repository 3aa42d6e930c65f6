//! Request/response value types and the network collaborator.
//!
//! Responses are captured once into an immutable [`ResponseSnapshot`]; handing
//! the same response to the caller and to the cache is an explicit clone of the
//! snapshot, never a second read of a body stream.

mod fetch;
mod request;
mod response;

pub use fetch::{Fetcher, HttpFetcher};
pub use request::{Destination, Request, RequestKey};
pub use response::{ResponseKind, ResponseSnapshot};
