//! Request and response model shared by the worker, the cache and the network client.
//!
//! These mirror the subset of the Fetch API the agent relies on: a method, an
//! absolute URL, a request mode (to tell navigations apart), headers and a body.

pub mod request;
pub mod response;

pub use request::{Method, Request, RequestMode};
pub use response::Response;
