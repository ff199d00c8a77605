//! # HTTP Values
//!
//! Normalized request and response values exchanged between a transport driver and the
//! dispatch core. The core never sees sockets or wire framing: a driver parses the raw
//! request into a [`RequestContext`] and serializes the returned [`Response`].
//!
//! Both types use stack-allocated vectors (`SmallVec`) for parameters and headers so that
//! typical requests do not allocate per header.

mod request;
mod response;

pub use request::{HeaderVec, ParamVec, RequestContext, RequestContextBuilder, RequestId};
pub use response::{CookieOptions, Response, SameSite};

/// Maximum number of path/query parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum number of headers/cookies stored inline before spilling to the heap.
pub const MAX_INLINE_HEADERS: usize = 16;
