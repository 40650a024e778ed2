//! Wire codecs: the Cube2 text encoding and the UDP query-reply format built
//! on top of it.

pub mod cube2;
pub mod query;

pub use query::{QueryError, QueryReply, PROBE_REQUEST};
