//! FastCGI 1.0 record codec: builds the `BEGIN_REQUEST`/`PARAMS`/`STDIN`
//! byte stream a responder expects and decodes its `STDOUT`/`STDERR`/
//! `END_REQUEST` reply. Pure encode/decode — no I/O; see [`crate::transport`]
//! for the socket side.

mod codec;
mod protocol;
mod request;
mod response;

pub use codec::{decode_response, encode_request};
pub use request::FastCgiRequest;
pub use response::FastCgiResponse;
