//! FastCGI 1.0 wire-protocol constants (record types, roles, the fixed
//! header layout). See the FastCGI 1.0 specification — this module only
//! names the handful of record types and the one role (`Responder`)
//! this bridge ever speaks.

pub const VERSION: u8 = 1;

pub const TYPE_BEGIN_REQUEST: u8 = 1;
pub const TYPE_ABORT_REQUEST: u8 = 2;
pub const TYPE_END_REQUEST: u8 = 3;
pub const TYPE_PARAMS: u8 = 4;
pub const TYPE_STDIN: u8 = 5;
pub const TYPE_STDOUT: u8 = 6;
pub const TYPE_STDERR: u8 = 7;

pub const ROLE_RESPONDER: u16 = 1;

/// The request id this bridge always uses. FastCGI connections may
/// multiplex several request ids over one connection, but this bridge
/// opens one connection per request and closes it when done, so reusing
/// a fixed id across calls is safe (serial, never concurrent).
pub const REQUEST_ID: u16 = 1;

/// FastCGI records pad their content to this boundary; matters only for
/// producing byte-identical output to a reference implementation, since
/// the decoder tolerates any padding length the header declares.
pub const PADDING_ALIGNMENT: usize = 8;

pub const HEADER_LEN: usize = 8;

pub fn padding_for(content_len: usize) -> u8 {
    let remainder = content_len % PADDING_ALIGNMENT;
    if remainder == 0 { 0 } else { (PADDING_ALIGNMENT - remainder) as u8 }
}
