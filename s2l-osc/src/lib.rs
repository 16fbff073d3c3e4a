//! # s2l-osc
//!
//! OSC 1.0/1.1 wire codec, TCP stream framing (length-prefix and SLIP) and
//! the UDP/TCP transport that sits on top of them.

mod codec;
mod error;
mod framing;
mod parse;
mod transport;
mod value;

pub use codec::{decode_packet, encode_bundle, encode_message, encode_packet};
pub use error::OscError;
pub use framing::{
    encode_length_prefixed, encode_slip, LengthPrefixDecoder, SlipDecoder, MAX_INCOMING_LEN,
    MAX_OUTGOING_LEN,
};
pub use parse::{is_float_string, is_int_string, packet_from_string};
pub use transport::{Direction, LogEntry, OscTransport, TcpState, TransportLog};
pub use value::{OscBundle, OscMessage, OscPacket, OscValue};
