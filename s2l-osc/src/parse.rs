//! "Smart string" helpers used by the packet-from-string convenience
//! constructor: decide whether a bare token looks like an int or a float
//! before falling back to treating it as an opaque string argument.

use crate::value::{OscMessage, OscValue};

/// Optional sign, one or more digits, nothing else — in particular no
/// trailing whitespace (a local refinement over a naive "all digits" check).
pub fn is_int_string(s: &str) -> bool {
    let s = match s.strip_prefix(['+', '-']) {
        Some(rest) => rest,
        None => s,
    };
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Like `is_int_string` but allows at most one `.` among the digits.
pub fn is_float_string(s: &str) -> bool {
    let s = match s.strip_prefix(['+', '-']) {
        Some(rest) => rest,
        None => s,
    };
    if s.is_empty() {
        return false;
    }
    let dot_count = s.bytes().filter(|&b| b == b'.').count();
    if dot_count > 1 {
        return false;
    }
    s.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// Parse `"/a/b/c"` or `"/a/b/c=arg1,arg2"` into a message: each comma
/// separated argument becomes an `Int` if it looks like one, a `Float` if
/// it looks like one, else an opaque `Str`.
pub fn packet_from_string(text: &str) -> OscMessage {
    let (path, raw_args) = match text.split_once('=') {
        Some((p, a)) => (p, Some(a)),
        None => (text, None),
    };
    let args = match raw_args {
        None => Vec::new(),
        Some(a) if a.is_empty() => Vec::new(),
        Some(a) => a
            .split(',')
            .map(|token| {
                if is_int_string(token) {
                    OscValue::Int(token.parse::<i32>().unwrap_or(0))
                } else if is_float_string(token) {
                    OscValue::Float(token.parse::<f32>().unwrap_or(0.0))
                } else {
                    OscValue::Str(token.to_string())
                }
            })
            .collect(),
    };
    OscMessage::new(path.to_string(), args)
}
