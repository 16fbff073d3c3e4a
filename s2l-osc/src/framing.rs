//! TCP stream framing: length-prefix (OSC 1.0) and SLIP (OSC 1.1).
//!
//! Both decoders are incremental: bytes arrive in arbitrary chunks from a
//! socket read loop, get fed in via `feed`, and completed packets come back
//! out. Framing errors never propagate — they are logged and the decoder
//! resynchronizes, per the codec error propagation policy.

/// Incoming packets over 512 bytes are rejected; the implementation limit is
/// lower than the outgoing bound by design (see DESIGN.md Open Question a).
pub const MAX_INCOMING_LEN: usize = 512;
pub const MAX_OUTGOING_LEN: usize = 524_288;

const SLIP_END: u8 = 0xC0;
const SLIP_ESC: u8 = 0xDB;
const SLIP_ESC_END: u8 = 0xDC;
const SLIP_ESC_ESC: u8 = 0xDD;

/// Prefix `packet` with its 4-byte big-endian length. Returns `None` (and
/// logs) if `packet` exceeds the outgoing bound.
pub fn encode_length_prefixed(packet: &[u8]) -> Option<Vec<u8>> {
    if packet.len() > MAX_OUTGOING_LEN {
        log::error!(target: "osc::codec", "refusing to send {}-byte packet over outgoing bound {}", packet.len(), MAX_OUTGOING_LEN);
        return None;
    }
    let mut buf = Vec::with_capacity(4 + packet.len());
    buf.extend_from_slice(&(packet.len() as u32).to_be_bytes());
    buf.extend_from_slice(packet);
    Some(buf)
}

/// Incremental length-prefix decoder for an incoming TCP byte stream.
#[derive(Default)]
pub struct LengthPrefixDecoder {
    buf: Vec<u8>,
}

impl LengthPrefixDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop one completed packet if the buffer holds a full, valid frame.
    /// An invalid declared size drains the whole buffer and logs once.
    pub fn poll(&mut self) -> Option<Vec<u8>> {
        loop {
            if self.buf.len() < 4 {
                return None;
            }
            let declared = i32::from_be_bytes(self.buf[0..4].try_into().unwrap());
            if declared <= 0 || declared as usize > MAX_INCOMING_LEN {
                log::error!(target: "osc::codec", "invalid length-prefix {declared}, discarding stream buffer");
                self.buf.clear();
                return None;
            }
            let total = 4 + declared as usize;
            if self.buf.len() < total {
                return None;
            }
            let packet = self.buf[4..total].to_vec();
            self.buf.drain(0..total);
            return Some(packet);
        }
    }
}

/// Escape a packet for SLIP framing: `0xC0`-bracketed, with internal
/// `0xC0`/`0xDB` bytes escaped.
pub fn encode_slip(packet: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(packet.len() + 2);
    buf.push(SLIP_END);
    for &b in packet {
        match b {
            SLIP_END => {
                buf.push(SLIP_ESC);
                buf.push(SLIP_ESC_END);
            }
            SLIP_ESC => {
                buf.push(SLIP_ESC);
                buf.push(SLIP_ESC_ESC);
            }
            other => buf.push(other),
        }
    }
    buf.push(SLIP_END);
    buf
}

/// Incremental SLIP decoder. Discards bytes until a frame-start END, then
/// accumulates until the next END; consecutive ENDs (an empty frame) are
/// treated as the start of the next frame rather than yielded.
#[derive(Default)]
pub struct SlipDecoder {
    current: Vec<u8>,
    started: bool,
    escaping: bool,
}

impl SlipDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn feed_byte(&mut self, b: u8) -> Option<Vec<u8>> {
        if b == SLIP_END {
            if !self.started {
                self.started = true;
                self.current.clear();
                return None;
            }
            self.started = false;
            self.escaping = false;
            if self.current.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.current));
        }
        if !self.started {
            return None;
        }
        if self.escaping {
            self.escaping = false;
            match b {
                SLIP_ESC_END => self.current.push(SLIP_END),
                SLIP_ESC_ESC => self.current.push(SLIP_ESC),
                other => self.current.push(other),
            }
            return None;
        }
        if b == SLIP_ESC {
            self.escaping = true;
            return None;
        }
        self.current.push(b);
        None
    }

    /// Feed a chunk of bytes, returning every packet completed by it, in order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for &b in data {
            if let Some(packet) = self.feed_byte(b) {
                out.push(packet);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_roundtrip() {
        let packet = b"/a/b\0\0\0\0,i\0\0\0\0\0\x01".to_vec();
        let framed = encode_length_prefixed(&packet).unwrap();
        let mut decoder = LengthPrefixDecoder::new();
        decoder.feed(&framed);
        assert_eq!(decoder.poll(), Some(packet));
    }

    #[test]
    fn length_prefix_partial_feed_waits_for_more() {
        let packet = vec![1u8; 16];
        let framed = encode_length_prefixed(&packet).unwrap();
        let mut decoder = LengthPrefixDecoder::new();
        decoder.feed(&framed[..6]);
        assert_eq!(decoder.poll(), None);
        decoder.feed(&framed[6..]);
        assert_eq!(decoder.poll(), Some(packet));
    }

    #[test]
    fn length_prefix_rejects_oversized_incoming_and_resyncs() {
        let mut decoder = LengthPrefixDecoder::new();
        let mut bad = (600i32).to_be_bytes().to_vec();
        bad.extend_from_slice(&[0u8; 10]);
        decoder.feed(&bad);
        assert_eq!(decoder.poll(), None);

        let packet = b"ok".to_vec();
        let framed = encode_length_prefixed(&packet).unwrap();
        decoder.feed(&framed);
        assert_eq!(decoder.poll(), Some(packet));
    }

    #[test]
    fn length_prefix_rejects_zero_and_negative() {
        let mut decoder = LengthPrefixDecoder::new();
        decoder.feed(&0i32.to_be_bytes());
        assert_eq!(decoder.poll(), None);

        let mut decoder2 = LengthPrefixDecoder::new();
        decoder2.feed(&(-1i32).to_be_bytes());
        assert_eq!(decoder2.poll(), None);
    }

    #[test]
    fn encode_length_prefixed_rejects_over_outgoing_bound() {
        let huge = vec![0u8; MAX_OUTGOING_LEN + 1];
        assert!(encode_length_prefixed(&huge).is_none());
    }

    #[test]
    fn slip_resyncs_past_leading_garbage() {
        // garbage ++ END ++ P ++ END
        let payload = vec![1u8, 2, 3, 4, 5];
        let mut stream = vec![0xFFu8, 0xAA, 0xC0];
        stream.extend_from_slice(&payload);
        stream.push(0xC0);
        let mut decoder = SlipDecoder::new();
        let frames = decoder.feed(&stream);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn slip_escapes_internal_end_and_esc_bytes() {
        let payload = vec![0xC0, 0x01, 0xDB, 0x02];
        let framed = encode_slip(&payload);
        let mut decoder = SlipDecoder::new();
        let frames = decoder.feed(&framed);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn slip_handles_fragmented_feed() {
        let payload = vec![9u8, 8, 7];
        let framed = encode_slip(&payload);
        let mut decoder = SlipDecoder::new();
        let mut frames = decoder.feed(&framed[..2]);
        assert!(frames.is_empty());
        frames = decoder.feed(&framed[2..]);
        assert_eq!(frames, vec![payload]);
    }
}
