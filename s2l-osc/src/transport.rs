//! UDP/TCP transport: send gating, `<USER>` substitution, TCP reconnect
//! state machine and the bounded in/out log.
//!
//! The UDP send path mirrors the teacher's dedicated sender pattern
//! (non-blocking `send_to` off the caller's path); the TCP reconnect timer
//! and bounded log follow the transport's own `OscNetworkManager` lifecycle
//! description in the spec rather than any one teacher file, since the
//! teacher only ever spoke UDP to a local synth engine.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use s2l_types::FramingMode;

use crate::codec::{decode_packet, encode_packet};
use crate::framing::{encode_length_prefixed, encode_slip, LengthPrefixDecoder, SlipDecoder};
use crate::parse::packet_from_string;
use crate::value::OscPacket;

const RECONNECT_INITIAL_DELAY: Duration = Duration::from_millis(20);
const RECONNECT_RETRY_DELAY: Duration = Duration::from_millis(3000);
const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Unconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp_hhmmss: String,
    pub direction: Direction,
    pub text: String,
}

/// Newest-first, capped at `MAX_LOG_ENTRIES`.
#[derive(Default)]
pub struct TransportLog {
    entries: VecDeque<LogEntry>,
    log_incoming: bool,
    log_outgoing: bool,
}

impl TransportLog {
    pub fn new(log_incoming: bool, log_outgoing: bool) -> Self {
        TransportLog { entries: VecDeque::new(), log_incoming, log_outgoing }
    }

    fn push(&mut self, direction: Direction, text: String) {
        let keep = match direction {
            Direction::In => self.log_incoming,
            Direction::Out => self.log_outgoing,
        };
        if !keep {
            return;
        }
        self.entries.push_front(LogEntry { timestamp_hhmmss: now_hhmmss(), direction, text });
        if self.entries.len() > MAX_LOG_ENTRIES {
            self.entries.pop_back();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

fn now_hhmmss() -> String {
    // Wall-clock formatting with no timezone database dependency, matching
    // the bounded log's "[HH:MM:SS]" contract without pulling in `chrono`.
    let secs_since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let secs_of_day = secs_since_epoch % 86400;
    format!("{:02}:{:02}:{:02}", secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60)
}

pub struct OscTransport {
    enabled: bool,
    use_tcp: bool,
    framing: FramingMode,
    user: String,
    tx_addr: SocketAddr,
    udp_rx: UdpSocket,
    tcp_addr: SocketAddr,
    tcp_stream: Option<TcpStream>,
    tcp_state: TcpState,
    reconnect_at: Option<Instant>,
    length_prefix_decoder: LengthPrefixDecoder,
    slip_decoder: SlipDecoder,
    pub log: TransportLog,
}

impl OscTransport {
    /// Binds the UDP receive socket eagerly; the TCP socket is connected
    /// lazily on first use (or whenever `set_use_tcp(true)` is called).
    pub fn new(udp_rx_port: u16, tx_addr: SocketAddr, tcp_addr: SocketAddr) -> std::io::Result<Self> {
        let udp_rx = UdpSocket::bind(("0.0.0.0", udp_rx_port))?;
        udp_rx.set_nonblocking(true)?;
        Ok(OscTransport {
            enabled: true,
            use_tcp: false,
            framing: FramingMode::LengthPrefix,
            user: "0".to_string(),
            tx_addr,
            udp_rx,
            tcp_addr,
            tcp_stream: None,
            tcp_state: TcpState::Unconnected,
            reconnect_at: None,
            length_prefix_decoder: LengthPrefixDecoder::new(),
            slip_decoder: SlipDecoder::new(),
            log: TransportLog::new(true, true),
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub fn set_framing(&mut self, framing: FramingMode) {
        self.framing = framing;
    }

    pub fn tcp_state(&self) -> TcpState {
        self.tcp_state
    }

    /// Tear down any existing TCP connection and schedule the initial
    /// reconnect attempt 20ms out, per the transport lifecycle.
    pub fn set_use_tcp(&mut self, use_tcp: bool) {
        self.use_tcp = use_tcp;
        self.tcp_stream = None;
        self.tcp_state = TcpState::Unconnected;
        self.reconnect_at = if use_tcp { Some(Instant::now() + RECONNECT_INITIAL_DELAY) } else { None };
    }

    /// Send a raw message string (`"/a/b/c"` or `"/a/b/c=1,2.5"`), with
    /// `<USER>` substituted before parsing/encoding. Dropped before encoding
    /// if disabled and not forced.
    pub fn send(&mut self, message_string: &str, forced: bool) {
        if !self.enabled && !forced {
            return;
        }
        let substituted = message_string.replace("<USER>", &self.user);
        let message = packet_from_string(&substituted);
        self.send_packet(&OscPacket::Message(message), forced);
    }

    pub fn send_packet(&mut self, packet: &OscPacket, forced: bool) {
        if !self.enabled && !forced {
            return;
        }
        let bytes = encode_packet(packet);
        self.dispatch_outgoing(&bytes);
    }

    fn dispatch_outgoing(&mut self, bytes: &[u8]) {
        if self.use_tcp {
            self.send_tcp(bytes);
        } else {
            match self.udp_rx.send_to(bytes, self.tx_addr) {
                Ok(_) => self.log.push(Direction::Out, describe(bytes)),
                Err(e) => log::warn!(target: "osc::transport", "udp send failed: {e}"),
            }
        }
    }

    fn send_tcp(&mut self, bytes: &[u8]) {
        if self.tcp_state != TcpState::Connected {
            // Silently dropped while unconnected, per the transport contract.
            return;
        }
        let framed = match self.framing {
            FramingMode::LengthPrefix => encode_length_prefixed(bytes),
            FramingMode::Slip => Some(encode_slip(bytes)),
        };
        let Some(framed) = framed else { return };
        let result = self.tcp_stream.as_mut().map(|s| s.write_all(&framed));
        match result {
            Some(Ok(())) => self.log.push(Direction::Out, describe(bytes)),
            Some(Err(e)) => {
                log::warn!(target: "osc::transport", "tcp write failed: {e}, scheduling reconnect");
                self.on_tcp_failure();
            }
            None => {}
        }
    }

    fn on_tcp_failure(&mut self) {
        self.tcp_stream = None;
        self.tcp_state = TcpState::Unconnected;
        self.reconnect_at = Some(Instant::now() + RECONNECT_RETRY_DELAY);
    }

    /// Drive the reconnect timer and drain any pending socket data. Call
    /// once per scheduler tick; never blocks longer than a short connect
    /// timeout.
    pub fn tick(&mut self, now: Instant) -> Vec<OscPacket> {
        if self.use_tcp {
            self.drive_reconnect(now);
        }
        let mut received = self.poll_udp();
        received.extend(self.poll_tcp());
        received
    }

    fn drive_reconnect(&mut self, now: Instant) {
        if self.tcp_state == TcpState::Connected {
            return;
        }
        let Some(at) = self.reconnect_at else { return };
        if now < at {
            return;
        }
        self.tcp_state = TcpState::Connecting;
        match TcpStream::connect_timeout(&self.tcp_addr, Duration::from_millis(50)) {
            Ok(stream) => {
                let _ = stream.set_nonblocking(true);
                self.tcp_stream = Some(stream);
                self.tcp_state = TcpState::Connected;
                self.reconnect_at = None;
            }
            Err(e) => {
                log::warn!(target: "osc::transport", "tcp connect failed: {e}");
                self.tcp_state = TcpState::Unconnected;
                self.reconnect_at = Some(now + RECONNECT_RETRY_DELAY);
            }
        }
    }

    fn poll_udp(&mut self) -> Vec<OscPacket> {
        let mut out = Vec::new();
        let mut buf = [0u8; 65536];
        loop {
            match self.udp_rx.recv_from(&mut buf) {
                Ok((n, _addr)) => match decode_packet(&buf[..n]) {
                    Ok(packet) => {
                        self.log.push(Direction::In, describe(&buf[..n]));
                        out.push(packet);
                    }
                    Err(e) => log::warn!(target: "osc::codec", "dropping malformed udp packet: {e}"),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!(target: "osc::transport", "udp recv failed: {e}");
                    break;
                }
            }
        }
        out
    }

    fn poll_tcp(&mut self) -> Vec<OscPacket> {
        let mut out = Vec::new();
        if self.tcp_state != TcpState::Connected {
            return out;
        }
        let mut buf = [0u8; 4096];
        let read_result = self.tcp_stream.as_mut().map(|s| s.read(&mut buf));
        match read_result {
            Some(Ok(0)) => self.on_tcp_failure(),
            Some(Ok(n)) => {
                let frames = match self.framing {
                    FramingMode::LengthPrefix => {
                        self.length_prefix_decoder.feed(&buf[..n]);
                        let mut frames = Vec::new();
                        while let Some(f) = self.length_prefix_decoder.poll() {
                            frames.push(f);
                        }
                        frames
                    }
                    FramingMode::Slip => self.slip_decoder.feed(&buf[..n]),
                };
                for frame in frames {
                    match decode_packet(&frame) {
                        Ok(packet) => {
                            self.log.push(Direction::In, describe(&frame));
                            out.push(packet);
                        }
                        Err(e) => log::warn!(target: "osc::codec", "dropping malformed tcp packet: {e}"),
                    }
                }
            }
            Some(Err(e)) if e.kind() == ErrorKind::WouldBlock => {}
            Some(Err(_)) => self.on_tcp_failure(),
            None => {}
        }
        out
    }
}

fn describe(bytes: &[u8]) -> String {
    match decode_packet(bytes) {
        Ok(OscPacket::Message(m)) => m.path,
        Ok(OscPacket::Bundle(_)) => "#bundle".to_string(),
        Err(_) => format!("<{} raw bytes>", bytes.len()),
    }
}

impl s2l_types::OscSink for OscTransport {
    fn send(&mut self, message: &str, forced: bool) {
        OscTransport::send(self, message, forced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_send_emits_datagram_and_disabled_drops_unless_forced() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let listener_addr = listener.local_addr().unwrap();

        let mut transport =
            OscTransport::new(0, listener_addr, "127.0.0.1:0".parse().unwrap()).unwrap();
        transport.send("/foo=1", false);

        std::thread::sleep(Duration::from_millis(20));
        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).expect("expected a datagram");
        let packet = decode_packet(&buf[..n]).unwrap();
        assert!(matches!(packet, OscPacket::Message(m) if m.path == "/foo"));

        transport.set_enabled(false);
        transport.send("/bar", false);
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(listener.recv_from(&mut buf), Err(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn disconnected_tcp_send_is_silently_dropped() {
        let mut transport =
            OscTransport::new(0, "127.0.0.1:0".parse().unwrap(), "127.0.0.1:1".parse().unwrap())
                .unwrap();
        transport.set_use_tcp(true);
        // No reconnect has run yet, so state is Unconnected.
        assert_eq!(transport.tcp_state(), TcpState::Unconnected);
        transport.send("/foo=1", false);
        // send_tcp is a no-op while unconnected; nothing to assert on the
        // wire, only that this does not panic or block.
    }

    #[test]
    fn user_substitution_applies_to_outgoing_message() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let listener_addr = listener.local_addr().unwrap();
        let mut transport =
            OscTransport::new(0, listener_addr, "127.0.0.1:0".parse().unwrap()).unwrap();
        transport.set_user("7");
        transport.send("/s2l/<USER>/out", false);

        std::thread::sleep(Duration::from_millis(20));
        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        let packet = decode_packet(&buf[..n]).unwrap();
        assert!(matches!(packet, OscPacket::Message(m) if m.path == "/s2l/7/out"));
    }

    #[test]
    fn log_is_capped_at_1000_entries() {
        let mut log = TransportLog::new(true, true);
        for i in 0..1100 {
            log.push(Direction::Out, format!("/x/{i}"));
        }
        assert_eq!(log.entries().count(), MAX_LOG_ENTRIES);
    }
}
