//! OSC packet encode/decode, built on `rosc`'s own `OscType`/`OscMessage`/
//! `OscPacket` machinery rather than hand-rolled byte shuffling.
//!
//! This crate keeps its own flatter `OscValue`/`OscMessage`/`OscBundle`
//! shape (matching the type-tag table this crate's callers dispatch on), so
//! this module is mostly a conversion layer between that shape and rosc's,
//! plus the mapping the `r`/`m`/`t`/`c` tags need: rosc represents
//! Color/Midi/Time/Char as small structs and a `char`, while this crate
//! represents each as a plain `i32`/`u64`.

use rosc::{OscBundle as RoscBundle, OscColor, OscMessage as RoscMessage, OscMidiMessage, OscPacket as RoscPacket, OscTime, OscType};

use crate::error::OscError;
use crate::value::{OscBundle, OscMessage, OscPacket, OscValue};

fn to_rosc_type(value: &OscValue) -> OscType {
    match value {
        OscValue::Char(v) => OscType::Char(char::from_u32(*v as u32).unwrap_or('\0')),
        OscValue::Int(v) => OscType::Int(*v),
        OscValue::Long(v) => OscType::Long(*v),
        OscValue::Float(v) => OscType::Float(*v),
        OscValue::Double(v) => OscType::Double(*v),
        OscValue::Str(s) => OscType::String(s.clone()),
        OscValue::Blob(b) => OscType::Blob(b.clone()),
        OscValue::Time(t) => OscType::Time(OscTime { seconds: (*t >> 32) as u32, fractional: *t as u32 }),
        OscValue::Rgba(v) => {
            let [red, green, blue, alpha] = v.to_be_bytes();
            OscType::Color(OscColor { red, green, blue, alpha })
        }
        OscValue::Midi(v) => {
            let [port, status, data1, data2] = v.to_be_bytes();
            OscType::Midi(OscMidiMessage { port, status, data1, data2 })
        }
        OscValue::True => OscType::Bool(true),
        OscValue::False => OscType::Bool(false),
        OscValue::Nil => OscType::Nil,
        OscValue::Inf => OscType::Inf,
    }
}

fn from_rosc_type(value: OscType) -> Result<OscValue, OscError> {
    Ok(match value {
        OscType::Char(c) => OscValue::Char(c as i32),
        OscType::Int(v) => OscValue::Int(v),
        OscType::Long(v) => OscValue::Long(v),
        OscType::Float(v) => OscValue::Float(v),
        OscType::Double(v) => OscValue::Double(v),
        OscType::String(s) => OscValue::Str(s),
        OscType::Blob(b) => OscValue::Blob(b),
        OscType::Time(t) => OscValue::Time(((t.seconds as u64) << 32) | t.fractional as u64),
        OscType::Color(c) => OscValue::Rgba(i32::from_be_bytes([c.red, c.green, c.blue, c.alpha])),
        OscType::Midi(m) => OscValue::Midi(i32::from_be_bytes([m.port, m.status, m.data1, m.data2])),
        OscType::Bool(true) => OscValue::True,
        OscType::Bool(false) => OscValue::False,
        OscType::Nil => OscValue::Nil,
        OscType::Inf => OscValue::Inf,
        OscType::Array(_) => return Err(OscError::UnsupportedArgument('[')),
    })
}

fn to_rosc_message(msg: &OscMessage) -> RoscMessage {
    RoscMessage { addr: msg.path.clone(), args: msg.args.iter().map(to_rosc_type).collect() }
}

fn from_rosc_message(msg: RoscMessage) -> Result<OscMessage, OscError> {
    let args = msg.args.into_iter().map(from_rosc_type).collect::<Result<Vec<_>, _>>()?;
    Ok(OscMessage { path: msg.addr, args })
}

fn to_rosc_bundle(bundle: &OscBundle) -> RoscBundle {
    RoscBundle {
        timetag: OscTime { seconds: (bundle.timetag >> 32) as u32, fractional: bundle.timetag as u32 },
        content: bundle.elements.iter().map(to_rosc_packet).collect(),
    }
}

fn from_rosc_bundle(bundle: RoscBundle) -> Result<OscBundle, OscError> {
    let elements = bundle.content.into_iter().map(from_rosc_packet).collect::<Result<Vec<_>, _>>()?;
    let timetag = ((bundle.timetag.seconds as u64) << 32) | bundle.timetag.fractional as u64;
    Ok(OscBundle { timetag, elements })
}

fn to_rosc_packet(packet: &OscPacket) -> RoscPacket {
    match packet {
        OscPacket::Message(m) => RoscPacket::Message(to_rosc_message(m)),
        OscPacket::Bundle(b) => RoscPacket::Bundle(to_rosc_bundle(b)),
    }
}

fn from_rosc_packet(packet: RoscPacket) -> Result<OscPacket, OscError> {
    Ok(match packet {
        RoscPacket::Message(m) => OscPacket::Message(from_rosc_message(m)?),
        RoscPacket::Bundle(b) => OscPacket::Bundle(from_rosc_bundle(b)?),
    })
}

fn encode_or_log(packet: RoscPacket) -> Vec<u8> {
    match rosc::encoder::encode(&packet) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!(target: "osc::codec", "failed to encode outgoing packet: {e}");
            Vec::new()
        }
    }
}

/// Encode a single OSC message: address, type-tag string, then arguments.
pub fn encode_message(msg: &OscMessage) -> Vec<u8> {
    encode_or_log(RoscPacket::Message(to_rosc_message(msg)))
}

/// Encode a bundle: literal, timetag, then each element length-prefixed.
pub fn encode_bundle(bundle: &OscBundle) -> Vec<u8> {
    encode_or_log(RoscPacket::Bundle(to_rosc_bundle(bundle)))
}

pub fn encode_packet(packet: &OscPacket) -> Vec<u8> {
    encode_or_log(to_rosc_packet(packet))
}

/// Decode a single, already-delimited OSC packet (message or bundle,
/// recursively). Callers that read from a byte stream must first use the
/// appropriate framing decoder (see `framing.rs`) to delimit one packet.
pub fn decode_packet(bytes: &[u8]) -> Result<OscPacket, OscError> {
    let (_, packet) =
        rosc::decoder::decode_udp(bytes).map_err(|e| OscError::MalformedPacket(e.to_string()))?;
    from_rosc_packet(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_message_s4_scenario() {
        let msg = OscMessage::new("/foo", vec![OscValue::Int(1), OscValue::Float(2.5), OscValue::Str("hi".into())]);
        let bytes = encode_message(&msg);
        assert_eq!(
            bytes,
            [
                b"/foo\0\0\0\0".as_slice(),
                b",isf\0\0\0\0".as_slice(),
                &1i32.to_be_bytes(),
                &2.5f32.to_be_bytes(),
                b"hi\0\0".as_slice(),
            ]
            .concat()
        );
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, OscPacket::Message(msg));
    }

    #[test]
    fn roundtrip_all_supported_types() {
        let msg = OscMessage::new(
            "/s2l/all",
            vec![
                OscValue::Char(65),
                OscValue::Int(-7),
                OscValue::Long(1_000_000_000_000),
                OscValue::Float(1.5),
                OscValue::Double(2.25),
                OscValue::Str("abc".into()),
                OscValue::Blob(vec![1, 2, 3, 4, 5]),
                OscValue::Time(42),
                OscValue::Rgba(0x11223344u32 as i32),
                OscValue::Midi(0x01020304u32 as i32),
                OscValue::True,
                OscValue::False,
                OscValue::Nil,
                OscValue::Inf,
            ],
        );
        let bytes = encode_message(&msg);
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, OscPacket::Message(msg));
    }

    #[test]
    fn bundle_roundtrip_with_nested_bundle() {
        let inner = OscBundle {
            timetag: 7,
            elements: vec![OscPacket::Message(OscMessage::new("/a", vec![OscValue::Int(1)]))],
        };
        let outer = OscBundle {
            timetag: 99,
            elements: vec![
                OscPacket::Message(OscMessage::new("/b", vec![])),
                OscPacket::Bundle(inner),
            ],
        };
        let bytes = encode_bundle(&outer);
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, OscPacket::Bundle(outer));
    }

    #[test]
    fn bundle_with_oversized_declared_length_is_rejected() {
        let mut bytes = b"#bundle\0".to_vec();
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&999i32.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(err, OscError::MalformedPacket(_)));
    }

    #[test]
    fn unterminated_address_is_malformed_packet() {
        let bytes = vec![b'/', b'a', b'b', b'c'];
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(err, OscError::MalformedPacket(_)));
    }
}
