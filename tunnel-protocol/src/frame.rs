use bytes::{Bytes, BytesMut};

use crate::config::TunnelInit;
use crate::error::ProtocolError;

/// Tag byte identifying an `Init` frame on the wire.
const TAG_INIT: u8 = 0;
/// Tag byte identifying a `Payload` frame on the wire.
const TAG_PAYLOAD: u8 = 1;

/// A frame as it exists on the wire: a tag byte followed by a body.
///
/// `Frame` wraps the exact bytes the transport will send or has just
/// produced. Building one (`encode_init`/`encode_payload`) allocates once;
/// classifying one (`classify`) never copies the payload body — it slices
/// the same underlying buffer.
#[derive(Debug, Clone)]
pub struct Frame(Bytes);

/// The result of [`Frame::classify`].
#[derive(Debug)]
pub enum Classified {
    /// The mandatory first frame of a session.
    Init(TunnelInit),
    /// Opaque application bytes. Aliases the transport's own buffer — see
    /// the zero-copy contract in the crate-level docs.
    Payload(Bytes),
    /// A structurally valid frame whose tag this codec doesn't recognize.
    /// The receive path skips these silently so newer peers can add frame
    /// kinds without breaking older ones.
    Other,
}

impl Frame {
    /// Encodes a [`TunnelInit`] as the wire representation of an `Init` frame.
    pub fn encode_init(init: &TunnelInit) -> Result<Frame, ProtocolError> {
        let body = bincode::serialize(init)?;
        let mut buf = BytesMut::with_capacity(1 + body.len());
        buf.extend_from_slice(&[TAG_INIT]);
        buf.extend_from_slice(&body);
        Ok(Frame(buf.freeze()))
    }

    /// Encodes opaque application bytes as the wire representation of a
    /// `Payload` frame. Accepts anything convertible to [`Bytes`] so callers
    /// holding a `Vec<u8>` or a `&'static [u8]` don't need to copy twice.
    pub fn encode_payload(payload: impl Into<Bytes>) -> Frame {
        let payload = payload.into();
        let mut buf = BytesMut::with_capacity(1 + payload.len());
        buf.extend_from_slice(&[TAG_PAYLOAD]);
        buf.extend_from_slice(&payload);
        Frame(buf.freeze())
    }

    /// Wraps a raw wire-format buffer received from the transport. Does not
    /// validate or copy; validation happens in [`Frame::classify`].
    pub fn from_wire(bytes: Bytes) -> Frame {
        Frame(bytes)
    }

    /// Returns the raw wire-format bytes, ready to hand to the transport's
    /// send path.
    pub fn into_wire(self) -> Bytes {
        self.0
    }

    /// Classifies the frame, consuming it. The `Payload` case returns a
    /// slice of the same buffer this `Frame` wrapped — no `memcpy`.
    pub fn classify(self) -> Result<Classified, ProtocolError> {
        let mut buf = self.0;
        if buf.is_empty() {
            return Err(ProtocolError::Truncated);
        }
        let tag = buf[0];
        // `split_off` advances the shared buffer's start pointer; it does
        // not allocate or copy the remainder.
        let rest = buf.split_off(1);
        match tag {
            TAG_INIT => {
                let init: TunnelInit = bincode::deserialize(&rest)?;
                Ok(Classified::Init(init))
            }
            TAG_PAYLOAD => Ok(Classified::Payload(rest)),
            _ => Ok(Classified::Other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Operation, TunnelConfig};

    fn sample_init() -> TunnelInit {
        TunnelConfig::new("sess-1", "cookie-1", "wf-1", Operation::exec("/bin/cat"))
            .unwrap()
            .to_init()
    }

    #[test]
    fn init_round_trips() {
        let init = sample_init();
        let frame = Frame::encode_init(&init).unwrap();
        match frame.classify().unwrap() {
            Classified::Init(decoded) => assert_eq!(decoded, init),
            other => panic!("expected Init, got {other:?}"),
        }
    }

    #[test]
    fn payload_round_trips_including_empty() {
        for data in [&b""[..], &b"hello\n"[..], &[0xff, 0x00, 0x80][..]] {
            let frame = Frame::encode_payload(Bytes::copy_from_slice(data));
            match frame.classify().unwrap() {
                Classified::Payload(bytes) => assert_eq!(&bytes[..], data),
                other => panic!("expected Payload, got {other:?}"),
            }
        }
    }

    #[test]
    fn payload_classify_is_zero_copy() {
        let data = Bytes::from_static(b"the quick brown fox");
        let frame = Frame::encode_payload(data.clone());
        let wire = frame.into_wire();
        // The payload body within the wire buffer is the tail of `wire`,
        // sharing its allocation (same pointer, shifted by the tag byte).
        let frame = Frame::from_wire(wire.clone());
        if let Classified::Payload(payload) = frame.classify().unwrap() {
            assert_eq!(payload.as_ptr(), wire[1..].as_ptr());
        } else {
            panic!("expected Payload");
        }
    }

    #[test]
    fn unknown_tag_is_other() {
        let frame = Frame::from_wire(Bytes::from_static(&[0xaa, 1, 2, 3]));
        assert!(matches!(frame.classify().unwrap(), Classified::Other));
    }

    #[test]
    fn empty_frame_is_truncated_error() {
        let frame = Frame::from_wire(Bytes::new());
        assert!(matches!(frame.classify(), Err(ProtocolError::Truncated)));
    }
}
