//! Create a tokio encoder/decoder for turning a AsyncRead/Write stream into
//! a Bc packet
//!
//! BcCodex is used with a `[tokio_util::codec::Framed]` to form complete packets
//!
use super::de::Error as DeError;
use crate::bc::model::*;
use crate::{Error, Result};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Default)]
pub(crate) struct BcCodex {}

impl BcCodex {
    pub(crate) fn new() -> Self {
        Default::default()
    }
}

impl Encoder<Bc> for BcCodex {
    type Error = Error;

    fn encode(&mut self, item: Bc, dst: &mut BytesMut) -> Result<()> {
        let buf: Vec<u8> = Default::default();
        let buf = item.serialize(buf)?;
        dst.reserve(buf.len());
        dst.extend_from_slice(buf.as_slice());
        Ok(())
    }
}

impl Decoder for BcCodex {
    type Item = Bc;
    type Error = Error;
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match Bc::deserialize(&src[..]) {
            Ok((bc, used)) => {
                src.advance(used);
                Ok(Some(bc))
            }
            Err(DeError::NomIncomplete(needed)) => {
                src.reserve(needed);
                Ok(None)
            }
            Err(e) => {
                // Nothing after a corrupt header can be trusted
                src.clear();
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_split_frames() {
        let first = Bc::new_request(MSG_ID_GET_PORTS, CLASS_MODERN, 0, 0, vec![1, 2, 3]);
        let second = Bc::new_request(MSG_ID_DEVICE_INFO, CLASS_MODERN, 0, 0, vec![4]);

        let mut codex = BcCodex::new();
        let mut wire = BytesMut::new();
        codex.encode(first.clone(), &mut wire).unwrap();
        codex.encode(second.clone(), &mut wire).unwrap();

        let mut src = BytesMut::new();
        src.extend_from_slice(&wire[..10]);
        assert!(codex.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(&wire[10..]);
        assert_eq!(codex.decode(&mut src).unwrap(), Some(first));
        assert_eq!(codex.decode(&mut src).unwrap(), Some(second));
        assert!(codex.decode(&mut src).unwrap().is_none());
    }
}
