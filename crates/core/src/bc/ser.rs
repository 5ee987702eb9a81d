use super::model::*;
use cookie_factory::bytes::*;
use cookie_factory::sequence::tuple;
use cookie_factory::{combinator::*, gen};
use cookie_factory::{GenError, SerializeFn, WriteContext};
use err_derive::Error;
use std::io::Write;

/// The error types used during serialisation
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// A Cookie Factor  GenError
    #[error(display = "Cookie GenError")]
    GenError(#[error(source)] std::sync::Arc<GenError>),
}

impl From<GenError> for Error {
    fn from(k: GenError) -> Self {
        Error::GenError(std::sync::Arc::new(k))
    }
}

impl Bc {
    pub(crate) fn serialize<W: Write>(&self, buf: W) -> Result<W, Error> {
        let header = BcHeader {
            body_len: self.body.len() as u32,
            ..self.header.clone()
        };
        let (buf, _n) = gen(tuple((bc_header(&header), slice(&self.body))), buf)?;
        Ok(buf)
    }
}

fn bc_header<W: Write>(header: &BcHeader) -> impl SerializeFn<W> {
    tuple((
        le_u32(MAGIC_HEADER),
        le_u32(header.msg_id),
        le_u32(header.body_len),
        le_u32(header.enc_offset),
        le_u16(header.response_code),
        le_u16(header.class),
        opt(header.payload_offset, le_u32),
    ))
}

/// Applies the supplied serializer with the Option's interior data if present
fn opt<W, T, F>(opt: Option<T>, ser: impl Fn(T) -> F) -> impl SerializeFn<W>
where
    F: SerializeFn<W>,
    T: Copy,
    W: Write,
{
    move |buf: WriteContext<W>| {
        if let Some(val) = opt {
            ser(val)(buf)
        } else {
            do_nothing()(buf)
        }
    }
}

/// A serializer combinator that does nothing with its input
fn do_nothing<W>() -> impl SerializeFn<W> {
    Ok
}

#[test]
fn test_nonce_request_header() {
    let msg = Bc::new_request(MSG_ID_LOGIN, CLASS_LEGACY, 0, 0, vec![]);
    let buf = msg.serialize(vec![]).unwrap();

    assert_eq!(
        buf,
        vec![
            0xf0, 0xde, 0xbc, 0x0a, // magic
            0x01, 0x00, 0x00, 0x00, // cmd id
            0x00, 0x00, 0x00, 0x00, // length
            0x00, 0x00, 0x00, 0x00, // encryption offset
            0x12, 0xdc, 0x14, 0x65, // status and class
        ]
    );
}

#[test]
fn test_modern_header_has_payload_offset() {
    let msg = Bc::new_request(MSG_ID_GET_PORTS, CLASS_MODERN, 5, 3, vec![1, 2, 3, 4]);
    let buf = msg.serialize(vec![]).unwrap();

    assert_eq!(buf.len(), 24 + 4);
    assert_eq!(&buf[4..8], &[37, 0, 0, 0]);
    assert_eq!(&buf[8..12], &[4, 0, 0, 0]);
    assert_eq!(&buf[12..16], &[5, 0, 0, 0]);
    assert_eq!(&buf[16..20], &[0x00, 0x00, 0x14, 0x64]);
    assert_eq!(&buf[20..24], &[3, 0, 0, 0]);
    assert_eq!(&buf[24..], &[1, 2, 3, 4]);
}
