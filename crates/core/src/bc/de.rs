use super::model::*;
use err_derive::Error;
use nom::{
    bytes::streaming::take, combinator::*, error::context as error_context, number::streaming::*,
    sequence::*,
};

type IResult<I, O, E = nom::error::VerboseError<I>> = Result<(I, O), nom::Err<E>>;

/// The error types used during deserialisation
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// A Nom parsing error usually a malformed packet
    #[error(display = "Parsing error: {}", _0)]
    NomError(String),
    /// The stream ended in the middle of a packet
    #[error(display = "Incomplete packet")]
    NomIncomplete(usize),
    /// An IO error such as the stream being dropped
    #[error(display = "I/O error")]
    IoError(#[error(source)] std::sync::Arc<std::io::Error>),
}
type NomErrorType<'a> = nom::error::VerboseError<&'a [u8]>;

impl<'a> From<nom::Err<NomErrorType<'a>>> for Error {
    fn from(k: nom::Err<NomErrorType<'a>>) -> Self {
        match k {
            nom::Err::Error(e) => Error::NomError(format!("Nom Error: {:?}", e)),
            nom::Err::Failure(e) => Error::NomError(format!("Nom Error: {:?}", e)),
            nom::Err::Incomplete(nom::Needed::Size(amount)) => Error::NomIncomplete(amount.get()),
            nom::Err::Incomplete(nom::Needed::Unknown) => Error::NomIncomplete(1),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(k: std::io::Error) -> Self {
        Error::IoError(std::sync::Arc::new(k))
    }
}

impl Bc {
    /// Parses one frame from the start of `buf`, returning it with the number of bytes used
    pub(crate) fn deserialize(buf: &[u8]) -> Result<(Bc, usize), Error> {
        let (rest, bc) = bc_msg(buf)?;
        Ok((bc, buf.len() - rest.len()))
    }
}

fn bc_msg(buf: &[u8]) -> IResult<&[u8], Bc> {
    let (buf, header) = bc_header(buf)?;
    let (buf, body) = take(header.body_len as usize)(buf)?;

    let bc = Bc {
        header,
        body: body.to_vec(),
    };

    Ok((buf, bc))
}

fn bc_header(buf: &[u8]) -> IResult<&[u8], BcHeader> {
    let (buf, _magic) = error_context(
        "Magic invalid",
        verify(le_u32, |x| *x == MAGIC_HEADER),
    )(buf)?;
    let (buf, msg_id) = error_context("MsgID missing", le_u32)(buf)?;
    let (buf, body_len) = error_context("BodyLen missing", le_u32)(buf)?;
    let (buf, enc_offset) = error_context("Encryption offset missing", le_u32)(buf)?;
    let (buf, (response_code, class)) = tuple((le_u16, le_u16))(buf)?;

    let (buf, payload_offset) = error_context(
        "Payload Offset is missing",
        cond(has_payload_offset(class), le_u32),
    )(buf)?;

    Ok((
        buf,
        BcHeader {
            msg_id,
            body_len,
            enc_offset,
            response_code,
            class,
            payload_offset,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_short_header_reply() {
        let sample = [
            0xf0, 0xde, 0xbc, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x01, 0xdd, 0x14, 0x66, 0xaa, 0xbb, 0xcc,
        ];
        let (bc, used) = Bc::deserialize(&sample).unwrap();

        assert_eq!(used, sample.len());
        assert_eq!(bc.header.msg_id, 1);
        assert_eq!(bc.header.header_len(), 20);
        assert_eq!(bc.header.encryption_tag(), "01dd");
        assert_eq!(bc.body, vec![0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn test_incomplete_body() {
        let msg = Bc::new_request(MSG_ID_DEVICE_INFO, CLASS_MODERN, 0, 0, vec![9; 10]);
        let buf = msg.serialize(vec![]).unwrap();

        assert_matches!(
            Bc::deserialize(&buf[..buf.len() - 1]),
            Err(Error::NomIncomplete(_))
        );
        let (bc, used) = Bc::deserialize(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(bc, msg);
    }

    #[test]
    fn test_bad_magic() {
        let sample = [0u8; 24];
        assert_matches!(Bc::deserialize(&sample), Err(Error::NomError(_)));
    }
}
