/// Little endian form of the bytes `f0 de bc 0a` that start every frame
pub(crate) const MAGIC_HEADER: u32 = 0x0abcdef0;

pub const MSG_ID_LOGIN: u32 = 1;
pub const MSG_ID_LOGOUT: u32 = 2;
pub const MSG_ID_SET_PORTS: u32 = 36;
pub const MSG_ID_GET_PORTS: u32 = 37;
pub const MSG_ID_DEVICE_INFO: u32 = 80;
pub const MSG_ID_WIFI_SIGNAL: u32 = 115;
pub const MSG_ID_CHANNEL_UIDS: u32 = 145;

/// Class of the header-only nonce request (bytes `14 65`), 20 byte header
pub const CLASS_LEGACY: u16 = 0x6514;
/// Class of every other request (bytes `14 64`), 24 byte header
pub const CLASS_MODERN: u16 = 0x6414;

/// Status bytes `12 dc` sent with the legacy class
pub const STATUS_LEGACY_REQUEST: u16 = 0xdc12;

/// A single Baichuan frame as found on the wire
///
/// The body is kept exactly as transmitted, the encryption is applied and removed by the
/// protocol layer since it depends on what the request asked for.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Bc {
    pub header: BcHeader,
    pub body: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BcHeader {
    pub msg_id: u32,
    pub body_len: u32,
    pub enc_offset: u32,
    /// The status on a request, on replies the high byte is `0xdd` and the low byte
    /// names the encryption of the body
    pub response_code: u16,
    pub class: u16,
    pub payload_offset: Option<u32>,
}

/// The payload encryption a request is sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncType {
    /// The XOR cipher used before login
    Bc,
    /// AES-128-CFB with the key negotiated at login
    Aes,
}

/// How a received body has to be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionProtocol {
    Unencrypted,
    BCEncrypt,
    Aes,
}

/// Classes that carry a trailing payload offset in their header
pub fn has_payload_offset(class: u16) -> bool {
    matches!(class, CLASS_MODERN | 0x0000)
}

impl BcHeader {
    pub fn header_len(&self) -> usize {
        if has_payload_offset(self.class) {
            24
        } else {
            20
        }
    }

    /// The two status bytes as lower case hex, e.g. `01dd`
    pub fn encryption_tag(&self) -> String {
        let bytes = self.response_code.to_le_bytes();
        format!("{:02x}{:02x}", bytes[0], bytes[1])
    }

    /// Works out how the body of this reply is encrypted
    ///
    /// Short headers carry the encryption in their status bytes. Long headers do not so
    /// the encryption of the request is assumed.
    pub fn reply_encryption(&self, requested: EncType) -> Option<EncryptionProtocol> {
        let tag = self.encryption_tag();
        let short = self.header_len() == 20;
        if (short && (tag == "01dd" || tag == "12dd")) || (!short && requested == EncType::Bc) {
            Some(EncryptionProtocol::BCEncrypt)
        } else if (short && (tag == "02dd" || tag == "03dd"))
            || (!short && requested == EncType::Aes)
        {
            Some(EncryptionProtocol::Aes)
        } else if tag == "00dd" {
            Some(EncryptionProtocol::Unencrypted)
        } else {
            None
        }
    }
}

impl Bc {
    /// Builds a request frame, the body must already be encrypted
    pub fn new_request(
        msg_id: u32,
        class: u16,
        enc_offset: u32,
        extension_len: usize,
        body: Vec<u8>,
    ) -> Bc {
        let (response_code, payload_offset) = if has_payload_offset(class) {
            (0, Some(extension_len as u32))
        } else {
            (STATUS_LEGACY_REQUEST, None)
        };
        Bc {
            header: BcHeader {
                msg_id,
                body_len: body.len() as u32,
                enc_offset,
                response_code,
                class,
                payload_offset,
            },
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(response_code: u16, class: u16) -> BcHeader {
        BcHeader {
            msg_id: MSG_ID_LOGIN,
            body_len: 0,
            enc_offset: 0,
            response_code,
            class,
            payload_offset: has_payload_offset(class).then_some(0),
        }
    }

    #[test]
    fn test_encryption_tag() {
        assert_eq!(reply(0xdd01, CLASS_LEGACY).encryption_tag(), "01dd");
        assert_eq!(reply(0xdd12, CLASS_LEGACY).encryption_tag(), "12dd");
    }

    #[test]
    fn test_reply_encryption_short_header() {
        let bc = Some(EncryptionProtocol::BCEncrypt);
        let aes = Some(EncryptionProtocol::Aes);
        assert_eq!(reply(0xdd01, CLASS_LEGACY).reply_encryption(EncType::Aes), bc);
        assert_eq!(reply(0xdd12, CLASS_LEGACY).reply_encryption(EncType::Aes), bc);
        assert_eq!(reply(0xdd02, CLASS_LEGACY).reply_encryption(EncType::Bc), aes);
        assert_eq!(reply(0xdd03, CLASS_LEGACY).reply_encryption(EncType::Bc), aes);
        assert_eq!(
            reply(0xdd00, CLASS_LEGACY).reply_encryption(EncType::Bc),
            Some(EncryptionProtocol::Unencrypted)
        );
        assert_eq!(reply(0xdd07, CLASS_LEGACY).reply_encryption(EncType::Bc), None);
    }

    #[test]
    fn test_reply_encryption_long_header_follows_request() {
        let header = reply(0x00c8, CLASS_MODERN);
        assert_eq!(header.header_len(), 24);
        assert_eq!(
            header.reply_encryption(EncType::Bc),
            Some(EncryptionProtocol::BCEncrypt)
        );
        assert_eq!(
            header.reply_encryption(EncType::Aes),
            Some(EncryptionProtocol::Aes)
        );
    }
}
