use aes::Aes128;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

const XML_KEY: [u8; 8] = [0x1F, 0x2D, 0x3C, 0x4B, 0x5A, 0x69, 0x78, 0xFF];
const IV: &[u8; 16] = b"0123456789abcdef";

/// The legacy XOR cipher, it is its own inverse
pub fn bc_crypt(offset: u32, buf: &[u8]) -> Vec<u8> {
    let key_iter = XML_KEY.iter().cycle().skip(offset as usize % 8);
    key_iter
        .zip(buf)
        .map(|(key, i)| *i ^ key ^ (offset as u8))
        .collect()
}

pub fn aes_encrypt(aeskey: &[u8; 16], buf: &[u8]) -> Vec<u8> {
    let mut encrypted = buf.to_vec();
    Aes128CfbEnc::new(aeskey.into(), IV.into()).encrypt(&mut encrypted);
    encrypted
}

pub fn aes_decrypt(aeskey: &[u8; 16], buf: &[u8]) -> Vec<u8> {
    let mut decrypted = buf.to_vec();
    Aes128CfbDec::new(aeskey.into(), IV.into()).decrypt(&mut decrypted);
    decrypted
}

#[test]
fn test_bc_crypt_key_stream() {
    let zeros = [0u8; 10];
    let stream = bc_crypt(0, &zeros);
    assert_eq!(
        stream,
        vec![0x1F, 0x2D, 0x3C, 0x4B, 0x5A, 0x69, 0x78, 0xFF, 0x1F, 0x2D]
    );

    // The offset both rotates the key and is mixed into every byte
    let stream = bc_crypt(3, &zeros[..3]);
    assert_eq!(stream, vec![0x4B ^ 3, 0x5A ^ 3, 0x69 ^ 3]);
}

#[test]
fn test_bc_crypt_roundtrip() {
    let plain = b"<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body></body>";

    let encrypted = bc_crypt(17, &plain[..]);
    assert_ne!(&encrypted[..], &plain[..]);
    let decrypted = bc_crypt(17, &encrypted[..]);
    assert_eq!(&decrypted[..], &plain[..]);
}

#[test]
fn test_aes_roundtrip() {
    let key = *b"0123456789ABCDEF";
    let plain = b"<body><LoginUser version=\"1.1\"></LoginUser></body>";

    let encrypted = aes_encrypt(&key, &plain[..]);
    assert_eq!(encrypted.len(), plain.len());
    assert_ne!(&encrypted[..], &plain[..]);
    assert_eq!(aes_decrypt(&key, &encrypted), plain.to_vec());
}
