//! The Baichuan message format is a 20 or 24 byte little endian header:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..4  | magic `f0 de bc 0a` |
//! | 4..8  | message id |
//! | 8..12 | body length |
//! | 12..16| encryption offset |
//! | 16..18| status, on replies `xx dd` with `xx` the body encryption |
//! | 18..20| message class |
//! | 20..24| payload offset, only for the `14 64` class |
//!
//! This header is followed by the message body. The body is an optional extension XML
//! (ending at the payload offset) followed by the payload XML, both encrypted as a single stream
//! either with the XOR cipher used before login or with AES once the key is negotiated.
//!

/// Contains the structure of the messages such as headers and payloads
pub mod model;

/// Contains code related to the deserialisation of the bc packets
pub mod de;
/// `Contains code related to the serialisation of the bc packets
pub mod ser;
/// Contains the structs for the know xmls of payloads and extension
pub mod xml;

pub(crate) mod xml_crypto;

pub(crate) mod codex;
