use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

#[cfg(test)]
use indoc::indoc;

/// The top level BC Xml
#[derive(PartialEq, Default, Debug, Deserialize, Serialize)]
#[serde(rename = "body")]
pub struct BcXml {
    /// Encryption xml is received during login and contain the NONCE
    #[serde(rename = "Encryption", skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
    /// LoginUser xml is used during modern login and logout
    #[serde(rename = "LoginUser", skip_serializing_if = "Option::is_none")]
    pub login_user: Option<LoginUser>,
    /// LoginNet xml is used during modern login
    #[serde(rename = "LoginNet", skip_serializing_if = "Option::is_none")]
    pub login_net: Option<LoginNet>,
}

impl BcXml {
    pub(crate) fn try_parse(s: &[u8]) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_reader(s)
    }
    pub(crate) fn serialize<W: Write>(&self, mut w: W) -> Result<W, quick_xml::DeError> {
        let mut writer = Writer::new(&mut w);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_serializable("body", &self)?;
        Ok(w)
    }
}

/// Encryption xml
#[derive(PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Encryption {
    /// XML Version
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "type")]
    /// The hashing algorithm used. Only observed the value of "md5"
    pub type_: String,
    /// The nonce used to negotiate the login and to generate the AES key
    pub nonce: String,
}

/// LoginUser xml
#[derive(PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct LoginUser {
    /// XML Version
    #[serde(rename = "@version")]
    pub version: String,
    /// Hashed username on login, plain text on logout
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Hashed password on login, plain text on logout
    pub password: String,
    /// Unknown always `1`
    #[serde(rename = "userVer")]
    pub user_ver: u32,
}

/// LoginNet xml
#[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct LoginNet {
    /// XML Version
    #[serde(rename = "@version")]
    pub version: String,
    /// Type of connection usually LAN (even on wifi)
    #[serde(rename = "type")]
    pub type_: String,
    /// The port for the udp will be `0` for tcp
    #[serde(rename = "udpPort")]
    pub udp_port: u16,
}

impl Default for LoginNet {
    fn default() -> Self {
        LoginNet {
            version: xml_ver(),
            type_: "LAN".to_string(),
            udp_port: 0,
        }
    }
}

/// Extension xml
///
/// Prefixed to a payload to address a channel of an NVR
#[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename = "Extension")]
pub struct Extension {
    /// XML Version
    #[serde(rename = "@version")]
    pub version: String,
    /// The channel ID. This is usually `0` unless using an NVR
    #[serde(rename = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u8>,
}

impl Extension {
    pub(crate) fn for_channel(channel_id: u8) -> Self {
        Extension {
            version: xml_ver(),
            channel_id: Some(channel_id),
        }
    }

    pub(crate) fn serialize<W: Write>(&self, mut w: W) -> Result<W, quick_xml::DeError> {
        let mut writer = Writer::new(&mut w);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_serializable("Extension", &self)?;
        Ok(w)
    }
}

/// Builds `<body><{tag} version="1.1"><enable>0|1</enable></{tag}></body>`
pub(crate) fn port_enable_xml(tag: &str, enable: bool) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let enable = if enable { "1" } else { "0" };
    writer
        .create_element("body")
        .write_inner_content::<_, quick_xml::Error>(|w| {
            w.create_element(tag)
                .with_attribute(("version", "1.1"))
                .write_inner_content::<_, quick_xml::Error>(|w| {
                    w.create_element("enable")
                        .write_text_content(BytesText::new(enable))?;
                    Ok(())
                })?;
            Ok(())
        })?;
    Ok(writer.into_inner())
}

/// Every text node in the document along with the element path leading to it
fn text_nodes(xml: &str) -> Result<Vec<(Vec<String>, String)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = vec![];
    let mut nodes = vec![];
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if !text.is_empty() {
                    nodes.push((path.clone(), text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(nodes)
}

/// Finds the text of the first element with each of the given names anywhere in the document
pub(crate) fn get_keys_from_xml(
    xml: &str,
    keys: &[&str],
) -> Result<BTreeMap<String, String>, quick_xml::Error> {
    let mut result = BTreeMap::new();
    for (path, text) in text_nodes(xml)? {
        if let Some(name) = path.last() {
            if keys.contains(&name.as_str()) && !result.contains_key(name) {
                result.insert(name.clone(), text);
            }
        }
    }
    Ok(result)
}

/// Parses a port listing such as `<body><HttpPort><httpPort>80</httpPort><enable>1</enable></HttpPort></body>`
/// into `{"http": {"port": 80, "enable": 1}}`
pub(crate) fn parse_ports(
    xml: &str,
) -> Result<BTreeMap<String, BTreeMap<String, i64>>, quick_xml::Error> {
    let mut ports: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for (path, text) in text_nodes(xml)? {
        if path.len() != 3 {
            continue;
        }
        let proto_key = path[1].replace("Port", "").to_lowercase();
        let sub_key = path[2].replace(&proto_key, "").to_lowercase();
        if let Ok(value) = text.trim().parse::<i64>() {
            ports.entry(proto_key).or_default().insert(sub_key, value);
        }
    }
    Ok(ports)
}

pub fn xml_ver() -> String {
    "1.1".to_string()
}

#[test]
fn test_encryption_deser() {
    let sample = indoc!(
        r#"
        <?xml version="1.0" encoding="UTF-8" ?>
        <body>
        <Encryption version="1.1">
        <type>md5</type>
        <nonce>9E6D1FCB9E69846D</nonce>
        </Encryption>
        </body>"#
    );
    let b: BcXml = quick_xml::de::from_str(sample).unwrap();
    let enc = b.encryption.as_ref().unwrap();

    assert_eq!(enc.version, "1.1");
    assert_eq!(enc.nonce, "9E6D1FCB9E69846D");
    assert_eq!(enc.type_, "md5");

    let t = BcXml::try_parse(sample.as_bytes()).unwrap();
    assert_eq!(t, b);
}

#[test]
fn test_login_ser() {
    let b = BcXml {
        login_user: Some(LoginUser {
            version: xml_ver(),
            user_name: "9F07915E819A076E2E14169830769D6".to_string(),
            password: "8EFECD610524A98390F118D2789BE3B".to_string(),
            user_ver: 1,
        }),
        login_net: Some(LoginNet::default()),
        ..BcXml::default()
    };

    let bytes = b.serialize(vec![]).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\""));
    assert!(text.contains("<LoginUser version=\"1.1\"><userName>9F07915E819A076E2E14169830769D6</userName>"));
    assert!(text.contains("<LoginNet version=\"1.1\"><type>LAN</type><udpPort>0</udpPort></LoginNet>"));

    let b2 = BcXml::try_parse(&bytes).unwrap();
    assert_eq!(b, b2);
}

#[test]
fn test_channel_extension_ser() {
    let bytes = Extension::for_channel(3).serialize(vec![]).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.ends_with("<Extension version=\"1.1\"><channelId>3</channelId></Extension>"));
}

#[test]
fn test_get_keys() {
    let sample = indoc!(
        r#"
        <?xml version="1.0" encoding="UTF-8" ?>
        <body>
        <VersionInfo version="1.1">
        <name>Front Door</name>
        <type>RLC-810A</type>
        <hardwareVersion>IPC_523128M8MP</hardwareVersion>
        <firmwareVersion>v3.1.0.956_22041503</firmwareVersion>
        <itemNo></itemNo>
        </VersionInfo>
        </body>"#
    );

    let keys = get_keys_from_xml(
        sample,
        &["type", "hardwareVersion", "firmwareVersion", "itemNo"],
    )
    .unwrap();
    assert_eq!(keys.get("type").map(String::as_str), Some("RLC-810A"));
    assert_eq!(
        keys.get("firmwareVersion").map(String::as_str),
        Some("v3.1.0.956_22041503")
    );
    assert_eq!(keys.get("itemNo"), None);
    assert_eq!(keys.get("name"), None);
}

#[test]
fn test_parse_ports() {
    let sample = indoc!(
        r#"
        <?xml version="1.0" encoding="UTF-8" ?>
        <body>
        <HttpPort version="1.1">
        <httpPort>80</httpPort>
        <enable>1</enable>
        </HttpPort>
        <HttpsPort version="1.1">
        <httpsPort>443</httpsPort>
        <enable>0</enable>
        </HttpsPort>
        <RtspPort version="1.1">
        <rtspPort>554</rtspPort>
        <enable>1</enable>
        </RtspPort>
        </body>"#
    );

    let ports = parse_ports(sample).unwrap();
    assert_eq!(ports["http"]["port"], 80);
    assert_eq!(ports["http"]["enable"], 1);
    assert_eq!(ports["https"]["port"], 443);
    assert_eq!(ports["https"]["enable"], 0);
    assert_eq!(ports["rtsp"]["port"], 554);
}

#[test]
fn test_port_enable_xml() {
    let bytes = port_enable_xml("RtmpPort", false).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text
        .ends_with("<body><RtmpPort version=\"1.1\"><enable>0</enable></RtmpPort></body>"));
}
