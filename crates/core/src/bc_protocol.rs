use crate::bc::{model::*, xml::Extension, xml_crypto};
use crate::{Error, Result};
use log::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

mod connection;
mod credentials;
mod info;
mod login;
mod logout;
mod ports;

pub(crate) use connection::*;
pub use credentials::Credentials;
pub(crate) use credentials::md5_str_modern;
pub use info::DeviceInfo;
pub use ports::{PortState, PortType};

/// The default TCP port of the Baichuan protocol
pub const BC_PORT: u16 = 9000;

/// Key material negotiated at login, never outlives the connection it was made on
#[derive(Default)]
struct KeyState {
    nonce: Option<String>,
    aes_key: Option<[u8; 16]>,
    user_hash: Option<String>,
    password_hash: Option<String>,
}

/// One request to the camera
#[derive(Debug, Clone)]
pub struct BcRequest<'a> {
    /// The message id of the command
    pub cmd_id: u32,
    /// The NVR channel the command addresses, sent as an extension
    pub channel: Option<u8>,
    /// The XML payload
    pub body: &'a str,
    /// The encryption the payload is sent with
    pub enc_type: EncType,
    /// The message class, which selects the header layout
    pub class: u16,
    /// The offset fed into the XOR cipher
    pub enc_offset: u32,
}

impl<'a> BcRequest<'a> {
    /// An AES encrypted request, the usual form once logged in
    pub fn new(cmd_id: u32, body: &'a str) -> Self {
        Self {
            cmd_id,
            channel: None,
            body,
            enc_type: EncType::Aes,
            class: CLASS_MODERN,
            enc_offset: 0,
        }
    }
}

///
/// This is the primary struct of the Baichuan side of this library
///
/// It talks the binary TCP protocol to the camera on a single persistent connection
/// that is opened on first use
///
pub struct Baichuan {
    host: String,
    port: u16,
    // Certain commands such as logout require the username/pass in plain text.... why....???
    credentials: Credentials,
    connection: tokio::sync::Mutex<Option<BcConnection>>,
    logged_in: AtomicBool,
    keys: Mutex<KeyState>,
    ports: RwLock<BTreeMap<String, BTreeMap<String, i64>>>,
    dev_info: RwLock<DeviceInfo>,
}

impl Baichuan {
    ///
    /// Create a new camera interface, no connection is made until the first command
    ///
    /// # Parameters
    ///
    /// * `host` - The address of the camera either ip address or hostname string
    ///
    /// * `port` - The Baichuan port, usually [`BC_PORT`]
    ///
    pub fn new<U: Into<String>, V: Into<String>, W: Into<String>>(
        host: U,
        username: V,
        password: W,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: Credentials::new(username, Some(password)),
            connection: Default::default(),
            logged_in: AtomicBool::new(false),
            keys: Default::default(),
            ports: Default::default(),
            dev_info: Default::default(),
        }
    }

    /// The host this client talks to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// True once login succeeded and until logout or a fatal error
    pub fn logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Relaxed)
    }

    /// Sends a command and returns the decrypted reply
    ///
    /// Logs in first if this is not a login/logout command and there is no session
    pub async fn send(&self, request: BcRequest<'_>) -> Result<String> {
        if self.logged_in() && self.connection_lost().await {
            debug!(
                "Baichuan host {}: connection of the session is gone, logging in again",
                self.host
            );
            self.clear_keys();
        }
        if !self.logged_in() && request.cmd_id > MSG_ID_LOGOUT {
            self.login().await?;
        }
        self.send_raw(&request).await
    }

    async fn send_raw(&self, request: &BcRequest<'_>) -> Result<String> {
        let extension = match request.channel {
            Some(channel_id) => Extension::for_channel(channel_id).serialize(vec![])?,
            None => vec![],
        };
        let mut plain = extension.clone();
        plain.extend_from_slice(request.body.as_bytes());

        let enc_body = if plain.is_empty() {
            vec![]
        } else {
            match request.enc_type {
                EncType::Bc => xml_crypto::bc_crypt(request.enc_offset, &plain),
                EncType::Aes => xml_crypto::aes_encrypt(&self.aes_key()?, &plain),
            }
        };
        let frame = Bc::new_request(
            request.cmd_id,
            request.class,
            request.enc_offset,
            extension.len(),
            enc_body,
        );

        if log_enabled!(Level::Debug) {
            if plain.is_empty() {
                debug!(
                    "Baichuan host {}: writing cmd_id {}, without body",
                    self.host, request.cmd_id
                );
            } else {
                debug!(
                    "Baichuan host {}: writing cmd_id {}, body:\n{}",
                    self.host,
                    request.cmd_id,
                    self.hide_password(&String::from_utf8_lossy(&plain))
                );
            }
        }

        // Logout must never be resent
        let mut retry = request.cmd_id != MSG_ID_LOGOUT;
        let reply = loop {
            match self.exchange(frame.clone()).await {
                Ok(reply) => break reply,
                Err(e) if retry && matches!(e, Error::Io(_) | Error::ConnectionError { .. }) => {
                    debug!(
                        "Baichuan host {}: connection error during read/write: {}, trying again",
                        self.host, e
                    );
                    retry = false;
                }
                Err(e) => {
                    if e.is_connection_error() {
                        self.teardown().await;
                    }
                    return Err(e);
                }
            }
        };

        let rec_body = self.decrypt(&reply, request.enc_type)?;
        self.check_response_code(&reply, request)?;

        if log_enabled!(Level::Debug) {
            if rec_body.is_empty() {
                debug!(
                    "Baichuan host {}: received status 200:OK without body",
                    self.host
                );
            } else {
                debug!(
                    "Baichuan host {}: received:\n{}",
                    self.host,
                    self.hide_password(&rec_body)
                );
            }
        }

        Ok(rec_body)
    }

    /// Writes one frame and waits for the matching reply, all bounded by the Baichuan timeout
    async fn exchange(&self, frame: Bc) -> Result<Bc> {
        let mut connection = self.connection.lock().await;
        let needs_connect = match connection.as_ref() {
            Some(conn) => conn.is_closed(),
            None => true,
        };
        if needs_connect {
            *connection = Some(BcConnection::connect(&self.host, self.port).await?);
        }
        let conn = match connection.as_mut() {
            Some(conn) => conn,
            None => {
                return Err(Error::ConnectionError {
                    host: self.host.clone(),
                    why: "no connection".to_string(),
                })
            }
        };

        let reply = conn.expect_reply(frame.header.msg_id)?;
        let result = match crate::bc_timeout(write_and_wait(conn, frame, reply)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                host: self.host.clone(),
            }),
        };

        if matches!(result, Err(ref e) if e.is_connection_error()) {
            if let Some(broken) = connection.take() {
                broken.close().await;
            }
        }
        result
    }

    /// The keys negotiated at login only hold on the connection they were made on
    async fn connection_lost(&self) -> bool {
        match self.connection.lock().await.as_ref() {
            Some(conn) => conn.is_closed(),
            None => true,
        }
    }

    fn decrypt(&self, reply: &Bc, requested: EncType) -> Result<String> {
        let plain = match reply.header.reply_encryption(requested) {
            Some(EncryptionProtocol::BCEncrypt) => {
                xml_crypto::bc_crypt(reply.header.enc_offset, &reply.body)
            }
            Some(EncryptionProtocol::Aes) => xml_crypto::aes_decrypt(&self.aes_key()?, &reply.body),
            Some(EncryptionProtocol::Unencrypted) => reply.body.clone(),
            None => {
                return Err(Error::InvalidContentType {
                    host: self.host.clone(),
                    why: format!(
                        "received unknown encryption type '{}' for cmd_id {}",
                        reply.header.encryption_tag(),
                        reply.header.msg_id
                    ),
                })
            }
        };
        String::from_utf8(plain).map_err(|e| Error::UnexpectedData {
            host: self.host.clone(),
            why: format!("reply to cmd_id {} is not text: {}", reply.header.msg_id, e),
        })
    }

    /// Long headers carry an HTTP like status on replies
    fn check_response_code(&self, reply: &Bc, request: &BcRequest<'_>) -> Result<()> {
        let code = reply.header.response_code;
        if reply.header.header_len() == 20 || code >> 8 == 0xdd || code == 200 || code == 0 {
            return Ok(());
        }
        if request.cmd_id == MSG_ID_LOGIN {
            return Err(Error::CredentialsInvalid {
                host: self.host.clone(),
            });
        }
        Err(Error::Api {
            host: self.host.clone(),
            cmd: format!("cmd_id {}", request.cmd_id),
            rsp_code: code as i64,
            detail: "camera rejected the request".to_string(),
        })
    }

    fn lock_keys(&self) -> std::sync::MutexGuard<'_, KeyState> {
        match self.keys.lock() {
            Ok(keys) => keys,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn aes_key(&self) -> Result<[u8; 16]> {
        self.lock_keys()
            .aes_key
            .ok_or_else(|| Error::InvalidParameter {
                host: self.host.clone(),
                why: "first login before using AES encryption".to_string(),
            })
    }

    fn hide_password(&self, content: &str) -> String {
        let keys = self.lock_keys();
        let mut secrets = vec![];
        if let Some(nonce) = keys.nonce.as_deref() {
            secrets.push((nonce, "<nonce>"));
        }
        if let Some(user_hash) = keys.user_hash.as_deref() {
            secrets.push((user_hash, "<user_md5_hash>"));
        }
        if let Some(password_hash) = keys.password_hash.as_deref() {
            secrets.push((password_hash, "<password_md5_hash>"));
        }
        self.credentials.hide_password(content, &secrets)
    }

    /// Drops the connection and all key material
    async fn teardown(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.close().await;
        }
        self.clear_keys();
    }

    fn clear_keys(&self) {
        self.logged_in.store(false, Ordering::Relaxed);
        *self.lock_keys() = KeyState::default();
    }
}

async fn write_and_wait(
    conn: &mut BcConnection,
    frame: Bc,
    mut reply: PendingReply,
) -> Result<Bc> {
    conn.send(frame).await?;
    reply.recv().await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bc::codex::BcCodex;
    use assert_matches::assert_matches;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    pub(crate) const NONCE: &str = "9E6D1FCB9E69846D";

    fn reply(msg_id: u32, response_code: u16, class: u16, body: Vec<u8>) -> Bc {
        Bc {
            header: BcHeader {
                msg_id,
                body_len: body.len() as u32,
                enc_offset: 0,
                response_code,
                class,
                payload_offset: has_payload_offset(class).then_some(0),
            },
            body,
        }
    }

    /// Serves one connection the way a camera would
    ///
    /// `answers` maps a message id to the plain text XML sent back with AES
    pub(crate) async fn fake_camera(
        password: &'static str,
        answers: Vec<(u32, &'static str)>,
    ) -> (u16, tokio::task::JoinHandle<Vec<(u32, String)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            serve(socket, password, answers).await
        });
        (port, handle)
    }

    /// Like [`fake_camera`] but the first connection reads requests and never answers
    async fn stalled_then_fake_camera(
        password: &'static str,
        answers: Vec<(u32, &'static str)>,
    ) -> (u16, tokio::task::JoinHandle<Vec<(u32, String)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stalled, _) = listener.accept().await.unwrap();
            let mut stalled = Framed::new(stalled, BcCodex::new());
            let drain = tokio::spawn(async move { while let Some(Ok(_)) = stalled.next().await {} });
            let (socket, _) = listener.accept().await.unwrap();
            let seen = serve(socket, password, answers).await;
            drain.abort();
            seen
        });
        (port, handle)
    }

    async fn serve(
        socket: tokio::net::TcpStream,
        password: &'static str,
        answers: Vec<(u32, &'static str)>,
    ) -> Vec<(u32, String)> {
        let mut framed = Framed::new(socket, BcCodex::new());
        let aes_key = Credentials::new("admin", Some(password)).make_aeskey(NONCE);
        let mut seen = vec![];
        while let Some(Ok(request)) = framed.next().await {
            let msg_id = request.header.msg_id;
            let answer = if msg_id == MSG_ID_LOGIN && request.header.class == CLASS_LEGACY {
                let xml = format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body><Encryption version=\"1.1\"><type>md5</type><nonce>{}</nonce></Encryption></body>",
                    NONCE
                );
                seen.push((msg_id, String::new()));
                reply(msg_id, 0xdd01, 0x6614, xml_crypto::bc_crypt(0, xml.as_bytes()))
            } else if msg_id == MSG_ID_LOGIN {
                let plain = String::from_utf8(xml_crypto::bc_crypt(0, &request.body)).unwrap();
                let accepted = plain.contains(&md5_str_modern(&format!("{}{}", password, NONCE)));
                seen.push((msg_id, plain));
                if accepted {
                    let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body><DeviceInfo version=\"1.1\"></DeviceInfo></body>";
                    reply(msg_id, 200, 0x0000, xml_crypto::bc_crypt(0, xml.as_bytes()))
                } else {
                    reply(msg_id, 401, 0x0000, vec![])
                }
            } else {
                let plain = xml_crypto::aes_decrypt(&aes_key, &request.body);
                seen.push((msg_id, String::from_utf8(plain).unwrap()));
                let xml = answers
                    .iter()
                    .find(|(id, _)| *id == msg_id)
                    .map(|(_, xml)| *xml)
                    .unwrap_or("");
                reply(msg_id, 200, 0x0000, xml_crypto::aes_encrypt(&aes_key, xml.as_bytes()))
            };
            if framed.send(answer).await.is_err() {
                break;
            }
            if msg_id == MSG_ID_LOGOUT {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_login_negotiates_keys() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (port, camera) = fake_camera("secret", vec![]).await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);

        client.login().await.unwrap();
        assert!(client.logged_in());
        {
            let keys = client.lock_keys();
            assert_eq!(keys.nonce.as_deref(), Some(NONCE));
            assert_eq!(
                keys.aes_key,
                Some(Credentials::new("admin", Some("secret")).make_aeskey(NONCE))
            );
            assert_eq!(
                keys.user_hash.as_deref(),
                Some(md5_str_modern(&format!("admin{}", NONCE)).as_str())
            );
        }

        client.logout().await.unwrap();
        let seen = camera.await.unwrap();
        assert_eq!(seen[0].0, MSG_ID_LOGIN);
        assert!(seen[1]
            .1
            .contains(&md5_str_modern(&format!("secret{}", NONCE))));
        assert_eq!(seen[2].0, MSG_ID_LOGOUT);
        assert!(seen[2].1.contains("<password>secret</password>"));
    }

    #[tokio::test]
    async fn test_logout_clears_keys_when_camera_is_gone() {
        let (port, camera) = fake_camera("secret", vec![]).await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);
        client.login().await.unwrap();

        // Camera goes away without answering the logout
        camera.abort();
        let _ = camera.await;

        client.logout().await.unwrap();
        assert!(!client.logged_in());
        let keys = client.lock_keys();
        assert!(keys.nonce.is_none());
        assert!(keys.aes_key.is_none());
        assert!(keys.user_hash.is_none());
        assert!(keys.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_command_logs_in_first() {
        let (port, camera) = fake_camera(
            "secret",
            vec![(
                MSG_ID_DEVICE_INFO,
                "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body><VersionInfo version=\"1.1\"><type>RLC-811A</type><hardwareVersion>IPC_523128M8MP</hardwareVersion><firmwareVersion>v3.1.0.989_22051908</firmwareVersion><itemNo>RLC-811A</itemNo></VersionInfo></body>",
            )],
        )
        .await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);

        let info = client.get_info().await.unwrap();
        assert_eq!(info.model.as_deref(), Some("RLC-811A"));
        assert_eq!(info.sw_version.as_deref(), Some("v3.1.0.989_22051908"));
        assert!(client.logged_in());

        client.logout().await.unwrap();
        let seen: Vec<u32> = camera.await.unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            seen,
            vec![MSG_ID_LOGIN, MSG_ID_LOGIN, MSG_ID_DEVICE_INFO, MSG_ID_LOGOUT]
        );
    }

    #[tokio::test]
    async fn test_channel_extension_prefixes_body() {
        let (port, camera) = fake_camera("secret", vec![(MSG_ID_WIFI_SIGNAL, "")]).await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);

        let reply = client
            .send(BcRequest {
                channel: Some(2),
                ..BcRequest::new(MSG_ID_WIFI_SIGNAL, "")
            })
            .await
            .unwrap();
        assert_eq!(reply, "");

        client.logout().await.unwrap();
        let seen = camera.await.unwrap();
        assert_eq!(seen[2].0, MSG_ID_WIFI_SIGNAL);
        assert!(seen[2].1.contains("<channelId>2</channelId>"));
    }

    #[tokio::test]
    async fn test_cancelled_request_frees_connection() {
        let (port, camera) = stalled_then_fake_camera(
            "secret",
            vec![(
                MSG_ID_DEVICE_INFO,
                "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body><VersionInfo version=\"1.1\"><type>RLC-811A</type></VersionInfo></body>",
            )],
        )
        .await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);

        // The caller gives up before the camera answers
        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(200), client.login()).await;
        assert!(cancelled.is_err());
        assert!(!client.logged_in());

        let info = client.get_info().await.unwrap();
        assert_eq!(info.model.as_deref(), Some("RLC-811A"));

        client.logout().await.unwrap();
        let seen: Vec<u32> = camera.await.unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            seen,
            vec![MSG_ID_LOGIN, MSG_ID_LOGIN, MSG_ID_DEVICE_INFO, MSG_ID_LOGOUT]
        );
    }

    #[tokio::test]
    async fn test_rejected_login_clears_keys() {
        let (port, camera) = fake_camera("secret", vec![]).await;
        let client = Baichuan::new("127.0.0.1", "admin", "wrong", port);

        assert_matches!(client.login().await, Err(Error::CredentialsInvalid { .. }));
        assert!(!client.logged_in());
        {
            let keys = client.lock_keys();
            assert!(keys.nonce.is_none());
            assert!(keys.aes_key.is_none());
            assert!(keys.user_hash.is_none());
            assert!(keys.password_hash.is_none());
        }

        client.logout().await.unwrap();
        camera.abort();
    }
}
