use super::{md5_str_modern, Baichuan, BcRequest};
use crate::bc::{model::*, xml::*};
use crate::{Error, Result};
use std::sync::atomic::Ordering;

impl Baichuan {
    /// Login to the camera.
    ///
    /// This is called automatically by [`Baichuan::send`] when needed
    pub async fn login(&self) -> Result<()> {
        let result = self.modern_login().await;
        if result.is_err() {
            self.clear_keys();
        }
        result
    }

    async fn modern_login(&self) -> Result<()> {
        // Login flow is: send a header only request, expect back a modern message with Encryption
        // details.  Then, send the modern login message with the credentials hashed together with
        // that nonce.
        let nonce = self.get_nonce().await?;

        // In the modern login flow, the username/password are concat'd with the server's nonce
        // string, then MD5'd, then the hex of this MD5 is sent as the password.
        let user_hash = md5_str_modern(&format!("{}{}", self.credentials.username, nonce));
        let password_hash = md5_str_modern(&format!("{}{}", self.credentials.password(), nonce));
        {
            let mut keys = self.lock_keys();
            keys.user_hash = Some(user_hash.clone());
            keys.password_hash = Some(password_hash.clone());
        }

        let modern_login = BcXml {
            login_user: Some(LoginUser {
                version: xml_ver(),
                user_name: user_hash,
                password: password_hash,
                user_ver: 1,
            }),
            login_net: Some(LoginNet::default()),
            ..Default::default()
        }
        .serialize(vec![])?;
        let body = String::from_utf8_lossy(&modern_login);

        self.send_raw(&BcRequest {
            enc_type: EncType::Bc,
            ..BcRequest::new(MSG_ID_LOGIN, &body)
        })
        .await?;
        self.logged_in.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Get the nonce needed for the modern login and derive the AES key from it
    async fn get_nonce(&self) -> Result<String> {
        let reply = self
            .send_raw(&BcRequest {
                enc_type: EncType::Bc,
                class: CLASS_LEGACY,
                ..BcRequest::new(MSG_ID_LOGIN, "")
            })
            .await?;

        let nonce = match BcXml::try_parse(reply.as_bytes()) {
            Ok(BcXml {
                encryption: Some(encryption),
                ..
            }) => encryption.nonce,
            _ => {
                return Err(Error::UnexpectedData {
                    host: self.host.clone(),
                    why: format!("could not find nonce in response:\n{}", reply),
                })
            }
        };

        let aes_key = self.credentials.make_aeskey(&nonce);
        let mut keys = self.lock_keys();
        keys.nonce = Some(nonce.clone());
        keys.aes_key = Some(aes_key);
        Ok(nonce)
    }
}
