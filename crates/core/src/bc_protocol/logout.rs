use super::{Baichuan, BcRequest};
use crate::bc::{model::*, xml::*};
use crate::Result;
use log::*;

impl Baichuan {
    /// Logout from the camera and close the connection
    ///
    /// The logout message is best effort, the connection and every key derived at login
    /// are dropped regardless of its outcome
    pub async fn logout(&self) -> Result<()> {
        let connected = self.connection.lock().await.is_some();
        if connected {
            let logout = BcXml {
                login_user: Some(LoginUser {
                    version: xml_ver(),
                    user_name: self.credentials.username.clone(),
                    password: self.credentials.password().to_string(),
                    user_ver: 1,
                }),
                ..Default::default()
            }
            .serialize(vec![]);

            let sent = match logout {
                Ok(logout) => {
                    let body = String::from_utf8_lossy(&logout);
                    self.send_raw(&BcRequest::new(MSG_ID_LOGOUT, &body)).await
                }
                Err(e) => Err(e.into()),
            };
            if let Err(e) = sent {
                error!("Baichuan host {}: failed to logout: {}", self.host, e);
            }
        }

        self.teardown().await;
        Ok(())
    }
}
