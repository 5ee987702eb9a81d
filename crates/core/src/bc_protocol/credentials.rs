//! Handles credentials for camera including default reolink password

use std::convert::TryInto;

/// Used for caching and supplying the credentials
#[derive(Clone)]
pub struct Credentials {
    /// The username to login to the camera with
    pub username: String,
    /// The password to use for login. Some camera allow this to be ommited
    pub password: Option<String>,
}

impl Default for Credentials {
    /// Default credentials for some reolink cameras
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: Some("123456".to_string()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entry(&"username", &self.username)
            .entry(&"password", &"******")
            .finish()
    }
}

impl Credentials {
    /// Creates the credentials from a username and an optional password
    pub fn new<T: Into<String>, U: Into<String>>(username: T, password: Option<U>) -> Self {
        Self {
            username: username.into(),
            password: password.map(|t| t.into()),
        }
    }

    /// The password or an empty string when there is none
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// This is a convience function to make an AES key from the login password and the NONCE
    /// negotiated during login
    pub(crate) fn make_aeskey<T: AsRef<str>>(&self, nonce: T) -> [u8; 16] {
        let key_phrase = format!("{}-{}", nonce.as_ref(), self.password());
        let key_phrase_hash = md5_str_modern(&key_phrase).into_bytes();
        // The hex digest is always 31 ascii characters long
        key_phrase_hash[0..16]
            .try_into()
            .unwrap_or([b'0'; 16])
    }

    /// Masks the password, and any login secrets that are passed, in text that is about to be logged
    pub(crate) fn hide_password(&self, content: &str, secrets: &[(&str, &str)]) -> String {
        let mut redacted = content.to_string();
        if !self.password().is_empty() {
            redacted = redacted.replace(self.password(), "<password>");
        }
        for (secret, label) in secrets {
            if !secret.is_empty() {
                redacted = redacted.replace(secret, label);
            }
        }
        redacted
    }
}

/// Upper case hex digest of the md5 truncated to 31 characters
///
/// The camera only ever compares the first 31 characters of a hash
pub(crate) fn md5_str_modern(input: &str) -> String {
    let mut md5 = format!("{:X}", md5::compute(input));
    md5.truncate(31);
    md5
}

#[test]
fn test_md5_str_modern() {
    // Note that these literals are only 31 characters long - see explanation above.
    assert_eq!(md5_str_modern("admin"), "21232F297A57A5A743894A0E4A801FC");
}

#[test]
fn test_make_aeskey() {
    let credentials = Credentials::new("admin", Some("password"));
    let key = credentials.make_aeskey("9E6D1FCB9E69846D");
    let expected = md5_str_modern("9E6D1FCB9E69846D-password");
    assert_eq!(&key[..], &expected.as_bytes()[..16]);
    assert!(key.iter().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_lowercase()));
}

#[test]
fn test_hide_password() {
    let credentials = Credentials::new("admin", Some("hunter2"));
    let redacted = credentials.hide_password(
        "<userName>ABC</userName><password>hunter2</password><nonce>N1</nonce>",
        &[("ABC", "<user_md5_hash>"), ("N1", "<nonce>")],
    );
    assert_eq!(
        redacted,
        "<userName><user_md5_hash></userName><password><password></password><nonce><nonce></nonce>"
    );
}
