use err_derive::Error;

/// This is the primary error type of the library
#[derive(Debug, Error)]
pub enum Error {
    /// Error raised during deserlization of a Baichuan frame
    #[error(display = "Deserialization error")]
    Deserialization(#[error(source)] crate::bc::de::Error),

    /// Error raised during serlization of a Baichuan frame
    #[error(display = "Serialization error")]
    Serialization(#[error(source)] crate::bc::ser::Error),

    /// Raised when the XML of a Baichuan payload could not be read or written
    #[error(display = "XML error")]
    Xml(#[error(source)] quick_xml::Error),

    /// Raised when the XML of a Baichuan payload did not match the expected structure
    #[error(display = "XML structure error")]
    XmlDe(#[error(source)] quick_xml::DeError),

    /// A low level HTTP error that could not be classified further
    #[error(display = "HTTP error")]
    Http(#[error(source)] reqwest::Error),

    /// The JSON of a request could not be produced
    #[error(display = "JSON error")]
    Json(#[error(source)] serde_json::Error),

    /// An IO error on the underlying socket
    #[error(display = "I/O error")]
    Io(#[error(source)] std::io::Error),

    /// The device rejected the username or password
    #[error(display = "{}: invalid credentials", host)]
    CredentialsInvalid {
        /// The host that rejected the credentials
        host: String,
    },

    /// Login did not produce a session
    #[error(display = "{}: login failed: {}", host, why)]
    LoginFailed {
        /// The host the login was attempted on
        host: String,
        /// What went wrong
        why: String,
    },

    /// The device answered a command with an error code
    #[error(display = "{}: {} failed with code {}: {}", host, cmd, rsp_code, detail)]
    Api {
        /// The host that produced the error
        host: String,
        /// The command that failed
        cmd: String,
        /// The vendor status code
        rsp_code: i64,
        /// The vendor description of the error
        detail: String,
    },

    /// The reply was not of the requested content type
    #[error(display = "{}: {}", host, why)]
    InvalidContentType {
        /// The host that sent the reply
        host: String,
        /// What was expected and what was received
        why: String,
    },

    /// A reply that was required did not arrive or was empty
    #[error(display = "{}: no data: {}", host, why)]
    NoData {
        /// The host that was queried
        host: String,
        /// What was missing
        why: String,
    },

    /// A reply was missing expected fields
    #[error(display = "{}: unexpected data: {}", host, why)]
    UnexpectedData {
        /// The host that sent the reply
        host: String,
        /// What was not understood
        why: String,
    },

    /// The requested feature is not available on this device or channel
    #[error(display = "{}: not supported: {}", host, why)]
    NotSupported {
        /// The host that lacks the feature
        host: String,
        /// Which feature was requested
        why: String,
    },

    /// A parameter supplied by the caller is outside of the accepted range
    #[error(display = "{}: invalid parameter: {}", host, why)]
    InvalidParameter {
        /// The host the request was meant for
        host: String,
        /// The offending parameter
        why: String,
    },

    /// An ONVIF subscription could not be created, renewed or removed
    #[error(display = "{}: subscription error: {}", host, why)]
    Subscription {
        /// The host of the subscription
        host: String,
        /// What went wrong
        why: String,
    },

    /// A Baichuan request was made while another one was still waiting for its reply
    #[error(display = "{}: a request is already waiting for a reply, cannot send cmd_id {}", host, cmd_id)]
    SimultaneousRequest {
        /// The host of the connection
        host: String,
        /// The command that could not be sent
        cmd_id: u32,
    },

    /// The device could not be reached or the connection was dropped
    #[error(display = "{}: connection error: {}", host, why)]
    ConnectionError {
        /// The host that could not be reached
        host: String,
        /// Description of the failure
        why: String,
    },

    /// Raised when a request did not complete in time
    #[error(display = "{}: timeout", host)]
    Timeout {
        /// The host that did not answer
        host: String,
    },
}

/// Result type of the library
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the errors that mean the device or the link is gone rather than a bad request
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionError { .. } | Error::Timeout { .. } | Error::Io(_)
        )
    }
}
