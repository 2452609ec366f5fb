/// One imported OTP enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub service: String,
    pub account: String, // may be empty
    pub secret: String,  // base32, as imported
}

impl Credential {
    pub fn new(service: impl Into<String>, account: impl Into<String>, secret: impl Into<String>) -> Self {
        Credential {
            service: service.into(),
            account: account.into(),
            secret: secret.into(),
        }
    }

    /// "service - account", or just the service when there is no account.
    pub fn display_name(&self) -> String {
        if self.account.is_empty() {
            self.service.clone()
        } else {
            format!("{} - {}", self.service, self.account)
        }
    }
}
