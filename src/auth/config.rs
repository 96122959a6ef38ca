use std::time::Duration;
use url::Url;

/// Phone numbering scheme for the one supported country.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneScheme {
    pub country_prefix: String,
    pub national_digits: usize,
}

impl Default for PhoneScheme {
    /// Costa Rica: `+506` followed by 8 digits.
    fn default() -> Self {
        Self {
            country_prefix: "+506".to_string(),
            national_digits: 8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FlowConfig {
    phone: PhoneScheme,
    code_length: usize,
    redirect_delay: Duration,
    site_origin: Url,
    callback_path: String,
}

impl FlowConfig {
    /// Default flow config: `+506` + 8 digit phones, 6 character codes, a 2s
    /// pause before navigating home after the profile is saved, and
    /// `/auth/callback` as the federated callback path.
    #[must_use]
    pub fn new(site_origin: Url) -> Self {
        Self {
            phone: PhoneScheme::default(),
            code_length: 6,
            redirect_delay: Duration::from_secs(2),
            site_origin,
            callback_path: "/auth/callback".to_string(),
        }
    }

    #[must_use]
    pub fn with_phone_scheme(mut self, phone: PhoneScheme) -> Self {
        self.phone = phone;
        self
    }

    #[must_use]
    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length;
        self
    }

    #[must_use]
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    #[must_use]
    pub fn phone(&self) -> &PhoneScheme {
        &self.phone
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    #[must_use]
    pub fn redirect_delay(&self) -> Duration {
        self.redirect_delay
    }

    #[must_use]
    pub fn site_origin(&self) -> &Url {
        &self.site_origin
    }

    /// Absolute URL the identity service redirects back to after federated sign-in.
    ///
    /// # Errors
    /// Returns an error if the callback path cannot be joined onto the site origin.
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        self.site_origin.join(&self.callback_path)
    }
}
