//! Construction-time server configuration

/// Address used when none is configured
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:25";

const WILDCARD_HOST: &str = "0.0.0.0";

/// Settings the server needs before it binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listening address; empty means [`DEFAULT_ADDRESS`]
    pub address: String,
    /// Hostname echoed in the greeting and HELO/EHLO replies
    pub hostname: String,
}

impl ServerConfig {
    pub fn new(address: &str, hostname: &str) -> Self {
        Self {
            address: address.to_owned(),
            hostname: hostname.to_owned(),
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_owned();
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_owned();
        self
    }

    /// The address actually handed to the socket layer.
    ///
    /// An empty address falls back to the well-known SMTP port on all
    /// interfaces, and a bare `:PORT` binds that port on all interfaces.
    pub fn resolved_address(&self) -> String {
        let addr = self.address.trim();
        if addr.is_empty() {
            DEFAULT_ADDRESS.to_owned()
        } else if addr.starts_with(':') {
            format!("{WILDCARD_HOST}{addr}")
        } else {
            addr.to_owned()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("", "localhost")
    }
}
