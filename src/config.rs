//! Session and catalog configuration
//!
//! Engine addresses can be given as a connection string:
//! - `host:port`
//! - `host` (default port)
//! - `//host:port` (with optional leading slashes)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default engine callback port
pub const DEFAULT_PORT: u16 = 5500;

/// Default number of tuples requested per fetch
pub const DEFAULT_FETCH_SIZE: i32 = 100;

/// Default largest accepted frame payload (16 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default name of the compiled code catalog relation
pub const DEFAULT_CODE_TABLE: &str = "_db_stored_procedure_code";

/// Character set of CLOB content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
}

impl Charset {
    /// Decode bytes in this character set
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::ValueConversion(format!("invalid UTF-8: {}", e))),
            // Every byte maps to the code point of the same value
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf8" | "utf-8" => Ok(Charset::Utf8),
            "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Charset::Latin1),
            other => Err(Error::InvalidConfig(format!("unsupported charset: {}", other))),
        }
    }
}

/// Configuration for an RPC session with the engine.
///
/// # Examples
///
/// ```rust
/// use pl_runtime::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new("localhost", 5500)
///     .connect_timeout(Duration::from_secs(5))
///     .fetch_size(500);
///
/// let parsed: SessionConfig = "localhost:5500".parse().unwrap();
/// assert_eq!(parsed.port, 5500);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host to connect to
    pub host: String,
    /// Port to connect to
    pub port: u16,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Character set of CLOB content
    pub charset: Charset,
    /// Tuples requested per fetch when the caller passes 0
    pub fetch_size: i32,
    /// Largest accepted incoming frame payload
    pub max_frame_size: usize,
}

impl SessionConfig {
    /// Create a new configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            charset: Charset::Utf8,
            fetch_size: DEFAULT_FETCH_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the character set
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Set the default fetch size
    pub fn fetch_size(mut self, size: i32) -> Self {
        self.fetch_size = size;
        self
    }

    /// Set the largest accepted frame payload
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check that the values are usable
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig("missing host".to_string()));
        }
        if self.fetch_size <= 0 {
            return Err(Error::InvalidConfig(format!(
                "fetch size must be positive, got {}",
                self.fetch_size
            )));
        }
        if self.max_frame_size < 8 {
            return Err(Error::InvalidConfig(format!(
                "max frame size too small: {}",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl FromStr for SessionConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches('/');

        if s.is_empty() {
            return Err(Error::InvalidConfig("empty connection string".to_string()));
        }

        let mut config = SessionConfig::default();
        let parts: Vec<&str> = s.split(':').collect();
        match parts.len() {
            1 => {
                config.host = parts[0].to_string();
            }
            2 => {
                config.host = parts[0].to_string();
                config.port = parts[1]
                    .parse()
                    .map_err(|_| Error::InvalidConfig("invalid port number".to_string()))?;
            }
            _ => {
                return Err(Error::InvalidConfig(
                    "too many colons in connection string".to_string(),
                ));
            }
        }

        if config.host.is_empty() {
            return Err(Error::InvalidConfig("missing host".to_string()));
        }

        Ok(config)
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What to do when the catalog query itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogErrorPolicy {
    /// Return the error to the caller
    #[default]
    Propagate,
    /// Log the error and report the code as not found
    TreatAsNotFound,
}

/// Configuration for compiled code catalog access
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Relation holding compiled code rows
    pub table: String,
    /// Handling of catalog query failures
    pub error_policy: CatalogErrorPolicy,
}

impl CatalogConfig {
    /// Create a configuration for the default catalog relation
    pub fn new() -> Self {
        Self {
            table: DEFAULT_CODE_TABLE.to_string(),
            error_policy: CatalogErrorPolicy::Propagate,
        }
    }

    /// Use a different catalog relation
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the catalog error policy
    pub fn error_policy(mut self, policy: CatalogErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let config: SessionConfig = "myhost:5501".parse().unwrap();
        assert_eq!(config.host, "myhost");
        assert_eq!(config.port, 5501);
    }

    #[test]
    fn test_parse_host_only() {
        let config: SessionConfig = "myhost".parse().unwrap();
        assert_eq!(config.host, "myhost");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_with_slashes() {
        let config: SessionConfig = "//myhost:5501".parse().unwrap();
        assert_eq!(config.host, "myhost");
        assert_eq!(config.port, 5501);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<SessionConfig>().is_err());
        assert!("myhost:notaport".parse::<SessionConfig>().is_err());
        assert!("a:1:2".parse::<SessionConfig>().is_err());
        assert!(":5500".parse::<SessionConfig>().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = SessionConfig::new("host", 5500)
            .connect_timeout(Duration::from_secs(30))
            .charset(Charset::Latin1)
            .fetch_size(10);

        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.charset, Charset::Latin1);
        assert_eq!(config.fetch_size, 10);
        assert_eq!(config.to_string(), "host:5500");
        assert!(config.validate().is_ok());
        assert!(config.fetch_size(0).validate().is_err());
    }

    #[test]
    fn test_charset_latin1() {
        let cs: Charset = "ISO-8859-1".parse().unwrap();
        assert_eq!(cs, Charset::Latin1);
        assert_eq!(cs.decode(&[0x63, 0x61, 0x66, 0xe9]).unwrap(), "café");
    }

    #[test]
    fn test_charset_utf8_invalid() {
        assert!(Charset::Utf8.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_catalog_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.table, DEFAULT_CODE_TABLE);
        assert_eq!(config.error_policy, CatalogErrorPolicy::Propagate);
    }
}
