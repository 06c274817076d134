use std::fmt;

use crate::config::DEFAULT_ENDPOINTS_PROTOCOL;
use crate::types::{Error, Result};

/// Explicit blob, queue and table service endpoints of a storage account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEndpoints {
    pub blob: String,
    pub queue: String,
    pub table: String,
}

impl StorageEndpoints {
    /// Build from a `[blob, queue, table]` list; any other length is rejected
    pub fn from_list(endpoints: &[&str]) -> Result<Self> {
        match endpoints {
            [blob, queue, table] => Ok(Self {
                blob: blob.to_string(),
                queue: queue.to_string(),
                table: table.to_string(),
            }),
            _ => Err(Error::invalid_argument(
                "endpoints",
                format!(
                    "expected blob, queue and table endpoints (3 entries), got {}",
                    endpoints.len()
                ),
            )),
        }
    }
}

/// Storage connection string written into the diagnostics configuration
pub fn format_connection_string(
    account_name: &str,
    account_key: &str,
    endpoints: Option<&StorageEndpoints>,
) -> String {
    let mut connection_string = format!(
        "DefaultEndpointsProtocol={};AccountName={};AccountKey={}",
        DEFAULT_ENDPOINTS_PROTOCOL, account_name, account_key
    );
    if let Some(endpoints) = endpoints {
        connection_string.push_str(&format!(
            ";BlobEndpoint={};QueueEndpoint={};TableEndpoint={}",
            endpoints.blob, endpoints.queue, endpoints.table
        ));
    }
    connection_string
}

/// A parsed `key=value;key=value` connection string
///
/// Only the account name has a typed accessor. The account key stays inside
/// the settings list and is never surfaced on its own.
#[derive(Clone)]
pub struct ConnectionString {
    settings: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::parse("storage connection string is empty"));
        }

        let mut settings: Vec<(String, String)> = Vec::new();
        for segment in text.split(';').filter(|s| !s.trim().is_empty()) {
            // Values such as base64 account keys may themselves contain '='
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                Error::parse("storage connection string has a setting without '='")
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::parse("storage connection string has an empty setting name"));
            }
            if settings.iter().any(|(k, _)| k.eq_ignore_ascii_case(key)) {
                return Err(Error::parse(format!(
                    "storage connection string repeats setting `{}`",
                    key
                )));
            }
            settings.push((key.to_string(), value.to_string()));
        }

        let connection_string = Self { settings };
        match connection_string.get("AccountName") {
            Some(name) if !name.is_empty() => Ok(connection_string),
            _ => Err(Error::parse("storage connection string has no AccountName")),
        }
    }

    /// Setting value by case-insensitive name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn account_name(&self) -> &str {
        // parse() guarantees the setting exists
        self.get("AccountName").unwrap_or_default()
    }
}

/// Settings whose values are credentials
const SECRET_SETTINGS: [&str; 2] = ["AccountKey", "SharedAccessSignature"];

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.settings {
            if SECRET_SETTINGS.iter().any(|s| s.eq_ignore_ascii_case(key)) {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}
