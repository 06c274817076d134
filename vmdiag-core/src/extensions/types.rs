use serde::{Deserialize, Serialize};

use crate::config::ExtensionDescriptor;

/// Extension attached to a VM role, as exchanged with the compute API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionReference {
    pub reference_name: String,
    pub publisher: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "ResourceExtensionParameterValues", default)]
    pub parameter_values: Vec<ParameterValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterValue {
    pub key: String,
    pub value: String,
}

impl ExtensionReference {
    /// Reference carrying the descriptor's identity and no parameters yet
    pub fn for_extension(descriptor: &ExtensionDescriptor) -> Self {
        Self {
            reference_name: descriptor.reference_name.to_string(),
            publisher: descriptor.publisher.to_string(),
            name: descriptor.name.to_string(),
            version: descriptor.version.to_string(),
            parameter_values: Vec::new(),
        }
    }

    /// Whether this reference points at the given extension type
    pub fn is_extension(&self, descriptor: &ExtensionDescriptor) -> bool {
        self.name == descriptor.name && self.publisher == descriptor.publisher
    }

    /// Value of the first parameter with `key`
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameter_values
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Set `key` to `value`, replacing any existing entries with that key
    pub fn set_parameter(&mut self, key: &str, value: String) {
        self.parameter_values.retain(|p| p.key != key);
        self.parameter_values.push(ParameterValue {
            key: key.to_string(),
            value,
        });
    }
}

/// Diagnostics extension state read back from a VM's extension references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiagnosticsExtensionContext {
    pub name: String,
    pub publisher: String,
    pub reference_name: String,
    pub version: String,
    pub enabled: bool,
    pub storage_account_name: String,
    /// The WadCfg fragment, serialized
    pub diagnostics_configuration: Option<String>,
}
