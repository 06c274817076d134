// Diagnostics extension constants

/// Identity of a VM extension as the compute API sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    /// Reference name used when attaching the extension to a VM
    pub reference_name: &'static str,
    pub publisher: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    /// Key of the parameter carrying the configuration document
    pub parameter_key: &'static str,
}

/// The diagnostics agent extension
pub const DIAGNOSTICS_EXTENSION: ExtensionDescriptor = ExtensionDescriptor {
    reference_name: "MyDiagnosticsAgent",
    publisher: "Microsoft.Compute",
    name: "DiagnosticsAgent",
    version: "0.1",
    parameter_key: "DiagnosticsAgentConfigParameter",
};

/// Namespace every element under `PublicConfig` must belong to
pub const DIAGNOSTICS_CONFIG_NAMESPACE: &str =
    "http://schemas.microsoft.com/ServiceHosting/2010/10/DiagnosticsConfiguration";

/// Protocol written into generated storage connection strings
pub const DEFAULT_ENDPOINTS_PROTOCOL: &str = "https";

/// Environment variable consulted when a settings file omits the account key
pub const ACCOUNT_KEY_ENV_VAR: &str = "VMDIAG_STORAGE_ACCOUNT_KEY";
