//! Diagnostics agent extension configuration document
//!
//! The document handed to the VM extension host looks like:
//!
//! ```xml
//! <Configuration>
//!   <Enabled>true</Enabled>
//!   <Public>
//!     <PublicConfig xmlns="http://schemas.microsoft.com/ServiceHosting/2010/10/DiagnosticsConfiguration">
//!       <WadCfg>...</WadCfg>
//!       <StorageAccountConnectionString>DefaultEndpointsProtocol=https;...</StorageAccountConnectionString>
//!     </PublicConfig>
//!   </Public>
//! </Configuration>
//! ```
//!
//! A disabled extension carries only the `Enabled` element.

use std::fmt;

use tracing::debug;

use super::connection_string::{format_connection_string, ConnectionString, StorageEndpoints};
use super::types::ExtensionReference;
use crate::config::{DIAGNOSTICS_CONFIG_NAMESPACE, DIAGNOSTICS_EXTENSION};
use crate::types::{Error, Result};
use crate::xml::{parse_document, to_xml_string, XmlElement};

/// Configuration of the diagnostics extension for one VM
///
/// Built either from explicit fields or by parsing a stored document, then
/// turned into a document or an extension reference. Parsing recovers the
/// account name but not the account key or explicit endpoints; the original
/// connection string is kept so the document can be written back unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct DiagnosticsExtensionBuilder {
    enabled: bool,
    storage_account_name: Option<String>,
    storage_account_key: Option<String>,
    endpoints: Option<StorageEndpoints>,
    diagnostics_configuration: Option<XmlElement>,
    storage_connection_string: Option<String>,
}

impl DiagnosticsExtensionBuilder {
    /// Validate and assemble a configuration
    ///
    /// When `enabled` is false the storage fields and the fragment are
    /// ignored; only the endpoint count is still checked.
    pub fn from_fields(
        storage_account_name: Option<&str>,
        storage_account_key: Option<&str>,
        endpoints: Option<&[&str]>,
        diagnostics_configuration: Option<XmlElement>,
        enabled: bool,
    ) -> Result<Self> {
        let endpoints = endpoints.map(StorageEndpoints::from_list).transpose()?;

        if !enabled {
            debug!("Diagnostics extension configured as disabled");
            return Ok(Self::disabled());
        }

        let storage_account_name = required("storage_account_name", storage_account_name)?;
        let storage_account_key = required("storage_account_key", storage_account_key)?;
        if let Some(endpoints) = &endpoints {
            for endpoint in [&endpoints.blob, &endpoints.queue, &endpoints.table] {
                check_connection_value("endpoints", endpoint)?;
            }
        }
        let diagnostics_configuration = diagnostics_configuration.ok_or_else(|| {
            Error::invalid_argument(
                "diagnostics_configuration",
                "a diagnostics configuration is required when the extension is enabled",
            )
        })?;

        debug!(
            "Diagnostics extension configured for storage account '{}' (explicit endpoints: {})",
            storage_account_name,
            endpoints.is_some()
        );

        Ok(Self {
            enabled: true,
            storage_account_name: Some(storage_account_name),
            storage_account_key: Some(storage_account_key),
            endpoints,
            diagnostics_configuration: Some(diagnostics_configuration),
            storage_connection_string: None,
        })
    }

    /// Enabled configuration writing to `storage_account_name`
    pub fn enabled(
        storage_account_name: &str,
        storage_account_key: &str,
        endpoints: Option<&[&str]>,
        diagnostics_configuration: XmlElement,
    ) -> Result<Self> {
        Self::from_fields(
            Some(storage_account_name),
            Some(storage_account_key),
            endpoints,
            Some(diagnostics_configuration),
            true,
        )
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            storage_account_name: None,
            storage_account_key: None,
            endpoints: None,
            diagnostics_configuration: None,
            storage_connection_string: None,
        }
    }

    /// Read a previously generated configuration document
    pub fn parse(document: &str) -> Result<Self> {
        let root = parse_document(document)?;

        let enabled_text = root
            .find("Enabled")
            .ok_or_else(|| Error::parse("configuration has no Enabled element"))?
            .text();
        let enabled = parse_bool(&enabled_text)?;

        let storage_connection_string = root
            .find("StorageAccountConnectionString")
            .map(XmlElement::text);
        let storage_account_name = match &storage_connection_string {
            Some(text) => Some(ConnectionString::parse(text)?.account_name().to_string()),
            None if enabled => {
                return Err(Error::parse(
                    "enabled configuration has no StorageAccountConnectionString element",
                ))
            }
            None => None,
        };

        let diagnostics_configuration = match root.find("WadCfg") {
            Some(wad_cfg) => Some(extract_fragment(wad_cfg)?),
            None if enabled => {
                return Err(Error::parse("enabled configuration has no WadCfg element"))
            }
            None => None,
        };

        debug!(
            "Parsed diagnostics configuration (enabled: {}, storage account: {:?})",
            enabled, storage_account_name
        );

        Ok(Self {
            enabled,
            storage_account_name,
            storage_account_key: None,
            endpoints: None,
            diagnostics_configuration,
            storage_connection_string,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn storage_account_name(&self) -> Option<&str> {
        self.storage_account_name.as_deref()
    }

    /// Only known for configurations built from fields
    pub fn storage_account_key(&self) -> Option<&str> {
        self.storage_account_key.as_deref()
    }

    pub fn endpoints(&self) -> Option<&StorageEndpoints> {
        self.endpoints.as_ref()
    }

    /// The caller's WadCfg fragment, without the diagnostics namespace
    pub fn diagnostics_configuration(&self) -> Option<&XmlElement> {
        self.diagnostics_configuration.as_ref()
    }

    /// Connection string read from a parsed document
    pub fn storage_connection_string(&self) -> Option<&str> {
        self.storage_connection_string.as_deref()
    }

    /// Render the configuration document
    pub fn to_document(&self) -> Result<String> {
        let document = to_xml_string(&self.document_tree()?)?;
        debug!("Generated diagnostics configuration document ({} bytes)", document.len());
        Ok(document)
    }

    /// Extension reference carrying the document as its single parameter
    pub fn resource_reference(&self) -> Result<ExtensionReference> {
        let mut reference = ExtensionReference::for_extension(&DIAGNOSTICS_EXTENSION);
        reference.set_parameter(DIAGNOSTICS_EXTENSION.parameter_key, self.to_document()?);
        Ok(reference)
    }

    /// Extension reference list to assign to a VM role
    pub fn resource_reference_list(&self) -> Result<Vec<ExtensionReference>> {
        Ok(vec![self.resource_reference()?])
    }

    fn document_tree(&self) -> Result<XmlElement> {
        let configuration = XmlElement::new("Configuration")
            .with_child(XmlElement::new("Enabled").with_text(self.enabled.to_string()));
        if !self.enabled {
            return Ok(configuration);
        }

        let wad_cfg = self.diagnostics_configuration.as_ref().ok_or_else(|| {
            Error::invalid_argument("diagnostics_configuration", "missing for an enabled extension")
        })?;

        let public_config = XmlElement::new("PublicConfig")
            .in_namespace(DIAGNOSTICS_CONFIG_NAMESPACE)
            .with_child(
                XmlElement::new("WadCfg")
                    .in_namespace(DIAGNOSTICS_CONFIG_NAMESPACE)
                    .with_child(wad_cfg.clone().adopt_namespace(DIAGNOSTICS_CONFIG_NAMESPACE)),
            )
            .with_child(
                XmlElement::new("StorageAccountConnectionString")
                    .in_namespace(DIAGNOSTICS_CONFIG_NAMESPACE)
                    .with_text(self.connection_string()?),
            );

        Ok(configuration.with_child(XmlElement::new("Public").with_child(public_config)))
    }

    fn connection_string(&self) -> Result<String> {
        if let Some(parsed) = &self.storage_connection_string {
            return Ok(parsed.clone());
        }
        match (&self.storage_account_name, &self.storage_account_key) {
            (Some(name), Some(key)) => Ok(format_connection_string(name, key, self.endpoints.as_ref())),
            _ => Err(Error::invalid_argument(
                "storage_account_key",
                "storage credentials are missing for an enabled extension",
            )),
        }
    }
}

impl fmt::Debug for DiagnosticsExtensionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsExtensionBuilder")
            .field("enabled", &self.enabled)
            .field("storage_account_name", &self.storage_account_name)
            .field("storage_account_key", &self.storage_account_key.as_ref().map(|_| REDACTED))
            .field("endpoints", &self.endpoints)
            .field("diagnostics_configuration", &self.diagnostics_configuration)
            .field(
                "storage_connection_string",
                &self.storage_connection_string.as_ref().map(|_| REDACTED),
            )
            .finish()
    }
}

const REDACTED: &str = "<redacted>";

fn required(name: &'static str, value: Option<&str>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => {
            check_connection_value(name, v)?;
            Ok(v.to_string())
        }
        _ => Err(Error::invalid_argument(
            name,
            "must not be empty when the extension is enabled",
        )),
    }
}

/// Values embedded in the connection string must read back unchanged
fn check_connection_value(name: &'static str, value: &str) -> Result<()> {
    if value.contains(';') {
        return Err(Error::invalid_argument(name, "must not contain ';'"));
    }
    if value.trim() != value {
        return Err(Error::invalid_argument(
            name,
            "must not have leading or trailing whitespace",
        ));
    }
    Ok(())
}

fn parse_bool(text: &str) -> Result<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::parse(format!("Enabled value `{}` is not a boolean", text)))
    }
}

/// The single element under `WadCfg`, moved back out of the diagnostics namespace
fn extract_fragment(wad_cfg: &XmlElement) -> Result<XmlElement> {
    let mut elements = wad_cfg.elements();
    match (elements.next(), elements.next()) {
        (Some(fragment), None) if !wad_cfg.has_text() => {
            Ok(fragment.clone().release_namespace(DIAGNOSTICS_CONFIG_NAMESPACE))
        }
        (None, _) => Err(Error::parse("WadCfg element holds no diagnostics configuration")),
        _ => Err(Error::parse("WadCfg element must hold exactly one configuration element")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> XmlElement {
        parse_document(
            r#"<DiagnosticMonitorConfiguration overallQuotaInMB="4096">
                 <Logs scheduledTransferPeriod="PT1M"/>
                 <WindowsEventLog><DataSource name="System!*"/></WindowsEventLog>
               </DiagnosticMonitorConfiguration>"#,
        )
        .unwrap()
    }

    #[test]
    fn disabled_document_holds_only_the_flag() {
        let builder = DiagnosticsExtensionBuilder::disabled();
        assert_eq!(
            builder.to_document().unwrap(),
            "<Configuration>\n  <Enabled>false</Enabled>\n</Configuration>"
        );
    }

    #[test]
    fn disabled_ignores_credentials() {
        let builder =
            DiagnosticsExtensionBuilder::from_fields(Some("name"), None, None, Some(fragment()), false)
                .unwrap();
        assert_eq!(builder, DiagnosticsExtensionBuilder::disabled());
    }

    #[test]
    fn enabled_requires_credentials_and_fragment() {
        let cases = [
            (None, Some("key"), Some(fragment()), "storage_account_name"),
            (Some(""), Some("key"), Some(fragment()), "storage_account_name"),
            (Some("name"), Some(""), Some(fragment()), "storage_account_key"),
            (Some("name"), None, Some(fragment()), "storage_account_key"),
            (Some("name"), Some("key"), None, "diagnostics_configuration"),
        ];
        for (name, key, cfg, field) in cases {
            match DiagnosticsExtensionBuilder::from_fields(name, key, None, cfg, true) {
                Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, field),
                other => panic!("expected invalid argument for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn enabled_document_layout() {
        let builder = DiagnosticsExtensionBuilder::enabled(
            "acct",
            "key",
            None,
            XmlElement::new("DiagnosticMonitorConfiguration").with_attribute("a", "1"),
        )
        .unwrap();

        let expected = format!(
            "<Configuration>\n  <Enabled>true</Enabled>\n  <Public>\n    <PublicConfig xmlns=\"{}\">\n      \
             <WadCfg>\n        <DiagnosticMonitorConfiguration a=\"1\"/>\n      </WadCfg>\n      \
             <StorageAccountConnectionString>DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=key\
             </StorageAccountConnectionString>\n    </PublicConfig>\n  </Public>\n</Configuration>",
            DIAGNOSTICS_CONFIG_NAMESPACE
        );
        assert_eq!(builder.to_document().unwrap(), expected);
    }

    #[test]
    fn caller_fragment_is_not_modified() {
        let original = fragment();
        let builder = DiagnosticsExtensionBuilder::enabled("acct", "key", None, original.clone()).unwrap();
        builder.to_document().unwrap();
        assert_eq!(builder.diagnostics_configuration(), Some(&original));
        assert!(original.descendants().all(|e| e.namespace.is_none()));
    }

    #[test]
    fn parse_recovers_name_and_fragment_but_not_key() {
        let builder = DiagnosticsExtensionBuilder::enabled("acct", "secret", None, fragment()).unwrap();
        let parsed = DiagnosticsExtensionBuilder::parse(&builder.to_document().unwrap()).unwrap();

        assert!(parsed.is_enabled());
        assert_eq!(parsed.storage_account_name(), Some("acct"));
        assert_eq!(parsed.storage_account_key(), None);
        assert_eq!(parsed.endpoints(), None);
        assert_eq!(parsed.diagnostics_configuration(), Some(&fragment()));
        assert_eq!(
            parsed.storage_connection_string(),
            Some("DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=secret")
        );
        assert_eq!(builder.storage_connection_string(), None);
    }

    #[test]
    fn values_that_would_break_the_connection_string_are_rejected() {
        let cases = [
            ("acct;x", "key", None, "storage_account_name"),
            (" acct ", "key", None, "storage_account_name"),
            ("acct\t", "key", None, "storage_account_name"),
            ("acct", "k;AccountName=evil", None, "storage_account_key"),
            ("acct", " key", None, "storage_account_key"),
            ("acct", "key", Some(["https://b;x", "https://q", "https://t"]), "endpoints"),
            ("acct", "key", Some(["https://b", "https://q ", "https://t"]), "endpoints"),
        ];
        for (name, key, endpoints, field) in cases {
            let endpoints = endpoints.as_ref().map(|list| &list[..]);
            match DiagnosticsExtensionBuilder::enabled(name, key, endpoints, fragment()) {
                Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, field),
                other => panic!("expected invalid argument for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn account_name_survives_the_document_round_trip() {
        for name in ["acct", "my-account", "acct=1"] {
            let builder = DiagnosticsExtensionBuilder::enabled(name, "a2V5==", None, fragment()).unwrap();
            let parsed = DiagnosticsExtensionBuilder::parse(&builder.to_document().unwrap()).unwrap();
            assert_eq!(parsed.storage_account_name(), Some(name));
        }
    }

    #[test]
    fn debug_output_hides_the_account_key() {
        let builder = DiagnosticsExtensionBuilder::enabled("acct", "c2VjcmV0a2V5", None, fragment()).unwrap();
        let debug = format!("{:?}", builder);
        assert!(debug.contains("acct"));
        assert!(!debug.contains("c2VjcmV0a2V5"));

        let parsed = DiagnosticsExtensionBuilder::parse(&builder.to_document().unwrap()).unwrap();
        assert!(!format!("{:?}", parsed).contains("c2VjcmV0a2V5"));
    }

    #[test]
    fn parse_accepts_boolean_case_and_padding() {
        let parsed =
            DiagnosticsExtensionBuilder::parse("<Configuration><Enabled> False </Enabled></Configuration>")
                .unwrap();
        assert!(!parsed.is_enabled());
        assert_eq!(parsed.diagnostics_configuration(), None);
    }

    #[test]
    fn parse_rejects_incomplete_enabled_documents() {
        let no_wadcfg = format!(
            "<Configuration><Enabled>true</Enabled><Public><PublicConfig xmlns=\"{}\">\
             <StorageAccountConnectionString>AccountName=a;AccountKey=k</StorageAccountConnectionString>\
             </PublicConfig></Public></Configuration>",
            DIAGNOSTICS_CONFIG_NAMESPACE
        );
        let empty_wadcfg = no_wadcfg.replace("<StorageAccountConnectionString>", "<WadCfg/><StorageAccountConnectionString>");
        let no_connection = "<Configuration><Enabled>true</Enabled><Public><PublicConfig><WadCfg><X/></WadCfg></PublicConfig></Public></Configuration>";
        let bad_connection = "<Configuration><Enabled>true</Enabled><WadCfg><X/></WadCfg><StorageAccountConnectionString>garbage</StorageAccountConnectionString></Configuration>";
        let no_enabled = "<Configuration/>";

        for document in [no_wadcfg.as_str(), empty_wadcfg.as_str(), no_connection, bad_connection, no_enabled] {
            assert!(
                matches!(DiagnosticsExtensionBuilder::parse(document), Err(Error::Parse(_))),
                "expected parse error for {}",
                document
            );
        }
    }

    #[test]
    fn reference_has_exactly_one_configuration_parameter() {
        let reference = DiagnosticsExtensionBuilder::disabled().resource_reference().unwrap();
        assert_eq!(reference.reference_name, DIAGNOSTICS_EXTENSION.reference_name);
        assert_eq!(reference.publisher, DIAGNOSTICS_EXTENSION.publisher);
        assert_eq!(reference.name, DIAGNOSTICS_EXTENSION.name);
        assert_eq!(reference.version, DIAGNOSTICS_EXTENSION.version);
        assert_eq!(reference.parameter_values.len(), 1);
        assert_eq!(reference.parameter_values[0].key, DIAGNOSTICS_EXTENSION.parameter_key);
    }
}
