use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Prefix joined with the release target name to find credentials by convention.
pub const CREDENTIALS_PREFIX: &str = "gke-";

/// Extension parameters, taken from the manifest's custom properties.
///
/// An empty string means the value was not set.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub service: String,
    #[serde(default, deserialize_with = "port_string")]
    pub service_port: String,
    #[serde(default, deserialize_with = "port_string")]
    pub local_port: String,
}

impl Params {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_bw::from_str(contents).map_err(|source| Error::ConfigParse { source })
    }

    /// Fills the local port and credential name when they are not set.
    ///
    /// Values that are already set are never overwritten, so calling this twice is a no-op.
    pub fn set_defaults(&mut self, release_target_name: &str) {
        if self.local_port.is_empty() && !self.service_port.is_empty() {
            self.local_port = self.service_port.clone();
        }

        if self.credentials.is_empty() && !release_target_name.is_empty() {
            self.credentials = format!("{CREDENTIALS_PREFIX}{release_target_name}");
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

// Ports show up quoted or bare in manifests.
fn port_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<PortValue>::deserialize(deserializer)? {
        None => String::new(),
        Some(PortValue::Text(value)) => value,
        Some(PortValue::Signed(value)) => value.to_string(),
        Some(PortValue::Unsigned(value)) => value.to_string(),
    })
}
