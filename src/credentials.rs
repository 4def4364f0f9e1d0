use serde::Deserialize;

use crate::error::{Error, Result};

/// A `kubernetes-engine` credential as injected into trusted extensions.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GkeCredentials {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub additional_properties: GkeCredentialAdditionalProperties,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GkeCredentialAdditionalProperties {
    #[serde(default)]
    pub service_account_keyfile: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub region: String,
}

pub fn parse_credentials(contents: &str) -> Result<Vec<GkeCredentials>> {
    serde_json::from_str(contents).map_err(|source| Error::CredentialParse { source })
}

/// Returns the first credential whose name matches exactly.
pub fn find_by_name<'a>(
    credentials: &'a [GkeCredentials],
    name: &str,
) -> Option<&'a GkeCredentials> {
    credentials.iter().find(|credential| credential.name == name)
}
