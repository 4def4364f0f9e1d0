use tracing::info;

use crate::credentials::{self, GkeCredentials};
use crate::error::{Error, Result};
use crate::key_file;
use crate::params::Params;
use crate::plan::{self, CommandPlan, Tools};

/// Raw inputs as handed to the extension by the pipeline.
#[derive(Clone, Debug, Default)]
pub struct Inputs {
    pub params_yaml: String,
    pub release_target_name: Option<String>,
    pub credentials_json: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PreparedRun {
    pub params: Params,
    pub credential: GkeCredentials,
    pub service_account_email: String,
    pub plan: CommandPlan,
}

/// Resolves credentials, stores the key file and builds the plan.
///
/// No subprocess is spawned here; every failure is returned before the plan runs.
pub fn prepare(inputs: &Inputs, tools: &Tools) -> Result<PreparedRun> {
    info!("Unmarshalling parameters / custom properties...");
    let mut params = Params::from_yaml(&inputs.params_yaml)?;

    info!("Setting defaults for parameters that are not set in the manifest...");
    params.set_defaults(inputs.release_target_name.as_deref().unwrap_or_default());

    let credentials_json = inputs
        .credentials_json
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or(Error::CredentialsNotInjected)?;

    info!("Unmarshalling injected credentials...");
    let injected = credentials::parse_credentials(credentials_json)?;

    info!(credential = %params.credentials, "Checking if credential exists...");
    let credential = credentials::find_by_name(&injected, &params.credentials)
        .cloned()
        .ok_or_else(|| Error::CredentialNotFound {
            name: params.credentials.clone(),
        })?;

    info!("Retrieving service account email from credentials...");
    let key_file_text = &credential.additional_properties.service_account_keyfile;
    let service_account_email = key_file::extract_client_email(key_file_text)?;

    info!(
        credential = %credential.name,
        path = %tools.key_file.display(),
        "Storing gke credential on disk..."
    );
    key_file::persist_key_file(&tools.key_file, key_file_text)?;

    let plan = plan::build_plan(&params, &credential, &service_account_email, tools)?;

    Ok(PreparedRun {
        params,
        credential,
        service_account_email,
        plan,
    })
}
