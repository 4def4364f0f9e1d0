use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};

/// Where the service account key file is stored for `gcloud auth activate-service-account`.
pub const DEFAULT_KEY_FILE_PATH: &str = "/key-file.json";

const CLIENT_EMAIL: &str = "client_email";

/// Reads the service account identity; the rest of the key file is only written to disk.
///
/// `"client_email": null` counts as present with the wrong type.
pub fn extract_client_email(key_file: &str) -> Result<String> {
    let document: Value =
        serde_json::from_str(key_file).map_err(|source| Error::KeyFileParse { source })?;
    let Some(fields) = document.as_object() else {
        return Err(Error::KeyFileParse {
            source: <serde_json::Error as serde::de::Error>::custom(format!(
                "expected a JSON object, found {}",
                json_type_name(&document)
            )),
        });
    };

    match fields.get(CLIENT_EMAIL) {
        None => Err(Error::MissingField {
            field: CLIENT_EMAIL,
        }),
        Some(Value::String(email)) => Ok(email.clone()),
        Some(other) => Err(Error::WrongFieldType {
            field: CLIENT_EMAIL,
            found: json_type_name(other),
        }),
    }
}

/// Writes the raw key file so that only the current user can read it.
pub fn persist_key_file(path: &Path, key_file: &str) -> Result<()> {
    write_owner_only(path, key_file.as_bytes()).map_err(|source| Error::KeyFilePersist {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
