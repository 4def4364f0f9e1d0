use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "GKE_PORT_FORWARD_BINARY_";

pub struct ResolveCtx {
    pub explicit_path: Option<PathBuf>,
    pub search_path: Option<std::ffi::OsString>,
}

impl ResolveCtx {
    pub fn from_env(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            search_path: std::env::var_os("PATH"),
        }
    }
}

pub fn resolve_binary(name: &str, ctx: &ResolveCtx) -> Result<PathBuf> {
    if let Some(explicit) = ctx.explicit_path.as_ref() {
        if explicit.exists() {
            return Ok(explicit.clone());
        }
        return Err(not_found(
            name,
            format!("explicit binary path not found: {}", explicit.display()),
        ));
    }

    if let Some(env_path) = env_binary_override(name) {
        if env_path.exists() {
            return Ok(env_path);
        }
        return Err(not_found(
            name,
            format!(
                "binary override from environment not found: {}",
                env_path.display()
            ),
        ));
    }

    if let Some(path) = ctx
        .search_path
        .as_ref()
        .and_then(|search_path| find_on_path(name, search_path))
    {
        return Ok(path);
    }

    let message = format!(
        "binary not found: {name}\nSuggestions:\n  - install {name} and add it to PATH\n  - pass --{name}-binary <PATH>\n  - set {ENV_PREFIX}{}",
        normalize_env_key(name)
    );
    Err(not_found(name, message))
}

fn not_found(name: &str, message: String) -> Error {
    Error::BinaryNotFound {
        name: name.to_string(),
        message,
    }
}

fn binary_name(name: &str) -> String {
    if cfg!(windows) {
        if name.ends_with(".exe") {
            name.to_string()
        } else {
            format!("{name}.exe")
        }
    } else {
        name.to_string()
    }
}

fn find_on_path(binary: &str, search_path: &std::ffi::OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_path) {
        let candidate = dir.join(binary_name(binary));
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn env_binary_override(name: &str) -> Option<PathBuf> {
    let key = format!("{ENV_PREFIX}{}", normalize_env_key(name));
    std::env::var_os(key).map(PathBuf::from)
}

fn normalize_env_key(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
}
