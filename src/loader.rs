//! Document loading from files, strings, and HTTP URLs.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CsdlError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a CSDL JSON document from a file path.
///
/// # Errors
///
/// Returns `CsdlError::FileNotFound` if the file doesn't exist,
/// or `CsdlError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, CsdlError> {
    let content = read_text(path)?;
    load_document_str(&content)
}

/// Read a file into a string.
pub(crate) fn read_text(path: &Path) -> Result<String, CsdlError> {
    if !path.exists() {
        return Err(CsdlError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| CsdlError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a CSDL JSON document from a JSON string.
///
/// # Errors
///
/// Returns `CsdlError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, CsdlError> {
    serde_json::from_str(content).map_err(|source| CsdlError::InvalidJson { source })
}

/// Fetch the text behind an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
pub(crate) fn fetch_text(url: &str) -> Result<String, CsdlError> {
    let network = |source| CsdlError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before reading the body
    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)
}

/// Load a CSDL JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `CsdlError::NetworkError` if the request fails,
/// or `CsdlError::InvalidJson` if the response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, CsdlError> {
    let text = fetch_text(url)?;
    load_document_str(&text)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, CsdlError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(CsdlError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Map a reference URI to a local file path.
///
/// If URL mapping is configured and the URI starts with `remote_base`, that
/// prefix is stripped and the remainder joined to `local_base`. Otherwise the
/// URI is treated as a path relative to `base_dir`.
pub(crate) fn resolve_uri_to_path(
    uri: &str,
    base_dir: &Path,
    local_base: Option<&Path>,
    remote_base: Option<&str>,
) -> PathBuf {
    if let (Some(local_base), Some(remote_base)) = (local_base, remote_base) {
        if let Some(remainder) = uri.strip_prefix(remote_base) {
            return local_base.join(remainder.trim_start_matches('/'));
        }
    }

    base_dir.join(uri)
}
