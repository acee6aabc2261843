//! Reading the three documents a form is built from: the JSON Schema, the
//! uiSchema and the form data.
//!
//! Each may come from a local file, an inline string, or (with the `remote`
//! feature) an `http(s)://` URL. Property order is kept as written so
//! wildcard expansion in `ui:order` sees fields in document order.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;

use crate::error::ResolveError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Upper bound on a remote fetch.
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read a schema, uiSchema or form-data file.
///
/// # Errors
///
/// `ResolveError::FileNotFound` for a missing path, `ResolveError::ReadError`
/// for other IO failures, `ResolveError::InvalidJson` for malformed content.
pub fn load_json(path: &Path) -> Result<Value, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ResolveError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ResolveError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;

    load_json_str(&content)
}

/// Parse a document given inline, such as form data passed by a caller.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` for malformed content.
pub fn load_json_str(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })
}

/// Fetch a document over HTTP with a blocking client.
///
/// Non-2xx responses count as failures.
///
/// # Errors
///
/// Returns `ResolveError::NetworkError` when the request, the status or the
/// body decoding fails.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, ResolveError> {
    let network = |source| ResolveError::NetworkError {
        url: url.to_string(),
        source,
    };

    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .and_then(|client| client.get(url).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Whether a CLI source argument names a remote document.
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load from whatever `source` names: a URL when [`is_url`] says so,
/// otherwise a file path.
///
/// Without the `remote` feature a URL is reported as a missing file.
pub fn load_json_auto(source: &str) -> Result<Value, ResolveError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(ResolveError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}
