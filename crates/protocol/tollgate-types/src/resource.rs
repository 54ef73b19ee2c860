//! Canonical resource URLs.
//!
//! A challenge is bound to a proof through the resource URL, so both sides
//! must agree on one spelling of it.

use url::Url;

use crate::error::{CodecError, CodecResult};

/// Build the canonical URL of a resource from the parts of a live request.
///
/// Scheme and host are lowercased, query and fragment are dropped, and a
/// trailing slash is removed from every path except the root.
pub fn canonical_resource_url(scheme: &str, host: &str, path: &str) -> CodecResult<String> {
    if host.is_empty() {
        return Err(CodecError::invalid("resource", "request has no host"));
    }
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    normalize_resource_url(&format!("{}://{}{}", scheme.to_ascii_lowercase(), host, path))
}

/// Normalize an absolute resource URL into canonical form.
pub fn normalize_resource_url(raw: &str) -> CodecResult<String> {
    let mut url = Url::parse(raw)
        .map_err(|e| CodecError::invalid("resource", format!("'{raw}': {e}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(CodecError::invalid(
            "resource",
            format!("'{raw}' is not a hierarchical URL"),
        ));
    }

    url.set_query(None);
    url.set_fragment(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    Ok(url.to_string())
}
