//! URL canonicalization and stable identity hashing

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters that only carry referral or campaign tracking
const TRACKING_PARAMS: &[&str] = &[
    "ref",
    "source",
    "feature",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_name",
    "utm_reader",
];

/// Length of the hex identity returned by [`stable_id`]
pub const STABLE_ID_LEN: usize = 24;

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

/// Normalize a raw URL into its canonical form
///
/// Drops the fragment, tracking query parameters and a single trailing `/`
/// (the root path is kept). Input that is not an absolute URL is returned
/// unchanged.
pub fn canonicalize(raw: &str) -> String {
    let mut url = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let kept: Vec<&(String, String)> =
            pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();

        // Untouched queries keep their original encoding
        if kept.len() != pairs.len() {
            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }

    url.to_string()
}

/// Hostname of a URL with any leading `www.` removed
pub fn domain_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Deterministic identity from ordered parts
///
/// SHA-256 of the parts joined with `|`, truncated to 24 hex characters.
pub fn stable_id<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("|");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(STABLE_ID_LEN);
    id
}
