use crate::entry::Credential;
use anyhow::{Context, anyhow};
use std::path::Path;
use url::Url;

/// Read an export file with one otpauth:// URI per line.
pub fn parse_file(path: &Path) -> anyhow::Result<Vec<Credential>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read import file {}", path.display()))?;
    Ok(parse_secrets(&data))
}

/// Collect credentials from export text, skipping lines that cannot be used.
pub fn parse_secrets(text: &str) -> Vec<Credential> {
    let mut out = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_otpauth_line(line) {
            Ok(Some(cred)) => out.push(cred),
            Ok(None) => {}
            Err(e) => tracing::warn!(line = idx + 1, "skipping entry: {e}"),
        }
    }

    tracing::debug!(count = out.len(), "parsed enrollment URIs");
    out
}

/// Разобрать одну строку экспорта:
/// - не otpauth:// → Ok(None)
/// - otpauth://totp/... с secret → Ok(Some(..))
/// - всё остальное → Err
fn parse_otpauth_line(line: &str) -> anyhow::Result<Option<Credential>> {
    let url = match Url::parse(line) {
        Ok(url) => url,
        // Not a URI at all, e.g. a header line in the export.
        Err(_) if !line.starts_with("otpauth:") => return Ok(None),
        Err(e) => return Err(anyhow!("invalid otpauth URL: {e}")),
    };

    if url.scheme() != "otpauth" {
        return Ok(None);
    }

    let kind = url.host_str().unwrap_or("").to_lowercase();
    if kind != "totp" {
        return Err(anyhow!(
            "unsupported otpauth type '{}', only 'totp' is supported",
            kind
        ));
    }

    let label = urlencoding::decode(url.path())
        .map_err(|e| anyhow!("label is not valid UTF-8: {e}"))?;
    let label = label.trim_matches('/');

    let mut secret: Option<String> = None;
    let mut issuer: Option<String> = None;

    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "secret" => secret = Some(v.to_string()),
            "issuer" => issuer = Some(v.to_string()),
            "digits" if v != "6" => {
                tracing::warn!(label, digits = %v, "ignoring digits, codes are always 6 digits")
            }
            "period" if v != "30" => {
                tracing::warn!(label, period = %v, "ignoring period, codes use a 30s step")
            }
            "algorithm" if !v.eq_ignore_ascii_case("SHA1") => {
                tracing::warn!(label, algorithm = %v, "ignoring algorithm, codes use SHA1")
            }
            _ => {}
        }
    }

    let secret = match secret {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(anyhow!("otpauth URL missing 'secret' param")),
    };

    let (service, account) = split_label(label, issuer.as_deref());
    Ok(Some(Credential::new(service, account, secret)))
}

/// Split "Issuer:account" into its parts.
///
/// Without an issuer prefix the `issuer` query parameter names the service
/// when present, otherwise the whole label does.
fn split_label(label: &str, issuer: Option<&str>) -> (String, String) {
    if let Some((service, account)) = label.split_once(':') {
        return (service.to_string(), account.to_string());
    }

    let label = label.trim_matches(':');
    match issuer {
        Some(iss) if !iss.is_empty() && !label.is_empty() => (iss.to_string(), label.to_string()),
        Some(iss) if !iss.is_empty() => (iss.to_string(), String::new()),
        _ => (label.to_string(), String::new()),
    }
}
