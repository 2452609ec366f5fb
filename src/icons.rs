use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOGO_DEV_API_URL: &str = "https://img.logo.dev";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Icon used when a service has no cached logo.
pub const FALLBACK_ICON: &str = "icon.png";

/// On-disk cache of service logos fetched from logo.dev.
pub struct IconCache {
    dir: PathBuf,
    api_key: Option<String>,
}

impl IconCache {
    pub fn new(dir: impl Into<PathBuf>, api_key: Option<String>) -> Self {
        IconCache {
            dir: dir.into(),
            api_key,
        }
    }

    fn cached_file(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{}.png", sanitize(service)))
    }

    /// Path of the cached logo, or [`FALLBACK_ICON`] if none was downloaded yet.
    pub fn icon_path(&self, service: &str) -> PathBuf {
        let path = self.cached_file(service);
        if path.exists() {
            path
        } else {
            PathBuf::from(FALLBACK_ICON)
        }
    }

    /// Fetch logos that are not cached yet. Failures are logged, never returned.
    pub fn download_all<'a>(&self, services: impl IntoIterator<Item = &'a str>) {
        let Some(key) = self.api_key.as_deref() else {
            tracing::info!("LOGO_DEV_API_KEY is not set, skipping icon download");
            return;
        };

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), "cannot create icon dir: {e}");
            return;
        }

        let mut client = None;
        for service in services {
            let path = self.cached_file(service);
            if path.exists() {
                continue;
            }

            let client = match client.get_or_insert_with(build_client) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("cannot build HTTP client: {e}");
                    return;
                }
            };

            match download_icon(client, &logo_url(service, key), &path) {
                Ok(true) => tracing::debug!(service, path = %path.display(), "icon saved"),
                Ok(false) => tracing::debug!(service, "no icon available"),
                Err(e) => tracing::warn!(service, "icon download failed: {e:#}"),
            }
        }
    }
}

/// "Google Mail" → "googlemail"
pub fn sanitize(service: &str) -> String {
    service.replace(' ', "").to_lowercase()
}

/// Logo URL for a service, guessing the domain as `<name>.com`.
pub fn logo_url(service: &str, api_key: &str) -> String {
    format!(
        "{LOGO_DEV_API_URL}/{}.com?token={}",
        urlencoding::encode(&sanitize(service)),
        urlencoding::encode(api_key)
    )
}

fn build_client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
}

/// Returns false when the provider has no logo (non-200 status).
fn download_icon(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> anyhow::Result<bool> {
    // The URL carries the API token, keep it out of error messages.
    let resp = client
        .get(url)
        .send()
        .map_err(|e| anyhow!("request failed: {}", e.without_url()))?;

    if resp.status() != reqwest::StatusCode::OK {
        return Ok(false);
    }

    let bytes = resp.bytes().context("cannot read icon body")?;
    std::fs::write(dest, &bytes).with_context(|| format!("cannot write {}", dest.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_service_names() {
        assert_eq!(sanitize("Google Mail"), "googlemail");
        assert_eq!(sanitize("GitHub"), "github");
        assert_eq!(sanitize(" A B C "), "abc");
    }

    #[test]
    fn builds_logo_url() {
        assert_eq!(
            logo_url("Git Hub", "pk_abc"),
            "https://img.logo.dev/github.com?token=pk_abc"
        );
    }

    #[test]
    fn fallback_until_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IconCache::new(dir.path(), None);
        assert_eq!(cache.icon_path("Git Hub"), PathBuf::from(FALLBACK_ICON));

        std::fs::write(dir.path().join("github.png"), b"png").unwrap();
        assert_eq!(cache.icon_path("Git Hub"), dir.path().join("github.png"));
    }

    #[test]
    fn no_key_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let icons = dir.path().join("icons");
        IconCache::new(&icons, None).download_all(["GitHub"]);
        assert!(!icons.exists());
    }

    #[test]
    fn cached_icons_are_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("github.png"), b"old").unwrap();

        IconCache::new(dir.path(), Some("pk_test".to_string())).download_all(["GitHub"]);
        assert_eq!(std::fs::read(dir.path().join("github.png")).unwrap(), b"old");
    }
}
