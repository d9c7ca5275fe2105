use url::Url;

/// Label used when no account name can be read from a URL.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Host names of a code forge and of its static pages service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeHosts {
    pub repo_host: String,
    pub pages_host: String,
}

impl Default for ForgeHosts {
    fn default() -> Self {
        Self::github()
    }
}

impl ForgeHosts {
    pub fn github() -> Self {
        Self {
            repo_host: "github.com".to_string(),
            pages_host: "github.io".to_string(),
        }
    }

    /// Rewrites `https://<repo_host>/<user>/<repo>[/...]` to
    /// `https://<user>.<pages_host>/<repo>`. Anything else passes through.
    pub fn derive_target_url(&self, raw: &str) -> String {
        if !raw.contains(&self.repo_host) || raw.contains(&self.pages_suffix()) {
            return raw.to_string();
        }
        let prefix = format!("https://{}/", self.repo_host);
        let Some(rest) = raw.strip_prefix(&prefix) else {
            return raw.to_string();
        };
        let mut parts = rest.split('/');
        match (parts.next(), parts.next()) {
            (Some(user), Some(repo)) => format!("https://{user}.{}/{repo}", self.pages_host),
            _ => raw.to_string(),
        }
    }

    /// Account name shown on a card. Only the URL is consulted.
    pub fn display_label(&self, raw: &str) -> String {
        if raw.contains(&self.pages_host) {
            if let Some(user) = self.pages_user(raw) {
                return user;
            }
        } else if raw.contains(&self.repo_host) {
            if let Some(user) = Url::parse(raw).ok().and_then(|url| first_segment(&url)) {
                return user;
            }
        }
        UNKNOWN_LABEL.to_string()
    }

    /// Repository URL for the "browse code" link.
    pub fn code_url(&self, raw: &str) -> String {
        if raw.contains(&self.repo_host) || !raw.contains(&self.pages_host) {
            return raw.to_string();
        }
        let user = self.pages_user(raw);
        let repo = Url::parse(raw).ok().and_then(|url| first_segment(&url));
        match (user, repo) {
            (Some(user), Some(repo)) => format!("https://{}/{user}/{repo}", self.repo_host),
            _ => raw.to_string(),
        }
    }

    fn pages_suffix(&self) -> String {
        format!(".{}", self.pages_host)
    }

    fn pages_user(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        host.strip_suffix(&self.pages_suffix())
            .filter(|user| !user.is_empty())
            .map(ToOwned::to_owned)
    }
}

fn first_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .find(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
}

pub fn derive_target_url(raw: &str) -> String {
    ForgeHosts::github().derive_target_url(raw)
}

pub fn display_label(raw: &str) -> String {
    ForgeHosts::github().display_label(raw)
}

pub fn code_url(raw: &str) -> String {
    ForgeHosts::github().code_url(raw)
}
