use std::path::{Path, PathBuf};

use {
    anyhow::Result,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

/// Contents of the auth file: a token copied from the browser's
/// `authStateStorage` after a manual login.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl std::fmt::Debug for StoredAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAuth")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("company_id", &self.company_id)
            .finish()
    }
}

/// File-based token storage, `purespectrum_auth.json` by default.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the auth file. Missing or unreadable files yield `None`.
    pub fn load(&self) -> Option<StoredAuth> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StoredAuth>(&data) {
            Ok(auth) if !auth.token.is_empty() => {
                debug!(path = %self.path.display(), "loaded saved access token");
                Some(auth)
            },
            Ok(_) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse auth file");
                None
            },
        }
    }

    /// The stored token, if any.
    pub fn token(&self) -> Option<Secret<String>> {
        self.load().map(|auth| Secret::new(auth.token))
    }

    pub fn save(&self, auth: &StoredAuth) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(auth)?;
        std::fs::write(&self.path, &data)?;

        // Set file permissions to 0600 on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "saved access token");
        Ok(())
    }
}
