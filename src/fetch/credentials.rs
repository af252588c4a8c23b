use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Account credentials for the Chaos API, either supplied explicitly on the
/// command line or read from a private auth file.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub(crate) user: String,
    pub(crate) password: String,
}

impl Credentials {
    /// An explicit user/password pair wins; anything less falls back to the
    /// auth file.
    pub(crate) fn resolve(
        user: Option<String>,
        password: Option<String>,
        auth_path: &Path,
    ) -> Result<Self> {
        match (user, password) {
            (Some(user), Some(password)) => Ok(Self { user, password }),
            _ => Self::from_file(auth_path),
        }
    }

    /// Read `user:pass` from the first line of the auth file. The file holds
    /// a plaintext password, so it must be private (mode 0600).
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!(
                "Auth file not found: {} (expected a single line: user:pass)",
                path.display()
            );
        }
        check_permissions(path)?;

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read auth file: {}", path.display()))?;
        let line = contents.lines().next().unwrap_or("").trim();
        let (user, password) = line.split_once(':').ok_or_else(|| {
            anyhow::anyhow!("Auth file {} is not in user:pass form", path.display())
        })?;
        if user.is_empty() || password.is_empty() {
            anyhow::bail!("Auth file {} has an empty user or password", path.display());
        }

        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .with_context(|| format!("Failed to stat auth file: {}", path.display()))?
        .permissions()
        .mode()
        & 0o777;
    if mode != 0o600 {
        anyhow::bail!(
            "Auth file {} must have mode 600, found {mode:o}",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
