//! User identity resolution for remote filesystems.
//!
//! The identity presented to a remote store decides the permission context
//! of every call made on that connection. It is chosen once, at backend
//! construction: the configured user if any, otherwise the invoking host
//! user, otherwise [`DEFAULT_USER`].

/// Identity used when neither configuration nor the host provides one.
pub const DEFAULT_USER: &str = "root";

/// Source of the current host user.
pub trait HostIdentity: Send + Sync {
    /// The user this process runs as, if it can be determined.
    fn current_user(&self) -> Option<String>;
}

/// Reads the host user from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl HostIdentity for SystemIdentity {
    fn current_user(&self) -> Option<String> {
        match whoami::fallible::username() {
            Ok(name) if !name.is_empty() => Some(name),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "could not determine host user");
                None
            }
        }
    }
}

/// A fixed host identity (or none at all).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<String>);

impl HostIdentity for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Pick the effective user.
pub fn resolve_user(configured: Option<&str>, host: Option<String>) -> String {
    match configured {
        Some(user) if !user.is_empty() => user.to_string(),
        _ => host.unwrap_or_else(|| DEFAULT_USER.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_user_wins() {
        assert_eq!(resolve_user(Some("hdfs"), Some("amy".into())), "hdfs");
    }

    #[test]
    fn test_falls_back_to_host_then_default() {
        assert_eq!(resolve_user(None, Some("amy".into())), "amy");
        assert_eq!(resolve_user(Some(""), Some("amy".into())), "amy");
        assert_eq!(resolve_user(None, None), DEFAULT_USER);
    }

    #[test]
    fn test_static_identity() {
        assert_eq!(StaticIdentity(Some("bob".into())).current_user().as_deref(), Some("bob"));
        assert_eq!(StaticIdentity(None).current_user(), None);
    }
}
