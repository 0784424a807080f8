//! Browser header profiles with rotation.
//!
//! The catalog blocks obvious bots, so every request carries a coherent set
//! of browser headers. A 403 rotates to the next profile.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

/// One browser's worth of request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserProfile {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

/// Realistic browser profiles, rotated on 403.
pub const PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        accept_language: "en-IN,en-GB;q=0.9,en;q=0.8",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.9",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.5",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        accept_language: "en-IN,en;q=0.9,hi;q=0.8",
    },
];

/// Rotating cursor over [`PROFILES`].
///
/// Shared by all workers of a fetcher; rotation is lock-free.
#[derive(Debug)]
pub struct HeaderRotation {
    cursor: AtomicUsize,
    user_agent_override: Option<String>,
}

impl HeaderRotation {
    /// Start at a random profile.
    pub fn new(user_agent_override: Option<String>) -> Self {
        let start = rand::thread_rng().gen_range(0..PROFILES.len());
        Self::starting_at(start, user_agent_override)
    }

    /// Start at a fixed profile index.
    pub fn starting_at(index: usize, user_agent_override: Option<String>) -> Self {
        Self {
            cursor: AtomicUsize::new(index % PROFILES.len()),
            user_agent_override,
        }
    }

    /// Profile currently in use.
    pub fn current(&self) -> &'static BrowserProfile {
        &PROFILES[self.cursor.load(Ordering::Relaxed) % PROFILES.len()]
    }

    /// Move to the next profile and return it.
    pub fn rotate(&self) -> &'static BrowserProfile {
        let next = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        &PROFILES[next % PROFILES.len()]
    }

    /// Headers for the current profile.
    pub fn headers(&self) -> HeaderMap {
        let profile = self.current();
        let mut headers = HeaderMap::new();

        let ua = match self.user_agent_override {
            Some(ref custom) => HeaderValue::from_str(custom)
                .unwrap_or_else(|_| HeaderValue::from_static(profile.user_agent)),
            None => HeaderValue::from_static(profile.user_agent),
        };
        headers.insert(USER_AGENT, ua);
        headers.insert(ACCEPT, HeaderValue::from_static(profile.accept));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(profile.accept_language),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_look_like_browsers() {
        assert!(PROFILES.len() >= 2);
        for profile in PROFILES {
            assert!(profile.user_agent.starts_with("Mozilla/5.0"));
            assert!(profile.accept.contains("text/html"));
        }
    }

    #[test]
    fn test_rotate_changes_user_agent() {
        let rotation = HeaderRotation::starting_at(0, None);
        let before = rotation.current().user_agent;
        let after = rotation.rotate().user_agent;

        assert_ne!(before, after);
        assert_eq!(rotation.current().user_agent, after);
    }

    #[test]
    fn test_rotation_wraps() {
        let rotation = HeaderRotation::starting_at(PROFILES.len() - 1, None);
        assert_eq!(rotation.rotate(), &PROFILES[0]);
    }

    #[test]
    fn test_headers_use_override() {
        let rotation = HeaderRotation::starting_at(1, Some("MedMatchTest/1.0".into()));
        let headers = rotation.headers();

        assert_eq!(headers.get(USER_AGENT).unwrap(), "MedMatchTest/1.0");
        assert_eq!(headers.get(ACCEPT).unwrap(), PROFILES[1].accept);
    }
}
