//! Session credentials for the comment-listing API.

use std::fmt;

use crate::error::{HarvesterError, Result};

/// Request headers identifying an already logged-in browser session.
///
/// All three fields are required; there are no defaults.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user_agent: String,
    pub cookie: String,
    pub referer: String,
}

impl Credentials {
    pub fn new(
        user_agent: impl Into<String>,
        cookie: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            cookie: cookie.into(),
            referer: referer.into(),
        }
    }

    /// Check that every field is populated.
    ///
    /// Returns `MissingCredentials` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("user_agent", &self.user_agent),
            ("cookie", &self.cookie),
            ("referer", &self.referer),
        ] {
            if value.trim().is_empty() {
                return Err(HarvesterError::MissingCredentials(name));
            }
        }
        Ok(())
    }

    /// Parse a block of `Name: value` lines as copied from browser dev tools.
    ///
    /// Header names are matched case-insensitively; lines without a colon are
    /// ignored and only the first colon separates name from value. Missing
    /// headers stay empty, so call [`Credentials::validate`] afterwards.
    ///
    /// # Examples
    /// ```
    /// use comment_harvester::credentials::Credentials;
    ///
    /// let creds = Credentials::from_header_block(
    ///     "User-Agent: Mozilla/5.0\ncookie: SUB=abc\nReferer: https://weibo.com/",
    /// );
    /// assert_eq!(creds.cookie, "SUB=abc");
    /// assert_eq!(creds.referer, "https://weibo.com/");
    /// assert!(creds.validate().is_ok());
    /// ```
    pub fn from_header_block(text: &str) -> Self {
        let mut creds = Self::default();
        for line in text.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "user-agent" => creds.user_agent = value,
                "cookie" => creds.cookie = value,
                "referer" => creds.referer = value,
                _ => {}
            }
        }
        creds
    }

    /// Load credentials from `WEIBO_USER_AGENT`, `WEIBO_COOKIE` and
    /// `WEIBO_REFERER`. Unset variables stay empty.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            user_agent: var("WEIBO_USER_AGENT"),
            cookie: var("WEIBO_COOKIE"),
            referer: var("WEIBO_REFERER"),
        }
    }
}

// The cookie is a session secret; keep it out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_agent", &self.user_agent)
            .field("cookie", &"<redacted>")
            .field("referer", &self.referer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_complete() {
        let creds = Credentials::new("ua", "c=1", "https://weibo.com/");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let err = Credentials::new("ua", "  ", "").validate().unwrap_err();
        assert!(matches!(err, HarvesterError::MissingCredentials("cookie")));

        let err = Credentials::default().validate().unwrap_err();
        assert!(matches!(err, HarvesterError::MissingCredentials("user_agent")));
    }

    #[test]
    fn test_header_block_keeps_colons_in_values() {
        let creds = Credentials::from_header_block(
            "Referer: https://weibo.com/1/2?type=comment\n\
             garbage line\n\
             Accept: */*\n\
             USER-AGENT:   Mozilla/5.0 (X11; Linux)  \n\
             Cookie: SUB=a:b; XSRF=c",
        );
        assert_eq!(creds.referer, "https://weibo.com/1/2?type=comment");
        assert_eq!(creds.user_agent, "Mozilla/5.0 (X11; Linux)");
        assert_eq!(creds.cookie, "SUB=a:b; XSRF=c");
    }

    #[test]
    fn test_header_block_missing_header() {
        let creds = Credentials::from_header_block("User-Agent: ua\nReferer: r");
        assert!(creds.cookie.is_empty());
        assert!(creds.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let creds = Credentials::new("ua", "SUB=secret", "r");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
