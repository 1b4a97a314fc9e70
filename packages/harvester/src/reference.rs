//! Seed reference parsing.
//!
//! A thread is identified either by explicit `id=` and `uid=` query
//! parameters, or by a numeric path segment (`/<mid>?...`) whose owner id has
//! to be looked up through an [`OwnerResolver`].

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{HarvesterError, Result};
use crate::types::ThreadRef;

/// `id=<digits>` as a query parameter (not the tail of `uid=`).
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=(\d+)").expect("valid regex"));

/// `uid=<digits>` as a query parameter.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static UID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]uid=(\d+)").expect("valid regex"));

/// Numeric path segment directly followed by the query string or the end.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PATH_THREAD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)(?:\?|#|$)").expect("valid regex"));

/// Numeric path segment preceding the thread id: `/<uid>/<mid>`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PATH_OWNER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/[^/?#]+(?:\?|#|$)").expect("valid regex"));

/// Outcome of parsing a seed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReference {
    /// Both identifiers were present in the reference.
    Complete(ThreadRef),

    /// Only the thread id was found; the owner must be resolved.
    NeedsOwner { thread_id: String },
}

/// Parse a seed reference into its identifiers.
///
/// # Examples
/// ```
/// use comment_harvester::reference::{parse_reference, ParsedReference};
///
/// let parsed = parse_reference("https://weibo.com/ajax?id=42&uid=7").unwrap();
/// assert!(matches!(parsed, ParsedReference::Complete(_)));
///
/// let parsed = parse_reference("https://weibo.com/7/42?type=comment").unwrap();
/// assert_eq!(parsed, ParsedReference::NeedsOwner { thread_id: "42".into() });
///
/// assert!(parse_reference("https://weibo.com/home").is_err());
/// ```
pub fn parse_reference(reference: &str) -> Result<ParsedReference> {
    let reference = reference.trim();

    if let (Some(id), Some(uid)) = (
        capture_first(&ID_PARAM, reference),
        capture_first(&UID_PARAM, reference),
    ) {
        return Ok(ParsedReference::Complete(ThreadRef {
            thread_id: id,
            owner_id: uid,
        }));
    }

    match capture_first(&PATH_THREAD_ID, reference) {
        Some(thread_id) => Ok(ParsedReference::NeedsOwner { thread_id }),
        None => Err(HarvesterError::InvalidReference(reference.to_string())),
    }
}

fn capture_first(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Looks up the owner id of a thread referenced without `uid=`.
///
/// Implementations may perform network calls; failure is reported as
/// [`HarvesterError::OwnerUnresolved`].
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    async fn resolve_owner(&self, reference: &str, thread_id: &str) -> Result<String>;
}

/// Resolver that reads the owner id from the path segment before the thread
/// id, as in `https://weibo.com/<uid>/<mid>?...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOwnerResolver;

#[async_trait]
impl OwnerResolver for PathOwnerResolver {
    async fn resolve_owner(&self, reference: &str, thread_id: &str) -> Result<String> {
        capture_first(&PATH_OWNER_ID, reference).ok_or_else(|| HarvesterError::OwnerUnresolved {
            thread_id: thread_id.to_string(),
            reason: "no numeric owner segment precedes the thread id".to_string(),
        })
    }
}

/// Resolver that always answers with the same owner id.
#[derive(Debug, Clone)]
pub struct FixedOwnerResolver(pub String);

#[async_trait]
impl OwnerResolver for FixedOwnerResolver {
    async fn resolve_owner(&self, _reference: &str, _thread_id: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Parse a reference and resolve its owner id if needed.
pub async fn resolve_reference(reference: &str, resolver: &dyn OwnerResolver) -> Result<ThreadRef> {
    match parse_reference(reference)? {
        ParsedReference::Complete(thread) => Ok(thread),
        ParsedReference::NeedsOwner { thread_id } => {
            let owner_id = resolver.resolve_owner(reference.trim(), &thread_id).await?;
            tracing::debug!(thread_id = %thread_id, owner_id = %owner_id, "resolved thread owner");
            Ok(ThreadRef {
                thread_id,
                owner_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_explicit_params() {
        let parsed =
            parse_reference("https://weibo.com/ajax/statuses/buildComments?id=4987&uid=1234")
                .unwrap();
        assert_eq!(
            parsed,
            ParsedReference::Complete(ThreadRef {
                thread_id: "4987".into(),
                owner_id: "1234".into(),
            })
        );
    }

    #[test]
    fn test_parse_params_in_any_order() {
        let parsed = parse_reference("https://m.weibo.cn/detail?uid=55&flag=1&id=66").unwrap();
        assert_eq!(
            parsed,
            ParsedReference::Complete(ThreadRef {
                thread_id: "66".into(),
                owner_id: "55".into(),
            })
        );
    }

    #[test]
    fn test_uid_alone_is_not_an_id() {
        // `uid=` must not satisfy the `id=` parameter
        let parsed = parse_reference("https://weibo.com/u/page?uid=55");
        assert!(matches!(parsed, Err(HarvesterError::InvalidReference(_))));
    }

    #[test]
    fn test_parse_path_form() {
        let parsed = parse_reference("https://x.example/123?type=comment").unwrap();
        assert_eq!(
            parsed,
            ParsedReference::NeedsOwner {
                thread_id: "123".into()
            }
        );

        let parsed = parse_reference("https://weibo.com/55/4987").unwrap();
        assert_eq!(
            parsed,
            ParsedReference::NeedsOwner {
                thread_id: "4987".into()
            }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_reference("").is_err());
        assert!(parse_reference("https://weibo.com/home?tab=hot").is_err());
        assert!(parse_reference("not a url").is_err());
    }

    #[tokio::test]
    async fn test_path_owner_resolver() {
        let owner = PathOwnerResolver
            .resolve_owner("https://weibo.com/1669879400/4987?type=comment", "4987")
            .await
            .unwrap();
        assert_eq!(owner, "1669879400");

        let err = PathOwnerResolver
            .resolve_owner("https://x.example/123?type=comment", "123")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvesterError::OwnerUnresolved { .. }));
    }

    #[tokio::test]
    async fn test_resolve_reference_uses_resolver() {
        let resolver = FixedOwnerResolver("456".into());
        let thread = resolve_reference("https://x.example/123?type=comment", &resolver)
            .await
            .unwrap();
        assert_eq!(
            thread,
            ThreadRef {
                thread_id: "123".into(),
                owner_id: "456".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_reference_skips_resolver_when_complete() {
        // PathOwnerResolver would fail on this reference; it must not be called
        let thread = resolve_reference("https://weibo.com/detail?id=9&uid=8", &PathOwnerResolver)
            .await
            .unwrap();
        assert_eq!(thread.owner_id, "8");
    }
}
