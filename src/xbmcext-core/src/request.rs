//! Invocation parsing and the per-dispatch request state.

use crate::value::{cast, to_query_text, Params};
use percent_encoding::percent_decode_str;
use std::num::ParseIntError;
use thiserror::Error;
use url::form_urlencoded;
use url::{Position, Url};

/// The three values the host passes to an addon process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Base URL, e.g. `plugin://plugin.video.example`.
    pub base_url: String,
    /// Handle the host expects back on directory and playback callbacks.
    pub handle: i32,
    /// Path and query suffix, e.g. `/title/tt5180504?season=1`.
    pub suffix: String,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("missing invocation argument {position} ({name})")]
    MissingArgument { position: usize, name: &'static str },
    #[error("invalid plugin handle {value:?}: {source}")]
    InvalidHandle {
        value: String,
        source: ParseIntError,
    },
}

impl Invocation {
    pub fn new(base_url: impl Into<String>, handle: i32, suffix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            handle,
            suffix: suffix.into(),
        }
    }

    /// Build an invocation from process arguments, program name excluded.
    ///
    /// The suffix is optional; some hosts omit it for the root listing.
    pub fn from_args<I, S>(args: I) -> Result<Self, InvocationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let base_url = args.next().ok_or(InvocationError::MissingArgument {
            position: 0,
            name: "base url",
        })?;
        let raw_handle = args.next().ok_or(InvocationError::MissingArgument {
            position: 1,
            name: "handle",
        })?;
        let handle = raw_handle
            .trim()
            .parse()
            .map_err(|source| InvocationError::InvalidHandle {
                value: raw_handle.clone(),
                source,
            })?;
        let suffix = args.next().unwrap_or_default();

        Ok(Self {
            base_url,
            handle,
            suffix,
        })
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.suffix)
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid invocation url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Path and query the router matches against, plus the scheme and
/// authority needed to build links back into the addon.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState {
    scheme: String,
    authority: String,
    path: String,
    query: Params,
}

impl RequestState {
    pub fn from_invocation(invocation: &Invocation) -> Result<Self, RequestError> {
        Self::parse(&invocation.url())
    }

    /// Parse an absolute URL such as `plugin://plugin.video.example/event/2023?page=2`.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let url = Url::parse(raw).map_err(|source| RequestError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority: url[Position::BeforeUsername..Position::AfterPort].to_string(),
            // the parser escapes spaces and non-ASCII; links are written raw
            path: normalize_path(&percent_decode_str(url.path()).decode_utf8_lossy()),
            query: parse_query(url.query().unwrap_or_default()),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Point the state at a new target. Scheme and authority are kept.
    pub fn retarget(&mut self, path: &str, query: Params) {
        self.path = normalize_path(path);
        self.query = query;
    }

    /// Relative `path?query` form of the current request.
    pub fn full_path(&self) -> String {
        join_url("", "", &self.path, &self.query)
    }

    /// Absolute URL pointing at `path` inside this addon.
    pub fn url_for(&self, path: &str, query: &Params) -> String {
        join_url(&self.scheme, &self.authority, path, query)
    }
}

/// Strip trailing slashes; an empty result becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Decode a query string into typed params.
///
/// Pairs with an empty value are skipped and a repeated name keeps its last
/// value.
pub fn parse_query(query: &str) -> Params {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.into_owned(), cast(&value)))
        .collect()
}

pub fn encode_query(query: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in query.iter() {
        serializer.append_pair(name, &to_query_text(value));
    }
    serializer.finish()
}

fn join_url(scheme: &str, authority: &str, path: &str, query: &Params) -> String {
    let mut url = String::new();
    if !scheme.is_empty() {
        url.push_str(scheme);
        url.push(':');
    }
    if !authority.is_empty() {
        url.push_str("//");
        url.push_str(authority);
        if !path.is_empty() && !path.starts_with('/') {
            url.push('/');
        }
    }
    url.push_str(path);

    let query = encode_query(query);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_invocation_arguments() {
        let invocation =
            Invocation::from_args(["plugin://plugin.video.example", "7", "/event/2023"]).unwrap();
        assert_eq!(invocation.handle, 7);
        assert_eq!(invocation.url(), "plugin://plugin.video.example/event/2023");
    }

    #[test]
    fn negative_handles_are_accepted() {
        let invocation = Invocation::from_args(["plugin://plugin.video.example", "-1"]).unwrap();
        assert_eq!(invocation.handle, -1);
        assert_eq!(invocation.suffix, "");
    }

    #[test]
    fn rejects_missing_or_bad_handle() {
        assert!(matches!(
            Invocation::from_args(["plugin://plugin.video.example"]),
            Err(InvocationError::MissingArgument { position: 1, .. })
        ));
        assert!(matches!(
            Invocation::from_args(["plugin://plugin.video.example", "abc", "/"]),
            Err(InvocationError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn state_normalizes_path() {
        let root = RequestState::parse("plugin://plugin.video.example").unwrap();
        assert_eq!(root.path(), "/");

        let slash = RequestState::parse("plugin://plugin.video.example/").unwrap();
        assert_eq!(slash.path(), "/");

        let nested = RequestState::parse("plugin://plugin.video.example/event/2023/").unwrap();
        assert_eq!(nested.scheme(), "plugin");
        assert_eq!(nested.authority(), "plugin.video.example");
        assert_eq!(nested.path(), "/event/2023");
    }

    #[test]
    fn state_casts_query_values() {
        let state = RequestState::parse(
            "plugin://plugin.video.example/search?query=star+wars&page=2&adult=False&ids=%5B1%2C2%5D&empty=",
        )
        .unwrap();
        let query = state.query();
        assert_eq!(query.get_str("query"), Some("star wars"));
        assert_eq!(query.get("page"), Some(&json!(2)));
        assert_eq!(query.get("adult"), Some(&json!(false)));
        assert_eq!(query.get("ids"), Some(&json!([1, 2])));
        assert!(!query.contains("empty"));
    }

    #[test]
    fn repeated_query_names_keep_last_value() {
        let state = RequestState::parse("plugin://a.b/?x=1&x=2").unwrap();
        assert_eq!(state.query().get("x"), Some(&json!(2)));
    }

    #[test]
    fn builds_links_and_full_path() {
        let state = RequestState::parse("plugin://plugin.video.example/").unwrap();
        let query = Params::new().with("genres", json!(["drama", "crime"])).with("page", 3);
        let url = state.url_for("/search", &query);
        assert_eq!(
            url,
            "plugin://plugin.video.example/search?genres=%5B%22drama%22%2C%22crime%22%5D&page=3"
        );
        assert_eq!(state.url_for("event", &Params::new()), "plugin://plugin.video.example/event");
        assert_eq!(state.full_path(), "/");
    }

    #[test]
    fn link_round_trips_through_parser() {
        let base = RequestState::parse("plugin://plugin.video.example/").unwrap();
        let query = Params::new()
            .with("title", "The Office")
            .with("season", 2)
            .with("rating", 8.5)
            .with("hd", true)
            .with("tags", json!(["a b", "c&d"]));

        let parsed = RequestState::parse(&base.url_for("/show/office/", &query)).unwrap();
        assert_eq!(parsed.path(), "/show/office");
        assert_eq!(parsed.query(), &query);

        for path in ["/search/star wars", "/genre/café", "/a{b}"] {
            let parsed = RequestState::parse(&base.url_for(path, &query)).unwrap();
            assert_eq!(parsed.path(), path);
            assert_eq!(parsed.query(), &query);
        }
    }

    #[test]
    fn escaped_paths_are_decoded() {
        let state = RequestState::parse("plugin://plugin.video.example/top%20rated/caf%C3%A9/").unwrap();
        assert_eq!(state.path(), "/top rated/café");
        assert_eq!(state.full_path(), "/top rated/café");
    }

    #[test]
    fn retarget_keeps_scheme_and_authority() {
        let mut state = RequestState::parse("plugin://plugin.video.example/a?x=1").unwrap();
        state.retarget("/b/", Params::new().with("y", "z"));
        assert_eq!(state.path(), "/b");
        assert_eq!(state.full_path(), "/b?y=z");
        assert_eq!(state.authority(), "plugin.video.example");
    }
}
