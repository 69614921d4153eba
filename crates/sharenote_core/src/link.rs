//! Share and raw link composition.
//!
//! # Responsibility
//! - Derive the public origin of a request, honoring `X-Forwarded-Proto`.
//! - Compose share (`/{id}`) and raw (`/raw/{id}`) URLs for a note.
//!
//! # Invariants
//! - Pure: no storage access and no existence check on the note.

use crate::error::ErrorKind;
use crate::model::note::NoteId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;

/// Path segment prefix for raw-content links.
pub const RAW_PATH_PREFIX: &str = "raw";

/// Link composition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    EmptyHost,
    UnsupportedScheme(String),
    InvalidOrigin(String),
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyHost => write!(f, "request origin has no host"),
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported origin scheme `{scheme}`"),
            Self::InvalidOrigin(message) => write!(f, "invalid request origin: {message}"),
        }
    }
}

impl Error for LinkError {}

/// Scheme and host a request was served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    scheme: String,
    host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().trim().to_ascii_lowercase(),
            host: host.into().trim().to_string(),
        }
    }

    /// Builds the origin from transport facts.
    ///
    /// A non-empty `forwarded_proto` (first value when comma-separated, as
    /// set by chained proxies) wins over the transport scheme.
    pub fn from_request(
        transport_scheme: &str,
        host: &str,
        forwarded_proto: Option<&str>,
    ) -> Self {
        let scheme = forwarded_proto
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(transport_scheme);
        Self::new(scheme, host)
    }

    /// Parses `scheme://host[:port]`, ignoring any path.
    pub fn parse(origin: &str) -> Result<Self, LinkError> {
        let url = Url::parse(origin).map_err(|err| LinkError::InvalidOrigin(err.to_string()))?;
        let host = url.host_str().ok_or(LinkError::EmptyHost)?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self::new(url.scheme(), host))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Checks that links can be built from this origin.
    pub fn validate(&self) -> Result<(), LinkError> {
        self.base_url().map(|_| ())
    }

    fn base_url(&self) -> Result<Url, LinkError> {
        if self.host.is_empty() {
            return Err(LinkError::EmptyHost);
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(LinkError::UnsupportedScheme(self.scheme.clone()));
        }
        Url::parse(&format!("{}://{}/", self.scheme, self.host))
            .map_err(|err| LinkError::InvalidOrigin(err.to_string()))
    }
}

/// URL that presents the note.
pub fn build_share_link(origin: &RequestOrigin, note_id: &NoteId) -> Result<Url, LinkError> {
    let mut url = origin.base_url()?;
    url.set_path(note_id.as_str());
    Ok(url)
}

/// URL that returns the bare note content.
pub fn build_raw_link(origin: &RequestOrigin, note_id: &NoteId) -> Result<Url, LinkError> {
    let mut url = origin.base_url()?;
    url.set_path(&format!("{RAW_PATH_PREFIX}/{}", note_id.as_str()));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::{build_raw_link, build_share_link, LinkError, RequestOrigin};
    use crate::model::note::NoteId;

    #[test]
    fn share_and_raw_links_use_origin_and_id() {
        let origin = RequestOrigin::new("http", "localhost:3000");
        let id = NoteId::new("Ab3dE9xZ");
        assert_eq!(
            build_share_link(&origin, &id).unwrap().as_str(),
            "http://localhost:3000/Ab3dE9xZ"
        );
        assert_eq!(
            build_raw_link(&origin, &id).unwrap().as_str(),
            "http://localhost:3000/raw/Ab3dE9xZ"
        );
    }

    #[test]
    fn forwarded_proto_overrides_transport_scheme() {
        let origin = RequestOrigin::from_request("http", "notes.example.com", Some("https"));
        assert_eq!(origin.scheme(), "https");
        let link = build_share_link(&origin, &NoteId::new("n1")).unwrap();
        assert_eq!(link.as_str(), "https://notes.example.com/n1");

        let chained = RequestOrigin::from_request("http", "notes.example.com", Some("HTTPS, http"));
        assert_eq!(chained.scheme(), "https");
    }

    #[test]
    fn blank_forwarded_proto_falls_back_to_transport() {
        let origin = RequestOrigin::from_request("http", "localhost", Some("  "));
        assert_eq!(origin.scheme(), "http");
    }

    #[test]
    fn parse_keeps_explicit_port_and_drops_path() {
        let origin = RequestOrigin::parse("https://example.org:8443/some/path").unwrap();
        assert_eq!(origin.host(), "example.org:8443");
        let link = build_raw_link(&origin, &NoteId::new("n2")).unwrap();
        assert_eq!(link.as_str(), "https://example.org:8443/raw/n2");
    }

    #[test]
    fn rejects_missing_host_and_foreign_scheme() {
        let id = NoteId::new("n1");
        assert_eq!(
            build_share_link(&RequestOrigin::new("http", ""), &id),
            Err(LinkError::EmptyHost)
        );
        assert!(matches!(
            build_share_link(&RequestOrigin::new("ftp", "example.org"), &id),
            Err(LinkError::UnsupportedScheme(_))
        ));
    }
}
