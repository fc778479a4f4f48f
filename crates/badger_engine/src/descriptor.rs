use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use url::{form_urlencoded, Url};

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DescriptorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(DescriptorError::UnknownMethod(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("target must be an absolute http(s) url or an absolute path, got {0:?}")]
    InvalidTarget(String),
    #[error("unsupported method {0:?}")]
    UnknownMethod(String),
}

/// Immutable description of one network call.
///
/// `target` is either an absolute `http(s)` URL or an absolute path that the
/// transport resolves against its base URL. The body is opaque to the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDescriptor {
    target: String,
    method: Method,
    body: Option<Bytes>,
    content_type: Option<String>,
}

impl FetchDescriptor {
    pub fn new(method: Method, target: impl Into<String>) -> Result<Self, DescriptorError> {
        let target = target.into();
        validate_target(&target)?;
        Ok(Self {
            target,
            method,
            body: None,
            content_type: None,
        })
    }

    pub fn get(target: impl Into<String>) -> Result<Self, DescriptorError> {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Result<Self, DescriptorError> {
        Self::new(Method::Post, target)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets an `application/x-www-form-urlencoded` body built from `pairs`.
    pub fn with_form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.with_body(encoded, FORM_CONTENT_TYPE)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Resolves the target against `base`; absolute targets ignore the base.
    pub fn resolve(&self, base: &Url) -> Result<Url, DescriptorError> {
        base.join(&self.target)
            .map_err(|_| DescriptorError::InvalidTarget(self.target.clone()))
    }
}

fn validate_target(target: &str) -> Result<(), DescriptorError> {
    let invalid = || DescriptorError::InvalidTarget(target.to_string());
    if target.starts_with('/') {
        // Reject scheme-relative targets such as `//host/path`.
        if target.starts_with("//") {
            return Err(invalid());
        }
        let probe = Url::parse("http://localhost/").map_err(|_| invalid())?;
        probe.join(target).map_err(|_| invalid())?;
        return Ok(());
    }
    let url = Url::parse(target).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(invalid()),
    }
}
