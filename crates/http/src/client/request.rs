//! Replayable request description

use super::ClientError;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, multipart};
use serde::Serialize;

/// A file sent as one multipart field
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    /// File under the `file` field, the name every upload endpoint expects
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn to_form(&self) -> Result<multipart::Form, ClientError> {
        let mut part = multipart::Part::bytes(self.bytes.to_vec()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part.mime_str(mime)?;
        }
        Ok(multipart::Form::new().part(self.field.clone(), part))
    }
}

/// Request body kept in a form that can be sent again
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    File(FilePart),
}

/// A request that may be dispatched twice: once, and once more after a token refresh
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter when a value is present
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a multipart file upload
    #[must_use]
    pub fn file(mut self, file: FilePart) -> Self {
        self.body = Some(RequestBody::File(file));
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Build a fresh `reqwest` request against `url`
    ///
    /// A `bearer` token replaces any `Authorization` header stored on the request.
    pub(crate) fn to_builder(
        &self,
        client: &reqwest::Client,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut headers = self.headers.clone();
        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ClientError::Configuration(format!("access token is not a valid header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut request = client.request(self.method.clone(), url).headers(headers);

        if !self.query.is_empty() {
            request = request.query(&self.query);
        }

        request = match &self.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::File(file)) => request.multipart(file.to_form()?),
            None => request,
        };

        Ok(request)
    }
}
