//! Talking to the outside world: a thin helper over `reqwest` for the
//! feed clients.

use reqwest::{Client, RequestBuilder};
use reqwest::Error as ReqwestError;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use failure_derive::Fail;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Error as JsonError;
use log::*;

use crate::impl_from_for_error;

/// An error encountered while talking to a feed API.
#[derive(Debug, Fail)]
pub enum HttpError {
    /// The remote returned a non-success status code.
    #[fail(display = "{} error (code {}): {}", service, code, error)]
    Status {
        /// Name of the feed responsible.
        service: &'static str,
        /// The HTTP status code returned.
        code: u16,
        /// The response body, which usually says why.
        error: String
    },
    /// reqwest error.
    #[fail(display = "reqwest: {}", _0)]
    Reqwest(ReqwestError),
    /// The response body wasn't the JSON we expected.
    #[fail(display = "json: {}", _0)]
    Json(JsonError)
}
impl_from_for_error!(HttpError,
                     ReqwestError => Reqwest,
                     JsonError => Json);

/// A client for one external HTTP API.
///
/// Wraps a long-lived `reqwest::Client` with a base URL, our user-agent,
/// and the feed's name for log messages. Bearer tokens are passed per
/// request, since the feed clients own their token lifecycles.
pub struct ApiClient {
    pub base_url: String,
    pub user_agent: String,
    pub name: &'static str,
    cli: Client
}

impl ApiClient {
    pub fn new(ua: String, name: &'static str, base_url: String) -> Self {
        let cli = Client::new();
        Self {
            user_agent: ua,
            name, base_url, cli
        }
    }
    fn get(&self, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{}: GET {}", self.name, url);
        let mut rb = self.cli.get(&url);
        if let Some(tok) = bearer {
            let val = format!("Bearer {}", tok);
            rb = rb.header(AUTHORIZATION, &val as &str);
        }
        rb
    }
    fn run(&self, rb: RequestBuilder) -> Result<reqwest::Response, HttpError> {
        let mut resp = rb
            .header(USER_AGENT, &self.user_agent as &str)
            .send()?;
        let status = resp.status();
        debug!("{}: response code {}", self.name, status.as_u16());
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            warn!("{}: request failed ({}): {}", self.name, status.as_u16(), text);
            return Err(HttpError::Status {
                service: self.name,
                code: status.as_u16(),
                error: text
            });
        }
        Ok(resp)
    }
    /// GETs `path` (relative to the base URL) and deserializes the JSON
    /// response.
    pub fn get_json<U>(&self, path: &str, bearer: Option<&str>) -> Result<U, HttpError> where U: DeserializeOwned {
        let mut resp = self.run(self.get(path, bearer))?;
        let ret: U = resp.json()?;
        Ok(ret)
    }
    /// Like `get_json`, but a 204 or an empty body is `None` rather than
    /// an error. Some feeds answer "nothing to report" that way.
    pub fn get_json_opt<U>(&self, path: &str, bearer: Option<&str>) -> Result<Option<U>, HttpError> where U: DeserializeOwned {
        let mut resp = self.run(self.get(path, bearer))?;
        if resp.status().as_u16() == 204 {
            return Ok(None);
        }
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let ret: U = serde_json::from_str(&text)?;
        Ok(Some(ret))
    }
    /// GETs `path` and returns the body as text.
    pub fn get_text(&self, path: &str) -> Result<String, HttpError> {
        let mut resp = self.run(self.get(path, None))?;
        let ret = resp.text()?;
        Ok(ret)
    }
    /// POSTs a form to an absolute URL with HTTP basic auth, and
    /// deserializes the JSON response. This is the shape of every token
    /// grant we do.
    pub fn post_form<U, F>(&self, url: &str, form: &F, user: &str, password: &str) -> Result<U, HttpError> where U: DeserializeOwned, F: Serialize {
        debug!("{}: POST {}", self.name, url);
        let rb = self.cli.post(url)
            .basic_auth(user, Some(password))
            .form(form);
        let mut resp = self.run(rb)?;
        let ret: U = resp.json()?;
        Ok(ret)
    }
}
