//! HTTP client for the Reinos Webservice REST endpoints.

use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Map, Value, json};

use crate::auth::Auth;
use crate::response::{ActionResult, EeError, ErrorKind, classify};

pub const READ_ENTRY: &str = "/webservice/rest/read_entry/php";
pub const CREATE_ENTRY: &str = "/webservice/rest/create_entry/php";
pub const UPDATE_ENTRY: &str = "/webservice/rest/update_entry/php";
pub const READ_CATEGORY: &str = "/webservice/rest/read_category/php";
pub const READ_CHANNEL: &str = "/webservice/rest/read_channel/php";

/// One logical operation per call: build the request, send it, classify the
/// body. No retries, no connection reuse across calls.
#[derive(Debug, Clone)]
pub struct EeClient {
    base_url: String,
    auth: Auth,
    timeout: Duration,
}

/// Caller parameter values reach the wire as strings. Nulls become empty
/// strings rather than being omitted; absence and empty are the same thing
/// in this format.
fn field_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl EeClient {
    pub fn new(base_url: impl Into<String>, auth: Auth, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            timeout,
        }
    }

    /// Auth fields first, then every caller parameter wrapped as
    /// `data[<name>]`. The namespaces cannot collide: a caller parameter
    /// literally named `auth` still becomes `data[auth]`.
    fn form_fields(&self, data: &Map<String, Value>) -> Vec<(String, String)> {
        let mut fields = self.auth.params();
        for (key, value) in data {
            fields.push((format!("data[{key}]"), field_value(value)));
        }
        fields
    }

    /// Issue one request against the webservice and classify the reply.
    pub fn request(
        &self,
        method: &str,
        endpoint: &str,
        data: &Map<String, Value>,
    ) -> Result<ActionResult, EeError> {
        let method = method.to_ascii_uppercase();
        if method != "GET" && method != "POST" {
            return Err(EeError::new(
                ErrorKind::InvalidMethod,
                format!("Unsupported HTTP method: {method}"),
            ));
        }

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);
        let fields = self.form_fields(data);
        tracing::info!(%method, %url, fields = fields.len(), "webservice request");

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| transport_error(e.to_string()))?;

        let sent = if method == "GET" {
            client.get(&url).query(&fields).send()
        } else {
            let mut form = multipart::Form::new();
            for (name, value) in fields {
                form = form.text(name, value);
            }
            build_post(&client, &url, form).and_then(|req| client.execute(req))
        };

        let resp = sent.map_err(|e| {
            tracing::error!("request error: {e}");
            transport_error(e.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| transport_error(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "webservice response");

        classify(status.as_u16(), status.is_success(), &body)
    }

    /// Search/read entries; every parameter is passed through as-is.
    pub fn search_entries(&self, params: &Map<String, Value>) -> Result<ActionResult, EeError> {
        self.request("GET", READ_ENTRY, params)
    }

    pub fn get_entry(&self, entry_id: &Value, site_id: &Value) -> Result<ActionResult, EeError> {
        let mut data = Map::new();
        data.insert("site_id".to_string(), site_id.clone());
        data.insert("entry_id".to_string(), entry_id.clone());
        self.request("GET", READ_ENTRY, &data)
    }

    pub fn create_entry(&self, entry: &Map<String, Value>) -> Result<ActionResult, EeError> {
        self.request("POST", CREATE_ENTRY, entry)
    }

    pub fn update_entry(
        &self,
        entry_id: &Value,
        entry: &Map<String, Value>,
    ) -> Result<ActionResult, EeError> {
        let mut data = entry.clone();
        data.insert("entry_id".to_string(), entry_id.clone());
        self.request("POST", UPDATE_ENTRY, &data)
    }

    pub fn search_categories(&self, params: &Map<String, Value>) -> Result<ActionResult, EeError> {
        self.request("GET", READ_CATEGORY, params)
    }

    pub fn get_category(
        &self,
        category_id: &Value,
        site_id: &Value,
    ) -> Result<ActionResult, EeError> {
        let mut data = Map::new();
        data.insert("site_id".to_string(), site_id.clone());
        data.insert("category_id".to_string(), category_id.clone());
        self.request("GET", READ_CATEGORY, &data)
    }

    pub fn search_channels(&self, params: &Map<String, Value>) -> Result<ActionResult, EeError> {
        self.request("GET", READ_CHANNEL, params)
    }

    pub fn get_channel(
        &self,
        channel_id: &Value,
        site_id: &Value,
    ) -> Result<ActionResult, EeError> {
        let mut data = Map::new();
        data.insert("site_id".to_string(), site_id.clone());
        data.insert("channel_id".to_string(), channel_id.clone());
        self.request("GET", READ_CHANNEL, &data)
    }
}

/// Build a POST whose declared content type is form-urlencoded while the
/// body stays multipart. The live webservice expects exactly this
/// combination; do not align them. `insert` replaces the multipart header
/// the builder set, leaving a single Content-Type value on the wire
/// (`header()` would append a second one).
fn build_post(
    client: &Client,
    url: &str,
    form: multipart::Form,
) -> reqwest::Result<reqwest::blocking::Request> {
    let mut request = client.post(url).multipart(form).build()?;
    request
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(Auth::CONTENT_TYPE));
    Ok(request)
}

fn transport_error(detail: String) -> EeError {
    EeError::new(ErrorKind::Transport, format!("Request failed: {detail}"))
        .with_details(json!({ "text": detail }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> EeClient {
        EeClient::new(
            "https://example.com/",
            Auth::new("k3y"),
            Duration::from_secs(5),
        )
    }

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn every_caller_parameter_is_wrapped_in_the_data_namespace() {
        let data = map(&[
            ("channel_name", json!("blog")),
            ("limit", json!(5)),
            ("summary", Value::Null),
        ]);
        let fields = client().form_fields(&data);
        assert_eq!(
            fields,
            vec![
                ("auth[shortkey]".to_string(), "k3y".to_string()),
                ("data[channel_name]".to_string(), "blog".to_string()),
                ("data[limit]".to_string(), "5".to_string()),
                // Null serializes as empty string, never omitted.
                ("data[summary]".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn auth_and_data_namespaces_never_collide() {
        let data = map(&[("auth", json!("spoofed"))]);
        let fields = client().form_fields(&data);
        assert_eq!(fields[0].0, "auth[shortkey]");
        assert_eq!(fields[1], ("data[auth]".to_string(), "spoofed".to_string()));
    }

    #[test]
    fn string_values_are_not_requoted() {
        assert_eq!(field_value(&json!("a \"quoted\" title")), "a \"quoted\" title");
        assert_eq!(field_value(&json!(true)), "true");
        assert_eq!(field_value(&Value::Null), "");
    }

    #[test]
    fn post_carries_exactly_one_form_urlencoded_content_type() {
        let http = Client::new();
        let form = multipart::Form::new().text("data[title]", "Hello");
        let request = build_post(&http, "https://example.com/webservice/rest/create_entry/php", form)
            .unwrap();

        let values: Vec<_> = request.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].to_str().unwrap(), Auth::CONTENT_TYPE);
    }

    #[test]
    fn unsupported_method_fails_without_a_network_call() {
        let err = client()
            .request("DELETE", READ_ENTRY, &Map::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMethod);
        assert_eq!(err.message, "Unsupported HTTP method: DELETE");
    }
}
