use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

fn http_client() -> Client {
    // 30s cap on every provider call; there is no retry layer behind it
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("reqwest client with static config")
}

// ============ Claude API Integration ============

#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeContent {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ClaudeContent>,
    #[serde(default)]
    pub usage: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Client for the Claude messages endpoint.
pub struct ClaudeService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeService {
    /// Returns `None` when no API key is configured; callers fall back to
    /// the local heuristic in that case.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.claude_api_key.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.claude_base_url.clone(),
            api_key,
            model: config.claude_model.clone(),
        })
    }

    /// Sends one completion request and returns the raw response text.
    ///
    /// Low temperature keeps the analysis output stable; max_tokens bounds
    /// the response length.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/v1/messages", self.base_url);

        let payload = json!({
            "model": self.model,
            "max_tokens": 2000,
            "temperature": 0.3,
            "system": system,
            "messages": [{ "role": "user", "content": prompt }],
        });

        tracing::info!("Claude request - prompt length: {} chars", prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Claude messages request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Claude API returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Claude API returned status {}: {}",
                status, error_text
            )));
        }

        let result: ClaudeResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Claude response: {}", e))
        })?;

        let text = result
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| {
                AppError::ExternalApiError("Claude response has no content blocks".to_string())
            })?;

        tracing::info!(
            "Claude success - response length: {} chars, model: {}",
            text.len(),
            result.model.as_deref().unwrap_or("unknown")
        );
        Ok(text)
    }
}

// ============ Pipedrive API Integration ============

/// Standard Pipedrive response envelope: `{success, data}`.
#[derive(Debug, Deserialize)]
struct PipedriveEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PipedriveRecord {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct PipedriveLeadRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OrgSearchData {
    #[serde(default)]
    items: Vec<OrgSearchItem>,
}

#[derive(Debug, Deserialize)]
struct OrgSearchItem {
    item: OrgSearchRecord,
}

#[derive(Debug, Deserialize)]
struct OrgSearchRecord {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

/// Client for the Pipedrive v1 REST API.
///
/// Authentication is a query-string `api_token` on every call, which must be
/// redacted from logs.
pub struct PipedriveService {
    client: Client,
    base_url: String,
    api_token: String,
}

impl PipedriveService {
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_token = config.pipedrive_api_token.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.pipedrive_base_url.clone(),
            api_token,
        })
    }

    /// Builds a URL with the api_token and any extra params properly encoded.
    fn url(&self, path: &str, extra: &[(&str, &str)]) -> Result<reqwest::Url, AppError> {
        let mut params: Vec<(&str, &str)> = vec![("api_token", self.api_token.as_str())];
        params.extend_from_slice(extra);
        reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| AppError::InternalError(format!("Failed to build Pipedrive URL: {}", e)))
    }

    async fn post_record(&self, path: &str, body: &Value) -> Result<i64, AppError> {
        let url = self.url(path, &[])?;
        tracing::debug!("Pipedrive POST {}?api_token=[REDACTED]", path);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Pipedrive {} returned status {}: {}",
                path, status, error_text
            )));
        }

        let envelope: PipedriveEnvelope<PipedriveRecord> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Pipedrive response: {}", e))
        })?;

        match envelope.data {
            Some(record) if envelope.success => Ok(record.id),
            _ => Err(AppError::ExternalApiError(format!(
                "Pipedrive {} reported failure",
                path
            ))),
        }
    }

    /// Searches organizations by name and returns the id of the first item
    /// whose name matches exactly (case-insensitive). Substring hits from the
    /// search endpoint are not good enough to reuse a record.
    pub async fn search_organization(&self, name: &str) -> Result<Option<i64>, AppError> {
        let url = self.url("/v1/organizations/search", &[("term", name)])?;
        tracing::debug!("Pipedrive organization search: {}", name);

        let response = self.client.get(url).send().await.map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApiError(format!(
                "Pipedrive organization search returned status {}",
                status
            )));
        }

        let envelope: PipedriveEnvelope<OrgSearchData> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Pipedrive search response: {}", e))
        })?;

        let found = envelope.data.and_then(|data| {
            data.items
                .into_iter()
                .find(|item| {
                    item.item
                        .name
                        .as_deref()
                        .map(|n| n.eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                })
                .map(|item| item.item.id)
        });

        if let Some(id) = found {
            tracing::info!("Reusing existing Pipedrive organization {} for '{}'", id, name);
        }
        Ok(found)
    }

    pub async fn create_organization(&self, name: &str) -> Result<i64, AppError> {
        let id = self
            .post_record(
                "/v1/organizations",
                &json!({ "name": name, "visible_to": 3 }),
            )
            .await?;
        tracing::info!("Created Pipedrive organization: {}", id);
        Ok(id)
    }

    pub async fn create_person(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        org_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let mut body = serde_json::Map::new();
        body.insert("name".to_string(), json!(name));
        body.insert("visible_to".to_string(), json!(3));
        if let Some(email_val) = email {
            body.insert(
                "email".to_string(),
                json!([{ "value": email_val, "primary": true }]),
            );
        }
        if let Some(phone_val) = phone {
            body.insert(
                "phone".to_string(),
                json!([{ "value": phone_val, "primary": true }]),
            );
        }
        if let Some(org) = org_id {
            body.insert("org_id".to_string(), json!(org));
        }

        let id = self.post_record("/v1/persons", &Value::Object(body)).await?;
        tracing::info!("Created Pipedrive person: {}", id);
        Ok(id)
    }

    pub async fn create_deal(
        &self,
        title: &str,
        value: i64,
        person_id: Option<i64>,
        org_id: Option<i64>,
    ) -> Result<i64, AppError> {
        let mut body = serde_json::Map::new();
        body.insert("title".to_string(), json!(title));
        body.insert("value".to_string(), json!(value));
        body.insert("currency".to_string(), json!("EUR"));
        body.insert("visible_to".to_string(), json!(3));
        if let Some(person) = person_id {
            body.insert("person_id".to_string(), json!(person));
        }
        if let Some(org) = org_id {
            body.insert("org_id".to_string(), json!(org));
        }

        let id = self.post_record("/v1/deals", &Value::Object(body)).await?;
        tracing::info!("Created Pipedrive deal: {} (value EUR {})", id, value);
        Ok(id)
    }

    pub async fn add_note(&self, deal_id: i64, content: &str) -> Result<(), AppError> {
        let url = self.url("/v1/notes", &[])?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&json!({ "deal_id": deal_id, "content": content }))
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Pipedrive notes returned status {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Attached analysis note to deal {}", deal_id);
        Ok(())
    }

    /// Creates a lead record (used by the Facebook Lead Ads path).
    /// Lead ids are UUID strings, unlike the numeric ids elsewhere.
    pub async fn create_lead(
        &self,
        title: &str,
        person_id: i64,
        note: &str,
    ) -> Result<String, AppError> {
        let url = self.url("/v1/leads", &[])?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&json!({ "title": title, "person_id": person_id, "note": note }))
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Pipedrive leads returned status {}: {}",
                status, error_text
            )));
        }

        let envelope: PipedriveEnvelope<PipedriveLeadRecord> =
            response.json().await.map_err(|e| {
                AppError::ExternalApiError(format!("Failed to parse Pipedrive lead response: {}", e))
            })?;

        match envelope.data {
            Some(record) if envelope.success => {
                tracing::info!("Created Pipedrive lead: {}", record.id);
                Ok(record.id)
            }
            _ => Err(AppError::ExternalApiError(
                "Pipedrive leads reported failure".to_string(),
            )),
        }
    }
}

// ============ Resend API Integration ============

#[derive(Debug, Serialize)]
struct ResendEmailPayload<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Client for the Resend transactional email API.
pub struct ResendService {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendService {
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.resend_api_key.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.resend_base_url.clone(),
            api_key,
            from: config.email_from.clone(),
        })
    }

    /// Submits one email. Non-2xx responses surface the provider's error
    /// body in the returned error; there is no retry or bounce handling.
    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        let url = format!("{}/emails", self.base_url);

        let payload = ResendEmailPayload {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };

        tracing::info!("Sending analysis email to {}", to);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Resend returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Resend returned status {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Email accepted by Resend for {}", to);
        Ok(())
    }
}

// ============ Facebook Graph API (lead dereference) ============

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookLeadField {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookLeadDetail {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub field_data: Vec<FacebookLeadField>,
}

impl FacebookLeadDetail {
    fn field(&self, name: &str) -> Option<&str> {
        self.field_data
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.values.first())
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email")
    }

    pub fn phone(&self) -> Option<&str> {
        self.field("phone_number")
    }

    pub fn company(&self) -> Option<&str> {
        self.field("company_name")
    }

    /// Full name, falling back to "first last" from the separate fields.
    pub fn full_name(&self) -> Option<String> {
        if let Some(full) = self.field("full_name") {
            return Some(full.to_string());
        }
        let combined = format!(
            "{} {}",
            self.field("first_name").unwrap_or(""),
            self.field("last_name").unwrap_or("")
        );
        let trimmed = combined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Client for dereferencing leadgen ids via the Facebook Graph API.
pub struct FacebookGraphService {
    client: Client,
    base_url: String,
    page_token: String,
}

impl FacebookGraphService {
    pub fn from_config(config: &Config) -> Option<Self> {
        let page_token = config.fb_page_access_token.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.meta_graph_base_url.clone(),
            page_token,
        })
    }

    /// Fetches the field values behind an opaque leadgen id.
    pub async fn fetch_lead(&self, leadgen_id: &str) -> Result<FacebookLeadDetail, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.base_url, leadgen_id),
            &[("access_token", self.page_token.as_str())],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build Graph URL: {}", e)))?;

        tracing::info!("Fetching Facebook lead: {}", leadgen_id);
        tracing::debug!(
            "Graph URL: {}/{}?access_token=[REDACTED]",
            self.base_url,
            leadgen_id
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Facebook Graph lead fetch failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Facebook Graph returned status {}: {}",
                status, error_text
            )));
        }

        // The Graph API can answer 200 with an error object in the body
        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Graph response: {}", e))
        })?;
        if let Some(error) = body.get("error") {
            return Err(AppError::ExternalApiError(format!(
                "Facebook Graph error: {}",
                error
            )));
        }

        let detail: FacebookLeadDetail = serde_json::from_value(body).map_err(|e| {
            AppError::ExternalApiError(format!("Unexpected Graph lead shape: {}", e))
        })?;

        tracing::info!("Fetched Facebook lead {} with {} fields", detail.id, detail.field_data.len());
        Ok(detail)
    }
}

// ============ Meta Conversions API ============

/// Client for the server-side Meta Conversions API.
pub struct MetaCapiService {
    client: Client,
    base_url: String,
    pixel_id: String,
    access_token: String,
}

impl MetaCapiService {
    pub fn from_config(config: &Config) -> Option<Self> {
        let pixel_id = config.meta_pixel_id.clone()?;
        let access_token = config.meta_access_token.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.meta_graph_base_url.clone(),
            pixel_id,
            access_token,
        })
    }

    /// Posts one event batch. The access token travels in the body.
    pub async fn send_event(&self, event: Value) -> Result<Value, AppError> {
        let url = format!("{}/{}/events", self.base_url, self.pixel_id);

        let payload = json!({
            "data": [event],
            "access_token": self.access_token,
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Meta CAPI returned status {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Meta CAPI response: {}", e))
        })?;

        tracing::info!("Meta CAPI accepted event for pixel {}", self.pixel_id);
        Ok(body)
    }
}

// ============ GA4 Measurement Protocol ============

/// Client for the GA4 Measurement Protocol collect endpoint.
pub struct Ga4Service {
    client: Client,
    base_url: String,
    measurement_id: String,
    api_secret: String,
}

impl Ga4Service {
    pub fn from_config(config: &Config) -> Option<Self> {
        let measurement_id = config.ga4_measurement_id.clone()?;
        let api_secret = config.ga4_api_secret.clone()?;
        Some(Self {
            client: http_client(),
            base_url: config.ga4_base_url.clone(),
            measurement_id,
            api_secret,
        })
    }

    /// Posts one measurement payload. GA4 answers 2xx with an empty body;
    /// only the status is meaningful.
    pub async fn send_event(&self, payload: Value) -> Result<u16, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/mp/collect", self.base_url),
            &[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build GA4 URL: {}", e)))?;

        tracing::debug!(
            "GA4 MP: {}/mp/collect?measurement_id={}&api_secret=[REDACTED]",
            self.base_url,
            self.measurement_id
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(AppError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "GA4 MP returned status {}: {}",
                status, error_text
            )));
        }

        tracing::info!("GA4 MP accepted event ({})", status);
        Ok(status.as_u16())
    }
}
