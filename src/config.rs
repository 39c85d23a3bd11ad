use serde::Deserialize;

/// Runtime configuration loaded from the environment.
///
/// Every provider credential is optional: an absent key disables only that
/// provider's branch, it never fails startup or an incoming request. Base URLs
/// default to the production endpoints and can be overridden per environment
/// (tests point them at a mock server).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,

    // Claude (text analysis)
    pub claude_api_key: Option<String>,
    pub claude_base_url: String,
    pub claude_model: String,

    // Resend (transactional email)
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub email_from: String,

    // Pipedrive (CRM)
    pub pipedrive_api_token: Option<String>,
    pub pipedrive_base_url: String,

    // Meta Conversions API + Lead Ads webhook
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    pub meta_graph_base_url: String,
    pub fb_page_access_token: Option<String>,
    pub fb_webhook_verify_token: Option<String>,

    // GA4 Measurement Protocol
    pub ga4_measurement_id: Option<String>,
    pub ga4_api_secret: Option<String>,
    pub ga4_base_url: String,

    /// Canonical site URL reported as event_source_url on conversion events.
    pub event_source_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            claude_api_key: optional_env("CLAUDE_API_KEY"),
            claude_base_url: base_url_env("CLAUDE_BASE_URL", "https://api.anthropic.com")?,
            claude_model: optional_env("CLAUDE_MODEL")
                .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
            resend_api_key: optional_env("RESEND_API_KEY"),
            resend_base_url: base_url_env("RESEND_BASE_URL", "https://api.resend.com")?,
            email_from: optional_env("EMAIL_FROM").unwrap_or_else(|| {
                "KandidatenTekort.nl <analyse@kandidatentekort.nl>".to_string()
            }),
            pipedrive_api_token: optional_env("PIPEDRIVE_API_TOKEN"),
            pipedrive_base_url: base_url_env("PIPEDRIVE_BASE_URL", "https://api.pipedrive.com")?,
            meta_pixel_id: optional_env("META_PIXEL_ID"),
            meta_access_token: optional_env("META_ACCESS_TOKEN"),
            meta_graph_base_url: base_url_env(
                "META_GRAPH_BASE_URL",
                "https://graph.facebook.com/v18.0",
            )?,
            fb_page_access_token: optional_env("FB_PAGE_ACCESS_TOKEN"),
            fb_webhook_verify_token: optional_env("FB_WEBHOOK_VERIFY_TOKEN"),
            ga4_measurement_id: optional_env("GA4_MEASUREMENT_ID"),
            ga4_api_secret: optional_env("GA4_API_SECRET"),
            ga4_base_url: base_url_env("GA4_BASE_URL", "https://www.google-analytics.com")?,
            event_source_url: optional_env("EVENT_SOURCE_URL")
                .unwrap_or_else(|| "https://kandidatentekort.nl".to_string()),
        };

        // Log which provider branches are active (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::info!(
            "Provider branches: claude={}, resend={}, pipedrive={}, meta_capi={}, ga4={}, fb_leads={}",
            config.claude_api_key.is_some(),
            config.resend_api_key.is_some(),
            config.pipedrive_api_token.is_some(),
            config.meta_capi_enabled(),
            config.ga4_enabled(),
            config.fb_page_access_token.is_some(),
        );
        if config.fb_webhook_verify_token.is_none() {
            tracing::warn!(
                "FB_WEBHOOK_VERIFY_TOKEN not set - Facebook webhook handshake will be rejected"
            );
        }
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }

    /// Meta CAPI branch needs both the pixel id and the access token.
    pub fn meta_capi_enabled(&self) -> bool {
        self.meta_pixel_id.is_some() && self.meta_access_token.is_some()
    }

    /// GA4 branch needs both the measurement id and the API secret.
    pub fn ga4_enabled(&self) -> bool {
        self.ga4_measurement_id.is_some() && self.ga4_api_secret.is_some()
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn base_url_env(key: &str, default: &str) -> anyhow::Result<String> {
    match std::env::var(key) {
        Ok(url) if !url.trim().is_empty() => {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", key);
            }
            // A trailing slash would double up when joining paths
            Ok(url.trim_end_matches('/').to_string())
        }
        _ => Ok(default.to_string()),
    }
}

/// Config with every provider disabled, used as a base in tests.
#[doc(hidden)]
pub fn empty_test_config() -> Config {
    Config {
        port: 3000,
        claude_api_key: None,
        claude_base_url: "https://api.anthropic.com".to_string(),
        claude_model: "claude-3-5-sonnet-20241022".to_string(),
        resend_api_key: None,
        resend_base_url: "https://api.resend.com".to_string(),
        email_from: "KandidatenTekort.nl <analyse@kandidatentekort.nl>".to_string(),
        pipedrive_api_token: None,
        pipedrive_base_url: "https://api.pipedrive.com".to_string(),
        meta_pixel_id: None,
        meta_access_token: None,
        meta_graph_base_url: "https://graph.facebook.com/v18.0".to_string(),
        fb_page_access_token: None,
        fb_webhook_verify_token: None,
        ga4_measurement_id: None,
        ga4_api_secret: None,
        ga4_base_url: "https://www.google-analytics.com".to_string(),
        event_source_url: "https://kandidatentekort.nl".to_string(),
    }
}
