use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;

use crate::config::Config;
use crate::verification::AdCheckFailure;

/// Public ad transparency library queried for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdPlatform {
    /// Facebook Ads Library, searched by Instagram handle.
    Facebook,
    /// Google Ads Transparency Center, searched by domain.
    Google,
}

impl AdPlatform {
    pub fn label(self) -> &'static str {
        match self {
            AdPlatform::Facebook => "facebook",
            AdPlatform::Google => "google",
        }
    }

    /// Human name of the library, as used in the interpreter prompt.
    pub fn library_name(self) -> &'static str {
        match self {
            AdPlatform::Facebook => "Biblioteca de Anúncios do Facebook",
            AdPlatform::Google => "Central de Transparência de Anúncios do Google",
        }
    }

    pub fn query_kind(self) -> &'static str {
        match self {
            AdPlatform::Facebook => "usuário",
            AdPlatform::Google => "domínio",
        }
    }

    /// Phrases the library shows when nothing is running.
    pub fn negative_indicators(self) -> &'static str {
        match self {
            AdPlatform::Facebook => "'nenhum anúncio encontrado', '0 resultados'",
            AdPlatform::Google => "'Nenhum anúncio foi encontrado', 'não veiculou anúncios'",
        }
    }

    /// Element the library only renders once search results have loaded:
    /// the main results container on Facebook, the search box on Google.
    fn ready_marker(self) -> &'static Regex {
        static FACEBOOK: OnceLock<Regex> = OnceLock::new();
        static GOOGLE: OnceLock<Regex> = OnceLock::new();
        match self {
            AdPlatform::Facebook => FACEBOOK.get_or_init(|| {
                Regex::new(r#"(?i)<div\b[^>]*\brole\s*=\s*["']?main\b"#)
                    .expect("valid marker regex")
            }),
            AdPlatform::Google => GOOGLE.get_or_init(|| {
                Regex::new(r#"(?i)<input\b[^>]*\btype\s*=\s*["']?search\b"#)
                    .expect("valid marker regex")
            }),
        }
    }

    pub fn is_rendered(self, html: &str) -> bool {
        self.ready_marker().is_match(html)
    }

    fn query_params(self, query: &str) -> Vec<(&'static str, String)> {
        match self {
            AdPlatform::Facebook => vec![
                ("active_status", "active".to_string()),
                ("ad_type", "all".to_string()),
                ("country", "BR".to_string()),
                ("q", query.to_string()),
                ("search_type", "keyword".to_string()),
            ],
            AdPlatform::Google => vec![
                ("region", "BR".to_string()),
                ("domain", query.to_string()),
            ],
        }
    }
}

pub const NOT_RENDERED: &str = "página não renderizada";

/// Fetches ad library pages and reduces them to plain text.
pub struct AdLibraryClient {
    client: Client,
    facebook_url: String,
    google_url: String,
}

impl AdLibraryClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.ad_fetch_timeout)
            .user_agent("Mozilla/5.0 (compatible; lead-qualifier-api)")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create ad library client: {}", e))?;

        Ok(Self {
            client,
            facebook_url: config.facebook_ads_library_url.clone(),
            google_url: config.google_ads_transparency_url.clone(),
        })
    }

    /// Builds the library search URL with encoded query parameters.
    pub fn search_url(
        &self,
        platform: AdPlatform,
        query: &str,
    ) -> Result<reqwest::Url, AdCheckFailure> {
        let base = match platform {
            AdPlatform::Facebook => &self.facebook_url,
            AdPlatform::Google => &self.google_url,
        };
        reqwest::Url::parse_with_params(base, platform.query_params(query))
            .map_err(|e| AdCheckFailure::Extraction(format!("URL inválida: {}", e)))
    }

    /// Returns the visible text of the library page for `query`.
    pub async fn fetch_page_text(
        &self,
        platform: AdPlatform,
        query: &str,
    ) -> Result<String, AdCheckFailure> {
        let url = self.search_url(platform, query)?;
        tracing::info!(
            "Acessando biblioteca de anúncios ({}) para: {}",
            platform.label(),
            query
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(
                "Erro ao extrair anúncios ({}) para {}: {}",
                platform.label(),
                query,
                e
            );
            AdCheckFailure::Extraction(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "Biblioteca de anúncios ({}) retornou status {} para {}",
                platform.label(),
                status,
                query
            );
            return Err(AdCheckFailure::Extraction(format!("HTTP {}", status.as_u16())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AdCheckFailure::Extraction(e.to_string()))?;

        if !platform.is_rendered(&html) {
            tracing::error!(
                "Biblioteca de anúncios ({}) não renderizou resultados para {}",
                platform.label(),
                query
            );
            return Err(AdCheckFailure::Extraction(NOT_RENDERED.to_string()));
        }

        let text = strip_html(&html);
        if text.is_empty() {
            return Err(AdCheckFailure::EmptyContent);
        }

        tracing::info!(
            "Extração concluída ({}) para {}: {} caracteres",
            platform.label(),
            query,
            text.chars().count()
        );
        Ok(text)
    }
}

/// Strips tags plus `<script>`/`<style>` bodies, then normalizes whitespace.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();
    let mut skip_until: Option<&'static str> = None;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .find(|s| !s.is_empty())
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let closing = tag.trim_start().starts_with('/');

                match skip_until {
                    Some(end) if closing && name == end => skip_until = None,
                    Some(_) => {}
                    None if !closing && name == "script" => skip_until = Some("script"),
                    None if !closing && name == "style" => skip_until = Some("style"),
                    None => out.push(' '),
                }
            }
            _ if in_tag => tag.push(ch),
            _ if skip_until.is_none() => out.push(ch),
            _ => {}
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
