use reqwest::Client;
use serde_json::{json, Value};

use crate::ad_library::AdPlatform;
use crate::config::Config;
use crate::verification::{AdCheck, AdCheckFailure};

/// Characters of page text sent to the model.
const MAX_CONTENT_CHARS: usize = 15_000;

/// Asks an OpenAI chat model whether an ad library page shows active ads.
pub struct OpenAiInterpreter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiInterpreter {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.ad_fetch_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create OpenAI client: {}", e))?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Classifies `content` as showing active ads or not.
    pub async fn interpret(&self, platform: AdPlatform, query: &str, content: &str) -> AdCheck {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("Chave API OpenAI não configurada. Análise de IA abortada.");
            return AdCheck::Failed(AdCheckFailure::MissingApiKey);
        };
        if content.trim().is_empty() {
            tracing::warn!(
                "Conteúdo vazio para {} na plataforma {}. Análise de IA abortada.",
                query,
                platform.label()
            );
            return AdCheck::Failed(AdCheckFailure::EmptyContent);
        }

        tracing::info!(
            "Iniciando análise de IA para {} na plataforma {}",
            query,
            platform.label()
        );

        let answer = match self.ask(api_key, &build_prompt(platform, content)).await {
            Ok(answer) => answer,
            Err(detail) => {
                tracing::error!(
                    "Erro durante a análise de IA para {} ({}): {}",
                    query,
                    platform.label(),
                    detail
                );
                return AdCheck::Failed(AdCheckFailure::Interpretation(detail));
            }
        };

        tracing::info!(
            "Resultado da análise de IA para {} ({}): {}",
            query,
            platform.label(),
            answer
        );
        let check = parse_answer(&answer);
        if matches!(check, AdCheck::Failed(_)) {
            tracing::warn!(
                "Resposta inesperada da IA para {} ({}): {}",
                query,
                platform.label(),
                answer
            );
        }
        check
    }

    async fn ask(&self, api_key: &str, prompt: &str) -> Result<String, String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "Você é um especialista em marketing digital que analisa textos de páginas de bibliotecas de anúncios."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("invalid response body: {}", e))?;

        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "response without message content".to_string())
    }
}

/// Prompt asking for a bare `Sim`/`Não` verdict on the page text.
pub fn build_prompt(platform: AdPlatform, content: &str) -> String {
    let excerpt: String = content.chars().take(MAX_CONTENT_CHARS).collect();
    format!(
        "Analise o seguinte conteúdo da {} e determine se existem anúncios ATIVOS para o {}.\n\
         Conteúdo da página:\n--- INÍCIO ---\n{}\n--- FIM ---\n\n\
         Procure por indicadores como {}, ou a presença explícita de anúncios listados (cards, imagens, textos de anúncios). \
         Considere que a página pode conter muitos elementos não relacionados a anúncios. \
         Foque em encontrar evidências concretas de anúncios ativos. \
         Responda APENAS com 'Sim' se encontrar anúncios ativos, ou 'Não' caso contrário. Não inclua explicações.",
        platform.library_name(),
        platform.query_kind(),
        excerpt,
        platform.negative_indicators()
    )
}

/// Maps the model's answer onto an ad check. Case, surrounding whitespace,
/// quotes and a trailing period are ignored.
pub fn parse_answer(answer: &str) -> AdCheck {
    let normalized = answer
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim_end_matches('.')
        .trim()
        .to_lowercase();

    match normalized.as_str() {
        "sim" => AdCheck::Active,
        "não" | "nao" => AdCheck::Inactive,
        _ => AdCheck::Failed(AdCheckFailure::UnexpectedAnswer(answer.to_string())),
    }
}
