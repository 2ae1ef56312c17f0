use async_trait::async_trait;

use crate::ad_interpreter::OpenAiInterpreter;
use crate::ad_library::{AdLibraryClient, AdPlatform};
use crate::config::Config;
use crate::identifiers::{Cnpj, Domain, InstagramHandle};
use crate::registry::RegistryClient;
use crate::verification::{AdCheck, AdCheckFailure, RegistryCheck};

/// Performs the external lookups for a lead.
///
/// Implementations never fail: every problem is reported inside the returned
/// check so the qualification can degrade the channel and continue.
#[async_trait]
pub trait LeadVerifier: Send + Sync + 'static {
    /// Social ad spend, looked up by Instagram handle.
    async fn check_social_ads(&self, handle: &InstagramHandle) -> AdCheck;

    /// Search ad spend, looked up by domain.
    async fn check_search_ads(&self, domain: &Domain) -> AdCheck;

    async fn lookup_registry(&self, cnpj: &Cnpj) -> RegistryCheck;
}

/// Production verifier: ad libraries read by an LLM, plus ReceitaWS.
pub struct HttpLeadVerifier {
    ad_library: AdLibraryClient,
    interpreter: OpenAiInterpreter,
    registry: RegistryClient,
}

impl HttpLeadVerifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            ad_library: AdLibraryClient::new(config)?,
            interpreter: OpenAiInterpreter::new(config)?,
            registry: RegistryClient::new(config)?,
        })
    }

    async fn check_ads(&self, platform: AdPlatform, query: &str) -> AdCheck {
        // Without a key the page would be fetched for nothing.
        if !self.interpreter.is_configured() {
            return AdCheck::Failed(AdCheckFailure::MissingApiKey);
        }

        match self.ad_library.fetch_page_text(platform, query).await {
            Ok(text) => self.interpreter.interpret(platform, query, &text).await,
            Err(failure) => AdCheck::Failed(failure),
        }
    }
}

#[async_trait]
impl LeadVerifier for HttpLeadVerifier {
    async fn check_social_ads(&self, handle: &InstagramHandle) -> AdCheck {
        self.check_ads(AdPlatform::Facebook, handle.as_str()).await
    }

    async fn check_search_ads(&self, domain: &Domain) -> AdCheck {
        self.check_ads(AdPlatform::Google, domain.as_str()).await
    }

    async fn lookup_registry(&self, cnpj: &Cnpj) -> RegistryCheck {
        self.registry.lookup(cnpj).await
    }
}
