use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::identifiers::{Cnpj, Domain, InstagramHandle};
use crate::qualification::{classify, QualificationResult};
use crate::scoring::{total_score, ChecklistSelection, CriterionPoints};
use crate::verification::{AdCheck, RegistryCheck, VerificationReport};
use crate::verifier::LeadVerifier;

/// Time budget of each external lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationTimeouts {
    pub ad_check: Duration,
    pub registry: Duration,
}

impl VerificationTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ad_check: config.ad_check_timeout,
            registry: config.registry_timeout,
        }
    }
}

impl Default for VerificationTimeouts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Normalised identifiers of a lead. `None` means the lookup is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadIdentifiers {
    pub instagram: Option<InstagramHandle>,
    pub domain: Option<Domain>,
    pub cnpj: Option<Cnpj>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualificationInput {
    pub identifiers: LeadIdentifiers,
    pub initial_value: f64,
    pub current_value: f64,
    pub checklist: ChecklistSelection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualificationOutcome {
    pub score: i64,
    pub qualification: QualificationResult,
    pub verifications: VerificationReport,
    /// Exclusive checklist groups with more than one option marked.
    pub checklist_warnings: Vec<String>,
}

/// Qualifies leads: runs the verifications, scores and classifies.
///
/// Cheap to clone; clones share the verifier and the points table.
#[derive(Clone)]
pub struct QualificationService {
    verifier: Arc<dyn LeadVerifier>,
    points: Arc<CriterionPoints>,
    timeouts: VerificationTimeouts,
}

impl QualificationService {
    pub fn new(
        verifier: Arc<dyn LeadVerifier>,
        points: Arc<CriterionPoints>,
        timeouts: VerificationTimeouts,
    ) -> Self {
        Self {
            verifier,
            points,
            timeouts,
        }
    }

    pub fn points(&self) -> &CriterionPoints {
        &self.points
    }

    pub async fn qualify(&self, input: QualificationInput) -> QualificationOutcome {
        let checklist_warnings: Vec<String> = input
            .checklist
            .exclusive_conflicts()
            .iter()
            .map(|conflict| {
                let message = conflict.message();
                tracing::warn!("Checklist conflict: {}", message);
                message
            })
            .collect();

        let verifications = self.run_verifications(&input.identifiers).await;
        let score = total_score(&input.checklist, &verifications.outcomes(), &self.points);
        let qualification = classify(score, input.initial_value, input.current_value);

        QualificationOutcome {
            score,
            qualification,
            verifications,
            checklist_warnings,
        }
    }

    /// Runs the lookups for every identifier present, concurrently, and
    /// collects them into one report.
    pub async fn run_verifications(&self, ids: &LeadIdentifiers) -> VerificationReport {
        let social = async {
            match &ids.instagram {
                Some(handle) => Some(self.verify_social(handle).await),
                None => None,
            }
        };
        let search = async {
            match &ids.domain {
                Some(domain) => Some(self.verify_search(domain).await),
                None => None,
            }
        };
        let registry = async {
            match &ids.cnpj {
                Some(cnpj) => Some(self.verify_registry(cnpj).await),
                None => None,
            }
        };

        let (social, search, registry) = tokio::join!(social, search, registry);

        let mut report = VerificationReport {
            instagram_username: display_or_empty(ids.instagram.as_ref()),
            domain: display_or_empty(ids.domain.as_ref()),
            cnpj: display_or_empty(ids.cnpj.as_ref()),
            ..VerificationReport::default()
        };
        if let Some(check) = &social {
            report.record_social(check);
        }
        if let Some(check) = &search {
            report.record_search(check);
        }
        if let Some(check) = &registry {
            report.record_registry(check);
        }

        tracing::info!(
            "Verificações concluídas: facebook={:?} google={:?} qsa={:?} erros={}",
            report.facebook_ads_status,
            report.google_ads_status,
            report.qsa_status,
            report.error_messages.len()
        );
        report
    }

    pub async fn verify_social(&self, handle: &InstagramHandle) -> AdCheck {
        tracing::info!("Verificando Facebook Ads para: {}", handle);
        within(
            self.timeouts.ad_check,
            self.verifier.check_social_ads(handle),
            AdCheck::TimedOut,
        )
        .await
    }

    pub async fn verify_search(&self, domain: &Domain) -> AdCheck {
        tracing::info!("Verificando Google Ads para: {}", domain);
        within(
            self.timeouts.ad_check,
            self.verifier.check_search_ads(domain),
            AdCheck::TimedOut,
        )
        .await
    }

    pub async fn verify_registry(&self, cnpj: &Cnpj) -> RegistryCheck {
        tracing::info!("Verificando QSA para CNPJ: {}", cnpj);
        within(
            self.timeouts.registry,
            self.verifier.lookup_registry(cnpj),
            RegistryCheck::TimedOut,
        )
        .await
    }
}

async fn within<T, F>(budget: Duration, lookup: F, on_timeout: fn(Duration) -> T) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(budget, lookup).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Lookup exceeded its {:?} budget", budget);
            on_timeout(budget)
        }
    }
}

fn display_or_empty<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}
