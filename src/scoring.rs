use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::verification::{AdStatus, RegistryStatus, VerificationOutcomes};

pub const REGISTRY_FOUND: &str = "validacao_cnpj_localizado";
pub const REGISTRY_OFFICER: &str = "validacao_pessoa_qsa";
pub const ADS_GOOGLE_AND_META: &str = "investimento_google_meta";
pub const ADS_GOOGLE: &str = "investimento_google";
pub const ADS_META: &str = "investimento_meta";

const STANDARD_POINTS: &[(&str, i64)] = &[
    // Revenue bracket
    ("faturamento_ate_100k", -100),
    ("faturamento_100_200k", -100),
    ("faturamento_200_400k", 0),
    ("faturamento_401k_1M", 30),
    ("faturamento_1M_4M", 30),
    // Product interest
    ("interesse_assessoria", 30),
    ("interesse_estruturacao", 10),
    ("interesse_alavancagem", 0),
    // Contact profile
    ("perfil_nome_completo", 30),
    ("perfil_linkedin", 30),
    ("perfil_cargo_estrategico", 30),
    ("perfil_cargo_tatico", 20),
    ("perfil_cargo_operacional", 0),
    // Contact quality
    ("contato_email_corp", 10),
    ("contato_email_pessoal", 0),
    // Digital presence
    ("digital_site_funcional", 30),
    ("digital_site_fora_ar", -20),
    ("digital_produto_sinergia", 20),
    // Social presence
    ("social_insta_site", 5),
    ("social_insta_google", 10),
    ("social_insta_5k", 20),
    ("social_sem_presenca", -20),
    // Registry validation
    (REGISTRY_FOUND, 10),
    (REGISTRY_OFFICER, 30),
    ("validacao_nome_generico", -30),
    // Urgency
    ("urgencia_imediata", 20),
    ("urgencia_3_meses", 10),
    ("urgencia_nao_informada", 0),
    // Current ad spend
    (ADS_GOOGLE_AND_META, 30),
    (ADS_GOOGLE, 20),
    (ADS_META, 20),
    // Manual confirmations
    ("manual_verificado_maps", 20),
    ("manual_redirecionado_assessoria", 15),
];

/// Immutable criterion → points table, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionPoints {
    table: HashMap<String, i64>,
}

impl CriterionPoints {
    /// The production points table.
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_POINTS.iter().copied())
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns a copy of this table with `overrides` replacing or adding entries.
    pub fn with_overrides(mut self, overrides: HashMap<String, i64>) -> Self {
        self.table.extend(overrides);
        self
    }

    /// Applies overrides read from a JSON object file (`{"key": points, ...}`).
    pub fn with_overrides_from_file(self, path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read criteria file {}: {}", path.display(), e)
        })?;
        let overrides: HashMap<String, i64> = serde_json::from_str(&raw).map_err(|e| {
            anyhow::anyhow!(
                "Criteria file {} must be a JSON object of integer points: {}",
                path.display(),
                e
            )
        })?;
        tracing::info!(
            "Loaded {} criterion overrides from {}",
            overrides.len(),
            path.display()
        );
        Ok(self.with_overrides(overrides))
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.table.get(key).copied()
    }

    /// Points for `key`, or 0 when the table has no such criterion.
    pub fn points(&self, key: &str) -> i64 {
        self.get(key).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for CriterionPoints {
    fn default() -> Self {
        Self::standard()
    }
}

/// Checklist groups where at most one option is expected to be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusiveGroup {
    Revenue,
    Role,
    EmailKind,
    Urgency,
}

impl ExclusiveGroup {
    pub const ALL: [ExclusiveGroup; 4] = [
        ExclusiveGroup::Revenue,
        ExclusiveGroup::Role,
        ExclusiveGroup::EmailKind,
        ExclusiveGroup::Urgency,
    ];

    pub fn keys(self) -> &'static [&'static str] {
        match self {
            ExclusiveGroup::Revenue => &[
                "faturamento_ate_100k",
                "faturamento_100_200k",
                "faturamento_200_400k",
                "faturamento_401k_1M",
                "faturamento_1M_4M",
            ],
            ExclusiveGroup::Role => &[
                "perfil_cargo_estrategico",
                "perfil_cargo_tatico",
                "perfil_cargo_operacional",
            ],
            ExclusiveGroup::EmailKind => &["contato_email_corp", "contato_email_pessoal"],
            ExclusiveGroup::Urgency => &[
                "urgencia_imediata",
                "urgencia_3_meses",
                "urgencia_nao_informada",
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExclusiveGroup::Revenue => "faturamento",
            ExclusiveGroup::Role => "cargo",
            ExclusiveGroup::EmailKind => "email",
            ExclusiveGroup::Urgency => "urgencia",
        }
    }
}

/// Two or more options of one exclusive group selected at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveConflict {
    pub group: ExclusiveGroup,
    pub keys: Vec<String>,
}

impl ExclusiveConflict {
    pub fn message(&self) -> String {
        format!(
            "Mais de uma opção marcada no grupo '{}': {}",
            self.group.label(),
            self.keys.join(", ")
        )
    }
}

/// Per-request checklist: criterion key → form value.
///
/// Values keep their JSON shape so that `"on"`, `1` and `true` all count as
/// selected, the way the qualification form submits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistSelection(BTreeMap<String, Value>);

impl ChecklistSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Marks every key in `keys` as selected.
    pub fn selecting<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self(
            keys.into_iter()
                .map(|k| (k.into(), Value::Bool(true)))
                .collect(),
        )
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// Keys whose value is truthy, in key order.
    pub fn selected_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, _)| k.as_str())
    }

    /// Exclusive groups with more than one option selected.
    pub fn exclusive_conflicts(&self) -> Vec<ExclusiveConflict> {
        ExclusiveGroup::ALL
            .iter()
            .filter_map(|&group| {
                let keys: Vec<String> = group
                    .keys()
                    .iter()
                    .filter(|k| self.is_selected(k))
                    .map(|k| (*k).to_string())
                    .collect();
                (keys.len() > 1).then_some(ExclusiveConflict { group, keys })
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ChecklistSelection {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Form truthiness: `false`, `null`, zero, and empty strings/arrays/objects
/// are unselected; anything else is selected.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Sums the points of every selected criterion known to the table.
///
/// Unknown keys are ignored so that the form can gain options before the
/// table does.
pub fn score_checklist(selection: &ChecklistSelection, points: &CriterionPoints) -> i64 {
    selection
        .selected_keys()
        .filter_map(|key| points.get(key))
        .sum()
}

/// Points contributed by the automated verifications.
///
/// Registry and ad-spend bonuses are independent of each other. Within ad
/// spend exactly one branch applies: both channels active earn the combined
/// bonus instead of the two single-channel bonuses.
pub fn score_verifications(outcomes: &VerificationOutcomes, points: &CriterionPoints) -> i64 {
    let mut total = 0;

    if outcomes.registry == RegistryStatus::Found {
        total += points.points(REGISTRY_FOUND);
        if outcomes
            .officers
            .as_ref()
            .is_some_and(|officers| !officers.is_empty())
        {
            total += points.points(REGISTRY_OFFICER);
        }
    }

    let search_active = outcomes.search_ads == AdStatus::Active;
    let social_active = outcomes.social_ads == AdStatus::Active;

    total += match (search_active, social_active) {
        (true, true) => points.points(ADS_GOOGLE_AND_META),
        (true, false) => points.points(ADS_GOOGLE),
        (false, true) => points.points(ADS_META),
        (false, false) => 0,
    };

    total
}

/// Checklist points plus verification points.
pub fn total_score(
    selection: &ChecklistSelection,
    outcomes: &VerificationOutcomes,
    points: &CriterionPoints,
) -> i64 {
    let checklist = score_checklist(selection, points);
    tracing::info!("Score after checklist: {}", checklist);

    let total = checklist + score_verifications(outcomes, points);
    tracing::info!("Final score after verifications: {}", total);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::Officer;
    use serde_json::json;

    fn officer(name: &str) -> Officer {
        Officer {
            name: name.to_string(),
            qualification: "49-Sócio-Administrador".to_string(),
        }
    }

    #[test]
    fn standard_table_has_every_criterion() {
        let points = CriterionPoints::standard();
        assert_eq!(points.len(), 33);
        assert_eq!(points.get("faturamento_ate_100k"), Some(-100));
        assert_eq!(points.get("manual_redirecionado_assessoria"), Some(15));
        assert_eq!(points.get("social_insta_site"), Some(5));
        assert_eq!(points.get("nao_existe"), None);
        assert_eq!(points.points("nao_existe"), 0);
    }

    #[test]
    fn exclusive_group_keys_exist_in_table() {
        let points = CriterionPoints::standard();
        for group in ExclusiveGroup::ALL {
            for key in group.keys() {
                assert!(points.contains(key), "missing {key}");
            }
        }
    }

    #[test]
    fn single_low_revenue_selection_is_negative() {
        let selection = ChecklistSelection::selecting(["faturamento_ate_100k"]);
        assert_eq!(score_checklist(&selection, &CriterionPoints::standard()), -100);
    }

    #[test]
    fn falsy_and_unknown_keys_do_not_count() {
        let selection: ChecklistSelection = [
            ("perfil_nome_completo", json!(true)),
            ("perfil_linkedin", json!(false)),
            ("contato_email_corp", json!("on")),
            ("digital_site_funcional", json!(0)),
            ("urgencia_imediata", json!("")),
            ("campo_novo_da_tela", json!(true)),
            ("social_insta_5k", json!(null)),
        ]
        .into_iter()
        .collect();

        assert_eq!(score_checklist(&selection, &CriterionPoints::standard()), 40);
    }

    #[test]
    fn truthiness_follows_form_semantics() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!(-2.5)));
        assert!(is_truthy(&json!("false")));
        assert!(is_truthy(&json!([0])));
        assert!(is_truthy(&json!({"a": 1})));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn both_ad_channels_earn_only_combined_bonus() {
        let outcomes = VerificationOutcomes {
            social_ads: AdStatus::Active,
            search_ads: AdStatus::Active,
            ..Default::default()
        };
        assert_eq!(score_verifications(&outcomes, &CriterionPoints::standard()), 30);
    }

    #[test]
    fn single_ad_channel_bonuses() {
        let points = CriterionPoints::standard();
        let search_only = VerificationOutcomes {
            search_ads: AdStatus::Active,
            social_ads: AdStatus::Inactive,
            ..Default::default()
        };
        let social_only = VerificationOutcomes {
            social_ads: AdStatus::Active,
            search_ads: AdStatus::Error,
            ..Default::default()
        };
        assert_eq!(score_verifications(&search_only, &points), 20);
        assert_eq!(score_verifications(&social_only, &points), 20);
    }

    #[test]
    fn registry_found_without_officers_earns_base_bonus_only() {
        let points = CriterionPoints::standard();
        let empty = VerificationOutcomes {
            registry: RegistryStatus::Found,
            officers: Some(vec![]),
            ..Default::default()
        };
        let absent = VerificationOutcomes {
            registry: RegistryStatus::Found,
            officers: None,
            ..Default::default()
        };
        assert_eq!(score_verifications(&empty, &points), 10);
        assert_eq!(score_verifications(&absent, &points), 10);
    }

    #[test]
    fn registry_found_with_officer_adds_officer_bonus() {
        let outcomes = VerificationOutcomes {
            registry: RegistryStatus::Found,
            officers: Some(vec![officer("MARIA DA SILVA")]),
            ..Default::default()
        };
        assert_eq!(score_verifications(&outcomes, &CriterionPoints::standard()), 40);
    }

    #[test]
    fn officers_ignored_unless_registry_found() {
        let outcomes = VerificationOutcomes {
            registry: RegistryStatus::NotFound,
            officers: Some(vec![officer("JOSE")]),
            ..Default::default()
        };
        assert_eq!(score_verifications(&outcomes, &CriterionPoints::standard()), 0);
    }

    #[test]
    fn unchecked_and_failed_verifications_are_neutral() {
        let points = CriterionPoints::standard();
        assert_eq!(score_verifications(&VerificationOutcomes::default(), &points), 0);

        let failed = VerificationOutcomes {
            social_ads: AdStatus::Error,
            search_ads: AdStatus::Error,
            registry: RegistryStatus::Error,
            officers: None,
        };
        assert_eq!(score_verifications(&failed, &points), 0);
    }

    #[test]
    fn end_to_end_score_reaches_100() {
        let selection =
            ChecklistSelection::selecting(["perfil_nome_completo", "contato_email_corp"]);
        let outcomes = VerificationOutcomes {
            social_ads: AdStatus::Active,
            search_ads: AdStatus::Inactive,
            registry: RegistryStatus::Found,
            officers: Some(vec![officer("JOAO")]),
        };
        assert_eq!(
            total_score(&selection, &outcomes, &CriterionPoints::standard()),
            100
        );
    }

    #[test]
    fn overrides_replace_and_extend() {
        let points = CriterionPoints::standard().with_overrides(HashMap::from([
            ("perfil_linkedin".to_string(), 5),
            ("indicacao_cliente".to_string(), 25),
        ]));
        assert_eq!(points.get("perfil_linkedin"), Some(5));
        assert_eq!(points.get("indicacao_cliente"), Some(25));
        assert_eq!(points.len(), 34);
    }

    #[test]
    fn conflicting_revenue_brackets_are_reported_but_still_add_up() {
        let selection = ChecklistSelection::selecting([
            "faturamento_401k_1M",
            "faturamento_1M_4M",
            "urgencia_imediata",
        ]);

        let conflicts = selection.exclusive_conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].group, ExclusiveGroup::Revenue);
        assert_eq!(
            conflicts[0].keys,
            vec!["faturamento_401k_1M", "faturamento_1M_4M"]
        );
        assert!(conflicts[0].message().contains("faturamento"));

        assert_eq!(score_checklist(&selection, &CriterionPoints::standard()), 80);
    }
}
