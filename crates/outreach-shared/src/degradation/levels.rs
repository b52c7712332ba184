//! Degradation levels, the operations each level permits, and the static
//! component → minimum level table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Process-wide operating level, 0 (full service) through 4 (maintenance)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DegradationLevel {
    /// All operations available
    #[display("full")]
    Full = 0,
    /// Live enrichment disabled; cached enrichment only
    #[display("reduced")]
    Reduced = 1,
    /// Template-only messaging at reduced throughput
    #[display("limited")]
    Limited = 2,
    /// No new outbound; CRM sync and queueing only
    #[display("essential")]
    Essential = 3,
    /// Read-only; all writes rejected
    #[display("maintenance")]
    Maintenance = 4,
}

impl DegradationLevel {
    pub const ALL: [DegradationLevel; 5] = [
        DegradationLevel::Full,
        DegradationLevel::Reduced,
        DegradationLevel::Limited,
        DegradationLevel::Essential,
        DegradationLevel::Maintenance,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Level for a raw value; anything above 4 is not a level
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Fixed, ordered set of operations permitted at this level
    pub fn available_operations(self) -> &'static [Operation] {
        match self {
            DegradationLevel::Full => FULL_OPERATIONS,
            DegradationLevel::Reduced => REDUCED_OPERATIONS,
            DegradationLevel::Limited => LIMITED_OPERATIONS,
            DegradationLevel::Essential => ESSENTIAL_OPERATIONS,
            DegradationLevel::Maintenance => MAINTENANCE_OPERATIONS,
        }
    }

    pub fn permits(self, operation: Operation) -> bool {
        self.available_operations().contains(&operation)
    }
}

/// Operations gated by the degradation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[display("enrich_leads")]
    EnrichLeads,
    #[display("personalize_messages")]
    PersonalizeMessages,
    #[display("send_emails")]
    SendEmails,
    #[display("score_leads")]
    ScoreLeads,
    #[display("sync_crm")]
    SyncCrm,
    #[display("queue_for_later")]
    QueueForLater,
    #[display("generate_reports")]
    GenerateReports,
    #[display("read_cached_data")]
    ReadCachedData,
    #[display("health_check")]
    HealthCheck,
}

impl Operation {
    /// Whether the operation mutates external state (rejected in maintenance mode)
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            Operation::GenerateReports | Operation::ReadCachedData | Operation::HealthCheck
        )
    }
}

const FULL_OPERATIONS: &[Operation] = &[
    Operation::EnrichLeads,
    Operation::PersonalizeMessages,
    Operation::SendEmails,
    Operation::ScoreLeads,
    Operation::SyncCrm,
    Operation::QueueForLater,
    Operation::GenerateReports,
    Operation::ReadCachedData,
    Operation::HealthCheck,
];

const REDUCED_OPERATIONS: &[Operation] = &[
    Operation::PersonalizeMessages,
    Operation::SendEmails,
    Operation::ScoreLeads,
    Operation::SyncCrm,
    Operation::QueueForLater,
    Operation::GenerateReports,
    Operation::ReadCachedData,
    Operation::HealthCheck,
];

const LIMITED_OPERATIONS: &[Operation] = &[
    Operation::SendEmails,
    Operation::ScoreLeads,
    Operation::SyncCrm,
    Operation::QueueForLater,
    Operation::GenerateReports,
    Operation::ReadCachedData,
    Operation::HealthCheck,
];

const ESSENTIAL_OPERATIONS: &[Operation] = &[
    Operation::SyncCrm,
    Operation::QueueForLater,
    Operation::GenerateReports,
    Operation::ReadCachedData,
    Operation::HealthCheck,
];

const MAINTENANCE_OPERATIONS: &[Operation] = &[
    Operation::GenerateReports,
    Operation::ReadCachedData,
    Operation::HealthCheck,
];

/// Built-in minimum degradation level implied by each component's failure
pub const DEFAULT_COMPONENT_LEVELS: &[(&str, DegradationLevel)] = &[
    ("enrichment_provider", DegradationLevel::Reduced),
    ("clay_api", DegradationLevel::Reduced),
    ("apollo_api", DegradationLevel::Reduced),
    ("scraper", DegradationLevel::Reduced),
    ("feature_drift", DegradationLevel::Reduced),
    ("personalization_engine", DegradationLevel::Limited),
    ("llm_api", DegradationLevel::Limited),
    ("crm", DegradationLevel::Limited),
    ("hubspot_api", DegradationLevel::Limited),
    ("email_provider", DegradationLevel::Essential),
    ("instantly_api", DegradationLevel::Essential),
    ("database", DegradationLevel::Maintenance),
];

/// Level assumed for components missing from the table
pub const UNKNOWN_COMPONENT_LEVEL: DegradationLevel = DegradationLevel::Reduced;

/// Component → minimum level lookup (built-ins merged with overrides)
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLevelTable {
    levels: HashMap<String, DegradationLevel>,
}

impl ComponentLevelTable {
    /// Built-in table with `overrides` applied on top; invalid override levels are skipped
    pub fn with_overrides(overrides: &HashMap<String, u8>) -> Self {
        let mut levels: HashMap<String, DegradationLevel> = DEFAULT_COMPONENT_LEVELS
            .iter()
            .map(|(name, level)| ((*name).to_string(), *level))
            .collect();

        for (name, raw) in overrides {
            match DegradationLevel::from_u8(*raw) {
                Some(level) => {
                    levels.insert(name.clone(), level);
                }
                None => tracing::warn!(component = %name, level = raw, "Ignoring invalid degradation level override"),
            }
        }

        Self { levels }
    }

    /// Mapped level for a component, or `None` if unknown
    pub fn get(&self, component: &str) -> Option<DegradationLevel> {
        self.levels.get(component).copied()
    }

    /// Mapped level, falling back to [`UNKNOWN_COMPONENT_LEVEL`]
    pub fn level_for(&self, component: &str) -> DegradationLevel {
        self.get(component).unwrap_or(UNKNOWN_COMPONENT_LEVEL)
    }
}

impl Default for ComponentLevelTable {
    fn default() -> Self {
        Self::with_overrides(&HashMap::new())
    }
}
