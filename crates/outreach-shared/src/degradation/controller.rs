//! # Graceful Degradation Controller
//!
//! Aggregates component-health signals into one process-wide level. The level
//! is an atomic that only moves up automatically (`fetch_max`); the only ways
//! down are an explicit [`DegradationController::reset`] or a streak of healthy
//! checks reported through [`DegradationController::record_health_check`].

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use thiserror::Error;
use tracing::{info, warn};

use super::levels::{ComponentLevelTable, DegradationLevel, Operation};
use crate::config::DegradationSettings;

/// Rejections issued by the degradation gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DegradationError {
    #[error("System in maintenance mode: write operation '{operation}' rejected")]
    MaintenanceMode { operation: Operation },

    #[error("Operation '{operation}' unavailable at degradation level '{level}'")]
    OperationUnavailable {
        operation: Operation,
        level: DegradationLevel,
    },
}

/// Process-wide degradation state
#[derive(Debug)]
pub struct DegradationController {
    level: AtomicU8,
    table: ComponentLevelTable,
    recovery_streak: u32,
    healthy_streak: AtomicU32,
}

impl DegradationController {
    pub fn new(table: ComponentLevelTable, recovery_streak: u32) -> Self {
        Self {
            level: AtomicU8::new(DegradationLevel::Full.as_u8()),
            table,
            recovery_streak: recovery_streak.max(1),
            healthy_streak: AtomicU32::new(0),
        }
    }

    pub fn from_settings(settings: &DegradationSettings) -> Self {
        Self::new(
            ComponentLevelTable::with_overrides(&settings.component_levels),
            settings.recovery_streak,
        )
    }

    pub fn current_level(&self) -> DegradationLevel {
        DegradationLevel::from_u8(self.level.load(Ordering::SeqCst))
            .unwrap_or(DegradationLevel::Maintenance)
    }

    pub fn component_table(&self) -> &ComponentLevelTable {
        &self.table
    }

    /// Record a component failure and escalate to at least its mapped level.
    ///
    /// Returns the resulting level, which never decreases.
    pub fn adjust_operation(&self, failed_component: &str) -> DegradationLevel {
        let mapped = match self.table.get(failed_component) {
            Some(level) => level,
            None => {
                let fallback = self.table.level_for(failed_component);
                warn!(
                    component = failed_component,
                    level = %fallback,
                    "Unknown component failure, applying default degradation level"
                );
                fallback
            }
        };
        self.escalate_to(mapped, failed_component)
    }

    /// Raise the level to at least `level`
    pub fn escalate_to(&self, level: DegradationLevel, reason: &str) -> DegradationLevel {
        self.healthy_streak.store(0, Ordering::SeqCst);
        let previous = self.level.fetch_max(level.as_u8(), Ordering::SeqCst);
        let previous = DegradationLevel::from_u8(previous).unwrap_or(DegradationLevel::Maintenance);
        let current = previous.max(level);

        if current > previous {
            warn!(
                reason,
                from_level = %previous,
                to_level = %current,
                "Degradation level escalated"
            );
        }
        current
    }

    /// Return to full service. Returns the level that was cleared.
    pub fn reset(&self) -> DegradationLevel {
        self.healthy_streak.store(0, Ordering::SeqCst);
        let previous = self.level.swap(DegradationLevel::Full.as_u8(), Ordering::SeqCst);
        let previous = DegradationLevel::from_u8(previous).unwrap_or(DegradationLevel::Maintenance);
        if previous != DegradationLevel::Full {
            info!(from_level = %previous, "Degradation level reset to full service");
        }
        previous
    }

    /// Feed one health-check result from an external monitor.
    ///
    /// After `recovery_streak` consecutive healthy checks the level resets;
    /// returns `true` when that reset happened. An unhealthy check clears the streak.
    pub fn record_health_check(&self, healthy: bool) -> bool {
        if !healthy {
            self.healthy_streak.store(0, Ordering::SeqCst);
            return false;
        }
        if self.current_level() == DegradationLevel::Full {
            return false;
        }

        let streak = self.healthy_streak.fetch_add(1, Ordering::SeqCst) + 1;
        if streak >= self.recovery_streak {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Operations permitted at the current level
    pub fn get_available_operations(&self) -> &'static [Operation] {
        self.current_level().available_operations()
    }

    pub fn is_permitted(&self, operation: Operation) -> bool {
        self.current_level().permits(operation)
    }

    /// Gate an operation against the current level.
    ///
    /// In maintenance mode writes fail with [`DegradationError::MaintenanceMode`].
    pub fn ensure_permitted(&self, operation: Operation) -> Result<(), DegradationError> {
        let level = self.current_level();
        if level.permits(operation) {
            return Ok(());
        }
        if level == DegradationLevel::Maintenance && operation.is_write() {
            return Err(DegradationError::MaintenanceMode { operation });
        }
        Err(DegradationError::OperationUnavailable { operation, level })
    }
}

impl Default for DegradationController {
    fn default() -> Self {
        Self::from_settings(&DegradationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_full_service() {
        let controller = DegradationController::default();
        assert_eq!(controller.current_level(), DegradationLevel::Full);
        assert!(controller.is_permitted(Operation::EnrichLeads));
    }

    #[test]
    fn test_adjust_never_lowers_level() {
        let controller = DegradationController::default();
        assert_eq!(
            controller.adjust_operation("email_provider"),
            DegradationLevel::Essential
        );

        // llm_api maps to Limited (2); current Essential (3) stays
        assert_eq!(
            controller.adjust_operation("llm_api"),
            DegradationLevel::Essential
        );
        assert_eq!(controller.current_level(), DegradationLevel::Essential);
    }

    #[test]
    fn test_enrichment_failure_removes_enrichment() {
        let controller = DegradationController::default();
        controller.adjust_operation("clay_api");
        assert_eq!(controller.current_level(), DegradationLevel::Reduced);
        assert!(!controller
            .get_available_operations()
            .contains(&Operation::EnrichLeads));
        assert!(controller.is_permitted(Operation::SendEmails));
    }

    #[test]
    fn test_unknown_component_uses_default_level() {
        let controller = DegradationController::default();
        assert_eq!(
            controller.adjust_operation("brand_new_vendor"),
            DegradationLevel::Reduced
        );
    }

    #[test]
    fn test_maintenance_rejects_writes_with_clear_signal() {
        let controller = DegradationController::default();
        controller.adjust_operation("database");
        assert_eq!(controller.current_level(), DegradationLevel::Maintenance);

        let err = controller.ensure_permitted(Operation::SendEmails).unwrap_err();
        assert_eq!(
            err,
            DegradationError::MaintenanceMode {
                operation: Operation::SendEmails
            }
        );
        assert!(err.to_string().contains("maintenance mode"));
        assert!(controller.ensure_permitted(Operation::ReadCachedData).is_ok());
    }

    #[test]
    fn test_unavailable_operation_below_maintenance() {
        let controller = DegradationController::default();
        controller.escalate_to(DegradationLevel::Limited, "test");
        assert_eq!(
            controller.ensure_permitted(Operation::PersonalizeMessages),
            Err(DegradationError::OperationUnavailable {
                operation: Operation::PersonalizeMessages,
                level: DegradationLevel::Limited,
            })
        );
    }

    #[test]
    fn test_reset_returns_to_full() {
        let controller = DegradationController::default();
        controller.adjust_operation("database");
        assert_eq!(controller.reset(), DegradationLevel::Maintenance);
        assert_eq!(controller.current_level(), DegradationLevel::Full);
    }

    #[test]
    fn test_health_streak_resets_level() {
        let controller = DegradationController::new(ComponentLevelTable::default(), 3);
        controller.adjust_operation("llm_api");

        assert!(!controller.record_health_check(true));
        assert!(!controller.record_health_check(true));
        // A failed check restarts the streak
        assert!(!controller.record_health_check(false));
        assert!(!controller.record_health_check(true));
        assert!(!controller.record_health_check(true));
        assert_eq!(controller.current_level(), DegradationLevel::Limited);

        assert!(controller.record_health_check(true));
        assert_eq!(controller.current_level(), DegradationLevel::Full);
    }

    #[test]
    fn test_escalation_clears_health_streak() {
        let controller = DegradationController::new(ComponentLevelTable::default(), 2);
        controller.adjust_operation("clay_api");
        assert!(!controller.record_health_check(true));
        controller.adjust_operation("clay_api");
        assert!(!controller.record_health_check(true));
        assert!(controller.record_health_check(true));
    }

    #[test]
    fn test_concurrent_escalation_keeps_maximum() {
        let controller = Arc::new(DegradationController::default());
        let components = ["clay_api", "llm_api", "database", "crm", "email_provider"];

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let controller = controller.clone();
                let component = components[i % components.len()];
                std::thread::spawn(move || controller.adjust_operation(component))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(controller.current_level(), DegradationLevel::Maintenance);
    }
}
