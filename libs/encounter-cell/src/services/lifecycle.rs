// libs/encounter-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, DispenseStatus, EncounterError, LabStatus, StayStatus};

/// Stateless transition rules for every encounter family. The services call
/// these before writing; the write itself re-checks the expected status in
/// its filter, so a stale read here can reject early but never corrupt.
pub struct EncounterLifecycleService;

impl EncounterLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_appointment_transition(
        &self,
        current: &AppointmentStatus,
        new: &AppointmentStatus,
    ) -> Result<(), EncounterError> {
        debug!("Validating appointment transition {:?} -> {:?}", current, new);

        if !self.appointment_transitions(current).contains(new) {
            warn!("Invalid appointment transition attempted: {:?} -> {:?}", current, new);
            return Err(EncounterError::InvalidTransition(
                format!("appointment cannot move from {} to {}", current, new),
            ));
        }

        Ok(())
    }

    pub fn appointment_transitions(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Canceled,
            ],
            // Terminal states
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Canceled => vec![],
        }
    }

    pub fn validate_dispense(&self, current: &DispenseStatus) -> Result<(), EncounterError> {
        match current {
            DispenseStatus::Pending => Ok(()),
            DispenseStatus::Dispensed => Err(EncounterError::AlreadyProcessed(
                "appointment has already been dispensed".to_string(),
            )),
        }
    }

    pub fn validate_discharge(&self, current: &StayStatus) -> Result<(), EncounterError> {
        match current {
            StayStatus::Admitted => Ok(()),
            StayStatus::Discharged => Err(EncounterError::AlreadyProcessed(
                "patient has already been discharged".to_string(),
            )),
        }
    }

    pub fn validate_lab_completion(&self, current: &LabStatus) -> Result<(), EncounterError> {
        match current {
            LabStatus::Pending => Ok(()),
            // Completed tests are immutable
            LabStatus::Completed => Err(EncounterError::AlreadyProcessed(
                "lab test result has already been submitted".to_string(),
            )),
        }
    }
}

impl Default for EncounterLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_appointment_can_complete_or_cancel() {
        let lifecycle = EncounterLifecycleService::new();

        assert!(lifecycle
            .validate_appointment_transition(&AppointmentStatus::Scheduled, &AppointmentStatus::Completed)
            .is_ok());
        assert!(lifecycle
            .validate_appointment_transition(&AppointmentStatus::Scheduled, &AppointmentStatus::Canceled)
            .is_ok());
    }

    #[test]
    fn completed_and_canceled_are_terminal() {
        let lifecycle = EncounterLifecycleService::new();

        assert!(lifecycle.appointment_transitions(&AppointmentStatus::Completed).is_empty());
        assert!(lifecycle.appointment_transitions(&AppointmentStatus::Canceled).is_empty());

        let result = lifecycle.validate_appointment_transition(
            &AppointmentStatus::Completed,
            &AppointmentStatus::Scheduled,
        );
        assert!(matches!(result, Err(EncounterError::InvalidTransition(_))));
    }

    #[test]
    fn dispense_discharge_and_lab_are_one_way() {
        let lifecycle = EncounterLifecycleService::new();

        assert!(lifecycle.validate_dispense(&DispenseStatus::Pending).is_ok());
        assert!(matches!(
            lifecycle.validate_dispense(&DispenseStatus::Dispensed),
            Err(EncounterError::AlreadyProcessed(_))
        ));

        assert!(lifecycle.validate_discharge(&StayStatus::Admitted).is_ok());
        assert!(matches!(
            lifecycle.validate_discharge(&StayStatus::Discharged),
            Err(EncounterError::AlreadyProcessed(_))
        ));

        assert!(lifecycle.validate_lab_completion(&LabStatus::Pending).is_ok());
        assert!(matches!(
            lifecycle.validate_lab_completion(&LabStatus::Completed),
            Err(EncounterError::AlreadyProcessed(_))
        ));
    }
}
