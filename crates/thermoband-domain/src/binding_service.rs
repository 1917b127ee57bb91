use std::sync::Arc;

use garde::Validate;
use tracing::{debug, info, instrument};

use crate::binding::{CreateBindingInput, DeviceBinding, RegisterDeviceOutcome};
use crate::error::{DomainError, DomainResult};
use crate::repository::{BindingRepository, PatientRepository};
use crate::validate::validate_struct;

/// Service request for claiming a device into a user's pool
#[derive(Debug, Clone, Validate)]
pub struct RegisterDeviceRequest {
    #[garde(skip)] // user_id resolved by the auth layer
    pub user_id: String,
    #[garde(length(min = 1))]
    pub mac_address: String,
}

/// Service request for assigning a device to a patient
#[derive(Debug, Clone, Validate)]
pub struct AssignDeviceRequest {
    #[garde(skip)]
    pub user_id: String,
    #[garde(length(min = 1))]
    pub patient_id: String,
    #[garde(length(min = 1))]
    pub mac_address: String,
}

/// Service request for flagging a deferred reset
#[derive(Debug, Clone, Validate)]
pub struct RequestResetRequest {
    #[garde(length(min = 1))]
    pub mac_address: String,
}

/// Service request for tuning the advisory sampling interval
#[derive(Debug, Clone, Validate)]
pub struct SetIntervalRequest {
    #[garde(length(min = 1))]
    pub mac_address: String,
    #[garde(skip)] // checked separately so the error maps to InvalidInterval
    pub interval_seconds: i32,
}

/// Binding lifecycle service: register, assign, reset-request, interval,
/// unassigned pool queries. Mutates the same rows the ingestion pipeline
/// reads; every mutation is a single atomic statement in the store.
pub struct BindingService {
    binding_repository: Arc<dyn BindingRepository>,
    patient_repository: Arc<dyn PatientRepository>,
}

impl BindingService {
    pub fn new(
        binding_repository: Arc<dyn BindingRepository>,
        patient_repository: Arc<dyn PatientRepository>,
    ) -> Self {
        Self {
            binding_repository,
            patient_repository,
        }
    }

    /// Claim a device into a user's pool, or report who already holds it.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, mac_address = %request.mac_address))]
    pub async fn register_device(
        &self,
        request: RegisterDeviceRequest,
    ) -> DomainResult<RegisterDeviceOutcome> {
        validate_struct(&request)?;

        if let Some(existing) = self
            .binding_repository
            .get_binding(&request.mac_address)
            .await?
        {
            return Ok(Self::claimed_outcome(existing, &request.user_id));
        }

        let created = self
            .binding_repository
            .create_binding(CreateBindingInput {
                mac_address: request.mac_address.clone(),
                user_id: request.user_id.clone(),
            })
            .await;

        match created {
            Ok(binding) => {
                info!(mac_address = %binding.mac_address, "device registered to unassigned pool");
                Ok(RegisterDeviceOutcome::New(binding))
            }
            // Lost a registration race; report whoever won it.
            Err(DomainError::DeviceAlreadyRegistered(_)) => {
                match self
                    .binding_repository
                    .get_binding(&request.mac_address)
                    .await?
                {
                    Some(existing) => Ok(Self::claimed_outcome(existing, &request.user_id)),
                    None => Err(DomainError::DeviceAlreadyRegistered(request.mac_address)),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn claimed_outcome(existing: DeviceBinding, user_id: &str) -> RegisterDeviceOutcome {
        if existing.user_id == user_id {
            RegisterDeviceOutcome::AlreadyOwned(existing)
        } else {
            RegisterDeviceOutcome::ClaimedByOther {
                mac_address: existing.mac_address,
            }
        }
    }

    /// Assign an unassigned device to a patient owned by the caller.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, patient_id = %request.patient_id, mac_address = %request.mac_address))]
    pub async fn assign_device(&self, request: AssignDeviceRequest) -> DomainResult<()> {
        validate_struct(&request)?;

        // Ownership check hides other users' patients entirely.
        let patient = self
            .patient_repository
            .get_patient(&request.patient_id)
            .await?;
        match patient {
            Some(p) if p.user_id == request.user_id => {}
            _ => return Err(DomainError::PatientNotFound(request.patient_id)),
        }

        let binding = self
            .binding_repository
            .get_binding(&request.mac_address)
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(request.mac_address.clone()))?;

        if binding.patient_id.is_some() {
            return Err(DomainError::DeviceAlreadyAssigned(request.mac_address));
        }

        // The claim is conditional on the row still being unassigned, so a
        // concurrent assign cannot also win.
        let claimed = self
            .binding_repository
            .claim_for_patient(&request.mac_address, &request.patient_id)
            .await?;
        if !claimed {
            return Err(DomainError::DeviceAlreadyAssigned(request.mac_address));
        }

        info!(
            mac_address = %request.mac_address,
            patient_id = %request.patient_id,
            "device assigned to patient"
        );
        Ok(())
    }

    /// Flag a deferred reset. Data destruction happens only after the
    /// device has acknowledged the directive on its next report.
    #[instrument(skip(self, request), fields(mac_address = %request.mac_address))]
    pub async fn request_reset(&self, request: RequestResetRequest) -> DomainResult<()> {
        validate_struct(&request)?;

        let flagged = self
            .binding_repository
            .set_reset_requested(&request.mac_address, true)
            .await?;
        if !flagged {
            return Err(DomainError::DeviceNotFound(request.mac_address));
        }

        info!(mac_address = %request.mac_address, "reset flagged, awaiting device acknowledgment");
        Ok(())
    }

    /// Update the advisory sampling interval for a device.
    #[instrument(skip(self, request), fields(mac_address = %request.mac_address, interval_seconds = request.interval_seconds))]
    pub async fn set_interval(&self, request: SetIntervalRequest) -> DomainResult<()> {
        if request.interval_seconds < 1 {
            return Err(DomainError::InvalidInterval(format!(
                "interval must be a positive number of seconds, got {}",
                request.interval_seconds
            )));
        }
        validate_struct(&request)?;

        let updated = self
            .binding_repository
            .set_interval(&request.mac_address, request.interval_seconds)
            .await?;
        if !updated {
            return Err(DomainError::DeviceNotFound(request.mac_address));
        }

        debug!(mac_address = %request.mac_address, "sampling interval updated");
        Ok(())
    }

    /// List every device sitting in the unassigned pool.
    pub async fn list_unassigned_devices(&self) -> DomainResult<Vec<DeviceBinding>> {
        let bindings = self.binding_repository.list_unassigned().await?;
        debug!(count = bindings.len(), "listed unassigned devices");
        Ok(bindings)
    }

    /// Look up the device currently bound to one of the caller's patients.
    #[instrument(skip(self), fields(user_id = %user_id, patient_id = %patient_id))]
    pub async fn device_for_patient(
        &self,
        user_id: &str,
        patient_id: &str,
    ) -> DomainResult<Option<String>> {
        let patient = self
            .patient_repository
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| DomainError::PatientNotFound(patient_id.to_string()))?;
        if patient.user_id != user_id {
            return Err(DomainError::PermissionDenied(
                "Unauthorized access to patient device info".to_string(),
            ));
        }

        Ok(self
            .binding_repository
            .find_by_patient(patient_id)
            .await?
            .map(|binding| binding.mac_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Patient;
    use crate::repository::{MockBindingRepository, MockPatientRepository};

    fn unassigned_binding(mac: &str, user_id: &str) -> DeviceBinding {
        DeviceBinding {
            mac_address: mac.to_string(),
            user_id: user_id.to_string(),
            patient_id: None,
            interval_seconds: 300,
            reset_requested: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn patient(patient_id: &str, user_id: &str) -> Patient {
        Patient {
            patient_id: patient_id.to_string(),
            user_id: user_id.to_string(),
            name: "Pat".to_string(),
            age: 42,
            created_at: None,
            updated_at: None,
        }
    }

    fn service(
        bindings: MockBindingRepository,
        patients: MockPatientRepository,
    ) -> BindingService {
        BindingService::new(Arc::new(bindings), Arc::new(patients))
    }

    #[tokio::test]
    async fn test_register_device_new() {
        let mut bindings = MockBindingRepository::new();

        bindings
            .expect_get_binding()
            .times(1)
            .return_once(|_| Ok(None));
        bindings
            .expect_create_binding()
            .withf(|input: &CreateBindingInput| {
                input.mac_address == "AA:BB:CC:01" && input.user_id == "user-1"
            })
            .times(1)
            .return_once(|input| {
                Ok(unassigned_binding(&input.mac_address, &input.user_id))
            });

        let service = service(bindings, MockPatientRepository::new());

        let outcome = service
            .register_device(RegisterDeviceRequest {
                user_id: "user-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, RegisterDeviceOutcome::New(_)));
    }

    #[tokio::test]
    async fn test_register_device_is_idempotent_for_same_user() {
        let mut bindings = MockBindingRepository::new();

        // Two registration calls; no create is ever attempted the second
        // time because the row already exists.
        bindings
            .expect_get_binding()
            .times(2)
            .returning(|mac| Ok(Some(unassigned_binding(mac, "user-1"))));

        let service = service(bindings, MockPatientRepository::new());

        for _ in 0..2 {
            let outcome = service
                .register_device(RegisterDeviceRequest {
                    user_id: "user-1".to_string(),
                    mac_address: "AA:BB:CC:01".to_string(),
                })
                .await
                .unwrap();
            assert!(matches!(outcome, RegisterDeviceOutcome::AlreadyOwned(_)));
        }
    }

    #[tokio::test]
    async fn test_register_device_claimed_by_other_user() {
        let mut bindings = MockBindingRepository::new();

        bindings
            .expect_get_binding()
            .times(1)
            .returning(|mac| Ok(Some(unassigned_binding(mac, "someone-else"))));

        let service = service(bindings, MockPatientRepository::new());

        let outcome = service
            .register_device(RegisterDeviceRequest {
                user_id: "user-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RegisterDeviceOutcome::ClaimedByOther { .. }
        ));
    }

    #[tokio::test]
    async fn test_register_device_lost_race_reports_winner() {
        let mut bindings = MockBindingRepository::new();

        let mut lookups = 0;
        bindings.expect_get_binding().times(2).returning(move |mac| {
            lookups += 1;
            if lookups == 1 {
                Ok(None)
            } else {
                Ok(Some(unassigned_binding(mac, "user-1")))
            }
        });
        bindings
            .expect_create_binding()
            .times(1)
            .return_once(|input| {
                Err(DomainError::DeviceAlreadyRegistered(input.mac_address))
            });

        let service = service(bindings, MockPatientRepository::new());

        let outcome = service
            .register_device(RegisterDeviceRequest {
                user_id: "user-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, RegisterDeviceOutcome::AlreadyOwned(_)));
    }

    #[tokio::test]
    async fn test_assign_device_success() {
        let mut bindings = MockBindingRepository::new();
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .withf(|pid| pid == "patient-1")
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "user-1"))));
        bindings
            .expect_get_binding()
            .times(1)
            .returning(|mac| Ok(Some(unassigned_binding(mac, "user-1"))));
        bindings
            .expect_claim_for_patient()
            .withf(|mac, pid| mac == "AA:BB:CC:01" && pid == "patient-1")
            .times(1)
            .return_once(|_, _| Ok(true));

        let service = service(bindings, patients);

        let result = service
            .assign_device(AssignDeviceRequest {
                user_id: "user-1".to_string(),
                patient_id: "patient-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_assign_device_hides_other_users_patients() {
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "someone-else"))));

        let service = service(MockBindingRepository::new(), patients);

        let result = service
            .assign_device(AssignDeviceRequest {
                user_id: "user-1".to_string(),
                patient_id: "patient-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::PatientNotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_device_unknown_device() {
        let mut bindings = MockBindingRepository::new();
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "user-1"))));
        bindings
            .expect_get_binding()
            .times(1)
            .return_once(|_| Ok(None));

        let service = service(bindings, patients);

        let result = service
            .assign_device(AssignDeviceRequest {
                user_id: "user-1".to_string(),
                patient_id: "patient-1".to_string(),
                mac_address: "AA:BB:CC:99".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_device_already_assigned_keeps_existing_patient() {
        let mut bindings = MockBindingRepository::new();
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-2", "user-1"))));
        bindings.expect_get_binding().times(1).returning(|mac| {
            let mut binding = unassigned_binding(mac, "user-1");
            binding.patient_id = Some("patient-1".to_string());
            Ok(Some(binding))
        });
        // claim_for_patient must not run; the mock panics if it does.

        let service = service(bindings, patients);

        let result = service
            .assign_device(AssignDeviceRequest {
                user_id: "user-1".to_string(),
                patient_id: "patient-2".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::DeviceAlreadyAssigned(_))));
    }

    #[tokio::test]
    async fn test_assign_device_lost_claim_race() {
        let mut bindings = MockBindingRepository::new();
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "user-1"))));
        bindings
            .expect_get_binding()
            .times(1)
            .returning(|mac| Ok(Some(unassigned_binding(mac, "user-1"))));
        bindings
            .expect_claim_for_patient()
            .times(1)
            .return_once(|_, _| Ok(false));

        let service = service(bindings, patients);

        let result = service
            .assign_device(AssignDeviceRequest {
                user_id: "user-1".to_string(),
                patient_id: "patient-1".to_string(),
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::DeviceAlreadyAssigned(_))));
    }

    #[tokio::test]
    async fn test_request_reset_flags_without_deleting() {
        let mut bindings = MockBindingRepository::new();

        bindings
            .expect_set_reset_requested()
            .withf(|mac, requested| mac == "AA:BB:CC:01" && *requested)
            .times(1)
            .return_once(|_, _| Ok(true));

        let service = service(bindings, MockPatientRepository::new());

        let result = service
            .request_reset(RequestResetRequest {
                mac_address: "AA:BB:CC:01".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_request_reset_unknown_device() {
        let mut bindings = MockBindingRepository::new();

        bindings
            .expect_set_reset_requested()
            .times(1)
            .return_once(|_, _| Ok(false));

        let service = service(bindings, MockPatientRepository::new());

        let result = service
            .request_reset(RequestResetRequest {
                mac_address: "AA:BB:CC:99".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_interval_rejects_non_positive() {
        let service = service(MockBindingRepository::new(), MockPatientRepository::new());

        let result = service
            .set_interval(SetIntervalRequest {
                mac_address: "AA:BB:CC:01".to_string(),
                interval_seconds: 0,
            })
            .await;
        assert!(matches!(result, Err(DomainError::InvalidInterval(_))));
    }

    #[tokio::test]
    async fn test_set_interval_success() {
        let mut bindings = MockBindingRepository::new();

        bindings
            .expect_set_interval()
            .withf(|mac, seconds| mac == "AA:BB:CC:01" && *seconds == 60)
            .times(1)
            .return_once(|_, _| Ok(true));

        let service = service(bindings, MockPatientRepository::new());

        let result = service
            .set_interval(SetIntervalRequest {
                mac_address: "AA:BB:CC:01".to_string(),
                interval_seconds: 60,
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_list_unassigned_devices() {
        let mut bindings = MockBindingRepository::new();

        bindings.expect_list_unassigned().times(1).return_once(|| {
            Ok(vec![
                unassigned_binding("AA:BB:CC:01", "user-1"),
                unassigned_binding("AA:BB:CC:02", "user-2"),
            ])
        });

        let service = service(bindings, MockPatientRepository::new());

        let devices = service.list_unassigned_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
    }

    #[tokio::test]
    async fn test_device_for_patient_denies_other_users() {
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "someone-else"))));

        let service = service(MockBindingRepository::new(), patients);

        let result = service.device_for_patient("user-1", "patient-1").await;
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_device_for_patient_returns_mac() {
        let mut bindings = MockBindingRepository::new();
        let mut patients = MockPatientRepository::new();

        patients
            .expect_get_patient()
            .times(1)
            .return_once(|_| Ok(Some(patient("patient-1", "user-1"))));
        bindings.expect_find_by_patient().times(1).returning(|pid| {
            let mut binding = unassigned_binding("AA:BB:CC:01", "user-1");
            binding.patient_id = Some(pid.to_string());
            Ok(Some(binding))
        });

        let service = service(bindings, patients);

        let mac = service.device_for_patient("user-1", "patient-1").await.unwrap();
        assert_eq!(mac.as_deref(), Some("AA:BB:CC:01"));
    }
}
