use std::sync::Arc;

use garde::Validate;
use tracing::{debug, info, instrument};

use crate::error::{DomainError, DomainResult};
use crate::patient::{CreatePatientInput, Patient};
use crate::reading::Reading;
use crate::repository::{BindingRepository, PatientRepository, ReadingRepository};
use crate::validate::validate_struct;

/// Service request for creating a patient
#[derive(Debug, Clone, Validate)]
pub struct CreatePatientRequest {
    #[garde(skip)] // user_id resolved by the auth layer
    pub user_id: String,
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(range(min = 0, max = 150))]
    pub age: i32,
}

/// Patient management service. Patients are created independently of device
/// binding; deletion cascades to the patient's readings and detaches any
/// bound device.
pub struct PatientService {
    patient_repository: Arc<dyn PatientRepository>,
    binding_repository: Arc<dyn BindingRepository>,
    reading_repository: Arc<dyn ReadingRepository>,
}

impl PatientService {
    pub fn new(
        patient_repository: Arc<dyn PatientRepository>,
        binding_repository: Arc<dyn BindingRepository>,
        reading_repository: Arc<dyn ReadingRepository>,
    ) -> Self {
        Self {
            patient_repository,
            binding_repository,
            reading_repository,
        }
    }

    /// Create a patient under the calling user with a generated identifier.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, name = %request.name))]
    pub async fn create_patient(&self, request: CreatePatientRequest) -> DomainResult<Patient> {
        validate_struct(&request)?;

        let patient_id = xid::new().to_string();
        debug!(patient_id = %patient_id, "creating patient");

        let patient = self
            .patient_repository
            .create_patient(CreatePatientInput {
                patient_id,
                user_id: request.user_id,
                name: request.name,
                age: request.age,
            })
            .await?;

        Ok(patient)
    }

    /// Get one of the caller's patients. Other users' patients are reported
    /// as missing.
    pub async fn get_patient(&self, user_id: &str, patient_id: &str) -> DomainResult<Patient> {
        let patient = self.patient_repository.get_patient(patient_id).await?;
        match patient {
            Some(p) if p.user_id == user_id => Ok(p),
            _ => Err(DomainError::PatientNotFound(patient_id.to_string())),
        }
    }

    /// List all patients owned by the caller.
    pub async fn list_patients(&self, user_id: &str) -> DomainResult<Vec<Patient>> {
        let patients = self.patient_repository.list_patients(user_id).await?;
        debug!(user_id = %user_id, count = patients.len(), "listed patients");
        Ok(patients)
    }

    /// List a patient's readings, ownership-checked.
    pub async fn patient_readings(
        &self,
        user_id: &str,
        patient_id: &str,
    ) -> DomainResult<Vec<Reading>> {
        self.get_patient(user_id, patient_id).await?;
        self.reading_repository
            .list_readings_for_patient(patient_id)
            .await
    }

    /// Delete a patient and everything hanging off it: readings first (the
    /// store enforces the reference), then the device link, then the row.
    #[instrument(skip(self), fields(user_id = %user_id, patient_id = %patient_id))]
    pub async fn delete_patient(&self, user_id: &str, patient_id: &str) -> DomainResult<()> {
        self.get_patient(user_id, patient_id).await?;

        let purged = self
            .reading_repository
            .delete_readings_for_patient(patient_id)
            .await?;
        let detached = self.binding_repository.detach_patient(patient_id).await?;
        self.patient_repository.delete_patient(patient_id).await?;

        info!(
            patient_id = %patient_id,
            purged_readings = purged,
            detached_devices = detached,
            "patient deleted"
        );
        Ok(())
    }
}
