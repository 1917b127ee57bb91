use async_trait::async_trait;

use crate::binding::{CreateBindingInput, DeviceBinding};
use crate::error::DomainResult;
use crate::patient::{CreatePatientInput, Patient};
use crate::reading::{NewReading, Reading};

/// Repository trait for binding storage operations.
/// Infrastructure layer (e.g., thermoband-postgres) implements this trait.
/// Each operation maps to a single atomic statement against the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BindingRepository: Send + Sync {
    /// Create a binding in the unassigned pool. Fails with
    /// `DeviceAlreadyRegistered` when a row for the mac already exists.
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<DeviceBinding>;

    /// Get a binding by hardware address.
    async fn get_binding(&self, mac_address: &str) -> DomainResult<Option<DeviceBinding>>;

    /// Atomically assign a patient to a currently-unassigned binding.
    /// Returns false when no row matched (missing or already assigned).
    async fn claim_for_patient(&self, mac_address: &str, patient_id: &str) -> DomainResult<bool>;

    /// Update the advisory sampling interval. Returns false when no row
    /// matched the mac.
    async fn set_interval(&self, mac_address: &str, interval_seconds: i32) -> DomainResult<bool>;

    /// Flag or unflag a pending reset. Returns false when no row matched.
    async fn set_reset_requested(&self, mac_address: &str, requested: bool) -> DomainResult<bool>;

    /// Return the binding to the unassigned pool: null the patient link and
    /// clear the reset flag. Returns false when no row matched.
    async fn clear_assignment(&self, mac_address: &str) -> DomainResult<bool>;

    /// Null out the patient link on any binding referencing the patient.
    /// Returns the number of bindings detached.
    async fn detach_patient(&self, patient_id: &str) -> DomainResult<u64>;

    /// List all bindings with no patient assigned.
    async fn list_unassigned(&self) -> DomainResult<Vec<DeviceBinding>>;

    /// Find the binding currently assigned to a patient, if any.
    async fn find_by_patient(&self, patient_id: &str) -> DomainResult<Option<DeviceBinding>>;
}

/// Repository trait for patient storage operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Create a new patient.
    async fn create_patient(&self, input: CreatePatientInput) -> DomainResult<Patient>;

    /// Get a patient by ID.
    async fn get_patient(&self, patient_id: &str) -> DomainResult<Option<Patient>>;

    /// List all patients owned by a user.
    async fn list_patients(&self, user_id: &str) -> DomainResult<Vec<Patient>>;

    /// Delete a patient row. Returns false when no row matched.
    async fn delete_patient(&self, patient_id: &str) -> DomainResult<bool>;
}

/// Repository trait for the append-only reading log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Append a reading, stamping the record time.
    async fn insert_reading(&self, input: NewReading) -> DomainResult<Reading>;

    /// List a patient's readings, most recent first.
    async fn list_readings_for_patient(&self, patient_id: &str) -> DomainResult<Vec<Reading>>;

    /// Purge all readings attributed to a patient. Returns the number of
    /// rows removed.
    async fn delete_readings_for_patient(&self, patient_id: &str) -> DomainResult<u64>;
}
