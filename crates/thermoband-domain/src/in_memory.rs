//! In-memory repository implementations.
//!
//! Back the domain and transport tests, and the demo wiring, without a
//! database. Not durable; every operation is atomic under its lock, matching
//! the single-statement atomicity the real store guarantees.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::binding::{CreateBindingInput, DeviceBinding};
use crate::directive::DEFAULT_INTERVAL_SECONDS;
use crate::error::{DomainError, DomainResult};
use crate::patient::{CreatePatientInput, Patient};
use crate::reading::{NewReading, Reading};
use crate::repository::{BindingRepository, PatientRepository, ReadingRepository};

#[derive(Default)]
pub struct InMemoryBindingRepository {
    bindings: RwLock<HashMap<String, DeviceBinding>>,
}

impl InMemoryBindingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BindingRepository for InMemoryBindingRepository {
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<DeviceBinding> {
        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&input.mac_address) {
            return Err(DomainError::DeviceAlreadyRegistered(input.mac_address));
        }

        let now = Utc::now();
        let binding = DeviceBinding {
            mac_address: input.mac_address.clone(),
            user_id: input.user_id,
            patient_id: None,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            reset_requested: false,
            created_at: Some(now),
            updated_at: Some(now),
        };
        bindings.insert(input.mac_address, binding.clone());
        Ok(binding)
    }

    async fn get_binding(&self, mac_address: &str) -> DomainResult<Option<DeviceBinding>> {
        Ok(self.bindings.read().await.get(mac_address).cloned())
    }

    async fn claim_for_patient(&self, mac_address: &str, patient_id: &str) -> DomainResult<bool> {
        let mut bindings = self.bindings.write().await;
        match bindings.get_mut(mac_address) {
            Some(binding) if binding.patient_id.is_none() => {
                binding.patient_id = Some(patient_id.to_string());
                binding.updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_interval(&self, mac_address: &str, interval_seconds: i32) -> DomainResult<bool> {
        let mut bindings = self.bindings.write().await;
        match bindings.get_mut(mac_address) {
            Some(binding) => {
                binding.interval_seconds = interval_seconds;
                binding.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_reset_requested(&self, mac_address: &str, requested: bool) -> DomainResult<bool> {
        let mut bindings = self.bindings.write().await;
        match bindings.get_mut(mac_address) {
            Some(binding) => {
                binding.reset_requested = requested;
                binding.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_assignment(&self, mac_address: &str) -> DomainResult<bool> {
        let mut bindings = self.bindings.write().await;
        match bindings.get_mut(mac_address) {
            Some(binding) => {
                binding.patient_id = None;
                binding.reset_requested = false;
                binding.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn detach_patient(&self, patient_id: &str) -> DomainResult<u64> {
        let mut bindings = self.bindings.write().await;
        let mut detached = 0;
        for binding in bindings.values_mut() {
            if binding.patient_id.as_deref() == Some(patient_id) {
                binding.patient_id = None;
                binding.updated_at = Some(Utc::now());
                detached += 1;
            }
        }
        Ok(detached)
    }

    async fn list_unassigned(&self) -> DomainResult<Vec<DeviceBinding>> {
        Ok(self
            .bindings
            .read()
            .await
            .values()
            .filter(|binding| binding.patient_id.is_none())
            .cloned()
            .collect())
    }

    async fn find_by_patient(&self, patient_id: &str) -> DomainResult<Option<DeviceBinding>> {
        Ok(self
            .bindings
            .read()
            .await
            .values()
            .find(|binding| binding.patient_id.as_deref() == Some(patient_id))
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPatientRepository {
    patients: RwLock<HashMap<String, Patient>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn create_patient(&self, input: CreatePatientInput) -> DomainResult<Patient> {
        let now = Utc::now();
        let patient = Patient {
            patient_id: input.patient_id.clone(),
            user_id: input.user_id,
            name: input.name,
            age: input.age,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.patients
            .write()
            .await
            .insert(input.patient_id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, patient_id: &str) -> DomainResult<Option<Patient>> {
        Ok(self.patients.read().await.get(patient_id).cloned())
    }

    async fn list_patients(&self, user_id: &str) -> DomainResult<Vec<Patient>> {
        Ok(self
            .patients
            .read()
            .await
            .values()
            .filter(|patient| patient.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_patient(&self, patient_id: &str) -> DomainResult<bool> {
        Ok(self.patients.write().await.remove(patient_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryReadingRepository {
    readings: RwLock<Vec<Reading>>,
    next_id: AtomicI64,
}

impl InMemoryReadingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total readings currently held, regardless of attribution.
    pub async fn count(&self) -> usize {
        self.readings.read().await.len()
    }
}

#[async_trait]
impl ReadingRepository for InMemoryReadingRepository {
    async fn insert_reading(&self, input: NewReading) -> DomainResult<Reading> {
        let reading = Reading {
            reading_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            patient_id: input.patient_id,
            temperature: input.temperature,
            recorded_at: Utc::now(),
        };
        self.readings.write().await.push(reading.clone());
        Ok(reading)
    }

    async fn list_readings_for_patient(&self, patient_id: &str) -> DomainResult<Vec<Reading>> {
        let mut readings: Vec<Reading> = self
            .readings
            .read()
            .await
            .iter()
            .filter(|reading| reading.patient_id.as_deref() == Some(patient_id))
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(readings)
    }

    async fn delete_readings_for_patient(&self, patient_id: &str) -> DomainResult<u64> {
        let mut readings = self.readings.write().await;
        let before = readings.len();
        readings.retain(|reading| reading.patient_id.as_deref() != Some(patient_id));
        Ok((before - readings.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_binding_rejects_duplicate_mac() {
        let repo = InMemoryBindingRepository::new();

        repo.create_binding(CreateBindingInput {
            mac_address: "AA:BB:CC:01".to_string(),
            user_id: "user-1".to_string(),
        })
        .await
        .unwrap();

        let duplicate = repo
            .create_binding(CreateBindingInput {
                mac_address: "AA:BB:CC:01".to_string(),
                user_id: "user-2".to_string(),
            })
            .await;
        assert!(matches!(
            duplicate,
            Err(DomainError::DeviceAlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_for_patient_only_when_unassigned() {
        let repo = InMemoryBindingRepository::new();

        repo.create_binding(CreateBindingInput {
            mac_address: "AA:BB:CC:01".to_string(),
            user_id: "user-1".to_string(),
        })
        .await
        .unwrap();

        assert!(repo.claim_for_patient("AA:BB:CC:01", "patient-1").await.unwrap());
        assert!(!repo.claim_for_patient("AA:BB:CC:01", "patient-2").await.unwrap());

        let binding = repo.get_binding("AA:BB:CC:01").await.unwrap().unwrap();
        assert_eq!(binding.patient_id.as_deref(), Some("patient-1"));
    }

    #[tokio::test]
    async fn test_clear_assignment_resets_flag_and_patient() {
        let repo = InMemoryBindingRepository::new();

        repo.create_binding(CreateBindingInput {
            mac_address: "AA:BB:CC:01".to_string(),
            user_id: "user-1".to_string(),
        })
        .await
        .unwrap();
        repo.claim_for_patient("AA:BB:CC:01", "patient-1").await.unwrap();
        repo.set_reset_requested("AA:BB:CC:01", true).await.unwrap();

        assert!(repo.clear_assignment("AA:BB:CC:01").await.unwrap());

        let binding = repo.get_binding("AA:BB:CC:01").await.unwrap().unwrap();
        assert!(binding.patient_id.is_none());
        assert!(!binding.reset_requested);
    }

    #[tokio::test]
    async fn test_delete_readings_for_patient_spares_others() {
        let repo = InMemoryReadingRepository::new();

        repo.insert_reading(NewReading {
            patient_id: Some("patient-1".to_string()),
            temperature: 37.0,
        })
        .await
        .unwrap();
        repo.insert_reading(NewReading {
            patient_id: Some("patient-2".to_string()),
            temperature: 36.5,
        })
        .await
        .unwrap();

        assert_eq!(repo.delete_readings_for_patient("patient-1").await.unwrap(), 1);
        assert_eq!(repo.count().await, 1);
    }
}
