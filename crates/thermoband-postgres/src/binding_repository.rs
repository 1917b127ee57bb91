use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use thermoband_domain::{
    BindingRepository, CreateBindingInput, DeviceBinding, DomainError, DomainResult,
    DEFAULT_INTERVAL_SECONDS,
};

use crate::client::PostgresClient;
use crate::models::BindingRow;

/// PostgreSQL implementation of BindingRepository trait
#[derive(Clone)]
pub struct PostgresBindingRepository {
    client: PostgresClient,
}

impl PostgresBindingRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_binding(row: &tokio_postgres::Row) -> DeviceBinding {
    let binding_row = BindingRow {
        mac_address: row.get(0),
        user_id: row.get(1),
        patient_id: row.get(2),
        interval_seconds: row.get(3),
        reset_requested: row.get(4),
        created_at: row.get(5),
        updated_at: row.get(6),
    };
    binding_row.into()
}

#[async_trait]
impl BindingRepository for PostgresBindingRepository {
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<DeviceBinding> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO device_bindings (mac_address, user_id, patient_id, interval_seconds, reset_requested, created_at, updated_at)
                 VALUES ($1, $2, NULL, $3, FALSE, $4, $5)",
                &[
                    &input.mac_address,
                    &input.user_id,
                    &DEFAULT_INTERVAL_SECONDS,
                    &now,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if let Some(db_err) = e.as_db_error() {
                // PostgreSQL error code 23505 is unique_violation
                if db_err.code().code() == "23505" {
                    return Err(DomainError::DeviceAlreadyRegistered(input.mac_address));
                }
            }
            return Err(DomainError::RepositoryError(e.into()));
        }

        debug!("registered device binding: {}", input.mac_address);

        Ok(DeviceBinding {
            mac_address: input.mac_address,
            user_id: input.user_id,
            patient_id: None,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            reset_requested: false,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn get_binding(&self, mac_address: &str) -> DomainResult<Option<DeviceBinding>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT mac_address, user_id, patient_id, interval_seconds, reset_requested, created_at, updated_at
                 FROM device_bindings
                 WHERE mac_address = $1",
                &[&mac_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(row_to_binding))
    }

    async fn claim_for_patient(&self, mac_address: &str, patient_id: &str) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Conditional on the row still being unassigned; concurrent claims
        // cannot both match.
        let updated = conn
            .execute(
                "UPDATE device_bindings
                 SET patient_id = $1, updated_at = $2
                 WHERE mac_address = $3 AND patient_id IS NULL",
                &[&patient_id, &Utc::now(), &mac_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(updated == 1)
    }

    async fn set_interval(&self, mac_address: &str, interval_seconds: i32) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE device_bindings
                 SET interval_seconds = $1, updated_at = $2
                 WHERE mac_address = $3",
                &[&interval_seconds, &Utc::now(), &mac_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(updated == 1)
    }

    async fn set_reset_requested(&self, mac_address: &str, requested: bool) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE device_bindings
                 SET reset_requested = $1, updated_at = $2
                 WHERE mac_address = $3",
                &[&requested, &Utc::now(), &mac_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(updated == 1)
    }

    async fn clear_assignment(&self, mac_address: &str) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE device_bindings
                 SET patient_id = NULL, reset_requested = FALSE, updated_at = $1
                 WHERE mac_address = $2",
                &[&Utc::now(), &mac_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(updated == 1)
    }

    async fn detach_patient(&self, patient_id: &str) -> DomainResult<u64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let detached = conn
            .execute(
                "UPDATE device_bindings
                 SET patient_id = NULL, updated_at = $1
                 WHERE patient_id = $2",
                &[&Utc::now(), &patient_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(detached)
    }

    async fn list_unassigned(&self) -> DomainResult<Vec<DeviceBinding>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT mac_address, user_id, patient_id, interval_seconds, reset_requested, created_at, updated_at
                 FROM device_bindings
                 WHERE patient_id IS NULL
                 ORDER BY created_at DESC",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} unassigned devices", rows.len());

        Ok(rows.iter().map(row_to_binding).collect())
    }

    async fn find_by_patient(&self, patient_id: &str) -> DomainResult<Option<DeviceBinding>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT mac_address, user_id, patient_id, interval_seconds, reset_requested, created_at, updated_at
                 FROM device_bindings
                 WHERE patient_id = $1",
                &[&patient_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(row_to_binding))
    }
}
