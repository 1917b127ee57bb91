use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use thermoband_domain::{
    CreatePatientInput, DomainError, DomainResult, Patient, PatientRepository,
};

use crate::client::PostgresClient;
use crate::models::PatientRow;

/// PostgreSQL implementation of PatientRepository trait
#[derive(Clone)]
pub struct PostgresPatientRepository {
    client: PostgresClient,
}

impl PostgresPatientRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_patient(row: &tokio_postgres::Row) -> Patient {
    let patient_row = PatientRow {
        patient_id: row.get(0),
        user_id: row.get(1),
        patient_name: row.get(2),
        age: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    };
    patient_row.into()
}

#[async_trait]
impl PatientRepository for PostgresPatientRepository {
    async fn create_patient(&self, input: CreatePatientInput) -> DomainResult<Patient> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        conn.execute(
            "INSERT INTO patients (patient_id, user_id, patient_name, age, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &input.patient_id,
                &input.user_id,
                &input.name,
                &input.age,
                &now,
                &now,
            ],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("created patient: {}", input.patient_id);

        Ok(Patient {
            patient_id: input.patient_id,
            user_id: input.user_id,
            name: input.name,
            age: input.age,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn get_patient(&self, patient_id: &str) -> DomainResult<Option<Patient>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT patient_id, user_id, patient_name, age, created_at, updated_at
                 FROM patients
                 WHERE patient_id = $1",
                &[&patient_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(row_to_patient))
    }

    async fn list_patients(&self, user_id: &str) -> DomainResult<Vec<Patient>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT patient_id, user_id, patient_name, age, created_at, updated_at
                 FROM patients
                 WHERE user_id = $1
                 ORDER BY created_at DESC",
                &[&user_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} patients for user: {}", rows.len(), user_id);

        Ok(rows.iter().map(row_to_patient).collect())
    }

    async fn delete_patient(&self, patient_id: &str) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute("DELETE FROM patients WHERE patient_id = $1", &[&patient_id])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(deleted == 1)
    }
}
