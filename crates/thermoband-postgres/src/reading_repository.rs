use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use thermoband_domain::{DomainError, DomainResult, NewReading, Reading, ReadingRepository};

use crate::client::PostgresClient;
use crate::models::ReadingRow;

/// PostgreSQL implementation of the append-only reading log
#[derive(Clone)]
pub struct PostgresReadingRepository {
    client: PostgresClient,
}

impl PostgresReadingRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_reading(row: &tokio_postgres::Row) -> Reading {
    let reading_row = ReadingRow {
        reading_id: row.get(0),
        patient_id: row.get(1),
        temperature: row.get(2),
        recorded_at: row.get(3),
    };
    reading_row.into()
}

#[async_trait]
impl ReadingRepository for PostgresReadingRepository {
    async fn insert_reading(&self, input: NewReading) -> DomainResult<Reading> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let row = conn
            .query_one(
                "INSERT INTO readings (patient_id, temperature, recorded_at)
                 VALUES ($1, $2, $3)
                 RETURNING reading_id",
                &[&input.patient_id, &input.temperature, &now],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(Reading {
            reading_id: row.get(0),
            patient_id: input.patient_id,
            temperature: input.temperature,
            recorded_at: now,
        })
    }

    async fn list_readings_for_patient(&self, patient_id: &str) -> DomainResult<Vec<Reading>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT reading_id, patient_id, temperature, recorded_at
                 FROM readings
                 WHERE patient_id = $1
                 ORDER BY recorded_at DESC",
                &[&patient_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows.iter().map(row_to_reading).collect())
    }

    async fn delete_readings_for_patient(&self, patient_id: &str) -> DomainResult<u64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute(
                "DELETE FROM readings WHERE patient_id = $1",
                &[&patient_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("purged {} readings for patient: {}", deleted, patient_id);

        Ok(deleted)
    }
}
