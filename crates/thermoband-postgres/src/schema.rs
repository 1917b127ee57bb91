use anyhow::Result;
use tracing::info;

use crate::client::PostgresClient;

/// Idempotent bootstrap DDL. `readings.patient_id` and
/// `device_bindings.patient_id` reference `patients`, so reading deletion
/// must precede patient deletion everywhere.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    patient_id   TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    patient_name TEXT NOT NULL,
    age          INT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS patients_user_idx ON patients (user_id);

CREATE TABLE IF NOT EXISTS device_bindings (
    mac_address      TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    patient_id       TEXT REFERENCES patients (patient_id),
    interval_seconds INT NOT NULL DEFAULT 300,
    reset_requested  BOOLEAN NOT NULL DEFAULT FALSE,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS device_bindings_patient_idx ON device_bindings (patient_id);

CREATE TABLE IF NOT EXISTS readings (
    reading_id  BIGSERIAL PRIMARY KEY,
    patient_id  TEXT REFERENCES patients (patient_id),
    temperature DOUBLE PRECISION NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS readings_patient_idx ON readings (patient_id);
"#;

/// Apply the bootstrap schema. Safe to run on every startup.
pub async fn apply_schema(client: &PostgresClient) -> Result<()> {
    let conn = client.get_connection().await?;
    conn.batch_execute(SCHEMA).await?;
    info!("database schema up to date");
    Ok(())
}
