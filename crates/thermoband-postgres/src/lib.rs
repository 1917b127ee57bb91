mod binding_repository;
mod client;
mod config;
mod models;
mod patient_repository;
mod reading_repository;
mod schema;

pub use binding_repository::PostgresBindingRepository;
pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use models::{BindingRow, PatientRow, ReadingRow};
pub use patient_repository::PostgresPatientRepository;
pub use reading_repository::PostgresReadingRepository;
pub use schema::apply_schema;
