pub mod binding;
pub mod binding_service;
pub mod directive;
pub mod error;
pub mod in_memory;
pub mod ingestion_service;
pub mod patient;
pub mod patient_service;
pub mod reading;
pub mod repository;
pub mod reset_workflow;
pub mod throttle_gate;
pub mod validate;

pub use binding::*;
pub use binding_service::{
    AssignDeviceRequest, BindingService, RegisterDeviceRequest, RequestResetRequest,
    SetIntervalRequest,
};
pub use directive::*;
pub use error::{DomainError, DomainResult};
pub use in_memory::*;
pub use ingestion_service::{IngestOutcome, IngestionService, RecordReadingRequest};
pub use patient::*;
pub use patient_service::{CreatePatientRequest, PatientService};
pub use reading::*;
pub use repository::{BindingRepository, PatientRepository, ReadingRepository};
pub use reset_workflow::{ResetDispatcher, ResetWorkflow, SpawningResetDispatcher};
pub use throttle_gate::{InMemoryThrottleGate, ThrottleGate, MIN_ACCEPT_WINDOW};
