use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::DomainResult;
use crate::repository::{BindingRepository, PatientRepository, ReadingRepository};

/// Detached cleanup that runs once a reset directive has been acknowledged
/// to a device: purge the linked patient's history, delete the patient, and
/// return the binding to the unassigned pool.
///
/// Idempotent: a binding with no linked patient only has its reset flag
/// cleared, and a missing binding is a no-op.
pub struct ResetWorkflow {
    binding_repository: Arc<dyn BindingRepository>,
    patient_repository: Arc<dyn PatientRepository>,
    reading_repository: Arc<dyn ReadingRepository>,
}

impl ResetWorkflow {
    pub fn new(
        binding_repository: Arc<dyn BindingRepository>,
        patient_repository: Arc<dyn PatientRepository>,
        reading_repository: Arc<dyn ReadingRepository>,
    ) -> Self {
        Self {
            binding_repository,
            patient_repository,
            reading_repository,
        }
    }

    pub async fn perform_reset(&self, mac_address: &str) -> DomainResult<()> {
        let binding = match self.binding_repository.get_binding(mac_address).await? {
            Some(binding) => binding,
            None => {
                warn!(mac_address = %mac_address, "reset requested for unknown binding, nothing to do");
                return Ok(());
            }
        };

        if let Some(patient_id) = binding.patient_id {
            // Readings reference the patient row, so they go first; the
            // binding link must also be gone before the patient row can be
            // removed.
            let purged = self
                .reading_repository
                .delete_readings_for_patient(&patient_id)
                .await?;
            self.binding_repository.clear_assignment(mac_address).await?;
            self.patient_repository.delete_patient(&patient_id).await?;

            info!(
                mac_address = %mac_address,
                patient_id = %patient_id,
                purged_readings = purged,
                "device reset complete, binding returned to unassigned pool"
            );
        } else {
            // Nothing linked; just make sure the flag is cleared.
            self.binding_repository.clear_assignment(mac_address).await?;
            info!(mac_address = %mac_address, "device reset complete, no patient was linked");
        }

        Ok(())
    }
}

/// Hand-off point between the ingestion pipeline and the reset workflow.
/// The pipeline never waits on the work it dispatches here.
#[cfg_attr(test, mockall::automock)]
pub trait ResetDispatcher: Send + Sync {
    fn dispatch(&self, mac_address: &str);
}

/// Production dispatcher: runs the workflow on a detached task. Failures
/// are logged and never retried; a later manual reset can still clean up
/// because the workflow is idempotent.
pub struct SpawningResetDispatcher {
    workflow: Arc<ResetWorkflow>,
}

impl SpawningResetDispatcher {
    pub fn new(workflow: Arc<ResetWorkflow>) -> Self {
        Self { workflow }
    }
}

impl ResetDispatcher for SpawningResetDispatcher {
    fn dispatch(&self, mac_address: &str) {
        let workflow = Arc::clone(&self.workflow);
        let mac_address = mac_address.to_string();

        tokio::spawn(async move {
            if let Err(e) = workflow.perform_reset(&mac_address).await {
                error!(
                    mac_address = %mac_address,
                    error = %e,
                    "background device reset failed"
                );
            }
        });
    }
}
