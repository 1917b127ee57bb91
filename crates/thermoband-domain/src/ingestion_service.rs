use std::sync::Arc;
use std::time::Instant;

use garde::Validate;
use tracing::{debug, error, info};

use crate::directive::Directive;
use crate::error::{DomainError, DomainResult};
use crate::reading::{NewReading, Reading};
use crate::repository::{BindingRepository, ReadingRepository};
use crate::reset_workflow::ResetDispatcher;
use crate::throttle_gate::ThrottleGate;
use crate::validate::validate_struct;

/// A reading as reported by a device, stamped with its arrival time.
#[derive(Debug, Clone, Validate)]
pub struct RecordReadingRequest {
    #[garde(length(min = 1))]
    pub mac_address: String,
    #[garde(custom(finite_number))]
    pub temperature: f64,
    #[garde(skip)]
    pub received_at: Instant,
}

fn finite_number(value: &f64, _context: &()) -> garde::Result {
    if value.is_finite() {
        Ok(())
    } else {
        Err(garde::Error::new("must be a finite number"))
    }
}

/// Result of an accepted-or-degraded ingestion attempt. Hard rejections
/// (validation, throttle, unknown device) surface as `DomainError` instead.
///
/// Both variants carry a directive: the device must always receive a usable
/// (interval, reset) pair so its reporting loop never stalls.
#[derive(Debug)]
pub enum IngestOutcome {
    Accepted {
        reading: Reading,
        directive: Directive,
    },
    /// The reading could not be persisted. The directive is the freshest
    /// pair obtainable, falling back to the documented defaults.
    StorageFailed {
        directive: Directive,
        reason: String,
    },
}

/// Telemetry ingestion pipeline.
///
/// Flow:
/// 1. Validate the report
/// 2. Consult the throttle gate (in-process, no I/O)
/// 3. Look up the binding, persist the reading against its patient
/// 4. Answer with the binding's current directive
/// 5. Hand an acknowledged reset to the dispatcher, off the request path
pub struct IngestionService {
    throttle_gate: Arc<dyn ThrottleGate>,
    binding_repository: Arc<dyn BindingRepository>,
    reading_repository: Arc<dyn ReadingRepository>,
    reset_dispatcher: Arc<dyn ResetDispatcher>,
}

impl IngestionService {
    pub fn new(
        throttle_gate: Arc<dyn ThrottleGate>,
        binding_repository: Arc<dyn BindingRepository>,
        reading_repository: Arc<dyn ReadingRepository>,
        reset_dispatcher: Arc<dyn ResetDispatcher>,
    ) -> Self {
        Self {
            throttle_gate,
            binding_repository,
            reading_repository,
            reset_dispatcher,
        }
    }

    pub async fn record_reading(
        &self,
        request: RecordReadingRequest,
    ) -> DomainResult<IngestOutcome> {
        validate_struct(&request)?;

        if !self
            .throttle_gate
            .should_accept(&request.mac_address, request.received_at)
        {
            return Err(DomainError::RateLimited(request.mac_address));
        }

        let binding = self
            .binding_repository
            .get_binding(&request.mac_address)
            .await?
            .ok_or_else(|| DomainError::DeviceNotRegistered(request.mac_address.clone()))?;

        let persisted = self
            .reading_repository
            .insert_reading(NewReading {
                patient_id: binding.patient_id.clone(),
                temperature: request.temperature,
            })
            .await;

        let reading = match persisted {
            Ok(reading) => reading,
            Err(e) => {
                error!(
                    mac_address = %request.mac_address,
                    error = %e,
                    "failed to persist reading, answering with best-effort directive"
                );
                let directive = self.best_effort_directive(&request.mac_address).await;
                return Ok(IngestOutcome::StorageFailed {
                    directive,
                    reason: e.to_string(),
                });
            }
        };

        // The directive comes from the row fetched above; a lifecycle
        // mutation landing mid-sequence is picked up on the next cycle.
        let directive = binding.directive();

        if directive.reset {
            info!(
                mac_address = %request.mac_address,
                "reset directive acknowledged to device, dispatching cleanup"
            );
            self.reset_dispatcher.dispatch(&request.mac_address);
        }

        debug!(
            mac_address = %request.mac_address,
            temperature = request.temperature,
            interval_seconds = directive.interval_seconds,
            reset = directive.reset,
            "reading accepted"
        );

        Ok(IngestOutcome::Accepted { reading, directive })
    }

    async fn best_effort_directive(&self, mac_address: &str) -> Directive {
        match self.binding_repository.get_binding(mac_address).await {
            Ok(Some(binding)) => binding.directive(),
            Ok(None) | Err(_) => Directive::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DeviceBinding;
    use crate::repository::{MockBindingRepository, MockReadingRepository};
    use crate::reset_workflow::MockResetDispatcher;
    use crate::throttle_gate::MockThrottleGate;
    use chrono::Utc;

    fn request(mac: &str, temperature: f64) -> RecordReadingRequest {
        RecordReadingRequest {
            mac_address: mac.to_string(),
            temperature,
            received_at: Instant::now(),
        }
    }

    fn binding(mac: &str, patient_id: Option<&str>, interval: i32, reset: bool) -> DeviceBinding {
        DeviceBinding {
            mac_address: mac.to_string(),
            user_id: "user-1".to_string(),
            patient_id: patient_id.map(str::to_string),
            interval_seconds: interval,
            reset_requested: reset,
            created_at: None,
            updated_at: None,
        }
    }

    fn persisted(patient_id: Option<&str>, temperature: f64) -> Reading {
        Reading {
            reading_id: 1,
            patient_id: patient_id.map(str::to_string),
            temperature,
            recorded_at: Utc::now(),
        }
    }

    fn open_gate() -> MockThrottleGate {
        let mut gate = MockThrottleGate::new();
        gate.expect_should_accept().returning(|_, _| true);
        gate
    }

    fn service(
        gate: MockThrottleGate,
        bindings: MockBindingRepository,
        readings: MockReadingRepository,
        dispatcher: MockResetDispatcher,
    ) -> IngestionService {
        IngestionService::new(
            Arc::new(gate),
            Arc::new(bindings),
            Arc::new(readings),
            Arc::new(dispatcher),
        )
    }

    #[tokio::test]
    async fn test_record_reading_success() {
        let mut bindings = MockBindingRepository::new();
        let mut readings = MockReadingRepository::new();
        let dispatcher = MockResetDispatcher::new();

        bindings
            .expect_get_binding()
            .withf(|mac| mac == "AA:BB:CC:01")
            .times(1)
            .return_once(|_| Ok(Some(binding("AA:BB:CC:01", Some("patient-1"), 300, false))));

        readings
            .expect_insert_reading()
            .withf(|input: &NewReading| {
                input.patient_id.as_deref() == Some("patient-1") && input.temperature == 37.2
            })
            .times(1)
            .return_once(|_| Ok(persisted(Some("patient-1"), 37.2)));

        let service = service(open_gate(), bindings, readings, dispatcher);

        let outcome = service
            .record_reading(request("AA:BB:CC:01", 37.2))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Accepted { reading, directive } => {
                assert_eq!(reading.temperature, 37.2);
                assert_eq!(directive.interval_seconds, 300);
                assert!(!directive.reset);
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_reading_missing_mac_is_validation_error() {
        // Gate and repositories would panic on any call.
        let service = service(
            MockThrottleGate::new(),
            MockBindingRepository::new(),
            MockReadingRepository::new(),
            MockResetDispatcher::new(),
        );

        let result = service.record_reading(request("", 37.2)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_record_reading_non_finite_temperature_is_validation_error() {
        let service = service(
            MockThrottleGate::new(),
            MockBindingRepository::new(),
            MockReadingRepository::new(),
            MockResetDispatcher::new(),
        );

        let result = service.record_reading(request("AA:BB:CC:01", f64::NAN)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_record_reading_throttled_never_touches_store() {
        let mut gate = MockThrottleGate::new();
        gate.expect_should_accept()
            .withf(|mac, _| mac == "AA:BB:CC:01")
            .times(1)
            .returning(|_, _| false);

        // Binding and reading repositories panic on any unexpected call.
        let service = service(
            gate,
            MockBindingRepository::new(),
            MockReadingRepository::new(),
            MockResetDispatcher::new(),
        );

        let result = service.record_reading(request("AA:BB:CC:01", 37.2)).await;
        assert!(matches!(result, Err(DomainError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_record_reading_unknown_device() {
        let mut bindings = MockBindingRepository::new();
        bindings
            .expect_get_binding()
            .times(1)
            .return_once(|_| Ok(None));

        let service = service(
            open_gate(),
            bindings,
            MockReadingRepository::new(),
            MockResetDispatcher::new(),
        );

        let result = service.record_reading(request("AA:BB:CC:99", 37.2)).await;
        assert!(matches!(result, Err(DomainError::DeviceNotRegistered(_))));
    }

    #[tokio::test]
    async fn test_record_reading_acknowledges_reset_and_dispatches() {
        let mut bindings = MockBindingRepository::new();
        let mut readings = MockReadingRepository::new();
        let mut dispatcher = MockResetDispatcher::new();

        bindings
            .expect_get_binding()
            .times(1)
            .return_once(|_| Ok(Some(binding("AA:BB:CC:01", Some("patient-1"), 120, true))));

        readings
            .expect_insert_reading()
            .times(1)
            .return_once(|_| Ok(persisted(Some("patient-1"), 36.9)));

        dispatcher
            .expect_dispatch()
            .withf(|mac| mac == "AA:BB:CC:01")
            .times(1)
            .return_const(());

        let service = service(open_gate(), bindings, readings, dispatcher);

        let outcome = service
            .record_reading(request("AA:BB:CC:01", 36.9))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Accepted { directive, .. } => {
                assert!(directive.reset);
                assert_eq!(directive.interval_seconds, 120);
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_storage_failure_answers_with_reread_directive() {
        let mut bindings = MockBindingRepository::new();
        let mut readings = MockReadingRepository::new();

        // First call is the pipeline lookup, second is the best-effort
        // re-read after the insert fails.
        bindings
            .expect_get_binding()
            .times(2)
            .returning(|_| Ok(Some(binding("AA:BB:CC:01", Some("patient-1"), 60, false))));

        readings
            .expect_insert_reading()
            .times(1)
            .return_once(|_| {
                Err(DomainError::RepositoryError(anyhow::anyhow!(
                    "connection refused"
                )))
            });

        let service = service(
            open_gate(),
            bindings,
            readings,
            MockResetDispatcher::new(),
        );

        let outcome = service
            .record_reading(request("AA:BB:CC:01", 37.2))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::StorageFailed { directive, reason } => {
                assert_eq!(directive.interval_seconds, 60);
                assert!(!directive.reset);
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected StorageFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_storage_failure_falls_back_to_default_directive() {
        let mut bindings = MockBindingRepository::new();
        let mut readings = MockReadingRepository::new();

        let mut lookups = 0;
        bindings.expect_get_binding().times(2).returning(move |_| {
            lookups += 1;
            if lookups == 1 {
                Ok(Some(binding("AA:BB:CC:01", Some("patient-1"), 60, false)))
            } else {
                Err(DomainError::RepositoryError(anyhow::anyhow!(
                    "still unreachable"
                )))
            }
        });

        readings
            .expect_insert_reading()
            .times(1)
            .return_once(|_| {
                Err(DomainError::RepositoryError(anyhow::anyhow!(
                    "connection refused"
                )))
            });

        let service = service(
            open_gate(),
            bindings,
            readings,
            MockResetDispatcher::new(),
        );

        let outcome = service
            .record_reading(request("AA:BB:CC:01", 37.2))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::StorageFailed { directive, .. } => {
                assert_eq!(directive, Directive::default());
            }
            other => panic!("expected StorageFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unassigned_device_reading_has_no_patient() {
        let mut bindings = MockBindingRepository::new();
        let mut readings = MockReadingRepository::new();

        bindings
            .expect_get_binding()
            .times(1)
            .return_once(|_| Ok(Some(binding("AA:BB:CC:01", None, 300, false))));

        readings
            .expect_insert_reading()
            .withf(|input: &NewReading| input.patient_id.is_none())
            .times(1)
            .return_once(|_| Ok(persisted(None, 36.4)));

        let service = service(
            open_gate(),
            bindings,
            readings,
            MockResetDispatcher::new(),
        );

        let outcome = service
            .record_reading(request("AA:BB:CC:01", 36.4))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Accepted { .. }));
    }
}
