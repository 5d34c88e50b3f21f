//! # End-to-End Send Flows
//!
//! Each test drives a full run: the simulated device publishes onto the
//! device bus, the pipeline consumes the stream, and the simulated network
//! answers the broadcast.
//!
//! | Flow | Device | Network | Expected |
//! |------|--------|---------|----------|
//! | Absent device | none | - | `DisconnectedDevice`, no stream |
//! | Approve | 0, 0.5, 1, signed | 500 ms | 0.5, signed, broadcasted at 3 s |
//! | Refuse | `0x6985` | - | `UserRefusedOnDevice`, no broadcast |
//! | Suppressed | signed | - | terminal signed, no broadcast |
//! | Cancel | streaming | - | silence, subscription released once |

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        signed_operation, three_step_approval, Harness, Observed, RecordingObserver, DEVICE_PATH,
    };
    use device_bus::DevicePayload;
    use shared_types::{BroadcastFailure, DeviceFailure, SigningEvent};
    use signing_pipeline::{
        FlowEvent, FlowStep, PipelineConfig, RunOutcome, SigningError, SigningPipeline,
    };
    use signing_runtime::adapters::{DeviceScript, NetworkBehavior};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    const STEP: Duration = Duration::from_millis(10);

    fn pipeline() -> SigningPipeline {
        SigningPipeline::new(PipelineConfig::default())
    }

    // =========================================================================
    // DEVICE ABSENT
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_absent_device_fails_without_opening_stream() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(500));
        let observer = RecordingObserver::new();

        let mut handle = harness
            .args()
            .without_device()
            .observer(observer.clone())
            .start(&pipeline());

        assert_eq!(
            handle.next_event().await,
            Some(FlowEvent::Failed(SigningError::DisconnectedDevice))
        );
        assert_eq!(handle.next_event().await, None);
        assert_eq!(harness.bus.subscriber_count(), 0);
        assert_eq!(harness.bus.released_count(), 0);
        assert_eq!(harness.bridge.broadcasts(), 0);
        assert_eq!(
            observer.observed(),
            vec![Observed::Outcome(FlowEvent::Failed(
                SigningError::DisconnectedDevice
            ))]
        );
    }

    // =========================================================================
    // APPROVE + BROADCAST
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_approved_run_filters_boundaries_and_holds_broadcast() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(500));
        let observer = RecordingObserver::new();

        let handle = harness.args().observer(observer.clone()).start(&pipeline());
        let outcome = handle.outcome().await;

        assert_eq!(observer.progress_values(), vec![0.5]);

        let observed = observer.observed();
        assert_eq!(observed.len(), 3);
        assert!(matches!(
            &observed[1],
            Observed::Outcome(FlowEvent::Signed {
                broadcast_pending: true,
                ..
            })
        ));
        assert!(matches!(
            &observed[2],
            Observed::Outcome(FlowEvent::Broadcasted { .. })
        ));

        let signed_at = observer
            .first_at(|seen| matches!(seen, Observed::Outcome(FlowEvent::Signed { .. })))
            .unwrap();
        let broadcasted_at = observer
            .first_at(|seen| matches!(seen, Observed::Outcome(FlowEvent::Broadcasted { .. })))
            .unwrap();
        let held = broadcasted_at - signed_at;
        assert!(held >= Duration::from_millis(3000), "held {held:?}");
        assert!(held < Duration::from_millis(3050), "held {held:?}");

        match outcome {
            RunOutcome::Broadcasted {
                signed_operation: signed,
                operation,
            } => {
                assert_eq!(signed, signed_operation());
                assert_eq!(operation.id, signed.operation.id);
                assert!(operation.hash.starts_with("0x"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(harness.bridge.broadcasts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_network_is_not_padded() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(4500));
        let observer = RecordingObserver::new();

        let handle = harness.args().observer(observer.clone()).start(&pipeline());
        let outcome = handle.outcome().await;

        let signed_at = observer
            .first_at(|seen| matches!(seen, Observed::Outcome(FlowEvent::Signed { .. })))
            .unwrap();
        let broadcasted_at = observer
            .first_at(|seen| matches!(seen, Observed::Outcome(FlowEvent::Broadcasted { .. })))
            .unwrap();
        let held = broadcasted_at - signed_at;
        assert!(held >= Duration::from_millis(4500));
        assert!(held < Duration::from_millis(4550));
        assert_eq!(outcome.next_step(), Some(FlowStep::Confirmation));
    }

    // =========================================================================
    // DEVICE REFUSAL
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_refusal_routes_to_refused_step() {
        let harness = Harness::accepting(DeviceScript::refuse(STEP), Duration::from_millis(500));
        let observer = RecordingObserver::new();

        let handle = harness.args().observer(observer.clone()).start(&pipeline());
        let controller = handle.controller();
        let outcome = handle.outcome().await;

        assert_eq!(outcome, RunOutcome::Failed(SigningError::UserRefusedOnDevice));
        assert_eq!(outcome.next_step(), Some(FlowStep::Refused));
        assert_eq!(harness.bridge.broadcasts(), 0);
        assert!(controller.is_terminated());
        assert!(observer
            .observed()
            .contains(&Observed::Progress(SigningEvent::DeviceSignatureRequested)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unplugged_device_is_disconnected() {
        let harness = Harness::accepting(
            DeviceScript::unplug(DEVICE_PATH, STEP),
            Duration::from_millis(500),
        );

        let outcome = harness.args().start(&pipeline()).outcome().await;

        assert_eq!(outcome, RunOutcome::Failed(SigningError::DisconnectedDevice));
        assert_eq!(outcome.next_step(), Some(FlowStep::Confirmation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_device_failure_is_generic() {
        let failure = DeviceFailure::Status {
            status_code: 0x6a80,
            message: "Invalid data".into(),
        };
        let script = DeviceScript::new()
            .event(STEP, SigningEvent::streaming(0.5, 1, 2))
            .then(STEP, DevicePayload::Failure(failure.clone()));
        let harness = Harness::accepting(script, Duration::from_millis(500));

        let outcome = harness.args().start(&pipeline()).outcome().await;

        assert_eq!(
            outcome,
            RunOutcome::Failed(SigningError::GenericSignError(failure))
        );
    }

    // =========================================================================
    // BROADCAST SUPPRESSED / FAILED
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_broadcast_ends_at_signed() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(500));
        let observer = RecordingObserver::new();

        let handle = harness
            .args()
            .broadcast_disabled()
            .observer(observer.clone())
            .start(&pipeline());
        assert!(!handle.has_signed());
        let controller = handle.controller();
        let outcome = handle.outcome().await;

        assert_eq!(outcome, RunOutcome::SignedOnly(signed_operation()));
        assert_eq!(outcome.next_step(), Some(FlowStep::Confirmation));
        assert_eq!(harness.bridge.broadcasts(), 0);
        assert!(controller.is_terminated());
        assert!(matches!(
            observer.observed().last(),
            Some(Observed::Outcome(FlowEvent::Signed {
                broadcast_pending: false,
                ..
            }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_broadcast_keeps_signed_flag() {
        let failure = BroadcastFailure::Rejected {
            reason: "fee too low".into(),
        };
        let harness = Harness::new(
            three_step_approval(STEP),
            NetworkBehavior {
                latency: Duration::from_millis(200),
                failure: Some(failure.clone()),
            },
        );

        let mut handle = harness.args().start(&pipeline());
        let started = Instant::now();
        let mut last = None;
        while let Some(event) = handle.next_event().await {
            last = Some(event);
        }

        assert_eq!(
            last,
            Some(FlowEvent::Failed(SigningError::BroadcastError(failure)))
        );
        assert!(handle.has_signed());
        // Failures are reported as soon as the network answers.
        assert!(started.elapsed() < Duration::from_millis(1000));
        assert_eq!(harness.bridge.broadcasts(), 1);
    }

    // =========================================================================
    // CANCELLATION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_streaming_releases_subscription_once() {
        let harness = Harness::accepting(
            DeviceScript::approve(signed_operation(), Duration::from_millis(100)),
            Duration::from_millis(500),
        );
        let observer = RecordingObserver::new();

        let mut handle = harness.args().observer(observer.clone()).start(&pipeline());
        let first = handle.next_event().await;
        assert!(matches!(first, Some(FlowEvent::Progress(_))));
        assert_eq!(harness.bus.subscribers_for(DEVICE_PATH), 1);

        assert!(handle.cancel());
        let seen_at_cancel = observer.observed().len();
        assert_eq!(handle.next_event().await, None);

        sleep(Duration::from_secs(5)).await;

        assert_eq!(harness.bus.subscribers_for(DEVICE_PATH), 0);
        assert_eq!(harness.bus.released_count(), 1);
        assert_eq!(observer.observed().len(), seen_at_cancel);
        assert_eq!(harness.bridge.broadcasts(), 0);
        assert!(!handle.has_signed());

        assert!(!handle.cancel());
        assert_eq!(handle.outcome().await, RunOutcome::Cancelled);
        assert_eq!(harness.bus.released_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_run() {
        let harness = Harness::accepting(
            DeviceScript::approve(signed_operation(), Duration::from_millis(100)),
            Duration::from_millis(500),
        );
        let observer = RecordingObserver::new();

        let handle = harness.args().observer(observer.clone()).start(&pipeline());
        sleep(Duration::from_millis(250)).await;
        drop(handle);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(harness.bus.released_count(), 1);
        assert_eq!(harness.bridge.broadcasts(), 0);
        assert!(!observer
            .observed()
            .iter()
            .any(|seen| matches!(seen, Observed::Outcome(_))));
    }
}
