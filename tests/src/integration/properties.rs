//! # Run Guarantees
//!
//! Ordering, cancellation and isolation properties that hold for every run,
//! checked across the pipeline and the simulated transport.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        device, signed_operation, three_step_approval, transaction, Harness, Observed,
        RecordingObserver,
    };
    use shared_types::{DeviceFailure, DeviceHandle, DeviceModelId, SigningEvent};
    use signing_pipeline::{
        classify, FlowEvent, PipelineConfig, RunOutcome, SignErrorKind, SigningError,
        SigningFlowApi, SigningPipeline, StartArgs,
    };
    use signing_runtime::adapters::DeviceScript;
    use std::time::Duration;
    use tokio::time::sleep;

    const STEP: Duration = Duration::from_millis(10);

    fn pipeline() -> SigningPipeline {
        SigningPipeline::new(PipelineConfig::default())
    }

    // =========================================================================
    // ORDERING
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_terminal_event_after_signed() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(100));
        let mut handle = harness.args().start(&pipeline());

        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }

        let signed = events
            .iter()
            .position(|event| matches!(event, FlowEvent::Signed { .. }))
            .unwrap();
        let broadcasted = events
            .iter()
            .position(|event| matches!(event, FlowEvent::Broadcasted { .. }))
            .unwrap();
        assert!(signed < broadcasted);
        assert_eq!(broadcasted, events.len() - 1);
        assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_informational_events_are_dropped() {
        let script = DeviceScript::approve(signed_operation(), STEP);
        let harness = Harness::accepting(script, Duration::from_millis(100));
        let observer = RecordingObserver::rejecting_informational();

        let mut handle = harness.args().observer(observer.clone()).start(&pipeline());
        let mut progress = Vec::new();
        while let Some(event) = handle.next_event().await {
            if let FlowEvent::Progress(event) = event {
                progress.push(event);
            }
        }

        assert!(progress.iter().all(|event| !event.kind().is_informational()));
        assert!(!observer.observed().iter().any(|seen| matches!(
            seen,
            Observed::Progress(SigningEvent::DeviceSignatureRequested)
                | Observed::Progress(SigningEvent::DeviceSignatureGranted)
        )));
        assert_eq!(observer.progress_values(), vec![0.25, 0.5, 0.75]);
    }

    // =========================================================================
    // CANCELLATION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_termination_is_noop() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(100));
        let mut handle = harness.args().broadcast_disabled().start(&pipeline());

        while handle.next_event().await.is_some() {}
        let controller = handle.controller();
        assert!(controller.is_terminated());

        assert!(!handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.is_cancelled());
        assert_eq!(handle.outcome().await, RunOutcome::SignedOnly(signed_operation()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(100));
        let mut handle = harness.args().start(&pipeline());

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.controller().cancel());
        assert_eq!(handle.next_event().await, None);
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_broadcast_suppresses_result() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(500));
        let observer = RecordingObserver::new();
        let mut handle = harness.args().observer(observer.clone()).start(&pipeline());

        loop {
            match handle.next_event().await {
                Some(FlowEvent::Signed { .. }) => break,
                Some(_) => {}
                None => panic!("run ended before signing"),
            }
        }
        sleep(Duration::from_millis(1000)).await;
        assert!(handle.cancel());
        sleep(Duration::from_secs(5)).await;

        assert!(handle.has_signed());
        assert_eq!(harness.bridge.broadcasts(), 1);
        assert!(!observer
            .observed()
            .iter()
            .any(|seen| matches!(seen, Observed::Outcome(FlowEvent::Broadcasted { .. }))));
        assert_eq!(handle.outcome().await, RunOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_another_task() {
        let harness = Harness::accepting(
            DeviceScript::approve(signed_operation(), Duration::from_millis(100)),
            Duration::from_millis(100),
        );
        let handle = harness.args().start(&pipeline());
        let controller = handle.controller();

        tokio::spawn(async move {
            sleep(Duration::from_millis(250)).await;
            controller.cancel();
        });

        assert_eq!(handle.outcome().await, RunOutcome::Cancelled);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(harness.bus.released_count(), 1);
    }

    // =========================================================================
    // ISOLATION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_share_a_bridge_independently() {
        let harness = Harness::accepting(three_step_approval(STEP), Duration::from_millis(100));
        let pipeline = pipeline();

        let first = harness.args().start(&pipeline);
        let second = pipeline.start(
            StartArgs::builder()
                .device(DeviceHandle::new("hid://second", DeviceModelId::NanoS))
                .account(crate::fixtures::account())
                .transaction(transaction())
                .bridge(harness.bridge.clone())
                .build()
                .unwrap(),
        );
        assert_ne!(first.run_id(), second.run_id());

        first.cancel();
        let first = first.outcome().await;
        let second = second.outcome().await;

        assert_eq!(first, RunOutcome::Cancelled);
        assert!(matches!(second, RunOutcome::Broadcasted { .. }));
        assert_eq!(harness.bridge.broadcasts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_end_without_signature_is_an_error() {
        let script = DeviceScript::new()
            .event(STEP, SigningEvent::streaming(0.5, 1, 2))
            .then(STEP, device_bus::DevicePayload::Completed);
        let harness = Harness::accepting(script, Duration::from_millis(100));

        let outcome = harness.args().start(&pipeline()).outcome().await;

        assert!(matches!(
            outcome,
            RunOutcome::Failed(SigningError::GenericSignError(_))
        ));
        assert_eq!(harness.bridge.broadcasts(), 0);
    }

    // =========================================================================
    // CLASSIFICATION
    // =========================================================================

    #[test]
    fn test_refusal_status_always_wins() {
        let failures = [
            DeviceFailure::user_refused(),
            DeviceFailure::Status {
                status_code: 0x6985,
                message: "Conditions of use not satisfied".into(),
            },
        ];
        for failure in failures {
            assert_eq!(classify(&failure), SignErrorKind::UserRefusedOnDevice);
            assert_eq!(
                SigningError::from_device_failure(failure),
                SigningError::UserRefusedOnDevice
            );
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let failures = [
            DeviceFailure::Disconnected {
                path: device().path,
            },
            DeviceFailure::Transport("HID write failed".into()),
            DeviceFailure::Other("app not open".into()),
            DeviceFailure::Status {
                status_code: 0x6d00,
                message: "INS not supported".into(),
            },
        ];
        for failure in failures {
            let first = classify(&failure);
            assert_eq!(classify(&failure), first);
            assert_ne!(first, SignErrorKind::UserRefusedOnDevice);
        }
    }
}
