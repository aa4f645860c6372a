//! Integration tests for the matchplay client
//!
//! These tests drive the orchestrator end to end against scripted and simulated
//! ticket services, covering:
//! - Successful assignment after pending polls
//! - Every failure classification
//! - Cancellation at each stage of the ticket lifecycle
//! - The active flag on every exit path

mod fixtures;

use fixtures::{Call, ScriptedTicketService};
use matchplay_client::metrics::MetricsCollector;
use matchplay_client::ticket::{SimulatedOutcome, SimulatedTicketService, SimulationConfig};
use matchplay_client::{
    Assignment, AssignmentStatus, MatchOrchestrator, MatchRequest, MatchResultKind,
    OrchestratorConfig, TicketServiceError, TicketStatus,
};
use std::sync::Arc;
use std::time::Duration;

fn request() -> MatchRequest {
    MatchRequest::new("player-1", "casual-queue").with_ticket_attribute("skill", 1500)
}

fn create_test_system(
    service: ScriptedTicketService,
) -> (Arc<MatchOrchestrator>, Arc<ScriptedTicketService>) {
    let service = Arc::new(service);
    let orchestrator = Arc::new(MatchOrchestrator::new(
        service.clone(),
        OrchestratorConfig::default(),
    ));
    (orchestrator, service)
}

fn pending() -> Result<TicketStatus, TicketServiceError> {
    Ok(TicketStatus::with_assignment(Assignment::pending()))
}

#[tokio::test(start_paused = true)]
async fn test_found_after_two_pending_polls() {
    let (orchestrator, service) = create_test_system(
        ScriptedTicketService::with_ticket("T1")
            .then_poll(pending())
            .then_poll(pending())
            .then_poll(Ok(TicketStatus::with_assignment(Assignment::found(
                "10.0.0.5", 7777,
            )))),
    );

    let result = orchestrator.matchmake(&request()).await;

    assert_eq!(result.kind(), MatchResultKind::Success);
    assert_eq!(result.ip(), Some("10.0.0.5"));
    assert_eq!(result.port(), Some(7777));
    assert_eq!(
        service.calls(),
        vec![
            Call::Create {
                player_ids: vec!["player-1".to_string()],
                queue_name: "casual-queue".to_string(),
            },
            Call::Get("T1".to_string()),
            Call::Get("T1".to_string()),
            Call::Get("T1".to_string()),
        ]
    );
    assert!(!orchestrator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_failed_assignment_reports_ticket_and_reason() {
    let (orchestrator, service) = create_test_system(
        ScriptedTicketService::with_ticket("T1").then_poll(Ok(TicketStatus::with_assignment(
            Assignment::terminal(AssignmentStatus::Failed, "pool closed"),
        ))),
    );

    let result = orchestrator.matchmake(&request()).await;

    assert_eq!(result.kind(), MatchResultKind::MatchAssignmentError);
    assert!(result.message().contains("pool closed"));
    assert!(result.message().contains("T1"));
    assert!(service.deletes().is_empty());
}

#[tokio::test]
async fn test_creation_failure_is_terminal() {
    let (orchestrator, service) = create_test_system(ScriptedTicketService::failing_creation(
        TicketServiceError::Service {
            code: 503,
            message: "matchmaker unavailable".to_string(),
        },
    ));

    let result = orchestrator.matchmake(&request()).await;

    assert_eq!(result.kind(), MatchResultKind::TicketCreationError);
    assert!(result.message().contains("matchmaker unavailable"));
    assert_eq!(service.count_gets(), 0);
    assert!(service.deletes().is_empty());
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_poll_loop() {
    let (orchestrator, service) = create_test_system(ScriptedTicketService::with_ticket("T1"));

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(service.count_gets() >= 3);

    orchestrator.cancel().await;
    let result = task.await.unwrap();

    assert_eq!(result.kind(), MatchResultKind::TicketCancellationError);
    assert_eq!(service.deletes(), vec!["T1".to_string()]);
    assert!(!orchestrator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_twice_deletes_once() {
    let (orchestrator, service) = create_test_system(ScriptedTicketService::with_ticket("T1"));

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;

    orchestrator.cancel().await;
    orchestrator.cancel().await;
    let result = task.await.unwrap();

    assert_eq!(result.kind(), MatchResultKind::TicketCancellationError);
    assert_eq!(service.deletes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_creation_never_succeeds_or_leaks() {
    let (service, gate) = ScriptedTicketService::with_ticket("T1")
        .then_poll(Ok(TicketStatus::with_assignment(Assignment::found(
            "10.0.0.5", 7777,
        ))))
        .gated_creation();
    let (orchestrator, service) = create_test_system(service);

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    while service.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(orchestrator.is_active());

    orchestrator.cancel().await;
    assert!(!orchestrator.is_active());
    assert!(service.deletes().is_empty());

    gate.notify_one();
    let result = task.await.unwrap();

    assert!(matches!(
        result.kind(),
        MatchResultKind::TicketCancellationError | MatchResultKind::TicketCreationError
    ));
    assert_ne!(result.kind(), MatchResultKind::Success);
    assert_eq!(service.count_gets(), 0);
    assert_eq!(service.deletes(), vec!["T1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_active_flag_cleared_on_every_exit_path() {
    let scripts = vec![
        (
            ScriptedTicketService::with_ticket("T1").then_poll(Ok(TicketStatus::with_assignment(
                Assignment::found("10.0.0.5", 7777),
            ))),
            MatchResultKind::Success,
        ),
        (
            ScriptedTicketService::failing_creation(TicketServiceError::transport("refused")),
            MatchResultKind::TicketCreationError,
        ),
        (
            ScriptedTicketService::with_ticket("T1")
                .then_poll(Err(TicketServiceError::transport("reset"))),
            MatchResultKind::TicketRetrievalError,
        ),
        (
            ScriptedTicketService::with_ticket("T1").then_poll(Ok(TicketStatus::with_assignment(
                Assignment::terminal(AssignmentStatus::Timeout, "queue empty"),
            ))),
            MatchResultKind::MatchAssignmentError,
        ),
    ];

    for (service, expected) in scripts {
        let (orchestrator, _service) = create_test_system(service);

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.matchmake(&request()).await })
        };
        let result = task.await.unwrap();

        assert_eq!(result.kind(), expected);
        assert!(!orchestrator.is_active(), "still active after {:?}", expected);
        if !result.is_success() {
            assert!(!result.message().is_empty());
            assert!(result.ip().is_none() && result.port().is_none());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_orchestrator_reusable_after_cancel() {
    let (orchestrator, service) = create_test_system(
        ScriptedTicketService::with_ticket("T1")
            .then_poll(pending())
            .then_poll(pending()),
    );

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    tokio::time::sleep(Duration::from_millis(1500)).await;
    orchestrator.cancel().await;
    assert_eq!(
        first.await.unwrap().kind(),
        MatchResultKind::TicketCancellationError
    );

    // The script is exhausted, so the second attempt only ever sees unassigned polls
    let second = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(orchestrator.is_active());
    orchestrator.cancel().await;

    assert_eq!(
        second.await.unwrap().kind(),
        MatchResultKind::TicketCancellationError
    );
    assert_eq!(service.deletes().len(), 2);
}

#[tokio::test]
async fn test_deletion_failure_is_observed_not_returned() {
    let metrics = Arc::new(MetricsCollector::new().unwrap());
    let service = Arc::new(
        ScriptedTicketService::with_ticket("T1")
            .failing_deletion(TicketServiceError::transport("unreachable")),
    );
    let orchestrator = Arc::new(
        MatchOrchestrator::new(
            service.clone(),
            OrchestratorConfig {
                poll_interval: Duration::from_millis(5),
            },
        )
        .with_metrics(metrics.clone()),
    );

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    while orchestrator.current_ticket().is_none() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    orchestrator.cancel().await;
    let result = task.await.unwrap();

    assert_eq!(result.kind(), MatchResultKind::TicketCancellationError);
    assert_eq!(service.deletes(), vec!["T1".to_string()]);
    assert_eq!(metrics.deletion_count(false), 1);
}

#[tokio::test]
async fn test_simulated_matchmaker_end_to_end() {
    let service = Arc::new(SimulatedTicketService::new(SimulationConfig {
        polls_until_resolved: 2,
        outcome: SimulatedOutcome::Found {
            ip: "192.168.1.20".to_string(),
            port: 9000,
        },
        latency: Duration::ZERO,
    }));
    let orchestrator = MatchOrchestrator::new(
        service.clone(),
        OrchestratorConfig {
            poll_interval: Duration::from_millis(5),
        },
    );

    let result = orchestrator.matchmake(&request()).await;

    assert!(result.is_success());
    assert_eq!(result.endpoint().as_deref(), Some("192.168.1.20:9000"));
    assert_eq!(service.active_ticket_count(), 0);
}

#[tokio::test]
async fn test_simulated_matchmaker_cancel_withdraws_ticket() {
    let service = Arc::new(SimulatedTicketService::new(SimulationConfig {
        polls_until_resolved: u32::MAX,
        outcome: SimulatedOutcome::Failed,
        latency: Duration::ZERO,
    }));
    let orchestrator = Arc::new(MatchOrchestrator::new(
        service.clone(),
        OrchestratorConfig {
            poll_interval: Duration::from_millis(5),
        },
    ));

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request()).await })
    };
    while orchestrator.current_ticket().is_none() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(service.active_ticket_count(), 1);

    orchestrator.cancel().await;
    let result = task.await.unwrap();

    assert_eq!(result.kind(), MatchResultKind::TicketCancellationError);
    assert_eq!(service.active_ticket_count(), 0);
}

#[tokio::test]
async fn test_active_from_first_poll_of_matchmake() {
    let (service, gate) = ScriptedTicketService::with_ticket("T1")
        .then_poll(Ok(TicketStatus::with_assignment(Assignment::found(
            "10.0.0.5", 7777,
        ))))
        .gated_creation();
    let (orchestrator, _service) = create_test_system(service);
    let request = request();

    let mut attempt = tokio_test::task::spawn(orchestrator.matchmake(&request));
    assert!(!orchestrator.is_active());

    tokio_test::assert_pending!(attempt.poll());
    assert!(orchestrator.is_active());
    assert!(orchestrator.current_ticket().is_none());

    gate.notify_one();
    let result = attempt.await;
    assert!(result.is_success());
    assert!(!orchestrator.is_active());
}

#[tokio::test]
async fn test_cancel_races_polling_on_same_task() {
    let service = ScriptedTicketService::with_ticket("T1");
    let service = Arc::new(service);
    let orchestrator = MatchOrchestrator::new(
        service.clone(),
        OrchestratorConfig {
            poll_interval: Duration::from_millis(20),
        },
    );
    let request = request();

    let cancel_later = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator.cancel().await;
    };
    let (result, ()) = futures::join!(orchestrator.matchmake(&request), cancel_later);

    assert_eq!(result.kind(), MatchResultKind::TicketCancellationError);
    assert_eq!(service.deletes(), vec!["T1".to_string()]);
    assert!(!orchestrator.is_active());
}
