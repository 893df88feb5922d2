use std::time::Duration;

use crate::configuration::Config;
use crate::container_management::test_support::FakeRuntime;
use crate::container_management::{
    ContainerManager, ContainerState, Outcome, Report, SettlePolicy, Verb,
};
use crate::error_handling::types::LifecycleError;

fn fast_settle() -> SettlePolicy {
    SettlePolicy {
        timeout: Duration::from_secs(10),
        interval: Duration::from_secs(1),
    }
}

fn manager<'a>(fake: &FakeRuntime, config: &'a Config) -> ContainerManager<'a, FakeRuntime> {
    ContainerManager::new(fake.clone(), config).with_settle_policy(fast_settle())
}

async fn observed(fake: &FakeRuntime, config: &Config) -> ContainerState {
    manager(fake, config).state().await.unwrap()
}

fn steps(report: Report) -> Vec<Outcome> {
    match report {
        Report::Steps(steps) => steps,
        other => panic!("expected steps, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn start_on_absent_pulls_creates_and_runs() {
    let config = Config::default();
    let fake = FakeRuntime::default();

    let outcome = manager(&fake, &config).start().await.unwrap();

    assert_eq!(outcome, Outcome::Started { created: true });
    assert_eq!(observed(&fake, &config).await, ContainerState::Running);
    assert_eq!(
        fake.actions(),
        vec![format!("pull {}", config.image), "run sqlserver-demo".to_string()]
    );
    let record = fake.record("sqlserver-demo").unwrap();
    assert_eq!(record.ports, "0.0.0.0:1433->1433/tcp");
}

#[tokio::test(start_paused = true)]
async fn start_skips_pull_when_image_is_local() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);

    manager(&fake, &config).start().await.unwrap();

    assert_eq!(fake.actions(), vec!["run sqlserver-demo".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn repeated_start_never_creates_a_second_container() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);

    for _ in 0..3 {
        manager(&fake, &config).start().await.unwrap();
    }
    let last = manager(&fake, &config).start().await.unwrap();

    assert_eq!(last, Outcome::AlreadyRunning);
    assert!(last.is_noop());
    assert_eq!(fake.created(), 1);
}

#[tokio::test(start_paused = true)]
async fn end_to_end_lifecycle_follows_state_machine() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);

    // (1) start on absent
    let report = manager(&fake, &config).run(Verb::Start).await.unwrap();
    assert_eq!(steps(report), vec![Outcome::Started { created: true }]);
    let first_id = fake.record("sqlserver-demo").unwrap().id;

    // (2) status
    match manager(&fake, &config).run(Verb::Status).await.unwrap() {
        Report::Status(status) => {
            assert_eq!(status.state, ContainerState::Running);
            assert_eq!(status.port, "1433");
        }
        other => panic!("expected status, got {:?}", other),
    }

    // (3) stop keeps the container
    let report = manager(&fake, &config).run(Verb::Stop).await.unwrap();
    assert_eq!(steps(report), vec![Outcome::Stopped]);
    assert_eq!(observed(&fake, &config).await, ContainerState::Stopped);

    // (4) start reuses the record
    let report = manager(&fake, &config).run(Verb::Start).await.unwrap();
    assert_eq!(steps(report), vec![Outcome::Started { created: false }]);
    assert_eq!(fake.record("sqlserver-demo").unwrap().id, first_id);
    assert_eq!(fake.created(), 1);

    // (5) remove
    let report = manager(&fake, &config).run(Verb::Remove).await.unwrap();
    assert_eq!(steps(report), vec![Outcome::Removed { was_running: true }]);
    assert_eq!(observed(&fake, &config).await, ContainerState::Absent);

    // (6) remove again is a warning no-op
    let report = manager(&fake, &config).run(Verb::Remove).await.unwrap();
    assert_eq!(steps(report), vec![Outcome::NotFound]);
}

#[tokio::test]
async fn stop_and_remove_on_absent_are_noops() {
    let config = Config::default();
    let fake = FakeRuntime::default();

    let stopped = manager(&fake, &config).stop().await.unwrap();
    let removed = manager(&fake, &config).remove().await.unwrap();

    assert_eq!(stopped, Outcome::NotFound);
    assert_eq!(removed, Outcome::NotFound);
    assert!(stopped.is_noop() && removed.is_noop());
    assert!(fake.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_on_stopped_is_a_noop() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);
    manager(&fake, &config).start().await.unwrap();
    manager(&fake, &config).stop().await.unwrap();

    let outcome = manager(&fake, &config).stop().await.unwrap();

    assert_eq!(outcome, Outcome::AlreadyStopped);
    assert_eq!(
        fake.actions().iter().filter(|a| a.starts_with("stop")).count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn remove_running_stops_first() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);
    manager(&fake, &config).start().await.unwrap();

    manager(&fake, &config).remove().await.unwrap();

    assert_eq!(
        fake.actions(),
        vec![
            "run sqlserver-demo".to_string(),
            "stop sqlserver-demo".to_string(),
            "rm sqlserver-demo".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn remove_stopped_deletes_directly() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);
    manager(&fake, &config).start().await.unwrap();
    manager(&fake, &config).stop().await.unwrap();

    let outcome = manager(&fake, &config).remove().await.unwrap();

    assert_eq!(outcome, Outcome::Removed { was_running: false });
    assert_eq!(fake.actions().last().unwrap(), "rm sqlserver-demo");
}

#[tokio::test(start_paused = true)]
async fn restart_is_stop_then_start() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);
    manager(&fake, &config).start().await.unwrap();

    let outcomes = manager(&fake, &config).restart().await.unwrap();

    assert_eq!(
        outcomes,
        vec![Outcome::Stopped, Outcome::Started { created: false }]
    );
    assert_eq!(observed(&fake, &config).await, ContainerState::Running);
}

#[tokio::test(start_paused = true)]
async fn restart_on_absent_creates() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);

    let outcomes = manager(&fake, &config).restart().await.unwrap();

    assert_eq!(
        outcomes,
        vec![Outcome::NotFound, Outcome::Started { created: true }]
    );
}

#[tokio::test(start_paused = true)]
async fn read_only_verbs_never_mutate() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);

    // absent, then running, then stopped
    let setups: [Option<Verb>; 3] = [None, Some(Verb::Start), Some(Verb::Stop)];
    for setup in setups {
        if let Some(verb) = setup {
            manager(&fake, &config).run(verb).await.unwrap();
        }
        let before_state = observed(&fake, &config).await;
        let before_record = fake.record("sqlserver-demo");
        let before_actions = fake.actions().len();

        manager(&fake, &config).run(Verb::Status).await.unwrap();
        manager(&fake, &config)
            .run(Verb::Logs { tail: Some(10) })
            .await
            .unwrap();

        assert_eq!(observed(&fake, &config).await, before_state);
        assert_eq!(fake.record("sqlserver-demo"), before_record);
        assert_eq!(fake.actions().len(), before_actions);
    }
}

#[tokio::test]
async fn logs_report_absent_container_as_none() {
    let config = Config::default();
    let fake = FakeRuntime::default();

    let report = manager(&fake, &config)
        .run(Verb::Logs { tail: None })
        .await
        .unwrap();

    assert_eq!(report, Report::Logs(None));
}

#[tokio::test(start_paused = true)]
async fn logs_return_container_output() {
    let config = Config::default();
    let fake = FakeRuntime::with_image(&config.image);
    manager(&fake, &config).start().await.unwrap();

    let logs = manager(&fake, &config).logs(None).await.unwrap();

    assert!(logs.unwrap().contains("ready for client connections"));
}

#[tokio::test]
async fn unreachable_runtime_fails_every_verb_before_querying() {
    let config = Config::default();
    let fake = FakeRuntime {
        unreachable: true,
        ..FakeRuntime::default()
    };

    let verbs = [
        Verb::Start,
        Verb::Stop,
        Verb::Restart,
        Verb::Remove,
        Verb::Status,
        Verb::Logs { tail: None },
    ];
    for verb in verbs {
        let result = manager(&fake, &config).run(verb).await;
        assert!(
            matches!(result, Err(LifecycleError::RuntimeUnreachable(_))),
            "{:?} should fail fast",
            verb
        );
    }
    assert_eq!(fake.inspects(), 0);
    assert!(fake.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn container_that_exits_after_start_is_fatal_without_rollback() {
    let config = Config::default();
    let fake = FakeRuntime {
        crash_on_start: true,
        ..FakeRuntime::with_image(&config.image)
    };

    let result = manager(&fake, &config).start().await;

    match result {
        Err(LifecycleError::NotRunningAfterStart { name, waited }) => {
            assert_eq!(name, "sqlserver-demo");
            assert_eq!(waited, Duration::from_secs(10));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    // left for the next invocation to reconcile
    assert_eq!(observed(&fake, &config).await, ContainerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn slow_container_is_awaited_within_settle_timeout() {
    let config = Config::default();
    let fake = FakeRuntime {
        checks_before_running: 4,
        ..FakeRuntime::with_image(&config.image)
    };

    let outcome = manager(&fake, &config).start().await.unwrap();

    assert_eq!(outcome, Outcome::Started { created: true });
}

#[tokio::test(start_paused = true)]
async fn container_slower_than_settle_timeout_fails() {
    let config = Config::default();
    let fake = FakeRuntime {
        checks_before_running: 50,
        ..FakeRuntime::with_image(&config.image)
    };

    let result = manager(&fake, &config).start().await;

    assert!(matches!(
        result,
        Err(LifecycleError::NotRunningAfterStart { .. })
    ));
}

#[tokio::test]
async fn failed_create_is_fatal() {
    let config = Config::default();
    let fake = FakeRuntime {
        fail_action: Some("run"),
        ..FakeRuntime::with_image(&config.image)
    };

    let result = manager(&fake, &config).start().await;

    match result {
        Err(LifecycleError::ActionFailed { action, .. }) => assert_eq!(action, "create"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(fake.created(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_stop_is_fatal() {
    let config = Config::default();
    let fake = FakeRuntime {
        fail_action: Some("stop"),
        ..FakeRuntime::with_image(&config.image)
    };
    manager(&fake, &config).start().await.unwrap();

    let result = manager(&fake, &config).stop().await;

    assert!(matches!(
        result,
        Err(LifecycleError::ActionFailed { action: "stop", .. })
    ));
    assert_eq!(observed(&fake, &config).await, ContainerState::Running);
}

#[tokio::test]
async fn status_with_defaults_reports_connection_parameters() {
    let config = Config::default();
    let fake = FakeRuntime::default();

    let status = manager(&fake, &config).status().await.unwrap();
    let text = status.to_string();

    assert_eq!(status.state, ContainerState::Absent);
    assert!(text.contains("Port:     1433"));
    assert!(text.contains("Database: master"));
    assert!(text.contains("User:     sa"));
    assert!(!text.contains(&config.password));
}

#[tokio::test(start_paused = true)]
async fn custom_container_name_is_respected() {
    let config = Config {
        container_name: "inventory-db".to_string(),
        port: "11433".to_string(),
        ..Config::default()
    };
    let fake = FakeRuntime::with_image(&config.image);

    manager(&fake, &config).start().await.unwrap();

    let record = fake.record("inventory-db").unwrap();
    assert_eq!(record.ports, "0.0.0.0:11433->1433/tcp");
    assert!(fake.record("sqlserver-demo").is_none());
}

#[test]
fn settle_policy_always_checks_at_least_once() {
    let zero = SettlePolicy {
        timeout: Duration::ZERO,
        interval: Duration::from_secs(1),
    };
    assert_eq!(zero.attempts(), 1);

    let ten = SettlePolicy::from_config(&Config::default());
    assert_eq!(ten.attempts(), 10);

    let uneven = SettlePolicy {
        timeout: Duration::from_millis(2500),
        interval: Duration::from_secs(1),
    };
    assert_eq!(uneven.attempts(), 3);
}

#[test]
fn outcome_descriptions_name_the_container() {
    let all = [
        Outcome::Started { created: true },
        Outcome::Started { created: false },
        Outcome::AlreadyRunning,
        Outcome::Stopped,
        Outcome::AlreadyStopped,
        Outcome::NotFound,
        Outcome::Removed { was_running: true },
        Outcome::Removed { was_running: false },
    ];
    for outcome in all {
        assert!(outcome.describe("db1").contains("db1"));
    }
    assert!(!Outcome::Stopped.is_noop());
    assert!(Outcome::AlreadyStopped.is_noop());
}
