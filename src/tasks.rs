//! Background work: the single in-flight fetch and per-run cancellations.
//!
//! Every task reports back through the `AppEvent` channel. Nothing here
//! touches `AppState` directly.

use crate::app::FetchTicket;
use crate::events::AppEvent;
use crate::traits::RunService;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Run `fut` on its own task and turn a panic into an `AppEvent::Error`.
pub fn spawn_monitored(
    tx: UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            if !join_err.is_panic() {
                return;
            }
            let msg = match join_err.into_panic().downcast::<String>() {
                Ok(s) => *s,
                Err(payload) => match payload.downcast::<&str>() {
                    Ok(s) => s.to_string(),
                    Err(_) => "unknown panic".to_string(),
                },
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Error(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    })
}

/// Owns the at-most-one fetch task. Starting a new fetch aborts the previous
/// one; anything it still manages to send is dropped by the ticket check in
/// `AppState::apply_fetch_result`.
pub struct FetchController {
    service: Arc<dyn RunService>,
    tx: UnboundedSender<AppEvent>,
    handle: Option<JoinHandle<()>>,
}

impl FetchController {
    pub fn new(service: Arc<dyn RunService>, tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            service,
            tx,
            handle: None,
        }
    }

    pub fn start(&mut self, ticket: FetchTicket) {
        if let Some(previous) = self.handle.take() {
            if !previous.is_finished() {
                tracing::debug!(generation = ticket.generation, "aborting superseded fetch");
            }
            previous.abort();
        }
        let service = self.service.clone();
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let result = service
                .fetch_runs(ticket.definition_id)
                .await
                .map_err(|e| e.to_string());
            if tx.send(AppEvent::FetchResult { ticket, result }).is_err() {
                tracing::warn!("fetch: channel closed");
            }
        }));
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for FetchController {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One independent task per id. Each reports its own `CancelOutcome`; a slow
/// or failing id never holds up the others.
pub fn spawn_cancellations(
    service: &Arc<dyn RunService>,
    run_ids: Vec<u64>,
    tx: &UnboundedSender<AppEvent>,
) {
    for run_id in run_ids {
        let service = service.clone();
        let report_tx = tx.clone();
        spawn_monitored(tx.clone(), "cancel_run", async move {
            let result = service.cancel_run(run_id).await.map_err(|e| e.to_string());
            if let Err(e) = &result {
                tracing::warn!(run_id, "cancel failed: {e}");
            }
            if report_tx
                .send(AppEvent::CancelOutcome { run_id, result })
                .is_err()
            {
                tracing::warn!(run_id, "cancel_run: channel closed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RunRecord;
    use crate::azure::FetchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeService {
        slow_definition: Option<u32>,
        failing: BTreeSet<u64>,
        cancelled: Mutex<Vec<u64>>,
    }

    fn run(id: u64) -> RunRecord {
        RunRecord {
            id,
            label: format!("run-{id}"),
            status: "completed".to_string(),
            result: None,
            queue_time: None,
            start_time: None,
            detail_url: None,
            definition: None,
            repository: None,
            requested_for: None,
        }
    }

    #[async_trait]
    impl RunService for FakeService {
        async fn fetch_runs(&self, definition_id: Option<u32>) -> Result<Vec<RunRecord>, FetchError> {
            if definition_id == self.slow_definition {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(vec![run(u64::from(definition_id.unwrap_or(0)))])
        }

        async fn cancel_run(&self, run_id: u64) -> Result<(), FetchError> {
            self.cancelled.lock().unwrap().push(run_id);
            if self.failing.contains(&run_id) {
                return Err(FetchError::Status {
                    status: 400,
                    body: "already completed".to_string(),
                });
            }
            Ok(())
        }
    }

    fn ticket(generation: u64, definition_id: u32) -> FetchTicket {
        FetchTicket {
            generation,
            definition_id: Some(definition_id),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_fetch_aborts_previous() {
        let service: Arc<dyn RunService> = Arc::new(FakeService {
            slow_definition: Some(1),
            ..Default::default()
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fetcher = FetchController::new(service, tx);

        fetcher.start(ticket(1, 1));
        fetcher.start(ticket(2, 2));

        let Some(AppEvent::FetchResult { ticket, result }) = rx.recv().await else {
            panic!("expected fetch result");
        };
        assert_eq!(ticket.generation, 2);
        assert_eq!(result.unwrap()[0].id, 2);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
        assert!(!fetcher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_reported_as_message() {
        struct Failing;
        #[async_trait]
        impl RunService for Failing {
            async fn fetch_runs(&self, _: Option<u32>) -> Result<Vec<RunRecord>, FetchError> {
                Err(FetchError::Auth { status: 401 })
            }
            async fn cancel_run(&self, _: u64) -> Result<(), FetchError> {
                Ok(())
            }
        }
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fetcher = FetchController::new(Arc::new(Failing), tx);
        fetcher.start(ticket(1, 7));
        let Some(AppEvent::FetchResult { result, .. }) = rx.recv().await else {
            panic!("expected fetch result");
        };
        assert!(result.unwrap_err().contains("401"));
    }

    #[tokio::test]
    async fn cancellations_report_each_outcome() {
        let fake = Arc::new(FakeService {
            failing: BTreeSet::from([3]),
            ..Default::default()
        });
        let service: Arc<dyn RunService> = fake.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_cancellations(&service, vec![1, 3], &tx);

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            match rx.recv().await {
                Some(AppEvent::CancelOutcome { run_id, result }) => {
                    outcomes.push((run_id, result.is_ok()));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        outcomes.sort_unstable();
        assert_eq!(outcomes, vec![(1, true), (3, false)]);

        let mut called = fake.cancelled.lock().unwrap().clone();
        called.sort_unstable();
        assert_eq!(called, vec![1, 3]);
    }

    #[tokio::test]
    async fn monitored_panic_becomes_error_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_monitored(tx, "boom_task", async {
            panic!("kaboom");
        });
        handle.await.unwrap();
        match rx.recv().await {
            Some(AppEvent::Error(msg)) => assert_eq!(msg, "boom_task crashed: kaboom"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
