use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use docflow_events::{Notifier, StatusChanged};

use crate::error::EngineError;
use crate::store::DocumentStore;

use super::scheduler::RecurringScheduler;
use super::store::ScheduleStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Drives `RecurringScheduler::tick` from a background thread.
#[derive(Debug)]
pub struct SchedulerWorker;

impl SchedulerWorker {
    /// Tick immediately, then once per `poll_interval` until shut down.
    pub fn spawn<S, N, R>(
        name: &str,
        scheduler: Arc<RecurringScheduler<S, N, R>>,
        poll_interval: Duration,
    ) -> Result<WorkerHandle, EngineError>
    where
        S: DocumentStore + 'static,
        N: Notifier<StatusChanged> + 'static,
        R: ScheduleStore + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let worker = name.to_string();

        let join = thread::Builder::new()
            .name(worker.clone())
            .spawn(move || worker_loop(&worker, &scheduler, poll_interval, &shutdown_rx))
            .map_err(|e| EngineError::System(format!("failed to spawn scheduler worker: {e}")))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<S, N, R>(
    name: &str,
    scheduler: &RecurringScheduler<S, N, R>,
    poll_interval: Duration,
    shutdown_rx: &mpsc::Receiver<()>,
) where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
    R: ScheduleStore,
{
    info!(worker = %name, interval_ms = poll_interval.as_millis() as u64, "scheduler worker started");

    loop {
        if let Err(e) = scheduler.tick(Utc::now()) {
            error!(worker = %name, error = %e, "scheduler tick failed");
        }

        match shutdown_rx.recv_timeout(poll_interval) {
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(worker = %name, "scheduler worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use docflow_core::{ClientId, DocumentRef};
    use docflow_recurring::Frequency;

    use crate::recurring::InMemoryScheduleStore;
    use crate::testing::*;

    #[test]
    fn worker_runs_due_schedules_and_shuts_down() {
        let (svc, ctx) = setup();
        let svc = Arc::new(svc);
        let source = draft_invoice(&svc, &ctx, ClientId::new(), vec![widget_line()]);
        let scheduler = Arc::new(RecurringScheduler::new(
            svc.clone(),
            InMemoryScheduleStore::new(),
        ));
        let schedule = scheduler
            .create_schedule(
                &ctx,
                DocumentRef::invoice(source.id_typed()),
                Frequency::Monthly,
                Utc::now() - ChronoDuration::days(1),
                None,
            )
            .unwrap();

        let handle =
            SchedulerWorker::spawn("scheduler-test", scheduler.clone(), Duration::from_secs(60))
                .unwrap();
        // The first tick happens before the first wait; poll for its result.
        let mut ran = false;
        for _ in 0..200 {
            if scheduler.get(&ctx, schedule.id).unwrap().run_count == 1 {
                ran = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        assert!(ran);
        assert_eq!(scheduler.get(&ctx, schedule.id).unwrap().run_count, 1);
    }
}
