//! Simulated synchronization core.
//!
//! The engine owns all mutable simulation state behind one `RwLock`. The
//! accept loop reads it for `status` and starts scripts through
//! [`Engine::trigger`]; scripted steps run on their own tokio task and write
//! through the same lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use simulator_core::types::format_mb;
use simulator_core::{DaemonState, QuotaInfo, TriggerEvent};

use crate::report::StatusReport;
use crate::script::{Script, ScriptStep};
use crate::session::{SessionLog, SyncSession};

#[derive(Debug)]
struct EngineState {
    status: DaemonState,
    session: SyncSession,
    quota: Option<QuotaInfo>,
    /// Bumped for every run; steps from an older run are discarded.
    generation: u64,
    runner: Option<JoinHandle<()>>,
    log: SessionLog,
    closed: bool,
}

impl EngineState {
    fn apply(&mut self, step: &ScriptStep) {
        let mut line = format!("Synchronization core status: {}", step.state);
        self.status = step.state;

        if step.progress > 0 {
            self.session.advance(step.progress);
            line.push_str(&format!(
                ", transferred {} MB of {} MB",
                format_mb(self.session.transferred_bytes()),
                format_mb(self.session.total_bytes())
            ));
        }
        if let Some(item) = step.item {
            self.session.record_item(item);
            line.push_str(&format!(", file: '{item}'"));
        }
        if step.quota_received && self.quota.is_none() {
            self.quota = Some(QuotaInfo::SCRIPTED);
            line.push_str(", quota received");
        }

        self.log.record(&line);
    }
}

/// Handle to the simulated core. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Engine {
    sync_dir: Arc<PathBuf>,
    state: Arc<RwLock<EngineState>>,
}

impl Engine {
    pub fn new(sync_dir: PathBuf, log: SessionLog) -> Self {
        Self {
            sync_dir: Arc::new(sync_dir),
            state: Arc::new(RwLock::new(EngineState {
                status: DaemonState::Idle,
                session: SyncSession::default(),
                quota: None,
                generation: 0,
                runner: None,
                log,
                closed: false,
            })),
        }
    }

    pub fn sync_dir(&self) -> &Path {
        &self.sync_dir
    }

    /// Start the script for `event`, restarting any run already in progress.
    ///
    /// Leading zero-delay steps are applied before this returns; the rest run
    /// in the background. Must be called from within a tokio runtime.
    pub async fn trigger(&self, event: TriggerEvent) {
        let script = Script::for_event(event);
        let (immediate, timed) = script.split_immediate();

        let mut state = self.state.write().await;
        if state.closed {
            tracing::debug!(%event, "engine closed, trigger ignored");
            return;
        }
        if let Some(previous) = state.runner.take() {
            if !previous.is_finished() {
                tracing::info!(%event, "restarting scripted run");
            }
            previous.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        if event.starts_session() {
            state.session.restart(script.total_bytes);
        }
        state.log.record(&format!("{} simulation started", script.name));
        for step in immediate {
            state.apply(step);
        }

        if !timed.is_empty() {
            let shared = self.state.clone();
            state.runner = Some(tokio::spawn(replay(shared, generation, timed)));
        }
    }

    /// Render the current state. Never waits for a scripted transition.
    pub async fn current_report(&self) -> String {
        let state = self.state.read().await;
        StatusReport {
            state: state.status,
            sync_dir: &self.sync_dir,
            session: &state.session,
            quota: state.quota.as_ref(),
        }
        .to_string()
    }

    pub async fn status(&self) -> DaemonState {
        self.state.read().await.status
    }

    pub async fn session(&self) -> SyncSession {
        self.state.read().await.session.clone()
    }

    /// Abort any in-flight script and close the session log. Idempotent.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        if let Some(runner) = state.runner.take() {
            runner.abort();
        }
        state.generation += 1;
        state.closed = true;
        state.log.record("exit");
    }
}

async fn replay(
    state: Arc<RwLock<EngineState>>,
    generation: u64,
    steps: &'static [ScriptStep],
) {
    for step in steps {
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        let mut guard = state.write().await;
        if guard.generation != generation {
            return;
        }
        guard.apply(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::script::SYNC_TOTAL_BYTES;

    fn engine() -> Engine {
        Engine::new(PathBuf::from("/home/user/Yandex.Disk"), SessionLog::sink())
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    async fn run_start_script(engine: &Engine) {
        engine.trigger(TriggerEvent::Start).await;
        sleep(START_DURATION + Duration::from_millis(10)).await;
    }

    const START_DURATION: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn start_is_not_busy_right_after_trigger() {
        let engine = engine();
        engine.trigger(TriggerEvent::Start).await;

        let state = engine.status().await;
        assert!(
            matches!(state, DaemonState::Idle | DaemonState::Index),
            "got {state}"
        );
        let report = engine.current_report().await;
        assert!(!report.contains("Sync progress"));
        assert!(report.contains("The quota has not been received yet."));
    }

    #[tokio::test(start_paused = true)]
    async fn start_script_walks_index_busy_index_idle() {
        let engine = engine();
        engine.trigger(TriggerEvent::Start).await;

        sleep(Duration::from_millis(1010)).await;
        assert_eq!(engine.status().await, DaemonState::Index);
        let report = engine.current_report().await;
        assert!(!report.contains("Last synchronized items"), "{report}");

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(engine.status().await, DaemonState::Busy);
        let items: Vec<String> = engine
            .session()
            .await
            .recent_items()
            .map(str::to_owned)
            .collect();
        assert_eq!(items.first().map(String::as_str), Some("File.ods"));
        assert_eq!(items.last().map(String::as_str), Some("n"));

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(engine.status().await, DaemonState::Index);
        assert!(engine
            .current_report()
            .await
            .contains("The quota has not been received yet."));

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(engine.status().await, DaemonState::Idle);
        let report = engine.current_report().await;
        assert!(report.contains("\tTotal: 43.50 GB"), "{report}");
        assert!(report.contains("\tfile: 'File.ods'"));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_reports_monotonic_progress() {
        let engine = engine();
        run_start_script(&engine).await;

        engine.trigger(TriggerEvent::Sync).await;
        assert_eq!(engine.status().await, DaemonState::Index);
        // Sample 10ms after each scripted step, never on the same tick.
        sleep(Duration::from_millis(10)).await;

        let mut last = 0;
        let mut busy_reports = Vec::new();
        for _ in 0..3 {
            sleep(Duration::from_millis(1000)).await;
            let session = engine.session().await;
            assert!(session.transferred_bytes() >= last);
            last = session.transferred_bytes();
            assert_eq!(engine.status().await, DaemonState::Busy);
            let expected = (100.0 * session.transferred_bytes() as f64
                / session.total_bytes() as f64)
                .round() as u64;
            assert_eq!(session.percent(), Some(expected));
            busy_reports.push(engine.current_report().await);
        }

        assert!(busy_reports[0].starts_with("Sync progress: 0.00 MB/ 139.38 MB (0 %)\n"));
        assert!(busy_reports[1].starts_with("Sync progress: 65.34 MB/ 139.38 MB (47 %)\n"));
        assert!(busy_reports[2].starts_with("Sync progress: 139.38 MB/ 139.38 MB (100 %)\n"));
        assert!(busy_reports[2].contains("Last synchronized items:\n\tfile: 'NewFile'\n\tfile: 'File.ods'"));
        assert_eq!(last, SYNC_TOTAL_BYTES);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(engine.status().await, DaemonState::Index);
        assert!(!engine.current_report().await.contains("Sync progress"));

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(engine.status().await, DaemonState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn recent_items_are_capped_at_ten_in_report() {
        let engine = engine();
        run_start_script(&engine).await;
        engine.trigger(TriggerEvent::Sync).await;
        sleep(Duration::from_secs(6)).await;

        let report = engine.current_report().await;
        let listed: Vec<&str> = report
            .lines()
            .filter_map(|line| line.strip_prefix("\tfile: '"))
            .collect();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0], "NewFile'");
        assert_eq!(listed[9], "w'", "oldest item 'n' falls off");
    }

    #[tokio::test(start_paused = true)]
    async fn error_flips_immediately_and_reverts_after_500ms() {
        let engine = engine();
        engine.trigger(TriggerEvent::Error).await;
        assert_eq!(engine.status().await, DaemonState::Error);
        assert!(engine
            .current_report()
            .await
            .starts_with("Synchronization core status: error\n"));

        sleep(Duration::from_millis(490)).await;
        assert_eq!(engine.status().await, DaemonState::Error);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.status().await, DaemonState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn error_does_not_touch_session() {
        let engine = engine();
        run_start_script(&engine).await;
        let before = engine.session().await;

        engine.trigger(TriggerEvent::Error).await;
        sleep(Duration::from_secs(1)).await;

        assert_eq!(engine.session().await, before);
        assert_eq!(engine.status().await, DaemonState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn retrigger_restarts_script_from_the_beginning() {
        let engine = engine();
        run_start_script(&engine).await;

        engine.trigger(TriggerEvent::Sync).await;
        sleep(Duration::from_millis(2010)).await;
        assert_eq!(engine.session().await.transferred_bytes(), 68_513_956);

        engine.trigger(TriggerEvent::Sync).await;
        assert_eq!(engine.status().await, DaemonState::Index);
        assert_eq!(engine.session().await.transferred_bytes(), 0);

        // The old run would have finished by now; the new one is still busy.
        sleep(Duration::from_millis(3010)).await;
        assert_eq!(engine.status().await, DaemonState::Busy);
        assert_eq!(engine.session().await.transferred_bytes(), SYNC_TOTAL_BYTES);
    }

    #[tokio::test(start_paused = true)]
    async fn error_during_sync_cancels_the_transfer() {
        let engine = engine();
        engine.trigger(TriggerEvent::Sync).await;
        sleep(Duration::from_millis(1010)).await;
        assert_eq!(engine.status().await, DaemonState::Busy);

        engine.trigger(TriggerEvent::Error).await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(engine.status().await, DaemonState::Idle);
        assert_eq!(engine.session().await.transferred_bytes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_in_flight_run_and_logs_exit() {
        let buf = SharedBuf::default();
        let engine = Engine::new(PathBuf::from("/sync"), SessionLog::from_writer(buf.clone()));
        engine.trigger(TriggerEvent::Sync).await;

        engine.shutdown().await;
        engine.shutdown().await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(engine.status().await, DaemonState::Index);
        let log = buf.text();
        assert!(log.contains("Synchronization simulation started"));
        assert_eq!(log.lines().filter(|l| l.ends_with(" exit")).count(), 1);

        engine.trigger(TriggerEvent::Sync).await;
        assert_eq!(engine.status().await, DaemonState::Index);
    }

    #[tokio::test(start_paused = true)]
    async fn every_step_is_logged() {
        let buf = SharedBuf::default();
        let engine = Engine::new(PathBuf::from("/sync"), SessionLog::from_writer(buf.clone()));
        engine.trigger(TriggerEvent::Sync).await;
        sleep(Duration::from_secs(6)).await;

        let log = buf.text();
        assert_eq!(log.lines().count(), 1 + crate::script::SYNC.steps.len());
        assert!(log.contains("file: 'NewFile'"));
        assert!(log.lines().last().unwrap().ends_with("Synchronization core status: idle"));
    }
}
