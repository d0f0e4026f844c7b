//! Test orchestration
//!
//! The [`Orchestrator`] drives a caller-supplied [`ProbeTest`] over every
//! (address, port) pair of a [`TargetSpace`], strictly in order, and always
//! finishes with exactly one statistics report, whether the sweep completed,
//! was interrupted, failed or panicked.

use crate::{
    error::Result,
    models::TestParameters,
    output::Presenter,
    stats::StatisticsReport,
    targets::TargetSpace,
};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A test function run once per target pair
///
/// `C` is an optional set of test cases shared by every invocation.
#[async_trait]
pub trait ProbeTest<C: ?Sized + Sync = ()>: Send + Sync {
    async fn run(&self, params: &mut TestParameters, cases: Option<&C>) -> Result<()>;
}

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Interrupted,
    Reporting,
    Done,
}

/// Outcome of [`Orchestrator::perform_testing`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: RunState,
    pub interrupted: bool,
    pub pairs_visited: usize,
    pub report: StatisticsReport,
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pause after the disclaimer
    pub disclaimer_delay: Duration,
    /// Install a Ctrl-C handler for the duration of the run
    pub handle_ctrl_c: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            disclaimer_delay: crate::defaults::DISCLAIMER_DELAY,
            handle_ctrl_c: false,
        }
    }
}

/// Drives a test function across a target space
pub struct Orchestrator<P: Presenter> {
    params: TestParameters,
    targets: TargetSpace,
    presenter: P,
    config: OrchestratorConfig,
    interrupt: Arc<AtomicBool>,
    state: RunState,
    pairs_visited: usize,
}

impl<P: Presenter> Orchestrator<P> {
    pub fn new(params: TestParameters, targets: TargetSpace, presenter: P) -> Self {
        Self {
            params,
            targets,
            presenter,
            config: OrchestratorConfig::default(),
            interrupt: Arc::new(AtomicBool::new(false)),
            state: RunState::Idle,
            pairs_visited: 0,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the pause after the disclaimer
    pub fn with_disclaimer_delay(mut self, delay: Duration) -> Self {
        self.config.disclaimer_delay = delay;
        self
    }

    /// Share an interrupt flag with the test function
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Flag that stops the sweep before the next pair once set
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn params(&self) -> &TestParameters {
        &self.params
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Run `test` over every target pair and report
    ///
    /// Errors and panics raised by `test` stop the sweep; the report is still
    /// printed once, then the error is returned or the panic resumed.
    pub async fn perform_testing<C, T>(
        &mut self,
        name: &str,
        test: &T,
        cases: Option<&C>,
    ) -> Result<RunSummary>
    where
        C: ?Sized + Sync,
        T: ProbeTest<C> + ?Sized,
    {
        self.params.test_name = name.to_string();
        self.pairs_visited = 0;
        self.state = RunState::Running;

        let ctrl_c = self.config.handle_ctrl_c.then(|| {
            let flag = Arc::clone(&self.interrupt);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(true, Ordering::SeqCst);
                }
            })
        });

        if self.params.show_disclaimer {
            self.presenter.show_disclaimer(name);
            tokio::time::sleep(self.config.disclaimer_delay).await;
        }

        let outcome = AssertUnwindSafe(self.sweep(test, cases)).catch_unwind().await;

        if let Some(handle) = ctrl_c {
            handle.abort();
        }

        let summary = self.report();

        match outcome {
            Ok(Ok(())) => Ok(summary),
            Ok(Err(error)) => Err(error),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn sweep<C, T>(&mut self, test: &T, cases: Option<&C>) -> Result<()>
    where
        C: ?Sized + Sync,
        T: ProbeTest<C> + ?Sized,
    {
        let addresses = self.targets.addresses.clone();
        let ports = self.targets.ports.clone();

        for address in addresses {
            for &port in &ports {
                if self.interrupt.load(Ordering::SeqCst) {
                    self.state = RunState::Interrupted;
                    return Ok(());
                }
                self.params.set_destination(address, port);
                self.pairs_visited += 1;
                test.run(&mut self.params, cases).await?;
            }
        }
        Ok(())
    }

    fn report(&mut self) -> RunSummary {
        let interrupted = self.state == RunState::Interrupted;
        self.state = RunState::Reporting;

        let report = self
            .params
            .statistics
            .report(&self.params.test_name, &self.params.labels);
        self.presenter.print_statistics(&report);

        self.state = RunState::Done;
        RunSummary {
            state: self.state,
            interrupted,
            pairs_visited: self.pairs_visited,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Endpoint;
    use crate::stats::ClientReport;
    use crate::types::Protocol;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPresenter {
        disclaimers: Mutex<usize>,
        reports: Mutex<Vec<StatisticsReport>>,
    }

    impl Presenter for RecordingPresenter {
        fn show_disclaimer(&self, _test_name: &str) {
            *self.disclaimers.lock().unwrap() += 1;
        }

        fn print_statistics(&self, report: &StatisticsReport) {
            self.reports.lock().unwrap().push(report.clone());
        }

        fn print_client_statistics(&self, _report: &ClientReport) {}
    }

    /// Records each visited pair as active
    struct MarkAll;

    #[async_trait]
    impl ProbeTest for MarkAll {
        async fn run(&self, params: &mut TestParameters, _cases: Option<&()>) -> Result<()> {
            let id = params.dst_endpoint().identifier();
            params.mark_active(Protocol::Coap, id);
            Ok(())
        }
    }

    /// Raises the interrupt flag while visiting its first pair
    struct InterruptOnFirst {
        interrupt: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ProbeTest for InterruptOnFirst {
        async fn run(&self, params: &mut TestParameters, _cases: Option<&()>) -> Result<()> {
            let id = params.dst_endpoint().identifier();
            params.mark_active(Protocol::Coap, id);
            self.interrupt.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailOnSecond;

    #[async_trait]
    impl ProbeTest<[u16]> for FailOnSecond {
        async fn run(&self, params: &mut TestParameters, cases: Option<&[u16]>) -> Result<()> {
            let skip = cases.unwrap_or(&[]);
            if skip.contains(&params.dst_endpoint().port) {
                return Err(AppError::test_execution("port rejected"));
            }
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl ProbeTest for Panics {
        async fn run(&self, _params: &mut TestParameters, _cases: Option<&()>) -> Result<()> {
            panic!("test function blew up");
        }
    }

    fn orchestrator(ports: &str) -> Orchestrator<RecordingPresenter> {
        let mut params = TestParameters::new(
            "unit",
            Endpoint::local(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), None),
        );
        params.show_disclaimer = false;
        let targets = TargetSpace::parse("10.0.0.2,10.0.0.1", ports).unwrap();
        Orchestrator::new(params, targets, RecordingPresenter::default())
    }

    #[tokio::test]
    async fn test_visits_pairs_in_order() {
        let mut orchestrator = orchestrator("80,443");
        let summary = orchestrator.perform_testing::<(), _>("order", &MarkAll, None).await.unwrap();

        assert_eq!(summary.state, RunState::Done);
        assert_eq!(summary.pairs_visited, 4);
        assert!(!summary.interrupted);
        assert_eq!(
            orchestrator.params().statistics.active(Protocol::Coap),
            ["10.0.0.1:80", "10.0.0.1:443", "10.0.0.2:80", "10.0.0.2:443"]
        );
        assert_eq!(orchestrator.presenter().reports.lock().unwrap().len(), 1);
        assert_eq!(summary.report.test_name, "order");
    }

    #[tokio::test]
    async fn test_interrupt_before_start_still_reports() {
        let mut orchestrator = orchestrator("80");
        orchestrator.interrupt_handle().store(true, Ordering::SeqCst);

        let summary = orchestrator.perform_testing::<(), _>("stop", &MarkAll, None).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.pairs_visited, 0);
        assert_eq!(orchestrator.presenter().reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_during_sweep_stops_before_next_pair() {
        let mut orchestrator = orchestrator("80,443");
        let test = InterruptOnFirst {
            interrupt: orchestrator.interrupt_handle(),
        };

        let summary = orchestrator.perform_testing::<(), _>("midway", &test, None).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.pairs_visited, 1);
        assert_eq!(summary.state, RunState::Done);
        assert_eq!(orchestrator.state(), RunState::Done);
        assert_eq!(orchestrator.presenter().reports.lock().unwrap().len(), 1);
        assert_eq!(orchestrator.params().statistics.active(Protocol::Coap), ["10.0.0.1:80"]);
    }

    #[tokio::test]
    async fn test_shared_interrupt_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut orchestrator = orchestrator("80").with_interrupt(Arc::clone(&flag));
        assert!(Arc::ptr_eq(&flag, &orchestrator.interrupt_handle()));

        flag.store(true, Ordering::SeqCst);
        let summary = orchestrator.perform_testing::<(), _>("shared", &MarkAll, None).await.unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.pairs_visited, 0);
    }

    #[tokio::test]
    async fn test_error_stops_sweep_and_reports_once() {
        let mut orchestrator = orchestrator("80,443");
        let skip: &[u16] = &[443];

        let err = orchestrator
            .perform_testing("fail", &FailOnSecond, Some(skip))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "TEST");
        assert_eq!(orchestrator.state(), RunState::Done);
        assert_eq!(orchestrator.presenter().reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_panic_reports_then_resumes() {
        let mut orchestrator = orchestrator("80");

        let result = AssertUnwindSafe(orchestrator.perform_testing::<(), _>("panic", &Panics, None))
            .catch_unwind()
            .await;

        assert!(result.is_err());
        assert_eq!(orchestrator.presenter().reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disclaimer_shown_when_enabled() {
        let mut orchestrator = orchestrator("80").with_disclaimer_delay(Duration::ZERO);
        orchestrator.params.show_disclaimer = true;

        orchestrator.perform_testing::<(), _>("d", &MarkAll, None).await.unwrap();

        assert_eq!(*orchestrator.presenter().disclaimers.lock().unwrap(), 1);
    }
}
