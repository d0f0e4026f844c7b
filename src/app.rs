//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    dispatcher::ProbeDispatcher,
    error::{ErrorContext, Result},
    executor::{Orchestrator, OrchestratorConfig, ProbeTest, RunSummary},
    logging::{Logger, LoggerFactory},
    models::{Config, TestParameters},
    output::ConsolePresenter,
    server::ClientTester,
    stats::ClientReport,
    types::{protocol_enabled, Protocol},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name shown in the disclaimer and the report
pub const TEST_NAME: &str = "Multi-protocol endpoint sweep";

/// Name of the client-test report
pub const CLIENT_TEST_NAME: &str = "Client test";

/// Probes every transport-backed protocol covered by a mask
///
/// An endpoint is active for a protocol when it answered that protocol's
/// probe and inactive otherwise.
pub struct ProtocolSweep {
    dispatcher: ProbeDispatcher,
    mask: Protocol,
    payload: Vec<u8>,
    display: bool,
    interrupt: Arc<AtomicBool>,
}

impl ProtocolSweep {
    pub fn new(dispatcher: ProbeDispatcher, mask: Protocol, payload: Vec<u8>) -> Self {
        Self {
            dispatcher,
            mask,
            payload,
            display: false,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop between protocols once this flag is set
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Print each payload before it is sent
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Concrete protocols this sweep probes, in report order
    pub fn protocols(&self) -> impl Iterator<Item = Protocol> + '_ {
        Protocol::ALL_VARIANTS
            .into_iter()
            .filter(move |p| p.transport().is_some() && protocol_enabled(*p, self.mask))
    }
}

#[async_trait]
impl ProbeTest for ProtocolSweep {
    async fn run(&self, params: &mut TestParameters, _cases: Option<&()>) -> Result<()> {
        let selected = params.protocol;
        let endpoint = params.dst_endpoint().identifier();

        for protocol in self.protocols() {
            if self.interrupt.load(Ordering::SeqCst) {
                break;
            }
            params.protocol = protocol;
            let outcome = self
                .dispatcher
                .send_and_receive(params, &self.payload, self.display)
                .await;

            if outcome.is_response() {
                params.mark_active(protocol, endpoint.clone());
            } else {
                params.mark_inactive(protocol, endpoint.clone());
            }
        }

        params.protocol = selected;
        Ok(())
    }
}

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load configuration, then sweep the target space or test clients
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.cli)?;
        let warnings = validate_config(&config)?;

        let presenter = ConsolePresenter::with_color(config.enable_color).with_json(config.json_report);

        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }

        if config.verbose {
            println!(
                "{} v{} ({}, built {}{})",
                crate::PKG_NAME,
                crate::VERSION,
                crate::BUILD_TARGET,
                crate::BUILD_TIME,
                crate::GIT_COMMIT.map(|c| format!(", commit {}", c)).unwrap_or_default()
            );
            println!("{}", display_config_summary(&config));
            println!();
        }

        if config.client_test {
            run_client_test(&config, presenter).await.map(|_| ())
        } else {
            run_sweep(&config, presenter).await.map(|_| ())
        }
    }
}

/// Read the configured payload file; no file means an empty payload
async fn read_payload(config: &Config, logger: &Logger) -> Result<Vec<u8>> {
    let Some(path) = &config.payload_file else {
        return Ok(Vec::new());
    };
    let payload = tokio::fs::read(path)
        .await
        .with_context(|| format!("Reading payload file {}", path.display()))?;
    crate::log_debug!(logger, "Loaded {} payload bytes from {}", payload.len(), path.display());
    Ok(payload)
}

/// Sweep the configured target space with [`ProtocolSweep`]
pub async fn run_sweep(config: &Config, presenter: ConsolePresenter) -> Result<RunSummary> {
    let loggers = LoggerFactory::new(config.clone());
    let logger = loggers.create_logger("APP");
    logger.add_context_field("protocol".to_string(), config.protocol.name());

    let payload = read_payload(config, &logger).await?;

    let targets = config.target_space()?;
    let params = TestParameters::from_config(TEST_NAME, config);
    let dispatcher = ProbeDispatcher::with_logger(loggers.create_probe_logger());
    let interrupt = Arc::new(AtomicBool::new(false));
    let sweep = ProtocolSweep::new(dispatcher, config.protocol, payload)
        .with_display(config.display_payload)
        .with_interrupt(Arc::clone(&interrupt));

    logger.info("Starting sweep").field("pairs", targets.len()).log();
    let operation = logger.start_operation("sweep");

    let mut orchestrator = Orchestrator::new(params, targets, presenter)
        .with_interrupt(interrupt)
        .with_config(OrchestratorConfig {
            handle_ctrl_c: true,
            ..OrchestratorConfig::default()
        });
    let result = orchestrator.perform_testing::<(), _>(TEST_NAME, &sweep, None).await;

    logger.end_operation(&operation, "sweep", result.is_ok());
    match &result {
        Ok(summary) if summary.interrupted => {
            crate::log_warn!(logger, "Sweep interrupted after {} pairs", summary.pairs_visited);
        }
        Ok(_) => {}
        Err(error) => logger.debug("Sweep failed").error_info(error).log(),
    }

    result
}

/// Answer client requests on the configured server endpoint with [`ClientTester`]
pub async fn run_client_test(config: &Config, presenter: ConsolePresenter) -> Result<ClientReport> {
    let loggers = LoggerFactory::new(config.clone());
    let logger = loggers.create_logger("APP");
    logger.add_context_field("protocol".to_string(), config.protocol.name());

    let payload = read_payload(config, &logger).await?;
    let params = TestParameters::for_client_tester(CLIENT_TEST_NAME, config)?;

    logger
        .info("Starting client test")
        .field("listen", params.src_endpoint.to_string())
        .log();
    let operation = logger.start_operation("client-test");

    let mut tester = ClientTester::new(params, payload, presenter)
        .with_logger(loggers.create_probe_logger())
        .with_max_requests(config.max_requests)
        .with_ctrl_c(true);
    let result = tester.serve().await;

    logger.end_operation(&operation, "client-test", result.is_ok());
    if let Err(error) = &result {
        logger.debug("Client test failed").error_info(error).log();
    }

    result
}
