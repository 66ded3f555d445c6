use super::{
    Probe, ProbeEnv, ProbeKind, ProbeOutcome, RectangleDemo, ThreadProbe, TimingProbe,
    TransactionProbe,
};
use crate::console::{detect_color_support, Reporter};
use crate::core::SignalRegistry;
use crate::store::LogStore;
use anyhow::{Context as _, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// プローブ実行設定
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Probes to run, in order.
    pub probes: Vec<ProbeKind>,
    /// How long the timing probe's handler blocks.
    pub delay: Duration,
    /// JSON file backing the log store; in-memory when `None`.
    pub database: Option<PathBuf>,
    /// Styled output; detected from the environment by default.
    pub color: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probes: ProbeKind::ALL.to_vec(),
            delay: DEFAULT_DELAY,
            database: None,
            color: detect_color_support(),
        }
    }
}

/// プローブ実行エンジン
///
/// Owns the registry for the duration of a run and feeds every probe the same
/// registry, store and reporter.
pub struct ProbeRunner {
    config: ProbeConfig,
    registry: SignalRegistry,
}

impl ProbeRunner {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            registry: SignalRegistry::new(),
        }
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    fn open_store(&self) -> Result<LogStore> {
        match &self.config.database {
            Some(path) => LogStore::open(path)
                .with_context(|| format!("Failed to open log store {}", path.display())),
            None => Ok(LogStore::in_memory()),
        }
    }

    fn build(&self, kind: ProbeKind) -> Box<dyn Probe> {
        match kind {
            ProbeKind::Timing => Box::new(TimingProbe::new(self.config.delay)),
            ProbeKind::Thread => Box::new(ThreadProbe::new()),
            ProbeKind::Transaction => Box::new(TransactionProbe::new()),
            ProbeKind::Rectangle => Box::new(RectangleDemo::default()),
        }
    }

    /// Run every configured probe and return their outcomes in order.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<Vec<ProbeOutcome>> {
        let mut store = self.open_store()?;
        reporter.success("Starting Signal Tests...")?;

        let mut outcomes = Vec::with_capacity(self.config.probes.len());
        for kind in &self.config.probes {
            let probe = self.build(*kind);
            info!("Running {} probe", probe.kind());

            let heading = match probe.kind().question_number() {
                Some(n) => format!("\n--- Question {}: {} ---", n, probe.question()),
                None => format!("\n--- {} ---", probe.question()),
            };
            reporter.warning(&heading)?;

            let mut env = ProbeEnv {
                registry: &self.registry,
                store: &mut store,
                reporter: &mut *reporter,
            };
            let outcome = probe
                .run(&mut env)
                .with_context(|| format!("{} probe failed", probe.kind()))?;

            if probe.kind().question_number().is_some() {
                reporter.success(&format!("Conclusion: {}", outcome.conclusion))?;
            }
            debug!("{} probe outcome: {:?}", probe.kind(), outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::TerminalReporter;

    #[test]
    fn test_default_config_runs_everything() {
        let config = ProbeConfig::default();
        assert_eq!(config.probes, ProbeKind::ALL.to_vec());
        assert_eq!(config.delay, DEFAULT_DELAY);
        assert!(config.database.is_none());
        assert_eq!(config.color, detect_color_support());
    }

    #[test]
    fn test_runner_runs_all_probes() {
        let config = ProbeConfig {
            delay: Duration::from_millis(10),
            ..ProbeConfig::default()
        };
        let runner = ProbeRunner::new(config);
        let mut reporter = TerminalReporter::new(Vec::new(), false);

        let outcomes = runner.run(&mut reporter).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.holds));

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.starts_with("Starting Signal Tests...\n"));
        assert!(text.contains("--- Question 3: By default do signals run in the same database transaction as the caller? ---"));
        assert!(text.contains("--- Rectangle Class Demonstration ---"));
        assert_eq!(text.matches("Conclusion: ").count(), 3);
    }

    #[test]
    fn test_runner_single_probe() {
        let config = ProbeConfig {
            probes: vec![ProbeKind::Thread],
            ..ProbeConfig::default()
        };
        let runner = ProbeRunner::new(config);
        let mut reporter = TerminalReporter::new(Vec::new(), false);

        let outcomes = runner.run(&mut reporter).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].probe, ProbeKind::Thread);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains("--- Question 2: Do signals run in the same thread as the caller? ---"));
    }
}
