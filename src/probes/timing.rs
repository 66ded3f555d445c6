use super::{Probe, ProbeEnv, ProbeKind, ProbeOutcome, Registered};
use crate::core::{Context, HandlerResult, Sender, Signal};
use serde_json::json;
use std::time::{Duration, Instant};

/// Fires a signal whose handler sleeps, and measures how long the caller waits.
pub struct TimingProbe {
    signal: Signal,
    delay: Duration,
}

impl TimingProbe {
    pub fn new(delay: Duration) -> Self {
        Self {
            signal: Signal::new("timing-probe"),
            delay,
        }
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}

impl Probe for TimingProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Timing
    }

    fn question(&self) -> &'static str {
        "By default are signals executed synchronously or asynchronously?"
    }

    fn run(&self, env: &mut ProbeEnv<'_>) -> anyhow::Result<ProbeOutcome> {
        let delay = self.delay;
        let _registered = Registered::new(
            env.registry,
            env.registry
                .register(&self.signal, move |_: &Sender, ctx: &mut Context<'_>| -> HandlerResult {
                    ctx.report("Receiver: Started processing...")?;
                    std::thread::sleep(delay);
                    ctx.report("Receiver: Finished processing.")?;
                    Ok(json!({ "slept_ms": delay.as_millis() as u64 }))
                }),
        );

        env.reporter.info("Caller: Sending signal...")?;
        let start = Instant::now();
        env.registry.fire(
            &self.signal,
            &Sender::of::<Self>(),
            &mut Context::new().with_reporter(&mut *env.reporter),
        )?;
        let elapsed = start.elapsed();

        env.reporter.info(&format!(
            "Caller: Signal sent. Total time taken: {:.2} seconds",
            elapsed.as_secs_f64()
        ))?;
        log::info!("Timing probe: handler delay {:?}, caller waited {:?}", delay, elapsed);

        let holds = elapsed >= delay;
        let conclusion = if holds {
            "Signals are synchronous by default (caller waited for receiver)."
        } else {
            "Signals are asynchronous."
        };
        Ok(ProbeOutcome {
            probe: self.kind(),
            holds,
            conclusion: conclusion.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{MockReporter, Reporter, TerminalReporter};
    use std::io;
    use crate::core::SignalRegistry;
    use crate::store::LogStore;

    #[test]
    fn test_timing_probe_waits_for_handler() {
        let registry = SignalRegistry::new();
        let mut store = LogStore::in_memory();
        let mut reporter = TerminalReporter::new(Vec::new(), false);
        let probe = TimingProbe::new(Duration::from_millis(50));

        let outcome = {
            let mut env = ProbeEnv {
                registry: &registry,
                store: &mut store,
                reporter: &mut reporter,
            };
            probe.run(&mut env).unwrap()
        };

        assert!(outcome.holds);
        assert_eq!(outcome.probe, ProbeKind::Timing);
        assert!(!registry.has_handlers(probe.signal()));

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Caller: Sending signal...");
        assert_eq!(lines[1], "Receiver: Started processing...");
        assert_eq!(lines[2], "Receiver: Finished processing.");
        assert!(lines[3].starts_with("Caller: Signal sent. Total time taken:"));
    }

    /// Records when each line arrives.
    struct Stopwatch {
        start: Instant,
        lines: Vec<(Duration, String)>,
    }

    impl Reporter for Stopwatch {
        fn info(&mut self, line: &str) -> io::Result<()> {
            self.lines.push((self.start.elapsed(), line.to_string()));
            Ok(())
        }

        fn success(&mut self, line: &str) -> io::Result<()> {
            self.info(line)
        }

        fn warning(&mut self, line: &str) -> io::Result<()> {
            self.info(line)
        }
    }

    #[test]
    fn test_receiver_lines_appear_while_caller_waits() {
        let registry = SignalRegistry::new();
        let mut store = LogStore::in_memory();
        let delay = Duration::from_millis(300);
        let mut reporter = Stopwatch {
            start: Instant::now(),
            lines: Vec::new(),
        };

        {
            let mut env = ProbeEnv {
                registry: &registry,
                store: &mut store,
                reporter: &mut reporter,
            };
            TimingProbe::new(delay).run(&mut env).unwrap();
        }

        let at = |text: &str| {
            reporter
                .lines
                .iter()
                .find(|(_, line)| line == text)
                .map(|(at, _)| *at)
                .unwrap()
        };
        let sending = at("Caller: Sending signal...");
        let started = at("Receiver: Started processing...");
        let finished = at("Receiver: Finished processing.");
        assert!(started - sending < delay);
        assert!(finished - sending >= delay);
    }

    #[test]
    fn test_handler_unregistered_when_reporting_fails() {
        let registry = SignalRegistry::new();
        let mut store = LogStore::in_memory();
        let mut reporter = MockReporter::new();
        reporter
            .expect_info()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Other, "closed")));
        let probe = TimingProbe::new(Duration::from_millis(1));

        let result = {
            let mut env = ProbeEnv {
                registry: &registry,
                store: &mut store,
                reporter: &mut reporter,
            };
            probe.run(&mut env)
        };

        assert!(result.is_err());
        assert!(!registry.has_handlers(probe.signal()));
    }
}
