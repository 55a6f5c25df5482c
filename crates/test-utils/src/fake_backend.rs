use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use envoy::exec::{EnvOverrides, StageBackend, StageFuture, StageResult};
use envoy::types::Argv;
use envoy::EnvoyError;

/// One call the orchestrator made into the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Argv,
    pub input: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    pub env: EnvOverrides,
}

/// Canned behaviour for a program name.
#[derive(Debug, Clone)]
pub enum FakeStage {
    /// Echo stdin back on stdout and exit 0 (the default for unknown programs).
    Cat,
    /// Print fixed bytes and exit with the given code.
    Output { std_out: Vec<u8>, status_code: i32 },
    /// Refuse to launch.
    LaunchFailure,
}

/// A backend that never spawns processes:
/// - records every invocation, in order
/// - answers according to the `FakeStage` registered for the program name.
#[derive(Debug, Clone, Default)]
pub struct FakeStageBackend {
    stages: HashMap<String, FakeStage>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl FakeStageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, program: &str, stage: FakeStage) -> Self {
        self.stages.insert(program.to_string(), stage);
        self
    }

    pub fn with_output(self, program: &str, std_out: impl Into<Vec<u8>>, status_code: i32) -> Self {
        self.with_stage(
            program,
            FakeStage::Output {
                std_out: std_out.into(),
                status_code,
            },
        )
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl StageBackend for FakeStageBackend {
    fn run_stage<'a>(
        &'a self,
        argv: &'a Argv,
        input: Option<&'a [u8]>,
        timeout: Option<Duration>,
        env: &'a EnvOverrides,
    ) -> StageFuture<'a> {
        Box::pin(async move {
            self.invocations.lock().unwrap().push(Invocation {
                argv: argv.clone(),
                input: input.map(<[u8]>::to_vec),
                timeout,
                env: env.clone(),
            });

            let program = argv.program().unwrap_or_default();
            let stage = self.stages.get(program).cloned().unwrap_or(FakeStage::Cat);

            let (std_out, status_code) = match stage {
                FakeStage::Cat => (input.map(<[u8]>::to_vec).unwrap_or_default(), 0),
                FakeStage::Output {
                    std_out,
                    status_code,
                } => (std_out, status_code),
                FakeStage::LaunchFailure => {
                    return Err(EnvoyError::Launch {
                        command: argv.to_string(),
                        source: io::Error::new(io::ErrorKind::NotFound, "fake launch failure"),
                    });
                }
            };

            Ok(StageResult {
                command: argv.clone(),
                std_out,
                status_code: Some(status_code),
                ..StageResult::default()
            })
        })
    }
}
