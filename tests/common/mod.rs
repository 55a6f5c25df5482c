#![allow(dead_code, unused_imports)]

pub use envoy_test_utils::builders::ConfigFileBuilder;
pub use envoy_test_utils::fake_backend::{FakeStage, FakeStageBackend, Invocation};
pub use envoy_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
