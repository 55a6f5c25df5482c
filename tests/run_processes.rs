#![cfg(unix)]

mod common;
use crate::common::{ConfigFileBuilder, TestResult, init_tracing, with_timeout};

use std::time::Duration;

use envoy::{Envoy, EnvoyError, RunOptions};

#[tokio::test]
async fn printf_round_trip() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("printf hello", RunOptions::new()).await?;
        assert_eq!(r.std_out(), "hello");
        assert_eq!(r.std_err(), "");
        assert_eq!(r.status_code(), Some(0));
        assert!(r.history.is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn natural_exit_code_is_reported() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("sh -c 'exit 42'", RunOptions::new()).await?;
        assert_eq!(r.status_code(), Some(42));
        assert!(r.history.is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn echo_into_grep() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("echo hello | grep hello", RunOptions::new()).await?;
        assert_eq!(r.std_out(), "hello\n");
        assert_eq!(r.status_code(), Some(0));
        assert_eq!(r.history.len(), 1);
        assert_eq!(r.history[0].command.program(), Some("echo"));
        assert_eq!(r.history[0].std_out(), "hello\n");

        let r = envoy::run("echo hello | grep nope", RunOptions::new()).await?;
        assert_eq!(r.status_code(), Some(1));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn three_stage_pipeline_keeps_order() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run(
            "printf 'b\\na\\nc\\n' | sort | head -n 2",
            RunOptions::new(),
        )
        .await?;
        assert_eq!(r.std_out(), "a\nb\n");
        assert_eq!(r.history.len(), 2);
        assert_eq!(r.history[0].command.program(), Some("printf"));
        assert_eq!(r.history[1].command.program(), Some("sort"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn data_is_fed_to_first_stage() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("tr a-z A-Z", RunOptions::new().data("shout")).await?;
        assert_eq!(r.std_out(), "SHOUT");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn inter_stage_data_is_capped_at_ten_mib() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("head -c 10485800 /dev/zero | wc -c", RunOptions::new()).await?;
        assert_eq!(r.std_out().trim(), "10485760");
        assert_eq!(r.history[0].std_out.len(), 10_485_800);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn timeout_terminates_a_slow_stage() -> TestResult {
    with_timeout(async {
        init_tracing();

        let natural = envoy::run("sleep 0", RunOptions::new()).await?;
        let r = envoy::run(
            "sleep 5",
            RunOptions::new().timeout(Duration::from_millis(200)),
        )
        .await?;

        assert!(r.last.timed_out);
        assert_ne!(r.status_code(), natural.status_code());
        assert!(r.last.duration < Duration::from_secs(5));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn timed_out_stage_still_feeds_the_next() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run(
            "sh -c 'echo partial; exec sleep 5' | cat",
            RunOptions::new().timeout(Duration::from_millis(300)),
        )
        .await?;

        assert!(r.history[0].timed_out);
        assert_eq!(r.std_out(), "partial\n");
        assert_eq!(r.status_code(), Some(0));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn timeout_holds_even_if_a_descendant_keeps_output_open() -> TestResult {
    with_timeout(async {
        init_tracing();

        let started = std::time::Instant::now();
        let r = envoy::run(
            "sh -c 'echo partial; sleep 30; echo late'",
            RunOptions::new().timeout(Duration::from_millis(200)),
        )
        .await?;

        assert!(r.last.timed_out);
        assert_eq!(r.std_out(), "partial\n");
        assert!(started.elapsed() < Duration::from_secs(5));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn env_overrides_reach_the_child() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run(
            "sh -c 'printf %s \"$ENVOY_GREETING\"'",
            RunOptions::new().env("ENVOY_GREETING", "hi there"),
        )
        .await?;
        assert_eq!(r.std_out(), "hi there");

        // Ambient variables are still visible.
        let r = envoy::run("sh -c 'test -n \"$PATH\"'", RunOptions::new()).await?;
        assert_eq!(r.status_code(), Some(0));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn config_env_is_overridden_per_call() -> TestResult {
    with_timeout(async {
        init_tracing();

        let config = ConfigFileBuilder::new()
            .env("ENVOY_A", "config")
            .env("ENVOY_B", "config")
            .build();
        let envoy = Envoy::from_config(config);

        let r = envoy
            .run(
                "sh -c 'printf %s-%s \"$ENVOY_A\" \"$ENVOY_B\"'",
                RunOptions::new().env("ENVOY_B", "call"),
            )
            .await?;
        assert_eq!(r.std_out(), "config-call");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn assignment_words_reach_env() -> TestResult {
    with_timeout(async {
        init_tracing();

        let r = envoy::run("env ENVOY_X = 1 sh -c 'printf %s $ENVOY_X'", RunOptions::new()).await?;
        assert_eq!(r.std_out(), "1");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_program_fails_to_launch() -> TestResult {
    with_timeout(async {
        init_tracing();

        let err = envoy::run("echo hi | envoy-no-such-program", RunOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EnvoyError::Launch { .. }), "got {err:?}");

        let err = envoy::run("", RunOptions::new()).await.unwrap_err();
        assert!(err.is_launch());
        Ok(())
    })
    .await
}
