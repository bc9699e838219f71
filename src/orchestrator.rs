use std::future::Future;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{Agent, AgentError};
use crate::config::Config;
use crate::console::Console;
use crate::types::{CandidateRecord, ExtractionReport, ExtractionRequest, ValidationOutcome};

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("extraction failed on attempt {attempt}: {source}")]
    Extraction {
        attempt: u32,
        #[source]
        source: AgentError,
    },

    #[error("extraction timed out after {seconds}s on attempt {attempt}")]
    Timeout { attempt: u32, seconds: u64 },

    #[error("validation failed on attempt {attempt}: {source}")]
    Validation {
        attempt: u32,
        #[source]
        source: AgentError,
    },

    #[error("no valid record after {attempts} attempts; last rejection:\n{last_error}")]
    AttemptsExhausted {
        attempts: u32,
        last_error: String,
        last_candidate: Box<CandidateRecord>,
    },

    #[error("cancelled during attempt {attempt}")]
    Cancelled { attempt: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            call_timeout: config.call_timeout(),
        }
    }
}

/// What the driver carries between attempts; nothing else survives a round.
#[derive(Debug, Default)]
struct LoopState {
    attempt: u32,
    last_error: Option<String>,
    last_candidate: Option<CandidateRecord>,
}

/// Drives extractor → validator rounds until a record is accepted, the
/// attempt ceiling is hit, or the shutdown future resolves.
pub struct Orchestrator<E, V> {
    extractor: E,
    validator: V,
    policy: RetryPolicy,
}

impl<E, V> Orchestrator<E, V>
where
    E: Agent<Input = ExtractionRequest, Output = CandidateRecord>,
    V: Agent<Input = CandidateRecord, Output = ValidationOutcome>,
{
    pub fn new(extractor: E, validator: V, policy: RetryPolicy) -> Self {
        Self {
            extractor,
            validator,
            policy,
        }
    }

    pub async fn run<S>(&self, document: &Path, shutdown: S) -> Result<ExtractionReport, LoopError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut state = LoopState::default();
        let run_id = Uuid::new_v4();
        info!(%run_id, "Extraction loop: starting on {}", document.display());

        loop {
            if state.attempt >= self.policy.max_attempts {
                warn!(%run_id, "Extraction loop: giving up after {} attempts", state.attempt);
                return Err(LoopError::AttemptsExhausted {
                    attempts: state.attempt,
                    last_error: state.last_error.unwrap_or_default(),
                    last_candidate: Box::new(state.last_candidate.unwrap_or_default()),
                });
            }
            state.attempt += 1;
            let attempt = state.attempt;

            let request = ExtractionRequest {
                document: document.to_path_buf(),
                prior_error: state.last_error.take(),
            };
            Console::display_attempt(attempt, self.policy.max_attempts, request.prior_error.is_some());
            info!(%run_id, attempt, "Extractor: processing {}", document.display());

            let extracted = tokio::select! {
                biased;
                _ = &mut shutdown => return Err(LoopError::Cancelled { attempt }),
                result = timeout(self.policy.call_timeout, self.extractor.execute(&request)) => result,
            };
            let candidate = match extracted {
                Err(_) => {
                    return Err(LoopError::Timeout {
                        attempt,
                        seconds: self.policy.call_timeout.as_secs(),
                    });
                }
                Ok(Err(source)) => return Err(LoopError::Extraction { attempt, source }),
                Ok(Ok(candidate)) => candidate,
            };

            info!(%run_id, attempt, "Validator: checking candidate");
            let outcome = self
                .validator
                .execute(&candidate)
                .await
                .map_err(|source| LoopError::Validation { attempt, source })?;

            match outcome {
                ValidationOutcome::Accepted(record) => {
                    info!(%run_id, attempt, "Extraction loop: record accepted");
                    return Ok(ExtractionReport {
                        run_id,
                        document: document.to_path_buf(),
                        attempts: attempt,
                        record,
                        completed_at: Utc::now().to_rfc3339(),
                    });
                }
                ValidationOutcome::Rejected(rejection) => {
                    Console::display_rejection(&rejection);
                    info!(%run_id, attempt, "Validator: rejected, handing back to extractor");
                    state.last_error = Some(rejection.message());
                    state.last_candidate = Some(candidate);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agents::ValidatorAgent;
    use crate::validation::tests::valid_record;

    /// Hands out queued candidates, then the fallback once the queue is empty.
    struct ScriptedExtractor {
        script: Mutex<VecDeque<Result<CandidateRecord, AgentError>>>,
        fallback: CandidateRecord,
        seen_errors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedExtractor {
        fn new(script: Vec<Result<CandidateRecord, AgentError>>, fallback: CandidateRecord) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                seen_errors: Mutex::new(Vec::new()),
            }
        }

        fn seen_errors(&self) -> Vec<Option<String>> {
            self.seen_errors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Agent for ScriptedExtractor {
        type Input = ExtractionRequest;
        type Output = CandidateRecord;

        async fn execute(&self, input: &Self::Input) -> Result<Self::Output, AgentError> {
            self.seen_errors.lock().unwrap().push(input.prior_error.clone());
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    struct SlowExtractor;

    #[async_trait]
    impl Agent for SlowExtractor {
        type Input = ExtractionRequest;
        type Output = CandidateRecord;

        async fn execute(&self, _input: &Self::Input) -> Result<Self::Output, AgentError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(CandidateRecord::default())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            call_timeout: Duration::from_secs(30),
        }
    }

    fn short_chs_record() -> CandidateRecord {
        let mut record = valid_record(3);
        record
            .technical_data
            .insert("each_chiller_chs_temp".into(), json!([45, 45]));
        record
    }

    fn orchestrator<E>(extractor: E, max_attempts: u32) -> Orchestrator<E, ValidatorAgent>
    where
        E: Agent<Input = ExtractionRequest, Output = CandidateRecord>,
    {
        Orchestrator::new(extractor, ValidatorAgent::new(), policy(max_attempts))
    }

    #[tokio::test]
    async fn valid_first_candidate_finishes_in_one_attempt() {
        let record = valid_record(3);
        let extractor = ScriptedExtractor::new(vec![], record.clone());
        let report = orchestrator(extractor, 5)
            .run(Path::new("audit.pdf"), std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.record, record);
    }

    #[tokio::test]
    async fn rejection_message_reaches_the_next_attempt() {
        let extractor = ScriptedExtractor::new(vec![Ok(short_chs_record())], valid_record(3));
        let driver = orchestrator(extractor, 5);
        let report = driver
            .run(Path::new("audit.pdf"), std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);

        let seen = driver.extractor.seen_errors();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], None);
        let guidance = seen[1].as_deref().unwrap();
        assert!(guidance.contains("Incomplete chiller data"));
        assert!(guidance.contains("each_chiller_chs_temp"));
    }

    #[tokio::test]
    async fn always_invalid_extractor_hits_the_attempt_ceiling() {
        let extractor = ScriptedExtractor::new(vec![], short_chs_record());
        let driver = orchestrator(extractor, 4);
        let err = driver
            .run(Path::new("audit.pdf"), std::future::pending::<()>())
            .await
            .unwrap_err();
        match err {
            LoopError::AttemptsExhausted {
                attempts,
                last_error,
                last_candidate,
            } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("each_chiller_chs_temp"));
                assert_eq!(*last_candidate, short_chs_record());
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(driver.extractor.seen_errors().len(), 4);
    }

    #[tokio::test]
    async fn extractor_failure_is_fatal_immediately() {
        let extractor = ScriptedExtractor::new(
            vec![Err(AgentError::Unexpected("no record".into()))],
            valid_record(3),
        );
        let driver = orchestrator(extractor, 5);
        let err = driver
            .run(Path::new("audit.pdf"), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(err, LoopError::Extraction { attempt: 1, .. }));
        assert_eq!(driver.extractor.seen_errors().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_cancels_the_loop() {
        let extractor = ScriptedExtractor::new(vec![], valid_record(3));
        let err = orchestrator(extractor, 5)
            .run(Path::new("audit.pdf"), std::future::ready(()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoopError::Cancelled { attempt: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_extractor_times_out() {
        let err = orchestrator(SlowExtractor, 5)
            .run(Path::new("audit.pdf"), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(err, LoopError::Timeout { attempt: 1, seconds: 30 }));
    }
}
