//! Request dispatch over the candidate × version plan
//!
//! The plan is flattened up front into an ordered list of attempts. Each
//! attempt moves from `Pending` to exactly one of `Skipped`, `Succeeded` or
//! `Aborted`; the driver stops at the first attempt that does not skip.

use super::catalog::{ModelCandidate, SessionCache};
use super::classify::{AbortKind, Classification, ClassifiedOutcome, classify};
use super::gemini::GenerateRequest;
use super::transport::InferenceTransport;

/// API versions tried for every candidate, primary first
pub const DEFAULT_API_VERSIONS: &[&str] = &["v1beta", "v1"];

/// One (candidate, api-version) coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: String,
    pub version: String,
}

/// Lifecycle of an attempt within one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Not issued (yet, or ever, if an earlier attempt ended the call)
    Pending,
    Skipped,
    Succeeded,
    Aborted,
}

impl AttemptState {
    /// State reached by a pending attempt once its outcome is known
    #[must_use]
    pub const fn after(outcome: &ClassifiedOutcome) -> Self {
        match outcome {
            ClassifiedOutcome::Success(_) => Self::Succeeded,
            ClassifiedOutcome::SkipVersion => Self::Skipped,
            ClassifiedOutcome::Abort(_) => Self::Aborted,
        }
    }

    /// Whether this state ends the call
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted)
    }
}

/// An attempt with its final state and diagnostic reason
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: Attempt,
    pub state: AttemptState,
    pub reason: Option<String>,
}

/// How a call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A model answered
    Succeeded { model: String, text: String },
    /// A fatal classification stopped the call
    Aborted(AbortKind),
    /// Every attempt skipped
    Exhausted,
}

/// Outcome plus the full plan with per-attempt states
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub attempts: Vec<AttemptRecord>,
}

impl DispatchReport {
    /// Number of requests actually sent
    #[must_use]
    pub fn issued(&self) -> usize {
        self.attempts
            .iter()
            .filter(|r| r.state != AttemptState::Pending)
            .count()
    }
}

/// Flatten candidates × versions, candidate-major
#[must_use]
pub fn plan<S: AsRef<str>>(candidates: &[ModelCandidate], versions: &[S]) -> Vec<Attempt> {
    candidates
        .iter()
        .flat_map(|c| {
            versions.iter().map(move |v| Attempt {
                model: c.id.clone(),
                version: v.as_ref().to_string(),
            })
        })
        .collect()
}

/// Drives attempts against a transport and records success in the session cache
pub struct Dispatcher<'a> {
    transport: &'a dyn InferenceTransport,
    cache: &'a SessionCache,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub const fn new(transport: &'a dyn InferenceTransport, cache: &'a SessionCache) -> Self {
        Self { transport, cache }
    }

    /// Run the plan until the first success or abort
    ///
    /// Sends at most `candidates.len() * versions.len()` requests, strictly
    /// one after another.
    pub async fn dispatch<S: AsRef<str> + Sync>(
        &self,
        request: &GenerateRequest,
        candidates: &[ModelCandidate],
        versions: &[S],
    ) -> DispatchReport {
        let planned = plan(candidates, versions);
        let mut attempts = Vec::with_capacity(planned.len());
        let mut remaining = planned.into_iter();
        let mut outcome = DispatchOutcome::Exhausted;

        for attempt in remaining.by_ref() {
            let raw = self
                .transport
                .generate(&attempt.version, &attempt.model, request)
                .await;
            let Classification {
                outcome: classified,
                reason,
            } = classify(&raw);
            let state = AttemptState::after(&classified);

            let terminal = match classified {
                ClassifiedOutcome::SkipVersion => {
                    tracing::debug!(
                        model = %attempt.model,
                        version = %attempt.version,
                        reason = %reason,
                        "attempt skipped"
                    );
                    None
                }
                ClassifiedOutcome::Success(text) => {
                    tracing::info!(model = %attempt.model, version = %attempt.version, "model answered");
                    self.cache.record_success(&attempt.model).await;
                    Some(DispatchOutcome::Succeeded {
                        model: attempt.model.clone(),
                        text,
                    })
                }
                ClassifiedOutcome::Abort(kind) => {
                    tracing::warn!(
                        model = %attempt.model,
                        version = %attempt.version,
                        ?kind,
                        reason = %reason,
                        "call aborted"
                    );
                    Some(DispatchOutcome::Aborted(kind))
                }
            };

            attempts.push(AttemptRecord {
                attempt,
                state,
                reason: Some(reason),
            });

            if let Some(terminal) = terminal {
                outcome = terminal;
                break;
            }
        }

        if outcome == DispatchOutcome::Exhausted {
            tracing::warn!(attempts = attempts.len(), "all candidates exhausted");
        }

        attempts.extend(remaining.map(|attempt| AttemptRecord {
            attempt,
            state: AttemptState::Pending,
            reason: None,
        }));

        DispatchReport { outcome, attempts }
    }
}
