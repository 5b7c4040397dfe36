use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;
use super::aggregate::Aggregate;
use super::transition::{Transition, TransitionTable};

// ============================================================================
// State Machine Engine
// ============================================================================
//
// Given the current state and an event:
// 1. Look up the event's candidates whose from-set contains the state
// 2. Evaluate guards in declaration order, each at most once
// 3. Commit the first candidate whose guard passes (or has no guard)
// 4. Run its hook with the new state already committed
//
// Anything else leaves the aggregate untouched. The engine is synchronous,
// holds no locks and never retries.
//
// ============================================================================

/// A state change decided by the engine.
///
/// Fields are private and there is no public constructor, so an aggregate
/// can only receive a commit from `Engine::fire`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCommit<S, E> {
    from: S,
    to: S,
    event: E,
    committed_at: DateTime<Utc>,
}

impl<S: Copy, E: Copy> StateCommit<S, E> {
    fn new(from: S, to: S, event: E) -> Self {
        Self {
            from,
            to,
            event,
            committed_at: Utc::now(),
        }
    }

    pub fn from(&self) -> S {
        self.from
    }

    pub fn to(&self) -> S {
        self.to
    }

    pub fn event(&self) -> E {
        self.event
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }
}

/// Why a fire left the state unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoOpReason {
    /// No candidate for this event leaves the current state
    NoCandidate,
    /// Candidates exist but every guard returned false
    GuardRejected,
}

impl NoOpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoOpReason::NoCandidate => "no_candidate",
            NoOpReason::GuardRejected => "guard_rejected",
        }
    }
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single fire
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome<S> {
    Transitioned { from: S, to: S },
    Unchanged { state: S, reason: NoOpReason },
}

impl<S: Copy> TransitionOutcome<S> {
    pub fn is_transitioned(&self) -> bool {
        matches!(self, TransitionOutcome::Transitioned { .. })
    }

    /// State after the fire
    pub fn state(&self) -> S {
        match self {
            TransitionOutcome::Transitioned { to, .. } => *to,
            TransitionOutcome::Unchanged { state, .. } => *state,
        }
    }
}

/// Engine parameterized by a transition table.
///
/// `X` is the collaborator context (external services, notifier) handed to
/// guards and hooks.
pub struct Engine<A: Aggregate, X: ?Sized> {
    table: TransitionTable<A, X>,
    metrics: Option<Arc<Metrics>>,
}

impl<A: Aggregate, X: ?Sized> Engine<A, X> {
    pub fn new(table: TransitionTable<A, X>) -> Self {
        Self { table, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn table(&self) -> &TransitionTable<A, X> {
        &self.table
    }

    /// Events with at least one candidate from the aggregate's current state
    pub fn permitted_events(&self, aggregate: &A) -> Vec<A::Event> {
        self.table.permitted_events(aggregate.current_state())
    }

    /// Fire an event against the aggregate. At most one transition is applied.
    pub fn fire(&self, aggregate: &mut A, event: A::Event, ctx: &X) -> TransitionOutcome<A::State> {
        let started = Instant::now();
        let outcome = self.select_and_apply(aggregate, event, ctx);

        if let Some(metrics) = &self.metrics {
            let event_label = event.to_string();
            match outcome {
                TransitionOutcome::Transitioned { from, to } => {
                    metrics.record_transition(&event_label, &from.to_string(), &to.to_string());
                }
                TransitionOutcome::Unchanged { state, reason } => {
                    metrics.record_noop(&event_label, &state.to_string(), reason.as_str());
                }
            }
            metrics.observe_fire(&event_label, started.elapsed().as_secs_f64());
        }

        outcome
    }

    fn select_and_apply(&self, aggregate: &mut A, event: A::Event, ctx: &X) -> TransitionOutcome<A::State> {
        let from = aggregate.current_state();
        let mut matched = false;

        for candidate in self.table.candidates_from(event, from) {
            matched = true;

            if let Some(guard) = candidate.guard() {
                let passed = guard.evaluate(aggregate, ctx);

                tracing::debug!(
                    aggregate_id = %aggregate.aggregate_id(),
                    event = %event,
                    state = %from,
                    guard = guard.name(),
                    passed = passed,
                    "Evaluated guard"
                );

                if let Some(metrics) = &self.metrics {
                    metrics.record_guard(guard.name(), passed);
                }

                if !passed {
                    continue;
                }
            }

            self.apply(aggregate, candidate, event, from, ctx);
            return TransitionOutcome::Transitioned { from, to: candidate.to_state() };
        }

        let reason = if matched {
            NoOpReason::GuardRejected
        } else {
            NoOpReason::NoCandidate
        };

        tracing::debug!(
            aggregate_id = %aggregate.aggregate_id(),
            event = %event,
            state = %from,
            reason = %reason,
            "Event left state unchanged"
        );

        TransitionOutcome::Unchanged { state: from, reason }
    }

    fn apply(
        &self,
        aggregate: &mut A,
        candidate: &Transition<A, X>,
        event: A::Event,
        from: A::State,
        ctx: &X,
    ) {
        let to = candidate.to_state();
        aggregate.commit_state(StateCommit::new(from, to, event));

        tracing::info!(
            aggregate_id = %aggregate.aggregate_id(),
            event = %event,
            from = %from,
            to = %to,
            "Committed transition"
        );

        if let Some(hook) = candidate.hook() {
            tracing::debug!(
                aggregate_id = %aggregate.aggregate_id(),
                hook = hook.name(),
                "Running post-transition hook"
            );
            hook.run(aggregate, ctx);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
