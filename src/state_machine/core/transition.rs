use std::fmt;

use super::aggregate::Aggregate;

// ============================================================================
// Transition Table - Declarative Guarded Transitions
// ============================================================================
//
// A table is pure data: for each event an ordered list of candidate
// transitions. Declaration order is evaluation order.
//
// Type Parameters:
// - `A`: The aggregate the table drives
// - `X`: The collaborator context handed to guards and hooks
//
// ============================================================================

pub type GuardFn<A, X> = fn(&A, &X) -> bool;
pub type HookFn<A, X> = fn(&A, &X);

/// Named predicate gating a candidate transition
pub struct Guard<A, X: ?Sized> {
    name: &'static str,
    check: GuardFn<A, X>,
}

impl<A, X: ?Sized> Guard<A, X> {
    pub fn new(name: &'static str, check: GuardFn<A, X>) -> Self {
        Self { name, check }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn evaluate(&self, aggregate: &A, ctx: &X) -> bool {
        (self.check)(aggregate, ctx)
    }
}

impl<A, X: ?Sized> Clone for Guard<A, X> {
    fn clone(&self) -> Self {
        Self { name: self.name, check: self.check }
    }
}

impl<A, X: ?Sized> fmt::Debug for Guard<A, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}

/// Named action run after a transition commits
pub struct Hook<A, X: ?Sized> {
    name: &'static str,
    run: HookFn<A, X>,
}

impl<A, X: ?Sized> Hook<A, X> {
    pub fn new(name: &'static str, run: HookFn<A, X>) -> Self {
        Self { name, run }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run(&self, aggregate: &A, ctx: &X) {
        (self.run)(aggregate, ctx)
    }
}

impl<A, X: ?Sized> Clone for Hook<A, X> {
    fn clone(&self) -> Self {
        Self { name: self.name, run: self.run }
    }
}

impl<A, X: ?Sized> fmt::Debug for Hook<A, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.name).finish()
    }
}

/// One candidate transition: `{from, to, guard, on_success}`
pub struct Transition<A: Aggregate, X: ?Sized> {
    from: Vec<A::State>,
    to: A::State,
    guard: Option<Guard<A, X>>,
    on_success: Option<Hook<A, X>>,
}

impl<A: Aggregate, X: ?Sized> Transition<A, X> {
    pub fn new(from: impl IntoIterator<Item = A::State>, to: A::State) -> Self {
        Self {
            from: from.into_iter().collect(),
            to,
            guard: None,
            on_success: None,
        }
    }

    pub fn guarded_by(mut self, name: &'static str, check: GuardFn<A, X>) -> Self {
        self.guard = Some(Guard::new(name, check));
        self
    }

    pub fn on_success(mut self, name: &'static str, run: HookFn<A, X>) -> Self {
        self.on_success = Some(Hook::new(name, run));
        self
    }

    pub fn from_states(&self) -> &[A::State] {
        &self.from
    }

    pub fn to_state(&self) -> A::State {
        self.to
    }

    pub fn guard(&self) -> Option<&Guard<A, X>> {
        self.guard.as_ref()
    }

    pub fn hook(&self) -> Option<&Hook<A, X>> {
        self.on_success.as_ref()
    }

    pub fn applies_to(&self, state: A::State) -> bool {
        self.from.contains(&state)
    }
}

impl<A: Aggregate, X: ?Sized> Clone for Transition<A, X> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to,
            guard: self.guard.clone(),
            on_success: self.on_success.clone(),
        }
    }
}

impl<A: Aggregate, X: ?Sized> fmt::Debug for Transition<A, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guard", &self.guard)
            .field("on_success", &self.on_success)
            .finish()
    }
}

/// Ordered event → candidates map
pub struct TransitionTable<A: Aggregate, X: ?Sized> {
    events: Vec<(A::Event, Vec<Transition<A, X>>)>,
}

impl<A: Aggregate, X: ?Sized> Default for TransitionTable<A, X> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<A: Aggregate, X: ?Sized> TransitionTable<A, X> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare candidates for an event. Declaring the same event twice
    /// appends to its list, keeping declaration order.
    pub fn event(mut self, event: A::Event, transitions: Vec<Transition<A, X>>) -> Self {
        match self.events.iter_mut().find(|(declared, _)| *declared == event) {
            Some((_, existing)) => existing.extend(transitions),
            None => self.events.push((event, transitions)),
        }
        self
    }

    /// Declared events, in declaration order
    pub fn events(&self) -> impl Iterator<Item = A::Event> + '_ {
        self.events.iter().map(|(event, _)| *event)
    }

    /// Every candidate for an event (empty when the event is undeclared)
    pub fn candidates(&self, event: A::Event) -> &[Transition<A, X>] {
        self.events
            .iter()
            .find(|(declared, _)| *declared == event)
            .map(|(_, transitions)| transitions.as_slice())
            .unwrap_or(&[])
    }

    /// Candidates whose from-set contains `state`, in declaration order
    pub fn candidates_from(
        &self,
        event: A::Event,
        state: A::State,
    ) -> impl Iterator<Item = &Transition<A, X>> + '_ {
        self.candidates(event)
            .iter()
            .filter(move |transition| transition.applies_to(state))
    }

    /// Events with at least one candidate leaving `state`. Guards are not
    /// evaluated, so a permitted event may still end as a no-op.
    pub fn permitted_events(&self, state: A::State) -> Vec<A::Event> {
        self.events
            .iter()
            .filter(|(_, transitions)| transitions.iter().any(|t| t.applies_to(state)))
            .map(|(event, _)| *event)
            .collect()
    }

    /// Every state named by the table, as source or target
    pub fn states(&self) -> Vec<A::State> {
        let mut states = Vec::new();
        for (_, transitions) in &self.events {
            for transition in transitions {
                for state in transition.from.iter().copied().chain(std::iter::once(transition.to)) {
                    if !states.contains(&state) {
                        states.push(state);
                    }
                }
            }
        }
        states
    }
}

impl<A: Aggregate, X: ?Sized> Clone for TransitionTable<A, X> {
    fn clone(&self) -> Self {
        Self { events: self.events.clone() }
    }
}

impl<A: Aggregate, X: ?Sized> fmt::Debug for TransitionTable<A, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable").field("events", &self.events).finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
