use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use super::aggregate::Aggregate;
use super::engine::StateCommit;

// ============================================================================
// Test Fixtures - minimal aggregate for exercising the generic engine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorState {
    Closed,
    Open,
    Alarmed,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorEvent {
    Open,
    Close,
    Reset,
}

impl fmt::Display for DoorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub struct Door {
    pub id: Uuid,
    pub version: i64,
    pub state: DoorState,
    pub commits: Vec<StateCommit<DoorState, DoorEvent>>,
}

impl Door {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            state: DoorState::Closed,
            commits: Vec::new(),
        }
    }
}

impl Aggregate for Door {
    type State = DoorState;
    type Event = DoorEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn current_state(&self) -> DoorState {
        self.state
    }

    fn commit_state(&mut self, commit: StateCommit<DoorState, DoorEvent>) {
        self.state = commit.to();
        self.commits.push(commit);
    }
}

/// Collaborator with a scripted answer and call counters
pub struct Keypad {
    accept: AtomicBool,
    checks: AtomicUsize,
    rings: AtomicUsize,
}

impl Keypad {
    pub fn accepting(accept: bool) -> Self {
        Self {
            accept: AtomicBool::new(accept),
            checks: AtomicUsize::new(0),
            rings: AtomicUsize::new(0),
        }
    }

    pub fn check_code(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.accept.load(Ordering::SeqCst)
    }

    pub fn ring(&self) {
        self.rings.fetch_add(1, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn rings(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }
}
