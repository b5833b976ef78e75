//! Observable lifecycle phase of a streaming provider

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of a streaming provider's child process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPhase {
    /// No child has been launched yet
    NotStarted,
    /// Child launched, no init event seen
    Starting,
    /// Child announced readiness or finished a reply
    Ready,
    /// A user turn is written and the reply is being collected
    AwaitingReply,
    /// Child exited or was stopped
    Exited,
}

impl ProviderPhase {
    const fn to_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Starting => 1,
            Self::Ready => 2,
            Self::AwaitingReply => 3,
            Self::Exited => 4,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Ready,
            3 => Self::AwaitingReply,
            4 => Self::Exited,
            _ => Self::NotStarted,
        }
    }
}

/// Shared cell holding the current phase
///
/// Written by the provider and, for the `Starting -> Ready` edge, by the
/// stdout reader task.
#[derive(Debug, Clone)]
pub struct PhaseCell(Arc<AtomicU8>);

impl Default for PhaseCell {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(ProviderPhase::NotStarted.to_u8())))
    }
}

impl PhaseCell {
    /// Current phase
    #[must_use]
    pub fn get(&self) -> ProviderPhase {
        ProviderPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Overwrite the phase
    pub fn set(&self, phase: ProviderPhase) {
        self.0.store(phase.to_u8(), Ordering::SeqCst);
    }

    /// Move `Starting` to `Ready`; any other phase is left alone
    pub fn mark_ready(&self) {
        let _ = self.0.compare_exchange(
            ProviderPhase::Starting.to_u8(),
            ProviderPhase::Ready.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
