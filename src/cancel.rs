//! Cooperative cancellation and per-slot request tracking.
//!
//! Every marketplace request is issued through a [`RequestSlot`]. A slot
//! permits one in-flight request: issuing a new one cancels the previous
//! request's [`CancelSignal`] and bumps the slot generation, so a response that
//! still makes it back is recognised as stale by its [`Ticket`] and dropped.

use crate::api::ApiError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cancellation handle shared between the controller and a request task.
///
/// Cloning is cheap; all clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Runs `fut` until it completes or this signal is cancelled.
    ///
    /// Cancellation drops `fut`, which aborts any HTTP request it owns, and
    /// yields [`ApiError::Cancelled`] so callers can tell it apart from a
    /// genuine failure.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::Cancelled),
            result = fut => result,
        }
    }
}

/// Independent request lanes. Each lane allows one request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Forward extensions and reset fetches.
    Down,
    /// Backward extensions.
    Up,
    /// Batched liked-status lookups.
    Liked,
}

/// Identifies one issued request. Responses carry it back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: u64,
}

#[derive(Debug)]
pub struct RequestSlot {
    slot: Slot,
    generation: u64,
    in_flight: Option<CancelSignal>,
}

impl RequestSlot {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Issues a new request, superseding whatever was in flight.
    pub fn issue(&mut self) -> (Ticket, CancelSignal) {
        self.cancel();
        let signal = CancelSignal::new();
        self.in_flight = Some(signal.clone());
        (
            Ticket {
                slot: self.slot,
                generation: self.generation,
            },
            signal,
        )
    }

    /// Cancels the in-flight request, if any. Returns whether one was pending.
    ///
    /// The generation moves on either way, so nothing issued before this call
    /// can settle afterwards.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.in_flight.take() {
            Some(signal) => {
                signal.cancel();
                tracing::debug!(slot = ?self.slot, generation = self.generation, "Cancelled in-flight request");
                true
            }
            None => false,
        }
    }

    /// Whether a response for `ticket` is the current one for this slot.
    pub fn accepts(&self, ticket: Ticket) -> bool {
        ticket.slot == self.slot && ticket.generation == self.generation && self.is_pending()
    }

    /// Clears the in-flight marker if `ticket` is current. Returns whether it was.
    pub fn settle(&mut self, ticket: Ticket) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }
}
