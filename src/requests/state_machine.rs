use statig::prelude::*;

use crate::flow::StepName;

/// Identifies one network call issued by a step form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    step: StepName,
}

impl RequestTicket {
    pub(crate) fn new(id: u64, step: StepName) -> Self {
        Self { id, step }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn step(&self) -> StepName {
        self.step
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    Submit(RequestTicket),
    Resolve(RequestTicket),
    Reject { ticket: RequestTicket, reason: String },
    Teardown,
}

/// Tracks the single in-flight step request.
///
/// Only the ticket handed out by the last accepted `Submit` can settle the
/// request. Anything else (a second submit while pending, a callback that
/// arrives after teardown or after a newer submit) is dropped and counted.
#[derive(Debug, Default)]
pub struct StepRequestTracker {
    pending: Option<RequestTicket>,
    settled: Option<RequestTicket>,
    last_error: Option<String>,
    resolved: u32,
    rejected: u32,
    dropped: u32,
}

impl StepRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.pending.as_ref() == Some(ticket)
    }

    fn drop_stale(&mut self, ticket: &RequestTicket) {
        self.dropped += 1;
        tracing::warn!(
            ticket = ticket.id,
            step = %ticket.step,
            pending = ?self.pending.map(|t| t.id),
            "Dropping response for a request that is no longer current"
        );
    }
}

#[state_machine(initial = "State::idle()")]
impl StepRequestTracker {
    #[state]
    fn idle(&mut self, event: &RequestEvent) -> Outcome<State> {
        match event {
            RequestEvent::Submit(ticket) => {
                self.pending = Some(*ticket);
                self.last_error = None;
                tracing::info!(ticket = ticket.id, step = %ticket.step, "Step request submitted");
                Transition(State::pending())
            }
            RequestEvent::Resolve(ticket) | RequestEvent::Reject { ticket, .. } => {
                self.drop_stale(ticket);
                Handled
            }
            RequestEvent::Teardown => Handled,
        }
    }

    #[state]
    fn pending(&mut self, event: &RequestEvent) -> Outcome<State> {
        match event {
            RequestEvent::Submit(ticket) => {
                tracing::warn!(
                    ticket = ticket.id,
                    pending = ?self.pending.map(|t| t.id),
                    "Request already in flight, ignoring submit"
                );
                Handled
            }
            RequestEvent::Resolve(ticket) => {
                if !self.is_current(ticket) {
                    self.drop_stale(ticket);
                    return Handled;
                }
                self.pending = None;
                self.settled = Some(*ticket);
                self.resolved += 1;
                tracing::info!(ticket = ticket.id, step = %ticket.step, "Step request resolved");
                Transition(State::idle())
            }
            RequestEvent::Reject { ticket, reason } => {
                if !self.is_current(ticket) {
                    self.drop_stale(ticket);
                    return Handled;
                }
                self.pending = None;
                self.settled = Some(*ticket);
                self.last_error = Some(reason.clone());
                self.rejected += 1;
                tracing::warn!(ticket = ticket.id, step = %ticket.step, reason = %reason, "Step request rejected");
                Transition(State::idle())
            }
            RequestEvent::Teardown => {
                tracing::info!(
                    ticket = ?self.pending.map(|t| t.id),
                    "Step torn down, abandoning in-flight request"
                );
                self.pending = None;
                Transition(State::idle())
            }
        }
    }
}

impl StepRequestTracker {
    pub fn pending_ticket(&self) -> Option<RequestTicket> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Last ticket that was accepted as resolved or rejected
    pub fn settled_ticket(&self) -> Option<RequestTicket> {
        self.settled
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn resolved_count(&self) -> u32 {
        self.resolved
    }

    pub fn rejected_count(&self) -> u32 {
        self.rejected
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }
}
