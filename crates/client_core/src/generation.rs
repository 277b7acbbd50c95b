//! Last-request-wins bookkeeping.
//!
//! Each operation takes a [`Ticket`] before it suspends on the network and
//! may only commit its result while that ticket is still current. Issuing a
//! newer ticket supersedes every older one; retiring the counter supersedes
//! all of them for good.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: u64,
    retired: bool,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.retired && ticket.0 == self.current
    }

    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}
