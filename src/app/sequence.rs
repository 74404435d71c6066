use std::collections::HashMap;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RequestKind {
    Search,
    Detail,
    Probe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub(crate) kind: RequestKind,
    pub(crate) seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RequestSequencer {
    latest: HashMap<RequestKind, u64>,
}

impl RequestSequencer {
    pub(crate) fn issue(&mut self, kind: RequestKind) -> Ticket {
        let seq = self.latest.entry(kind).or_insert(0);
        *seq += 1;
        Ticket { kind, seq: *seq }
    }

    pub(crate) fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.seq)
    }

    pub(crate) fn accept(&self, ticket: Ticket) -> bool {
        let latest = self.is_latest(ticket);
        if !latest {
            debug!(kind = ?ticket.kind, seq = ticket.seq, "dropping superseded response");
        }
        latest
    }

    pub(crate) fn invalidate(&mut self, kind: RequestKind) {
        self.issue(kind);
    }
}
