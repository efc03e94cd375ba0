//! The indexed submission/completion ring arrays the worker polls
//! (spec.md §5/§6). SPSC from the FTL's point of view: the worker is the
//! sole consumer of every `to_ftl` ring and the sole producer on every
//! `to_poller` ring.

use ftl_ring::Ring;

use crate::request::Request;

pub struct Rings {
    to_ftl: Vec<Ring<Request>>,
    to_poller: Vec<Ring<Request>>,
}

impl Rings {
    pub fn new(num_poller: usize, capacity: usize) -> Self {
        let num_poller = num_poller.max(1);
        Rings {
            to_ftl: (0..num_poller).map(|_| Ring::new(capacity)).collect(),
            to_poller: (0..num_poller).map(|_| Ring::new(capacity)).collect(),
        }
    }

    pub fn num_poller(&self) -> usize {
        self.to_ftl.len()
    }

    /// Front-end side: submit a request on ring `i`.
    pub fn submit(&self, i: usize, req: Request) -> Result<(), Request> {
        self.to_ftl[i].enqueue(req)
    }

    /// Front-end side: drain one completion off ring `i`, if any.
    pub fn take_completion(&self, i: usize) -> Option<Request> {
        self.to_poller[i].dequeue()
    }

    /// Worker side: dequeue exactly one request from ring `i`, if
    /// non-empty. A dequeue "failure" (empty ring) is simply `None` — not
    /// the same as the submission-side enqueue failure spec.md §7 treats
    /// as loggable; an empty ring is the expected steady state.
    pub fn poll_one(&self, i: usize) -> Option<Request> {
        self.to_ftl[i].dequeue()
    }

    /// Worker side: enqueue a completed request. Logs on failure
    /// (spec.md §7: "an enqueue failure on completion logs as error").
    pub fn complete(&self, i: usize, req: Request) {
        if self.to_poller[i].enqueue(req).is_err() {
            log::error!("completion ring {i} full, dropping completed request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Opcode;

    #[test]
    fn submit_then_poll_round_trips() {
        let rings = Rings::new(2, 4);
        let req = Request::new(Opcode::Read, 0, 8, 5);
        rings.submit(0, req).unwrap();
        let polled = rings.poll_one(0).unwrap();
        assert_eq!(polled.slba, 0);
        assert!(rings.poll_one(0).is_none());
        assert!(rings.poll_one(1).is_none());
    }

    #[test]
    fn complete_then_take_round_trips() {
        let rings = Rings::new(1, 4);
        let mut req = Request::new(Opcode::Write, 0, 8, 5);
        req.reqlat = 42;
        rings.complete(0, req);
        let done = rings.take_completion(0).unwrap();
        assert_eq!(done.reqlat, 42);
    }
}
