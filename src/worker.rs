//! The single dedicated worker (spec.md §5): a plain loop owning all FTL
//! state, draining submission rings and enqueueing completions. Does not
//! suspend; the only pause is the coarse poll interval between passes
//! over an empty set of rings.

use std::time::Duration;

use crate::device::Device;
use crate::rings::Rings;

/// Coarse poll interval used only when every ring was empty on the last
/// pass, mirroring spec.md §5's "~100 ms" data-plane readiness wait.
const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct Worker {
    device: Device,
}

impl Worker {
    pub fn new(device: Device) -> Self {
        Worker { device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Drains every non-empty ring once, dequeueing exactly one request
    /// per ring per visit (spec.md §6). Returns how many requests were
    /// processed this pass.
    pub fn poll_once(&mut self, rings: &Rings) -> usize {
        let mut processed = 0;
        for i in 0..rings.num_poller() {
            if let Some(mut req) = rings.poll_one(i) {
                if self.device.process_request(&mut req) {
                    rings.complete(i, req);
                }
                processed += 1;
            }
        }
        processed
    }

    /// Runs forever, polling every ring each pass and sleeping
    /// `IDLE_POLL` whenever a whole pass found nothing. Callers that want
    /// bounded execution (tests, the demo binary) should drive
    /// `poll_once` directly instead.
    pub fn run(&mut self, rings: &Rings) -> ! {
        loop {
            if self.poll_once(rings) == 0 {
                std::thread::sleep(IDLE_POLL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::request::{Opcode, Request};

    #[test]
    fn poll_once_drains_exactly_one_request_per_ring() {
        let device = Device::new(Geometry::new(1, 1, 4, 4));
        let mut worker = Worker::new(device);
        let rings = Rings::new(1, 4);
        rings.submit(0, Request::new(Opcode::Write, 0, 8, 1)).unwrap();
        rings.submit(0, Request::new(Opcode::Write, 8, 8, 2)).unwrap();

        assert_eq!(worker.poll_once(&rings), 1);
        assert!(rings.take_completion(0).is_some());
        assert_eq!(worker.poll_once(&rings), 1);
        assert!(rings.take_completion(0).is_some());
        assert_eq!(worker.poll_once(&rings), 0);
    }

    #[test]
    fn dsm_request_completes_with_zero_latency() {
        let device = Device::new(Geometry::new(1, 1, 4, 4));
        let mut worker = Worker::new(device);
        let rings = Rings::new(1, 4);
        rings.submit(0, Request::new(Opcode::Dsm, 0, 8, 1)).unwrap();
        worker.poll_once(&rings);
        let done = rings.take_completion(0).unwrap();
        assert_eq!(done.reqlat, 0);
    }
}
