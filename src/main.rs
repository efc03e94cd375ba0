use dftl_sim::{Device, Geometry, Opcode, Request, Rings, Worker};
use log::info;

/// Minimal demo binary: no CLI, no config file (spec.md §6 "no persistent
/// state, no file formats, no CLI"). Builds a default-geometry device,
/// feeds it a handful of requests over the rings, and logs latencies.
pub fn main() {
    env_logger::init();

    let device = Device::new(Geometry::default());
    let mut worker = Worker::new(device);
    let rings = Rings::new(1, 64);

    rings.submit(0, Request::new(Opcode::Write, 0, 8, 1)).ok();
    rings.submit(0, Request::new(Opcode::Read, 0, 8, 2)).ok();
    rings.submit(0, Request::new(Opcode::Dsm, 0, 8, 3)).ok();

    for _ in 0..3 {
        worker.poll_once(&rings);
    }

    while let Some(done) = rings.take_completion(0) {
        info!("opcode={:?} slba={} reqlat={}ns", done.opcode, done.slba, done.reqlat);
    }
}
