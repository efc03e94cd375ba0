//! The top-level context: every piece of FTL state reachable from one
//! struct, owned exclusively by the worker (spec.md §9 "global mutable
//! state" design note).

use crate::cmt::Cmt;
use crate::constants::*;
use crate::geometry::{Geometry, NandTiming};
use crate::line::LineType;
use crate::line_manager::LineManager;
use crate::maptables::{Gtd, MapTable};
use crate::request::{Opcode, Request};
use crate::stats::Stats;
use crate::write_pointer::WritePointer;
use std::time::Instant;

pub struct Device {
    pub(crate) geo: Geometry,
    pub(crate) timing: NandTiming,
    pub(crate) lines: LineManager,
    pub(crate) maptbl: MapTable,
    pub(crate) gtd: Gtd,
    pub(crate) cmt: Cmt,
    pub(crate) data_wp: WritePointer,
    pub(crate) trans_wp: WritePointer,
    pub(crate) stats: Stats,
    pub(crate) ents_per_pg: u64,
    pub(crate) gc_thres_lines: u32,
    pub(crate) gc_thres_lines_high: u32,
    pub(crate) enable_gc_delay: bool,
    clock_base: Instant,
}

impl Device {
    pub fn new(geo: Geometry) -> Self {
        let tt_lines = geo.tt_lines() as f64;
        let gc_thres_lines = ((1.0 - GC_THRES_PCENT) * tt_lines) as u32;
        let gc_thres_lines_high = ((1.0 - GC_THRES_PCENT_HIGH) * tt_lines) as u32;
        let tt_cmt_size = (geo.tt_blks() / 2).max(1) as usize;
        let tt_tvpns = (geo.tt_pgs() / ENTS_PER_PG).max(1);

        let mut lines = LineManager::new(geo);
        let data_wp = WritePointer::new(&geo, &mut lines, LineType::Data);
        let trans_wp = WritePointer::new(&geo, &mut lines, LineType::Trans);

        Device {
            geo,
            timing: NandTiming::new(geo),
            lines,
            maptbl: MapTable::new(geo.tt_pgs()),
            gtd: Gtd::new(tt_tvpns),
            cmt: Cmt::new(tt_cmt_size),
            data_wp,
            trans_wp,
            stats: Stats::new(),
            ents_per_pg: ENTS_PER_PG,
            gc_thres_lines,
            gc_thres_lines_high,
            enable_gc_delay: ENABLE_GC_DELAY,
            clock_base: Instant::now(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geo
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn line_manager(&self) -> &LineManager {
        &self.lines
    }

    pub fn maptbl(&self) -> &MapTable {
        &self.maptbl
    }

    pub fn gtd(&self) -> &Gtd {
        &self.gtd
    }

    pub fn cmt(&self) -> &Cmt {
        &self.cmt
    }

    /// Processes one request end to end, filling in `reqlat` and bumping
    /// `expire_time` (spec.md §6). Runs background GC afterward. Returns
    /// `false` for an unknown opcode, which the caller must silently drop
    /// rather than enqueue to the completion ring (spec.md §7).
    pub fn process_request(&mut self, req: &mut Request) -> bool {
        let stime = if req.stime == 0 { self.monotonic_now() } else { req.stime };
        req.reqlat = match req.opcode {
            Opcode::Read => self.ssd_read(req.slba, req.nlb, stime),
            Opcode::Write => self.ssd_write(req.slba, req.nlb, stime),
            Opcode::Dsm => 0,
            Opcode::Unknown => {
                log::warn!("dropping request with unknown opcode");
                return false;
            }
        };
        req.expire_time += req.reqlat;
        self.background_gc();
        true
    }

    pub(crate) fn background_gc(&mut self) {
        if self.lines.free_line_cnt() as u32 <= self.gc_thres_lines {
            self.stats.record_gc_background();
            self.do_gc(false);
        }
    }

    pub(crate) fn lpn_range(&self, slba: u64, nlb: u64) -> (u64, u64) {
        let sectors_per_pg = self.geo.sectors_per_pg as u64;
        let start_lpn = slba / sectors_per_pg;
        let end_lpn = (slba + nlb - 1) / sectors_per_pg;
        (start_lpn, end_lpn)
    }

    /// Monotonic nanosecond clock source (spec.md §6), measured against
    /// `clock_base` rather than the wall clock so it can never regress
    /// across an NTP step. Substituted whenever a request arrives with
    /// `stime == 0`.
    fn monotonic_now(&self) -> u64 {
        self.clock_base.elapsed().as_nanos() as u64
    }
}
