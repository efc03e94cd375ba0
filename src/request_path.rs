//! Read/write entry points and translation-page I/O (spec.md §4.5, §4.6).

use crate::cmt::CmtEntry;
use crate::constants::INVALID_LPN;
use crate::device::Device;
use crate::geometry::{NandCmd, Ppa};
use crate::page::PageStatus;

impl Device {
    /// `translation_page_read` (spec.md §4.6): charges a NAND read on
    /// `ppa`'s LUN. Content is not modelled.
    pub(crate) fn translation_page_read(&mut self, ppa: &Ppa, stime: u64) -> u64 {
        self.stats.record_trans_page_read();
        self.timing.advance_status(ppa, NandCmd::Read, stime)
    }

    /// `translation_page_new_write` (spec.md §4.6): used when `tvpn` has
    /// no prior on-flash page.
    pub(crate) fn translation_page_new_write(&mut self, tvpn: u64, stime: u64) -> u64 {
        let ppa = self.trans_wp.current_ppa();
        self.gtd.set(tvpn, ppa);
        let idx = self.geo.ppa2pgidx(&ppa);
        self.maptbl.set_rmap_ent(idx, tvpn);
        self.lines.mark_page_valid(&ppa);
        self.trans_wp.advance(&self.geo, &mut self.lines);
        self.stats.record_trans_page_write();
        self.timing.advance_status(&ppa, NandCmd::Write, stime)
    }

    /// `translation_page_write` (spec.md §4.6): used on dirty CMT
    /// eviction and during data-block GC for an uncached LPN. Invalidates
    /// `old_ppa` before relocating (unlike `gc_translation_page_write`).
    pub(crate) fn translation_page_write(&mut self, old_ppa: &Ppa, stime: u64) -> u64 {
        let old_idx = self.geo.ppa2pgidx(old_ppa);
        let tvpn = self.maptbl.get_rmap_ent(old_idx);
        self.lines.mark_page_invalid(old_ppa);
        self.maptbl.set_rmap_ent(old_idx, INVALID_LPN);

        let new_ppa = self.trans_wp.current_ppa();
        self.gtd.set(tvpn, new_ppa);
        let new_idx = self.geo.ppa2pgidx(&new_ppa);
        self.maptbl.set_rmap_ent(new_idx, tvpn);
        self.lines.mark_page_valid(&new_ppa);
        self.trans_wp.advance(&self.geo, &mut self.lines);
        self.stats.record_trans_page_write();
        self.timing.advance_status(&new_ppa, NandCmd::Write, stime)
    }

    /// Writes back a dirty CMT entry evicted by `ensure_capacity_and_insert`.
    /// A fresh TVPN skips the read (nothing on flash yet); an existing
    /// TVPN is read-modify-written (spec.md §8 scenario 3: two NAND ops
    /// on the trans stream).
    pub(crate) fn handle_cmt_eviction(&mut self, evicted: Option<(u64, CmtEntry)>, stime: u64) -> u64 {
        let Some((lpn, entry)) = evicted else {
            return 0;
        };
        if !entry.dirty {
            return 0;
        }
        let tvpn = lpn / self.ents_per_pg;
        let gtd_ppa = self.gtd.get(tvpn);
        if gtd_ppa.is_unmapped() {
            self.translation_page_new_write(tvpn, stime)
        } else {
            let read_lat = self.translation_page_read(&gtd_ppa, stime);
            let write_lat = self.translation_page_write(&gtd_ppa, stime);
            read_lat.max(write_lat)
        }
    }

    /// `process_translation_page_write(lpn)` (spec.md §4.5 write path,
    /// open question in §9: a fresh TVPN inserts `(lpn, UNMAPPED)` and
    /// returns without a translation-page read; the write path below
    /// relies on the CMT entry already being present to update it).
    pub(crate) fn process_translation_page_write(&mut self, lpn: u64, stime: u64) -> u64 {
        let tvpn = lpn / self.ents_per_pg;
        let gtd_ppa = self.gtd.get(tvpn);
        if gtd_ppa.is_unmapped() {
            let evicted = self.cmt.ensure_capacity_and_insert(lpn, crate::constants::UNMAPPED, false);
            self.handle_cmt_eviction(evicted, stime)
        } else {
            let read_lat = self.translation_page_read(&gtd_ppa, stime);
            let mapped = self.maptbl.get_maptbl_ent(lpn);
            let ppn = if mapped.is_unmapped() {
                crate::constants::UNMAPPED
            } else {
                self.geo.ppa2pgidx(&mapped)
            };
            let evicted = self.cmt.ensure_capacity_and_insert(lpn, ppn, false);
            let evict_lat = self.handle_cmt_eviction(evicted, stime);
            read_lat.max(evict_lat)
        }
    }

    /// `ssd_read` (spec.md §4.5): returns `maxlat` over every LPN in
    /// `[start_lpn, end_lpn]`, processed in ascending order.
    pub(crate) fn ssd_read(&mut self, slba: u64, nlb: u64, stime: u64) -> u64 {
        let (start_lpn, end_lpn) = self.lpn_range(slba, nlb);
        let mut maxlat = 0u64;
        for lpn in start_lpn..=end_lpn {
            let lat = self.ssd_read_one_lpn(lpn, stime);
            maxlat = maxlat.max(lat);
        }
        maxlat
    }

    fn ssd_read_one_lpn(&mut self, lpn: u64, stime: u64) -> u64 {
        let mut lat = 0u64;
        if self.cmt.hit(lpn) {
            self.stats.record_cmt_hit();
        } else {
            self.stats.record_cmt_miss();
            let tvpn = lpn / self.ents_per_pg;
            let gtd_ppa = self.gtd.get(tvpn);
            if !gtd_ppa.is_unmapped() {
                lat = lat.max(self.translation_page_read(&gtd_ppa, stime));
            }
            let mapped = self.maptbl.get_maptbl_ent(lpn);
            let ppn = if mapped.is_unmapped() {
                crate::constants::UNMAPPED
            } else {
                self.geo.ppa2pgidx(&mapped)
            };
            let evicted = self.cmt.ensure_capacity_and_insert(lpn, ppn, false);
            lat = lat.max(self.handle_cmt_eviction(evicted, stime));
            if !mapped.is_unmapped() {
                // Serialise the data read against the translation-page
                // read on the same LUN by taking the max next_avail
                // before issuing it (spec.md §4.5).
                if !gtd_ppa.is_unmapped() {
                    let trans_clock = self.timing.lun(&gtd_ppa).next_avail;
                    let data_clock = self.timing.lun(&mapped).next_avail;
                    let sync = trans_clock.max(data_clock);
                    self.timing.force_next_avail(&mapped, sync);
                }
            }
        }

        let ppa = self.maptbl.get_maptbl_ent(lpn);
        if ppa.is_unmapped() {
            return lat;
        }
        let status = self.lines.block(&ppa).pages[ppa.pg as usize].status;
        if status != PageStatus::Valid {
            return lat;
        }
        lat.max(self.timing.advance_status(&ppa, NandCmd::Read, stime))
    }

    /// `ssd_write` (spec.md §4.5): forced GC drain, then each LPN applied
    /// in ascending order.
    pub(crate) fn ssd_write(&mut self, slba: u64, nlb: u64, stime: u64) -> u64 {
        while self.lines.free_line_cnt() as u32 <= self.gc_thres_lines_high {
            self.stats.record_gc_forced();
            if !self.do_gc(true) {
                break;
            }
        }

        let (start_lpn, end_lpn) = self.lpn_range(slba, nlb);
        let mut maxlat = 0u64;
        for lpn in start_lpn..=end_lpn {
            let lat = self.ssd_write_one_lpn(lpn, stime);
            maxlat = maxlat.max(lat);
        }
        maxlat
    }

    fn ssd_write_one_lpn(&mut self, lpn: u64, stime: u64) -> u64 {
        let mut lat = 0u64;
        if self.cmt.hit(lpn) {
            self.stats.record_cmt_hit();
        } else {
            self.stats.record_cmt_miss();
            lat = lat.max(self.process_translation_page_write(lpn, stime));
        }

        let old_ppa = self.maptbl.get_maptbl_ent(lpn);
        if !old_ppa.is_unmapped() {
            self.lines.mark_page_invalid(&old_ppa);
            let old_idx = self.geo.ppa2pgidx(&old_ppa);
            self.maptbl.set_rmap_ent(old_idx, INVALID_LPN);
        }

        let new_ppa = self.data_wp.current_ppa();
        self.maptbl.set_maptbl_ent(lpn, new_ppa);
        let new_idx = self.geo.ppa2pgidx(&new_ppa);
        self.maptbl.set_rmap_ent(new_idx, lpn);
        self.cmt.mark_dirty(lpn, new_idx);
        self.lines.mark_page_valid(&new_ppa);
        self.data_wp.advance(&self.geo, &mut self.lines);
        lat.max(self.timing.advance_status(&new_ppa, NandCmd::Write, stime))
    }
}
