//! Garbage collection for data and translation blocks (spec.md §4.7).

use std::collections::HashSet;

use crate::device::Device;
use crate::geometry::{NandCmd, Ppa};
use crate::line::LineType;
use crate::page::PageStatus;

impl Device {
    /// `select_victim(force)` (spec.md §4.7): peeks the victim heap top;
    /// refuses a line with too little to reclaim unless forced.
    fn select_victim(&mut self, force: bool) -> Option<u32> {
        let top = self.lines.peek_victim()?;
        if !force {
            let pgs_per_line = self.geo.pgs_per_line() as u32;
            if self.lines.line(top).ipc < pgs_per_line / 8 {
                return None;
            }
        }
        self.lines.pop_victim()
    }

    /// `do_gc(force)` (spec.md §4.7). Returns whether a victim was found
    /// and cleaned.
    pub(crate) fn do_gc(&mut self, force: bool) -> bool {
        let victim_id = match self.select_victim(force) {
            Some(id) => id,
            None => return false,
        };
        let kind = self.lines.line(victim_id).kind;
        let mut seen_tvpns: HashSet<u64> = HashSet::new();

        for (ch, lun) in self.lines.luns_for_line() {
            let block_ppa = Ppa {
                ch,
                lun,
                pl: 0,
                blk: victim_id,
                pg: 0,
                sec: 0,
            };
            match kind {
                LineType::Data => self.clean_one_data_block(&block_ppa, &mut seen_tvpns),
                LineType::Trans => self.clean_one_trans_block(&block_ppa),
                LineType::None => unreachable!("victim line has no stream type"),
            }
            self.lines.mark_block_free(&block_ppa);
            if self.enable_gc_delay {
                self.timing.advance_status(&block_ppa, NandCmd::Erase, 0);
            }
            self.timing.mark_gc_endtime(&block_ppa);
        }

        self.lines.mark_line_free(victim_id);
        true
    }

    /// `clean_one_data_block(blockPPA)` (spec.md §4.7). `seen_tvpns` is
    /// shared across every block of one `do_gc` invocation so repeated
    /// mappings into the same translation page batch into one read+write
    /// pair instead of one per page (spec.md §8 scenario 6).
    fn clean_one_data_block(&mut self, block_ppa: &Ppa, seen_tvpns: &mut HashSet<u64>) {
        for pg in 0..self.geo.pgs_per_blk {
            let ppa = Ppa {
                pg,
                ..*block_ppa
            };
            if self.lines.block(&ppa).pages[pg as usize].status != PageStatus::Valid {
                continue;
            }
            self.timing.advance_status(&ppa, NandCmd::Read, 0);

            let idx = self.geo.ppa2pgidx(&ppa);
            let lpn = self.maptbl.get_rmap_ent(idx);
            let mapped = self.maptbl.get_maptbl_ent(lpn);
            if mapped != ppa {
                log::warn!("data block contains translation page at {ppa:?}");
                continue;
            }

            let new_ppa = self.data_wp.current_ppa();
            self.maptbl.set_maptbl_ent(lpn, new_ppa);
            let new_idx = self.geo.ppa2pgidx(&new_ppa);
            self.maptbl.set_rmap_ent(new_idx, lpn);
            self.lines.mark_page_valid(&new_ppa);
            self.data_wp.advance(&self.geo, &mut self.lines);
            self.timing.advance_status(&new_ppa, NandCmd::Write, 0);

            if self.cmt.peek(lpn).is_some() {
                self.cmt.mark_dirty(lpn, new_idx);
            } else {
                let tvpn = lpn / self.ents_per_pg;
                if seen_tvpns.insert(tvpn) {
                    let old_gtd_ppa = self.gtd.get(tvpn);
                    if old_gtd_ppa.is_unmapped() {
                        self.translation_page_new_write(tvpn, 0);
                    } else {
                        self.translation_page_read(&old_gtd_ppa, 0);
                        self.translation_page_write(&old_gtd_ppa, 0);
                    }
                }
            }
        }
    }

    /// `clean_one_trans_block(blockPPA)` (spec.md §4.7).
    fn clean_one_trans_block(&mut self, block_ppa: &Ppa) {
        for pg in 0..self.geo.pgs_per_blk {
            let ppa = Ppa {
                pg,
                ..*block_ppa
            };
            if self.lines.block(&ppa).pages[pg as usize].status != PageStatus::Valid {
                continue;
            }
            self.timing.advance_status(&ppa, NandCmd::Read, 0);

            let idx = self.geo.ppa2pgidx(&ppa);
            let tvpn = self.maptbl.get_rmap_ent(idx);
            debug_assert_eq!(self.gtd.get(tvpn), ppa, "GTD does not point back to this trans page");
            self.gc_translation_page_write(tvpn, 0);
        }
    }

    /// `gc_translation_page_write` (spec.md §4.7, open question in §9):
    /// unlike `translation_page_write`, does NOT invalidate the old PPA —
    /// the enclosing `do_gc` erases the whole block right after.
    fn gc_translation_page_write(&mut self, tvpn: u64, stime: u64) -> u64 {
        let new_ppa = self.trans_wp.current_ppa();
        self.gtd.set(tvpn, new_ppa);
        let new_idx = self.geo.ppa2pgidx(&new_ppa);
        self.maptbl.set_rmap_ent(new_idx, tvpn);
        self.lines.mark_page_valid(&new_ppa);
        self.trans_wp.advance(&self.geo, &mut self.lines);
        self.stats.record_trans_page_write();
        self.timing.advance_status(&new_ppa, NandCmd::Write, stime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    /// One channel, one LUN, 2 pages/block, 3 blocks/plane => 3 lines of
    /// 2 pages each, small enough to fill and force GC deterministically.
    fn gc_device() -> Device {
        Device::new(Geometry::new(1, 1, 3, 2))
    }

    #[test]
    fn forced_gc_erases_the_victim_and_returns_it_to_free() {
        let mut dev = gc_device();
        // Fill every page of every free line via distinct LPN writes,
        // each sector range mapping to one LPN (sectors_per_pg == 8).
        for i in 0..4u64 {
            dev.ssd_write(i * 8, 8, 1 + i);
        }
        // Overwrite lpn 0 so its original line has one invalid page and
        // becomes a victim candidate once retired.
        dev.ssd_write(0, 8, 10);

        let free_before = dev.line_manager().free_line_cnt();
        let ran = dev.do_gc(true);
        assert!(ran);
        assert!(dev.line_manager().free_line_cnt() > free_before);
    }

    #[test]
    fn select_victim_refuses_low_ipc_line_unless_forced() {
        let mut dev = gc_device();
        // No victims exist yet; neither forced nor background GC should
        // find anything to clean.
        assert!(!dev.do_gc(false));
        assert!(!dev.do_gc(true));
    }
}
