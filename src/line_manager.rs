//! Line manager: free/full FIFOs, the victim priority queue, and the
//! block/page status transitions that feed them (spec.md §4.4).

use std::collections::VecDeque;

use crate::geometry::{Geometry, Ppa};
use crate::line::{Line, LineType};
use crate::page::{Block, PageStatus};
use crate::victim_heap::VictimHeap;

pub struct LineManager {
    geo: Geometry,
    /// `blocks[lun_id][line_id]` — one block per LUN at each line's block index.
    blocks: Vec<Vec<Block>>,
    lines: Vec<Line>,
    free: VecDeque<u32>,
    full: VecDeque<u32>,
    victims: VictimHeap,
}

impl LineManager {
    pub fn new(geo: Geometry) -> Self {
        let tt_lines = geo.tt_lines();
        let tt_luns = geo.tt_luns();
        let blocks = (0..tt_luns)
            .map(|_| (0..tt_lines).map(|_| Block::new(&geo)).collect())
            .collect();
        let lines = (0..tt_lines).map(Line::new).collect();
        let free = (0..tt_lines).collect();
        LineManager {
            geo,
            blocks,
            lines,
            free,
            full: VecDeque::new(),
            victims: VictimHeap::new(),
        }
    }

    pub fn free_line_cnt(&self) -> usize {
        self.free.len()
    }

    pub fn full_line_cnt(&self) -> usize {
        self.full.len()
    }

    pub fn victim_line_cnt(&self) -> usize {
        self.victims.len()
    }

    pub fn tt_lines(&self) -> u32 {
        self.geo.tt_lines()
    }

    pub fn line(&self, id: u32) -> &Line {
        &self.lines[id as usize]
    }

    fn lun_idx(&self, ppa: &Ppa) -> usize {
        self.geo.lun_id(ppa)
    }

    pub fn block(&self, ppa: &Ppa) -> &Block {
        &self.blocks[self.lun_idx(ppa)][ppa.blk as usize]
    }

    fn block_mut(&mut self, ppa: &Ppa) -> &mut Block {
        let lun = self.lun_idx(ppa);
        &mut self.blocks[lun][ppa.blk as usize]
    }

    /// Takes a line off the free FIFO and assigns it to a stream. Returns
    /// `None` if no free line exists; the caller (the write-pointer
    /// advance) treats that as fatal resource exhaustion (spec.md §7).
    pub fn take_free_line(&mut self, kind: LineType) -> Option<u32> {
        let id = self.free.pop_front()?;
        self.lines[id as usize].kind = kind;
        Some(id)
    }

    /// Called when a stream's current block is fully written (spec.md
    /// §4.4 write-pointer advance, step 3).
    pub fn retire_written_block(&mut self, line_id: u32) {
        let pgs_per_line = self.geo.pgs_per_line() as u32;
        let vpc = self.lines[line_id as usize].vpc;
        if vpc == pgs_per_line {
            self.full.push_back(line_id);
        } else {
            self.victims.push(&mut self.lines, line_id);
        }
    }

    /// `mark_page_valid` (spec.md §4.4): FREE→VALID, bumping block and
    /// line `vpc`.
    pub fn mark_page_valid(&mut self, ppa: &Ppa) {
        let blk = self.block_mut(ppa);
        let page = &mut blk.pages[ppa.pg as usize];
        assert_eq!(page.status, PageStatus::Free, "mark_page_valid on non-free page");
        page.status = PageStatus::Valid;
        blk.vpc += 1;
        self.lines[ppa.blk as usize].vpc += 1;
    }

    /// `mark_page_invalid` (spec.md §4.4, and the resolved open question
    /// in spec.md §9): VALID→INVALID, decrementing `vpc` and bumping
    /// `ipc` on both block and line, then reconciling the line's full/
    /// victim-heap membership. The intended semantics of the source's
    /// ambiguous decrease-key call are: the new heap priority is
    /// `vpc - 1`, and `line.vpc` itself ends at `vpc - 1` — i.e. the
    /// decrement and the re-heapify use the same post-decrement value,
    /// with no separate earlier decrement.
    pub fn mark_page_invalid(&mut self, ppa: &Ppa) {
        let pgs_per_line = self.geo.pgs_per_line() as u32;
        let line_id = ppa.blk;
        let was_full = self.lines[line_id as usize].vpc == pgs_per_line;

        let blk = self.block_mut(ppa);
        let page = &mut blk.pages[ppa.pg as usize];
        assert_eq!(page.status, PageStatus::Valid, "mark_page_invalid on non-valid page");
        page.status = PageStatus::Invalid;
        blk.ipc += 1;
        blk.vpc -= 1;

        let line = &mut self.lines[line_id as usize];
        line.ipc += 1;
        line.vpc -= 1;

        if was_full {
            self.full.retain(|&id| id != line_id);
            self.victims.push(&mut self.lines, line_id);
        } else if self.lines[line_id as usize].in_heap() {
            self.victims.change_priority(&mut self.lines, line_id);
        }
        // else: the line is the active write-pointer's current line;
        // nothing else to update.
    }

    /// `mark_block_free` (spec.md §4.4): resets every page in the block,
    /// zeroes its counters, bumps `erase_cnt`. Line transition to FREE
    /// happens separately, only once every block spanning the line has
    /// been erased (driven by the GC engine).
    pub fn mark_block_free(&mut self, ppa: &Ppa) {
        self.block_mut(ppa).mark_free();
    }

    /// Zeroes the line's counters, marks it free, and pushes it onto the
    /// free FIFO. Called by GC once every block of the line is erased.
    pub fn mark_line_free(&mut self, line_id: u32) {
        let line = &mut self.lines[line_id as usize];
        line.vpc = 0;
        line.ipc = 0;
        line.kind = LineType::None;
        line.pos = 0;
        self.free.push_back(line_id);
    }

    /// Peeks the top of the victim heap without removing it.
    pub fn peek_victim(&self) -> Option<u32> {
        self.victims.peek()
    }

    /// Pops the top of the victim heap (used once GC has committed to
    /// cleaning it).
    pub fn pop_victim(&mut self) -> Option<u32> {
        self.victims.pop_min(&mut self.lines)
    }

    pub fn blocks_per_line(&self) -> u32 {
        self.geo.tt_luns()
    }

    /// All `(ch, lun)` pairs spanning a line, in a stable order.
    pub fn luns_for_line(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(self.geo.tt_luns() as usize);
        for ch in 0..self.geo.nchs {
            for lun in 0..self.geo.luns_per_ch {
                out.push((ch, lun));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> Geometry {
        Geometry::new(1, 1, 2, 4)
    }

    fn ppa(blk: u32, pg: u32) -> Ppa {
        Ppa {
            ch: 0,
            lun: 0,
            pl: 0,
            blk,
            pg,
            sec: 0,
        }
    }

    #[test]
    fn valid_then_invalid_restores_counters() {
        let mut lm = LineManager::new(geo());
        let p = ppa(0, 0);
        lm.mark_page_valid(&p);
        assert_eq!(lm.block(&p).vpc, 1);
        assert_eq!(lm.line(0).vpc, 1);
        lm.mark_page_invalid(&p);
        assert_eq!(lm.block(&p).vpc, 0);
        assert_eq!(lm.block(&p).ipc, 1);
        assert_eq!(lm.line(0).vpc, 0);
        assert_eq!(lm.line(0).ipc, 1);
    }

    #[test]
    fn invalidating_a_full_line_moves_full_to_victim_top() {
        let mut lm = LineManager::new(geo());
        let line_id = lm.take_free_line(LineType::Data).unwrap();
        for pg in 0..4 {
            lm.mark_page_valid(&ppa(line_id, pg));
        }
        lm.retire_written_block(line_id);
        assert_eq!(lm.full_line_cnt(), 1);
        assert_eq!(lm.victim_line_cnt(), 0);

        lm.mark_page_invalid(&ppa(line_id, 0));
        assert_eq!(lm.full_line_cnt(), 0);
        assert_eq!(lm.victim_line_cnt(), 1);
        assert_eq!(lm.peek_victim(), Some(line_id));
        assert_eq!(lm.line(line_id).vpc, 3);
        assert_eq!(lm.line(line_id).ipc, 1);
    }

    #[test]
    fn decreasing_vpc_while_already_a_victim_bubbles_it_up() {
        let mut lm = LineManager::new(geo());
        let a = lm.take_free_line(LineType::Data).unwrap();
        for pg in 0..3 {
            lm.mark_page_valid(&ppa(a, pg));
        }
        lm.retire_written_block(a); // vpc=3 < 4 => straight into victim heap

        let b = lm.take_free_line(LineType::Data).unwrap();
        for pg in 0..2 {
            lm.mark_page_valid(&ppa(b, pg));
        }
        lm.retire_written_block(b); // vpc=2 < 4 => victim heap, smaller vpc than a

        assert_eq!(lm.peek_victim(), Some(b));
        lm.mark_page_invalid(&ppa(a, 0)); // a: vpc 3 -> 2, tie; still valid heap
        lm.mark_page_invalid(&ppa(a, 1)); // a: vpc 2 -> 1, now smaller than b
        assert_eq!(lm.peek_victim(), Some(a));
    }

    #[test]
    fn take_free_line_returns_none_once_exhausted() {
        let mut lm = LineManager::new(Geometry::new(1, 1, 1, 4));
        assert!(lm.take_free_line(LineType::Data).is_some());
        assert!(lm.take_free_line(LineType::Data).is_none());
    }
}
