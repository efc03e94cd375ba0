//! Page and block state (spec.md §3).

use crate::geometry::Geometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageStatus {
    Free,
    Valid,
    Invalid,
}

/// A page's per-sector status. Not consulted by the core (spec.md §3 says
/// so explicitly) but preserved so a front-end can track partial-page
/// writes.
#[derive(Clone, Debug)]
pub struct Page {
    pub status: PageStatus,
    pub sectors: Vec<PageStatus>,
}

impl Page {
    fn new(sectors_per_pg: u32) -> Self {
        Page {
            status: PageStatus::Free,
            sectors: vec![PageStatus::Free; sectors_per_pg as usize],
        }
    }
}

/// One block: `pgs_per_blk` pages plus the counters spec.md §3 names.
#[derive(Clone, Debug)]
pub struct Block {
    pub pages: Vec<Page>,
    pub vpc: u32,
    pub ipc: u32,
    pub erase_cnt: u64,
    /// Write-pointer cursor within the block; incremented as pages are
    /// allocated in sequence by a `WritePointer`.
    pub wp: u32,
}

impl Block {
    pub fn new(geo: &Geometry) -> Self {
        Block {
            pages: (0..geo.pgs_per_blk)
                .map(|_| Page::new(geo.sectors_per_pg))
                .collect(),
            vpc: 0,
            ipc: 0,
            erase_cnt: 0,
            wp: 0,
        }
    }

    pub fn free_pages(&self, geo: &Geometry) -> u32 {
        geo.pgs_per_blk - self.vpc - self.ipc
    }

    /// Resets every page to FREE, zeroes the vpc/ipc/wp counters, and
    /// increments `erase_cnt` (spec.md §4.4 `mark_block_free`).
    pub fn mark_free(&mut self) {
        for page in &mut self.pages {
            page.status = PageStatus::Free;
            for sector in &mut page.sectors {
                *sector = PageStatus::Free;
            }
        }
        self.vpc = 0;
        self.ipc = 0;
        self.wp = 0;
        self.erase_cnt += 1;
    }
}
