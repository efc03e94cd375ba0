//! The stripe allocator shared by the data and translation streams
//! (spec.md §4.4). Each stream owns one `WritePointer`; the two are
//! otherwise independent and may sit in different lines simultaneously.

use crate::geometry::{Geometry, Ppa};
use crate::line::LineType;
use crate::line_manager::LineManager;

pub struct WritePointer {
    pub line_id: u32,
    pub ch: u32,
    pub lun: u32,
    pub pg: u32,
    kind: LineType,
}

impl WritePointer {
    pub fn new(geo: &Geometry, lm: &mut LineManager, kind: LineType) -> Self {
        let line_id = lm
            .take_free_line(kind)
            .unwrap_or_else(|| panic!("no free line available to start a {:?} write pointer", kind));
        let _ = geo;
        WritePointer {
            line_id,
            ch: 0,
            lun: 0,
            pg: 0,
            kind,
        }
    }

    pub fn current_ppa(&self) -> Ppa {
        Ppa {
            ch: self.ch,
            lun: self.lun,
            pl: 0,
            blk: self.line_id,
            pg: self.pg,
            sec: 0,
        }
    }

    /// Advances the cursor by one page: `ch++`, carrying into `lun`, then
    /// `pg` once every `(ch, lun)` pair has been struck. When the block is
    /// fully written, retires the current line (FULL or victim-heap,
    /// depending on whether anything in it was invalidated while it was
    /// being written) and adopts a fresh free line. Aborts the simulation
    /// if no free line is available (spec.md §7: fatal resource
    /// exhaustion — the threshold-based GC is meant to prevent this).
    pub fn advance(&mut self, geo: &Geometry, lm: &mut LineManager) {
        self.ch += 1;
        if self.ch == geo.nchs {
            self.ch = 0;
            self.lun += 1;
        }
        if self.lun == geo.luns_per_ch {
            self.lun = 0;
            self.pg += 1;
        }
        if self.pg == geo.pgs_per_blk {
            lm.retire_written_block(self.line_id);
            let new_line = lm
                .take_free_line(self.kind)
                .unwrap_or_else(|| panic!("no free line available for write-pointer advance"));
            self.line_id = new_line;
            self.pg = 0;
            self.lun = 0;
            self.ch = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_stripes_channel_then_lun_before_page() {
        let geo = Geometry::new(2, 2, 2, 2);
        let mut lm = LineManager::new(geo);
        let mut wp = WritePointer::new(&geo, &mut lm, LineType::Data);
        let line0 = wp.line_id;

        let seq: Vec<(u32, u32, u32)> = (0..8)
            .map(|_| {
                let cur = (wp.ch, wp.lun, wp.pg);
                wp.advance(&geo, &mut lm);
                cur
            })
            .collect();
        assert_eq!(
            seq,
            vec![
                (0, 0, 0),
                (1, 0, 0),
                (0, 1, 0),
                (1, 1, 0),
                (0, 0, 1),
                (1, 0, 1),
                (0, 1, 1),
                (1, 1, 1),
            ]
        );
        // Block now fully struck (2 pages/blk * 2 luns * 2 chs = 8 slots);
        // the next advance should have rolled to a new line.
        assert_ne!(wp.line_id, line0);
        assert_eq!((wp.ch, wp.lun, wp.pg), (0, 0, 0));
    }

    #[test]
    #[should_panic(expected = "no free line available")]
    fn advance_panics_when_no_free_line_remains() {
        let geo = Geometry::new(1, 1, 1, 1);
        let mut lm = LineManager::new(geo);
        let mut wp = WritePointer::new(&geo, &mut lm, LineType::Data);
        // Single-page, single-block geometry: the very first advance must
        // retire the only line and find no replacement.
        wp.advance(&geo, &mut lm);
    }
}
