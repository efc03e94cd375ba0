//! Fixed parameters from the external interface (spec.md §6): not
//! runtime-configurable defaults, but exposed as named constants rather
//! than scattered magic numbers.

pub const SECTOR_SIZE_BYTES: usize = 512;
pub const SECTORS_PER_PAGE: usize = 8;
pub const PAGE_SIZE_BYTES: usize = SECTOR_SIZE_BYTES * SECTORS_PER_PAGE;

pub const DEFAULT_PGS_PER_BLK: u32 = 256;
pub const DEFAULT_BLKS_PER_PL: u32 = 256;
pub const DEFAULT_PLS_PER_LUN: u32 = 1;
pub const DEFAULT_LUNS_PER_CH: u32 = 8;
pub const DEFAULT_NCHS: u32 = 8;

/// Mappings per translation page.
pub const ENTS_PER_PG: u64 = 512;

/// Free-line fraction thresholds below which GC triggers (spec.md §6).
pub const GC_THRES_PCENT: f64 = 0.75;
pub const GC_THRES_PCENT_HIGH: f64 = 0.95;

pub const ENABLE_GC_DELAY: bool = true;

/// Bucket count for the CMT hash table; must stay a power of two so a
/// mask can replace the modulo (spec.md §9).
pub const CMT_HASH_SIZE: usize = 4096;

/// Default NAND timings, in nanoseconds.
pub const DEFAULT_PG_RD_LAT_NS: u64 = 40_000;
pub const DEFAULT_PG_WR_LAT_NS: u64 = 200_000;
pub const DEFAULT_BLK_ER_LAT_NS: u64 = 2_000_000;
/// Structurally present but disabled per spec.md §4.1 / §9.
pub const DEFAULT_CH_XFER_LAT_NS: u64 = 0;

pub const UNMAPPED: u64 = u64::MAX;
pub const INVALID_LPN: u64 = u64::MAX;
