//! Grid arithmetic: items per row, batch sizes, and row-aligned fetch counts.

/// Card width used by the marketplace grid, in pixels.
pub const DEFAULT_ITEM_WIDTH_PX: u32 = 256;

/// Items fetched per batch on narrow grids (three cards or fewer per row).
const NARROW_BATCH: usize = 18;
/// Items fetched per batch on wide grids.
const WIDE_BATCH: usize = 16;

/// Number of cards that fit on one row.
///
/// A measured width narrower than one card still lays out a single column,
/// so the result is at least 1.
pub fn items_per_row(available_width_px: u32, item_width_px: u32) -> usize {
    (available_width_px / item_width_px.max(1)).max(1) as usize
}

/// Items requested by one directional fetch; a reset fetches twice this.
pub fn fetch_batch_size(items_per_row: usize) -> usize {
    if items_per_row <= 3 {
        NARROW_BATCH
    } else {
        WIDE_BATCH
    }
}

/// Shrinks `batch` by the cards needed to complete the trailing partial row.
///
/// `count = batch - (len % items_per_row)`, never below 1.
pub fn row_aligned_count(batch: usize, window_len: usize, items_per_row: usize) -> usize {
    let remainder = window_len % items_per_row.max(1);
    batch.saturating_sub(remainder).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_per_row_floors() {
        assert_eq!(items_per_row(1024, 256), 4);
        assert_eq!(items_per_row(1279, 256), 4);
        assert_eq!(items_per_row(1280, 256), 5);
    }

    #[test]
    fn test_items_per_row_never_zero() {
        assert_eq!(items_per_row(100, 256), 1);
        assert_eq!(items_per_row(0, 256), 1);
        assert_eq!(items_per_row(500, 0), 500);
    }

    #[test]
    fn test_batch_size_threshold() {
        assert_eq!(fetch_batch_size(1), 18);
        assert_eq!(fetch_batch_size(3), 18);
        assert_eq!(fetch_batch_size(4), 16);
        assert_eq!(fetch_batch_size(7), 16);
    }

    #[test]
    fn test_aligned_window_uses_full_batch() {
        assert_eq!(row_aligned_count(16, 20, 4), 16);
        assert_eq!(row_aligned_count(16, 0, 4), 16);
        assert_eq!(row_aligned_count(18, 36, 3), 18);
    }

    #[test]
    fn test_partial_row_is_completed() {
        // 18 items over 4 per row leaves 2 on the last row.
        assert_eq!(row_aligned_count(16, 18, 4), 14);
        assert_eq!(row_aligned_count(18, 19, 3), 17);
    }

    #[test]
    fn test_count_floor_is_one() {
        // Very wide grids can have a remainder larger than the batch.
        assert_eq!(row_aligned_count(16, 17, 20), 1);
        assert_eq!(row_aligned_count(16, 16, 20), 1);
        assert_eq!(row_aligned_count(16, 15, 20), 1);
        assert_eq!(row_aligned_count(16, 3, 20), 13);
    }
}
