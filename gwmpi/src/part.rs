/// Contiguous block partition of [0, total) over nparts ranks.
///
/// Every rank but the last holds ceil(total/nparts) entries; the last holds
/// the remainder. The padded block size is what uniform-count collectives
/// (all-to-all, ring rotation) exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPart {
    total: usize,
    nparts: usize,
    block: usize,
}

impl BlockPart {
    pub fn new(total: usize, nparts: usize) -> BlockPart {
        assert!(nparts > 0, "BlockPart needs at least one part");

        let block = if total == 0 {
            0
        } else {
            total.div_ceil(nparts)
        };

        BlockPart {
            total,
            nparts,
            block,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn nparts(&self) -> usize {
        self.nparts
    }

    /// Uniform (padded) block size.
    pub fn block_size(&self) -> usize {
        self.block
    }

    pub fn start(&self, part: usize) -> usize {
        (part * self.block).min(self.total)
    }

    pub fn end(&self, part: usize) -> usize {
        ((part + 1) * self.block).min(self.total)
    }

    pub fn local_size(&self, part: usize) -> usize {
        self.end(part) - self.start(part)
    }

    pub fn is_parallel(&self) -> bool {
        self.nparts > 1
    }

    /// Which part owns global index i.
    pub fn owner(&self, i: usize) -> usize {
        assert!(i < self.total);

        i / self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockpart_remainder_on_last() {
        let p = BlockPart::new(10, 4);

        assert_eq!(p.block_size(), 3);
        assert_eq!(p.local_size(0), 3);
        assert_eq!(p.local_size(1), 3);
        assert_eq!(p.local_size(2), 3);
        assert_eq!(p.local_size(3), 1);

        assert_eq!(p.start(3), 9);
        assert_eq!(p.end(3), 10);

        assert_eq!(p.owner(0), 0);
        assert_eq!(p.owner(9), 3);

        let total: usize = (0..4).map(|r| p.local_size(r)).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_blockpart_serial() {
        let p = BlockPart::new(7, 1);

        assert_eq!(p.block_size(), 7);
        assert_eq!(p.local_size(0), 7);
        assert!(!p.is_parallel());
    }

    #[test]
    fn test_blockpart_more_parts_than_items() {
        let p = BlockPart::new(2, 4);

        assert_eq!(p.block_size(), 1);
        assert_eq!(p.local_size(0), 1);
        assert_eq!(p.local_size(1), 1);
        assert_eq!(p.local_size(2), 0);
        assert_eq!(p.local_size(3), 0);
    }
}
