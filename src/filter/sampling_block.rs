use serde::{Serialize, Deserialize};
use crate::error::{Result, TrackingError};

/**
 * Part indices perturbed and evaluated together in one predict step.
 */
#[derive(Debug,Clone,PartialEq,Eq,Serialize,Deserialize)]
pub struct SamplingBlock {
    pub parts: Vec<usize>
}

impl SamplingBlock {
    pub fn new(parts: Vec<usize>) -> SamplingBlock {
        SamplingBlock { parts }
    }
}

/**
 * One block per part, the default layout.
 */
pub fn create_sampling_blocks(part_count: usize) -> Vec<SamplingBlock> {
    (0..part_count).map(|i| SamplingBlock::new(vec![i])).collect()
}

/**
 * Blocks must be non empty and cover 0..part_count exactly once.
 */
pub fn validate_sampling_blocks(blocks: &[SamplingBlock], part_count: usize) -> Result<()> {
    if blocks.is_empty() {
        return Err(TrackingError::InvalidConfiguration("at least one sampling block is required".to_string()));
    }
    let mut seen = vec![false; part_count];
    for (block_idx, block) in blocks.iter().enumerate() {
        if block.parts.is_empty() {
            return Err(TrackingError::InvalidConfiguration(format!("sampling block {} is empty", block_idx)));
        }
        for &part in &block.parts {
            match seen.get_mut(part) {
                None => return Err(TrackingError::InvalidConfiguration(format!("sampling block {} references part {} of {}", block_idx, part, part_count))),
                Some(true) => return Err(TrackingError::InvalidConfiguration(format!("part {} appears in more than one sampling block", part))),
                Some(flag) => *flag = true
            }
        }
    }
    match seen.iter().position(|&s| !s) {
        Some(missing) => Err(TrackingError::InvalidConfiguration(format!("part {} is not covered by any sampling block", missing))),
        None => Ok(())
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum BlockSchedule {
    /// Every filter call runs all blocks in order.
    All,
    /// Every filter call runs the next block only.
    RoundRobin
}

impl Default for BlockSchedule {
    fn default() -> Self {
        BlockSchedule::All
    }
}

/**
 * Explicit cursor over the block list.
 */
#[derive(Debug,Clone)]
pub struct BlockScheduler {
    schedule: BlockSchedule,
    block_count: usize,
    cursor: usize
}

impl BlockScheduler {
    pub fn new(schedule: BlockSchedule, block_count: usize) -> BlockScheduler {
        BlockScheduler { schedule, block_count, cursor: 0 }
    }

    pub fn schedule(&self) -> BlockSchedule {
        self.schedule
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /**
     * Block indices to run in the next filter call; advances the cursor.
     */
    pub fn next_blocks(&mut self) -> Vec<usize> {
        match self.schedule {
            BlockSchedule::All => (0..self.block_count).collect(),
            BlockSchedule::RoundRobin => {
                let block = self.cursor;
                self.cursor = (self.cursor + 1) % self.block_count.max(1);
                vec![block]
            }
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
