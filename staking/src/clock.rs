use std::cell::Cell;
use std::rc::Rc;

use near_sdk::{env, BlockHeight};

/// Source of the current block height.
pub trait BlockClock {
    fn current_block(&self) -> BlockHeight;
}

/// Block height of the executing NEAR receipt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearBlockClock;

impl BlockClock for NearBlockClock {
    fn current_block(&self) -> BlockHeight {
        env::block_height()
    }
}

/// Counter advanced by hand, for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    block: Cell<BlockHeight>,
}

impl ManualClock {
    pub fn new(block: BlockHeight) -> Self {
        Self {
            block: Cell::new(block),
        }
    }

    /// Mines `blocks` empty blocks.
    pub fn advance(&self, blocks: u64) {
        self.block.set(self.block.get().saturating_add(blocks));
    }

    /// Moves to `block`. Heights never go backwards.
    pub fn set(&self, block: BlockHeight) {
        if block > self.block.get() {
            self.block.set(block);
        }
    }
}

impl BlockClock for ManualClock {
    fn current_block(&self) -> BlockHeight {
        self.block.get()
    }
}

impl<C: BlockClock + ?Sized> BlockClock for &C {
    fn current_block(&self) -> BlockHeight {
        (**self).current_block()
    }
}

impl<C: BlockClock + ?Sized> BlockClock for Rc<C> {
    fn current_block(&self) -> BlockHeight {
        (**self).current_block()
    }
}
