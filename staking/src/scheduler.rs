use near_contract_standards::fungible_token::Balance;
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{AccountId, BlockHeight};

use crate::error::StakingError;

/// Emission parameters fixed when the pool is funded.
#[derive(BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct RewardSchedule {
    pub reward_token: AccountId,
    pub reward_amount: Balance,
    pub reward_rate: Balance, // Reward units per block
    pub funded_at_block: BlockHeight,
    pub end_rewards_block: BlockHeight,
}

#[derive(BorshDeserialize, BorshSerialize, Clone, Debug, Default)]
pub struct RewardScheduler {
    schedule: Option<RewardSchedule>,
}

impl RewardScheduler {
    pub fn new() -> Self {
        Self { schedule: None }
    }

    /// Computes the schedule for a funding without committing it.
    pub fn plan(
        &self,
        reward_token: AccountId,
        reward_amount: Balance,
        duration_blocks: u64,
        current_block: BlockHeight,
    ) -> Result<RewardSchedule, StakingError> {
        if self.schedule.is_some() {
            return Err(StakingError::AlreadyFunded);
        }
        if duration_blocks == 0 {
            return Err(StakingError::InvalidDuration);
        }
        if reward_amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let end_rewards_block = current_block
            .checked_add(duration_blocks)
            .ok_or(StakingError::ArithmeticOverflow)?;

        Ok(RewardSchedule {
            reward_token,
            reward_amount,
            reward_rate: reward_amount / Balance::from(duration_blocks),
            funded_at_block: current_block,
            end_rewards_block,
        })
    }

    /// Stores a schedule produced by [`RewardScheduler::plan`]. Call only once
    /// the reward tokens are in custody.
    pub fn commit(&mut self, schedule: RewardSchedule) -> Result<(), StakingError> {
        if self.schedule.is_some() {
            return Err(StakingError::AlreadyFunded);
        }
        self.schedule = Some(schedule);
        Ok(())
    }

    pub fn schedule(&self) -> Option<&RewardSchedule> {
        self.schedule.as_ref()
    }

    pub fn is_funded(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn reward_token(&self) -> Option<&AccountId> {
        self.schedule.as_ref().map(|s| &s.reward_token)
    }

    pub fn reward_rate(&self) -> Balance {
        self.schedule.as_ref().map_or(0, |s| s.reward_rate)
    }

    pub fn end_rewards_block(&self) -> BlockHeight {
        self.schedule.as_ref().map_or(0, |s| s.end_rewards_block)
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn rick() -> AccountId {
        "rick.token".parse().unwrap()
    }

    #[test]
    fn test_plan_floor_divides_rate() {
        let scheduler = RewardScheduler::new();
        let schedule = scheduler.plan(rick(), 1_000_000, 10, 5).unwrap();

        assert_eq!(schedule.reward_rate, 100_000);
        assert_eq!(schedule.end_rewards_block, 15);
        assert_eq!(schedule.funded_at_block, 5);

        let uneven = scheduler.plan(rick(), 1_000, 7, 0).unwrap();
        assert_eq!(uneven.reward_rate, 142);
    }

    #[test]
    fn test_plan_does_not_commit() {
        let scheduler = RewardScheduler::new();
        scheduler.plan(rick(), 1_000, 10, 0).unwrap();
        assert!(!scheduler.is_funded());
        assert_eq!(scheduler.reward_rate(), 0);
        assert_eq!(scheduler.end_rewards_block(), 0);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let scheduler = RewardScheduler::new();
        assert_eq!(
            scheduler.plan(rick(), 1_000, 0, 0).unwrap_err(),
            StakingError::InvalidDuration
        );
    }

    #[test]
    fn test_zero_amount_rejected() {
        let scheduler = RewardScheduler::new();
        assert_eq!(
            scheduler.plan(rick(), 0, 10, 0).unwrap_err(),
            StakingError::InvalidAmount
        );
    }

    #[test]
    fn test_end_block_overflow_rejected() {
        let scheduler = RewardScheduler::new();
        assert_eq!(
            scheduler.plan(rick(), 1_000, 10, u64::MAX - 5).unwrap_err(),
            StakingError::ArithmeticOverflow
        );
    }

    #[test]
    fn test_second_funding_rejected() {
        let mut scheduler = RewardScheduler::new();
        let schedule = scheduler.plan(rick(), 1_000, 10, 0).unwrap();
        scheduler.commit(schedule.clone()).unwrap();

        assert_eq!(scheduler.reward_token(), Some(&rick()));
        assert_eq!(
            scheduler.plan(rick(), 1_000, 10, 3).unwrap_err(),
            StakingError::AlreadyFunded
        );
        assert_eq!(scheduler.commit(schedule).unwrap_err(), StakingError::AlreadyFunded);
    }
}
