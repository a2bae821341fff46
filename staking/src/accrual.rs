//! Block-driven reward accrual.
//!
//! A staked participant earns `reward_rate` units for every block between
//! their checkpoint and the current block, capped at the end of the reward
//! schedule. The amount staked gates accrual (nothing accrues on an empty
//! deposit) but does not scale it.

use near_contract_standards::fungible_token::Balance;
use near_sdk::BlockHeight;

use crate::error::StakingError;
use crate::scheduler::RewardSchedule;
use crate::stake_ledger::Deposit;

/// Reward owed for blocks elapsed since the deposit's checkpoint.
pub fn accrue(
    deposit: &Deposit,
    schedule: Option<&RewardSchedule>,
    current_block: BlockHeight,
) -> Result<Balance, StakingError> {
    let Some(schedule) = schedule else {
        return Ok(0);
    };
    if deposit.amount == 0 {
        return Ok(0);
    }
    // Blocks before funding never earn, even for stakes placed earlier.
    let accrual_start = deposit.last_accounted_block.max(schedule.funded_at_block);
    let accrual_end = current_block.min(schedule.end_rewards_block);
    let elapsed = accrual_end.saturating_sub(accrual_start);

    schedule
        .reward_rate
        .checked_mul(Balance::from(elapsed))
        .ok_or(StakingError::ArithmeticOverflow)
}

/// Banked reward plus what has accrued since the checkpoint.
pub fn pending_rewards(
    deposit: &Deposit,
    schedule: Option<&RewardSchedule>,
    current_block: BlockHeight,
) -> Result<Balance, StakingError> {
    accrue(deposit, schedule, current_block)?
        .checked_add(deposit.banked_reward)
        .ok_or(StakingError::ArithmeticOverflow)
}
