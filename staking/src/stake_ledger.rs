use near_contract_standards::fungible_token::Balance;
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::json_types::U128;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{AccountId, BlockHeight, IntoStorageKey};
use schemars::JsonSchema;

use crate::accrual::accrue;
use crate::error::StakingError;
use crate::scheduler::RewardSchedule;

/// A participant's staked balance and reward checkpoint.
#[derive(BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct Deposit {
    pub amount: Balance,
    pub last_accounted_block: BlockHeight,
    /// Reward settled when a top-up moved the checkpoint, paid on next claim.
    pub banked_reward: Balance,
}

impl Deposit {
    pub fn into_view(self, account_id: AccountId) -> DepositView {
        DepositView {
            account_id,
            amount: U128(self.amount),
            last_accounted_block: self.last_accounted_block,
            banked_reward: U128(self.banked_reward),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(crate = "near_sdk::serde")]
#[schemars(crate = "schemars")]
pub struct DepositView {
    #[schemars(with = "String")]
    pub account_id: AccountId,
    #[schemars(with = "String")]
    pub amount: U128,
    pub last_accounted_block: BlockHeight,
    #[schemars(with = "String")]
    pub banked_reward: U128,
}

/// A stake that passed every check and only waits for its tokens to arrive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingStake {
    pub amount: Balance,
    /// Reward accrued on the existing deposit, banked when the stake lands.
    pub accrued: Balance,
    pub block: BlockHeight,
}

#[derive(BorshDeserialize, BorshSerialize)]
pub struct StakeLedger {
    deposits: LookupMap<AccountId, Deposit>,
    total_staked: Balance,
}

impl StakeLedger {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            deposits: LookupMap::new(prefix),
            total_staked: 0,
        }
    }

    pub fn record_stake(
        &mut self,
        participant: &AccountId,
        amount: Balance,
        current_block: BlockHeight,
    ) -> Result<Deposit, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let mut deposit = self.deposits.get(participant).unwrap_or_default();
        deposit.amount = deposit
            .amount
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;
        let total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;
        deposit.last_accounted_block = current_block;

        self.deposits.insert(participant, &deposit);
        self.total_staked = total_staked;
        Ok(deposit)
    }

    /// Validates a stake of `amount` at `current_block` without touching
    /// storage. Nothing can fail in [`StakeLedger::commit_stake`] afterwards.
    pub fn prepare_stake(
        &self,
        participant: &AccountId,
        amount: Balance,
        schedule: Option<&RewardSchedule>,
        current_block: BlockHeight,
    ) -> Result<PendingStake, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let existing = self.deposits.get(participant).unwrap_or_default();
        let accrued = accrue(&existing, schedule, current_block)?;

        existing
            .amount
            .checked_add(amount)
            .and_then(|_| self.total_staked.checked_add(amount))
            .and_then(|_| existing.banked_reward.checked_add(accrued))
            .ok_or(StakingError::ArithmeticOverflow)?;

        Ok(PendingStake {
            amount,
            accrued,
            block: current_block,
        })
    }

    /// Banks the reward accrued so far and records the stake, moving the
    /// checkpoint to the stake block.
    pub fn commit_stake(
        &mut self,
        participant: &AccountId,
        pending: PendingStake,
    ) -> Result<Deposit, StakingError> {
        self.bank_reward(participant, pending.accrued)?;
        self.record_stake(participant, pending.amount, pending.block)
    }

    pub fn record_withdrawal(
        &mut self,
        participant: &AccountId,
        amount: Balance,
    ) -> Result<Deposit, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let mut deposit = self.deposits.get(participant).unwrap_or_default();
        if amount > deposit.amount {
            return Err(StakingError::InsufficientStake {
                requested: amount,
                deposited: deposit.amount,
            });
        }
        deposit.amount -= amount;
        // total_staked always covers every individual deposit
        self.total_staked -= amount;

        self.deposits.insert(participant, &deposit);
        Ok(deposit)
    }

    /// Puts back a withdrawal whose token transfer did not go through. The
    /// checkpoint is left where it is.
    pub fn restore_withdrawal(
        &mut self,
        participant: &AccountId,
        amount: Balance,
    ) -> Result<Deposit, StakingError> {
        let mut deposit = self.deposits.get(participant).unwrap_or_default();
        deposit.amount = deposit
            .amount
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;
        self.total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;

        self.deposits.insert(participant, &deposit);
        Ok(deposit)
    }

    /// Adds settled reward to the participant's bank.
    pub fn bank_reward(&mut self, participant: &AccountId, reward: Balance) -> Result<(), StakingError> {
        if reward == 0 {
            return Ok(());
        }
        let mut deposit = self.deposits.get(participant).unwrap_or_default();
        deposit.banked_reward = deposit
            .banked_reward
            .checked_add(reward)
            .ok_or(StakingError::ArithmeticOverflow)?;
        self.deposits.insert(participant, &deposit);
        Ok(())
    }

    /// Moves the checkpoint to `current_block` and empties the bank, returning
    /// what it held. Unknown participants are left absent.
    pub fn settle(&mut self, participant: &AccountId, current_block: BlockHeight) -> Balance {
        let Some(mut deposit) = self.deposits.get(participant) else {
            return 0;
        };
        let banked = std::mem::take(&mut deposit.banked_reward);
        deposit.last_accounted_block = current_block;
        self.deposits.insert(participant, &deposit);
        banked
    }

    pub fn deposit(&self, participant: &AccountId) -> Option<Deposit> {
        self.deposits.get(participant)
    }

    pub fn deposit_amount(&self, participant: &AccountId) -> Balance {
        self.deposits.get(participant).map_or(0, |d| d.amount)
    }

    pub fn deposit_checkpoint_block(&self, participant: &AccountId) -> BlockHeight {
        self.deposits
            .get(participant)
            .map_or(0, |d| d.last_accounted_block)
    }

    pub fn total_staked(&self) -> Balance {
        self.total_staked
    }
}
