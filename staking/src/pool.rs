//! Synchronous pool orchestrator over injected token and clock capabilities.
//!
//! Each operation checks every precondition, then performs its single token
//! movement, then commits ledger changes. A failed token movement therefore
//! leaves the pool exactly as it was.

use near_contract_standards::fungible_token::Balance;
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::{AccountId, BlockHeight, IntoStorageKey};

use crate::accrual::pending_rewards;
use crate::clock::BlockClock;
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::scheduler::{RewardSchedule, RewardScheduler};
use crate::stake_ledger::{Deposit, StakeLedger};
use crate::token::TokenLedger;

/// Identities a pool is deployed with.
#[derive(BorshDeserialize, BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub owner: AccountId,
    /// Account holding the pool's token custody.
    pub pool_account: AccountId,
    pub staking_token: AccountId,
}

impl PoolConfig {
    /// Owner and token checks for a funding request, followed by the
    /// scheduler's own validation. Nothing is committed.
    pub fn plan_funding(
        &self,
        scheduler: &RewardScheduler,
        caller: &AccountId,
        reward_token: AccountId,
        amount: Balance,
        duration: u64,
        current_block: BlockHeight,
    ) -> Result<RewardSchedule, StakingError> {
        if caller != &self.owner {
            return Err(StakingError::Unauthorized {
                caller: caller.clone(),
            });
        }
        if reward_token == self.staking_token {
            return Err(StakingError::UnsupportedToken { token: reward_token });
        }
        scheduler.plan(reward_token, amount, duration, current_block)
    }
}

pub struct StakingCore<L, C> {
    config: PoolConfig,
    scheduler: RewardScheduler,
    stakes: StakeLedger,
    ledger: L,
    clock: C,
}

impl<L: TokenLedger, C: BlockClock> StakingCore<L, C> {
    /// Deposits are stored under `deposits_prefix`; pools sharing a process
    /// need distinct prefixes.
    pub fn new<S: IntoStorageKey>(config: PoolConfig, deposits_prefix: S, ledger: L, clock: C) -> Self {
        Self {
            config,
            scheduler: RewardScheduler::new(),
            stakes: StakeLedger::new(deposits_prefix),
            ledger,
            clock,
        }
    }

    /// Pulls `amount` of `reward_token` from the owner and starts emitting it
    /// over the next `duration` blocks. The owner must have approved the pool
    /// account beforehand.
    pub fn fund(
        &mut self,
        caller: &AccountId,
        reward_token: AccountId,
        amount: Balance,
        duration: u64,
    ) -> Result<RewardSchedule, StakingError> {
        let schedule = self.config.plan_funding(
            &self.scheduler,
            caller,
            reward_token,
            amount,
            duration,
            self.clock.current_block(),
        )?;

        self.ledger.transfer_from(
            &schedule.reward_token,
            &self.config.pool_account,
            caller,
            &self.config.pool_account,
            amount,
        )?;
        self.scheduler.commit(schedule.clone())?;

        StakingEvent::PoolFunded {
            reward_token: &schedule.reward_token,
            reward_amount: schedule.reward_amount,
            reward_rate: schedule.reward_rate,
            end_rewards_block: schedule.end_rewards_block,
        }
        .emit();
        Ok(schedule)
    }

    /// Pulls `amount` of the staking token from `caller` into custody. Reward
    /// accrued on an existing deposit is banked before the checkpoint moves.
    pub fn stake(&mut self, caller: &AccountId, amount: Balance) -> Result<Deposit, StakingError> {
        let current_block = self.clock.current_block();
        let pending = self.stakes.prepare_stake(
            caller,
            amount,
            self.scheduler.schedule(),
            current_block,
        )?;

        self.ledger.transfer_from(
            &self.config.staking_token,
            &self.config.pool_account,
            caller,
            &self.config.pool_account,
            amount,
        )?;
        let deposit = self.stakes.commit_stake(caller, pending)?;

        StakingEvent::Staked {
            account_id: caller,
            amount,
            block: current_block,
        }
        .emit();
        Ok(deposit)
    }

    /// Returns `amount` of the staking token to `caller`. The checkpoint is
    /// not moved.
    pub fn withdraw(&mut self, caller: &AccountId, amount: Balance) -> Result<Deposit, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let deposited = self.stakes.deposit_amount(caller);
        if amount > deposited {
            return Err(StakingError::InsufficientStake {
                requested: amount,
                deposited,
            });
        }

        self.ledger.transfer(
            &self.config.staking_token,
            &self.config.pool_account,
            caller,
            amount,
        )?;
        let deposit = self.stakes.record_withdrawal(caller, amount)?;

        StakingEvent::Withdrawn {
            account_id: caller,
            amount,
        }
        .emit();
        Ok(deposit)
    }

    /// Pays `caller` everything owed and moves their checkpoint to the current
    /// block, even when nothing was owed. Returns the amount paid.
    pub fn claim(&mut self, caller: &AccountId) -> Result<Balance, StakingError> {
        let current_block = self.clock.current_block();
        let Some(deposit) = self.stakes.deposit(caller) else {
            return Ok(0);
        };
        let Some(reward_token) = self.scheduler.reward_token().cloned() else {
            self.stakes.settle(caller, current_block);
            return Ok(0);
        };
        let owed = pending_rewards(&deposit, self.scheduler.schedule(), current_block)?;

        if owed > 0 {
            self.ledger
                .transfer(&reward_token, &self.config.pool_account, caller, owed)?;
        }
        self.stakes.settle(caller, current_block);

        if owed > 0 {
            StakingEvent::RewardClaimed {
                account_id: caller,
                amount: owed,
                block: current_block,
            }
            .emit();
        }
        Ok(owed)
    }

    pub fn owner(&self) -> &AccountId {
        &self.config.owner
    }

    pub fn staking_token(&self) -> &AccountId {
        &self.config.staking_token
    }

    pub fn reward_token(&self) -> Option<&AccountId> {
        self.scheduler.reward_token()
    }

    pub fn reward_rate(&self) -> Balance {
        self.scheduler.reward_rate()
    }

    pub fn end_rewards_block(&self) -> BlockHeight {
        self.scheduler.end_rewards_block()
    }

    pub fn deposit_amount(&self, participant: &AccountId) -> Balance {
        self.stakes.deposit_amount(participant)
    }

    pub fn deposit_checkpoint_block(&self, participant: &AccountId) -> BlockHeight {
        self.stakes.deposit_checkpoint_block(participant)
    }

    pub fn deposit(&self, participant: &AccountId) -> Option<Deposit> {
        self.stakes.deposit(participant)
    }

    pub fn pending_rewards(&self, participant: &AccountId) -> Result<Balance, StakingError> {
        let deposit = self.stakes.deposit(participant).unwrap_or_default();
        pending_rewards(&deposit, self.scheduler.schedule(), self.clock.current_block())
    }

    pub fn total_staked(&self) -> Balance {
        self.stakes.total_staked()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
