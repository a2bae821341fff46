// Single-pool token staking.
// Participants stake one NEP-141 token; the owner funds the pool once with a
// reward token that is emitted at a fixed rate per block until the schedule ends.
// `StakingPool` is the on-chain contract; `StakingCore` runs the same ledger
// synchronously against any `TokenLedger`.

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::borsh::BorshSerialize;
use near_sdk::json_types::U128;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::serde_json;
use near_sdk::{
    assert_one_yocto, env, is_promise_success, near, AccountId, BlockHeight, BorshStorageKey, Gas,
    NearToken, PanicOnDefault, Promise, PromiseOrValue,
};

pub mod accrual;
pub mod clock;
pub mod error;
pub mod events;
pub mod pool;
pub mod scheduler;
pub mod stake_ledger;
pub mod token;

pub use crate::clock::{BlockClock, ManualClock, NearBlockClock};
pub use crate::error::StakingError;
pub use crate::pool::{PoolConfig, StakingCore};
pub use crate::scheduler::{RewardSchedule, RewardScheduler};
pub use crate::stake_ledger::{Deposit, DepositView, PendingStake, StakeLedger};
pub use crate::token::{InMemoryTokenLedger, TokenError, TokenLedger};

use crate::accrual::pending_rewards;
use crate::error::unwrap_or_revert;
use crate::events::StakingEvent;

/// Gas for the outgoing `ft_transfer` of staked or reward tokens.
const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(25);
/// Gas for the callback that undoes ledger changes of a failed transfer.
const GAS_FOR_RESOLVE_TRANSFER: Gas = Gas::from_tgas(10);
const ONE_YOCTO: NearToken = NearToken::from_yoctonear(1);

#[derive(BorshStorageKey, BorshSerialize)]
pub(crate) enum StorageKey {
    Deposits,
}

/// Payload of `ft_transfer_call` into the pool: `"stake"` or
/// `{"fund":{"duration":<blocks>}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde", rename_all = "snake_case")]
pub enum TransferMessage {
    Stake,
    Fund { duration: u64 },
}

#[near_sdk::ext_contract(ext_ft)]
pub trait ExtFungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
}

#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct StakingPool {
    config: PoolConfig,
    scheduler: RewardScheduler,
    stakes: StakeLedger,
}

#[near]
impl StakingPool {
    #[init]
    pub fn new(owner_id: AccountId, staking_token: AccountId) -> Self {
        Self {
            config: PoolConfig {
                owner: owner_id,
                pool_account: env::current_account_id(),
                staking_token,
            },
            scheduler: RewardScheduler::new(),
            stakes: StakeLedger::new(StorageKey::Deposits),
        }
    }

    /// Returns `amount` of the staking token to the caller. The deposit is
    /// restored if the token transfer fails.
    #[payable]
    pub fn withdraw(&mut self, amount: U128) -> Promise {
        assert_one_yocto();
        let account_id = env::predecessor_account_id();
        unwrap_or_revert(self.stakes.record_withdrawal(&account_id, amount.0));

        StakingEvent::Withdrawn {
            account_id: &account_id,
            amount: amount.0,
        }
        .emit();

        ext_ft::ext(self.config.staking_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(account_id.clone(), amount, None)
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                    .on_withdraw_transfer(account_id, amount),
            )
    }

    /// Pays out everything the caller is owed and moves their checkpoint to
    /// the current block. Nothing is transferred when nothing is owed.
    #[payable]
    pub fn claim(&mut self) -> PromiseOrValue<U128> {
        assert_one_yocto();
        let account_id = env::predecessor_account_id();
        let current_block = NearBlockClock.current_block();

        let Some(deposit) = self.stakes.deposit(&account_id) else {
            return PromiseOrValue::Value(U128(0));
        };
        let Some(reward_token) = self.scheduler.reward_token().cloned() else {
            self.stakes.settle(&account_id, current_block);
            return PromiseOrValue::Value(U128(0));
        };
        let owed = unwrap_or_revert(pending_rewards(
            &deposit,
            self.scheduler.schedule(),
            current_block,
        ));
        self.stakes.settle(&account_id, current_block);
        if owed == 0 {
            return PromiseOrValue::Value(U128(0));
        }

        StakingEvent::RewardClaimed {
            account_id: &account_id,
            amount: owed,
            block: current_block,
        }
        .emit();

        ext_ft::ext(reward_token)
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(account_id.clone(), U128(owed), None)
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                    .on_claim_transfer(account_id, U128(owed)),
            )
            .into()
    }

    #[private]
    pub fn on_withdraw_transfer(&mut self, account_id: AccountId, amount: U128) -> bool {
        if is_promise_success() {
            return true;
        }
        unwrap_or_revert(self.stakes.restore_withdrawal(&account_id, amount.0));
        StakingEvent::TransferReverted {
            account_id: &account_id,
            token: &self.config.staking_token,
            amount: amount.0,
        }
        .emit();
        false
    }

    /// Returns the amount actually paid.
    #[private]
    pub fn on_claim_transfer(&mut self, account_id: AccountId, amount: U128) -> U128 {
        if is_promise_success() {
            return amount;
        }
        unwrap_or_revert(self.stakes.bank_reward(&account_id, amount.0));
        if let Some(reward_token) = self.scheduler.reward_token() {
            StakingEvent::TransferReverted {
                account_id: &account_id,
                token: reward_token,
                amount: amount.0,
            }
            .emit();
        }
        U128(0)
    }

    pub fn get_owner(&self) -> AccountId {
        self.config.owner.clone()
    }

    pub fn get_staking_token(&self) -> AccountId {
        self.config.staking_token.clone()
    }

    pub fn get_reward_token(&self) -> Option<AccountId> {
        self.scheduler.reward_token().cloned()
    }

    pub fn get_reward_rate(&self) -> U128 {
        U128(self.scheduler.reward_rate())
    }

    pub fn get_end_rewards_block(&self) -> BlockHeight {
        self.scheduler.end_rewards_block()
    }

    pub fn get_user_deposit_amount(&self, account_id: AccountId) -> U128 {
        U128(self.stakes.deposit_amount(&account_id))
    }

    /// Block of the account's last stake or claim.
    pub fn get_user_deposit_block(&self, account_id: AccountId) -> BlockHeight {
        self.stakes.deposit_checkpoint_block(&account_id)
    }

    pub fn get_deposit(&self, account_id: AccountId) -> Option<DepositView> {
        self.stakes
            .deposit(&account_id)
            .map(|deposit| deposit.into_view(account_id))
    }

    pub fn get_pending_rewards(&self, account_id: AccountId) -> U128 {
        let deposit = self.stakes.deposit(&account_id).unwrap_or_default();
        U128(unwrap_or_revert(pending_rewards(
            &deposit,
            self.scheduler.schedule(),
            NearBlockClock.current_block(),
        )))
    }

    pub fn get_total_staked(&self) -> U128 {
        U128(self.stakes.total_staked())
    }
}

impl StakingPool {
    fn internal_stake(
        &mut self,
        token_id: &AccountId,
        account_id: &AccountId,
        amount: u128,
    ) -> Result<(), StakingError> {
        if token_id != &self.config.staking_token {
            return Err(StakingError::UnsupportedToken {
                token: token_id.clone(),
            });
        }
        let current_block = NearBlockClock.current_block();
        let pending = self.stakes.prepare_stake(
            account_id,
            amount,
            self.scheduler.schedule(),
            current_block,
        )?;
        self.stakes.commit_stake(account_id, pending)?;

        StakingEvent::Staked {
            account_id,
            amount,
            block: current_block,
        }
        .emit();
        Ok(())
    }

    fn internal_fund(
        &mut self,
        token_id: &AccountId,
        sender_id: &AccountId,
        amount: u128,
        duration: u64,
    ) -> Result<(), StakingError> {
        let schedule = self.config.plan_funding(
            &self.scheduler,
            sender_id,
            token_id.clone(),
            amount,
            duration,
            NearBlockClock.current_block(),
        )?;
        self.scheduler.commit(schedule.clone())?;

        StakingEvent::PoolFunded {
            reward_token: &schedule.reward_token,
            reward_amount: schedule.reward_amount,
            reward_rate: schedule.reward_rate,
            end_rewards_block: schedule.end_rewards_block,
        }
        .emit();
        Ok(())
    }
}

#[near]
impl FungibleTokenReceiver for StakingPool {
    /// Accepts stake in the staking token and the one-off funding in the
    /// reward token. A rejected transfer panics so the token contract refunds
    /// it in full.
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let token_id = env::predecessor_account_id();
        let message: TransferMessage = match serde_json::from_str(&msg) {
            Ok(message) => message,
            Err(_) => {
                env::log_str(&format!(
                    "TRANSFER_REFUSED: Unrecognised message from {} on {}",
                    sender_id, token_id
                ));
                return PromiseOrValue::Value(amount);
            }
        };

        match message {
            TransferMessage::Stake => {
                unwrap_or_revert(self.internal_stake(&token_id, &sender_id, amount.0))
            }
            TransferMessage::Fund { duration } => unwrap_or_revert(self.internal_fund(
                &token_id,
                &sender_id,
                amount.0,
                duration,
            )),
        }
        PromiseOrValue::Value(U128(0))
    }
}
