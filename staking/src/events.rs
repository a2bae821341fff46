//! NEP-297 event log lines (`EVENT_JSON:{...}`) emitted on every pool state change.

use near_contract_standards::fungible_token::Balance;
use near_sdk::json_types::U128;
use near_sdk::serde_json::{json, Value};
use near_sdk::{env, AccountId, BlockHeight};

pub const EVENT_STANDARD: &str = "token_staking";
pub const EVENT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingEvent<'a> {
    PoolFunded {
        reward_token: &'a AccountId,
        reward_amount: Balance,
        reward_rate: Balance,
        end_rewards_block: BlockHeight,
    },
    Staked {
        account_id: &'a AccountId,
        amount: Balance,
        block: BlockHeight,
    },
    Withdrawn {
        account_id: &'a AccountId,
        amount: Balance,
    },
    RewardClaimed {
        account_id: &'a AccountId,
        amount: Balance,
        block: BlockHeight,
    },
    /// A token push failed and the ledger change was undone.
    TransferReverted {
        account_id: &'a AccountId,
        token: &'a AccountId,
        amount: Balance,
    },
}

impl StakingEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            StakingEvent::PoolFunded { .. } => "pool_funded",
            StakingEvent::Staked { .. } => "staked",
            StakingEvent::Withdrawn { .. } => "withdrawn",
            StakingEvent::RewardClaimed { .. } => "reward_claimed",
            StakingEvent::TransferReverted { .. } => "transfer_reverted",
        }
    }

    fn data(&self) -> Value {
        match self {
            StakingEvent::PoolFunded {
                reward_token,
                reward_amount,
                reward_rate,
                end_rewards_block,
            } => json!({
                "reward_token": reward_token,
                "reward_amount": U128(*reward_amount),
                "reward_rate": U128(*reward_rate),
                "end_rewards_block": end_rewards_block,
            }),
            StakingEvent::Staked { account_id, amount, block } => json!({
                "account_id": account_id,
                "amount": U128(*amount),
                "block": block,
            }),
            StakingEvent::Withdrawn { account_id, amount } => json!({
                "account_id": account_id,
                "amount": U128(*amount),
            }),
            StakingEvent::RewardClaimed { account_id, amount, block } => json!({
                "account_id": account_id,
                "amount": U128(*amount),
                "block": block,
            }),
            StakingEvent::TransferReverted { account_id, token, amount } => json!({
                "account_id": account_id,
                "token": token,
                "amount": U128(*amount),
            }),
        }
    }

    pub fn to_log_line(&self) -> String {
        let body = json!({
            "standard": EVENT_STANDARD,
            "version": EVENT_VERSION,
            "event": self.name(),
            "data": [self.data()],
        });
        format!("EVENT_JSON:{}", body)
    }

    pub fn emit(&self) {
        env::log_str(&self.to_log_line());
    }
}
