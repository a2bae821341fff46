use near_contract_standards::fungible_token::Balance;
use near_sdk::AccountId;
use thiserror::Error;

use crate::token::TokenError;

/// Reasons a pool operation is rejected. Every rejection leaves the pool
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Reward duration must be at least one block")]
    InvalidDuration,

    #[error("Cannot withdraw more tokens than you deposited: requested {requested}, deposited {deposited}")]
    InsufficientStake { requested: Balance, deposited: Balance },

    #[error("Token transfer failed: {0}")]
    TransferFailed(#[from] TokenError),

    #[error("Only the owner can call this method: {caller} is not the owner")]
    Unauthorized { caller: AccountId },

    #[error("Pool is already funded")]
    AlreadyFunded,

    #[error("Token {token} is not accepted by this pool")]
    UnsupportedToken { token: AccountId },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

/// Reverts the current receipt with the error's message.
pub(crate) fn unwrap_or_revert<T>(result: Result<T, StakingError>) -> T {
    result.unwrap_or_else(|err| near_sdk::env::panic_str(&err.to_string()))
}
