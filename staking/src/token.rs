//! Fungible token ledger capability consumed by [`crate::StakingCore`].
//!
//! A single ledger may hold several tokens, so every call names the token it
//! acts on. [`InMemoryTokenLedger`] implements the usual allowance semantics
//! and stands in for real token contracts in tests.

use std::collections::HashMap;

use near_contract_standards::fungible_token::Balance;
use near_sdk::AccountId;
use thiserror::Error;

/// Reason a token ledger refused an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Balance,
        required: Balance,
    },
    #[error("Insufficient allowance: {spender} may move {available} for {owner}, needs {required}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        available: Balance,
        required: Balance,
    },
    #[error("Token amount must be positive")]
    InvalidAmount,
    #[error("Token balance overflow")]
    Overflow,
}

pub trait TokenLedger {
    /// Moves `amount` of `token` from `sender` to `receiver`.
    fn transfer(
        &mut self,
        token: &AccountId,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError>;

    /// Moves `amount` of `token` owned by `owner` to `receiver`, spending the
    /// allowance `owner` granted to `spender`.
    fn transfer_from(
        &mut self,
        token: &AccountId,
        spender: &AccountId,
        owner: &AccountId,
        receiver: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError>;

    /// Sets the allowance of `spender` over `owner`'s `token` to `amount`.
    fn approve(
        &mut self,
        token: &AccountId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError>;

    fn balance_of(&self, token: &AccountId, account: &AccountId) -> Balance;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenLedger {
    balances: HashMap<(AccountId, AccountId), Balance>,
    allowances: HashMap<(AccountId, AccountId, AccountId), Balance>,
    total_supply: HashMap<AccountId, Balance>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` of `token` in `account`, like a fixed-supply preset
    /// token minting its supply to the deployer.
    pub fn mint(
        &mut self,
        token: &AccountId,
        account: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        let supply = self.total_supply.get(token).copied().unwrap_or(0);
        let new_supply = supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = self.balance_of(token, account);
        let new_balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;

        self.total_supply.insert(token.clone(), new_supply);
        self.balances
            .insert((token.clone(), account.clone()), new_balance);
        Ok(())
    }

    pub fn allowance(&self, token: &AccountId, owner: &AccountId, spender: &AccountId) -> Balance {
        self.allowances
            .get(&(token.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self, token: &AccountId) -> Balance {
        self.total_supply.get(token).copied().unwrap_or(0)
    }

    // Validates both legs before touching either balance.
    fn move_balance(
        &mut self,
        token: &AccountId,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }
        let available = self.balance_of(token, sender);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                account: sender.clone(),
                available,
                required: amount,
            })?;
        if sender == receiver {
            return Ok(());
        }
        let credited = self
            .balance_of(token, receiver)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances
            .insert((token.clone(), sender.clone()), debited);
        self.balances
            .insert((token.clone(), receiver.clone()), credited);
        Ok(())
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn transfer(
        &mut self,
        token: &AccountId,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        self.move_balance(token, sender, receiver, amount)
    }

    fn transfer_from(
        &mut self,
        token: &AccountId,
        spender: &AccountId,
        owner: &AccountId,
        receiver: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        let available = self.allowance(token, owner, spender);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                available,
                required: amount,
            })?;

        self.move_balance(token, owner, receiver, amount)?;
        self.allowances
            .insert((token.clone(), owner.clone(), spender.clone()), remaining);
        Ok(())
    }

    fn approve(
        &mut self,
        token: &AccountId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        self.allowances
            .insert((token.clone(), owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn balance_of(&self, token: &AccountId, account: &AccountId) -> Balance {
        self.balances
            .get(&(token.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }
}
