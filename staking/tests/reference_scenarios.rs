use near_sdk::test_utils::{accounts, VMContextBuilder};
use near_sdk::{testing_env, AccountId};
use token_staking::{
    BlockClock, InMemoryTokenLedger, ManualClock, PoolConfig, StakingCore, StakingError,
    TokenLedger,
};

const SUPPLY: u128 = 1_000_000;
const REWARD_AMOUNT: u128 = 1_000_000;
const DURATION: u64 = 10;
const BALANCE: u128 = SUPPLY / 2;

struct Scenario {
    core: StakingCore<InMemoryTokenLedger, ManualClock>,
    owner: AccountId,
    staker1: AccountId,
    staker2: AccountId,
    staking_token: AccountId,
    reward_token: AccountId,
    pool: AccountId,
}

impl Scenario {
    /// Pickle (staking) and Rick (reward) tokens minted to the owner, half of
    /// the Pickle supply handed to each staker.
    fn new() -> Self {
        testing_env!(VMContextBuilder::new().build());
        let owner = accounts(0);
        let staker1 = accounts(1);
        let staker2 = accounts(2);
        let staking_token: AccountId = "pickle.token".parse().unwrap();
        let reward_token: AccountId = "rick.token".parse().unwrap();
        let pool: AccountId = "staking.pool".parse().unwrap();

        let mut ledger = InMemoryTokenLedger::new();
        ledger.mint(&staking_token, &owner, SUPPLY).unwrap();
        ledger.mint(&reward_token, &owner, SUPPLY).unwrap();
        ledger.transfer(&staking_token, &owner, &staker1, BALANCE).unwrap();
        ledger.transfer(&staking_token, &owner, &staker2, BALANCE).unwrap();

        let config = PoolConfig {
            owner: owner.clone(),
            pool_account: pool.clone(),
            staking_token: staking_token.clone(),
        };
        let core = StakingCore::new(config, b"scenario".to_vec(), ledger, ManualClock::new(100));

        Self {
            core,
            owner,
            staker1,
            staker2,
            staking_token,
            reward_token,
            pool,
        }
    }

    // Every transaction lands in its own block.
    fn mine(&self) {
        self.core.clock().advance(1);
    }

    fn fund(&mut self) -> u64 {
        self.mine();
        self.core
            .ledger_mut()
            .approve(&self.reward_token, &self.owner, &self.pool, REWARD_AMOUNT)
            .unwrap();
        self.mine();
        self.core
            .fund(&self.owner, self.reward_token.clone(), REWARD_AMOUNT, DURATION)
            .unwrap();
        self.core.clock().current_block()
    }

    fn stake(&mut self, staker: AccountId, amount: u128) -> u64 {
        self.mine();
        self.core
            .ledger_mut()
            .approve(&self.staking_token, &staker, &self.pool, amount)
            .unwrap();
        self.mine();
        self.core.stake(&staker, amount).unwrap();
        self.core.clock().current_block()
    }

    fn balance(&self, token: &AccountId, account: &AccountId) -> u128 {
        self.core.ledger().balance_of(token, account)
    }
}

#[test]
fn initialises_properly() {
    let scenario = Scenario::new();
    assert_eq!(scenario.core.owner(), &scenario.owner);
    assert_eq!(scenario.core.staking_token(), &scenario.staking_token);
}

#[test]
fn is_fundable() {
    let mut scenario = Scenario::new();
    let block = scenario.fund();

    assert_eq!(
        scenario.balance(&scenario.reward_token, &scenario.pool),
        REWARD_AMOUNT,
        "Contract does not get funded with tokens"
    );
    assert_eq!(scenario.core.reward_rate(), REWARD_AMOUNT / DURATION as u128);
    assert_eq!(scenario.core.end_rewards_block(), block + DURATION);
}

#[test]
fn users_can_stake_tokens() {
    let mut scenario = Scenario::new();
    scenario.fund();
    let staker1 = scenario.staker1.clone();
    let block = scenario.stake(staker1.clone(), BALANCE);

    assert_eq!(scenario.balance(&scenario.staking_token, &staker1), 0);
    assert_eq!(scenario.balance(&scenario.staking_token, &scenario.pool), BALANCE);
    assert_eq!(scenario.core.deposit_checkpoint_block(&staker1), block);
    assert_eq!(scenario.core.deposit_amount(&staker1), BALANCE);
}

#[test]
fn users_can_withdraw_their_tokens() {
    let mut scenario = Scenario::new();
    scenario.fund();
    let staker1 = scenario.staker1.clone();
    scenario.stake(staker1.clone(), BALANCE);

    for _ in 0..3 {
        scenario.mine();
        scenario.core.withdraw(&staker1, 10).unwrap();
    }

    scenario.mine();
    let err = scenario.core.withdraw(&staker1, BALANCE).unwrap_err();
    assert!(err
        .to_string()
        .contains("Cannot withdraw more tokens than you deposited"));
    assert_eq!(scenario.core.deposit_amount(&staker1), BALANCE - 30);

    scenario.mine();
    scenario.core.withdraw(&staker1, BALANCE - 30).unwrap();
    assert_eq!(scenario.balance(&scenario.staking_token, &staker1), BALANCE);
}

#[test]
fn users_can_claim_their_reward_tokens() {
    let mut scenario = Scenario::new();
    scenario.fund();
    let staker1 = scenario.staker1.clone();
    scenario.stake(staker1.clone(), BALANCE);

    for _ in 0..3 {
        scenario.mine();
    }

    let paid = scenario.core.claim(&staker1).unwrap();
    assert_eq!(paid, REWARD_AMOUNT / 10 * 3);
    assert_eq!(
        scenario.balance(&scenario.reward_token, &staker1),
        REWARD_AMOUNT / 10 * 3
    );
}

#[test]
fn stakers_accrue_independently() {
    let mut scenario = Scenario::new();
    scenario.fund();
    let staker1 = scenario.staker1.clone();
    let staker2 = scenario.staker2.clone();
    let first = scenario.stake(staker1.clone(), 1_000);
    let second = scenario.stake(staker2.clone(), 2_000);
    scenario.mine();
    let now = scenario.core.clock().current_block();
    let rate = scenario.core.reward_rate();

    assert_eq!(scenario.core.claim(&staker1).unwrap(), rate * u128::from(now - first));
    assert_eq!(scenario.core.claim(&staker2).unwrap(), rate * u128::from(now - second));
    assert_eq!(scenario.core.total_staked(), 3_000);
}

#[test]
fn early_staker_earns_only_funded_blocks() {
    let mut scenario = Scenario::new();
    let staker1 = scenario.staker1.clone();
    scenario.stake(staker1.clone(), BALANCE);
    for _ in 0..50 {
        scenario.mine();
    }
    scenario.fund();
    scenario.mine();

    let paid = scenario.core.claim(&staker1).unwrap();
    assert_eq!(paid, REWARD_AMOUNT / DURATION as u128);
    assert_eq!(scenario.balance(&scenario.reward_token, &staker1), paid);
}

#[test]
fn withdrawal_conservation_over_many_slices() {
    let mut scenario = Scenario::new();
    let staker2 = scenario.staker2.clone();
    scenario.stake(staker2.clone(), BALANCE);

    let slices = [1, 7, 1_000, 98_992, 400_000];
    assert_eq!(slices.iter().sum::<u128>(), BALANCE);
    for slice in slices {
        scenario.mine();
        scenario.core.withdraw(&staker2, slice).unwrap();
    }

    assert_eq!(scenario.balance(&scenario.staking_token, &staker2), BALANCE);
    assert_eq!(scenario.balance(&scenario.staking_token, &scenario.pool), 0);
    assert_eq!(
        scenario.core.withdraw(&staker2, 1).unwrap_err(),
        StakingError::InsufficientStake {
            requested: 1,
            deposited: 0
        }
    );
}
