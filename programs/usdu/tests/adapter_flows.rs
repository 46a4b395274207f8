use curve_sim::fixture::{
    add_direct_liquidity, build, buy_stable, faucet, fund_depositor, FixtureParams, SimHost, ADAPTER, ADMIN,
    KEEPER, POOL, REBALANCER, USDC, USDU,
};
use usdu::constants::{MAX_SLIPPAGE_BPS, UNIT};
use usdu::invariants::{adapter_position_value, collateral_deficit, solvency_bound};
use usdu::math::{convert_at_rate, mul_div_down, mul_div_up};
use usdu::{Address, DepositMode, ParameterUpdate, StableSwapPool, UsduError, UsduEvent};

const ALICE: Address = Address::repeat_byte(0xa1);
const BOB: Address = Address::repeat_byte(0xb0);
const TRADER: Address = Address::repeat_byte(0x7d);

fn stable_heavy() -> SimHost {
    build(&FixtureParams::stable_heavy()).unwrap()
}

fn balance(host: &SimHost, token: Address, account: Address) -> u64 {
    host.world().bank.balance_of(&token, &account).unwrap()
}

fn assert_unchanged(before: &SimHost, after: &SimHost) {
    assert_eq!(before.world().bank, after.world().bank);
    assert_eq!(before.world().pool, after.world().pool);
    assert_eq!(before.world().adapter, after.world().adapter);
    assert_eq!(before.world().rebalancer, after.world().rebalancer);
    assert_eq!(before.world().events, after.world().events);
}

fn snapshot(host: &SimHost) -> SimHost {
    SimHost::new(host.world().clone())
}

fn deficit(host: &SimHost) -> u64 {
    let world = host.world();
    let value = adapter_position_value(&world.pool, &world.bank, &world.adapter).unwrap();
    collateral_deficit(world.adapter.total_minted, value)
}

#[test]
fn deposit_mints_at_pool_rate() {
    let mut host = stable_heavy();
    let amount = 200_000 * UNIT;
    fund_depositor(&mut host, ALICE, amount).unwrap();

    let rate = host.world().pool.get_dy(0, 1, UNIT).unwrap();
    let reserves_before = host.world().pool.get_balances();

    let receipt = host.deposit(ALICE, amount, 0).unwrap();

    // the pool is stablecoin-heavy, so one USDC buys more than one USDU
    assert!(rate > UNIT);
    assert_eq!(receipt.rate_used, rate);
    assert_eq!(receipt.stable_minted, convert_at_rate(amount, rate).unwrap());
    assert!(receipt.stable_minted > amount);
    assert_eq!(receipt.stable_pooled, 0);
    assert_eq!(receipt.old_total_minted, 0);
    assert_eq!(receipt.new_total_minted, receipt.stable_minted);

    let world = host.world();
    assert_eq!(world.adapter.total_minted, receipt.stable_minted);
    assert_eq!(world.adapter.operation_counter, 1);
    assert_eq!(balance(&host, USDU, ALICE), receipt.stable_minted);
    assert_eq!(balance(&host, USDC, ALICE), 0);
    assert_eq!(balance(&host, POOL, ADAPTER), receipt.lp_received);
    assert_eq!(world.pool.get_balances(), [reserves_before[0] + amount, reserves_before[1]]);
    assert_eq!(world.events.last(), Some(&UsduEvent::Deposited(receipt)));
}

#[test]
fn deposits_accumulate_total_minted() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 50_000 * UNIT).unwrap();
    fund_depositor(&mut host, BOB, 70_000 * UNIT).unwrap();

    let first = host.deposit(ALICE, 50_000 * UNIT, 0).unwrap();
    let second = host.deposit(BOB, 70_000 * UNIT, 0).unwrap();

    assert_eq!(second.old_total_minted, first.new_total_minted);
    assert_eq!(
        host.world().adapter.total_minted,
        first.stable_minted + second.stable_minted
    );
    // the first deposit moved the pool toward parity, so the second is priced lower
    assert!(second.rate_used < first.rate_used);
}

#[test]
fn deposit_below_minimum_reverts() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 10_000 * UNIT).unwrap();
    let before = snapshot(&host);

    let rate = host.world().pool.get_dy(0, 1, UNIT).unwrap();
    let quoted = convert_at_rate(10_000 * UNIT, rate).unwrap();

    assert_eq!(
        host.deposit(ALICE, 10_000 * UNIT, quoted + 1),
        Err(UsduError::SlippageExceeded)
    );
    assert_unchanged(&before, &host);
    assert_eq!(host.stats(), (2, 1));
}

#[test]
fn deposit_into_underwater_position_reverts() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();

    // an outside buy drains USDU from the pool and sinks the position's value
    faucet(&mut host, TRADER, 3_000_000 * UNIT).unwrap();
    buy_stable(&mut host, TRADER, 3_000_000 * UNIT).unwrap();

    let minted = host.world().adapter.total_minted;
    let shortfall = deficit(&host);
    assert!(shortfall > solvency_bound(minted, host.world().adapter.max_slippage_bps).unwrap());

    // the new LP alone backs the new mint, but the whole position does not
    fund_depositor(&mut host, BOB, 100_000 * UNIT).unwrap();
    let before = snapshot(&host);
    assert_eq!(
        host.deposit(BOB, 100_000 * UNIT, 0),
        Err(UsduError::SolvencyViolation)
    );
    assert_unchanged(&before, &host);

    // holders can still exit, and exiting does not widen the shortfall
    host.redeem(ALICE, 50_000 * UNIT, 0).unwrap();
    assert!(deficit(&host) <= shortfall);
    assert_eq!(host.world().adapter.total_minted, minted - 50_000 * UNIT);
}

#[test]
fn deposit_into_empty_pool_fails_pool_call() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 1_000 * UNIT).unwrap();

    let supply = host.world().pool.lp_total_supply(&host.world().bank).unwrap();
    host.with_pool("drain", |pool, bank| pool.remove_liquidity(bank, REBALANCER, supply, [0, 0]))
        .unwrap();
    assert_eq!(host.world().pool.get_balances(), [0, 0]);

    let before = snapshot(&host);
    assert!(matches!(
        host.deposit(ALICE, 1_000 * UNIT, 0),
        Err(UsduError::PoolInteractionFailed(_))
    ));
    assert_unchanged(&before, &host);
}

#[test]
fn failed_operation_leaves_journal_untouched() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 10_000 * UNIT).unwrap();
    host.deposit(ALICE, 5_000 * UNIT, 0).unwrap();
    let journal = host.world().events.clone();

    assert_eq!(
        host.deposit(ALICE, 5_000 * UNIT, u64::MAX),
        Err(UsduError::SlippageExceeded)
    );
    assert_eq!(host.world().events, journal);

    let drained = host.drain_events();
    assert_eq!(drained, journal);
    assert!(host.world().events.is_empty());

    // the journal keeps recording after a drain
    let receipt = host.deposit(ALICE, 5_000 * UNIT, 0).unwrap();
    assert_eq!(host.world().events, vec![UsduEvent::Deposited(receipt)]);
}

#[test]
fn deposit_rejects_zero_and_unapproved() {
    let mut host = stable_heavy();
    assert_eq!(host.deposit(ALICE, 0, 0), Err(UsduError::ZeroAmount));

    faucet(&mut host, ALICE, 1_000 * UNIT).unwrap();
    assert_eq!(
        host.deposit(ALICE, 1_000 * UNIT, 0),
        Err(UsduError::InsufficientAllowance)
    );
    assert_eq!(host.world().adapter.total_minted, 0);
}

#[test]
fn deposit_blocked_while_adapter_locked() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 1_000 * UNIT).unwrap();
    host.transact("lock", |world| {
        world.adapter.locked = true;
        Ok(())
    })
    .unwrap();

    assert_eq!(host.deposit(ALICE, 1_000 * UNIT, 0), Err(UsduError::Reentrancy));
}

#[test]
fn balanced_mode_pools_a_stable_leg() {
    let params = FixtureParams {
        deposit_mode: DepositMode::Balanced,
        ..FixtureParams::stable_heavy()
    };
    let mut host = build(&params).unwrap();
    fund_depositor(&mut host, ALICE, 30_000 * UNIT).unwrap();
    let reserves = host.world().pool.get_balances();

    let receipt = host.deposit(ALICE, 30_000 * UNIT, 0).unwrap();

    let expected_leg = mul_div_down(30_000 * UNIT, reserves[1], reserves[0]).unwrap();
    assert_eq!(receipt.stable_pooled, expected_leg);
    assert_eq!(
        host.world().adapter.total_minted,
        receipt.stable_minted + receipt.stable_pooled
    );
    assert_eq!(balance(&host, USDU, ALICE), receipt.stable_minted);
    assert_eq!(
        host.world().pool.get_balances(),
        [reserves[0] + 30_000 * UNIT, reserves[1] + expected_leg]
    );
}

#[test]
fn direct_lp_cannot_withdraw_without_minted_share() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();

    // Bob provides liquidity straight to the pool and never touches the adapter
    faucet(&mut host, BOB, 100_000 * UNIT).unwrap();
    let lp = add_direct_liquidity(&mut host, BOB, [100_000 * UNIT, 0]).unwrap();
    host.approve(POOL, BOB, ADAPTER, lp).unwrap();
    let before = snapshot(&host);

    assert_eq!(
        host.remove_liquidity(BOB, lp, 0),
        Err(UsduError::InsufficientMintedBalance)
    );
    assert_unchanged(&before, &host);
    assert_eq!(balance(&host, POOL, BOB), lp);
}

#[test]
fn withdrawal_burns_proportional_share() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    let deposit = host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();

    faucet(&mut host, ALICE, 80_000 * UNIT).unwrap();
    let lp = add_direct_liquidity(&mut host, ALICE, [80_000 * UNIT, 0]).unwrap();
    host.approve(POOL, ALICE, ADAPTER, lp).unwrap();

    let supply = host.world().pool.lp_total_supply(&host.world().bank).unwrap();
    let reserves = host.world().pool.get_balances();
    let minted = host.world().adapter.total_minted;
    let expected_burn = mul_div_up(minted, lp, supply).unwrap();

    let receipt = host.remove_liquidity(ALICE, lp, 0).unwrap();

    assert_eq!(receipt.stable_burned, expected_burn);
    assert_eq!(receipt.amount_out, mul_div_down(reserves[0], lp, supply).unwrap());
    assert_eq!(receipt.stable_out, mul_div_down(reserves[1], lp, supply).unwrap());
    assert_eq!(receipt.new_total_minted, minted - expected_burn);
    assert_eq!(host.world().adapter.total_minted, minted - expected_burn);
    assert_eq!(
        balance(&host, USDU, ALICE),
        deposit.stable_minted - expected_burn + receipt.stable_out
    );
    assert_eq!(balance(&host, USDC, ALICE), receipt.amount_out);
    assert_eq!(balance(&host, POOL, ALICE), 0);
}

#[test]
fn withdrawal_slippage_floor() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();
    faucet(&mut host, ALICE, 10_000 * UNIT).unwrap();
    let lp = add_direct_liquidity(&mut host, ALICE, [10_000 * UNIT, 0]).unwrap();
    host.approve(POOL, ALICE, ADAPTER, lp).unwrap();

    assert_eq!(
        host.remove_liquidity(ALICE, lp, 10_000 * UNIT),
        Err(UsduError::SlippageExceeded)
    );
    assert_eq!(balance(&host, POOL, ALICE), lp);
}

#[test]
fn redeem_unwinds_adapter_position() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    let deposit = host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();

    let half = deposit.stable_minted / 2;
    let adapter_lp = balance(&host, POOL, ADAPTER);
    let receipt = host.redeem(ALICE, half, 0).unwrap();

    assert_eq!(receipt.lp_withdrawn, mul_div_down(adapter_lp, half, deposit.stable_minted).unwrap());
    assert_eq!(receipt.new_total_minted, deposit.stable_minted - half);
    assert_eq!(balance(&host, USDU, ALICE), deposit.stable_minted - half);
    assert_eq!(balance(&host, USDC, ALICE), receipt.amount_out);
    assert_eq!(balance(&host, POOL, ADAPTER), adapter_lp - receipt.lp_withdrawn);

    // half the position comes back as roughly half the deposit, less pool fees
    assert!(receipt.amount_out < 100_100 * UNIT);
    assert!(receipt.amount_out > 99_500 * UNIT);
}

#[test]
fn redeem_bounds() {
    let mut host = stable_heavy();
    fund_depositor(&mut host, ALICE, 10_000 * UNIT).unwrap();
    let deposit = host.deposit(ALICE, 10_000 * UNIT, 0).unwrap();

    assert_eq!(host.redeem(ALICE, 0, 0), Err(UsduError::ZeroAmount));
    assert_eq!(
        host.redeem(ALICE, deposit.stable_minted + 1, 0),
        Err(UsduError::InsufficientMintedBalance)
    );
    assert_eq!(host.redeem(BOB, 1_000 * UNIT, 0), Err(UsduError::InsufficientBalance));
    assert_eq!(
        host.redeem(ALICE, 1_000 * UNIT, 1_000 * UNIT),
        Err(UsduError::SlippageExceeded)
    );
    assert_eq!(host.world().adapter.total_minted, deposit.stable_minted);
}

#[test]
fn authority_handover() {
    let mut host = stable_heavy();
    let new_admin = Address::repeat_byte(0xa2);

    assert_eq!(
        host.transfer_adapter_authority(BOB, new_admin),
        Err(UsduError::Unauthorized)
    );
    assert_eq!(
        host.transfer_adapter_authority(ADMIN, Address::ZERO),
        Err(UsduError::InvalidParameter)
    );
    host.transfer_adapter_authority(ADMIN, new_admin).unwrap();
    assert_eq!(host.world().adapter.authority, new_admin);

    assert_eq!(
        host.transfer_rebalancer_authority(ADMIN, new_admin),
        Err(UsduError::Unauthorized)
    );
    host.transfer_rebalancer_authority(KEEPER, new_admin).unwrap();
    assert_eq!(host.world().rebalancer.authority, new_admin);
}

#[test]
fn parameter_updates_are_scoped_per_component() {
    let mut host = stable_heavy();

    let too_loose = ParameterUpdate {
        max_slippage_bps: Some(MAX_SLIPPAGE_BPS + 1),
        ..ParameterUpdate::default()
    };
    assert_eq!(host.update_parameters(ADMIN, too_loose), Err(UsduError::InvalidParameter));

    let adapter_only = ParameterUpdate {
        deposit_mode: Some(DepositMode::Balanced),
        max_slippage_bps: Some(25),
        ..ParameterUpdate::default()
    };
    host.update_parameters(ADMIN, adapter_only).unwrap();
    assert_eq!(host.world().adapter.deposit_mode, DepositMode::Balanced);
    assert_eq!(host.world().adapter.max_slippage_bps, 25);

    // the admin does not own the rebalancer, so the whole update reverts
    let mixed = ParameterUpdate {
        max_slippage_bps: Some(10),
        unwind_bps: Some(2_500),
        ..ParameterUpdate::default()
    };
    assert_eq!(host.update_parameters(ADMIN, mixed), Err(UsduError::Unauthorized));
    assert_eq!(host.world().adapter.max_slippage_bps, 25);

    let rebalancer_only = ParameterUpdate {
        unwind_bps: Some(2_500),
        ..ParameterUpdate::default()
    };
    host.update_parameters(KEEPER, rebalancer_only).unwrap();
    assert_eq!(host.world().rebalancer.unwind_bps, 2_500);

    assert_eq!(
        host.update_parameters(ADMIN, ParameterUpdate::default()),
        Err(UsduError::InvalidParameter)
    );
}
