use curve_sim::fixture::{add_direct_liquidity, build, faucet, fund_depositor, FixtureParams, ADAPTER, POOL};
use usdu::constants::UNIT;
use usdu::{Address, DepositMode, StableSwapPool, UsduError};
use usdu_quote::{pool_imbalance, quote_deposit, quote_redeem, quote_remove_liquidity};

const ALICE: Address = Address::repeat_byte(0xa1);

#[test]
fn deposit_quote_matches_receipt() {
    for mode in [DepositMode::SingleSided, DepositMode::Balanced] {
        let params = FixtureParams {
            deposit_mode: mode,
            ..FixtureParams::stable_heavy()
        };
        let mut host = build(&params).unwrap();
        fund_depositor(&mut host, ALICE, 120_000 * UNIT).unwrap();

        let world = host.world();
        let quote = quote_deposit(&world.pool, &world.bank, &world.adapter, 120_000 * UNIT).unwrap();
        let receipt = host.deposit(ALICE, 120_000 * UNIT, quote.stable_minted).unwrap();

        assert_eq!(receipt.rate_used, quote.rate);
        assert_eq!(receipt.stable_minted, quote.stable_minted);
        assert_eq!(receipt.stable_pooled, quote.stable_pooled);
        // the estimate ignores the imbalance fee
        assert!(receipt.lp_received <= quote.lp_estimate);
    }
}

#[test]
fn withdrawal_quote_matches_receipt() {
    let mut host = build(&FixtureParams::stable_heavy()).unwrap();
    fund_depositor(&mut host, ALICE, 200_000 * UNIT).unwrap();
    host.deposit(ALICE, 200_000 * UNIT, 0).unwrap();
    faucet(&mut host, ALICE, 50_000 * UNIT).unwrap();
    let lp = add_direct_liquidity(&mut host, ALICE, [50_000 * UNIT, 0]).unwrap();
    host.approve(POOL, ALICE, ADAPTER, lp).unwrap();

    let world = host.world();
    let quote = quote_remove_liquidity(&world.pool, &world.bank, &world.adapter, lp).unwrap();
    let receipt = host.remove_liquidity(ALICE, lp, quote.amount_out).unwrap();

    assert_eq!(receipt.stable_burned, quote.stable_burned);
    assert_eq!(receipt.amount_out, quote.amount_out);
    assert_eq!(receipt.stable_out, quote.stable_out);
}

#[test]
fn redeem_quote_matches_receipt() {
    let mut host = build(&FixtureParams::stable_heavy()).unwrap();
    fund_depositor(&mut host, ALICE, 80_000 * UNIT).unwrap();
    let deposit = host.deposit(ALICE, 80_000 * UNIT, 0).unwrap();

    let world = host.world();
    let quote = quote_redeem(&world.pool, &world.bank, &world.adapter, deposit.stable_minted / 4).unwrap();
    assert_eq!(
        quote_redeem(&world.pool, &world.bank, &world.adapter, deposit.stable_minted + 1),
        Err(UsduError::InsufficientMintedBalance)
    );

    let receipt = host.redeem(ALICE, deposit.stable_minted / 4, quote.amount_out).unwrap();
    assert_eq!(receipt.lp_withdrawn, quote.lp_withdrawn);
    assert_eq!(receipt.amount_out, quote.amount_out);
}

#[test]
fn imbalance_reads_pool_reserves() {
    let host = build(&FixtureParams::reference_heavy()).unwrap();
    let imbalance = pool_imbalance(&host.world().pool, 0, 1);
    assert_eq!(imbalance.bps, 2_500);
    assert_eq!(imbalance.half_gap, 1_000_000 * UNIT);
    assert_eq!(host.world().pool.get_balances(), [5_000_000 * UNIT, 3_000_000 * UNIT]);
}
