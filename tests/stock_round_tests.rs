//! Stock round behaviour through the public manager API.

mod common;

use common::{act, blue_ridge, buy_packet, float_blue_ridge, ipo_cert, must, new_game};
use rust_18xx::{ActionKind, HolderId, PlayerId, PortfolioId, PossibleKind};

#[test]
fn test_priority_opens_the_round() {
    let mut manager = new_game();
    buy_packet(&mut manager);
    // Player 2 won the last item, so player 3 holds priority.
    assert_eq!(manager.round_name(), "stock round");
    assert_eq!(manager.state().current_player, PlayerId(3));
}

#[test]
fn test_four_buys_float_blue_ridge_with_full_capitalization() {
    let mut manager = new_game();
    let company = float_blue_ridge(&mut manager);

    let company_ref = manager.state().company(company);
    assert!(company_ref.has_floated());
    // Ten shares at a par of 67, paid in full at flotation.
    assert_eq!(manager.state().balance(HolderId::Company(company)), 670);
    // 20% president certificate plus four singles leaves 40% in the IPO.
    assert_eq!(manager.state().percent_of(PortfolioId::Ipo, company), 40);
}

#[test]
fn test_no_selling_in_the_first_stock_round() {
    let mut manager = new_game();
    buy_packet(&mut manager);

    // Walk the turn to player 2, who holds the president certificate.
    must(&mut manager, 3, ActionKind::Pass);
    must(&mut manager, 0, ActionKind::Pass);
    must(&mut manager, 1, ActionKind::Pass);

    let company = blue_ridge(&manager);
    assert!(!act(
        &mut manager,
        2,
        ActionKind::SellShares { company, count: 1 }
    ));
    assert!(!manager
        .possible_actions()
        .iter()
        .any(|p| matches!(p.kind, PossibleKind::SellShares { .. })));
}

#[test]
fn test_selling_drops_the_price_and_blocks_a_rebuy() {
    let mut manager = new_game();
    buy_packet(&mut manager);
    let company = blue_ridge(&manager);

    // Player 3 buys one share in the first stock round.
    let cert = ipo_cert(&manager, company);
    must(
        &mut manager,
        3,
        ActionKind::BuyCertificate {
            cert,
            from: PortfolioId::Ipo,
        },
    );
    must(&mut manager, 3, ActionKind::Pass);
    for player in [0u8, 1, 2, 3] {
        must(&mut manager, player, ActionKind::Pass);
    }

    // A revenue-only round passes by; the second stock round allows sells.
    assert_eq!(manager.round_name(), "stock round");
    assert_eq!(manager.state().current_player, PlayerId(0));
    let price_before = manager.state().market_price(company).unwrap();
    let cash_before = manager.state().balance(HolderId::Player(PlayerId(3)));

    must(&mut manager, 0, ActionKind::Pass);
    must(&mut manager, 1, ActionKind::Pass);
    must(&mut manager, 2, ActionKind::Pass);
    must(&mut manager, 3, ActionKind::SellShares { company, count: 1 });

    assert_eq!(
        manager.state().balance(HolderId::Player(PlayerId(3))),
        cash_before + price_before
    );
    assert!(manager.state().market_price(company).unwrap() < price_before);
    assert_eq!(manager.state().percent_of(PortfolioId::Pool, company), 10);

    // The seller may not buy the same company back this round.
    let cert = ipo_cert(&manager, company);
    assert!(!act(
        &mut manager,
        3,
        ActionKind::BuyCertificate {
            cert,
            from: PortfolioId::Ipo,
        }
    ));
}

#[test]
fn test_one_purchase_per_turn() {
    let mut manager = new_game();
    buy_packet(&mut manager);
    let company = blue_ridge(&manager);

    let cert = ipo_cert(&manager, company);
    must(
        &mut manager,
        3,
        ActionKind::BuyCertificate {
            cert,
            from: PortfolioId::Ipo,
        },
    );
    let cert = ipo_cert(&manager, company);
    assert!(!act(
        &mut manager,
        3,
        ActionKind::BuyCertificate {
            cert,
            from: PortfolioId::Ipo,
        }
    ));
}

#[test]
fn test_pool_share_costs_market_price() {
    let mut manager = new_game();
    buy_packet(&mut manager);
    let company = blue_ridge(&manager);

    // Player 3 buys a share, everyone passes, and player 3 sells it in the
    // next stock round, dropping the price into the pool's favour.
    let cert = ipo_cert(&manager, company);
    must(
        &mut manager,
        3,
        ActionKind::BuyCertificate {
            cert,
            from: PortfolioId::Ipo,
        },
    );
    must(&mut manager, 3, ActionKind::Pass);
    for player in [0u8, 1, 2, 3] {
        must(&mut manager, player, ActionKind::Pass);
    }
    must(&mut manager, 0, ActionKind::Pass);
    must(&mut manager, 1, ActionKind::Pass);
    must(&mut manager, 2, ActionKind::Pass);
    must(&mut manager, 3, ActionKind::SellShares { company, count: 1 });
    must(&mut manager, 3, ActionKind::Pass);

    // Player 0 picks the share up from the pool at the lowered price.
    let market = manager.state().market_price(company).unwrap();
    let offer = manager
        .possible_actions()
        .iter()
        .find_map(|p| match p.kind {
            PossibleKind::BuyCertificate {
                cert,
                from: PortfolioId::Pool,
                price,
            } => Some((cert, price)),
            _ => None,
        })
        .expect("the pool share should be on offer");
    assert_eq!(offer.1, market);

    let cash_before = manager.state().balance(HolderId::Player(PlayerId(0)));
    must(
        &mut manager,
        0,
        ActionKind::BuyCertificate {
            cert: offer.0,
            from: PortfolioId::Pool,
        },
    );
    assert_eq!(
        manager.state().balance(HolderId::Player(PlayerId(0))),
        cash_before - market
    );
    assert_eq!(manager.state().percent_of(PortfolioId::Pool, company), 0);
}
