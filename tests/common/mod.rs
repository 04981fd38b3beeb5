//! Shared drivers for the integration tests.
//!
//! Everything here goes through the public `GameManager` API only: actions
//! are submitted as a client would submit them, and helpers read ids out of
//! the published possible-action menu rather than poking at internals.

#![allow(dead_code)]

use rust_18xx::{
    ActionKind, CertId, CompanyId, DemoGameBuilder, GameAction, GameManager, PlayerId,
    PortfolioId, PossibleKind,
};

pub fn new_game() -> GameManager {
    GameManager::new(DemoGameBuilder::new().build()).unwrap()
}

pub fn act(manager: &mut GameManager, player: u8, kind: ActionKind) -> bool {
    manager.process(Some(GameAction::new(PlayerId(player), kind)))
}

pub fn must(manager: &mut GameManager, player: u8, kind: ActionKind) {
    let accepted = act(manager, player, kind.clone());
    assert!(accepted, "action should be accepted: {kind:?}");
}

/// Buy the whole start packet in order and par Blue Ridge at 67.
///
/// Players 0, 1 and 2 each take one item; the third item carries the Blue
/// Ridge president certificate, so player 2 ends up choosing its par price.
pub fn buy_packet(manager: &mut GameManager) {
    for player in [0u8, 1, 2] {
        let item = manager.state().first_unsold_item().unwrap();
        must(manager, player, ActionKind::BuyStartItem { item });
    }
    let company = blue_ridge(manager);
    must(manager, 2, ActionKind::SetSharePrice { company, par: 67 });
}

pub fn blue_ridge(manager: &GameManager) -> CompanyId {
    manager.state().company_id("Blue Ridge Railway").unwrap()
}

/// A non-president certificate of `company` sitting in the IPO.
pub fn ipo_cert(manager: &GameManager, company: CompanyId) -> CertId {
    manager
        .state()
        .company_certs_in(PortfolioId::Ipo, company)
        .into_iter()
        .find(|&c| !manager.state().certificate(c).president)
        .expect("an IPO certificate should remain")
}

/// Run the packet sale and then float Blue Ridge: four players buy one
/// IPO share each, reaching the 60% float threshold.
pub fn float_blue_ridge(manager: &mut GameManager) -> CompanyId {
    buy_packet(manager);
    let company = blue_ridge(manager);
    for player in [3u8, 0, 1, 2] {
        let cert = ipo_cert(manager, company);
        must(
            manager,
            player,
            ActionKind::BuyCertificate {
                cert,
                from: PortfolioId::Ipo,
            },
        );
        must(manager, player, ActionKind::Pass);
    }
    company
}

/// Every player passes once, which ends a stock round in which the last
/// turn was an acting one.
pub fn pass_out_stock_round(manager: &mut GameManager) {
    assert_eq!(manager.round_name(), "stock round");
    for _ in 0..manager.state().player_count() {
        let player = manager.state().current_player.0;
        must(manager, player, ActionKind::Pass);
    }
}

/// The train on offer from the bank shelf, read from the published menu.
pub fn bank_train_offer(manager: &GameManager) -> (rust_18xx::TrainId, rust_18xx::Cash) {
    manager
        .possible_actions()
        .iter()
        .find_map(|p| match p.kind {
            PossibleKind::BuyTrain {
                train,
                from: PortfolioId::Ipo,
                min,
                ..
            } => Some((train, min)),
            _ => None,
        })
        .expect("a bank train should be on offer")
}
