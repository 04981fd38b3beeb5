//! Engine-wide invariants under randomized play.
//!
//! The walks below pick arbitrary entries from the published menu, turn
//! them into concrete actions, and submit them. Whatever happens, rejected
//! or accepted, the ledgers must conserve their totals and every company's
//! shares must keep summing to 100%.

use proptest::prelude::*;

use rust_18xx::entities::Allocation;
use rust_18xx::{
    ActionKind, DemoGameBuilder, GameAction, GameManager, HolderId, PlayerId, PortfolioId,
    PossibleAction, PossibleKind,
};

/// One concrete action from a menu entry, or `None` for entries that need
/// parameters the menu does not pin down (tile choice, meta actions).
fn concretize(possible: &PossibleAction) -> Option<GameAction> {
    let kind = match &possible.kind {
        PossibleKind::Pass => ActionKind::Pass,
        PossibleKind::BuyStartItem { item, .. } => ActionKind::BuyStartItem { item: *item },
        PossibleKind::Bid { item, min, unit } => {
            if min % unit != 0 {
                return None;
            }
            ActionKind::Bid {
                item: *item,
                amount: *min,
            }
        }
        PossibleKind::SetSharePrice { company, prices } => ActionKind::SetSharePrice {
            company: *company,
            par: prices[0],
        },
        PossibleKind::StartCompany { company, prices } => ActionKind::StartCompany {
            company: *company,
            par: prices[0],
        },
        PossibleKind::BuyCertificate { cert, from, .. } => ActionKind::BuyCertificate {
            cert: *cert,
            from: *from,
        },
        PossibleKind::SellShares { company, .. } => ActionKind::SellShares {
            company: *company,
            count: 1,
        },
        PossibleKind::SetRevenue { .. } => ActionKind::SetRevenue {
            amount: 0,
            allocation: Allocation::Withhold,
        },
        PossibleKind::BuyTrain {
            train,
            from,
            min,
            exchange,
            ..
        } => ActionKind::BuyTrain {
            train: *train,
            from: *from,
            price: *min,
            exchange: *exchange,
        },
        PossibleKind::DiscardTrain { train } => ActionKind::DiscardTrain { train: *train },
        PossibleKind::BuyTreasuryShare { company, .. } => {
            ActionKind::BuyTreasuryShare { company: *company }
        }
        PossibleKind::SellTreasuryShares { company, .. } => ActionKind::SellTreasuryShares {
            company: *company,
            count: 1,
        },
        _ => return None,
    };
    Some(GameAction::new(possible.player, kind))
}

fn share_percent_total(manager: &GameManager, company: rust_18xx::CompanyId) -> u32 {
    let state = manager.state();
    let mut portfolios = vec![
        PortfolioId::Ipo,
        PortfolioId::Pool,
        PortfolioId::Unavailable,
        PortfolioId::ScrapHeap,
    ];
    for player in 0..state.player_count() {
        portfolios.push(PortfolioId::Player(PlayerId(player as u8)));
    }
    for holder in &state.companies {
        portfolios.push(PortfolioId::Company(holder.id));
    }
    portfolios
        .into_iter()
        .map(|p| state.percent_of(p, company) as u32)
        .sum()
}

fn walk(manager: &mut GameManager, choices: &[u8]) {
    for &choice in choices {
        if manager.is_game_over() {
            break;
        }
        let candidates: Vec<GameAction> = manager
            .possible_actions()
            .iter()
            .filter_map(concretize)
            .collect();
        if candidates.is_empty() {
            break;
        }
        let action = candidates[choice as usize % candidates.len()].clone();
        manager.process(Some(action));
    }
}

proptest! {
    #[test]
    fn test_random_play_conserves_the_ledgers(choices in prop::collection::vec(any::<u8>(), 0..80)) {
        let mut manager = GameManager::new(DemoGameBuilder::new().build()).unwrap();
        let cash_total = manager.state().cash.total();
        let holdings_total = manager.state().portfolios.total();

        for &choice in &choices {
            if manager.is_game_over() {
                break;
            }
            let candidates: Vec<GameAction> = manager
                .possible_actions()
                .iter()
                .filter_map(concretize)
                .collect();
            if candidates.is_empty() {
                break;
            }
            let action = candidates[choice as usize % candidates.len()].clone();
            manager.process(Some(action));

            prop_assert_eq!(manager.state().cash.total(), cash_total);
            prop_assert_eq!(manager.state().portfolios.total(), holdings_total);
            for company in &manager.state().companies {
                prop_assert_eq!(share_percent_total(&manager, company.id), 100);
            }
        }
    }

    #[test]
    fn test_random_play_never_dips_a_player_below_zero(choices in prop::collection::vec(any::<u8>(), 0..60)) {
        let mut manager = GameManager::new(DemoGameBuilder::new().build()).unwrap();
        for &choice in &choices {
            if manager.is_game_over() {
                break;
            }
            let candidates: Vec<GameAction> = manager
                .possible_actions()
                .iter()
                .filter_map(concretize)
                .collect();
            if candidates.is_empty() {
                break;
            }
            let action = candidates[choice as usize % candidates.len()].clone();
            manager.process(Some(action));

            for player in 0..manager.state().player_count() {
                let balance = manager
                    .state()
                    .balance(HolderId::Player(PlayerId(player as u8)));
                prop_assert!(balance >= 0, "player {player} at {balance}");
            }
        }
    }

    #[test]
    fn test_random_play_replays_identically(choices in prop::collection::vec(any::<u8>(), 0..60)) {
        let mut manager = GameManager::new(DemoGameBuilder::new().build()).unwrap();
        walk(&mut manager, &choices);

        let saved = manager.to_saved();
        let restored = GameManager::from_saved(DemoGameBuilder::new().build(), &saved).unwrap();

        prop_assert_eq!(restored.round_name(), manager.round_name());
        prop_assert_eq!(restored.state().current_player, manager.state().current_player);
        prop_assert_eq!(restored.state().phase_index, manager.state().phase_index);
        prop_assert_eq!(
            restored.state().balance(HolderId::Bank),
            manager.state().balance(HolderId::Bank)
        );
        for player in 0..manager.state().player_count() {
            let holder = HolderId::Player(PlayerId(player as u8));
            prop_assert_eq!(
                restored.state().balance(holder),
                manager.state().balance(holder)
            );
        }
    }
}
