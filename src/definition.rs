//! The game definition: the fully parsed, immutable rule set.
//!
//! An external configuration collaborator (file parser, hard-coded game
//! module, test fixture) constructs a `GameDefinition`; this crate never
//! parses anything. The definition is validated once, then compiled into
//! the entity arenas of `GameState`. Cross-references between definition
//! records are by name and resolved to ids during the build.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{Cash, ConfigError};
use crate::entities::{CompanyDef, RightKind, StockSpace, Tile, TileColour};

/// Global rule options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOptions {
    pub bank_cash: Cash,
    pub starting_cash: Cash,
    /// Maximum counting certificates per player.
    pub cert_limit: u32,
    /// Maximum percent of one company a player may hold.
    pub player_hold_limit: u8,
    /// Hard ceiling on pool-held percent of one company.
    pub pool_share_limit: u8,
    /// Maximum percent of its own shares a company may hold.
    pub treasury_share_limit: u8,
    /// Bid increment unit; bids must be multiples of this.
    pub bid_increment: Cash,
    /// Price reduction applied to the first unsold start item each time
    /// every player passes. Zero disables reductions; an all-pass turn
    /// then ends the start round instead.
    pub buy_price_decrement: Cash,
    pub sell_buy_order: SellBuyOrder,
    pub no_sell_in_first_sr: bool,
    pub skip_first_stock_round: bool,
    pub bank_break_ends: GameEndTiming,
    pub bankruptcy_ends_game: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            bank_cash: 12_000,
            starting_cash: 600,
            cert_limit: 16,
            player_hold_limit: 60,
            pool_share_limit: 50,
            treasury_share_limit: 50,
            bid_increment: 5,
            buy_price_decrement: 5,
            sell_buy_order: SellBuyOrder::SellBuySell,
            no_sell_in_first_sr: true,
            skip_first_stock_round: false,
            bank_break_ends: GameEndTiming::EndOfOrSet,
            bankruptcy_ends_game: true,
        }
    }
}

/// Permitted ordering of sells and the single buy within a stock turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellBuyOrder {
    /// Sell, buy, then sell again.
    SellBuySell,
    /// All selling must precede the buy.
    SellBuy,
    /// Either order, but not sell-buy-sell.
    SellBuyOrBuySell,
}

/// When a broken bank ends the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEndTiming {
    Immediate,
    /// Finish the current set of operating rounds first.
    EndOfOrSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateDef {
    pub name: String,
    pub base_price: Cash,
    pub revenue: Cash,
    /// Phase name at which the private closes.
    pub closes_at_phase: Option<String>,
    pub right: Option<SpecialRightDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecialRightDef {
    pub kind: RightKind,
    /// Hex name the right is restricted to.
    pub hex: Option<String>,
    pub extra: bool,
    pub free: bool,
    pub close_on_use: bool,
}

/// One start-packet item: a private, optionally bundled with a company
/// certificate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartItemDef {
    pub private: String,
    pub bundled_cert: Option<BundledCertDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundledCertDef {
    pub company: String,
    pub president: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainKindDef {
    pub name: String,
    pub cost: Cash,
    pub count: u8,
    /// Phase entered when the first train of this kind is bought.
    pub phase: String,
    /// Kind whose first purchase rusts these trains.
    pub rusted_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub name: String,
    pub train_limit: u8,
    pub tile_colours: Vec<TileColour>,
    pub tile_lays: Vec<(TileColour, u8)>,
    pub ors_per_set: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexDef {
    pub name: String,
    pub cost: Cash,
    pub token_slots: u8,
    /// Preprinted tile, if any.
    pub tile: Option<u16>,
}

/// The complete immutable rule set for one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    pub players: Vec<String>,
    pub options: GameOptions,
    pub companies: Vec<CompanyDef>,
    pub privates: Vec<PrivateDef>,
    pub start_items: Vec<StartItemDef>,
    pub train_kinds: Vec<TrainKindDef>,
    pub phases: Vec<PhaseDef>,
    pub market: Vec<StockSpace>,
    pub tiles: Vec<Tile>,
    pub hexes: Vec<HexDef>,
}

fn unique_names<'a>(
    names: impl Iterator<Item = &'a str>,
) -> Result<FxHashMap<&'a str, usize>, ConfigError> {
    let mut map = FxHashMap::default();
    for (i, name) in names.enumerate() {
        if map.insert(name, i).is_some() {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
    }
    Ok(map)
}

fn unknown(kind: &'static str, name: &str) -> ConfigError {
    ConfigError::UnknownReference {
        kind,
        name: name.to_string(),
    }
}

impl GameDefinition {
    /// Check internal consistency. Run once before the state is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=8).contains(&self.players.len()) {
            return Err(ConfigError::PlayerCount(self.players.len()));
        }
        if self.phases.is_empty() {
            return Err(ConfigError::Empty("phases"));
        }
        if self.market.is_empty() {
            return Err(ConfigError::Empty("market"));
        }

        unique_names(self.players.iter().map(String::as_str))?;
        let companies = unique_names(self.companies.iter().map(|c| c.name.as_str()))?;
        let privates = unique_names(self.privates.iter().map(|p| p.name.as_str()))?;
        let phases = unique_names(self.phases.iter().map(|p| p.name.as_str()))?;
        let kinds = unique_names(self.train_kinds.iter().map(|k| k.name.as_str()))?;
        let hexes = unique_names(self.hexes.iter().map(|h| h.name.as_str()))?;

        let has_par_spaces = self.market.iter().any(|s| s.par);

        for company in &self.companies {
            let unit = company.share_unit;
            if unit == 0 || 100 % unit != 0 {
                return Err(ConfigError::BadShareUnit {
                    company: company.name.clone(),
                    unit,
                });
            }
            if company.president_percent % unit != 0 || company.president_percent == 0 {
                return Err(ConfigError::SharesNotWhole {
                    company: company.name.clone(),
                    total: company.president_percent as u32,
                });
            }
            if !(unit..=100).contains(&company.float_percent) {
                return Err(ConfigError::BadFloatPercent {
                    company: company.name.clone(),
                    percent: company.float_percent,
                });
            }
            if company.fixed_par.is_none() && !has_par_spaces {
                return Err(ConfigError::NoParSpaces(company.name.clone()));
            }
        }

        for private in &self.privates {
            if let Some(phase) = &private.closes_at_phase {
                if !phases.contains_key(phase.as_str()) {
                    return Err(unknown("phase", phase));
                }
            }
            if let Some(right) = &private.right {
                if let Some(hex) = &right.hex {
                    if !hexes.contains_key(hex.as_str()) {
                        return Err(unknown("hex", hex));
                    }
                }
            }
        }

        let mut seen_privates = FxHashMap::default();
        for item in &self.start_items {
            if !privates.contains_key(item.private.as_str()) {
                return Err(unknown("private", &item.private));
            }
            if seen_privates.insert(item.private.as_str(), ()).is_some() {
                return Err(ConfigError::DuplicateName(item.private.clone()));
            }
            if let Some(cert) = &item.bundled_cert {
                if !companies.contains_key(cert.company.as_str()) {
                    return Err(unknown("company", &cert.company));
                }
            }
        }

        for kind in &self.train_kinds {
            if !phases.contains_key(kind.phase.as_str()) {
                return Err(unknown("phase", &kind.phase));
            }
            if let Some(rusted_by) = &kind.rusted_by {
                if !kinds.contains_key(rusted_by.as_str()) {
                    return Err(unknown("train kind", rusted_by));
                }
            }
        }

        let tile_ids: FxHashMap<u16, ()> = self.tiles.iter().map(|t| (t.id.0, ())).collect();
        for hex in &self.hexes {
            if let Some(tile) = hex.tile {
                if !tile_ids.contains_key(&tile) {
                    return Err(unknown("tile", &tile.to_string()));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn phase_index(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.name == name)
    }
}
