//! A small but complete demonstration game.
//!
//! Three public companies, three privates (one with a special tile-lay
//! right, one bundled with a president certificate), three train
//! generations and a compact one-dimensional market. Deliberately rich
//! enough to exercise every round type, yet small enough that tests can
//! walk whole games by hand.

use crate::core::Cash;
use crate::definition::{
    BundledCertDef, GameDefinition, GameOptions, HexDef, PhaseDef, PrivateDef, SpecialRightDef,
    StartItemDef, TrainKindDef,
};
use crate::entities::{
    Capitalization, CompanyDef, PriceZone, RightKind, StockSpace, Tile, TileColour,
};
use crate::core::TileId;

pub struct DemoGameBuilder {
    players: Vec<String>,
    options: GameOptions,
}

impl Default for DemoGameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoGameBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            players: ["Alice", "Bob", "Carol", "Dave"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            options: GameOptions::default(),
        }
    }

    #[must_use]
    pub fn players(mut self, players: &[&str]) -> Self {
        self.players = players.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn options(mut self, options: GameOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(&self) -> GameDefinition {
        GameDefinition {
            players: self.players.clone(),
            options: self.options.clone(),
            companies: companies(),
            privates: privates(),
            start_items: start_items(),
            train_kinds: train_kinds(),
            phases: phases(),
            market: market(),
            tiles: tiles(),
            hexes: hexes(),
        }
    }
}

fn companies() -> Vec<CompanyDef> {
    let blue_ridge = CompanyDef::standard("Blue Ridge Railway");
    let lakeshore = CompanyDef::standard("Lakeshore Line");
    let mut great_plains = CompanyDef::standard("Great Plains Railroad");
    great_plains.capitalization = Capitalization::Incremental;
    great_plains.may_trade_shares = true;
    vec![blue_ridge, lakeshore, great_plains]
}

fn privates() -> Vec<PrivateDef> {
    vec![
        PrivateDef {
            name: "Coal Creek Tramway".into(),
            base_price: 20,
            revenue: 5,
            closes_at_phase: Some("4".into()),
            right: None,
        },
        PrivateDef {
            name: "Harbor Branch".into(),
            base_price: 40,
            revenue: 10,
            closes_at_phase: Some("4".into()),
            right: Some(SpecialRightDef {
                kind: RightKind::TileLay,
                hex: None,
                extra: true,
                free: true,
                close_on_use: false,
            }),
        },
        PrivateDef {
            name: "Grand Junction".into(),
            base_price: 110,
            revenue: 20,
            closes_at_phase: Some("4".into()),
            right: None,
        },
    ]
}

fn start_items() -> Vec<StartItemDef> {
    vec![
        StartItemDef {
            private: "Coal Creek Tramway".into(),
            bundled_cert: None,
        },
        StartItemDef {
            private: "Harbor Branch".into(),
            bundled_cert: None,
        },
        StartItemDef {
            private: "Grand Junction".into(),
            bundled_cert: Some(BundledCertDef {
                company: "Blue Ridge Railway".into(),
                president: true,
            }),
        },
    ]
}

fn train_kinds() -> Vec<TrainKindDef> {
    vec![
        TrainKindDef {
            name: "2".into(),
            cost: 80,
            count: 6,
            phase: "2".into(),
            rusted_by: Some("4".into()),
        },
        TrainKindDef {
            name: "3".into(),
            cost: 180,
            count: 5,
            phase: "3".into(),
            rusted_by: None,
        },
        TrainKindDef {
            name: "4".into(),
            cost: 300,
            count: 4,
            phase: "4".into(),
            rusted_by: None,
        },
    ]
}

fn phases() -> Vec<PhaseDef> {
    vec![
        PhaseDef {
            name: "2".into(),
            train_limit: 4,
            tile_colours: vec![TileColour::Yellow],
            tile_lays: vec![(TileColour::Yellow, 1)],
            ors_per_set: 1,
        },
        PhaseDef {
            name: "3".into(),
            train_limit: 4,
            tile_colours: vec![TileColour::Yellow, TileColour::Green],
            tile_lays: vec![(TileColour::Yellow, 1), (TileColour::Green, 1)],
            ors_per_set: 2,
        },
        PhaseDef {
            name: "4".into(),
            train_limit: 3,
            tile_colours: vec![TileColour::Yellow, TileColour::Green, TileColour::Brown],
            tile_lays: vec![
                (TileColour::Yellow, 1),
                (TileColour::Green, 1),
                (TileColour::Brown, 1),
            ],
            ors_per_set: 2,
        },
    ]
}

fn market() -> Vec<StockSpace> {
    let prices: [(Cash, PriceZone, bool); 16] = [
        (30, PriceZone::Brown, false),
        (40, PriceZone::Brown, false),
        (50, PriceZone::Orange, false),
        (60, PriceZone::Yellow, false),
        (67, PriceZone::Normal, true),
        (71, PriceZone::Normal, true),
        (76, PriceZone::Normal, true),
        (82, PriceZone::Normal, true),
        (90, PriceZone::Normal, true),
        (100, PriceZone::Normal, true),
        (112, PriceZone::Normal, false),
        (126, PriceZone::Normal, false),
        (142, PriceZone::Normal, false),
        (160, PriceZone::Normal, false),
        (180, PriceZone::Normal, false),
        (200, PriceZone::Normal, false),
    ];
    prices
        .into_iter()
        .map(|(price, zone, par)| StockSpace { price, zone, par })
        .collect()
}

fn tiles() -> Vec<Tile> {
    vec![
        Tile {
            id: TileId(7),
            colour: TileColour::Yellow,
        },
        Tile {
            id: TileId(8),
            colour: TileColour::Yellow,
        },
        Tile {
            id: TileId(9),
            colour: TileColour::Yellow,
        },
        Tile {
            id: TileId(18),
            colour: TileColour::Green,
        },
        Tile {
            id: TileId(19),
            colour: TileColour::Green,
        },
        Tile {
            id: TileId(39),
            colour: TileColour::Brown,
        },
    ]
}

fn hexes() -> Vec<HexDef> {
    vec![
        HexDef {
            name: "Junction City".into(),
            cost: 0,
            token_slots: 2,
            tile: None,
        },
        HexDef {
            name: "Prairie Halt".into(),
            cost: 0,
            token_slots: 1,
            tile: None,
        },
        HexDef {
            name: "River Crossing".into(),
            cost: 80,
            token_slots: 0,
            tile: None,
        },
        HexDef {
            name: "Summit Pass".into(),
            cost: 120,
            token_slots: 0,
            tile: None,
        },
        HexDef {
            name: "Lakeside".into(),
            cost: 0,
            token_slots: 1,
            tile: Some(7),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_definition_is_valid() {
        let def = DemoGameBuilder::new().build();
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let mut options = GameOptions::default();
        options.cert_limit = 12;
        let def = DemoGameBuilder::new()
            .players(&["Eve", "Frank"])
            .options(options)
            .build();

        assert_eq!(def.players.len(), 2);
        assert_eq!(def.options.cert_limit, 12);
        assert!(def.validate().is_ok());
    }
}
