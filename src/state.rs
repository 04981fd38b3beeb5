//! The complete mutable game state.
//!
//! One arena per entity kind, the cash ledger, and the portfolio ledger.
//! Built once from a validated `GameDefinition` and then mutated only by
//! round action handlers. Rebuilding from the definition and replaying the
//! executed-action log reproduces any reachable state, which is what undo
//! and reload rely on.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::core::{
    Cash, CashLedger, CertId, CompanyId, ConfigError, HexId, HolderId, PlayerId, PortfolioId,
    PrivateId, StartItemId, TileId, TrainId,
};
use crate::definition::{GameDefinition, GameOptions};
use crate::entities::{
    Certificate, MapHex, Phase, Player, PriceZone, PrivateCompany, PublicCompany, SpecialRight,
    StartItem, StockMarket, Tile, Train, TrainKind,
};
use crate::ledger::{Holding, PortfolioLedger};

pub struct GameState {
    pub options: GameOptions,
    pub players: Vec<Player>,
    pub companies: Vec<PublicCompany>,
    pub privates: Vec<PrivateCompany>,
    pub certificates: Vec<Certificate>,
    pub trains: Vec<Train>,
    pub train_kinds: Vec<TrainKind>,
    pub phases: Vec<Phase>,
    pub market: StockMarket,
    pub tiles: Vec<Tile>,
    pub hexes: Vec<MapHex>,
    pub start_items: Vec<StartItem>,
    pub cash: CashLedger,
    pub portfolios: PortfolioLedger,
    /// Index into `phases`; advanced by train purchases, never reduced.
    pub phase_index: usize,
    /// Index of the next train kind to release to the IPO.
    pub next_train_release: usize,
    pub current_player: PlayerId,
    /// Survives round transitions; the player who opens the next round.
    pub priority_player: PlayerId,
}

impl GameState {
    /// Compile a validated definition into the initial state.
    pub fn build(def: &GameDefinition) -> Result<Self, ConfigError> {
        def.validate()?;

        let players: Vec<Player> = def
            .players
            .iter()
            .enumerate()
            .map(|(i, name)| Player::new(PlayerId(i as u8), name.clone()))
            .collect();

        let companies: Vec<PublicCompany> = def
            .companies
            .iter()
            .enumerate()
            .map(|(i, c)| c.build(CompanyId(i as u16)))
            .collect();

        let phase_by_name: FxHashMap<&str, usize> = def
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();
        let hex_by_name: FxHashMap<&str, usize> = def
            .hexes
            .iter()
            .enumerate()
            .map(|(i, h)| (h.name.as_str(), i))
            .collect();
        let kind_by_name: FxHashMap<&str, usize> = def
            .train_kinds
            .iter()
            .enumerate()
            .map(|(i, k)| (k.name.as_str(), i))
            .collect();

        let privates: Vec<PrivateCompany> = def
            .privates
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut private =
                    PrivateCompany::new(PrivateId(i as u16), p.name.clone(), p.base_price, p.revenue);
                private.closes_at_phase =
                    p.closes_at_phase.as_ref().map(|name| phase_by_name[name.as_str()]);
                private.right = p.right.as_ref().map(|r| SpecialRight {
                    kind: r.kind,
                    hex: r
                        .hex
                        .as_ref()
                        .map(|name| HexId(hex_by_name[name.as_str()] as u16)),
                    extra: r.extra,
                    free: r.free,
                    close_on_use: r.close_on_use,
                });
                private
            })
            .collect();

        let mut portfolios = PortfolioLedger::new();
        let mut certificates = Vec::new();

        for company in &companies {
            let def_company = &def.companies[company.id.index()];
            let pres_shares = def_company.president_percent / def_company.share_unit;
            let singles = (100 - def_company.president_percent) / def_company.share_unit;

            let pres = Certificate::new(
                CertId(certificates.len() as u32),
                company.id,
                pres_shares,
                true,
            );
            portfolios.place(Holding::Certificate(pres.id), PortfolioId::Ipo);
            certificates.push(pres);

            for _ in 0..singles {
                let cert =
                    Certificate::new(CertId(certificates.len() as u32), company.id, 1, false);
                portfolios.place(Holding::Certificate(cert.id), PortfolioId::Ipo);
                certificates.push(cert);
            }
        }

        let train_kinds: Vec<TrainKind> = def
            .train_kinds
            .iter()
            .map(|k| TrainKind {
                name: k.name.clone(),
                cost: k.cost,
                count: k.count,
                phase: phase_by_name[k.phase.as_str()],
                rusted_by: k
                    .rusted_by
                    .as_ref()
                    .map(|name| kind_by_name[name.as_str()]),
            })
            .collect();

        let mut trains = Vec::new();
        for (kind_index, kind) in train_kinds.iter().enumerate() {
            for _ in 0..kind.count {
                let train = Train {
                    id: TrainId(trains.len() as u32),
                    kind: kind_index,
                };
                let home = if kind_index == 0 {
                    PortfolioId::Ipo
                } else {
                    PortfolioId::Unavailable
                };
                portfolios.place(Holding::Train(train.id), home);
                trains.push(train);
            }
        }

        for private in &privates {
            portfolios.place(Holding::Private(private.id), PortfolioId::Ipo);
        }

        let company_by_name: FxHashMap<&str, usize> = def
            .companies
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();
        let private_by_name: FxHashMap<&str, usize> = def
            .privates
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();

        let mut start_items = Vec::new();
        for item_def in &def.start_items {
            let private_id = PrivateId(private_by_name[item_def.private.as_str()] as u16);
            let private = &privates[private_id.index()];
            let mut item = StartItem::new(
                StartItemId(start_items.len() as u16),
                private_id,
                private.base_price,
            );
            if let Some(bundle) = &item_def.bundled_cert {
                let company = CompanyId(company_by_name[bundle.company.as_str()] as u16);
                let cert = certificates
                    .iter()
                    .find(|c| c.company == company && c.president == bundle.president)
                    .map(|c| c.id)
                    .ok_or_else(|| ConfigError::UnknownReference {
                        kind: "certificate",
                        name: bundle.company.clone(),
                    })?;
                // Reserved until the item is awarded.
                portfolios.transfer(Holding::Certificate(cert), PortfolioId::Unavailable).ok();
                item.extra_cert = Some(cert);
            }
            start_items.push(item);
        }

        let hexes: Vec<MapHex> = def
            .hexes
            .iter()
            .enumerate()
            .map(|(i, h)| MapHex {
                id: HexId(i as u16),
                name: h.name.clone(),
                tile: h.tile.map(TileId),
                orientation: 0,
                cost: h.cost,
                token_slots: h.token_slots,
                tokens: Vec::new(),
            })
            .collect();

        let mut cash = CashLedger::new();
        cash.fund(HolderId::Bank, def.options.bank_cash);
        for player in &players {
            cash.fund(HolderId::Player(player.id), def.options.starting_cash);
        }

        Ok(Self {
            options: def.options.clone(),
            players,
            companies,
            privates,
            certificates,
            trains,
            train_kinds,
            phases: def
                .phases
                .iter()
                .map(|p| Phase {
                    name: p.name.clone(),
                    train_limit: p.train_limit,
                    tile_colours: p.tile_colours.iter().copied().collect(),
                    tile_lays: p.tile_lays.iter().copied().collect(),
                    ors_per_set: p.ors_per_set,
                })
                .collect(),
            market: StockMarket::new(def.market.clone()),
            tiles: def.tiles.clone(),
            hexes,
            start_items,
            cash,
            portfolios,
            phase_index: 0,
            next_train_release: if def.train_kinds.is_empty() { 0 } else { 1 },
            current_player: PlayerId(0),
            priority_player: PlayerId(0),
        })
    }

    // === Basic accessors ===

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.index()]
    }

    #[must_use]
    pub fn company(&self, id: CompanyId) -> &PublicCompany {
        &self.companies[id.index()]
    }

    pub fn company_mut(&mut self, id: CompanyId) -> &mut PublicCompany {
        &mut self.companies[id.index()]
    }

    #[must_use]
    pub fn private(&self, id: PrivateId) -> &PrivateCompany {
        &self.privates[id.index()]
    }

    pub fn private_mut(&mut self, id: PrivateId) -> &mut PrivateCompany {
        &mut self.privates[id.index()]
    }

    #[must_use]
    pub fn certificate(&self, id: CertId) -> &Certificate {
        &self.certificates[id.index()]
    }

    #[must_use]
    pub fn train(&self, id: TrainId) -> &Train {
        &self.trains[id.index()]
    }

    #[must_use]
    pub fn train_kind(&self, train: TrainId) -> &TrainKind {
        &self.train_kinds[self.trains[train.index()].kind]
    }

    #[must_use]
    pub fn hex(&self, id: HexId) -> &MapHex {
        &self.hexes[id.index()]
    }

    pub fn hex_mut(&mut self, id: HexId) -> &mut MapHex {
        &mut self.hexes[id.index()]
    }

    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn start_item(&self, id: StartItemId) -> &StartItem {
        &self.start_items[id.index()]
    }

    pub fn start_item_mut(&mut self, id: StartItemId) -> &mut StartItem {
        &mut self.start_items[id.index()]
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phases[self.phase_index]
    }

    // === Name lookups (tests and setup) ===

    #[must_use]
    pub fn company_id(&self, name: &str) -> Option<CompanyId> {
        self.companies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }

    #[must_use]
    pub fn private_id(&self, name: &str) -> Option<PrivateId> {
        self.privates.iter().find(|p| p.name == name).map(|p| p.id)
    }

    #[must_use]
    pub fn hex_id(&self, name: &str) -> Option<HexId> {
        self.hexes.iter().find(|h| h.name == name).map(|h| h.id)
    }

    #[must_use]
    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|p| p.name == name).map(|p| p.id)
    }

    // === Share arithmetic ===

    /// Share units of `company` held in `portfolio`.
    #[must_use]
    pub fn share_units(&self, portfolio: PortfolioId, company: CompanyId) -> u8 {
        self.portfolios
            .certificates_in(portfolio)
            .map(|c| self.certificate(c))
            .filter(|c| c.company == company)
            .map(|c| c.shares)
            .sum()
    }

    /// Percent of `company` held in `portfolio`.
    #[must_use]
    pub fn percent_of(&self, portfolio: PortfolioId, company: CompanyId) -> u8 {
        self.share_units(portfolio, company) * self.company(company).share_unit
    }

    /// Certificates of `company` in `portfolio`, non-president first.
    #[must_use]
    pub fn company_certs_in(&self, portfolio: PortfolioId, company: CompanyId) -> Vec<CertId> {
        let mut certs: Vec<CertId> = self
            .portfolios
            .certificates_in(portfolio)
            .filter(|&c| self.certificate(c).company == company)
            .collect();
        certs.sort_by_key(|&c| self.certificate(c).president);
        certs
    }

    /// Non-president certificates totalling exactly `units`, if possible.
    #[must_use]
    pub fn common_certs_for_units(
        &self,
        portfolio: PortfolioId,
        company: CompanyId,
        units: u8,
    ) -> Option<SmallVec<[CertId; 4]>> {
        let mut picked = SmallVec::new();
        let mut total = 0u8;
        for cert in self.company_certs_in(portfolio, company) {
            if total == units {
                break;
            }
            let cert_ref = self.certificate(cert);
            if cert_ref.president || total + cert_ref.shares > units {
                continue;
            }
            total += cert_ref.shares;
            picked.push(cert);
        }
        (total == units).then_some(picked)
    }

    /// The president certificate of a company.
    #[must_use]
    pub fn president_cert(&self, company: CompanyId) -> Option<CertId> {
        self.certificates
            .iter()
            .find(|c| c.company == company && c.president)
            .map(|c| c.id)
    }

    /// Portfolio currently holding the president certificate.
    #[must_use]
    pub fn president_portfolio(&self, company: CompanyId) -> Option<PortfolioId> {
        self.president_cert(company)
            .and_then(|c| self.portfolios.holder_of(Holding::Certificate(c)))
    }

    /// The player who is president, if the president certificate is held
    /// by a player portfolio.
    #[must_use]
    pub fn president_player(&self, company: CompanyId) -> Option<PlayerId> {
        match self.president_portfolio(company) {
            Some(PortfolioId::Player(p)) => Some(p),
            _ => None,
        }
    }

    // === Market ===

    #[must_use]
    pub fn market_price(&self, company: CompanyId) -> Option<Cash> {
        self.company(company)
            .market_index
            .map(|i| self.market.price(i))
    }

    #[must_use]
    pub fn market_zone(&self, company: CompanyId) -> Option<PriceZone> {
        self.company(company)
            .market_index
            .map(|i| self.market.space(i).zone)
    }

    // === Cash ===

    #[must_use]
    pub fn balance(&self, holder: HolderId) -> Cash {
        self.cash.balance(holder)
    }

    /// Cash a player can actually spend (balance minus blocked bids).
    #[must_use]
    pub fn free_cash(&self, player: PlayerId) -> Cash {
        self.balance(HolderId::Player(player)) - self.player(player).blocked_cash
    }

    /// Derived, never stored: cash plus share market value plus private
    /// base prices.
    #[must_use]
    pub fn player_worth(&self, player: PlayerId) -> Cash {
        let portfolio = PortfolioId::Player(player);
        let mut worth = self.balance(HolderId::Player(player));

        for cert in self.portfolios.certificates_in(portfolio) {
            let cert = self.certificate(cert);
            if let Some(price) = self.market_price(cert.company) {
                worth += price * cert.shares as Cash;
            }
        }
        for private in self.portfolios.privates_in(portfolio) {
            worth += self.private(private).base_price;
        }
        worth
    }

    // === Certificate limit ===

    /// Certificates counting against the per-player limit. Certificates of
    /// companies in relaxed market zones do not count; privates never do.
    #[must_use]
    pub fn cert_count_for_limit(&self, player: PlayerId) -> u32 {
        self.portfolios
            .certificates_in(PortfolioId::Player(player))
            .filter(|&c| {
                let company = self.certificate(c).company;
                self.market_zone(company)
                    .is_none_or(|zone| zone.counts_for_cert_limit())
            })
            .count() as u32
    }

    // === Start packet ===

    #[must_use]
    pub fn unsold_start_items_remain(&self) -> bool {
        self.start_items.iter().any(|i| !i.is_sold())
    }

    #[must_use]
    pub fn first_unsold_item(&self) -> Option<StartItemId> {
        self.start_items.iter().find(|i| !i.is_sold()).map(|i| i.id)
    }

    // === Trains ===

    /// The cheapest train the bank currently offers.
    #[must_use]
    pub fn cheapest_bank_train(&self) -> Option<(TrainId, Cash)> {
        self.portfolios
            .trains_in(PortfolioId::Ipo)
            .map(|t| (t, self.train_kind(t).cost))
            .min_by_key(|&(_, cost)| cost)
    }

    /// Companies holding more trains than the current limit allows.
    #[must_use]
    pub fn over_train_limit(&self) -> Vec<CompanyId> {
        let limit = self.phase().train_limit as usize;
        self.companies
            .iter()
            .filter(|c| {
                c.has_floated()
                    && !c.is_closed()
                    && self.portfolios.train_count(PortfolioId::Company(c.id)) > limit
            })
            .map(|c| c.id)
            .collect()
    }
}
