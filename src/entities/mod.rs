//! Game entities: players, companies, certificates, trains, phases, the
//! stock market, and the map.
//!
//! Entities are plain structs held in arenas on `GameState`. Immutable
//! configuration is embedded at build time; there are no parallel
//! interface hierarchies and no cross-entity pointers, only ids.

pub mod certificate;
pub mod company;
pub mod map;
pub mod market;
pub mod phase;
pub mod player;
pub mod private;
pub mod start_item;
pub mod train;

pub use certificate::Certificate;
pub use company::{Allocation, Capitalization, CompanyDef, PublicCompany};
pub use map::{MapHex, Tile, TileColour};
pub use market::{PriceZone, StockMarket, StockSpace};
pub use phase::Phase;
pub use player::Player;
pub use private::{PrivateCompany, RightKind, SpecialRight};
pub use start_item::StartItem;
pub use train::{Train, TrainKind};
