//! Core data model: identifiers, players, cards, zones, values, and
//! the mutable game state everything else operates on.

pub mod card;
pub mod player;
pub mod rng;
pub mod state;
pub mod value;
pub mod zone;

pub use card::{AbilityId, Card, CardId, CardType, ValueModification, ValueOp};
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use state::{GameState, PlayerValues, TriggerWatch};
pub use value::{ScriptItem, ScriptValue, ValueKind};
pub use zone::{ZoneKind, ZonePosition, ZoneVisibility, Zones};
