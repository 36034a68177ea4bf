//! 游戏核心逻辑模块（牌、出牌规则、手牌、回合状态机）。

pub mod card;
pub mod hand;
pub mod play;
pub mod rules;
pub mod state;

pub use card::{
    Card,
    CardId,
    Deck,
    DECK_SIZE,
    EIGHT_RANK,
    INITIAL_HAND_SIZE,
    PLAYER_COUNT,
    RANK_COUNT,
    SUIT_COUNT,
};
pub use hand::Hand;
pub use play::{Play, PlayDescriptor, Revolution};
pub use rules::{RuleError, TurnEngine};
pub use state::{
    next_player,
    GameEvent,
    Phase,
    Player,
    PlayerId,
    RoundState,
    RoundStatus,
    TableState,
};
