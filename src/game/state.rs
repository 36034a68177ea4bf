use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::card::{Card, CardId, Deck, DECK_SIZE, INITIAL_HAND_SIZE, PLAYER_COUNT};
use super::hand::Hand;
use super::play::{Play, PlayDescriptor};
use super::rules::RuleError;

/// 玩家标识，取值 0..4。
pub type PlayerId = u8;

pub fn next_player(player_id: PlayerId) -> PlayerId {
    (player_id + 1) % PLAYER_COUNT as PlayerId
}

/// 场面：最后一张单牌、出牌者、革命状态与行动权。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub last_play: Option<Card>,
    pub last_owner: Option<PlayerId>,
    pub under_revolution: bool,
    pub current_player: PlayerId,
    pub currently_drawable: bool,
}

impl TableState {
    pub fn is_empty(&self) -> bool {
        self.last_play.is_none()
    }

    pub(crate) fn reset_field(&mut self) {
        self.last_play = None;
        self.last_owner = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub(crate) hand: Hand,
    pub(crate) legal_plays: Vec<Play>,
    pub(crate) discarded: usize,
}

impl Player {
    pub fn new(id: PlayerId, hand: Hand) -> Self {
        Self {
            id,
            hand,
            legal_plays: Vec::new(),
            discarded: 0,
        }
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    /// 最近一次计算出的合法出牌，下次重新计算前有效。
    pub fn legal_plays(&self) -> &[Play] {
        &self.legal_plays
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

/// 回合阶段（状态机）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Phase {
    AwaitingDraw,
    AwaitingDiscard,
    Won { winner: PlayerId },
    Stuck,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Won { .. } | Phase::Stuck)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoundStatus {
    InProgress {
        current_player: PlayerId,
        currently_drawable: bool,
    },
    Won {
        winner: PlayerId,
    },
    Stuck,
}

/// 对局事件流。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    Discarded {
        player_id: PlayerId,
        play: Play,
        remaining: usize,
    },
    Attacked {
        attacker: PlayerId,
        victim: PlayerId,
        count: u32,
    },
    Won {
        winner: PlayerId,
    },
    Stuck {
        player_id: PlayerId,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::Discarded {
                player_id,
                play,
                remaining,
            } => write!(f, "{player_id} {play} | {remaining}"),
            GameEvent::Attacked {
                attacker,
                victim,
                count,
            } => write!(f, "attack {count} from {attacker} to {victim}"),
            GameEvent::Won { winner } => write!(f, "player {winner} win"),
            GameEvent::Stuck { .. } => f.write_str("can't do anything"),
        }
    }
}

/// 一局的全部可变状态，由引擎独占修改。
#[derive(Debug, Clone)]
pub struct RoundState {
    pub(crate) deck: Deck,
    pub(crate) players: Vec<Player>,
    pub(crate) table: TableState,
    pub(crate) phase: Phase,
    // 不设上限，整局保留
    pub(crate) events: Vec<GameEvent>,
}

impl RoundState {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::deal(Deck::new(rng))
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        Self::new(&mut rng)
    }

    /// 从一副已存在的牌堆发牌；牌堆可能已被抽过，余量不足 20 张时拒绝。
    pub fn from_deck(deck: Deck) -> Result<Self, RuleError> {
        if deck.remaining() < PLAYER_COUNT * INITIAL_HAND_SIZE {
            return Err(RuleError::DeckExhausted);
        }
        Ok(Self::deal(deck))
    }

    /// 按记录下来的牌序重放一局。
    pub fn replay(order: &[CardId]) -> Result<Self, RuleError> {
        let cards = order
            .iter()
            .map(|&id| Card::new(id))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_deck(Deck::stacked(cards)?)
    }

    /// 依次给 0..4 号玩家各发 5 张。
    fn deal(mut deck: Deck) -> Self {
        let players = (0..PLAYER_COUNT as PlayerId)
            .map(|id| Player::new(id, Hand::from_cards(deck.take(INITIAL_HAND_SIZE))))
            .collect();
        Self {
            deck,
            players,
            table: TableState::default(),
            phase: Phase::AwaitingDraw,
            events: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableState {
        &self.table
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_player(&self) -> PlayerId {
        self.table.current_player
    }

    pub fn last_play(&self) -> Option<Card> {
        self.table.last_play
    }

    pub fn under_revolution(&self) -> bool {
        self.table.under_revolution
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: PlayerId) -> Result<&Player, RuleError> {
        self.players
            .get(usize::from(player_id))
            .ok_or(RuleError::PlayerNotFound { player_id })
    }

    pub(crate) fn player_mut(&mut self, player_id: PlayerId) -> Result<&mut Player, RuleError> {
        self.players
            .get_mut(usize::from(player_id))
            .ok_or(RuleError::PlayerNotFound { player_id })
    }

    pub fn hand_size(&self, player_id: PlayerId) -> Result<usize, RuleError> {
        Ok(self.player(player_id)?.hand.len())
    }

    pub fn hand_display(&self, player_id: PlayerId) -> Result<String, RuleError> {
        Ok(self.player(player_id)?.hand.display())
    }

    pub fn legal_plays(&self, player_id: PlayerId) -> Result<Vec<PlayDescriptor>, RuleError> {
        Ok(self
            .player(player_id)?
            .legal_plays
            .iter()
            .map(Play::describe)
            .collect())
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// 渲染后的事件日志，最新的在前。
    pub fn event_log(&self) -> Vec<String> {
        self.events.iter().rev().map(GameEvent::to_string).collect()
    }

    pub fn round_status(&self) -> RoundStatus {
        match self.phase {
            Phase::Won { winner } => RoundStatus::Won { winner },
            Phase::Stuck => RoundStatus::Stuck,
            Phase::AwaitingDraw | Phase::AwaitingDiscard => RoundStatus::InProgress {
                current_player: self.table.current_player,
                currently_drawable: self.table.currently_drawable,
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// 手牌 + 牌堆余量 + 已出牌数，始终等于 75。
    pub fn conservation_total(&self) -> usize {
        let held: usize = self.players.iter().map(|player| player.hand.len()).sum();
        let discarded: usize = self.players.iter().map(|player| player.discarded).sum();
        held + self.deck.remaining() + discarded
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    #[cfg(test)]
    pub(crate) fn with_hands(hands: [Hand; PLAYER_COUNT], table: TableState) -> Self {
        let mut state = Self::with_seed(0);
        state.players = hands
            .into_iter()
            .enumerate()
            .map(|(id, hand)| Player::new(id as PlayerId, hand))
            .collect();
        state.table = table;
        state
    }
}

const _: () = assert!(DECK_SIZE >= PLAYER_COUNT * INITIAL_HAND_SIZE);
