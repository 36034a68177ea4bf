use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::card::CardId;
use super::play::{Play, PlayDescriptor};
use super::state::{next_player, GameEvent, Phase, PlayerId, RoundState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    DeckExhausted,
    InvalidOperation {
        operation: String,
    },
    IllegalPlay {
        player_id: PlayerId,
        play: Play,
    },
    NotYourTurn {
        player_id: PlayerId,
        current_player: PlayerId,
    },
    GameFinished,
    InvalidPhase {
        expected: Phase,
        actual: Phase,
    },
    DrawNotAllowed,
    PlayerNotFound {
        player_id: PlayerId,
    },
    InvalidCard {
        card_id: CardId,
    },
    InvalidFace {
        suit: u8,
        rank: u8,
    },
    InvalidCombo {
        reason: String,
    },
    InvalidDeck {
        reason: String,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::DeckExhausted => f.write_str("deck exhausted"),
            RuleError::InvalidOperation { operation } => {
                write!(f, "invalid operation: {operation}")
            }
            RuleError::IllegalPlay { player_id, play } => {
                write!(f, "illegal play {play} for player {player_id}")
            }
            RuleError::NotYourTurn {
                player_id,
                current_player,
            } => write!(
                f,
                "player {player_id} acted during player {current_player}'s turn"
            ),
            RuleError::GameFinished => f.write_str("round already finished"),
            RuleError::InvalidPhase { expected, actual } => {
                write!(f, "expected phase {expected:?}, found {actual:?}")
            }
            RuleError::DrawNotAllowed => f.write_str("drawing is not allowed right now"),
            RuleError::PlayerNotFound { player_id } => write!(f, "no player {player_id}"),
            RuleError::InvalidCard { card_id } => write!(f, "no card with id {card_id}"),
            RuleError::InvalidFace { suit, rank } => {
                write!(f, "no card with suit {suit} and rank {rank}")
            }
            RuleError::InvalidCombo { reason } => write!(f, "invalid revolution: {reason}"),
            RuleError::InvalidDeck { reason } => write!(f, "invalid deck: {reason}"),
        }
    }
}

impl std::error::Error for RuleError {}

/// 回合推进：抽牌阶段 → 出牌阶段 → 下一位（或胜利 / 卡死）。
///
/// 每个阶段在修改状态前完成全部校验；失败时 `RoundState` 保持不变。
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnEngine;

impl TurnEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_in_progress(state: &RoundState) -> Result<(), RuleError> {
        if state.phase.is_terminal() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_phase(state: &RoundState, expected: Phase) -> Result<(), RuleError> {
        if state.phase != expected {
            return Err(RuleError::InvalidPhase {
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &RoundState, player_id: PlayerId) -> Result<(), RuleError> {
        state.player(player_id)?;
        if state.table.current_player != player_id {
            return Err(RuleError::NotYourTurn {
                player_id,
                current_player: state.table.current_player,
            });
        }
        Ok(())
    }

    pub fn request_draw(
        &mut self,
        state: &mut RoundState,
        player_id: PlayerId,
        wants_to_draw: bool,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_turn_owner(state, player_id).inspect_err(|error| {
            warn!("draw request rejected: {error}");
        })?;
        self.draw_phase(state, wants_to_draw)
    }

    pub fn request_discard(
        &mut self,
        state: &mut RoundState,
        player_id: PlayerId,
        play: &PlayDescriptor,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_turn_owner(state, player_id).inspect_err(|error| {
            warn!("discard request rejected: {error}");
        })?;
        self.discard_phase(state, play.play)
    }

    /// 当前玩家（可选）抽一张，然后重新计算合法出牌。
    pub fn draw_phase(
        &mut self,
        state: &mut RoundState,
        wants_to_draw: bool,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_phase(state, Phase::AwaitingDraw)?;
        if wants_to_draw && !state.table.currently_drawable {
            return Err(RuleError::DrawNotAllowed);
        }

        let player_id = state.table.current_player;
        let table = state.table;
        let drawn = if wants_to_draw {
            Some(state.deck.draw()?)
        } else {
            None
        };
        if drawn.is_some() && state.deck.would_exhaust() {
            warn!("deck down to its last card");
        }

        let player = state.player_mut(player_id)?;
        if let Some(card) = drawn {
            player.hand.add(card);
        }
        player.legal_plays = player.hand.generate_legal_plays(&table);
        let has_moves = !player.legal_plays.is_empty();
        debug!(
            "player {player_id} draw phase (drew: {}), {} legal plays",
            drawn.is_some(),
            player.legal_plays.len()
        );

        let mut events = Vec::new();
        if has_moves {
            state.phase = Phase::AwaitingDiscard;
        } else {
            warn!("player {player_id} has no legal play; round is stuck");
            state.phase = Phase::Stuck;
            let event = GameEvent::Stuck { player_id };
            state.record_event(event.clone());
            events.push(event);
        }
        Ok(events)
    }

    /// 出牌、攻击、革命、更新场面并决定下一位玩家。
    pub fn discard_phase(
        &mut self,
        state: &mut RoundState,
        play: Play,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_phase(state, Phase::AwaitingDiscard)?;

        let player_id = state.table.current_player;
        let player = state.player(player_id)?;
        if !player.legal_plays.contains(&play) {
            return Err(RuleError::IllegalPlay { player_id, play });
        }

        // 以下判断全部基于出牌前的场面
        let old_table = state.table;
        let finishes = player.hand.len() == play.cards().len();
        let attack = match play {
            Play::Single { .. } if !finishes => {
                play.attack_count(old_table.last_play, old_table.under_revolution)?
            }
            _ => 0,
        };
        let victim = old_table.last_owner.filter(|_| attack > 0);
        let attack = attack.max(0).unsigned_abs();
        if victim.is_some() && state.deck.remaining() < attack as usize {
            return Err(RuleError::DeckExhausted);
        }

        let mut events = Vec::new();
        let player = state.player_mut(player_id)?;
        let removed = player.hand.discard(&play);
        player.discarded += removed;
        player.legal_plays.clear();
        let remaining = player.hand.len();
        events.push(GameEvent::Discarded {
            player_id,
            play,
            remaining,
        });
        debug!("player {player_id} played {play}, {remaining} left");

        if remaining == 0 {
            info!("player {player_id} wins");
            state.phase = Phase::Won { winner: player_id };
            events.push(GameEvent::Won { winner: player_id });
            return Ok(Self::commit(state, events));
        }

        if let Some(victim) = victim {
            let drawn = state.deck.take(attack as usize);
            state.player_mut(victim)?.hand.extend(drawn);
            info!("player {player_id} attacks player {victim} for {attack}");
            events.push(GameEvent::Attacked {
                attacker: player_id,
                victim,
                count: attack,
            });
        }

        let table = &mut state.table;
        if let Play::Revolution { .. } = play {
            table.under_revolution = !table.under_revolution;
            info!("revolution: ordering reversed = {}", table.under_revolution);
        }

        let eight_cut_return =
            play.is_eight() && old_table.last_play.is_some_and(|card| card.is_eight());
        match play {
            Play::Pass => {
                if old_table.last_owner == Some(next_player(player_id)) {
                    table.reset_field();
                }
            }
            Play::Revolution { .. } => table.reset_field(),
            Play::Single { .. } if eight_cut_return => table.reset_field(),
            Play::Single { card } => {
                table.last_play = Some(card);
                table.last_owner = Some(player_id);
            }
        }

        table.current_player = if eight_cut_return {
            player_id
        } else {
            next_player(player_id)
        };
        table.currently_drawable = table.last_play.is_some_and(|card| !card.is_eight());
        state.phase = Phase::AwaitingDraw;

        Ok(Self::commit(state, events))
    }

    fn commit(state: &mut RoundState, events: Vec<GameEvent>) -> Vec<GameEvent> {
        for event in &events {
            state.record_event(event.clone());
        }
        events
    }
}
