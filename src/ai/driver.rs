use log::debug;
use serde::Serialize;

use super::bot::BotPolicy;
use crate::game::{
    GameEvent, Phase, PlayDescriptor, PlayerId, RoundState, RoundStatus, RuleError, TurnEngine,
};

/// 一次完整的电脑回合。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BotTurn {
    pub player_id: PlayerId,
    pub drew: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play: Option<PlayDescriptor>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Tick {
    Played { turn: BotTurn },
    AwaitingHuman { player_id: PlayerId },
    Finished { status: RoundStatus },
}

/// 外部定时器每次触发时调用 [`BotDriver::tick`]；轮到人类时什么也不做。
pub struct BotDriver<P: BotPolicy> {
    policy: P,
    human_player: Option<PlayerId>,
}

impl<P: BotPolicy> BotDriver<P> {
    pub fn new(policy: P, human_player: Option<PlayerId>) -> Self {
        Self {
            policy,
            human_player,
        }
    }

    pub fn tick(
        &mut self,
        engine: &mut TurnEngine,
        state: &mut RoundState,
    ) -> Result<Tick, RuleError> {
        if state.is_finished() {
            return Ok(Tick::Finished {
                status: state.round_status(),
            });
        }
        let player_id = state.current_player();
        if self.human_player == Some(player_id) {
            return Ok(Tick::AwaitingHuman { player_id });
        }

        let mut events = Vec::new();
        let mut drew = false;
        if state.phase() == Phase::AwaitingDraw {
            drew = self.policy.wants_to_draw(state);
            events.extend(engine.request_draw(state, player_id, drew)?);
        }
        if state.is_finished() {
            return Ok(Tick::Played {
                turn: BotTurn {
                    player_id,
                    drew,
                    play: None,
                    events,
                },
            });
        }

        let play = self
            .policy
            .choose_play(state, player_id)
            .ok_or_else(|| RuleError::InvalidOperation {
                operation: format!("{} policy returned no play", self.policy.name()),
            })?;
        events.extend(engine.request_discard(state, player_id, &play)?);
        debug!("bot {player_id} ({}) played {}", self.policy.name(), play.label);

        Ok(Tick::Played {
            turn: BotTurn {
                player_id,
                drew,
                play: Some(play),
                events,
            },
        })
    }
}
