use std::str::FromStr;
use std::time::Duration;

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{PlayDescriptor, PlayerId, RoundState};

const DEFAULT_DRAW_PROBABILITY: f64 = 0.1;
const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// 电脑玩家的决策接口。只能读取引擎的公开查询。
pub trait BotPolicy {
    fn name(&self) -> &'static str;

    /// 抽牌阶段：是否抽一张。
    fn wants_to_draw(&mut self, state: &RoundState) -> bool;

    /// 出牌阶段：从 `player_id` 当前的合法出牌中选一个。
    fn choose_play(&mut self, state: &RoundState, player_id: PlayerId) -> Option<PlayDescriptor>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotTemper {
    Timid,
    Standard,
    Greedy,
}

impl FromStr for BotTemper {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timid" | "never" => Ok(BotTemper::Timid),
            "standard" | "normal" | "default" => Ok(BotTemper::Standard),
            "greedy" | "hungry" => Ok(BotTemper::Greedy),
            _ => Err(()),
        }
    }
}

impl BotTemper {
    /// 宿主传入的名称无法识别时按 `Standard` 处理。
    pub fn from_name(name: &str) -> Self {
        BotTemper::from_str(name).unwrap_or_else(|()| {
            debug!("unknown bot temper {name:?}, using standard");
            BotTemper::Standard
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub draw_probability: f64,
    pub tick_interval_ms: u64,
    /// 由人操作的座位；`None` 表示四家全是电脑。
    pub human_player: Option<PlayerId>,
}

impl BotConfig {
    pub fn from_temper(temper: BotTemper) -> Self {
        let draw_probability = match temper {
            BotTemper::Timid => 0.0,
            BotTemper::Standard => DEFAULT_DRAW_PROBABILITY,
            BotTemper::Greedy => 0.5,
        };
        Self {
            draw_probability,
            ..Self::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 限制在 [0, 1]，非法值按 0 处理。
    pub fn effective_draw_probability(&self) -> f64 {
        if self.draw_probability.is_finite() {
            self.draw_probability.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            draw_probability: DEFAULT_DRAW_PROBABILITY,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            human_player: Some(0),
        }
    }
}

/// 随机策略：以固定概率抽牌（仅在允许时），合法出牌中均匀随机。
pub struct RandomBot {
    draw_probability: f64,
    rng: SmallRng,
}

impl RandomBot {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            draw_probability: config.effective_draw_probability(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: &BotConfig, seed: u64) -> Self {
        Self {
            draw_probability: config.effective_draw_probability(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl BotPolicy for RandomBot {
    fn name(&self) -> &'static str {
        "random"
    }

    fn wants_to_draw(&mut self, state: &RoundState) -> bool {
        let roll = self.rng.gen_bool(self.draw_probability);
        roll && state.table().currently_drawable
    }

    fn choose_play(&mut self, state: &RoundState, player_id: PlayerId) -> Option<PlayDescriptor> {
        let legal = state.legal_plays(player_id).ok()?;
        legal.choose(&mut self.rng).cloned()
    }
}
