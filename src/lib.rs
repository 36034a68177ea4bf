pub mod ai;
pub mod game;
pub mod utils;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use log::LevelFilter;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{BotConfig, BotDriver, BotPolicy, BotTemper, BotTurn, RandomBot, Tick};
pub use game::{
    Card, CardId, Deck, GameEvent, Hand, Phase, Play, PlayDescriptor, Player, PlayerId,
    Revolution, RoundState, RoundStatus, RuleError, TableState, TurnEngine,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(LevelFilter::Info);
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

struct Session {
    state: RoundState,
    engine: TurnEngine,
    driver: BotDriver<RandomBot>,
}

impl Session {
    fn tick(&mut self) -> Result<Tick, RuleError> {
        self.driver.tick(&mut self.engine, &mut self.state)
    }
}

#[derive(Serialize)]
struct BotRun {
    turns: Vec<BotTurn>,
    stopped: Tick,
}

/// 宿主（浏览器）持有的一局游戏。查询无副作用，命令仅对当前玩家有效。
#[wasm_bindgen]
pub struct DaifugoEngine {
    session: Rc<RefCell<Session>>,
    tick_interval_ms: u32,
}

impl DaifugoEngine {
    fn build(state: RoundState, bot: RandomBot, config: &BotConfig) -> DaifugoEngine {
        let tick_interval_ms = u32::try_from(config.tick_interval().as_millis()).unwrap_or(u32::MAX);
        let session = Session {
            state,
            engine: TurnEngine::new(),
            driver: BotDriver::new(bot, config.human_player),
        };
        DaifugoEngine {
            session: Rc::new(RefCell::new(session)),
            tick_interval_ms,
        }
    }

    fn seeded(seed: Option<u64>, config: &BotConfig) -> DaifugoEngine {
        let (state, bot) = match seed {
            Some(seed) => (
                RoundState::with_seed(seed),
                RandomBot::with_seed(config, seed.wrapping_add(1)),
            ),
            None => (
                RoundState::new(&mut SmallRng::from_entropy()),
                RandomBot::new(config),
            ),
        };
        Self::build(state, bot, config)
    }

    fn with_session<T, F>(&self, action: F) -> Result<T, JsValue>
    where
        F: FnOnce(&mut Session) -> Result<T, RuleError>,
    {
        let mut session = self.session.borrow_mut();
        action(&mut *session).map_err(to_js_error)
    }
}

fn parse_config(config_json: Option<String>) -> Result<BotConfig, JsValue> {
    match config_json {
        Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error),
        None => Ok(BotConfig::default()),
    }
}

#[wasm_bindgen]
impl DaifugoEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: Option<u64>, config_json: Option<String>) -> Result<DaifugoEngine, JsValue> {
        let config = parse_config(config_json)?;
        Ok(Self::seeded(seed, &config))
    }

    #[wasm_bindgen(js_name = "withTemper")]
    pub fn with_temper(temper: &str, seed: Option<u64>) -> DaifugoEngine {
        let config = BotConfig::from_temper(BotTemper::from_name(temper));
        Self::seeded(seed, &config)
    }

    /// 按记录的 75 张牌序重放一局；`bot_seed` 固定电脑玩家的随机序列。
    #[wasm_bindgen(js_name = "fromDeckOrder")]
    pub fn from_deck_order(
        order: Vec<CardId>,
        bot_seed: Option<u64>,
        config_json: Option<String>,
    ) -> Result<DaifugoEngine, JsValue> {
        let config = parse_config(config_json)?;
        let state = RoundState::replay(&order).map_err(to_js_error)?;
        let bot = match bot_seed {
            Some(seed) => RandomBot::with_seed(&config, seed),
            None => RandomBot::new(&config),
        };
        Ok(Self::build(state, bot, &config))
    }

    #[wasm_bindgen(getter)]
    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_interval_ms
    }

    pub fn hand_display(&self, player_id: PlayerId) -> Result<String, JsValue> {
        self.with_session(|session| session.state.hand_display(player_id))
    }

    pub fn hand_size(&self, player_id: PlayerId) -> Result<usize, JsValue> {
        self.with_session(|session| session.state.hand_size(player_id))
    }

    pub fn legal_plays(&self, player_id: PlayerId) -> Result<JsValue, JsValue> {
        let plays = self.with_session(|session| session.state.legal_plays(player_id))?;
        to_value(&plays).map_err(JsValue::from)
    }

    pub fn legal_plays_json(&self, player_id: PlayerId) -> Result<String, JsValue> {
        let plays = self.with_session(|session| session.state.legal_plays(player_id))?;
        serde_json::to_string(&plays).map_err(serde_to_js_error)
    }

    pub fn event_log(&self) -> Result<JsValue, JsValue> {
        let log = self.session.borrow().state.event_log();
        to_value(&log).map_err(JsValue::from)
    }

    pub fn round_status(&self) -> Result<JsValue, JsValue> {
        let status = self.session.borrow().state.round_status();
        to_value(&status).map_err(JsValue::from)
    }

    pub fn table(&self) -> Result<JsValue, JsValue> {
        let table = *self.session.borrow().state.table();
        to_value(&table).map_err(JsValue::from)
    }

    pub fn last_play_display(&self) -> Option<String> {
        self.session
            .borrow()
            .state
            .last_play()
            .map(|card| card.to_string())
    }

    pub fn deck_remaining(&self) -> usize {
        self.session.borrow().state.deck_remaining()
    }

    pub fn request_draw(&self, player_id: PlayerId, wants_to_draw: bool) -> Result<JsValue, JsValue> {
        let events = self.with_session(|session| {
            session
                .engine
                .request_draw(&mut session.state, player_id, wants_to_draw)
        })?;
        to_value(&events).map_err(JsValue::from)
    }

    pub fn request_discard(&self, player_id: PlayerId, play: JsValue) -> Result<JsValue, JsValue> {
        let descriptor: PlayDescriptor = from_value(play).map_err(JsValue::from)?;
        let events = self.with_session(|session| {
            session
                .engine
                .request_discard(&mut session.state, player_id, &descriptor)
        })?;
        to_value(&events).map_err(JsValue::from)
    }

    pub fn request_discard_json(&self, player_id: PlayerId, play_json: &str) -> Result<String, JsValue> {
        let descriptor: PlayDescriptor =
            serde_json::from_str(play_json).map_err(serde_to_js_error)?;
        let events = self.with_session(|session| {
            session
                .engine
                .request_discard(&mut session.state, player_id, &descriptor)
        })?;
        serde_json::to_string(&events).map_err(serde_to_js_error)
    }

    /// 推进一次电脑回合；轮到人类或已结束时不做任何事。
    pub fn tick(&self) -> Result<JsValue, JsValue> {
        let tick = self.with_session(Session::tick)?;
        to_value(&tick).map_err(JsValue::from)
    }

    /// 每隔 `tick_interval_ms` 推进一次，直到轮到人类或对局结束。
    pub fn run_bots(&self) -> Promise {
        let session = Rc::clone(&self.session);
        let delay = self.tick_interval_ms;

        future_to_promise(async move {
            let mut turns = Vec::new();
            loop {
                if delay > 0 {
                    TimeoutFuture::new(delay).await;
                }
                let tick = session.borrow_mut().tick().map_err(to_js_error)?;
                match tick {
                    Tick::Played { turn } => turns.push(turn),
                    stopped => {
                        return to_value(&BotRun { turns, stopped }).map_err(JsValue::from);
                    }
                }
            }
        })
    }
}

/// 牌面文字，例如 `r8`。
#[wasm_bindgen(js_name = "describeCard")]
pub fn describe_card(card_id: CardId) -> Result<String, JsValue> {
    Card::new(card_id)
        .map(|card| card.to_string())
        .map_err(to_js_error)
}
