//! 电脑玩家：决策策略与回合驱动。

pub mod bot;
pub mod driver;

pub use bot::{BotConfig, BotPolicy, BotTemper, RandomBot};
pub use driver::{BotDriver, BotTurn, Tick};
