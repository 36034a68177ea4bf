use std::fmt;

use serde::{Deserialize, Serialize};

use super::card::{Card, EIGHT_RANK};
use super::rules::RuleError;

/// 革命：三张同点数（非 8）的牌。只能通过 [`Revolution::new`] 构造。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[Card; 3]", into = "[Card; 3]")]
pub struct Revolution {
    cards: [Card; 3],
}

impl Revolution {
    pub fn new(a: Card, b: Card, c: Card) -> Result<Self, RuleError> {
        let rank = a.rank();
        if b.rank() != rank || c.rank() != rank {
            return Err(RuleError::InvalidCombo {
                reason: "cards differ in rank".into(),
            });
        }
        if rank == EIGHT_RANK {
            return Err(RuleError::InvalidCombo {
                reason: "eights cannot start a revolution".into(),
            });
        }
        if a == b || b == c || a == c {
            return Err(RuleError::InvalidCombo {
                reason: "duplicate card".into(),
            });
        }
        Ok(Self { cards: [a, b, c] })
    }

    pub fn cards(&self) -> &[Card; 3] {
        &self.cards
    }

    pub fn rank(&self) -> u8 {
        self.cards[0].rank()
    }
}

impl TryFrom<[Card; 3]> for Revolution {
    type Error = RuleError;

    fn try_from([a, b, c]: [Card; 3]) -> Result<Self, Self::Error> {
        Revolution::new(a, b, c)
    }
}

impl From<Revolution> for [Card; 3] {
    fn from(revolution: Revolution) -> Self {
        revolution.cards
    }
}

/// 一次出牌动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Play {
    Single { card: Card },
    Revolution { cards: Revolution },
    Pass,
}

impl Play {
    pub fn single(card: Card) -> Self {
        Play::Single { card }
    }

    pub fn revolution(cards: Revolution) -> Self {
        Play::Revolution { cards }
    }

    /// 本次出牌离开手牌的牌。
    pub fn cards(&self) -> &[Card] {
        match self {
            Play::Single { card } => std::slice::from_ref(card),
            Play::Revolution { cards } => cards.cards(),
            Play::Pass => &[],
        }
    }

    pub fn is_eight(&self) -> bool {
        matches!(self, Play::Single { card } if card.is_eight())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Play::Pass)
    }

    /// 能否压过场上的牌。Pass 或空场调用属于引擎缺陷。
    pub fn is_valid_against(
        &self,
        last: Option<Card>,
        under_revolution: bool,
    ) -> Result<bool, RuleError> {
        let Some(last) = last else {
            return Err(RuleError::InvalidOperation {
                operation: "is_valid_against(empty field)".into(),
            });
        };
        match self {
            Play::Revolution { .. } => Ok(true),
            Play::Single { card } => Ok(card.beats(last, under_revolution)),
            Play::Pass => Err(RuleError::InvalidOperation {
                operation: "is_valid_against(pass)".into(),
            }),
        }
    }

    /// 单张出牌对 `previous` 的攻击数。只有正数才会让对方抽牌。
    pub fn attack_count(
        &self,
        previous: Option<Card>,
        under_revolution: bool,
    ) -> Result<i32, RuleError> {
        match self {
            Play::Single { card } => Ok(card.attack_count(previous, under_revolution)),
            Play::Revolution { .. } => Err(RuleError::InvalidOperation {
                operation: "attack_count(revolution)".into(),
            }),
            Play::Pass => Err(RuleError::InvalidOperation {
                operation: "attack_count(pass)".into(),
            }),
        }
    }

    pub fn describe(&self) -> PlayDescriptor {
        PlayDescriptor::from(*self)
    }
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Play::Single { card } => write!(f, "{card}"),
            Play::Revolution { cards } => {
                let [a, b, c] = cards.cards();
                write!(f, "{a}, {b}, {c}")
            }
            Play::Pass => f.write_str("pass"),
        }
    }
}

/// 对外暴露的出牌描述：可回传给引擎的值 + 显示文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayDescriptor {
    pub play: Play,
    #[serde(default)]
    pub label: String,
}

impl From<Play> for PlayDescriptor {
    fn from(play: Play) -> Self {
        Self {
            label: play.to_string(),
            play,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(suit: u8, rank: u8) -> Card {
        Card::of(suit, rank).expect("valid card")
    }

    #[test]
    fn revolution_requires_same_non_eight_rank() {
        assert!(Revolution::new(card(0, 3), card(1, 3), card(4, 3)).is_ok());
        assert!(Revolution::new(card(0, 3), card(1, 3), card(4, 4)).is_err());
        assert!(Revolution::new(card(0, 7), card(1, 7), card(2, 7)).is_err());
        assert!(Revolution::new(card(0, 3), card(0, 3), card(2, 3)).is_err());
    }

    #[test]
    fn revolution_is_valid_against_anything() {
        let revolution =
            Play::revolution(Revolution::new(card(0, 0), card(1, 0), card(2, 0)).unwrap());
        assert_eq!(revolution.is_valid_against(Some(card(3, 14)), false), Ok(true));
        assert_eq!(revolution.is_valid_against(Some(card(3, 7)), true), Ok(true));
    }

    #[test]
    fn single_must_change_suit_and_climb() {
        let last = Some(card(1, 5));
        assert_eq!(Play::single(card(0, 6)).is_valid_against(last, false), Ok(true));
        assert_eq!(Play::single(card(1, 9)).is_valid_against(last, false), Ok(false));
        assert_eq!(Play::single(card(2, 5)).is_valid_against(last, false), Ok(false));
        assert_eq!(Play::single(card(0, 4)).is_valid_against(last, false), Ok(false));
        assert_eq!(Play::single(card(0, 4)).is_valid_against(last, true), Ok(true));
    }

    #[test]
    fn wrong_variant_queries_fail() {
        assert!(Play::Pass.is_valid_against(Some(card(0, 0)), false).is_err());
        assert!(Play::single(card(0, 1)).is_valid_against(None, false).is_err());
        assert!(Play::Pass.attack_count(Some(card(0, 0)), false).is_err());
        let revolution =
            Play::revolution(Revolution::new(card(0, 2), card(1, 2), card(2, 2)).unwrap());
        assert!(revolution.attack_count(Some(card(0, 0)), false).is_err());
    }

    #[test]
    fn attack_scenario_from_rulebook() {
        let play = Play::single(card(0, 10));
        assert_eq!(play.attack_count(Some(card(1, 1)), false), Ok(3));
        assert_eq!(play.attack_count(Some(card(1, 1)), true), Ok(-3));
        assert_eq!(play.attack_count(None, false), Ok(0));
    }

    #[test]
    fn display_matches_log_format() {
        assert_eq!(Play::single(card(2, 11)).to_string(), "y12");
        let revolution =
            Play::revolution(Revolution::new(card(0, 4), card(2, 4), card(3, 4)).unwrap());
        assert_eq!(revolution.to_string(), "r5, y5, g5");
        assert_eq!(Play::Pass.to_string(), "pass");
        assert_eq!(Play::Pass.describe().label, "pass");
    }

    #[test]
    fn serde_shape_revalidates_revolutions() {
        let json = serde_json::to_string(&Play::single(card(1, 0))).unwrap();
        assert_eq!(json, r#"{"type":"Single","card":15}"#);

        let ok: Play = serde_json::from_str(r#"{"type":"Revolution","cards":[1,16,31]}"#).unwrap();
        assert_eq!(ok.cards().len(), 3);

        let mixed = serde_json::from_str::<Play>(r#"{"type":"Revolution","cards":[1,16,32]}"#);
        assert!(mixed.is_err());
        let eights = serde_json::from_str::<Play>(r#"{"type":"Revolution","cards":[7,22,37]}"#);
        assert!(eights.is_err());
        assert!(serde_json::from_str::<Play>(r#"{"type":"Single","card":75}"#).is_err());

        let bare: PlayDescriptor = serde_json::from_str(r#"{"play":{"type":"Pass"}}"#).unwrap();
        assert_eq!(bare.play, Play::Pass);
    }
}
