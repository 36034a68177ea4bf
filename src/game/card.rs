use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::play::Play;
use super::rules::RuleError;

/// 卡牌标识，取值 0..75。
pub type CardId = u8;

pub const PLAYER_COUNT: usize = 4;
pub const INITIAL_HAND_SIZE: usize = 5;
pub const SUIT_COUNT: u8 = 5;
pub const RANK_COUNT: u8 = 15;
pub const DECK_SIZE: usize = (SUIT_COUNT as usize) * (RANK_COUNT as usize);
/// "8" 对应的点数下标（显示为 8）。
pub const EIGHT_RANK: u8 = 7;

const SUIT_LETTERS: [char; SUIT_COUNT as usize] = ['r', 'b', 'y', 'g', 'o'];

// (攻击方花色, 场上花色)，有方向。花色 4 不参与。
const ATTACK_PAIRS: [(u8, u8); 4] = [(0, 1), (1, 0), (2, 3), (3, 2)];
const ATTACK_STEP: i32 = 3;

/// 一张牌。花色与点数都由 id 推导：`id = suit * 15 + rank`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CardId", into = "CardId")]
pub struct Card {
    id: CardId,
}

impl Card {
    pub fn new(id: CardId) -> Result<Self, RuleError> {
        if usize::from(id) >= DECK_SIZE {
            return Err(RuleError::InvalidCard { card_id: id });
        }
        Ok(Self { id })
    }

    pub fn of(suit: u8, rank: u8) -> Result<Self, RuleError> {
        if suit >= SUIT_COUNT || rank >= RANK_COUNT {
            return Err(RuleError::InvalidFace { suit, rank });
        }
        Ok(Self {
            id: suit * RANK_COUNT + rank,
        })
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn rank(&self) -> u8 {
        self.id % RANK_COUNT
    }

    pub fn suit(&self) -> u8 {
        self.id / RANK_COUNT
    }

    pub fn is_eight(&self) -> bool {
        self.rank() == EIGHT_RANK
    }

    /// 手牌排序键：先点数，后花色。
    pub fn sort_key(&self) -> (u8, u8) {
        (self.rank(), self.suit())
    }

    /// 该牌是否属于 `play`。Pass 没有成员，属于调用方错误。
    pub fn belongs_to(&self, play: &Play) -> Result<bool, RuleError> {
        match play {
            Play::Single { card } => Ok(card.id == self.id),
            Play::Revolution { cards } => Ok(cards.cards().iter().any(|card| card.id == self.id)),
            Play::Pass => Err(RuleError::InvalidOperation {
                operation: "belongs_to(pass)".into(),
            }),
        }
    }

    /// 单张压牌：必须换花色，且点数严格更大（革命中严格更小）。
    pub fn beats(&self, last: Card, under_revolution: bool) -> bool {
        if self.suit() == last.suit() {
            return false;
        }
        if under_revolution {
            self.rank() < last.rank()
        } else {
            self.rank() > last.rank()
        }
    }

    /// 以该牌作为单张打出时对场上牌的攻击数，可能为 0 或负数。
    pub fn attack_count(&self, field: Option<Card>, under_revolution: bool) -> i32 {
        let Some(field) = field else {
            return 0;
        };
        let pair = (self.suit(), field.suit());
        if !ATTACK_PAIRS.contains(&pair) {
            return 0;
        }
        let mut diff = i32::from(self.rank()) - i32::from(field.rank());
        if under_revolution {
            diff = -diff;
        }
        diff.div_euclid(ATTACK_STEP)
    }
}

impl TryFrom<CardId> for Card {
    type Error = RuleError;

    fn try_from(id: CardId) -> Result<Self, Self::Error> {
        Card::new(id)
    }
}

impl From<Card> for CardId {
    fn from(card: Card) -> Self {
        card.id
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = SUIT_LETTERS[usize::from(self.suit())];
        write!(f, "{}{}", letter, self.rank() + 1)
    }
}

/// 洗好的 75 张牌与抽牌游标。游标只增不减。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
    cursor: usize,
}

impl Deck {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards: Vec<Card> = (0..DECK_SIZE as CardId).map(|id| Card { id }).collect();
        cards.shuffle(rng);
        Self { cards, cursor: 0 }
    }

    /// 按给定顺序构造牌堆（用于回放）。顺序必须是 0..75 的一个排列。
    pub fn stacked(order: Vec<Card>) -> Result<Self, RuleError> {
        if order.len() != DECK_SIZE {
            return Err(RuleError::InvalidDeck {
                reason: format!("expected {DECK_SIZE} cards, got {}", order.len()),
            });
        }
        let mut seen = [false; DECK_SIZE];
        for card in &order {
            let slot = &mut seen[usize::from(card.id)];
            if *slot {
                return Err(RuleError::InvalidDeck {
                    reason: format!("card {card} appears twice"),
                });
            }
            *slot = true;
        }
        Ok(Self {
            cards: order,
            cursor: 0,
        })
    }

    /// 下一次抽牌会让牌堆变空。
    pub fn would_exhaust(&self) -> bool {
        self.cursor == DECK_SIZE - 1
    }

    pub fn remaining(&self) -> usize {
        DECK_SIZE - self.cursor
    }

    /// 最多取出 `count` 张，不足时取完为止。
    pub(crate) fn take(&mut self, count: usize) -> Vec<Card> {
        let end = (self.cursor + count).min(DECK_SIZE);
        let taken = self.cards[self.cursor..end].to_vec();
        self.cursor = end;
        taken
    }

    pub fn draw(&mut self) -> Result<Card, RuleError> {
        let card = *self
            .cards
            .get(self.cursor)
            .ok_or(RuleError::DeckExhausted)?;
        self.cursor += 1;
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn card(suit: u8, rank: u8) -> Card {
        Card::of(suit, rank).expect("valid card")
    }

    #[test]
    fn id_decomposes_into_suit_and_rank() {
        for id in 0..DECK_SIZE as CardId {
            let card = Card::new(id).expect("id in range");
            assert_eq!(card.id(), card.suit() * RANK_COUNT + card.rank());
        }
        assert!(Card::new(75).is_err());
        assert_eq!(Card::of(5, 0), Err(RuleError::InvalidFace { suit: 5, rank: 0 }));
        let face = Card::of(0, 15).unwrap_err();
        assert_eq!(face, RuleError::InvalidFace { suit: 0, rank: 15 });
        assert_eq!(face.to_string(), "no card with suit 0 and rank 15");
    }

    #[test]
    fn display_uses_suit_letter_and_one_based_rank() {
        assert_eq!(card(0, 0).to_string(), "r1");
        assert_eq!(card(1, 7).to_string(), "b8");
        assert_eq!(card(4, 14).to_string(), "o15");
        assert!(card(3, 7).is_eight());
        assert!(!card(3, 8).is_eight());
    }

    #[test]
    fn belongs_to_rejects_pass() {
        let c = card(2, 4);
        assert_eq!(c.belongs_to(&Play::single(c)), Ok(true));
        assert_eq!(c.belongs_to(&Play::single(card(2, 5))), Ok(false));
        assert!(matches!(
            c.belongs_to(&Play::Pass),
            Err(RuleError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn revolution_reverses_ordering() {
        for a in 0..DECK_SIZE as CardId {
            for b in 0..DECK_SIZE as CardId {
                let (x, y) = (Card::new(a).unwrap(), Card::new(b).unwrap());
                if x.suit() == y.suit() || x.rank() == y.rank() {
                    assert!(!x.beats(y, false));
                    assert!(!x.beats(y, true));
                    continue;
                }
                assert_ne!(x.beats(y, false), x.beats(y, true));
            }
        }
    }

    #[test]
    fn attack_count_follows_directed_suit_pairs() {
        let attacker = card(0, 10);
        let field = card(1, 1);
        assert_eq!(attacker.attack_count(Some(field), false), 3);
        assert_eq!(attacker.attack_count(Some(field), true), -3);
        assert_eq!(attacker.attack_count(None, false), 0);
        // 0 -> 2 不是攻击组合
        assert_eq!(attacker.attack_count(Some(card(2, 1)), false), 0);
        assert_eq!(card(4, 14).attack_count(Some(card(3, 0)), false), 0);
        assert_eq!(card(3, 14).attack_count(Some(card(4, 0)), false), 0);
        assert_eq!(card(3, 5).attack_count(Some(card(2, 0)), false), 1);
        // floor, not truncation
        assert_eq!(card(1, 0).attack_count(Some(card(0, 1)), false), -1);
    }

    #[test]
    fn full_deck_draws_every_card_once() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut deck = Deck::new(&mut rng);
        let mut seen = [false; DECK_SIZE];
        for drawn in 0..DECK_SIZE {
            assert_eq!(deck.would_exhaust(), drawn == DECK_SIZE - 1);
            let card = deck.draw().expect("cards remain");
            assert!(!seen[usize::from(card.id())]);
            seen[usize::from(card.id())] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(deck.remaining(), 0);
        assert_eq!(deck.draw(), Err(RuleError::DeckExhausted));
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn stacked_deck_must_be_a_permutation() {
        let order: Vec<Card> = (0..DECK_SIZE as CardId).map(|id| Card::new(id).unwrap()).collect();
        let mut deck = Deck::stacked(order.clone()).expect("permutation");
        assert_eq!(deck.draw(), Ok(card(0, 0)));

        let mut duplicated = order.clone();
        duplicated[1] = duplicated[0];
        assert!(Deck::stacked(duplicated).is_err());
        assert!(Deck::stacked(order[..10].to_vec()).is_err());
    }
}
