use super::card::{Card, EIGHT_RANK, RANK_COUNT};
use super::play::{Play, Revolution};
use super::state::TableState;

/// 允许革命的最少手牌数（革命不能直接出完）。
const REVOLUTION_MIN_HAND: usize = 4;

/// 玩家手牌。内部按点数、花色排序，仅用于显示。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut hand = Self::new();
        hand.extend(cards);
        hand
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn add(&mut self, card: Card) {
        let at = self
            .cards
            .partition_point(|held| held.sort_key() <= card.sort_key());
        self.cards.insert(at, card);
    }

    /// 移除 `play` 中的牌，返回移除的张数。
    pub fn discard(&mut self, play: &Play) -> usize {
        if play.is_pass() {
            return 0;
        }
        let before = self.cards.len();
        self.cards
            .retain(|card| !matches!(card.belongs_to(play), Ok(true)));
        before - self.cards.len()
    }

    pub fn display(&self) -> String {
        self.cards
            .iter()
            .map(Card::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 每个非 8 点数的所有三张组合，而不只是前三张。
    pub fn revolutions(&self) -> Vec<Revolution> {
        let mut revolutions = Vec::new();
        for rank in (0..RANK_COUNT).filter(|rank| *rank != EIGHT_RANK) {
            let same: Vec<Card> = self
                .cards
                .iter()
                .copied()
                .filter(|card| card.rank() == rank)
                .collect();
            for i in 0..same.len() {
                for j in i + 1..same.len() {
                    for k in j + 1..same.len() {
                        if let Ok(revolution) = Revolution::new(same[i], same[j], same[k]) {
                            revolutions.push(revolution);
                        }
                    }
                }
            }
        }
        revolutions
    }

    pub fn generate_legal_plays(&self, table: &TableState) -> Vec<Play> {
        // 8 不能作为最后一张出完；空场时连 pass 都不行
        if let [only] = self.cards.as_slice() {
            if only.is_eight() {
                return if table.last_play.is_some() {
                    vec![Play::Pass]
                } else {
                    Vec::new()
                };
            }
        }

        let mut candidates: Vec<Play> = self.cards.iter().copied().map(Play::single).collect();
        if self.cards.len() >= REVOLUTION_MIN_HAND {
            candidates.extend(self.revolutions().into_iter().map(Play::revolution));
        }

        let Some(last) = table.last_play else {
            return candidates;
        };

        let mut legal: Vec<Play> = if last.is_eight() {
            candidates
                .into_iter()
                .filter(|play| play.is_eight() || matches!(play, Play::Revolution { .. }))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter(|play| matches!(play.is_valid_against(Some(last), table.under_revolution), Ok(true)))
                .collect()
        };
        legal.push(Play::Pass);
        legal
    }
}

impl Extend<Card> for Hand {
    fn extend<I: IntoIterator<Item = Card>>(&mut self, cards: I) {
        for card in cards {
            self.add(card);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(suit: u8, rank: u8) -> Card {
        Card::of(suit, rank).expect("valid card")
    }

    fn table_with(last: Option<Card>, under_revolution: bool) -> TableState {
        TableState {
            last_play: last,
            last_owner: last.map(|_| 1),
            under_revolution,
            ..TableState::default()
        }
    }

    fn count_revolutions(plays: &[Play]) -> usize {
        plays
            .iter()
            .filter(|play| matches!(play, Play::Revolution { .. }))
            .count()
    }

    #[test]
    fn hand_stays_sorted_by_rank_then_suit() {
        let hand = Hand::from_cards([card(3, 2), card(0, 9), card(1, 2), card(4, 0)]);
        assert_eq!(hand.display(), "o1 b3 g3 r10");
    }

    #[test]
    fn lone_eight_cannot_be_played() {
        let hand = Hand::from_cards([card(2, 7)]);
        assert!(hand.generate_legal_plays(&table_with(None, false)).is_empty());
        assert_eq!(
            hand.generate_legal_plays(&table_with(Some(card(0, 3)), false)),
            vec![Play::Pass]
        );
        assert_eq!(
            hand.generate_legal_plays(&table_with(Some(card(0, 7)), false)),
            vec![Play::Pass]
        );
    }

    #[test]
    fn empty_field_allows_everything_but_pass() {
        let hand = Hand::from_cards([card(0, 1), card(1, 1), card(2, 1), card(3, 9)]);
        let plays = hand.generate_legal_plays(&table_with(None, false));
        assert_eq!(plays.len(), 5);
        assert!(!plays.contains(&Play::Pass));
        assert_eq!(count_revolutions(&plays), 1);
    }

    #[test]
    fn no_revolution_below_four_cards() {
        let hand = Hand::from_cards([card(0, 0), card(1, 0), card(2, 0)]);
        let plays = hand.generate_legal_plays(&table_with(None, false));
        assert_eq!(count_revolutions(&plays), 0);
        assert_eq!(plays.len(), 3);
    }

    #[test]
    fn revolution_count_is_k_choose_three() {
        let hand = Hand::from_cards([
            card(0, 4),
            card(1, 4),
            card(2, 4),
            card(3, 4),
            card(4, 4),
            card(0, 7),
            card(1, 7),
            card(2, 7),
        ]);
        assert_eq!(hand.revolutions().len(), 10);
        assert!(hand.revolutions().iter().all(|rev| rev.rank() == 4));

        let four = Hand::from_cards([card(0, 4), card(1, 4), card(2, 4), card(3, 4)]);
        assert_eq!(four.revolutions().len(), 4);
    }

    #[test]
    fn eight_on_field_admits_only_eights_and_revolutions() {
        let hand = Hand::from_cards([
            card(0, 2),
            card(1, 2),
            card(2, 2),
            card(3, 7),
            card(4, 14),
        ]);
        let plays = hand.generate_legal_plays(&table_with(Some(card(0, 7)), false));
        assert_eq!(
            plays,
            vec![
                Play::single(card(3, 7)),
                Play::revolution(Revolution::new(card(0, 2), card(1, 2), card(2, 2)).unwrap()),
                Play::Pass,
            ]
        );
    }

    #[test]
    fn normal_field_filters_by_rank_and_suit() {
        let hand = Hand::from_cards([card(0, 3), card(0, 9), card(1, 12), card(2, 1)]);
        let plays = hand.generate_legal_plays(&table_with(Some(card(1, 5)), false));
        assert_eq!(plays, vec![Play::single(card(0, 9)), Play::Pass]);

        let reversed = hand.generate_legal_plays(&table_with(Some(card(1, 5)), true));
        assert_eq!(
            reversed,
            vec![Play::single(card(2, 1)), Play::single(card(0, 3)), Play::Pass]
        );
    }

    #[test]
    fn pass_offered_whenever_field_is_occupied() {
        let hand = Hand::from_cards([card(0, 0), card(1, 0)]);
        let plays = hand.generate_legal_plays(&table_with(Some(card(2, 14)), false));
        assert_eq!(plays, vec![Play::Pass]);
    }

    #[test]
    fn discard_removes_played_cards() {
        let mut hand = Hand::from_cards([card(0, 6), card(1, 6), card(2, 6), card(3, 1)]);
        let revolution =
            Play::revolution(Revolution::new(card(0, 6), card(1, 6), card(2, 6)).unwrap());
        assert_eq!(hand.discard(&Play::Pass), 0);
        assert_eq!(hand.discard(&revolution), 3);
        assert_eq!(hand.cards(), &[card(3, 1)]);
    }
}
