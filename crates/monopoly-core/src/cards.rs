//! Chance and community chest cards.
//!
//! The catalog is immutable; a [`Deck`] is a circular queue of catalog ids.
//! Drawing pops the front and puts the id back at the bottom, except for
//! kept cards, which leave circulation until their holder surrenders them.

use crate::board::{TileIndex, TileType};
use crate::player::Money;
use crate::rng::GameRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Catalog identifier of a card
pub type CardId = u16;

/// The two independent decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeckKind {
    Chance,
    CommunityChest,
}

impl DeckKind {
    /// Deck drawn from when landing on a tile, if any
    pub fn for_tile(tile_type: TileType) -> Option<Self> {
        match tile_type {
            TileType::Chance => Some(DeckKind::Chance),
            TileType::CommunityChest => Some(DeckKind::CommunityChest),
            _ => None,
        }
    }

    /// Full catalog for this deck
    pub fn catalog(&self) -> &'static [Card] {
        match self {
            DeckKind::Chance => &CHANCE_CARDS,
            DeckKind::CommunityChest => &COMMUNITY_CHEST_CARDS,
        }
    }

    /// Look up a card in this deck's catalog
    pub fn card(&self, id: CardId) -> Option<&'static Card> {
        self.catalog().iter().find(|c| c.id == id)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            DeckKind::Chance => "Chance",
            DeckKind::CommunityChest => "Community Chest",
        }
    }
}

/// What a card does once acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardEffect {
    /// Move to an absolute position, collecting salary when wrapping past START
    #[serde(rename = "MOVE")]
    MoveTo(TileIndex),
    /// Move by a relative offset, no salary
    #[serde(rename = "MOVE_REL")]
    MoveBy(i8),
    /// Gain (positive) or owe the bank (negative)
    Money(Money),
    GoToJail,
    /// Kept until used to leave jail
    GetOutOfJail,
    /// Every other active player pays the drawer
    CollectFromAll(Money),
    /// Declared but never given semantics; resolves as a no-op
    PayToAll(Money),
    /// Cost per house and per hotel owned
    #[serde(rename_all = "camelCase")]
    Repairs { house_cost: Money, hotel_cost: Money },
}

impl CardEffect {
    /// Kept cards leave the deck until surrendered
    pub fn is_keep(&self) -> bool {
        matches!(self, CardEffect::GetOutOfJail)
    }
}

/// Immutable catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub text: &'static str,
    pub effect: CardEffect,
}

const fn card(id: CardId, text: &'static str, effect: CardEffect) -> Card {
    Card { id, text, effect }
}

/// Chance catalog
pub static CHANCE_CARDS: [Card; 12] = [
    card(1, "Advance to GO. Collect $200.", CardEffect::MoveTo(0)),
    card(2, "Advance to Pacific Avenue.", CardEffect::MoveTo(31)),
    card(3, "Take a trip to Reading Railroad.", CardEffect::MoveTo(5)),
    card(4, "Bank pays you a dividend of $50.", CardEffect::Money(50)),
    card(5, "Get out of jail free. Keep this card until needed.", CardEffect::GetOutOfJail),
    card(6, "Go back 3 spaces.", CardEffect::MoveBy(-3)),
    card(7, "Go directly to jail. Do not pass GO.", CardEffect::GoToJail),
    card(
        8,
        "Make general repairs on all your property.",
        CardEffect::Repairs { house_cost: 25, hotel_cost: 100 },
    ),
    card(9, "Speeding fine. Pay $15.", CardEffect::Money(-15)),
    card(10, "Advance to Indiana Avenue.", CardEffect::MoveTo(23)),
    card(11, "You won a prize. Collect $100.", CardEffect::Money(100)),
    card(12, "Advance to Atlantic Avenue.", CardEffect::MoveTo(26)),
];

/// Community chest catalog
pub static COMMUNITY_CHEST_CARDS: [Card; 16] = [
    card(101, "Advance to GO. Collect $200.", CardEffect::MoveTo(0)),
    card(102, "Bank error in your favor. Collect $200.", CardEffect::Money(200)),
    card(103, "Hospital fees. Pay $100.", CardEffect::Money(-100)),
    card(104, "Pay your insurance premium of $50.", CardEffect::Money(-50)),
    card(105, "Go directly to jail. Do not pass GO.", CardEffect::GoToJail),
    card(106, "It is your birthday. Collect $10 from every player.", CardEffect::CollectFromAll(10)),
    card(107, "You inherit $100.", CardEffect::Money(100)),
    card(108, "From sale of stock you get $50.", CardEffect::Money(50)),
    card(109, "Income tax refund. Collect $20.", CardEffect::Money(20)),
    card(110, "Receive $25 consultancy fee.", CardEffect::Money(25)),
    card(111, "Get out of jail free. Keep this card until needed.", CardEffect::GetOutOfJail),
    card(112, "Second prize in a beauty contest. Collect $10.", CardEffect::Money(10)),
    card(
        113,
        "Street repairs. Pay $40 per house and $115 per hotel.",
        CardEffect::Repairs { house_cost: 40, hotel_cost: 115 },
    ),
    card(114, "Life insurance matures. Collect $100.", CardEffect::Money(100)),
    card(115, "School fees. Pay $50.", CardEffect::Money(-50)),
    card(116, "Holiday expenses. Pay $100.", CardEffect::Money(-100)),
];

/// Card deck failures. These indicate a corrupted deck, not a player mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("card {id} is not in the {deck:?} catalog")]
    UnknownCard { deck: DeckKind, id: CardId },

    #[error("the {0:?} deck has no cards left to draw")]
    Exhausted(DeckKind),
}

/// A card that has been drawn and is waiting to be acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnCard {
    pub deck: DeckKind,
    pub card_id: CardId,
    pub text: String,
    #[serde(flatten)]
    pub effect: CardEffect,
}

impl DrawnCard {
    fn from_card(deck: DeckKind, card: &Card) -> Self {
        Self {
            deck,
            card_id: card.id,
            text: card.text.to_string(),
            effect: card.effect,
        }
    }
}

/// Ordered card ids, drawn from the front
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck {
    ids: VecDeque<CardId>,
}

impl Deck {
    /// The whole catalog, shuffled
    pub fn shuffled<R: GameRng + ?Sized>(kind: DeckKind, rng: &mut R) -> Self {
        let mut deck = Self::default();
        deck.refill(kind, &[], rng);
        deck
    }

    /// Build a deck in a fixed order
    pub fn from_ids(ids: impl IntoIterator<Item = CardId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Replace the contents with a fresh shuffle of the catalog, leaving out
    /// ids that players are currently holding
    pub fn refill<R: GameRng + ?Sized>(&mut self, kind: DeckKind, held: &[CardId], rng: &mut R) {
        let mut ids: Vec<CardId> = kind
            .catalog()
            .iter()
            .map(|c| c.id)
            .filter(|id| !held.contains(id))
            .collect();
        rng.shuffle(&mut ids);
        self.ids = ids.into();
    }

    /// Draw the top card. Non-keep cards go straight back to the bottom.
    pub fn draw<R: GameRng + ?Sized>(
        &mut self,
        kind: DeckKind,
        held: &[CardId],
        rng: &mut R,
    ) -> Result<DrawnCard, CardError> {
        if self.ids.is_empty() {
            self.refill(kind, held, rng);
        }

        let id = self.ids.pop_front().ok_or(CardError::Exhausted(kind))?;
        let card = kind
            .card(id)
            .ok_or(CardError::UnknownCard { deck: kind, id })?;

        if !card.effect.is_keep() {
            self.ids.push_back(id);
        }

        Ok(DrawnCard::from_card(kind, card))
    }

    /// Return a kept card to the bottom of the deck
    pub fn surrender(&mut self, id: CardId) {
        self.ids.push_back(id);
    }

    /// Number of cards in the deck
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the deck is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids from top to bottom
    pub fn ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.ids.iter().copied()
    }
}

/// Both decks of a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decks {
    #[serde(rename = "chanceDeck")]
    pub chance: Deck,
    #[serde(rename = "communityChestDeck")]
    pub community_chest: Deck,
}

impl Decks {
    /// Both catalogs, independently shuffled
    pub fn shuffled<R: GameRng + ?Sized>(rng: &mut R) -> Self {
        Self {
            chance: Deck::shuffled(DeckKind::Chance, rng),
            community_chest: Deck::shuffled(DeckKind::CommunityChest, rng),
        }
    }

    /// The deck of a kind
    pub fn get(&self, kind: DeckKind) -> &Deck {
        match kind {
            DeckKind::Chance => &self.chance,
            DeckKind::CommunityChest => &self.community_chest,
        }
    }

    /// The deck of a kind, mutably
    pub fn get_mut(&mut self, kind: DeckKind) -> &mut Deck {
        match kind {
            DeckKind::Chance => &mut self.chance,
            DeckKind::CommunityChest => &mut self.community_chest,
        }
    }
}
