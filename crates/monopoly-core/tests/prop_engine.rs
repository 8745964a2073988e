//! Property-based tests for the turn engine.
//!
//! These cover dice, movement, the card decks and the debt path.
//! Run with: cargo test --release prop_engine

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use monopoly_core::game::wrap_position;
use monopoly_core::rules::{BOARD_SIZE, GO_SALARY, JAIL_INDEX, STARTING_MONEY};
use monopoly_core::*;

fn two_players<R: GameRng>(rng: &mut R) -> GameState {
    GameState::new_game(
        vec![PlayerSeat::human("Ana"), PlayerSeat::bot("Ben")],
        rng,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Every roll shows two faces in 1..=6 and records their sum.
    #[test]
    fn prop_dice_in_range(seed in any::<u64>()) {
        let mut rng = StdGameRng::seeded(seed);
        let mut game = two_players(&mut rng);
        game.apply(&GameAction::RollDice, &mut rng).unwrap();

        let [a, b] = game.dice;
        prop_assert!((1..=6).contains(&a));
        prop_assert!((1..=6).contains(&b));
        prop_assert_eq!(game.last_dice_total, a + b);
        prop_assert_eq!(game.rolled_doubles, a == b);
    }

    /// Wrapping stays on the board in both directions.
    #[test]
    fn prop_wrap_stays_on_board(position in 0u8..40, offset in -120i32..120) {
        let next = wrap_position(position, offset);
        prop_assert!((next as usize) < BOARD_SIZE);
        prop_assert_eq!((i32::from(position) + offset - i32::from(next)).rem_euclid(40), 0);
    }

    /// A dice move credits GO exactly once when it wraps, never otherwise.
    #[test]
    fn prop_single_go_credit(start in 0u8..40, a in 1u8..=6, b in 1u8..=6) {
        let mut rng = ScriptedRng::rolls([(a, b)]);
        let mut game = two_players(&mut rng);
        game.players[0].position = start;
        game.apply(&GameAction::RollDice, &mut rng).unwrap();

        let target = (start as usize + (a + b) as usize) % BOARD_SIZE;
        let wrapped = start as usize + (a + b) as usize >= BOARD_SIZE;
        let tile = game.board.get(target as u8).unwrap();

        let ana = &game.players[0];
        if tile.tile_type() == TileType::GoToJail {
            prop_assert_eq!(ana.position, JAIL_INDEX);
        } else {
            prop_assert_eq!(ana.position as usize, target);
        }

        let tax = if tile.tile_type() == TileType::Tax { tile.def.price.unwrap() } else { 0 };
        let salary = if wrapped { GO_SALARY } else { 0 };
        prop_assert_eq!(ana.money, STARTING_MONEY + salary - tax);
    }

    /// Deck plus hands always hold the whole catalog exactly once.
    #[test]
    fn prop_deck_is_closed(seed in any::<u64>(), draws in 0usize..200, surrender_every in 1usize..8) {
        let mut rng = StdGameRng::seeded(seed);
        for kind in [DeckKind::Chance, DeckKind::CommunityChest] {
            let mut deck = Deck::shuffled(kind, &mut rng);
            let mut held: Vec<CardId> = Vec::new();

            for i in 0..draws {
                let card = deck.draw(kind, &held, &mut rng).unwrap();
                if card.effect.is_keep() {
                    held.push(card.card_id);
                }
                if i % surrender_every == 0 {
                    if let Some(id) = held.pop() {
                        deck.surrender(id);
                    }
                }
            }

            let mut all: Vec<CardId> = deck.ids().chain(held.iter().copied()).collect();
            all.sort_unstable();
            let mut catalog: Vec<CardId> = kind.catalog().iter().map(|c| c.id).collect();
            catalog.sort_unstable();
            prop_assert_eq!(all, catalog);
        }
    }

    /// Paying a charge either settles it in full or blocks on a pending debt;
    /// money never goes negative.
    #[test]
    fn prop_debt_never_negative(money in 0i64..3000, rent in 1i64..3000) {
        let mut rng = ScriptedRng::new([]);
        let mut game = two_players(&mut rng);
        game.players[0].money = money;
        game.rent_details = Some(RentDetails {
            tile_index: 39,
            tile_name: "Boardwalk".to_string(),
            owner_id: 1,
            owner_name: "Ben".to_string(),
            base_rent: 50,
            multiplier: 1,
            house_count: 0,
            is_hotel: false,
            total_rent: rent,
            calculation: "Base rent".to_string(),
        });
        game.turn_phase = TurnPhase::ResolvingRent;

        game.apply(&GameAction::PayRent, &mut rng).unwrap();

        let ana = &game.players[0];
        prop_assert!(ana.money >= 0);
        if money >= rent {
            prop_assert_eq!(ana.money, money - rent);
            prop_assert_eq!(game.players[1].money, STARTING_MONEY + rent);
            prop_assert!(game.pending_debt.is_none());
            prop_assert_eq!(game.turn_phase, TurnPhase::Ended);
        } else {
            prop_assert_eq!(ana.money, money);
            prop_assert_eq!(game.pending_debt.as_ref().map(|d| d.amount), Some(rent));
            prop_assert_eq!(game.turn_phase, TurnPhase::BankruptcyResolution);
        }
    }

    /// Bankruptcy clears the debt, strips the debtor and ends the turn.
    #[test]
    fn prop_bankruptcy_strips_debtor(
        money in 0i64..100,
        mask in proptest::array::uniform6(any::<bool>()),
        to_bank in any::<bool>(),
    ) {
        let owned: Vec<TileIndex> = [1u8, 3, 5, 12, 15, 39]
            .into_iter()
            .zip(mask)
            .filter_map(|(index, keep)| keep.then_some(index))
            .collect();
        let mut rng = ScriptedRng::new([]);
        let mut game = two_players(&mut rng);
        for &index in &owned {
            game.board.get_mut(index).unwrap().owner_id = Some(0);
            game.players[0].add_property(index);
        }
        game.players[0].money = money;
        game.pending_debt = Some(PendingDebt {
            debtor_id: 0,
            creditor_id: if to_bank { None } else { Some(1) },
            amount: 500,
            reason: "rent".to_string(),
        });
        game.turn_phase = TurnPhase::BankruptcyResolution;

        game.apply(&GameAction::DeclareBankruptcy, &mut rng).unwrap();

        let ana = &game.players[0];
        prop_assert!(ana.is_bankrupt);
        prop_assert_eq!(ana.money, 0);
        prop_assert!(ana.properties.is_empty());
        prop_assert!(game.pending_debt.is_none());
        prop_assert_eq!(game.turn_phase, TurnPhase::Ended);
        for &index in &owned {
            let expected = if to_bank { None } else { Some(1) };
            prop_assert_eq!(game.board.get(index).unwrap().owner_id, expected);
        }
    }
}
