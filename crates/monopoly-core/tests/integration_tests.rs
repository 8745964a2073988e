//! Integration tests for the monopoly engine.
//!
//! These tests drive complete turns through the public reducer, from a fresh
//! roster to bankruptcy and game over.

use monopoly_core::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn seats(names: &[&str]) -> Vec<PlayerSeat> {
    names.iter().map(|n| PlayerSeat::human(*n)).collect()
}

/// Two-player game whose dice follow `rolls`
fn scripted_game(rolls: Vec<(u8, u8)>) -> (GameState, ScriptedRng) {
    let mut rng = ScriptedRng::rolls(rolls);
    let game = GameState::new_game(seats(&["Ana", "Ben"]), &mut rng).unwrap();
    (game, rng)
}

fn give(game: &mut GameState, owner: PlayerId, tiles: &[TileIndex]) {
    for &index in tiles {
        game.board.get_mut(index).unwrap().owner_id = Some(owner);
        game.players[owner as usize].add_property(index);
    }
}

/// Check the invariants that must hold after every transition
fn assert_consistent(game: &GameState) {
    for tile in game.board.tiles() {
        if let Some(owner) = tile.owner_id {
            let player = game.get_player(owner).expect("owner exists");
            assert!(!player.is_bankrupt, "{} owned by a bankrupt player", tile.name());
            assert!(player.properties.contains(&tile.index));
        }
        if tile.is_mortgaged {
            assert_eq!(tile.house_count, 0, "{} mortgaged with buildings", tile.name());
        }
        assert!(tile.house_count <= 5);
    }

    for player in &game.players {
        let owned: BTreeSet<TileIndex> = game.board.owned_by(player.id).map(|t| t.index).collect();
        let listed: BTreeSet<TileIndex> = player.properties.iter().copied().collect();
        assert_eq!(owned, listed, "property list of {} is out of sync", player.name);
        assert!((player.position as usize) < rules::BOARD_SIZE);
        if player.is_bankrupt {
            assert_eq!(player.money, 0);
        }
    }

    for kind in [DeckKind::Chance, DeckKind::CommunityChest] {
        let mut ids: Vec<CardId> = game.decks.get(kind).ids().collect();
        ids.extend(game.held_card_ids(kind));
        // A kept card waiting for confirmation is in neither place yet
        if let Some(card) = &game.drawn_card {
            if card.deck == kind && card.effect.is_keep() {
                ids.push(card.card_id);
            }
        }
        ids.sort_unstable();
        let mut catalog: Vec<CardId> = kind.catalog().iter().map(|c| c.id).collect();
        catalog.sort_unstable();
        assert_eq!(ids, catalog, "{} deck lost or duplicated a card", kind.name());
    }

    if game.pending_debt.is_some() {
        assert_eq!(game.turn_phase, TurnPhase::BankruptcyResolution);
    }
}

#[test]
fn test_passing_go_pays_salary_once() {
    let (mut game, mut rng) = scripted_game(vec![(2, 3)]);
    game.players[0].position = 38;

    game.apply(&GameAction::RollDice, &mut rng).unwrap();

    let ana = &game.players[0];
    assert_eq!(ana.position, 3);
    assert_eq!(ana.money, rules::STARTING_MONEY + rules::GO_SALARY);
    assert_eq!(game.turn_phase, TurnPhase::BuyDecision);
    assert_consistent(&game);
}

#[test]
fn test_railroad_rent_uses_owned_count() {
    let (mut game, mut rng) = scripted_game(vec![(4, 6)]);
    give(&mut game, 0, &[5, 25, 35]);
    game.current_player_index = 1;
    game.players[1].position = 15;

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.players[1].position, 25);
    assert_eq!(game.turn_phase, TurnPhase::ResolvingRent);
    let details = game.rent_details.clone().unwrap();
    assert_eq!(details.total_rent, 100);
    assert_eq!(details.owner_id, 0);

    game.apply(&GameAction::PayRent, &mut rng).unwrap();
    assert_eq!(game.players[0].money, rules::STARTING_MONEY + 100);
    assert_eq!(game.players[1].money, rules::STARTING_MONEY - 100);
    assert_eq!(game.turn_phase, TurnPhase::Ended);
    assert_consistent(&game);
}

#[test]
fn test_unaffordable_tax_leads_to_bank_bankruptcy() {
    let (mut game, mut rng) = scripted_game(vec![(2, 3)]);
    give(&mut game, 0, &[1, 3, 12]);
    game.board.get_mut(1).unwrap().house_count = 2;
    game.board.get_mut(3).unwrap().house_count = 2;
    game.board.get_mut(12).unwrap().is_mortgaged = true;
    game.players[0].position = 33;
    game.players[0].money = 40;

    // 33 + 5 is Luxury Tax
    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.turn_phase, TurnPhase::BankruptcyResolution);
    assert_eq!(
        game.pending_debt,
        Some(PendingDebt {
            debtor_id: 0,
            creditor_id: None,
            amount: 100,
            reason: "Luxury Tax".to_string(),
        })
    );
    assert_eq!(game.players[0].money, 40);

    // Only settlement, liquidation or bankruptcy while the debt is open
    let legal = game.legal_actions();
    assert!(!legal.contains(&GameAction::PayDebt));
    assert!(legal.contains(&GameAction::DeclareBankruptcy));
    assert!(legal.contains(&GameAction::SellHouse { tile_id: 1 }));
    assert!(!legal.contains(&GameAction::EndTurn));
    assert!(!legal.iter().any(|a| matches!(a, GameAction::BuildHouse { .. })));
    assert_eq!(
        game.apply(&GameAction::RollDice, &mut rng),
        Err(GameError::Rejected("not allowed in this phase"))
    );

    game.apply(&GameAction::DeclareBankruptcy, &mut rng).unwrap();
    for index in [1, 3, 12] {
        let tile = game.board.get(index).unwrap();
        assert_eq!(tile.owner_id, None);
        assert!(!tile.is_mortgaged);
        assert_eq!(tile.house_count, 0);
    }
    let ana = &game.players[0];
    assert!(ana.is_bankrupt);
    assert_eq!(ana.money, 0);
    assert!(ana.properties.is_empty());
    assert!(game.pending_debt.is_none());
    assert_eq!(game.turn_phase, TurnPhase::Ended);
    assert_consistent(&game);

    game.apply(&GameAction::EndTurn, &mut rng).unwrap();
    assert_eq!(game.game_status, GameStatus::GameOver);
    assert_eq!(game.winner().map(|p| p.name.as_str()), Some("Ben"));
    assert!(game.legal_actions().is_empty());
}

#[test]
fn test_three_doubles_go_to_jail() {
    // Oriental Avenue, Just Visiting, then the third doubles
    let (mut game, mut rng) = scripted_game(vec![(3, 3), (2, 2), (5, 5)]);

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.turn_phase, TurnPhase::BuyDecision);
    game.apply(&GameAction::PassBuy, &mut rng).unwrap();
    assert_eq!(game.turn_phase, TurnPhase::Rolling);

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.players[0].position, 10);
    assert!(!game.players[0].is_jailed);
    assert_eq!(game.turn_phase, TurnPhase::Rolling);

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    let ana = &game.players[0];
    assert!(ana.is_jailed);
    assert_eq!(ana.position, 10);
    assert_eq!(game.consecutive_doubles, 0);
    assert!(!game.rolled_doubles);
    assert_eq!(game.turn_phase, TurnPhase::Ended);
    assert_eq!(game.legal_actions(), vec![GameAction::EndTurn]);
}

#[test]
fn test_full_group_doubles_rent() {
    let (mut game, mut rng) = scripted_game(vec![(3, 4)]);
    give(&mut game, 0, &[37, 39]);
    game.current_player_index = 1;
    game.players[1].position = 32;

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    let details = game.rent_details.clone().unwrap();
    assert_eq!(details.tile_index, 39);
    assert_eq!(details.base_rent, 50);
    assert_eq!(details.multiplier, 2);
    assert_eq!(details.total_rent, 100);
}

#[test]
fn test_building_and_selling_stay_even() {
    let (mut game, mut rng) = scripted_game(vec![]);
    give(&mut game, 0, &[37, 39]);

    // Two houses each, built alternately
    for tile_id in [37, 39, 37, 39] {
        game.apply(&GameAction::BuildHouse { tile_id }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.players[0].money, rules::STARTING_MONEY - 800);

    game.apply(&GameAction::SellHouse { tile_id: 37 }, &mut rng)
        .unwrap();
    assert_eq!(game.players[0].money, rules::STARTING_MONEY - 700);
    let err = game.apply(&GameAction::SellHouse { tile_id: 37 }, &mut rng);
    assert_eq!(err, Err(GameError::Rule(RuleViolation::UnevenSelling)));
    assert_eq!(game.board.get(37).unwrap().house_count, 1);
    assert_eq!(game.board.get(39).unwrap().house_count, 2);

    let err = game.apply(&GameAction::BuildHouse { tile_id: 39 }, &mut rng);
    assert_eq!(err, Err(GameError::Rule(RuleViolation::UnevenBuilding)));

    let err = game.apply(&GameAction::MortgageTile { tile_id: 39 }, &mut rng);
    assert_eq!(err, Err(GameError::Rule(RuleViolation::HasBuildings)));
    assert!(!game.board.get(39).unwrap().is_mortgaged);
    assert_consistent(&game);
}

#[test]
fn test_rent_bankruptcy_transfers_to_creditor() {
    let (mut game, mut rng) = scripted_game(vec![(3, 4)]);
    give(&mut game, 1, &[37, 39]);
    game.board.get_mut(37).unwrap().house_count = 5;
    game.board.get_mut(39).unwrap().house_count = 5;
    give(&mut game, 0, &[1, 5]);
    game.board.get_mut(1).unwrap().is_mortgaged = true;
    game.players[0].position = 30;
    game.players[0].money = 150;

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.players[0].position, 37);
    assert_eq!(game.rent_details.as_ref().unwrap().total_rent, 1500);
    assert!(game.rent_details.as_ref().unwrap().is_hotel);

    game.apply(&GameAction::PayRent, &mut rng).unwrap();
    let debt = game.pending_debt.clone().unwrap();
    assert_eq!(debt.creditor_id, Some(1));
    assert_eq!(debt.amount, 1500);

    // Mortgaging the railroad is not enough
    game.apply(&GameAction::MortgageTile { tile_id: 5 }, &mut rng)
        .unwrap();
    assert_eq!(game.players[0].money, 250);
    assert_eq!(
        game.apply(&GameAction::PayDebt, &mut rng),
        Err(GameError::Rule(RuleViolation::CannotPayDebt))
    );

    let ben_before = game.players[1].money;
    game.apply(&GameAction::DeclareBankruptcy, &mut rng).unwrap();
    assert_eq!(game.players[1].money, ben_before + 250);
    for index in [1, 5] {
        let tile = game.board.get(index).unwrap();
        assert_eq!(tile.owner_id, Some(1));
        assert!(tile.is_mortgaged);
    }
    assert_consistent(&game);
}

#[test]
fn test_rejected_actions_keep_version() {
    let (mut game, mut rng) = scripted_game(vec![(1, 2)]);
    let version = game.version;

    for action in [
        GameAction::BuyTile,
        GameAction::PayRent,
        GameAction::ConfirmCard,
        GameAction::PayDebt,
        GameAction::DeclareBankruptcy,
        GameAction::UseJailCard,
        GameAction::StartGame,
    ] {
        let result = game.apply(&action, &mut rng);
        assert!(matches!(result, Err(GameError::Rejected(_))), "{:?}", action);
    }
    assert_eq!(game.version, version);

    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    assert_eq!(game.version, version + 1);
}

#[test]
fn test_snapshot_survives_json() {
    let (mut game, mut rng) = scripted_game(vec![(1, 2)]);
    game.apply(&GameAction::RollDice, &mut rng).unwrap();
    game.apply(&GameAction::BuyTile, &mut rng).unwrap();

    let json = serde_json::to_string(&game).unwrap();
    let restored: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, game);
}

/// Pick an action the way a cautious bot would
fn choose(game: &GameState, legal: &[GameAction]) -> GameAction {
    let money = game.current_player().map_or(0, |p| p.money);
    let has = |action: &GameAction| legal.contains(action);

    if has(&GameAction::PayDebt) {
        return GameAction::PayDebt;
    }
    if game.pending_debt.is_some() {
        if let Some(sell) = legal.iter().find(|a| matches!(a, GameAction::SellHouse { .. })) {
            return sell.clone();
        }
        if let Some(mortgage) = legal.iter().find(|a| matches!(a, GameAction::MortgageTile { .. })) {
            return mortgage.clone();
        }
        return GameAction::DeclareBankruptcy;
    }
    if money > 600 {
        if let Some(build) = legal.iter().find(|a| matches!(a, GameAction::BuildHouse { .. })) {
            return build.clone();
        }
    }
    if money > 1000 {
        if let Some(lift) = legal.iter().find(|a| matches!(a, GameAction::UnmortgageTile { .. })) {
            return lift.clone();
        }
    }
    for preferred in [
        GameAction::BuyTile,
        GameAction::PayRent,
        GameAction::ConfirmCard,
        GameAction::UseJailCard,
        GameAction::RollDice,
        GameAction::PassBuy,
        GameAction::EndTurn,
    ] {
        if has(&preferred) {
            return preferred;
        }
    }
    legal[0].clone()
}

#[test]
fn test_seeded_games_stay_consistent() {
    for seed in 0..8 {
        let mut rng = StdGameRng::seeded(seed);
        let mut game =
            GameState::new_game(seats(&["Ana", "Ben", "Cy", "Dee"]), &mut rng).unwrap();

        let max_iterations = 4000;
        let mut iterations = 0;
        while !game.is_finished() && iterations < max_iterations {
            let legal = game.legal_actions();
            assert!(!legal.is_empty(), "stuck in {:?}", game.turn_phase);

            let action = choose(&game, &legal);
            let version = game.version;
            let result = game.apply(&action, &mut rng);
            assert!(
                result.is_ok(),
                "seed {}: listed action {:?} failed: {:?}",
                seed,
                action,
                result
            );
            assert_eq!(game.version, version + 1);
            assert_consistent(&game);
            iterations += 1;
        }

        if game.is_finished() {
            let winner = game.winner().expect("finished game has a winner");
            assert!(!winner.is_bankrupt);
        }
    }
}
