//! End-to-end controller tests: commands in, scoped events out.
//!
//! Each "player" is a collector actor registered with the hub under a
//! fixed id, so every test can assert exactly what a given connection
//! was allowed to see.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix::prelude::*;

use redking_backend::ai::Difficulty;
use redking_backend::domain::{Card, Phase};
use redking_backend::protocol::{ClientCommand, ServerEvent};
use redking_backend::services::rooms::RoomState;
use redking_backend::services::GameFlowService;
use redking_backend::ws::hub::{ConnectionHub, Deliver};

struct Collector {
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<Deliver> for Collector {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _ctx: &mut Self::Context) {
        self.events.lock().unwrap().push(msg.event);
    }
}

struct TestClient {
    id: String,
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl TestClient {
    fn connect(hub: &ConnectionHub, id: &str) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let addr = Collector {
            events: events.clone(),
        }
        .start();
        hub.register(id, addr.recipient());
        Self {
            id: id.to_string(),
            events,
        }
    }

    fn drain(&self) -> Vec<ServerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn snapshot(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Let actor mailboxes and bot tasks run.
async fn flush() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn setup() -> (Arc<ConnectionHub>, Arc<GameFlowService>) {
    let hub = Arc::new(ConnectionHub::new());
    let service = GameFlowService::with_bot_tuning(hub.clone(), Duration::ZERO, Some(7));
    (hub, service)
}

fn room_code(events: &[ServerEvent]) -> String {
    events
        .iter()
        .find_map(|e| match e {
            ServerEvent::RoomCreated { code, .. } => Some(code.clone()),
            ServerEvent::RoomJoined { code, .. } => Some(code.clone()),
            _ => None,
        })
        .expect("no room code event")
}

/// Host a room, join a guest, and return the room code with both inboxes
/// drained.
async fn host_and_guest(
    hub: &ConnectionHub,
    service: &Arc<GameFlowService>,
) -> (TestClient, TestClient, String) {
    let host = TestClient::connect(hub, "host");
    let guest = TestClient::connect(hub, "guest");

    service.dispatch(&host.id, ClientCommand::HostGame { name: "Ada".into() });
    flush().await;
    let code = room_code(&host.drain());

    service.dispatch(
        &guest.id,
        ClientCommand::JoinGame {
            code: code.clone(),
            name: "Grace".into(),
        },
    );
    flush().await;
    guest.drain();
    host.drain();
    (host, guest, code)
}

#[actix_rt::test]
async fn lobby_events_are_scoped() {
    let (hub, service) = setup();
    let host = TestClient::connect(&hub, "host");
    let guest = TestClient::connect(&hub, "guest");

    service.dispatch(&host.id, ClientCommand::HostGame { name: "Ada".into() });
    flush().await;

    let host_events = host.drain();
    assert!(matches!(host_events[0], ServerEvent::RoomCreated { .. }));
    assert!(guest.snapshot().is_empty());
    let code = room_code(&host_events);

    service.dispatch(
        &guest.id,
        ClientCommand::JoinGame {
            code: code.clone(),
            name: "Grace".into(),
        },
    );
    flush().await;

    let guest_events = guest.drain();
    assert!(
        matches!(&guest_events[0], ServerEvent::RoomJoined { players, .. } if players.len() == 2)
    );
    // The joiner is excluded from the list broadcast; the host gets it.
    assert!(!guest_events
        .iter()
        .any(|e| matches!(e, ServerEvent::PlayerListUpdated { .. })));
    assert!(host
        .drain()
        .iter()
        .any(|e| matches!(e, ServerEvent::PlayerListUpdated { players } if players.len() == 2)));
}

#[actix_rt::test]
async fn join_failures_surface_as_private_join_errors() {
    let (hub, service) = setup();
    let host = TestClient::connect(&hub, "host");
    let stranger = TestClient::connect(&hub, "stranger");

    service.dispatch(&host.id, ClientCommand::HostGame { name: "Ada".into() });
    flush().await;
    host.drain();

    service.dispatch(
        &stranger.id,
        ClientCommand::JoinGame {
            code: "ZZZZ".into(),
            name: "Eve".into(),
        },
    );
    flush().await;

    let events = stranger.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ServerEvent::JoinError { kind, .. }
            if *kind == redking_backend::errors::JoinError::RoomNotFound
    ));
    assert!(host.snapshot().is_empty());
}

#[actix_rt::test]
async fn deal_reveals_each_hand_only_to_its_owner() {
    let (hub, service) = setup();
    let (host, guest, _code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    flush().await;

    let host_events = host.drain();
    let guest_events = guest.drain();

    let hand_of = |events: &[ServerEvent]| -> Vec<Card> {
        let dealt: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::CardsDealt {
                    hand, opponents, ..
                } => Some((hand.clone(), opponents.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(dealt.len(), 1, "expected exactly one cards-dealt");
        let (hand, opponents) = &dealt[0];
        assert_eq!(opponents.len(), 1);
        assert_eq!(opponents[0].card_count, 4);
        hand.iter().map(|slot| (*slot).expect("dealt gap")).collect()
    };

    let host_hand = hand_of(&host_events);
    let guest_hand = hand_of(&guest_events);
    assert_eq!(host_hand.len(), 4);
    assert_eq!(guest_hand.len(), 4);

    let host_ids: HashSet<String> = host_hand.iter().map(|c| c.id()).collect();
    let guest_ids: HashSet<String> = guest_hand.iter().map(|c| c.id()).collect();
    assert!(host_ids.is_disjoint(&guest_ids));
}

#[actix_rt::test]
async fn peek_phase_hands_first_turn_to_the_player_after_the_host() {
    let (hub, service) = setup();
    let (host, guest, _code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;

    let events = host.drain();
    let phase = events.iter().find_map(|e| match e {
        ServerEvent::PhaseChanged {
            phase,
            current_turn,
            ..
        } => Some((*phase, current_turn.clone())),
        _ => None,
    });
    assert_eq!(phase, Some((Phase::Play, Some(guest.id.clone()))));
}

#[actix_rt::test]
async fn peek_other_is_private_to_the_caller() {
    let (hub, service) = setup();
    let (host, guest, code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    // The guest holds the first turn; what does the host have at slot 1?
    let expected = service
        .with_room_mut(&code, |room| {
            let game = room.game.as_ref().unwrap();
            game.hands[&host.id].get(1).unwrap()
        })
        .unwrap();

    service.dispatch(
        &guest.id,
        ClientCommand::UsePeekOther {
            target_id: host.id.clone(),
            slot_index: 1,
        },
    );
    flush().await;

    let guest_events = guest.drain();
    assert!(guest_events.iter().any(|e| matches!(
        e,
        ServerEvent::PeekResult { card, slot_index: 1, target_id: Some(t) }
            if *card == expected && *t == host.id
    )));
    // The target learns nothing.
    assert!(host.drain().is_empty());
}

#[actix_rt::test]
async fn draw_discard_round_trip_with_scoped_events() {
    let (hub, service) = setup();
    let (host, guest, code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    service.dispatch(&guest.id, ClientCommand::DrawCard);
    flush().await;

    let guest_events = guest.drain();
    guest_events
        .iter()
        .find(|e| matches!(e, ServerEvent::CardDrawn { .. }))
        .expect("drawer sees the card");
    let host_events = host.drain();
    assert!(host_events.iter().any(|e| matches!(
        e,
        ServerEvent::OpponentDrew { player_id, deck_count, .. }
            if *player_id == guest.id && *deck_count == 45
    )));
    assert!(!host_events
        .iter()
        .any(|e| matches!(e, ServerEvent::CardDrawn { .. })));

    // Swap the drawn card for a no-rule card from the deck so the
    // discard ends the turn.
    let plain = service
        .with_room_mut(&code, |room| {
            let game = room.game.as_mut().unwrap();
            let idx = game
                .deck
                .iter()
                .position(|c| redking_backend::domain::rule_type(*c).is_none())
                .expect("a 46-card deck always holds a plain card");
            let plain = game.deck.remove(idx);
            let old = game.drawn_card.replace(plain).expect("card in flight");
            game.deck.push(old);
            plain
        })
        .unwrap();

    service.dispatch(&guest.id, ClientCommand::DiscardCard);
    flush().await;

    let host_events = host.drain();
    assert!(host_events.iter().any(|e| matches!(
        e,
        ServerEvent::CardDiscarded { player_id, card, .. }
            if *player_id == guest.id && *card == plain
    )));
    assert!(host_events.iter().any(|e| matches!(
        e,
        ServerEvent::TurnUpdate { current_turn: Some(t), top_discard: Some(top), .. }
            if *t == host.id && *top == plain
    )));
}

#[actix_rt::test]
async fn out_of_turn_commands_are_silently_dropped() {
    let (hub, service) = setup();
    let (host, guest, _code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    // Guest holds the turn; the host tries to draw anyway.
    service.dispatch(&host.id, ClientCommand::DrawCard);
    flush().await;

    assert!(host.drain().is_empty());
    assert!(guest.drain().is_empty());
}

#[actix_rt::test]
async fn match_own_success_is_broadcast_and_leaves_a_gap() {
    let (hub, service) = setup();
    let (host, guest, code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    // Rig: pull two deck cards of the same rank; one tops the discard
    // pile, the other goes into the host's slot 0.
    let mine = service
        .with_room_mut(&code, |room| {
            let game = room.game.as_mut().unwrap();
            let mut pair = None;
            'outer: for i in 0..game.deck.len() {
                for j in (i + 1)..game.deck.len() {
                    if game.deck[i].rank == game.deck[j].rank {
                        pair = Some((i, j));
                        break 'outer;
                    }
                }
            }
            let (i, j) = pair.expect("a 46-card deck always holds a rank pair");
            let mine = game.deck.remove(j);
            let top = game.deck.remove(i);
            game.discard_pile.push(top);
            let displaced = game
                .hands
                .get_mut("host")
                .unwrap()
                .replace_at(0, mine)
                .unwrap();
            game.deck.push(displaced);
            mine
        })
        .unwrap();

    service.dispatch(&host.id, ClientCommand::CallMatchOwn { slot_index: 0 });
    flush().await;

    let guest_events = guest.drain();
    assert!(guest_events.iter().any(|e| matches!(
        e,
        ServerEvent::MatchResult { caller_id, card, success: true, .. }
            if *caller_id == host.id && *card == mine
    )));
    assert!(guest_events.iter().any(|e| matches!(
        e,
        ServerEvent::HandLayoutsUpdated { layouts }
            if layouts["host"] == vec![false, true, true, true]
    )));
}

#[actix_rt::test]
async fn red_king_runs_redemption_then_reveal() {
    let (hub, service) = setup();
    let (host, guest, code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    service.dispatch(&guest.id, ClientCommand::CallRedKing);
    flush().await;

    let host_events = host.drain();
    assert!(host_events.iter().any(|e| matches!(
        e,
        ServerEvent::PhaseChanged { phase: Phase::Redemption, current_turn: Some(t), .. }
            if *t == host.id
    )));

    // The caller's hand is now protected.
    service.dispatch(
        &host.id,
        ClientCommand::CallMatchOther {
            target_id: guest.id.clone(),
            slot_index: 0,
        },
    );
    flush().await;
    // (Empty discard also blocks it; either way, silence.)
    assert!(host.drain().is_empty());

    // Host takes the single redemption turn: draw then keep into slot 0.
    service.dispatch(&host.id, ClientCommand::DrawCard);
    flush().await;
    service.dispatch(&host.id, ClientCommand::KeepCard { slot_index: 0 });
    flush().await;

    let guest_events = guest.drain();
    assert!(guest_events.iter().any(|e| matches!(
        e,
        ServerEvent::PhaseChanged { phase: Phase::Reveal, .. }
    )));
    let results = guest_events.iter().find_map(|e| match e {
        ServerEvent::GameResults {
            results,
            caller_id,
            winner_id,
        } => Some((results.clone(), caller_id.clone(), winner_id.clone())),
        _ => None,
    });
    let (results, caller_id, winner_id) = results.expect("no game-results event");
    assert_eq!(caller_id.as_deref(), Some(guest.id.as_str()));
    assert_eq!(results.len(), 2);
    assert!(winner_id.is_some());
    // Sorted ascending by score.
    assert!(results[0].score <= results[1].score);

    let room_state = service
        .with_room_mut(&code, |room| room.state)
        .unwrap();
    assert_eq!(room_state, RoomState::Playing);

    // Host ends the game; the room returns to the lobby.
    service.dispatch(&host.id, ClientCommand::EndGame);
    flush().await;
    assert!(guest
        .drain()
        .iter()
        .any(|e| matches!(e, ServerEvent::GameEnded { players } if players.len() == 2)));
    let game_cleared = service
        .with_room_mut(&code, |room| room.game.is_none())
        .unwrap();
    assert!(game_cleared);
}

#[actix_rt::test]
async fn leaving_mid_peek_unblocks_the_phase() {
    let (hub, service) = setup();
    let (host, guest, _code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    service.dispatch(&guest.id, ClientCommand::LeaveRoom);
    flush().await;

    let guest_events = guest.drain();
    assert!(guest_events
        .iter()
        .any(|e| matches!(e, ServerEvent::YouLeft)));

    let host_events = host.drain();
    assert!(host_events
        .iter()
        .any(|e| matches!(e, ServerEvent::PlayerListUpdated { players } if players.len() == 1)));
    assert!(host_events.iter().any(|e| matches!(
        e,
        ServerEvent::PhaseChanged { phase: Phase::Play, .. }
    )));
}

#[actix_rt::test]
async fn bot_takes_its_scheduled_turn() {
    let (hub, service) = setup();
    let host = TestClient::connect(&hub, "host");

    service.dispatch(&host.id, ClientCommand::HostGame { name: "Ada".into() });
    flush().await;
    let code = room_code(&host.drain());

    service.dispatch(
        &host.id,
        ClientCommand::AddCpuPlayer {
            difficulty: Some(Difficulty::Hard),
        },
    );
    service.dispatch(&host.id, ClientCommand::StartGame);
    flush().await;

    // The bot peeked immediately; only the host's consent is pending.
    let events = host.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::PlayerPeekDone { player_id } if player_id == "bot-1"
    )));

    service.dispatch(&host.id, ClientCommand::PeekDone);
    // Zero think-delay: give the spawned timer a few ticks to run the
    // whole bot turn.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = host.drain();
    // The bot either finished a normal turn (turn-update back to the
    // host) or called the red king (phase change to redemption with the
    // host to act).
    let host_to_act = events.iter().any(|e| match e {
        ServerEvent::TurnUpdate { current_turn, .. } => current_turn.as_deref() == Some("host"),
        ServerEvent::PhaseChanged { current_turn, .. } => current_turn.as_deref() == Some("host"),
        _ => false,
    });
    assert!(host_to_act, "bot never handed the turn over: {events:?}");

    let pending = service
        .with_room_mut(&code, |room| {
            room.game.as_ref().map(|g| g.pending_bot_turn)
        })
        .flatten();
    assert_eq!(pending, Some(false));
}

#[actix_rt::test]
async fn stale_bot_timer_is_a_no_op() {
    let (hub, service) = setup();
    let (host, guest, code) = host_and_guest(&hub, &service).await;

    service.dispatch(&host.id, ClientCommand::StartGame);
    service.dispatch(&host.id, ClientCommand::PeekDone);
    service.dispatch(&guest.id, ClientCommand::PeekDone);
    flush().await;
    host.drain();
    guest.drain();

    // Fire a bot turn for an id that does not hold the turn.
    service.run_bot_turn(&code, "bot-9");
    flush().await;

    assert!(host.drain().is_empty());
    assert!(guest.drain().is_empty());
}
