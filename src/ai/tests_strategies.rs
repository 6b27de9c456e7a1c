use crate::ai::memory::BotMemory;
use crate::ai::trait_def::{BotStrategy, BotView, DrawDecision, RuleDecision};
use crate::ai::{easy::EasyBot, hard::HardBot, medium::MediumBot};
use crate::domain::hand::Hand;
use crate::domain::state::GameState;
use crate::domain::{Card, Rank, RuleType, Suit};

const BOT: &str = "bot-1";
const OPP: &str = "p2";

fn card(suit: Suit, rank: Rank) -> Card {
    Card::new(suit, rank)
}

fn state_with(bot_hand: Vec<Card>, opp_hand: Vec<Card>) -> GameState {
    let players = vec![BOT.to_string(), OPP.to_string()];
    let mut state = GameState::deal(&players, 99).unwrap();
    state.begin_play();
    state.hands.insert(BOT.into(), Hand::new(bot_hand));
    state.hands.insert(OPP.into(), Hand::new(opp_hand));
    state
}

fn view<'a>(state: &'a GameState, memory: &'a BotMemory, opponents: &'a [String]) -> BotView<'a> {
    BotView {
        bot_id: BOT,
        game: state,
        memory,
        opponents,
    }
}

#[test]
fn medium_calls_with_known_cheap_hand() {
    let state = state_with(
        vec![
            card(Suit::Clubs, Rank::Ace),
            card(Suit::Hearts, Rank::Two),
            card(Suit::Spades, Rank::Ace),
            Card::joker(0),
        ],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let mut memory = BotMemory::new();
    // Three of four slots known, all cheap: estimate 1+2+1+6 = 10 > 8.
    memory.remember(BOT, 0, card(Suit::Clubs, Rank::Ace));
    memory.remember(BOT, 1, card(Suit::Hearts, Rank::Two));
    memory.remember(BOT, 2, card(Suit::Spades, Rank::Ace));
    let opponents = vec![OPP.to_string()];

    let bot = MediumBot::new(Some(1));
    assert!(!bot.should_call_red_king(&view(&state, &memory, &opponents)));

    // Knowing the joker drops the estimate to 4 and the known sum stays
    // under the cap.
    memory.remember(BOT, 3, Card::joker(0));
    assert!(bot.should_call_red_king(&view(&state, &memory, &opponents)));
}

#[test]
fn medium_keeps_only_improvements() {
    let state = state_with(
        vec![
            card(Suit::Clubs, Rank::Ten),
            card(Suit::Hearts, Rank::Three),
            card(Suit::Spades, Rank::Four),
            card(Suit::Diamonds, Rank::Five),
        ],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let mut memory = BotMemory::new();
    memory.remember(BOT, 0, card(Suit::Clubs, Rank::Ten));
    memory.remember(BOT, 1, card(Suit::Hearts, Rank::Three));
    let opponents = vec![OPP.to_string()];
    let bot = MediumBot::new(Some(1));

    let decision =
        bot.decide_keep_or_discard(&view(&state, &memory, &opponents), card(Suit::Clubs, Rank::Two));
    assert_eq!(decision, DrawDecision::Keep { slot: 0 });

    let decision = bot.decide_keep_or_discard(
        &view(&state, &memory, &opponents),
        card(Suit::Clubs, Rank::Jack),
    );
    assert_eq!(decision, DrawDecision::Discard);
}

#[test]
fn medium_peeks_first_unknown_slot() {
    let state = state_with(
        vec![
            card(Suit::Clubs, Rank::Ten),
            card(Suit::Hearts, Rank::Three),
            card(Suit::Spades, Rank::Four),
            card(Suit::Diamonds, Rank::Five),
        ],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let mut memory = BotMemory::new();
    memory.remember(BOT, 0, card(Suit::Clubs, Rank::Ten));
    let opponents = vec![OPP.to_string()];
    let bot = MediumBot::new(Some(1));

    let decision = bot.decide_rule_usage(&view(&state, &memory, &opponents), RuleType::PeekOwn);
    assert_eq!(decision, RuleDecision::PeekOwn { slot: 1 });
}

#[test]
fn medium_matches_on_remembered_rank_equality() {
    let state = state_with(
        vec![card(Suit::Clubs, Rank::Five); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];
    let bot = MediumBot::new(Some(1));
    let v = view(&state, &memory, &opponents);

    assert!(bot.should_match_own(
        &v,
        0,
        card(Suit::Clubs, Rank::Five),
        card(Suit::Hearts, Rank::Five)
    ));
    assert!(!bot.should_match_own(
        &v,
        0,
        card(Suit::Clubs, Rank::Five),
        card(Suit::Hearts, Rank::Six)
    ));
}

#[test]
fn hard_calls_on_cheap_actual_hand() {
    let cheap = state_with(
        vec![
            card(Suit::Clubs, Rank::Ace),
            card(Suit::Hearts, Rank::King),
            card(Suit::Spades, Rank::Ace),
            Card::joker(0),
        ],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];
    let bot = HardBot::new(None);
    // 1 - 1 + 1 + 0 = 1
    assert!(bot.should_call_red_king(&view(&cheap, &memory, &opponents)));

    let pricey = state_with(
        vec![card(Suit::Clubs, Rank::Ten); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    assert!(!bot.should_call_red_king(&view(&pricey, &memory, &opponents)));
}

#[test]
fn hard_blind_switch_only_when_net_positive() {
    let state = state_with(
        vec![
            card(Suit::Clubs, Rank::Ten),
            card(Suit::Hearts, Rank::Two),
            card(Suit::Spades, Rank::Two),
            card(Suit::Diamonds, Rank::Two),
        ],
        vec![
            card(Suit::Clubs, Rank::Nine),
            Card::joker(1),
            card(Suit::Hearts, Rank::Nine),
            card(Suit::Diamonds, Rank::Nine),
        ],
    );
    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];
    let bot = HardBot::new(None);

    let decision = bot.decide_rule_usage(&view(&state, &memory, &opponents), RuleType::BlindSwitch);
    // Give away the ten, take the joker.
    match decision {
        RuleDecision::BlindSwitch { own_slot, target } => {
            assert_eq!(own_slot, 0);
            assert_eq!(target.player_id, OPP);
            assert_eq!(target.slot_index, 1);
        }
        other => panic!("expected a switch, got {other:?}"),
    }

    // Nothing worth taking: opponent holds only tens, we hold twos.
    let state = state_with(
        vec![card(Suit::Clubs, Rank::Two); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let decision = bot.decide_rule_usage(&view(&state, &memory, &opponents), RuleType::BlindSwitch);
    assert_eq!(decision, RuleDecision::Skip);
}

#[test]
fn easy_is_deterministic_under_a_seed() {
    let state = state_with(
        vec![card(Suit::Clubs, Rank::Five); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];

    let a = EasyBot::new(Some(42));
    let b = EasyBot::new(Some(42));
    for _ in 0..8 {
        let left =
            a.decide_keep_or_discard(&view(&state, &memory, &opponents), card(Suit::Clubs, Rank::Two));
        let right =
            b.decide_keep_or_discard(&view(&state, &memory, &opponents), card(Suit::Clubs, Rank::Two));
        assert_eq!(left, right);
    }
}

#[test]
fn easy_never_matches() {
    let state = state_with(
        vec![card(Suit::Clubs, Rank::Five); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];
    let bot = EasyBot::new(Some(3));
    assert!(!bot.should_match_own(
        &view(&state, &memory, &opponents),
        0,
        card(Suit::Clubs, Rank::Five),
        card(Suit::Hearts, Rank::Five)
    ));
}

#[test]
fn easy_keep_picks_an_occupied_slot() {
    let mut state = state_with(
        vec![card(Suit::Clubs, Rank::Five); 4],
        vec![card(Suit::Clubs, Rank::Ten); 4],
    );
    // Leave a single occupied slot so any keep must target it.
    let hand = state.hands.get_mut(BOT).unwrap();
    hand.remove_at(0).unwrap();
    hand.remove_at(1).unwrap();
    hand.remove_at(3).unwrap();

    let memory = BotMemory::new();
    let opponents = vec![OPP.to_string()];
    let bot = EasyBot::new(Some(11));
    for _ in 0..32 {
        match bot.decide_keep_or_discard(
            &view(&state, &memory, &opponents),
            card(Suit::Clubs, Rank::Two),
        ) {
            DrawDecision::Keep { slot } => assert_eq!(slot, 2),
            DrawDecision::Discard => {}
        }
    }
}
