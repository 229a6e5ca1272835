//! Reputation tracker scenarios: three scales, spillover, brackets, and
//! derived modifiers.

use faction_sim::EntityStore;
use faction_sim::testutil::{assert_approx, assert_invariants};
use faction_sim::{ReputationBracket, Scenario, SignalKind};

#[test]
fn three_scales_are_independent() {
    let mut s = Scenario::at_year(100);
    let f = s.add_faction("Ravens");
    let mut engine = s.engine(42);

    engine
        .modify_character_reputation(f, 9, -60.0, "betrayal", None, true)
        .unwrap();
    engine
        .modify_regional_reputation(f, 2, 30.0, "charity", None)
        .unwrap();

    let faction = engine.store().faction(f).unwrap();
    assert_eq!(faction.state.character_reputations[&9], -60.0);
    assert_eq!(faction.state.regional_reputations[&2], 30.0);
    // Only the regional change spilled into the global score.
    assert_approx(faction.reputation, 6.0, 1e-9, "global = 30 * 0.2");
    assert_invariants(engine.store());
}

#[test]
fn repeated_changes_accumulate_and_clamp() {
    let mut s = Scenario::at_year(100);
    let f = s.add_faction("Ravens");
    let mut engine = s.engine(42);

    for _ in 0..30 {
        engine
            .modify_regional_reputation(f, 4, 10.0, "tribute", None)
            .unwrap();
    }
    let faction = engine.store().faction(f).unwrap();
    assert_eq!(faction.state.regional_reputations[&4], 100.0);
    // Spillover keeps feeding the global score until it clamps too.
    assert_approx(faction.reputation, 60.0, 1e-9, "30 * 10 * 0.2");
    assert_invariants(engine.store());
}

#[test]
fn bracket_transitions_emit_signals() {
    let (signals, sink) = faction_sim::engine::shared_signals();
    let mut s = Scenario::at_year(100);
    let f = s.add_faction("Ravens");
    let mut engine = s.engine(42).with_sink(sink);

    engine
        .modify_global_reputation(f, 95.0, "saved the realm", None)
        .unwrap();
    let signals = signals.borrow();
    assert!(signals.iter().any(|s| matches!(
        s.kind,
        SignalKind::ReputationBracketChanged {
            from: ReputationBracket::Neutral,
            to: ReputationBracket::Revered,
            ..
        }
    )));
}

#[test]
fn modifiers_scale_with_reputation() {
    let mut s = Scenario::at_year(100);
    let good = s.faction("Saints").reputation(80.0).id();
    let bad = s.faction("Butchers").reputation(-80.0).id();
    let engine = s.engine(42);

    let good_mods = engine.compute_reputation_modifiers(good).unwrap();
    let bad_mods = engine.compute_reputation_modifiers(bad).unwrap();

    // Better reputation buys cheaper trade, recruiting, and favors, and
    // more leverage and information.
    assert!(good_mods.trade_price < bad_mods.trade_price);
    assert!(good_mods.recruiting_cost < bad_mods.recruiting_cost);
    assert!(good_mods.favor_cost < bad_mods.favor_cost);
    assert!(good_mods.diplomatic_leverage > bad_mods.diplomatic_leverage);
    assert!(good_mods.information_access > bad_mods.information_access);
    assert!(good_mods.quest_reward > bad_mods.quest_reward);

    // All within their documented clamps.
    for mods in [good_mods, bad_mods] {
        for v in [
            mods.trade_price,
            mods.quest_reward,
            mods.recruiting_cost,
            mods.favor_cost,
        ] {
            assert!((0.1..=2.0).contains(&v), "modifier out of clamp: {v}");
        }
        for v in [mods.diplomatic_leverage, mods.information_access] {
            assert!((0.1..=3.0).contains(&v), "wide modifier out of clamp: {v}");
        }
    }
}

#[test]
fn membership_nudge_follows_character_reputation() {
    let mut s = Scenario::at_year(100);
    let f = s.add_faction("Ravens");
    let member = s.add_member(f, 12, 0.0);
    let mut engine = s.engine(42);

    engine
        .modify_character_reputation(f, 12, 60.0, "won the tourney", None, true)
        .unwrap();
    engine
        .modify_character_reputation(f, 12, -20.0, "tavern brawl", None, true)
        .unwrap();

    let membership = engine.store().membership(member).unwrap();
    // 0 + 60*0.5 - 20*0.5
    assert_approx(membership.reputation, 20.0, 1e-9, "membership standing");
    assert_eq!(
        engine.store().faction(f).unwrap().state.character_reputations[&12],
        40.0
    );
}
