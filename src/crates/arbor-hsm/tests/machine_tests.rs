//! End-to-end machine scenarios: timed transitions, composite states with
//! history and regions, and stochastic transition selection.

use arbor_hsm::{
    CompositeState, DebugEvent, HistoryKind, MachineBuilder, MachineError, StateMachine,
};
use arbor_runtime::{Blackboard, ManualClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn flag(key: &'static str) -> impl Fn(&Blackboard) -> bool + Send + 'static {
    move |bb: &Blackboard| bb.get::<bool>(key).unwrap_or(false)
}

#[test]
fn timed_transition_fires_after_its_window() {
    let clock = ManualClock::new();
    let mut machine = MachineBuilder::new()
        .clock(clock.clone())
        .initial("waiting")
        .state("waiting")
        .transition_to_after("done", Duration::from_millis(100))
        .state("done")
        .build()
        .unwrap();

    machine.tick().unwrap(); // enter waiting, timer armed
    assert_eq!(machine.current_state_name(), Some("waiting"));

    clock.advance(Duration::from_millis(50));
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("waiting"));

    clock.advance(Duration::from_millis(60)); // 110ms total
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("done"));
}

#[test]
fn timed_transition_timer_resets_on_reentry() {
    let clock = ManualClock::new();
    let mut machine = MachineBuilder::new()
        .clock(clock.clone())
        .initial("waiting")
        .state("waiting")
        .transition_to_after("done", Duration::from_millis(100))
        .transition_to("restart", flag("restart"))
        .with_priority(5)
        .state("restart")
        .transition_to("waiting", |_: &Blackboard| true)
        .state("done")
        .build()
        .unwrap();

    machine.tick().unwrap(); // enter waiting
    clock.advance(Duration::from_millis(80));
    machine.blackboard().set("restart", true);
    machine.tick().unwrap(); // waiting -> restart (higher priority)
    machine.blackboard().set("restart", false);
    machine.tick().unwrap(); // restart -> waiting, fresh timer

    clock.advance(Duration::from_millis(50));
    machine.tick().unwrap();
    // Only 50ms of the new window elapsed; the 80ms of the old window is gone.
    assert_eq!(machine.current_state_name(), Some("waiting"));
    clock.advance(Duration::from_millis(60));
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("done"));
}

fn media_player() -> StateMachine {
    let play_modes = MachineBuilder::new()
        .initial("NORMAL_PLAY")
        .state("NORMAL_PLAY")
        .transition_to("SHUFFLE", flag("to_shuffle"))
        .state("SHUFFLE")
        .state("REPEAT_ONE")
        .build()
        .unwrap();

    let on_inner = MachineBuilder::new()
        .initial("PLAYING")
        .composite_state(CompositeState::new("PLAYING", HistoryKind::None).with_inner(play_modes))
        .build()
        .unwrap();

    MachineBuilder::new()
        .initial("OFF")
        .state("OFF")
        .transition_to("ON", flag("power"))
        .composite_state(CompositeState::new("ON", HistoryKind::Deep).with_inner(on_inner))
        .transition_to("OFF", move |bb: &Blackboard| {
            !bb.get::<bool>("power").unwrap_or(false)
        })
        .build()
        .unwrap()
}

#[test]
fn deep_history_restores_the_nested_substate() {
    let mut machine = media_player();

    machine.tick().unwrap(); // enter OFF
    machine.blackboard().set("power", true);
    machine.tick().unwrap(); // OFF -> ON -> PLAYING -> NORMAL_PLAY
    assert_eq!(
        machine.qualified_current_state().as_deref(),
        Some("ON.PLAYING.NORMAL_PLAY")
    );

    machine.blackboard().set("to_shuffle", true);
    machine.tick().unwrap(); // play mode advances to SHUFFLE
    machine.blackboard().set("to_shuffle", false);
    assert_eq!(
        machine.qualified_current_state().as_deref(),
        Some("ON.PLAYING.SHUFFLE")
    );

    machine.blackboard().set("power", false);
    machine.tick().unwrap(); // ON -> OFF, deep history recorded
    assert_eq!(machine.current_state_name(), Some("OFF"));

    machine.blackboard().set("power", true);
    machine.tick().unwrap(); // OFF -> ON, deep history restored
    assert_eq!(
        machine.qualified_current_state().as_deref(),
        Some("ON.PLAYING.SHUFFLE")
    );
    assert_eq!(
        machine.current_substate("ON").unwrap().as_deref(),
        Some("PLAYING")
    );
}

#[test]
fn shallow_history_restores_one_level_only() {
    let inner = MachineBuilder::new()
        .initial("a")
        .state("a")
        .transition_to("b", flag("advance"))
        .state("b")
        .build()
        .unwrap();

    let mut machine = MachineBuilder::new()
        .initial("outside")
        .state("outside")
        .transition_to("box", flag("inside"))
        .composite_state(CompositeState::new("box", HistoryKind::Shallow).with_inner(inner))
        .transition_to("outside", move |bb: &Blackboard| {
            !bb.get::<bool>("inside").unwrap_or(false)
        })
        .build()
        .unwrap();

    machine.tick().unwrap();
    machine.blackboard().set("inside", true);
    machine.tick().unwrap();
    machine.blackboard().set("advance", true);
    machine.tick().unwrap();
    machine.blackboard().set("advance", false);
    assert_eq!(
        machine.current_substate("box").unwrap().as_deref(),
        Some("b")
    );

    machine.blackboard().set("inside", false);
    machine.tick().unwrap();
    machine.blackboard().set("inside", true);
    machine.tick().unwrap();
    assert_eq!(
        machine.current_substate("box").unwrap().as_deref(),
        Some("b")
    );
}

#[test]
fn history_none_always_restarts_from_initial() {
    let inner = MachineBuilder::new()
        .initial("a")
        .state("a")
        .transition_to("b", flag("advance"))
        .state("b")
        .build()
        .unwrap();

    let mut machine = MachineBuilder::new()
        .initial("outside")
        .state("outside")
        .transition_to("box", flag("inside"))
        .composite_state(CompositeState::new("box", HistoryKind::None).with_inner(inner))
        .transition_to("outside", move |bb: &Blackboard| {
            !bb.get::<bool>("inside").unwrap_or(false)
        })
        .build()
        .unwrap();

    machine.tick().unwrap();
    machine.blackboard().set("inside", true);
    machine.tick().unwrap();
    machine.blackboard().set("advance", true);
    machine.tick().unwrap();
    machine.blackboard().set("advance", false);
    machine.blackboard().set("inside", false);
    machine.tick().unwrap();
    machine.blackboard().set("inside", true);
    machine.tick().unwrap();
    assert_eq!(
        machine.current_substate("box").unwrap().as_deref(),
        Some("a")
    );
}

#[test]
fn regions_tick_independently_with_private_blackboards() {
    // Region 1 advances on its own private tick counter; region 2 never
    // moves. Neither counter leaks into the parent blackboard.
    let region_one = MachineBuilder::new()
        .initial("counting")
        .state("counting")
        .on_update(|bb| {
            bb.set("steps", bb.get::<i64>("steps").unwrap_or(0) + 1);
        })
        .transition_to("done", |bb: &Blackboard| {
            bb.get::<i64>("steps").unwrap_or(0) >= 2
        })
        .state("done")
        .build()
        .unwrap();

    let region_two = MachineBuilder::new()
        .initial("steady")
        .state("steady")
        .build()
        .unwrap();

    let mut machine = MachineBuilder::new()
        .initial("active")
        .composite_state(
            CompositeState::new("active", HistoryKind::None)
                .with_region("movement", region_one)
                .with_region("audio", region_two),
        )
        .build()
        .unwrap();

    machine.tick().unwrap(); // enter composite
    for _ in 0..4 {
        machine.tick().unwrap();
    }

    assert_eq!(
        machine.region_names("active").unwrap(),
        vec!["movement".to_string(), "audio".to_string()]
    );
    assert_eq!(
        machine.region_current_state("active", "movement").unwrap().as_deref(),
        Some("done")
    );
    assert_eq!(
        machine.region_current_state("active", "audio").unwrap().as_deref(),
        Some("steady")
    );
    // The region's counter lives in its private blackboard.
    assert_eq!(machine.blackboard().get::<i64>("steps"), None);
    assert!(matches!(
        machine.region_current_state("active", "nope"),
        Err(MachineError::UnknownRegion(_))
    ));
}

#[test]
fn entry_points_force_a_named_substate() {
    let inner = MachineBuilder::new()
        .initial("lobby")
        .state("lobby")
        .state("vault")
        .build()
        .unwrap();

    let mut machine = MachineBuilder::new()
        .initial("outside")
        .state("outside")
        .composite_state(
            CompositeState::new("bank", HistoryKind::None)
                .with_inner(inner)
                .with_entry_point("service_door", "vault"),
        )
        .build()
        .unwrap();

    machine.tick().unwrap(); // enter outside
    machine.enter_via("bank", "service_door").unwrap();
    assert_eq!(machine.current_state_name(), Some("bank"));
    assert_eq!(
        machine.current_substate("bank").unwrap().as_deref(),
        Some("vault")
    );

    assert!(matches!(
        machine.enter_via("bank", "wrong_door"),
        Err(MachineError::UnknownEntryPoint(_))
    ));
}

#[test]
fn weighted_transitions_distribute_by_weight() {
    let mut heavy = 0;
    let trials = 400;
    for seed in 0..trials {
        let mut machine = MachineBuilder::new()
            .rng_seed(seed)
            .initial("start")
            .state("start")
            .transition_always("heavy")
            .with_weight(7.0)
            .transition_always("light")
            .with_weight(3.0)
            .build()
            .unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();
        if machine.current_state_name() == Some("heavy") {
            heavy += 1;
        }
    }
    // Expect roughly 70%; allow generous statistical slack.
    assert!(heavy > 240, "heavy chosen only {heavy}/{trials}");
    assert!(heavy < 330, "heavy chosen {heavy}/{trials}");
}

#[test]
fn low_probability_transitions_usually_hold() {
    let mut stayed = 0;
    let trials = 200;
    for seed in 0..trials {
        let mut machine = MachineBuilder::new()
            .rng_seed(seed)
            .initial("start")
            .state("start")
            .transition_always("end")
            .with_probability(0.1)
            .state("end")
            .build()
            .unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();
        if machine.current_state_name() == Some("start") {
            stayed += 1;
        }
    }
    assert!(stayed > 140, "stayed only {stayed}/{trials}");
}

#[test]
fn probability_gates_an_otherwise_true_condition() {
    // Condition false: never fires, whatever the probability.
    for seed in 0..50 {
        let mut machine = MachineBuilder::new()
            .rng_seed(seed)
            .initial("idle")
            .state("idle")
            .transition_to("active", flag("ready"))
            .with_probability(0.9)
            .state("active")
            .build()
            .unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("idle"));
    }
}

#[test]
fn plain_conditionals_beat_the_stochastic_pool() {
    for seed in 0..50 {
        let mut machine = MachineBuilder::new()
            .rng_seed(seed)
            .initial("start")
            .state("start")
            .transition_always("gamble")
            .with_weight(1000.0)
            .transition_to("sure", |_: &Blackboard| true)
            .state("sure")
            .state("gamble")
            .build()
            .unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("sure"));
    }
}

#[test]
fn rejected_initial_guard_leaves_the_machine_stateless() {
    let mut machine = MachineBuilder::new()
        .initial("gated")
        .state("gated")
        .on_guard(flag("open"))
        .build()
        .unwrap();

    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), None);

    machine.blackboard().set("open", true);
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("gated"));
}

#[test]
fn composite_guard_consults_the_active_substate() {
    let inner = MachineBuilder::new()
        .initial("sub")
        .state("sub")
        .build()
        .unwrap();

    let mut machine = MachineBuilder::new()
        .initial("outside")
        .state("outside")
        .transition_to("room", flag("enter_room"))
        .composite_state(
            CompositeState::new("room", HistoryKind::None)
                .with_inner(inner)
                .on_guard(flag("door_unlocked")),
        )
        .build()
        .unwrap();

    machine.tick().unwrap();
    machine.blackboard().set("enter_room", true);
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("outside"));

    machine.blackboard().set("door_unlocked", true);
    machine.tick().unwrap();
    assert_eq!(machine.current_state_name(), Some("room"));
}

#[test]
fn debug_events_cover_the_composite_lifecycle() {
    let updates = Arc::new(AtomicUsize::new(0));
    let probe = Arc::clone(&updates);

    let mut machine = media_player();
    machine.set_debug_callback(move |info| {
        if info.event == DebugEvent::StateUpdated {
            probe.fetch_add(1, Ordering::SeqCst);
        }
    });

    machine.tick().unwrap();
    machine.tick().unwrap();
    assert!(updates.load(Ordering::SeqCst) >= 1);
}

#[test]
fn transition_history_records_nested_activity_reasons() {
    let clock = ManualClock::new();
    let mut machine = MachineBuilder::new()
        .clock(clock.clone())
        .initial("a")
        .state("a")
        .transition_to_after("b", Duration::from_millis(10))
        .state("b")
        .build()
        .unwrap();
    machine.enable_transition_history(true);

    machine.tick().unwrap();
    clock.advance(Duration::from_millis(20));
    machine.tick().unwrap();

    let records = machine.transition_history();
    assert_eq!(records.back().map(|r| r.reason.as_str()), Some("timed"));
}
