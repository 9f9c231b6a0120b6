//! A media player with nested composite states and deep history: powering
//! off and back on restores the exact play mode.
//!
//! Run with: `cargo run -p arbor-hsm --example media_player`

use arbor_hsm::{CompositeState, DebugEvent, HistoryKind, MachineBuilder, MachineError};
use arbor_runtime::Blackboard;

fn flag(key: &'static str) -> impl Fn(&Blackboard) -> bool + Send + 'static {
    move |bb: &Blackboard| bb.get::<bool>(key).unwrap_or(false)
}

fn main() -> Result<(), MachineError> {
    let play_modes = MachineBuilder::new()
        .initial("normal")
        .state("normal")
        .transition_to("shuffle", flag("shuffle_pressed"))
        .state("shuffle")
        .transition_to("repeat_one", flag("repeat_pressed"))
        .state("repeat_one")
        .build()?;

    let on_inner = MachineBuilder::new()
        .initial("playing")
        .composite_state(CompositeState::new("playing", HistoryKind::None).with_inner(play_modes))
        .transition_to("paused", flag("pause_pressed"))
        .state("paused")
        .transition_to("playing", flag("play_pressed"))
        .build()?;

    let mut player = MachineBuilder::new()
        .initial("off")
        .state("off")
        .transition_to("on", flag("power"))
        .composite_state(CompositeState::new("on", HistoryKind::Deep).with_inner(on_inner))
        .transition_to("off", move |bb: &Blackboard| {
            !bb.get::<bool>("power").unwrap_or(false)
        })
        .build()?;

    player.set_debug_callback(|info| {
        if info.event == DebugEvent::TransitionTaken {
            println!("  [{}] {} -> {}", info.transition_info, info.from_state, info.to_state);
        }
    });

    let press = |player: &mut arbor_hsm::StateMachine, key: &'static str| {
        player.blackboard().set(key, true);
        player.tick().map(|_| player.blackboard().set(key, false))
    };

    player.tick()?; // enter "off"
    press(&mut player, "power")?; // off -> on -> playing -> normal
    press(&mut player, "shuffle_pressed")?; // normal -> shuffle
    println!("now: {}", player.qualified_current_state().unwrap_or_default());

    player.blackboard().set("power", false);
    player.tick()?; // on -> off, deep history saved
    println!("now: {}", player.qualified_current_state().unwrap_or_default());

    press(&mut player, "power")?; // off -> on, shuffle restored
    println!("now: {}", player.qualified_current_state().unwrap_or_default());
    Ok(())
}
