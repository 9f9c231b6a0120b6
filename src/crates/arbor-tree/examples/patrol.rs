//! A small guard-agent tree: patrol until an intruder shows up, then
//! chase, with a cooldown on the alarm.
//!
//! Run with: `cargo run -p arbor-tree --example patrol`

use arbor_runtime::Blackboard;
use arbor_tree::{Builder, MemoryPolicy, Status};
use std::time::Duration;

fn main() -> Result<(), arbor_tree::BuildError> {
    let mut tree = Builder::new()
        .selector()
        // Chase branch: only succeeds while an intruder is visible.
        .sequence()
        .action(|bb: &Blackboard| {
            if bb.get::<bool>("intruder").unwrap_or(false) {
                Status::Success
            } else {
                Status::Failure
            }
        })
        .cooldown(Duration::from_secs(5))
        .action(|bb: &Blackboard| {
            println!("ALARM raised at waypoint {}", bb.get::<i64>("waypoint").unwrap_or(0));
            Status::Success
        })
        .action(|bb: &Blackboard| {
            println!("chasing intruder");
            bb.set("intruder", false);
            Status::Success
        })
        .end()?
        // Patrol branch: advance a waypoint each pass; briefing runs once.
        .sequence()
        .memory(MemoryPolicy::RememberSuccess)
        .action(|_bb: &Blackboard| {
            println!("briefing: route loaded");
            Status::Success
        })
        .action(|bb: &Blackboard| {
            let next = (bb.get::<i64>("waypoint").unwrap_or(0) + 1) % 4;
            bb.set("waypoint", next);
            println!("patrolling to waypoint {next}");
            Status::Success
        })
        .end()?
        .end()?
        .build()?;

    for step in 0..6 {
        if step == 3 {
            tree.blackboard().set("intruder", true);
        }
        let status = tree.tick();
        println!("tick {step}: {status}");
    }
    Ok(())
}
