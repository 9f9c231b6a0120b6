//! Graph reachability with the semi-naive fixpoint, plus an aggregate and
//! a secondary index over the result.
//!
//! Run with: `cargo run -p arbor-logic --example reachability`

use arbor_logic::{aggregate, join_into, ExecutionContext, Iteration, SecondaryIndex};

fn main() {
    let edges: Vec<(u32, u32)> = vec![(1, 2), (2, 3), (3, 4), (2, 5), (5, 6)];
    let ctx = ExecutionContext::new();

    let mut iteration = Iteration::new();
    let edge = iteration.variable();
    let reachable = iteration.variable();
    edge.insert_slice(&edges);
    reachable.insert_slice(&edges);

    while iteration.changed() {
        // reachable(a, c) :- reachable(a, b), edge(b, c)
        join_into(
            &reachable,
            &edge,
            &reachable,
            |&(_, b)| b,
            |&(b, _)| b,
            |&(a, _), &(_, c)| (a, c),
            &ctx,
        );
    }

    let closure = reachable.complete();
    println!(
        "{} reachable pairs after {} rounds",
        closure.len(),
        iteration.current_iteration()
    );

    let out_degree = aggregate(
        closure.elements(),
        |&(a, _)| a,
        |_| 1_u64,
        |a, b| a + b,
        0,
        &ctx,
    );
    for (node, reachable_count) in &out_degree {
        println!("node {node} reaches {reachable_count} nodes");
    }

    let by_target = SecondaryIndex::build(&closure, |&(_, c)| c);
    let sources: Vec<u32> = by_target.get(&6).iter().map(|&(a, _)| a).collect();
    println!("node 6 is reachable from {sources:?}");
}
