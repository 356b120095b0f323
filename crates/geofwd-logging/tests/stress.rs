//! Stress tests for node context handling
//!
//! Many threads switch node context rapidly; each must only ever observe
//! its own nodes.

use std::sync::{Arc, Barrier};
use std::thread;

use geofwd_core::NodeId;
use geofwd_logging::{node_span, NodeContextGuard};

#[test]
fn test_concurrent_node_contexts() {
    const NUM_THREADS: u32 = 32;
    const ITERATIONS: u32 = 500;

    let barrier = Arc::new(Barrier::new(NUM_THREADS as usize));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|thread_id| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITERATIONS {
                    let node = NodeId(thread_id * ITERATIONS + i);
                    let _guard = NodeContextGuard::new(node);
                    let _span = node_span().entered();
                    tracing::debug!(iteration = i, "Working");
                    assert_eq!(NodeContextGuard::current_node(), Some(node));
                }
                assert!(NodeContextGuard::current().is_none());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_deeply_nested_contexts_unwind() {
    let mut guards = Vec::new();
    for id in 0..1000 {
        guards.push(NodeContextGuard::new(NodeId(id)));
    }
    assert_eq!(NodeContextGuard::current_node(), Some(NodeId(999)));

    while let Some(guard) = guards.pop() {
        drop(guard);
        let expected = guards.len().checked_sub(1).map(|id| NodeId(id as u32));
        assert_eq!(NodeContextGuard::current_node(), expected);
    }
}
