//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::sync::Arc;
use std::time::Duration;
use visflow_rs::{
    pipeline::TaskQueue,
    scene::{PipelineSceneNode, SceneContext},
};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// A task queue owned by the calling test thread and a node bound to it
pub fn create_test_node() -> (TaskQueue, PipelineSceneNode) {
    let queue = TaskQueue::new();
    let node = PipelineSceneNode::new(SceneContext::new(queue.executor()));
    (queue, node)
}

/// Like [`create_test_node`], with an explicit engine configuration
pub fn create_test_node_with(config: visflow_rs::EngineConfig) -> (TaskQueue, PipelineSceneNode) {
    let queue = TaskQueue::new();
    let context = SceneContext::with_config(queue.executor(), Arc::new(config));
    (queue, PipelineSceneNode::new(context))
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
