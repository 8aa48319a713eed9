// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end behaviour of the toggle controller against a recording canvas.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use layer_toggle::{
    ActionError, ActionRegistry, CanvasError, Category, ControllerConfig, KeyState, LayerAction,
    LayerKey, MapCanvas, ToggleController, ToggleOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Add(String),
    Remove(String),
}

#[derive(Debug, Default)]
struct RecordingCanvas {
    calls: Mutex<Vec<Call>>,
    attached: Mutex<Vec<String>>,
    refuse_adds: bool,
    refuse_removes: bool,
}

impl RecordingCanvas {
    fn refusing() -> Self {
        Self {
            refuse_adds: true,
            ..Default::default()
        }
    }

    fn sticky() -> Self {
        Self {
            refuse_removes: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn attached(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    fn add_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Add(_)))
            .count()
    }
}

impl MapCanvas for RecordingCanvas {
    type Layer = String;

    fn add_layer(&self, layer: &String) -> Result<(), CanvasError> {
        self.calls.lock().unwrap().push(Call::Add(layer.clone()));
        if self.refuse_adds {
            return Err(CanvasError::Rejected("read-only map".to_string()));
        }
        let mut attached = self.attached.lock().unwrap();
        if attached.contains(layer) {
            return Err(CanvasError::AlreadyAttached);
        }
        attached.push(layer.clone());
        Ok(())
    }

    fn remove_layer(&self, layer: &String) -> Result<(), CanvasError> {
        self.calls.lock().unwrap().push(Call::Remove(layer.clone()));
        if self.refuse_removes {
            return Err(CanvasError::Rejected("layer is locked".to_string()));
        }
        let mut attached = self.attached.lock().unwrap();
        let before = attached.len();
        attached.retain(|l| l != layer);
        if attached.len() == before {
            return Err(CanvasError::NotAttached);
        }
        Ok(())
    }
}

/// Action that resolves to `name` after `delay`, counting its invocations.
fn delayed(name: &'static str, delay: Duration, calls: &Arc<AtomicUsize>) -> LayerAction<String> {
    let calls = Arc::clone(calls);
    LayerAction::new(name, "tint", move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(delay).await;
            Ok(Some(name.to_string()))
        }
    })
}

fn ready(title: &str, layer: &'static str) -> LayerAction<String> {
    LayerAction::ready(title, "cloud", move || Ok(Some(layer.to_string())))
}

fn rejecting() -> LayerAction<String> {
    LayerAction::new("CAP", "triangle", || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(ActionError::Fetch("HTTP error: 500 Internal Server Error".to_string()))
    })
}

fn weather_2() -> LayerKey {
    "weather-2".parse().unwrap()
}

/// Registry with `weather-2` resolving to `L1` after 50ms and `traffic-0`
/// always failing.
fn scenario_controller(calls: &Arc<AtomicUsize>) -> ToggleController<RecordingCanvas> {
    let registry = ActionRegistry::builder()
        .with(Category::Weather, ready("Daily rainfall", "rain"))
        .with(Category::Weather, ready("Radar echo", "radar"))
        .with(Category::Weather, delayed("L1", Duration::from_millis(50), calls))
        .with(Category::Traffic, rejecting())
        .with(Category::Traffic, LayerAction::unimplemented("Road breaks", "road"))
        .build();
    ToggleController::new(registry, RecordingCanvas::default())
}

#[tokio::test(start_paused = true)]
async fn scenario_a_async_action_attaches_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    let pending = controller.spawn_toggle(key);
    assert!(!controller.is_active(&key));
    assert_eq!(controller.state(&key), KeyState::Pending);
    assert!(controller.pending_for(&key).is_some());

    assert_eq!(pending.await.unwrap(), ToggleOutcome::Attached);
    assert!(controller.is_active(&key));
    assert_eq!(controller.pending_for(&key), None);
    assert_eq!(controller.canvas().calls(), vec![Call::Add("L1".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_second_toggle_detaches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Attached);
    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Detached);

    assert!(!controller.is_active(&key));
    assert_eq!(
        controller.canvas().calls(),
        vec![Call::Add("L1".to_string()), Call::Remove("L1".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_c_rejecting_action_never_attaches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = Category::Traffic.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Failed);
    assert!(!controller.is_active(&key));
    assert_eq!(controller.state(&key), KeyState::Idle);
    assert_eq!(controller.canvas().add_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn toggle_pair_returns_to_idle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);

    for key in [Category::Weather.key(0), Category::Weather.key(1), weather_2()] {
        controller.toggle(&key).await;
        controller.toggle(&key).await;
        assert_eq!(controller.state(&key), KeyState::Idle);
    }

    assert!(controller.active_keys().is_empty());
    assert!(controller.pending_keys().is_empty());
    assert!(controller.canvas().attached().is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggle_while_pending_is_ignored() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    let first = controller.spawn_toggle(key);
    assert_eq!(controller.toggle(&key).await, ToggleOutcome::IgnoredPending);

    assert_eq!(first.await.unwrap(), ToggleOutcome::Attached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.canvas().add_count(), 1);
    assert!(controller.is_active(&key));
}

#[tokio::test(start_paused = true)]
async fn burst_of_toggles_attaches_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    let handles: Vec<_> = (0..5).map(|_| controller.spawn_toggle(key)).collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(outcomes[0], ToggleOutcome::Attached);
    assert!(outcomes[1..].iter().all(|o| *o == ToggleOutcome::IgnoredPending));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.canvas().calls(), vec![Call::Add("L1".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn no_add_without_intervening_remove() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    for _ in 0..3 {
        let first = controller.spawn_toggle(key);
        let second = controller.spawn_toggle(key);
        first.await.unwrap();
        second.await.unwrap();
        controller.toggle(&key).await;
    }

    let mut attached = false;
    for call in controller.canvas().calls() {
        match call {
            Call::Add(_) => {
                assert!(!attached, "two adds without a remove");
                attached = true;
            }
            Call::Remove(_) => attached = false,
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn null_action_leaves_key_idle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = Category::Traffic.key(1);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::NoLayer);
    assert!(!controller.is_active(&key));
    assert_eq!(controller.canvas().add_count(), 0);
}

#[tokio::test]
async fn unknown_key_is_a_no_op() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);

    for key in [Category::MathModel.key(0), Category::Weather.key(9)] {
        assert_eq!(controller.toggle(&key).await, ToggleOutcome::UnknownKey);
        assert_eq!(controller.state(&key), KeyState::Idle);
    }
    assert!(controller.canvas().calls().is_empty());
}

#[tokio::test]
async fn panicking_action_counts_as_failure() {
    let registry = ActionRegistry::builder()
        .with(
            Category::RainfallAnalysis,
            LayerAction::<String>::ready("TIN", "polygon", || panic!("triangulation exploded")),
        )
        .build();
    let controller = ToggleController::new(registry, RecordingCanvas::default());
    let key = Category::RainfallAnalysis.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Failed);
    assert_eq!(controller.state(&key), KeyState::Idle);
    assert_eq!(controller.canvas().add_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_action_times_out() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = ActionRegistry::builder()
        .with(Category::Weather, delayed("slow", Duration::from_secs(60), &calls))
        .build();
    let controller = ToggleController::with_config(
        registry,
        RecordingCanvas::default(),
        ControllerConfig {
            action_timeout: Some(Duration::from_secs(5)),
        },
    );
    let key = Category::Weather.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Failed);
    assert_eq!(controller.state(&key), KeyState::Idle);
    assert_eq!(controller.canvas().add_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failure_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let registry = ActionRegistry::builder()
        .with(
            Category::Traffic,
            LayerAction::new("CAP", "triangle", move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(ActionError::Fetch("connection reset".to_string()))
                    } else {
                        Ok(Some(format!("cap-{attempt}")))
                    }
                }
            }),
        )
        .build();
    let controller = ToggleController::new(registry, RecordingCanvas::default());
    let key = Category::Traffic.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Failed);
    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Attached);
    assert_eq!(controller.canvas().attached(), vec!["cap-1".to_string()]);
}

#[tokio::test]
async fn canvas_refusal_leaves_key_idle() {
    let registry = ActionRegistry::builder()
        .with(Category::Weather, ready("Radar", "radar"))
        .build();
    let controller = ToggleController::new(registry, RecordingCanvas::refusing());
    let key = Category::Weather.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Failed);
    assert!(!controller.is_active(&key));
    assert!(controller.active_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keys_resolve_independently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = ActionRegistry::builder()
        .with(Category::Weather, delayed("slow", Duration::from_millis(200), &calls))
        .with(Category::Weather, delayed("fast", Duration::from_millis(10), &calls))
        .build();
    let controller = ToggleController::new(registry, RecordingCanvas::default());
    let slow = Category::Weather.key(0);
    let fast = Category::Weather.key(1);

    let slow_handle = controller.spawn_toggle(slow);
    assert_eq!(controller.toggle(&fast).await, ToggleOutcome::Attached);
    assert!(controller.is_active(&fast));
    assert!(controller.is_pending(&slow));

    assert_eq!(slow_handle.await.unwrap(), ToggleOutcome::Attached);
    assert_eq!(controller.active_keys(), vec![slow, fast]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_detaches_and_cancels() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let radar = Category::Weather.key(1);
    let stations = weather_2();

    assert_eq!(controller.toggle(&radar).await, ToggleOutcome::Attached);
    let pending = controller.spawn_toggle(stations);

    assert_eq!(controller.shutdown(), 1);
    assert!(controller.is_shut_down());
    assert_eq!(pending.await.unwrap(), ToggleOutcome::Cancelled);

    assert!(controller.canvas().attached().is_empty());
    assert_eq!(controller.state(&stations), KeyState::Idle);
    assert_eq!(controller.toggle(&radar).await, ToggleOutcome::Cancelled);
    assert_eq!(controller.canvas().add_count(), 1);
}

#[tokio::test]
async fn detach_completes_when_canvas_refuses_removal() {
    let registry = ActionRegistry::builder()
        .with(Category::Weather, ready("Radar", "radar"))
        .build();
    let controller = ToggleController::new(registry, RecordingCanvas::sticky());
    let key = Category::Weather.key(0);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Attached);
    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Detached);

    assert_eq!(controller.state(&key), KeyState::Idle);
    assert!(controller.active_keys().is_empty());
    assert_eq!(
        controller.canvas().calls(),
        vec![Call::Add("radar".to_string()), Call::Remove("radar".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn abandoned_toggle_still_settles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = scenario_controller(&calls);
    let key = weather_2();

    let waited = tokio::time::timeout(Duration::from_millis(10), controller.toggle(&key)).await;
    assert!(waited.is_err());
    assert_eq!(controller.state(&key), KeyState::Pending);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.state(&key), KeyState::Active);
    assert_eq!(controller.canvas().attached(), vec!["L1".to_string()]);

    assert_eq!(controller.toggle(&key).await, ToggleOutcome::Detached);
    assert_eq!(controller.state(&key), KeyState::Idle);
}
