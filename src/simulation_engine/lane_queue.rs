use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::clock::Clock;
use crate::data_structures::{LaneId, LightState, Vehicle};

/// Why a vehicle was turned away at the junction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("Lane {0} is not registered at this junction")]
    UnknownLane(String),

    #[error("Lane {lane} is full ({capacity} vehicles)")]
    CapacityExceeded { lane: LaneId, capacity: usize },
}

/// Priority activation thresholds with hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    /// Priority turns on at `count >= high`.
    pub high: usize,
    /// Priority turns off at `count < low`.
    pub low: usize,
}

impl Watermarks {
    /// Next value of a hysteresis flag for the given count.
    pub fn next_flag(&self, current: bool, count: usize) -> bool {
        if count >= self.high {
            true
        } else if count < self.low {
            false
        } else {
            current
        }
    }
}

#[derive(Debug)]
struct LaneBuffer {
    items: VecDeque<Vehicle>,
    priority: bool,
}

/// Bounded FIFO of vehicles waiting in one lane.
///
/// Every operation takes the lane lock for its own duration only, so any
/// number of producers can enqueue while the scheduler dequeues. Operations
/// on different lanes never contend.
pub struct LaneQueue {
    id: LaneId,
    capacity: usize,
    watermarks: Watermarks,
    buffer: Mutex<LaneBuffer>,
    light: AtomicU8,
    clock: Arc<dyn Clock>,
}

impl LaneQueue {
    pub fn new(
        id: LaneId,
        capacity: usize,
        watermarks: Watermarks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id,
            capacity,
            watermarks,
            buffer: Mutex::new(LaneBuffer {
                items: VecDeque::with_capacity(capacity),
                priority: false,
            }),
            light: AtomicU8::new(LightState::Red.to_u8()),
            clock,
        }
    }

    // A panic elsewhere must not take the lane down with it.
    fn lock(&self) -> MutexGuard<'_, LaneBuffer> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> &LaneId {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a vehicle, stamping its arrival time if unset.
    /// A full lane rejects the vehicle and is left untouched.
    pub fn enqueue(&self, mut vehicle: Vehicle) -> Result<(), EnqueueError> {
        let mut buffer = self.lock();
        if buffer.items.len() >= self.capacity {
            return Err(EnqueueError::CapacityExceeded {
                lane: self.id.clone(),
                capacity: self.capacity,
            });
        }
        if vehicle.arrival_time.is_none() {
            vehicle.arrival_time = Some(self.clock.now());
        }
        buffer.items.push_back(vehicle);
        buffer.priority = self
            .watermarks
            .next_flag(buffer.priority, buffer.items.len());
        Ok(())
    }

    /// Removes the oldest vehicle. `None` simply means the lane is empty.
    pub fn dequeue(&self) -> Option<Vehicle> {
        let mut buffer = self.lock();
        let vehicle = buffer.items.pop_front()?;
        buffer.priority = self
            .watermarks
            .next_flag(buffer.priority, buffer.items.len());
        Some(vehicle)
    }

    pub fn count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_priority(&self) -> bool {
        self.lock().priority
    }

    /// Point-in-time copy of the queue, oldest first.
    pub fn snapshot(&self) -> Vec<Vehicle> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn light_state(&self) -> LightState {
        LightState::from_u8(self.light.load(Ordering::Acquire))
    }

    pub(crate) fn set_light(&self, state: LightState) {
        self.light.store(state.to_u8(), Ordering::Release);
    }
}

impl std::fmt::Debug for LaneQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("LaneQueue")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .field("light", &self.light_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;
    use std::time::Duration;

    const MARKS: Watermarks = Watermarks { high: 10, low: 5 };

    fn lane(capacity: usize) -> (LaneQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let queue = LaneQueue::new(LaneId::from("AL1"), capacity, MARKS, clock.clone());
        (queue, clock)
    }

    #[test]
    fn dequeues_in_arrival_order() {
        let (queue, _) = lane(10);
        queue.enqueue(Vehicle::new("V1", "AL1")).unwrap();
        queue.enqueue(Vehicle::new("V2", "AL1")).unwrap();
        queue.enqueue(Vehicle::new("V3", "AL1")).unwrap();

        assert_eq!(queue.dequeue().unwrap().id, "V1");
        assert_eq!(queue.dequeue().unwrap().id, "V2");
        assert_eq!(queue.dequeue().unwrap().id, "V3");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn full_lane_rejects_without_side_effect() {
        let (queue, _) = lane(2);
        queue.enqueue(Vehicle::new("V1", "AL1")).unwrap();
        queue.enqueue(Vehicle::new("V2", "AL1")).unwrap();

        let err = queue.enqueue(Vehicle::new("V3", "AL1")).unwrap_err();
        assert_eq!(
            err,
            EnqueueError::CapacityExceeded {
                lane: LaneId::from("AL1"),
                capacity: 2
            }
        );
        assert_eq!(queue.count(), 2);
        let ids: Vec<_> = queue.snapshot().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["V1", "V2"]);
    }

    #[test]
    fn stamps_arrival_time_only_when_missing() {
        let (queue, clock) = lane(10);
        clock.advance(Duration::from_secs(7));
        queue.enqueue(Vehicle::new("V1", "AL1")).unwrap();

        let mut early = Vehicle::new("V2", "AL1");
        early.arrival_time = Some(Duration::from_secs(2));
        queue.enqueue(early).unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot[0].arrival_time, Some(Duration::from_secs(7)));
        assert_eq!(snapshot[1].arrival_time, Some(Duration::from_secs(2)));
    }

    #[test]
    fn priority_flag_has_hysteresis() {
        let (queue, _) = lane(100);
        for i in 0..9 {
            queue.enqueue(Vehicle::new(format!("V{i}"), "AL1")).unwrap();
        }
        assert!(!queue.is_priority());

        queue.enqueue(Vehicle::new("V9", "AL1")).unwrap();
        assert_eq!(queue.count(), 10);
        assert!(queue.is_priority());

        while queue.count() > 6 {
            queue.dequeue();
        }
        assert!(queue.is_priority());
        queue.dequeue();
        assert_eq!(queue.count(), 5);
        assert!(queue.is_priority());

        queue.dequeue();
        assert_eq!(queue.count(), 4);
        assert!(!queue.is_priority());

        // Climbing back between the marks does not re-arm it.
        for i in 0..5 {
            queue.enqueue(Vehicle::new(format!("W{i}"), "AL1")).unwrap();
        }
        assert_eq!(queue.count(), 9);
        assert!(!queue.is_priority());
    }

    #[test]
    fn light_starts_red() {
        let (queue, _) = lane(1);
        assert_eq!(queue.light_state(), LightState::Red);
        queue.set_light(LightState::Green);
        assert_eq!(queue.light_state(), LightState::Green);
    }

    #[test]
    fn concurrent_producers_never_overfill() {
        let (queue, _) = lane(50);
        let queue = Arc::new(queue);
        let handles: Vec<_> = (0..8)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut accepted = 0;
                    for i in 0..20 {
                        let vehicle = Vehicle::new(format!("P{producer}-{i}"), "AL1");
                        if queue.enqueue(vehicle).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 50);
        assert_eq!(queue.count(), 50);
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let (queue, _) = lane(1_000);
        let queue = Arc::new(queue);
        let handles: Vec<_> = (0..4)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue
                            .enqueue(Vehicle::new(format!("{producer}:{i}"), "AL1"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut last_seen = [None::<usize>; 4];
        while let Some(vehicle) = queue.dequeue() {
            let (producer, seq) = vehicle.id.split_once(':').unwrap();
            let producer: usize = producer.parse().unwrap();
            let seq: usize = seq.parse().unwrap();
            if let Some(previous) = last_seen[producer] {
                assert!(seq > previous);
            }
            last_seen[producer] = Some(seq);
        }
    }
}
