//! Surface lifecycle events queued for the render loop.
//!
//! Window callbacks never touch renderer state directly. They push events
//! into an [`EventQueue`] owned by the application, and the render loop
//! drains the queue exactly once per iteration before any frame work starts.
//! Swapchain recreation therefore always happens at a known point in the
//! loop, never from inside a windowing callback.

/// Window events that affect the presentation surface or the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The framebuffer size changed. A `(0, 0)` size means the window is
    /// minimized and no frame work should happen until it is restored.
    Resized { width: u32, height: u32 },
    /// The user asked to close the window.
    CloseRequested,
}

/// Single-threaded FIFO of [`SurfaceEvent`]s.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SurfaceEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Queue an event for the next drain.
    pub fn push(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }

    /// Drain all queued events in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = SurfaceEvent> + '_ {
        self.events.drain(..)
    }

    /// True if no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_arrival_order() {
        let mut queue = EventQueue::new();
        queue.push(SurfaceEvent::Resized {
            width: 800,
            height: 600,
        });
        queue.push(SurfaceEvent::Resized {
            width: 400,
            height: 300,
        });
        queue.push(SurfaceEvent::CloseRequested);

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(
            drained,
            vec![
                SurfaceEvent::Resized {
                    width: 800,
                    height: 600
                },
                SurfaceEvent::Resized {
                    width: 400,
                    height: 300
                },
                SurfaceEvent::CloseRequested,
            ]
        );
    }

    #[test]
    fn test_drain_empties_the_queue() {
        let mut queue = EventQueue::new();
        queue.push(SurfaceEvent::CloseRequested);
        assert!(!queue.is_empty());

        queue.drain().for_each(drop);
        assert!(queue.is_empty());
        assert_eq!(queue.drain().count(), 0);
    }

    #[test]
    fn test_new_queue_is_empty() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.drain().count(), 0);
    }
}
