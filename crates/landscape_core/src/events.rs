use std::sync::mpsc;

use tracing::debug;

/// Producer half of a frame-drained event queue.
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

/// Consumer half. Owned by the frame loop, which drains it once per frame.
pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }

    /// Sends an event, dropping it if the receiver is gone.
    /// Returns whether the event was queued.
    pub fn emit(&self, event: T) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("event receiver dropped; discarding event");
                false
            }
        }
    }
}

impl<T> EventReceiver<T> {
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    /// Yields every event queued so far without blocking.
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { rx: &self.rx }
    }
}

pub struct Drain<'a, T> {
    rx: &'a mpsc::Receiver<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Routes events to a handler. Implemented by whatever owns the state the
/// events mutate.
pub trait EventHandler<T> {
    fn handle(&mut self, event: T);
}

/// Drains `receiver` into `handler`, returning how many events were applied.
pub fn dispatch<T, H>(receiver: &EventReceiver<T>, handler: &mut H) -> usize
where
    H: EventHandler<T> + ?Sized,
{
    let mut applied = 0;
    for event in receiver.drain() {
        handler.handle(event);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::{channel, dispatch, EventHandler};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<u32>,
    }

    impl EventHandler<u32> for Recorder {
        fn handle(&mut self, event: u32) {
            self.seen.push(event);
        }
    }

    #[test]
    fn drain_returns_queued_events_in_order_without_blocking() {
        let (tx, rx) = channel();
        tx.emit(1);
        tx.emit(2);
        tx.clone().emit(3);

        let drained: Vec<u32> = rx.drain().collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert_eq!(rx.drain().count(), 0);
    }

    #[test]
    fn dispatch_applies_each_event_once() {
        let (tx, rx) = channel();
        let mut recorder = Recorder::default();
        tx.emit(7);
        tx.emit(9);

        assert_eq!(dispatch(&rx, &mut recorder), 2);
        assert_eq!(recorder.seen, vec![7, 9]);
        assert_eq!(dispatch(&rx, &mut recorder), 0);
    }

    #[test]
    fn emit_reports_dropped_receiver() {
        let (tx, rx) = channel::<u32>();
        drop(rx);
        assert!(!tx.emit(5));
    }
}
