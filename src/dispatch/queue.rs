//=====================================================
// File: dispatch/queue.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Blocking FIFO queues for request/response traffic
// Objective: Unbounded queue with blocking take, interrupt, close, and a
//            timed take for callers that must not wait forever
//=====================================================

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Why a blocking `take` returned without an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error("interrupted while waiting")]
    Interrupted,
    #[error("queue closed")]
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    interrupted: bool,
    closed: bool,
}

pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                interrupted: false,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn put(&self, item: T) {
        self.state.lock().items.push_back(item);
        self.ready.notify_one();
    }

    /// Block until an item arrives, the queue is interrupted, or it is closed and drained.
    pub fn take(&self) -> Result<T, RecvError> {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = Self::poll(&mut state) {
                return outcome;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Like [`take`](Self::take) but gives up after `timeout` with `Ok(None)`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<Option<T>, RecvError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = Self::poll(&mut state) {
                return outcome.map(Some);
            }
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                return match Self::poll(&mut state) {
                    Some(outcome) => outcome.map(Some),
                    None => Ok(None),
                };
            }
        }
    }

    pub fn try_take(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    fn poll(state: &mut State<T>) -> Option<Result<T, RecvError>> {
        if state.interrupted {
            state.interrupted = false;
            return Some(Err(RecvError::Interrupted));
        }
        if let Some(item) = state.items.pop_front() {
            return Some(Ok(item));
        }
        if state.closed {
            return Some(Err(RecvError::Closed));
        }
        None
    }

    /// Wake the consumer once with [`RecvError::Interrupted`].
    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.ready.notify_all();
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn items_come_out_in_order() {
        let queue = BlockingQueue::new();
        queue.put(1);
        queue.put(2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take(), Ok(1));
        assert_eq!(queue.take(), Ok(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn take_blocks_until_an_item_arrives() {
        let queue = Arc::new(BlockingQueue::new());
        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.put("ready");
        });
        assert_eq!(queue.take(), Ok("ready"));
        handle.join().expect("producer thread");
    }

    #[test]
    fn interrupt_wakes_a_waiting_consumer_once() {
        let queue: Arc<BlockingQueue<u8>> = Arc::new(BlockingQueue::new());
        let waiter = Arc::clone(&queue);
        let handle = thread::spawn(move || waiter.take());
        thread::sleep(Duration::from_millis(20));
        queue.interrupt();
        assert_eq!(handle.join().expect("consumer thread"), Err(RecvError::Interrupted));
        queue.put(5);
        assert_eq!(queue.take(), Ok(5));
    }

    #[test]
    fn closed_queue_drains_then_reports_closed() {
        let queue = BlockingQueue::new();
        queue.put('a');
        queue.close();
        assert_eq!(queue.take(), Ok('a'));
        assert_eq!(queue.take(), Err(RecvError::Closed));
    }

    #[test]
    fn timed_take_gives_up() {
        let queue: BlockingQueue<u8> = BlockingQueue::new();
        assert_eq!(queue.take_timeout(Duration::from_millis(10)), Ok(None));
        queue.put(9);
        assert_eq!(queue.take_timeout(Duration::from_millis(10)), Ok(Some(9)));
    }
}

//=====================================================
// End of file
//=====================================================
