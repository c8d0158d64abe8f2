//! Bounded multi-producer channel on `critical-section` and `heapless::Deque`

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

/// Returned by `try_send` on a full channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

/// Returned by `try_receive` on an empty channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryReceiveError;

/// A bounded, thread-safe channel
///
/// Shared behind an `Arc`; senders and receivers use the same value.
pub struct Channel<T, const SIZE: usize> {
    inner: Mutex<RefCell<Deque<T, SIZE>>>,
}

impl<T, const SIZE: usize> Channel<T, SIZE> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Queue a value
    ///
    /// Returns `Err(TrySendError(value))` if the channel is full.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.push_back(value).map_err(TrySendError)
        })
    }

    /// Send a value, evicting the oldest one when full
    ///
    /// Returns the evicted value, if any.
    pub fn force_send(&self, value: T) -> Option<T> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            let evicted = if queue.is_full() {
                queue.pop_front()
            } else {
                None
            };
            // Cannot fail: a slot was just freed
            let _ = queue.push_back(value);
            evicted
        })
    }

    /// Take the oldest value
    ///
    /// Returns `Err(TryReceiveError)` if the channel is empty.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.pop_front().ok_or(TryReceiveError)
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, const SIZE: usize> Default for Channel<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
