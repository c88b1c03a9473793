// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Single-threaded signal/slot primitive.
//!
//! A signal owns a plain vector of callbacks, each keyed by a monotonically
//! growing id. Connecting returns a [`Subscription`] guard; dropping the guard
//! removes the callback. There is no global registry - a signal and its
//! subscriptions are ordinary values owned by whoever needs them.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

struct SignalState<A> {
    subscribers: Vec<(u64, Box<dyn FnMut(&A)>)>,
    // Ids unsubscribed while an emission was in flight.
    dead: Vec<u64>,
    emitting: bool,
    next_id: u64,
}

impl<A> Default for SignalState<A> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            dead: Vec::new(),
            emitting: false,
            next_id: 0,
        }
    }
}

/// See module docs.
pub struct Signal<A> {
    state: Rc<RefCell<SignalState<A>>>,
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(SignalState::default())),
        }
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<A: 'static> Signal<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects the callback and returns a guard that removes it again when
    /// dropped. Call [`Subscription::forever`] to keep the callback for the
    /// lifetime of the signal instead.
    #[must_use]
    pub fn connect<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&A) + 'static,
    {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, Box::new(callback)));
            id
        };

        let weak = Rc::downgrade(&self.state);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(state) = Weak::upgrade(&weak) {
                    let mut state = state.borrow_mut();
                    if state.emitting {
                        state.dead.push(id);
                    } else {
                        state.subscribers.retain(|(sub_id, _)| *sub_id != id);
                    }
                }
            })),
        }
    }

    /// Invokes every connected callback with the given argument. Callbacks may
    /// connect to or disconnect from this signal while it fires; newly added
    /// callbacks are not invoked until the next emission.
    pub fn emit(&self, args: &A) {
        let mut current = {
            let mut state = self.state.borrow_mut();
            if state.emitting {
                // Re-entrant emission is a listener bug; refuse to recurse.
                return;
            }
            state.emitting = true;
            std::mem::take(&mut state.subscribers)
        };

        for (id, callback) in current.iter_mut() {
            if !self.state.borrow().dead.contains(id) {
                callback(args);
            }
        }

        let mut state = self.state.borrow_mut();
        // Keep callbacks added during the emission.
        let added = std::mem::take(&mut state.subscribers);
        current.extend(added);
        let dead = std::mem::take(&mut state.dead);
        current.retain(|(id, _)| !dead.contains(id));
        state.subscribers = current;
        state.emitting = false;
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

/// Removes its callback from the signal it came from when dropped.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Consumes the guard, leaving the callback connected for the remaining
    /// lifetime of the signal.
    pub fn forever(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn emit_reaches_all_subscribers() {
        let signal = Signal::<u32>::new();
        let counter = Rc::new(Cell::new(0));

        let c1 = counter.clone();
        let _s1 = signal.connect(move |v| c1.set(c1.get() + v));
        let c2 = counter.clone();
        let _s2 = signal.connect(move |v| c2.set(c2.get() + v));

        signal.emit(&2);
        assert_eq!(counter.get(), 4);
    }

    #[test]
    fn dropping_subscription_disconnects() {
        let signal = Signal::<u32>::new();
        let counter = Rc::new(Cell::new(0));

        let c = counter.clone();
        let subscription = signal.connect(move |v| c.set(c.get() + v));
        signal.emit(&1);
        drop(subscription);
        signal.emit(&1);

        assert_eq!(counter.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn forever_keeps_subscription_alive() {
        let signal = Signal::<u32>::new();
        let counter = Rc::new(Cell::new(0));

        let c = counter.clone();
        signal.connect(move |v| c.set(c.get() + v)).forever();
        signal.emit(&1);
        signal.emit(&1);

        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn connect_during_emit_fires_next_time() {
        let signal = Signal::<u32>::new();
        let counter = Rc::new(Cell::new(0));

        let inner_signal = signal.clone();
        let c = counter.clone();
        signal
            .connect(move |_| {
                let c = c.clone();
                inner_signal.connect(move |v| c.set(c.get() + v)).forever();
            })
            .forever();

        signal.emit(&1);
        assert_eq!(counter.get(), 0);
        signal.emit(&1);
        assert_eq!(counter.get(), 1);
    }
}
