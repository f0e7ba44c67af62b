//! Effect sinks
//!
//! The interpreter's only boundary to the outside world. A sink answers
//! effect requests and participates in backtracking through strictly nested
//! transaction frames: the evaluator brackets every speculative region
//! (`cond` tries, loop conditions, and the whole toplevel run) with
//! `begin`, then `commit` or `abort` once the region is decided.
//!
//! Anything performed between a `begin` and its `abort` must leave no
//! observable trace; effects committed inside an outer frame stay
//! revertible until that outer frame commits too. `TxnBuffer` implements
//! that discipline for sinks that can defer their side effects.

use glas_core::Value;

pub trait EffectSink {
    /// Answer one request, or deny it (a recoverable failure for the
    /// calling program). `( request -- response )`
    fn handle(&mut self, request: &Value) -> Option<Value>;

    /// Open a transaction frame.
    fn begin(&mut self);

    /// Merge the most recent frame into its parent (or the world).
    fn commit(&mut self);

    /// Discard the most recent frame and everything done inside it.
    fn abort(&mut self);
}

/// Sink that denies every effect; for pure programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EffectSink for NullSink {
    fn handle(&mut self, _request: &Value) -> Option<Value> {
        None
    }
    fn begin(&mut self) {}
    fn commit(&mut self) {}
    fn abort(&mut self) {}
}

/// LIFO frames of deferred events. Events recorded at depth zero are
/// delivered immediately; deeper events move to the parent frame on commit
/// and vanish on abort. `drain_delivered` hands the owner whatever has
/// reached the world since the last drain.
#[derive(Debug, Clone)]
pub struct TxnBuffer<T> {
    frames: Vec<Vec<T>>,
    delivered: Vec<T>,
}

impl<T> TxnBuffer<T> {
    pub fn new() -> Self {
        TxnBuffer {
            frames: Vec::new(),
            delivered: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn record(&mut self, event: T) {
        match self.frames.last_mut() {
            Some(frame) => frame.push(event),
            None => self.delivered.push(event),
        }
    }

    pub fn begin(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn commit(&mut self) {
        debug_assert!(!self.frames.is_empty(), "commit without open frame");
        if let Some(frame) = self.frames.pop() {
            match self.frames.last_mut() {
                Some(parent) => parent.extend(frame),
                None => self.delivered.extend(frame),
            }
        }
    }

    pub fn abort(&mut self) {
        debug_assert!(!self.frames.is_empty(), "abort without open frame");
        self.frames.pop();
    }

    pub fn drain_delivered(&mut self) -> Vec<T> {
        std::mem::take(&mut self.delivered)
    }
}

impl<T> Default for TxnBuffer<T> {
    fn default() -> Self {
        TxnBuffer::new()
    }
}
