//! Registry of buffers derived from an authoritative buffer.
//!
//! Members are held weakly: a view keeps its source alive, so a strong
//! reference back from the source's registry would form a cycle. Members that
//! have been dropped are skipped on broadcast and pruned.

use crate::buffer::LineBuffer;
use std::sync::{Arc, Weak};

/// Ordered set of dependent buffers.
#[derive(Clone, Default)]
pub struct DependentBuffers {
    members: Vec<Weak<dyn LineBuffer>>,
}

fn same_buffer<B: LineBuffer + ?Sized>(member: &Weak<dyn LineBuffer>, buffer: &Arc<B>) -> bool {
    std::ptr::addr_eq(member.as_ptr(), Arc::as_ptr(buffer))
}

impl DependentBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `buffer` unless it is already registered. Dead members are
    /// dropped first.
    pub fn register<B: LineBuffer + 'static>(&mut self, buffer: &Arc<B>) {
        self.prune();
        if self.members.iter().any(|m| same_buffer(m, buffer)) {
            return;
        }
        let weak: Weak<dyn LineBuffer> = Arc::downgrade(buffer) as Weak<dyn LineBuffer>;
        self.members.push(weak);
    }

    /// Remove the member with `buffer`'s identity. All other members keep
    /// their relative order. Returns whether anything was removed.
    pub fn unregister<B: LineBuffer + ?Sized>(&mut self, buffer: &Arc<B>) -> bool {
        match self.members.iter().position(|m| same_buffer(m, buffer)) {
            Some(i) => {
                self.members.remove(i);
                true
            }
            None => false,
        }
    }

    /// Tell every live member that the first `count` upstream records are
    /// gone, in registration order. A member that fails is logged and
    /// skipped; members that no longer exist are removed. Returns how many
    /// members accepted the invalidation.
    pub fn invalidate_up_to(&mut self, count: usize) -> usize {
        let mut notified = 0;
        let mut position = 0;
        self.members.retain(|member| {
            let Some(buffer) = member.upgrade() else {
                return false;
            };
            match buffer.invalidate_up_to(count) {
                Ok(()) => notified += 1,
                Err(e) => {
                    tracing::warn!("Dependent buffer #{} failed to invalidate: {}", position, e)
                }
            }
            position += 1;
            true
        });
        notified
    }

    /// Drop members whose buffers no longer exist.
    pub fn prune(&mut self) {
        self.members.retain(|m| m.strong_count() > 0);
    }

    /// Live members, in registration order.
    pub fn members(&self) -> Vec<Arc<dyn LineBuffer>> {
        self.members.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::fmt::Debug for DependentBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependentBuffers")
            .field("len", &self.members.len())
            .finish()
    }
}
