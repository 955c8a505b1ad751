//! Internal synchronization state for the lazy registries.
//!
//! This module provides the construction gate shared by [`DoubleChecked`] and
//! [`Sole`]. It implements the `UNINITIALIZED → INITIALIZING → READY` state
//! machine with atomic operations and futex-based waiting via
//! `parking_lot_core`.
//!
//! The state is packed into a single `AtomicU8` with the following layout:
//! - Bit 0: READY - Instance is constructed and published
//! - Bit 1: INITIALIZING - A constructor is running
//! - Bit 2: WAITING - At least one thread is parked on the gate
//! - Bits 3-7: EPOCH - Generation counter, bumped on every publish/rollback
//!
//! Besides the state byte the gate remembers which thread holds the
//! INITIALIZING bit, so a constructor that calls back into its own registry
//! is reported instead of parking on itself forever.
//!
//! [`DoubleChecked`]: crate::DoubleChecked
//! [`Sole`]: crate::Sole

use core::mem;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Externally observable lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
   /// No instance exists and nobody is constructing one.
   Uninitialized,
   /// A constructor is running on some thread.
   Initializing,
   /// The instance is published; this phase is terminal.
   Ready,
}

/// The calling thread already holds the gate it tried to lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reentrant;

/// Single lock attempt outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blocked {
   /// Held by another thread. Carries the state word to park on.
   Busy(u8),
   /// Held by the calling thread.
   Reentrant,
}

thread_local! {
   static THREAD_TOKEN: u8 = const { 0 };
}

/// Non-zero identifier of the calling thread, stable for its lifetime.
#[inline]
fn thread_token() -> usize {
   THREAD_TOKEN.with(|slot| slot as *const u8 as usize)
}

/// Atomic construction gate.
pub(crate) struct Gate {
   state: AtomicU8,
   owner: AtomicUsize,
}

impl Gate {
   /// Bit flag: instance published.
   const READY: u8 = 1;
   /// Bit flag: constructor running.
   const INITIALIZING: u8 = 2;
   /// Bit flag: at least one thread is parked.
   const WAITING: u8 = 4;
   /// Start of epoch bits.
   const EPOCH_1: u8 = 8;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::READY | Self::INITIALIZING | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates a gate in the `Uninitialized` phase.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         state: AtomicU8::new(0),
         owner: AtomicUsize::new(0),
      }
   }

   #[inline]
   fn key(&self) -> usize {
      self.state.as_ptr() as usize
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: `park` and `unpark_all` use the same key, the address of the state byte.
      unsafe {
         parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks until the state word differs from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         // The validate closure runs under the bucket lock, so a wake-up
         // between our load and the sleep cannot be lost.
         let _ = parking_lot_core::park(
            self.key(),
            || self.state.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Publishes: READY, bump epoch, wake waiters.
   ///
   /// The release swap orders the write of the instance before any acquire
   /// load that observes READY.
   #[inline]
   fn set_ready(&self) {
      self.owner.store(0, Ordering::Relaxed);
      let current_state = self.state.load(Ordering::Relaxed);
      let new_state = Self::READY | Self::next_epoch(current_state);
      let prev_state = self.state.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Rolls back to `Uninitialized`, bump epoch, wake waiters so one of them
   /// can retry the construction.
   #[inline]
   fn set_uninit(&self) {
      self.owner.store(0, Ordering::Relaxed);
      let current_state = self.state.load(Ordering::Relaxed);
      let prev_state = self.state.swap(Self::next_epoch(current_state), Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Acquire check of the READY bit. This is the double-checked fast path.
   #[inline]
   pub(crate) fn is_ready(&self) -> bool {
      self.state.load(Ordering::Acquire) & Self::READY != 0
   }

   pub(crate) fn phase(&self) -> Phase {
      let state = self.state.load(Ordering::Acquire);
      if state & Self::READY != 0 {
         Phase::Ready
      } else if state & Self::INITIALIZING != 0 {
         Phase::Initializing
      } else {
         Phase::Uninitialized
      }
   }

   /// One attempt at taking the construction lock.
   ///
   /// Returns:
   ///   - `Ok(None)`: already READY.
   ///   - `Ok(Some(guard))`: lock taken, caller must construct.
   ///   - `Err(Blocked::Busy(state))`: another thread is constructing; WAITING is set in `state`.
   ///   - `Err(Blocked::Reentrant)`: the calling thread is the one constructing.
   #[inline]
   fn lock_step(&self) -> Result<Option<GateGuard<'_>>, Blocked> {
      let me = thread_token();
      loop {
         let current_state = self.state.load(Ordering::Acquire);
         if current_state & Self::READY != 0 {
            return Ok(None);
         }

         if current_state & Self::INITIALIZING == 0 {
            match self.state.compare_exchange_weak(
               current_state,
               current_state | Self::INITIALIZING,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => {
                  self.owner.store(me, Ordering::Relaxed);
                  return Ok(Some(GateGuard { gate: self }));
               }
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // Only the holder ever stores its own token, and it does so before
         // running the constructor, so a match here can only mean re-entry.
         if self.owner.load(Ordering::Relaxed) == me {
            return Err(Blocked::Reentrant);
         }

         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.state.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(Blocked::Busy(new_state)),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(Blocked::Busy(current_state));
      }
   }

   /// Takes the construction lock, parking while another thread holds it.
   ///
   /// Returns `Ok(None)` when the instance was published while we waited.
   pub(crate) fn lock(&self) -> Result<Option<GateGuard<'_>>, Reentrant> {
      loop {
         match self.lock_step() {
            Ok(guard) => return Ok(guard),
            Err(Blocked::Busy(state)) => self.wait(state),
            Err(Blocked::Reentrant) => return Err(Reentrant),
         }
      }
   }

   /// Takes the construction lock from an async context.
   ///
   /// Yields to the scheduler first, then falls back to a blocking wait in
   /// `block_in_place` when the multi-threaded runtime is enabled.
   #[cfg(feature = "async-tokio")]
   pub(crate) async fn lock_async(&self) -> Result<Option<GateGuard<'_>>, Reentrant> {
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            match self.lock_step() {
               Err(Blocked::Busy(state)) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.state.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
               Ok(guard) => return Ok(guard),
               Err(Blocked::Reentrant) => return Err(Reentrant),
            }
         }

         // Without the multi-threaded runtime we can only keep yielding.
         #[cfg(feature = "async-tokio-mt")]
         {
            return match self.lock_step() {
               Ok(guard) => Ok(guard),
               Err(Blocked::Busy(state)) => tokio::task::block_in_place(|| {
                  self.wait(state);
                  self.lock()
               }),
               Err(Blocked::Reentrant) => Err(Reentrant),
            };
         }
      }
   }
}

/// RAII guard for the INITIALIZING phase.
///
/// Dropping it without [`publish`](GateGuard::publish) rolls the gate back to
/// `Uninitialized`, which covers both constructor errors and panics.
pub(crate) struct GateGuard<'a> {
   gate: &'a Gate,
}

impl GateGuard<'_> {
   /// Marks the instance as published and wakes all waiters.
   ///
   /// The caller must have fully written the instance before calling this.
   #[inline(always)]
   pub(crate) fn publish(self) {
      self.gate.set_ready();
      mem::forget(self);
   }
}

impl Drop for GateGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.gate.set_uninit();
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn phases_follow_guard() {
      let gate = Gate::new();
      assert_eq!(gate.phase(), Phase::Uninitialized);

      let guard = gate.lock().unwrap().unwrap();
      assert_eq!(gate.phase(), Phase::Initializing);
      drop(guard);
      assert_eq!(gate.phase(), Phase::Uninitialized);

      let guard = gate.lock().unwrap().unwrap();
      guard.publish();
      assert_eq!(gate.phase(), Phase::Ready);
      assert!(gate.is_ready());
      assert!(matches!(gate.lock(), Ok(None)));
   }

   #[test]
   fn same_thread_relock_is_reentrant() {
      let gate = Gate::new();
      let _guard = gate.lock().unwrap().unwrap();
      assert!(matches!(gate.lock(), Err(Reentrant)));
   }

   #[test]
   fn epoch_wraps_without_touching_flags() {
      let mut state = 0u8;
      for _ in 0..64 {
         state = Gate::next_epoch(state);
         assert_eq!(state & !Gate::EPOCH_MASK, 0);
      }
   }
}
