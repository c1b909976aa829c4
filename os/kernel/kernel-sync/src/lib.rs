//! # Kernel synchronization primitives
//!
//! Memory-manager state (frame pools, the active directory, region tables) is
//! shared between the fault handler and ordinary kernel code. Each such piece
//! of state sits behind a [`SpinLock`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
