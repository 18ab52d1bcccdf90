//! Critical-section locks: the admission lock and the per-book matching lock.

pub mod admission;
pub mod matching;

pub use admission::AdmissionLock;
pub use matching::MatchingLockRegistry;
