//! Readers/writer lock that does not let readers starve writers
//!
//! Three primitives cooperate:
//!
//! - the *service queue*: a mutex every acquirer (reader or writer) takes
//!   first and hands back as soon as it has secured its place. It is always
//!   released with [`MutexGuard::unlock_fair()`], which passes it to the
//!   longest waiting thread, so admission follows arrival order.
//! - the *resource*: a binary semaphore held by a writer, or by the first
//!   reader of a group on behalf of all readers in that group. The last
//!   reader of the group releases it, possibly on another thread, which is
//!   why it is not a mutex.
//! - the *reader count*: a mutex protecting the number of active readers.
//!
//! A writer waiting for the readers to leave keeps the service queue, so
//! readers arriving after it queue up behind it instead of joining the
//! active group.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Binary semaphore
struct Semaphore {
    taken: Mutex<bool>,
    released: Condvar,
}

impl Semaphore {
    fn new() -> Self {
        Self {
            taken: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut taken = self.taken.lock();
        while *taken {
            self.released.wait(&mut taken);
        }
        *taken = true;
    }

    fn release(&self) {
        let mut taken = self.taken.lock();
        assert!(*taken, "coordination failure: resource released while free");
        *taken = false;
        drop(taken);
        self.released.notify_one();
    }
}

/// Readers/writer lock with arrival-order admission
///
/// Any number of readers may hold the lock together. A writer excludes
/// readers and other writers. Once a writer has arrived, readers arriving
/// later wait until it is done.
pub struct FairRwLock<T> {
    queue: Mutex<()>,
    readers: Mutex<usize>,
    resource: Semaphore,
    data: UnsafeCell<T>,
}

// SAFETY: `data` is only reached through the guards, and the protocol
// grants either one `WriteGuard` or any number of `ReadGuard`s at a time.
unsafe impl<T: Send> Send for FairRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for FairRwLock<T> {}

impl<T> FairRwLock<T> {
    /// Create a new lock protecting `data`
    pub fn new(data: T) -> Self {
        Self {
            queue: Mutex::new(()),
            readers: Mutex::new(0),
            resource: Semaphore::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire shared access, blocking while a writer holds or awaits the lock
    pub fn read(&self) -> ReadGuard<'_, T> {
        let ticket = self.queue.lock();
        let mut readers = self.readers.lock();
        *readers += 1;
        if *readers == 1 {
            // first of the group
            self.resource.acquire();
        }
        drop(readers);
        MutexGuard::unlock_fair(ticket);
        ReadGuard { lock: self }
    }

    /// Acquire exclusive access
    pub fn write(&self) -> WriteGuard<'_, T> {
        let ticket = self.queue.lock();
        self.resource.acquire();
        MutexGuard::unlock_fair(ticket);
        WriteGuard { lock: self }
    }

    /// Exclusive access without locking, the borrow checker proves it
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the lock and return the protected data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn read_unlock(&self) {
        let mut readers = self.readers.lock();
        *readers -= 1;
        if *readers == 0 {
            // last of the group
            self.resource.release();
        }
    }
}

impl<T: Default> Default for FairRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Shared access to the data of a [`FairRwLock`], released on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: no writer is active while a read guard exists
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.read_unlock();
    }
}

/// Exclusive access to the data of a [`FairRwLock`], released on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write guard is the only guard in existence
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write guard is the only guard in existence
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.resource.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    #[ntest::timeout(10_000)]
    fn readers_share_the_lock() {
        const READERS: usize = 4;
        let lock = Arc::new(FairRwLock::new(7u32));
        let barrier = Arc::new(Barrier::new(READERS));

        let handles: Vec<_> = (0..READERS)
            .map(|_| {
                let lock = lock.clone();
                let barrier = barrier.clone();
                // every reader waits for all others while holding its guard
                thread::spawn(move || {
                    let guard = lock.read();
                    barrier.wait();
                    *guard
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn writers_exclude_each_other_and_readers() {
        let lock = Arc::new(FairRwLock::new(0u64));
        let inside = Arc::new(AtomicBool::new(false));

        thread::scope(|s| {
            for i in 0..8 {
                let lock = &lock;
                let inside = &inside;
                s.spawn(move || {
                    for _ in 0..500 {
                        if i % 2 == 0 {
                            let mut guard = lock.write();
                            assert!(!inside.swap(true, Ordering::SeqCst));
                            *guard += 1;
                            inside.store(false, Ordering::SeqCst);
                        } else {
                            let _guard = lock.read();
                            assert!(!inside.load(Ordering::SeqCst));
                        }
                    }
                });
            }
        });

        assert_eq!(Arc::into_inner(lock).unwrap().into_inner(), 4 * 500);
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn readers_arriving_after_a_writer_wait_for_it() {
        let lock = Arc::new(FairRwLock::new(0u32));
        let first = lock.read();

        let writer = {
            let lock = lock.clone();
            thread::spawn(move || *lock.write() += 1)
        };
        // the writer holds the service queue while it waits for `first`
        while !lock.queue.is_locked() {
            thread::yield_now();
        }

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || *lock.read())
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(*first, 0);
        drop(first);

        writer.join().unwrap();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), 1, "a later reader overtook the writer");
        }
    }

    #[test]
    #[ntest::timeout(20_000)]
    fn writer_is_admitted_under_continuous_reads() {
        const READERS: usize = 4;
        let lock = Arc::new(FairRwLock::new(0u32));
        let admissions = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        // overlapping readers: the read group never empties on its own
        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let lock = lock.clone();
                let admissions = admissions.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let _guard = lock.read();
                        admissions.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(1));
                    }
                })
            })
            .collect();
        while admissions.load(Ordering::SeqCst) < 100 {
            thread::yield_now();
        }

        let before = admissions.load(Ordering::SeqCst);
        let overtaken = {
            let mut guard = lock.write();
            *guard += 1;
            admissions.load(Ordering::SeqCst) - before
        };

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
        assert!(
            overtaken <= 2 * READERS,
            "writer waited for {overtaken} reader admissions"
        );
        assert_eq!(*lock.read(), 1);
    }

    #[test]
    fn guards_release_on_unwind() {
        let lock = Arc::new(FairRwLock::new(0u32));
        let result = {
            let lock = lock.clone();
            thread::spawn(move || {
                let _guard = lock.write();
                panic!("boom");
            })
            .join()
        };
        assert!(result.is_err());
        *lock.write() += 1;
        assert_eq!(*lock.read(), 1);
    }
}
