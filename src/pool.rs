use log::debug;

/// Bounded free-list of reusable instances. Capacity is fixed at
/// construction; once every slot has been handed out, `acquire` returns
/// `None` until something is released. Callers treat `None` as "skip
/// this draw operation for this frame" rather than an error.
pub struct Pool<T> {
    capacity: usize,
    created: usize,
    free: Vec<T>,
    factory: Box<dyn FnMut() -> T>,
}

impl<T> Pool<T> {
    pub fn new(capacity: usize, factory: impl FnMut() -> T + 'static) -> Self {
        Self {
            capacity,
            created: 0,
            free: Vec::with_capacity(capacity),
            factory: Box::new(factory),
        }
    }

    /// Hands out a previously released instance when one is available,
    /// constructs a fresh one while under capacity, and returns `None`
    /// once the pool is exhausted.
    pub fn acquire(&mut self) -> Option<T> {
        if let Some(item) = self.free.pop() {
            return Some(item);
        }
        if self.created < self.capacity {
            self.created += 1;
            return Some((self.factory)());
        }
        debug!("pool exhausted at capacity {}", self.capacity);
        None
    }

    /// Returns an instance to the free list. The pool trusts its caller:
    /// releasing an instance that was never acquired is a caller bug and
    /// is not checked here.
    pub fn release(&mut self, item: T) {
        self.free.push(item);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of instances currently checked out.
    pub fn in_use(&self) -> usize {
        self.created - self.free.len()
    }
}
