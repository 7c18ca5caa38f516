use std::rc::Rc;

use bitvec::vec::BitVec;

/// Handle that identifies a thread in a [`ThreadPool`].
pub(crate) type ThreadId = usize;

/// Capture slots of a thread. Slots are shared between a thread and the
/// threads forked from it until one of them writes a slot.
pub(crate) type Slots = Rc<Vec<Option<usize>>>;

/// A thread in Pike's VM.
#[derive(Debug, Clone)]
pub(crate) struct Thread {
    /// Address of the next instruction executed by the thread.
    pub pc: usize,
    /// Offsets recorded by `SAVE` instructions.
    pub saved: Slots,
}

/// Arena where threads are allocated.
///
/// Threads are referenced by their index in the arena. When a thread dies
/// its index goes to a free-list and is reused by the next allocation, so
/// the arena never grows beyond the maximum number of threads that were
/// alive at the same time.
#[derive(Debug)]
pub(crate) struct ThreadPool {
    threads: Vec<Thread>,
    free: Vec<ThreadId>,
    /// Slots given to dead threads, so that they don't keep a reference to
    /// the slots of live threads.
    empty: Slots,
}

impl ThreadPool {
    pub fn new() -> Self {
        Self { threads: Vec::new(), free: Vec::new(), empty: Rc::new(Vec::new()) }
    }

    /// Allocates a thread.
    pub fn allocate(&mut self, pc: usize, saved: Slots) -> ThreadId {
        match self.free.pop() {
            Some(id) => {
                self.threads[id] = Thread { pc, saved };
                id
            }
            None => {
                self.threads.push(Thread { pc, saved });
                self.threads.len() - 1
            }
        }
    }

    /// Allocates a thread that starts at `pc` and shares the capture slots
    /// of thread `id`.
    pub fn fork(&mut self, id: ThreadId, pc: usize) -> ThreadId {
        let saved = Rc::clone(&self.threads[id].saved);
        self.allocate(pc, saved)
    }

    /// Returns a thread to the pool.
    pub fn free(&mut self, id: ThreadId) {
        debug_assert!(!self.free.contains(&id), "thread {} freed twice", id);
        self.threads[id].saved = Rc::clone(&self.empty);
        self.free.push(id);
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> &Thread {
        &self.threads[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ThreadId) -> &mut Thread {
        &mut self.threads[id]
    }

    /// Number of threads alive.
    pub fn live(&self) -> usize {
        self.threads.len() - self.free.len()
    }

    /// Number of threads the arena can hold without growing.
    pub fn capacity(&self) -> usize {
        self.threads.len()
    }
}

/// Queue of threads that run at the same input position.
///
/// Threads are kept in priority order. Besides the threads, the queue
/// remembers every program counter visited while filling it, including
/// the ones of non-consuming instructions that never make it into the
/// queue. Visiting an instruction twice at the same position can only
/// produce lower priority copies of threads that already exist, so
/// [`ThreadQueue::visit`] tells the caller to drop them. As a result the
/// queue never holds more threads than instructions in the program.
///
/// Visited program counters are tracked with a bitmap, and the set bits
/// are remembered in a separate list, so that clearing the queue doesn't
/// depend on the program size.
#[derive(Debug, Default)]
pub(crate) struct ThreadQueue {
    /// Threads in the queue, in priority order.
    threads: Vec<ThreadId>,
    /// One bit per instruction, set for visited instructions.
    visited: BitVec<usize>,
    /// Program counters with their bit set in `visited`.
    visited_list: Vec<usize>,
    /// Maximum length reached by the queue.
    peak: usize,
}

impl ThreadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure that the queue can track programs of `len` instructions.
    pub fn reserve(&mut self, len: usize) {
        if self.visited.len() < len {
            self.visited.resize(len, false);
        }
    }

    /// Marks the instruction at `pc` as visited. Returns `true` if the
    /// instruction was not visited before, and `false` if it was.
    #[inline]
    pub fn visit(&mut self, pc: usize) -> bool {
        if self.visited[pc] {
            return false;
        }
        self.visited.set(pc, true);
        self.visited_list.push(pc);
        true
    }

    /// Adds a thread at the end of the queue.
    #[inline]
    pub fn push(&mut self, id: ThreadId) {
        self.threads.push(id);
        self.peak = self.peak.max(self.threads.len());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Threads in the queue, from higher to lower priority.
    #[inline]
    pub fn threads(&self) -> &[ThreadId] {
        self.threads.as_slice()
    }

    /// Maximum number of threads that the queue has held at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Removes all the threads and visit marks.
    pub fn clear(&mut self) {
        for pc in self.visited_list.drain(..) {
            self.visited.set(pc, false);
        }
        self.threads.clear();
    }
}
