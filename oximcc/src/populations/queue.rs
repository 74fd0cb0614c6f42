use crate::Genome;

use rand::Rng;

use std::collections::VecDeque;

/// A bounded FIFO queue of genomes.
///
/// This is the unit of population turnover: offspring
/// replace the *oldest* member of their queue rather than
/// the worst-performing one, since minimal-criteria
/// selection produces no fitness ranking to replace by.
#[derive(Clone, Debug)]
pub struct SpeciesQueue<G> {
    id: usize,
    capacity: usize,
    genomes: VecDeque<G>,
}

impl<G: Genome> SpeciesQueue<G> {
    pub(crate) fn new(id: usize, capacity: usize) -> SpeciesQueue<G> {
        SpeciesQueue {
            id,
            capacity,
            genomes: VecDeque::with_capacity(capacity),
        }
    }

    /// Adds a genome during initial seeding, without
    /// eviction. Seeding past capacity is a logic error
    /// upstream and only checked in debug builds.
    pub(crate) fn seed(&mut self, genome: G) {
        debug_assert!(self.genomes.len() < self.capacity);
        self.genomes.push_back(genome);
    }

    /// Adds a genome to the back of the queue, evicting
    /// and returning the oldest member if the queue is at
    /// capacity.
    pub fn push_evicting(&mut self, genome: G) -> Option<G> {
        let evicted = if self.genomes.len() >= self.capacity {
            self.genomes.pop_front()
        } else {
            None
        };
        self.genomes.push_back(genome);
        evicted
    }

    /// Samples one member uniformly at random.
    ///
    /// # Panics
    /// Panics if the queue is empty.
    pub fn sample_parent<R: Rng>(&self, rng: &mut R) -> &G {
        let index = rng.gen_range(0..self.genomes.len());
        self.genomes
            .get(index)
            .unwrap_or_else(|| panic!("parent sampling on empty queue {}", self.id))
    }

    /// Returns the queue's index within its population.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Returns the maximum number of members the queue
    /// holds before evicting.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns an iterator over the queue's members,
    /// oldest first.
    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.genomes.iter()
    }

    /// Removes and returns all members, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<G> {
        self.genomes.drain(..).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.genomes.clear();
    }
}
