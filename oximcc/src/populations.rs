//! Bounded FIFO population queues and their species
//! partitioning. Queues are the unit of turnover in the
//! queueing EA: parents are sampled from a queue, and
//! each accepted offspring evicts that queue's oldest
//! member.
mod config;
mod queue;

use crate::Genome;
pub use config::QueueConfig;
pub use queue::SpeciesQueue;

/// Splits `total` into shares proportional to `weights`,
/// preserving the sum exactly. Rounding is done largest
/// remainder first, so the result minimizes deviation
/// from the ideal fractional shares.
pub(crate) fn allot_proportional(weights: &[usize], total: usize) -> Vec<usize> {
    let weight_sum: usize = weights.iter().sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }
    let mut shares: Vec<(usize, usize, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let ideal = *w as f64 * total as f64 / weight_sum as f64;
            let whole = ideal.floor() as usize;
            (i, whole, ideal - ideal.floor())
        })
        .collect();
    let assigned: usize = shares.iter().map(|(_, n, _)| *n).sum();
    let remainder = total - assigned;
    shares.sort_unstable_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or_else(|| panic!("uncomparable allotment remainder"))
            .then(a.0.cmp(&b.0))
    });
    for share in shares.iter_mut().take(remainder) {
        share.1 += 1;
    }
    shares.sort_unstable_by_key(|(i, ..)| *i);
    shares.into_iter().map(|(_, n, _)| n).collect()
}

/// Assigns every genome to one of `k` clusters by
/// genetic distance to a set of medoids, refining the
/// medoids for a few rounds. Deterministic: initial
/// medoids are the first `k` genomes.
fn cluster_assignments<G: Genome>(genomes: &[G], k: usize, config: &G::Config) -> Vec<usize> {
    let mut medoids: Vec<usize> = (0..k.min(genomes.len())).collect();
    let mut assignment = vec![0usize; genomes.len()];
    for _ in 0..4 {
        for (i, genome) in genomes.iter().enumerate() {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (cluster, &medoid) in medoids.iter().enumerate() {
                let distance = G::genetic_distance(genome, &genomes[medoid], config);
                if distance < best_distance {
                    best_distance = distance;
                    best = cluster;
                }
            }
            assignment[i] = best;
        }

        let mut changed = false;
        for (cluster, medoid) in medoids.iter_mut().enumerate() {
            let members: Vec<usize> = assignment
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == cluster)
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }
            let mut best = *medoid;
            let mut best_total = f64::INFINITY;
            for &candidate in &members {
                let total: f64 = members
                    .iter()
                    .map(|&other| {
                        G::genetic_distance(&genomes[candidate], &genomes[other], config)
                    })
                    .sum();
                if total < best_total {
                    best_total = total;
                    best = candidate;
                }
            }
            if best != *medoid {
                *medoid = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    assignment
}

/// Pre-clusters a seed population into `species_count`
/// queues whose capacities sum to exactly `total_capacity`.
/// Genomes land in the queue of their nearest cluster;
/// cluster overflow past a queue's capacity spills into
/// the first queue with space, so no genome is dropped.
pub(crate) fn partition_into_queues<G: Genome>(
    genomes: Vec<G>,
    species_count: usize,
    total_capacity: usize,
    config: &G::Config,
) -> Vec<SpeciesQueue<G>> {
    let base = total_capacity / species_count;
    let remainder = total_capacity % species_count;
    let mut queues: Vec<SpeciesQueue<G>> = (0..species_count)
        .map(|i| SpeciesQueue::new(i, base + usize::from(i < remainder)))
        .collect();

    let assignment = cluster_assignments(&genomes, species_count, config);
    let mut overflow = Vec::new();
    for (genome, cluster) in genomes.into_iter().zip(assignment) {
        if queues[cluster].len() < queues[cluster].capacity() {
            queues[cluster].seed(genome);
        } else {
            overflow.push(genome);
        }
    }
    for genome in overflow {
        let target = queues
            .iter_mut()
            .find(|q| q.len() < q.capacity())
            .unwrap_or_else(|| panic!("seed population exceeds total queue capacity"));
        target.seed(genome);
    }
    queues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingGenome, CountingConfig};
    use crate::Genome;

    #[test]
    fn allotment_preserves_sum() {
        let shares = allot_proportional(&[5, 9, 2, 1, 3], 10);
        assert_eq!(shares.iter().sum::<usize>(), 10);
        // Largest remainders (ties broken by index) absorb
        // the two units the floors leave over.
        assert_eq!(shares, vec![3, 5, 1, 0, 1]);
    }

    #[test]
    fn allotment_of_zero_weights_is_zero() {
        assert_eq!(allot_proportional(&[0, 0], 4), vec![0, 0]);
    }

    #[test]
    fn partition_keeps_every_genome_and_fills_capacities() {
        let config = CountingConfig::default();
        let genomes: Vec<CountingGenome> = (0..20)
            .map(|i| CountingGenome::with_trait(i, (i % 4) as f64))
            .collect();
        let queues = partition_into_queues(genomes, 4, 20, &config);
        assert_eq!(queues.len(), 4);
        assert_eq!(queues.iter().map(|q| q.len()).sum::<usize>(), 20);
        for queue in &queues {
            assert_eq!(queue.capacity(), 5);
            assert!(queue.len() <= queue.capacity());
        }
        let mut ids: Vec<_> = queues
            .iter()
            .flat_map(|q| q.genomes().map(|g| g.id()))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20u64).collect::<Vec<_>>());
    }

    #[test]
    fn capacity_remainder_goes_to_leading_queues() {
        let config = CountingConfig::default();
        let genomes: Vec<CountingGenome> =
            (0..10).map(|i| CountingGenome::with_trait(i, i as f64)).collect();
        let queues = partition_into_queues(genomes, 3, 10, &config);
        assert_eq!(
            queues.iter().map(|q| q.capacity()).collect::<Vec<_>>(),
            vec![4, 3, 3]
        );
    }
}
