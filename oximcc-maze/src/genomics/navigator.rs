use crate::genomics::{uniform, NavigatorGeneticConfig};
use crate::networks::{NavigatorNetwork, OUTPUT_COUNT, SENSOR_COUNT};

use oximcc::{EvaluationInfo, Genome, GenomeId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weights carried by one neuron gene: sensor weights
/// plus bias, one self-recurrent weight, and a weight to
/// each output.
pub(crate) const WEIGHTS_PER_NEURON: usize = SENSOR_COUNT + 1 + 1 + OUTPUT_COUNT;

/// One hidden unit of a navigator controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    /// Sensor weights, bias last.
    pub input_weights: [f64; SENSOR_COUNT + 1],
    /// Self-connection weight; the unit's only memory.
    pub recurrent_weight: f64,
    /// Contribution to each drive output.
    pub output_weights: [f64; OUTPUT_COUNT],
}

impl NeuronGene {
    fn random<R: Rng>(config: &NavigatorGeneticConfig, rng: &mut R) -> NeuronGene {
        let power = config.initial_weight_power;
        let mut gene = NeuronGene {
            input_weights: [0.0; SENSOR_COUNT + 1],
            recurrent_weight: uniform(rng, power),
            output_weights: [0.0; OUTPUT_COUNT],
        };
        for weight in gene.input_weights.iter_mut() {
            *weight = uniform(rng, power);
        }
        for weight in gene.output_weights.iter_mut() {
            *weight = uniform(rng, power);
        }
        gene
    }

    /// Combines two aligned genes, either averaging every
    /// weight or picking each weight from a random parent.
    fn combine<R: Rng>(
        first: &NeuronGene,
        second: &NeuronGene,
        averaging: bool,
        rng: &mut R,
    ) -> NeuronGene {
        let mut gene = first.clone();
        let pairs = gene
            .input_weights
            .iter_mut()
            .zip(second.input_weights.iter())
            .chain(std::iter::once((
                &mut gene.recurrent_weight,
                &second.recurrent_weight,
            )))
            .chain(gene.output_weights.iter_mut().zip(second.output_weights.iter()));
        for (weight, other) in pairs {
            if averaging {
                *weight = (*weight + *other) / 2.0;
            } else if rng.gen::<bool>() {
                *weight = *other;
            }
        }
        gene
    }

    fn weight_difference(&self, other: &NeuronGene) -> f64 {
        self.input_weights
            .iter()
            .zip(other.input_weights.iter())
            .chain(self.output_weights.iter().zip(other.output_weights.iter()))
            .map(|(a, b)| (a - b).abs())
            .sum::<f64>()
            + (self.recurrent_weight - other.recurrent_weight).abs()
    }

    fn is_finite(&self) -> bool {
        self.input_weights.iter().all(|w| w.is_finite())
            && self.recurrent_weight.is_finite()
            && self.output_weights.iter().all(|w| w.is_finite())
    }
}

/// An evolvable navigator controller: an ordered list of
/// hidden-unit genes plus one bias per output. The hidden
/// layer grows and shrinks through mutation; everything
/// else about the topology is fixed by the sensor and
/// output layout of the maze world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigatorGenome {
    id: GenomeId,
    birth_generation: usize,
    neurons: Vec<NeuronGene>,
    output_biases: [f64; OUTPUT_COUNT],
    info: EvaluationInfo,
}

impl NavigatorGenome {
    /// Builds a genome from explicit genes. Used by seed
    /// construction and tests; evolved genomes come from
    /// [`Genome::random`] and reproduction.
    pub fn new(
        id: GenomeId,
        birth_generation: usize,
        neurons: Vec<NeuronGene>,
        output_biases: [f64; OUTPUT_COUNT],
    ) -> NavigatorGenome {
        NavigatorGenome {
            id,
            birth_generation,
            neurons,
            output_biases,
            info: EvaluationInfo::default(),
        }
    }

    pub fn neurons(&self) -> &[NeuronGene] {
        &self.neurons
    }

    pub fn output_biases(&self) -> [f64; OUTPUT_COUNT] {
        self.output_biases
    }

    fn weights_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.neurons
            .iter_mut()
            .flat_map(|n| {
                n.input_weights
                    .iter_mut()
                    .chain(std::iter::once(&mut n.recurrent_weight))
                    .chain(n.output_weights.iter_mut())
            })
            .chain(self.output_biases.iter_mut())
    }

    fn mutate<R: Rng>(&mut self, config: &NavigatorGeneticConfig, rng: &mut R) {
        let bound = config.weight_bound;
        for weight in self.weights_mut() {
            if rng.gen::<f64>() < config.weight_reset_chance {
                *weight = uniform(rng, bound);
            } else if rng.gen::<f64>() < config.weight_nudge_chance {
                *weight = (*weight + uniform(rng, config.weight_mutation_power))
                    .clamp(-bound, bound);
            }
        }
        if self.neurons.len() < config.max_hidden_count.get()
            && rng.gen::<f64>() < config.neuron_addition_mutation_chance
        {
            self.neurons.push(NeuronGene::random(config, rng));
        }
        if !self.neurons.is_empty()
            && rng.gen::<f64>() < config.neuron_deletion_mutation_chance
        {
            let index = rng.gen_range(0..self.neurons.len());
            self.neurons.remove(index);
        }
    }
}

impl Genome for NavigatorGenome {
    type Config = NavigatorGeneticConfig;
    type Phenome = NavigatorNetwork;

    fn random<R: Rng>(
        id: GenomeId,
        birth_generation: usize,
        config: &NavigatorGeneticConfig,
        rng: &mut R,
    ) -> NavigatorGenome {
        let neurons = (0..config.initial_hidden_count.get())
            .map(|_| NeuronGene::random(config, rng))
            .collect();
        let mut output_biases = [0.0; OUTPUT_COUNT];
        for bias in output_biases.iter_mut() {
            *bias = uniform(rng, config.initial_weight_power);
        }
        NavigatorGenome::new(id, birth_generation, neurons, output_biases)
    }

    fn spawn<R: Rng>(
        &self,
        id: GenomeId,
        birth_generation: usize,
        config: &NavigatorGeneticConfig,
        rng: &mut R,
    ) -> NavigatorGenome {
        let mut child =
            NavigatorGenome::new(id, birth_generation, self.neurons.clone(), self.output_biases);
        child.mutate(config, rng);
        child
    }

    fn mate<R: Rng>(
        first: &NavigatorGenome,
        second: &NavigatorGenome,
        id: GenomeId,
        birth_generation: usize,
        config: &NavigatorGeneticConfig,
        rng: &mut R,
    ) -> NavigatorGenome {
        let averaging = rng.gen::<f64>() < config.mate_by_averaging_chance;
        let aligned = first.neurons.len().min(second.neurons.len());
        let longer = if first.neurons.len() >= second.neurons.len() {
            &first.neurons
        } else {
            &second.neurons
        };

        let mut neurons = Vec::with_capacity(longer.len());
        for j in 0..aligned {
            neurons.push(NeuronGene::combine(
                &first.neurons[j],
                &second.neurons[j],
                averaging,
                rng,
            ));
        }
        // Excess units inherit from the longer parent,
        // each with an even chance of being carried over.
        for neuron in &longer[aligned..] {
            if rng.gen::<bool>() {
                neurons.push(neuron.clone());
            }
        }

        let mut output_biases = first.output_biases;
        for (bias, other) in output_biases.iter_mut().zip(second.output_biases.iter()) {
            if averaging {
                *bias = (*bias + *other) / 2.0;
            } else if rng.gen::<bool>() {
                *bias = *other;
            }
        }

        let mut child = NavigatorGenome::new(id, birth_generation, neurons, output_biases);
        if rng.gen::<f64>() < config.child_mutation_chance {
            child.mutate(config, rng);
        }
        child
    }

    fn genetic_distance(
        first: &NavigatorGenome,
        second: &NavigatorGenome,
        config: &NavigatorGeneticConfig,
    ) -> f64 {
        let aligned = first.neurons.len().min(second.neurons.len());
        let mut total = 0.0;
        let mut count = 0;
        for j in 0..aligned {
            total += first.neurons[j].weight_difference(&second.neurons[j]);
            count += WEIGHTS_PER_NEURON;
        }
        for (a, b) in first.output_biases.iter().zip(second.output_biases.iter()) {
            total += (a - b).abs();
            count += 1;
        }
        let mean = if count == 0 { 0.0 } else { total / count as f64 };
        let disparity = first.neurons.len().abs_diff(second.neurons.len()) as f64;
        config.common_weight_factor * mean + config.disparity_factor * disparity
    }

    fn decode(&self, _config: &NavigatorGeneticConfig) -> Option<NavigatorNetwork> {
        if self.neurons.is_empty() {
            return None;
        }
        let finite = self.neurons.iter().all(NeuronGene::is_finite)
            && self.output_biases.iter().all(|b| b.is_finite());
        finite.then(|| NavigatorNetwork::from(self))
    }

    fn id(&self) -> GenomeId {
        self.id
    }

    fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    fn complexity(&self) -> f64 {
        (self.neurons.len() * WEIGHTS_PER_NEURON + OUTPUT_COUNT) as f64
    }

    fn evaluation_info(&self) -> &EvaluationInfo {
        &self.info
    }

    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo {
        &mut self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> NavigatorGeneticConfig {
        NavigatorGeneticConfig {
            initial_hidden_count: std::num::NonZeroUsize::new(2).unwrap(),
            max_hidden_count: std::num::NonZeroUsize::new(4).unwrap(),
            weight_bound: 5.0,
            initial_weight_power: 1.0,
            weight_reset_chance: 0.1,
            weight_nudge_chance: 0.9,
            weight_mutation_power: 0.5,
            neuron_addition_mutation_chance: 0.05,
            neuron_deletion_mutation_chance: 0.05,
            child_mutation_chance: 0.5,
            mate_by_averaging_chance: 0.4,
            common_weight_factor: 1.0,
            disparity_factor: 1.0,
            ..NavigatorGeneticConfig::zero()
        }
    }

    #[test]
    fn random_genomes_decode() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(0);
        for id in 0..20 {
            let genome = NavigatorGenome::random(id, 0, &config, &mut rng);
            assert_eq!(genome.neurons().len(), 2);
            assert!(genome.decode(&config).is_some());
        }
    }

    #[test]
    fn empty_hidden_layer_is_degenerate() {
        let genome = NavigatorGenome::new(0, 0, Vec::new(), [0.0; OUTPUT_COUNT]);
        assert!(genome.decode(&config()).is_none());
    }

    #[test]
    fn non_finite_weights_are_degenerate() {
        let mut neuron = NeuronGene {
            input_weights: [0.0; SENSOR_COUNT + 1],
            recurrent_weight: 0.0,
            output_weights: [0.0; OUTPUT_COUNT],
        };
        neuron.input_weights[3] = f64::NAN;
        let genome = NavigatorGenome::new(0, 0, vec![neuron], [0.0; OUTPUT_COUNT]);
        assert!(genome.decode(&config()).is_none());
    }

    #[test]
    fn spawning_perturbs_weights() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(1);
        let parent = NavigatorGenome::random(0, 0, &config, &mut rng);
        let child = parent.spawn(1, 3, &config, &mut rng);
        assert_eq!(child.id(), 1);
        assert_eq!(child.birth_generation(), 3);
        assert!(NavigatorGenome::genetic_distance(&parent, &child, &config) > 0.0);
    }

    #[test]
    fn mating_respects_identity_and_bounds() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(2);
        let first = NavigatorGenome::random(0, 0, &config, &mut rng);
        let second = NavigatorGenome::random(1, 0, &config, &mut rng);
        let child = NavigatorGenome::mate(&first, &second, 2, 1, &config, &mut rng);
        assert_eq!(child.id(), 2);
        assert!(!child.neurons().is_empty());
        assert!(child.neurons().len() <= config.max_hidden_count.get());
        assert_eq!(child.evaluation_info().evaluation_count, 0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(3);
        let genome = NavigatorGenome::random(0, 0, &config, &mut rng);
        assert_eq!(
            NavigatorGenome::genetic_distance(&genome, &genome, &config),
            0.0
        );
    }

    #[test]
    fn serde_round_trip_preserves_genes() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(4);
        let genome = NavigatorGenome::random(9, 2, &config, &mut rng);
        let text = serde_json::to_string(&genome).unwrap();
        let back: NavigatorGenome = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id(), 9);
        assert_eq!(back.neurons(), genome.neurons());
    }
}
