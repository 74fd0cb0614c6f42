//! Minimal genome and evaluator used by the crate's own
//! tests. The genome is a single scalar "trait"; the
//! evaluator's criterion is a threshold on that trait.

use crate::evaluation::{EvaluationCounter, MccEvaluator};
use crate::genome::{EvaluationInfo, Genome, GenomeId, IdSequence};

use rand::Rng;

use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct CountingConfig {
    /// Whether offspring decode successfully. Switched off
    /// to exercise the reproduction-retry path.
    pub offspring_decodable: bool,
}

impl Default for CountingConfig {
    fn default() -> CountingConfig {
        CountingConfig {
            offspring_decodable: true,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CountingGenome {
    id: GenomeId,
    birth_generation: usize,
    pub trait_value: f64,
    decodable: bool,
    info: EvaluationInfo,
}

impl CountingGenome {
    pub fn with_trait(id: GenomeId, trait_value: f64) -> CountingGenome {
        CountingGenome {
            id,
            birth_generation: 0,
            trait_value,
            decodable: true,
            info: EvaluationInfo::default(),
        }
    }
}

impl Genome for CountingGenome {
    type Config = CountingConfig;
    type Phenome = f64;

    fn random<R: Rng>(
        id: GenomeId,
        birth_generation: usize,
        _config: &CountingConfig,
        rng: &mut R,
    ) -> CountingGenome {
        CountingGenome {
            id,
            birth_generation,
            trait_value: rng.gen::<f64>(),
            decodable: true,
            info: EvaluationInfo::default(),
        }
    }

    fn spawn<R: Rng>(
        &self,
        id: GenomeId,
        birth_generation: usize,
        config: &CountingConfig,
        rng: &mut R,
    ) -> CountingGenome {
        CountingGenome {
            id,
            birth_generation,
            trait_value: self.trait_value + rng.gen::<f64>() - 0.5,
            decodable: config.offspring_decodable,
            info: EvaluationInfo::default(),
        }
    }

    fn mate<R: Rng>(
        first: &CountingGenome,
        second: &CountingGenome,
        id: GenomeId,
        birth_generation: usize,
        config: &CountingConfig,
        _rng: &mut R,
    ) -> CountingGenome {
        CountingGenome {
            id,
            birth_generation,
            trait_value: (first.trait_value + second.trait_value) / 2.0,
            decodable: config.offspring_decodable,
            info: EvaluationInfo::default(),
        }
    }

    fn genetic_distance(
        first: &CountingGenome,
        second: &CountingGenome,
        _config: &CountingConfig,
    ) -> f64 {
        (first.trait_value - second.trait_value).abs()
    }

    fn decode(&self, _config: &CountingConfig) -> Option<f64> {
        self.decodable.then(|| self.trait_value)
    }

    fn id(&self) -> GenomeId {
        self.id
    }

    fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    fn complexity(&self) -> f64 {
        1.0
    }

    fn evaluation_info(&self) -> &EvaluationInfo {
        &self.info
    }

    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo {
        &mut self.info
    }
}

/// Judges a genome viable when its trait value reaches a
/// threshold, and records every opponent snapshot it is
/// handed, for coupling assertions.
pub(crate) struct ThresholdEvaluator {
    threshold: f64,
    evaluations: u64,
    pub opponent_ids: Vec<GenomeId>,
    pub update_calls: usize,
    counter: Option<EvaluationCounter>,
}

impl ThresholdEvaluator {
    pub fn new(threshold: f64) -> ThresholdEvaluator {
        ThresholdEvaluator {
            threshold,
            evaluations: 0,
            opponent_ids: Vec::new(),
            update_calls: 0,
            counter: None,
        }
    }

    pub fn counting(mut self, counter: EvaluationCounter) -> ThresholdEvaluator {
        self.counter = Some(counter);
        self
    }
}

impl MccEvaluator<CountingGenome> for ThresholdEvaluator {
    type Opponent = CountingGenome;

    fn update_opponents(&mut self, opponents: &[CountingGenome]) {
        self.opponent_ids = opponents.iter().map(|g| g.id()).collect();
        self.update_calls += 1;
    }

    fn evaluate_batch(&mut self, offspring: &mut [CountingGenome], _generation: usize) {
        for genome in offspring.iter_mut() {
            self.evaluations += 1;
            if let Some(counter) = &self.counter {
                counter.increment();
            }
            let value = genome.trait_value;
            let info = genome.evaluation_info_mut();
            info.fitness = value;
            info.is_viable = value >= self.threshold;
            info.evaluation_count += 1;
        }
    }

    fn evaluation_count(&self) -> u64 {
        self.evaluations
    }

    fn reset(&mut self) {
        self.evaluations = 0;
        self.opponent_ids.clear();
        self.update_calls = 0;
    }
}

pub(crate) fn seed_genomes(ids: &Arc<IdSequence>, count: usize) -> Vec<CountingGenome> {
    (0..count)
        .map(|i| CountingGenome::with_trait(ids.next_id(), i as f64 * 0.1))
        .collect()
}
