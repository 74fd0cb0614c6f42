use crate::genomics::{uniform, MazeGeneticConfig};
use crate::geometry::{Point, Segment};
use crate::structure::MazeStructure;
use crate::world::NAVIGATOR_RADIUS;

use oximcc::{EvaluationInfo, Genome, GenomeId};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallOrientation {
    Horizontal,
    Vertical,
}

impl WallOrientation {
    fn flipped(self) -> WallOrientation {
        match self {
            WallOrientation::Horizontal => WallOrientation::Vertical,
            WallOrientation::Vertical => WallOrientation::Horizontal,
        }
    }
}

/// One wall of an evolvable maze, in coordinates relative
/// to the subspace it will subdivide: where across the
/// subspace the wall sits, where along the wall its
/// passage gap sits, and which way it runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallGene {
    /// Position of the wall across its subspace, in [0, 1].
    pub wall_position: f64,
    /// Position of the passage gap along the wall, in [0, 1].
    pub passage_position: f64,
    pub orientation: WallOrientation,
}

impl WallGene {
    fn random<R: Rng>(rng: &mut R) -> WallGene {
        WallGene {
            wall_position: rng.gen::<f64>(),
            passage_position: rng.gen::<f64>(),
            orientation: if rng.gen::<bool>() {
                WallOrientation::Horizontal
            } else {
                WallOrientation::Vertical
            },
        }
    }
}

/// An axis-aligned free subspace of the maze during
/// decoding.
#[derive(Clone, Copy, Debug)]
struct Cell {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Cell {
    fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// An evolvable maze: an ordered list of wall genes
/// decoded by recursive subdivision of the maze rectangle.
/// Each gene splits the roomiest remaining subspace with
/// one wall and one passage gap; genes that no longer fit
/// express no wall.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeGenome {
    id: GenomeId,
    birth_generation: usize,
    walls: Vec<WallGene>,
    info: EvaluationInfo,
}

impl MazeGenome {
    /// Builds a genome from explicit wall genes. An empty
    /// gene list decodes to an open (boundary-only) maze.
    pub fn new(id: GenomeId, birth_generation: usize, walls: Vec<WallGene>) -> MazeGenome {
        MazeGenome {
            id,
            birth_generation,
            walls,
            info: EvaluationInfo::default(),
        }
    }

    pub fn wall_genes(&self) -> &[WallGene] {
        &self.walls
    }

    fn mutate<R: Rng>(&mut self, config: &MazeGeneticConfig, rng: &mut R) {
        for gene in &mut self.walls {
            if rng.gen::<f64>() < config.position_mutation_chance {
                gene.wall_position = (gene.wall_position
                    + uniform(rng, config.position_mutation_power))
                .clamp(0.0, 1.0);
            }
            if rng.gen::<f64>() < config.position_mutation_chance {
                gene.passage_position = (gene.passage_position
                    + uniform(rng, config.position_mutation_power))
                .clamp(0.0, 1.0);
            }
            if rng.gen::<f64>() < config.orientation_flip_chance {
                gene.orientation = gene.orientation.flipped();
            }
        }
        if self.walls.len() < config.max_wall_count.get()
            && rng.gen::<f64>() < config.wall_addition_mutation_chance
        {
            self.walls.push(WallGene::random(rng));
        }
        if !self.walls.is_empty() && rng.gen::<f64>() < config.wall_deletion_mutation_chance {
            let index = rng.gen_range(0..self.walls.len());
            self.walls.remove(index);
        }
    }
}

impl Genome for MazeGenome {
    type Config = MazeGeneticConfig;
    type Phenome = MazeStructure;

    fn random<R: Rng>(
        id: GenomeId,
        birth_generation: usize,
        config: &MazeGeneticConfig,
        rng: &mut R,
    ) -> MazeGenome {
        let walls = (0..config.initial_wall_count)
            .map(|_| WallGene::random(rng))
            .collect();
        MazeGenome::new(id, birth_generation, walls)
    }

    fn spawn<R: Rng>(
        &self,
        id: GenomeId,
        birth_generation: usize,
        config: &MazeGeneticConfig,
        rng: &mut R,
    ) -> MazeGenome {
        let mut child = MazeGenome::new(id, birth_generation, self.walls.clone());
        child.mutate(config, rng);
        child
    }

    fn mate<R: Rng>(
        first: &MazeGenome,
        second: &MazeGenome,
        id: GenomeId,
        birth_generation: usize,
        config: &MazeGeneticConfig,
        rng: &mut R,
    ) -> MazeGenome {
        // One-point splice of the two wall lists.
        let cut_first = rng.gen_range(0..=first.walls.len());
        let cut_second = rng.gen_range(0..=second.walls.len());
        let mut walls = first.walls[..cut_first].to_vec();
        walls.extend_from_slice(&second.walls[cut_second..]);
        walls.truncate(config.max_wall_count.get());

        let mut child = MazeGenome::new(id, birth_generation, walls);
        if rng.gen::<f64>() < config.child_mutation_chance {
            child.mutate(config, rng);
        }
        child
    }

    fn genetic_distance(
        first: &MazeGenome,
        second: &MazeGenome,
        config: &MazeGeneticConfig,
    ) -> f64 {
        let aligned = first.walls.len().min(second.walls.len());
        let mut total = 0.0;
        for j in 0..aligned {
            let (a, b) = (&first.walls[j], &second.walls[j]);
            total += (a.wall_position - b.wall_position).abs()
                + (a.passage_position - b.passage_position).abs()
                + if a.orientation == b.orientation { 0.0 } else { 1.0 };
        }
        let mean = if aligned == 0 {
            0.0
        } else {
            total / (aligned * 3) as f64
        };
        let disparity = first.walls.len().abs_diff(second.walls.len()) as f64;
        config.position_factor * mean + config.wall_count_factor * disparity
    }

    /// Decodes the gene list into simulation walls.
    ///
    /// Returns `None` if a wall encroaches on the start or
    /// goal point; such a maze would trap or instantly
    /// collide the navigator.
    fn decode(&self, config: &MazeGeneticConfig) -> Option<MazeStructure> {
        let (w, h) = (config.width, config.height);
        let mut walls = vec![
            Segment::new(Point::new(0.0, 0.0), Point::new(w, 0.0)),
            Segment::new(Point::new(w, 0.0), Point::new(w, h)),
            Segment::new(Point::new(w, h), Point::new(0.0, h)),
            Segment::new(Point::new(0.0, h), Point::new(0.0, 0.0)),
        ];
        let mut cells = vec![Cell {
            x0: 0.0,
            y0: 0.0,
            x1: w,
            y1: h,
        }];
        let mut expressed = 0;

        for gene in &self.walls {
            let index = roomiest_cell(&cells);
            let cell = cells[index];
            let passage = config.passage_width;
            match gene.orientation {
                WallOrientation::Horizontal => {
                    if cell.height() < 2.0 * passage || cell.width() <= passage {
                        continue;
                    }
                    let y = cell.y0
                        + (cell.height() * gene.wall_position)
                            .clamp(passage, cell.height() - passage);
                    let gap_start = cell.x0 + (cell.width() - passage) * gene.passage_position;
                    let gap_end = gap_start + passage;
                    if gap_start > cell.x0 {
                        walls.push(Segment::new(
                            Point::new(cell.x0, y),
                            Point::new(gap_start, y),
                        ));
                    }
                    if gap_end < cell.x1 {
                        walls.push(Segment::new(Point::new(gap_end, y), Point::new(cell.x1, y)));
                    }
                    cells[index] = Cell { y1: y, ..cell };
                    cells.push(Cell { y0: y, ..cell });
                }
                WallOrientation::Vertical => {
                    if cell.width() < 2.0 * passage || cell.height() <= passage {
                        continue;
                    }
                    let x = cell.x0
                        + (cell.width() * gene.wall_position)
                            .clamp(passage, cell.width() - passage);
                    let gap_start = cell.y0 + (cell.height() - passage) * gene.passage_position;
                    let gap_end = gap_start + passage;
                    if gap_start > cell.y0 {
                        walls.push(Segment::new(
                            Point::new(x, cell.y0),
                            Point::new(x, gap_start),
                        ));
                    }
                    if gap_end < cell.y1 {
                        walls.push(Segment::new(Point::new(x, gap_end), Point::new(x, cell.y1)));
                    }
                    cells[index] = Cell { x1: x, ..cell };
                    cells.push(Cell { x0: x, ..cell });
                }
            }
            expressed += 1;
        }

        let start = Point::new(config.endpoint_offset, config.endpoint_offset);
        let goal = Point::new(w - config.endpoint_offset, h - config.endpoint_offset);
        let blocked = walls.iter().any(|wall| {
            wall.distance_to_point(start) < NAVIGATOR_RADIUS
                || wall.distance_to_point(goal) < NAVIGATOR_RADIUS
        });
        if blocked {
            return None;
        }

        Some(MazeStructure {
            walls,
            start,
            goal,
            width: w,
            height: h,
            max_timesteps: config.base_timesteps + config.timesteps_per_wall * expressed,
        })
    }

    fn id(&self) -> GenomeId {
        self.id
    }

    fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    fn complexity(&self) -> f64 {
        self.walls.len() as f64
    }

    fn evaluation_info(&self) -> &EvaluationInfo {
        &self.info
    }

    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo {
        &mut self.info
    }
}

fn roomiest_cell(cells: &[Cell]) -> usize {
    cells
        .iter()
        .enumerate()
        .max_by(|a, b| {
            a.1.area()
                .partial_cmp(&b.1.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)
        .unwrap_or_else(|| panic!("maze decoding lost every subspace"))
}
