//! A genetic algorithm that breeds rhythm variants from a target pulse list.

use crate::{
    pulse::{Pulse, Rhythm},
    seed::RandomStream,
};

// -------------------------------------------------------------------------------------------------

/// Number of generations a [`Genome`] runs before its variants are collected.
pub const GENERATIONS: usize = 40;

const EPSILON: f64 = 0.00001;

// -------------------------------------------------------------------------------------------------

/// A gene: divisor, multiplier and whether the pulse sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gene {
    divisor: u64,
    multiplier: u64,
    sounding: bool,
}

impl Gene {
    fn from_pulse(pulse: &Pulse) -> Self {
        Self {
            divisor: pulse.divisor(),
            multiplier: pulse.multiplier(),
            sounding: !pulse.is_rest(),
        }
    }

    fn beats(&self) -> f64 {
        self.multiplier as f64 / self.divisor as f64
    }

    fn to_pulse(self) -> Result<Pulse, String> {
        let accent = if self.sounding { 1.0 } else { 0.0 };
        Pulse::new(self.divisor as i64, self.multiplier as i64, accent)
    }
}

fn same_duration(a: &Gene, b: &Gene) -> bool {
    (a.beats() - b.beats()).abs() < EPSILON
}

/// Total, sounding and resting duration in beats.
fn durations(genes: &[Gene]) -> (f64, f64, f64) {
    let mut sounding = 0.0;
    let mut resting = 0.0;
    for gene in genes {
        if gene.sounding {
            sounding += gene.beats();
        } else {
            resting += gene.beats();
        }
    }
    (sounding + resting, sounding, resting)
}

/// Two distinct ordered loci for vectors of three or more genes.
fn two_loci(len: usize, rand: &mut RandomStream) -> (usize, usize) {
    match len {
        0 | 1 => (0, 0),
        2 => (0, 1),
        _ => {
            let p = rand.index(len);
            let mut q = rand.index(len);
            while q == p {
                q = rand.index(len);
            }
            (p.min(q), p.max(q))
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Chromosome {
    genes: Vec<Gene>,
    fitness: f64,
}

impl Chromosome {
    fn random(alleles: &[Gene], len: usize, rand: &mut RandomStream) -> Self {
        let genes = (0..len).map(|_| alleles[rand.index(alleles.len())]).collect();
        Self {
            genes,
            fitness: 0.0,
        }
    }

    /// Distance to the target. 0 is a perfect match.
    fn evaluate(&mut self, target: &[Gene]) {
        let (duration, sounding, resting) = durations(&self.genes);
        let (fit_duration, fit_sounding, fit_resting) = durations(target);
        let difference = |a: f64, b: f64| {
            let d = (a - b).abs();
            if d < EPSILON {
                0.0
            } else {
                d
            }
        };
        let mut gene_matches = 0;
        let mut value_matches = 0;
        for (gene, fit) in self.genes.iter().zip(target) {
            if same_duration(gene, fit) {
                value_matches += 1;
                if gene.sounding == fit.sounding {
                    gene_matches += 1;
                }
            }
        }
        let len = self.genes.len() as f64;
        let gene_score = (len - gene_matches as f64) * duration / len;
        let value_score = (len - value_matches as f64) * duration / len;
        self.fitness = difference(duration, fit_duration) * 2.33
            + difference(resting, fit_resting) * 1.5
            + difference(sounding, fit_sounding) * 1.5
            + gene_score
            + value_score * 0.666;
    }

    fn mutate(&mut self, rate: f64, rand: &mut RandomStream) {
        if rand.unit() >= rate || self.genes.is_empty() {
            return;
        }
        let len = self.genes.len();
        match rand.index(5) {
            // reverse an inner segment
            0 => {
                let (p, q) = two_loci(len, rand);
                self.genes[p..=q].reverse();
            }
            // equivalent ratio
            1 => {
                let gene = &mut self.genes[rand.index(len)];
                let halve = rand.index(2) == 1;
                let factor = if gene.divisor % 2 == 0 && gene.multiplier % 2 == 0 {
                    2
                } else if gene.divisor % 3 == 0 && gene.multiplier % 3 == 0 {
                    3
                } else if halve {
                    gene.divisor *= 2;
                    gene.multiplier *= 2;
                    return;
                } else {
                    gene.divisor *= 3;
                    gene.multiplier *= 3;
                    return;
                };
                if halve {
                    gene.divisor /= factor;
                    gene.multiplier /= factor;
                } else {
                    gene.divisor *= factor;
                    gene.multiplier *= factor;
                }
            }
            // step the divisor
            2 => {
                let gene = &mut self.genes[rand.index(len)];
                if gene.divisor == 1 || rand.index(2) == 1 {
                    gene.divisor += 1;
                } else {
                    gene.divisor -= 1;
                }
            }
            // step the multiplier
            3 => {
                let index = rand.index(len);
                let divisor = self.genes[index].divisor;
                let grow = self.genes[index].multiplier == 1 || rand.index(2) == 1;
                let gene = &mut self.genes[index];
                if grow {
                    let value = if divisor <= 1 {
                        1
                    } else {
                        1 + rand.index(divisor as usize - 1) as u64
                    };
                    gene.multiplier += value;
                } else {
                    let value = 1 + rand.index(gene.multiplier as usize - 1) as u64;
                    gene.multiplier -= value;
                }
            }
            // flip note and rest
            _ => {
                let gene = &mut self.genes[rand.index(len)];
                gene.sounding = !gene.sounding;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Breeds a population of rhythms towards a target rhythm and collects the distinct best
/// variants found on the way.
///
/// # Examples:
///
/// ```rust
/// use athenacl::{genetic::Genome, seed::RandomStream, Rhythm};
/// let target = Rhythm::try_from("(3,1,1),(3,1,1),(6,1,1),(6,3,1),(3,1,0)").unwrap();
/// let mut rand = RandomStream::new(Some(1));
/// let mut genome = Genome::new(&target, 20, 0.7, 0.06, 0.01, &mut rand).unwrap();
/// let variants = genome.generate(10, &mut rand).unwrap();
/// assert!(!variants.is_empty());
/// assert!(variants.iter().all(|rhythm| rhythm.len() == 5));
/// ```
#[derive(Debug, Clone)]
pub struct Genome {
    target: Vec<Gene>,
    alleles: Vec<Gene>,
    population: Vec<Chromosome>,
    crossover_rate: f64,
    mutation_rate: f64,
    elite_rate: f64,
}

impl Genome {
    pub fn new(
        target: &Rhythm,
        population_size: usize,
        crossover_rate: f64,
        mutation_rate: f64,
        elite_rate: f64,
        rand: &mut RandomStream,
    ) -> Result<Self, String> {
        if target.len() <= 2 {
            return Err("pulse list error: supply a rhythm of 3 or more pulses".to_string());
        }
        if population_size < 2 {
            return Err("population size must be 2 or greater".to_string());
        }
        for (name, rate) in [
            ("crossover rate", crossover_rate),
            ("mutation rate", mutation_rate),
            ("percent elite", elite_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("range error: {} must be between 0 and 1.", name));
            }
        }
        let target = target.iter().map(Gene::from_pulse).collect::<Vec<_>>();
        let mut alleles = Vec::new();
        for gene in &target {
            if !alleles.contains(gene) {
                alleles.push(*gene);
            }
        }
        let mut genome = Self {
            target,
            alleles,
            population: Vec::new(),
            crossover_rate,
            mutation_rate,
            elite_rate,
        };
        genome.population = (0..population_size)
            .map(|_| genome.seeded_chromosome(rand))
            .collect();
        genome.sort();
        Ok(genome)
    }

    fn seeded_chromosome(&self, rand: &mut RandomStream) -> Chromosome {
        let mut chromosome = Chromosome::random(&self.alleles, self.target.len(), rand);
        chromosome.evaluate(&self.target);
        // a chromosome that already matches gets shaken once
        if chromosome.fitness <= 0.1 {
            chromosome.mutate(1.0, rand);
            chromosome.evaluate(&self.target);
        }
        chromosome
    }

    fn sort(&mut self) {
        self.population
            .sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    }

    /// Fitness of the best chromosome; 0 is a perfect match.
    pub fn best_fitness(&self) -> f64 {
        self.population.first().map(|c| c.fitness).unwrap_or(f64::MAX)
    }

    pub fn average_fitness(&self) -> f64 {
        let sum = self.population.iter().map(|c| c.fitness).sum::<f64>();
        sum / self.population.len() as f64
    }

    /// Roulette wheel selection where lower distances get larger slices.
    fn select_parent(&self, rand: &mut RandomStream) -> usize {
        let worst = self
            .population
            .iter()
            .map(|c| c.fitness)
            .fold(0.0, f64::max)
            * 1.5;
        let weights = self
            .population
            .iter()
            .map(|c| worst - c.fitness)
            .collect::<Vec<_>>();
        rand.weighted_index(&weights)
    }

    fn parents(&self, rand: &mut RandomStream) -> (usize, usize) {
        let mom = self.select_parent(rand);
        for _ in 0..100 {
            let dad = self.select_parent(rand);
            if dad != mom {
                return (dad, mom);
            }
        }
        let mut dad = rand.index(self.population.len());
        if dad == mom {
            dad = (mom + 1) % self.population.len();
        }
        (dad, mom)
    }

    /// Two point crossover, or plain copies of the parents.
    fn mate(&self, dad: usize, mom: usize, rand: &mut RandomStream) -> (Vec<Gene>, Vec<Gene>) {
        let dad = &self.population[dad].genes;
        let mom = &self.population[mom].genes;
        if rand.unit() >= self.crossover_rate {
            return (dad.clone(), mom.clone());
        }
        let (p, q) = two_loci(self.target.len(), rand);
        let splice = |a: &[Gene], b: &[Gene]| {
            let mut genes = a[..p].to_vec();
            genes.extend_from_slice(&b[p..q]);
            genes.extend_from_slice(&a[q..]);
            genes
        };
        (splice(dad, mom), splice(mom, dad))
    }

    /// Breed the next generation.
    pub fn step(&mut self, rand: &mut RandomStream) {
        let size = self.population.len();
        let elite = ((self.elite_rate * size as f64).round() as usize).min(size);
        let mut next = self.population[..elite].to_vec();
        while next.len() < size {
            let (dad, mom) = self.parents(rand);
            let (son, daughter) = self.mate(dad, mom, rand);
            for genes in [son, daughter] {
                if next.len() < size {
                    let mut child = Chromosome {
                        genes,
                        fitness: 0.0,
                    };
                    child.mutate(self.mutation_rate, rand);
                    child.evaluate(&self.target);
                    next.push(child);
                }
            }
        }
        self.population = next;
        self.sort();
    }

    /// Run `generations` steps and return the distinct best rhythms of all generations,
    /// ordered from best to worst fitness.
    pub fn generate(
        &mut self,
        generations: usize,
        rand: &mut RandomStream,
    ) -> Result<Vec<Rhythm>, String> {
        let mut best: Vec<Chromosome> = Vec::new();
        for _ in 0..generations {
            self.step(rand);
            let candidate = &self.population[0];
            let known = best.iter().any(|c| {
                c.genes.iter().zip(&candidate.genes).all(|(a, b)| {
                    same_duration(a, b) && a.sounding == b.sounding
                })
            });
            if !known {
                best.push(candidate.clone());
            }
        }
        best.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        best.into_iter()
            .map(|c| {
                c.genes
                    .into_iter()
                    .map(Gene::to_pulse)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Rhythm::new)
            })
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
