//! Genetic search over the candidate index powerset: each individual is a
//! bit-vector selecting a subset of candidates, scored by summed benefit
//! minus a constraint-violation penalty. Selection is roulette-wheel or
//! tournament (configurable), with elitism, single-point crossover, and
//! per-gene mutation. Seeded through `rand::rngs::StdRng::seed_from_u64`
//! so the same inputs and seed reproduce the same recommendations.

use crate::cancellation::CancellationToken;
use crate::config::SelectionStrategy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct Individual {
    pub genes: Vec<bool>,
    pub fitness: f64,
}

pub struct GeneticParams<'a> {
    pub benefits: &'a [f64],
    pub sizes: &'a [u64],
    pub columns_len: &'a [usize],
    pub max_num_index: usize,
    pub max_total_size_bytes: u64,
    pub max_index_columns: usize,
    pub population_size: usize,
    pub max_generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub convergence_generations: usize,
    pub convergence_ratio: f64,
    pub selection_strategy: SelectionStrategy,
    pub elite_count: usize,
    pub seed: u64,
}

fn fitness(genes: &[bool], p: &GeneticParams) -> f64 {
    let mut benefit_sum = 0.0;
    let mut count = 0usize;
    let mut total_size = 0u64;
    let mut violated = false;
    for (i, &on) in genes.iter().enumerate() {
        if !on {
            continue;
        }
        benefit_sum += p.benefits[i];
        count += 1;
        total_size += p.sizes[i];
        if p.columns_len[i] > p.max_index_columns {
            violated = true;
        }
    }
    if count > p.max_num_index || total_size > p.max_total_size_bytes {
        violated = true;
    }
    if violated {
        benefit_sum - benefit_sum.abs().max(1.0) * 2.0
    } else {
        benefit_sum
    }
}

fn select_parent(population: &[Individual], rng: &mut StdRng, strategy: SelectionStrategy) -> usize {
    match strategy {
        SelectionStrategy::Tournament => {
            let k = 3.min(population.len());
            let mut best = rng.random_range(0..population.len());
            for _ in 1..k {
                let candidate = rng.random_range(0..population.len());
                if population[candidate].fitness > population[best].fitness {
                    best = candidate;
                }
            }
            best
        }
        SelectionStrategy::Roulette => {
            let min_fitness = population.iter().map(|i| i.fitness).fold(f64::INFINITY, f64::min);
            let shift = if min_fitness < 0.0 { -min_fitness + 1e-6 } else { 1e-6 };
            let total: f64 = population.iter().map(|i| i.fitness + shift).sum();
            if total <= 0.0 {
                return rng.random_range(0..population.len());
            }
            let mut pick = rng.random::<f64>() * total;
            for (i, ind) in population.iter().enumerate() {
                pick -= ind.fitness + shift;
                if pick <= 0.0 {
                    return i;
                }
            }
            population.len() - 1
        }
    }
}

fn crossover(a: &[bool], b: &[bool], rng: &mut StdRng) -> (Vec<bool>, Vec<bool>) {
    let n = a.len();
    if n < 2 {
        return (a.to_vec(), b.to_vec());
    }
    let point = rng.random_range(1..n);
    let mut c1 = a[..point].to_vec();
    c1.extend_from_slice(&b[point..]);
    let mut c2 = b[..point].to_vec();
    c2.extend_from_slice(&a[point..]);
    (c1, c2)
}

fn mutate(genes: &mut [bool], rate: f64, rng: &mut StdRng) {
    for g in genes.iter_mut() {
        if rng.random_bool(rate) {
            *g = !*g;
        }
    }
}

fn best_of(population: &[Individual]) -> Individual {
    population
        .iter()
        .cloned()
        .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal))
        .expect("population is never empty")
}

/// Run the genetic search and return the best individual found. Stops early
/// on cancellation, on fitness convergence held for `convergence_generations`
/// generations, or at `max_generations`, whichever comes first.
pub fn search(params: &GeneticParams, token: &CancellationToken) -> Individual {
    let n = params.benefits.len();
    if n == 0 {
        return Individual { genes: Vec::new(), fitness: 0.0 };
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut population: Vec<Individual> = (0..params.population_size.max(1))
        .map(|_| {
            let genes: Vec<bool> = (0..n).map(|_| rng.random_bool(0.3)).collect();
            let f = fitness(&genes, params);
            Individual { genes, fitness: f }
        })
        .collect();

    let mut best = best_of(&population);
    let mut stale_generations = 0usize;

    for _generation in 0..params.max_generations.max(1) {
        if token.is_cancelled() {
            break;
        }

        let mut sorted = population.clone();
        sorted.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal));
        let mut next_gen: Vec<Individual> = sorted.into_iter().take(params.elite_count).collect();

        while next_gen.len() < population.len() {
            let p1 = select_parent(&population, &mut rng, params.selection_strategy);
            let p2 = select_parent(&population, &mut rng, params.selection_strategy);
            let (mut c1, mut c2) = if rng.random_bool(params.crossover_rate) {
                crossover(&population[p1].genes, &population[p2].genes, &mut rng)
            } else {
                (population[p1].genes.clone(), population[p2].genes.clone())
            };
            mutate(&mut c1, params.mutation_rate, &mut rng);
            mutate(&mut c2, params.mutation_rate, &mut rng);
            let f1 = fitness(&c1, params);
            next_gen.push(Individual { genes: c1, fitness: f1 });
            if next_gen.len() < population.len() {
                let f2 = fitness(&c2, params);
                next_gen.push(Individual { genes: c2, fitness: f2 });
            }
        }
        population = next_gen;

        let generation_best = best_of(&population);
        if generation_best.fitness > best.fitness {
            best = generation_best;
        }

        let avg: f64 = population.iter().map(|i| i.fitness).sum::<f64>() / population.len() as f64;
        let ratio = if best.fitness.abs() > 1e-9 { (best.fitness - avg).abs() / best.fitness.abs() } else { 0.0 };
        if ratio < params.convergence_ratio {
            stale_generations += 1;
        } else {
            stale_generations = 0;
        }
        if stale_generations >= params.convergence_generations {
            break;
        }
    }

    best
}
