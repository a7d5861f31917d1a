use std::env;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use cosyne_experiments::cosyne::activation::Activation;
use cosyne_experiments::cosyne::common::Config;
use cosyne_experiments::cosyne::error::ConfigError;
use cosyne_experiments::cosyne::evolved_layer::EvolvedLayer;
use cosyne_experiments::cosyne::network::LayerStack;
use cosyne_experiments::cosyne::pool::WorkerPool;
use cosyne_experiments::cosyne::registry::IdRegistry;
use cosyne_experiments::cosyne::vector::RealVector;

const MAX_STEPS: usize = 50_000;

// a[0]*x^3 + a[1]*x^2 + a[2]*x + a[3]
fn evaluate_polynomial(poly: &RealVector, x: f64) -> f64 {
    x.powi(3) * poly[0] + x.powi(2) * poly[1] + x * poly[2] + poly[3]
}

fn main() -> Result<(), ConfigError> {
    let config = match env::args().nth(1) {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    println!("seed: {seed}");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut registry = IdRegistry::default();
    let pool = WorkerPool::new(config.threads)?;

    let hidden = EvolvedLayer::setup(&mut rng, &mut registry, 4, 16, &config.layer)?.with_activation(Activation::ReLu);
    let out = EvolvedLayer::setup(&mut rng, &mut registry, 16, 1, &config.layer)?;
    let mut stack = LayerStack::create();
    stack.add_layer("hidden", Box::new(hidden))?;
    stack.add_layer("out", Box::new(out))?;

    // look for a root of the polynomial with these coefficients
    let coefficients = RealVector::from(vec![0.25, 0.5, 0.6, 0.4]);
    let mut best_reward = f64::NEG_INFINITY;
    for step in 1..=MAX_STEPS {
        let x = stack.fire(&coefficients)[0];
        let reward = -evaluate_polynomial(&coefficients, x).abs();
        if reward > best_reward {
            println!("best reward: {reward:.6} at step {step}, x = {x:.6}");
            best_reward = reward;
        }
        stack.apply_reward(reward);
        stack.shuttle(&pool);
    }
    Ok(())
}
