use ccal::{cluster_consensus, ConsensusConfig, DataMatrix};
use ndarray::Array2;
use rand::prelude::*;
use rand_distr::Normal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Minimal end-to-end: synthetic expression matrix -> consensus NMF -> k + labels.
    tracing_subscriber::fmt().with_target(false).init();

    // Four programs of 8 features each; 60 samples spread evenly across them.
    let n_programs = 4;
    let n_samples = 60;
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.4)?;
    let values = Array2::from_shape_fn((8 * n_programs, n_samples), |(f, s)| {
        let base: f64 = if f / 8 == s % n_programs { 4.0 } else { 0.8 };
        (base + rng.sample(noise)).max(0.0)
    });
    let matrix = DataMatrix::new(values)?;

    let config = ConsensusConfig::default()
        .with_k_range(2..=6)
        .with_trials_per_k(40);
    let result = cluster_consensus(&matrix, &config)?;

    println!("k  cophenetic  non-converged");
    for c in &result.candidates {
        println!(
            "{}  {:.4}      {}",
            c.k,
            c.cophenetic,
            c.consensus.non_converged_trials()
        );
    }
    println!("selected k = {}", result.selected_k);

    let mut by_label: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
    for (sample, label) in result.labels.iter().enumerate() {
        by_label.entry(*label).or_default().push(sample);
    }
    for (label, samples) in by_label {
        println!("  cluster {label}: {samples:?}");
    }

    Ok(())
}
