use ccal::{score_rows_against_target, ScoringConfig};
use ndarray::Array2;
use rand::prelude::*;
use rand_distr::Normal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    // A continuous phenotype and 200 features: the first five track it
    // (two of them non-monotonically), the rest are noise.
    let n = 80;
    let mut rng = StdRng::seed_from_u64(11);
    let noise = Normal::new(0.0, 1.0)?;
    let phenotype: Vec<f64> = (0..n).map(|i| i as f64 / n as f64 * 4.0 - 2.0).collect();

    let mut features = Array2::<f64>::zeros((200, n));
    for (f, mut row) in features.rows_mut().into_iter().enumerate() {
        for (s, v) in row.iter_mut().enumerate() {
            let p = phenotype[s];
            let e = 0.3 * rng.sample(noise);
            *v = match f {
                0 => p + e,
                1 => -2.0 * p + e,
                2 => p.powi(3) + e,
                3 => p * p + e,
                4 => (2.0 * p).cos() + e,
                _ => rng.sample(noise),
            };
        }
    }

    let config = ScoringConfig::default().with_permutations(20);
    let mut scores = score_rows_against_target(&phenotype, features.view(), &config)?;
    scores.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));

    println!("feature  ic       p-value   fdr");
    for s in scores.iter().take(10) {
        println!(
            "{:>7}  {:+.3}   {:.4}    {:.4}",
            s.row,
            s.score,
            s.p_value.unwrap_or(f64::NAN),
            s.fdr.unwrap_or(f64::NAN)
        );
    }
    Ok(())
}
