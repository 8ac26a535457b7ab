use ferrite_aebigru::{AeBiGruClusterer, AeBiGruConfig, Result, TimeSeriesBatch};

/// Two families of noisy sine waves with different frequencies.
fn synthetic(n_per_class: usize, n_timepoints: usize) -> Result<TimeSeriesBatch> {
    let mut cases = Vec::with_capacity(2 * n_per_class);
    for class in 0..2 {
        let freq = if class == 0 { 0.3 } else { 1.1 };
        for i in 0..n_per_class {
            let phase = i as f64 * 0.2;
            let series = (0..n_timepoints)
                .map(|t| (t as f64 * freq + phase).sin() + 0.05 * ((i * 7 + t * 3) % 5) as f64)
                .collect();
            cases.push(vec![series]);
        }
    }
    TimeSeriesBatch::from_nested(&cases)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let data = synthetic(10, 24)?;
    let config = AeBiGruConfig {
        n_clusters: Some(2),
        latent_space_dim: 4,
        n_layers: 1,
        n_units: Some(8.into()),
        activation: "tanh".into(),
        n_epochs: 40,
        batch_size: 4,
        random_state: Some(7),
        file_path: std::env::temp_dir().display().to_string() + "/",
        ..AeBiGruConfig::default()
    };

    let mut clusterer = AeBiGruClusterer::new(config)?;
    clusterer.fit(&data)?;

    let history = clusterer.history()?;
    println!("loss: {:.5} -> {:.5}", history.loss()[0], history.best_loss().unwrap_or(f64::NAN));
    println!("labels: {:?}", clusterer.predict(&data)?);
    println!("score:  {:.5}", clusterer.score(&data)?);
    Ok(())
}
