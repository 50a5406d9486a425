use anyhow::Context;
use binscan::{histogram_sequential, Engine, HistogramConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_VALUES: [u32; 8] = [0, 7, 8, 10, 24, 48, 73, 120];

fn parse_values() -> anyhow::Result<Vec<u32>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return Ok(DEFAULT_VALUES.to_vec());
    }

    args.iter()
        .map(|arg| {
            arg.parse::<u32>()
                .with_context(|| format!("'{arg}' is not a non-negative integer"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = HistogramConfig::default().with_env_overrides();
    let values = parse_values()?;
    let engine = Engine::from_config(&config).context("invalid configuration")?;

    let parallel = engine
        .histogram(&values, &config)
        .await
        .context("parallel pipeline failed")?;

    println!("\n=== PARALLEL SOLUTION =======================================\n");
    print!("{parallel}");
    println!("\n=============================================================\n");

    let sequential =
        histogram_sequential(&values, &config).context("sequential pipeline failed")?;

    println!("\n=== SEQUENTIAL SOLUTION =====================================\n");
    print!("{sequential}");
    println!("\n=============================================================\n");

    anyhow::ensure!(
        parallel == sequential,
        "parallel and sequential pipelines disagree"
    );

    Ok(())
}
