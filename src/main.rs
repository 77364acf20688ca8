use clap::Parser;
use simfit_rs::config::WorkerConfig;
use simfit_rs::device::SoftwareDevice;
use simfit_rs::minimizers::{create_minimizer, GridSearch, GridSearchConfig, Minimizer};
use simfit_rs::model_list::ModelCollection;
use simfit_rs::worker::DeviceWorker;
use simfit_rs::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Fit model images to observed data", long_about = None)]
struct Cli {
    /// Data file to fit; may be given more than once
    #[arg(short = 'd', long = "data", required = true)]
    data: Vec<PathBuf>,

    /// Saved model collection (JSON)
    #[arg(short = 'm', long = "model")]
    model: PathBuf,

    /// Minimizer id
    #[arg(short = 'e', long = "engine", default_value = "gridsearch")]
    engine: String,

    /// Image width and height in pixels
    #[arg(short = 'w', long = "width")]
    width: Option<u32>,

    /// Pixel scale in mas/pixel
    #[arg(short = 's', long = "scale")]
    scale: Option<f64>,

    /// Directory for minimizer output
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Worker configuration file (JSON)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => WorkerConfig::from_json_file(path)?,
        None => WorkerConfig::default(),
    };
    if let Some(width) = cli.width {
        config = config.with_size(width, width);
    }
    if let Some(scale) = cli.scale {
        config = config.with_scale(scale);
    }

    let models = ModelCollection::open(&cli.model)?;
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), models, config)?;

    let result = fit(&worker, &cli);
    worker.shutdown();
    let result = result?;

    println!("{}", result);
    Ok(())
}

fn fit(
    worker: &simfit_rs::WorkerHandle,
    cli: &Cli,
) -> Result<simfit_rs::MinimizerResult> {
    for path in &cli.data {
        worker.load_data_file(path)?;
    }

    let mut minimizer: Box<dyn Minimizer> = match (&cli.output, cli.engine.as_str()) {
        (Some(dir), "gridsearch") => {
            std::fs::create_dir_all(dir)?;
            let config = GridSearchConfig::new().with_output(dir.join("gridsearch.txt"));
            Box::new(GridSearch::new(config))
        }
        (_, engine) => create_minimizer(engine)?,
    };

    println!("Running {}", minimizer.name());
    minimizer.minimize(worker)
}
