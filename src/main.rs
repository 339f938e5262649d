use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rusty_deconv::error::DeconvError;
use rusty_deconv::recording::{load_spikes, Deconvolution, Recording};
use rusty_deconv::solver::{Lasso, Method};
use rusty_deconv::{DEFAULT_MAX_ITER, DEFAULT_TOLERANCE};

#[derive(Parser, Debug)]
struct Args {
    /// The log level
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
    /// An optional file to write the logs to, in addition to the console
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the forward model to a spike sequence and save the resulting recording
    Simulate {
        /// The spike sequence, as a JSON array
        #[arg(long)]
        spikes: PathBuf,
        /// The decay of the AR(1) model
        #[arg(short = 'g', long, default_value = "0.9")]
        gamma: f64,
        /// The noise level
        #[arg(short = 's', long, default_value = "0.0")]
        sigma: f64,
        /// The seed used for noise sampling
        #[arg(long, default_value = "0")]
        seed: u64,
        /// The output recording
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Estimate the spikes of a recording
    Deconvolve {
        /// The recording, with fields `gamma` and `trace`
        #[arg(short, long)]
        input: PathBuf,
        /// The solver
        #[arg(long, value_enum, default_value = "lasso")]
        solver: SolverKind,
        /// The weight of the L1 penalty
        #[arg(short = 'a', long, default_value = "0.001")]
        alpha: f64,
        /// The maximum number of coordinate descent sweeps
        #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
        max_iter: usize,
        /// The relative tolerance of coordinate descent
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        /// Restrict the spikes to non-negative values
        #[arg(long)]
        non_negative: bool,
        /// The output deconvolution
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SolverKind {
    Lstsq,
    Lasso,
}

fn init_logger(level: LevelFilter, log_file: Option<&PathBuf>) -> Result<(), DeconvError> {
    let pattern = "{d(%H:%M:%S)} {l} - {m}\n";
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let mut config = Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");

    if let Some(path) = log_file {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
            .build(path)
            .map_err(|e| DeconvError::IOError(e.to_string()))?;
        config = config.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config
        .build(root.build(level))
        .map_err(|e| DeconvError::IOError(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| DeconvError::IOError(e.to_string()))?;
    Ok(())
}

fn main() -> Result<(), DeconvError> {
    let args = Args::parse();
    init_logger(args.log_level, args.log_file.as_ref())?;

    match args.command {
        Command::Simulate {
            spikes,
            gamma,
            sigma,
            seed,
            output,
        } => {
            let spikes = load_spikes(&spikes)?;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let recording = Recording::simulate(spikes, gamma, sigma, &mut rng)?;
            recording.save_to(&output)?;
            log::info!(
                "Simulated recording of {} samples saved to {}",
                recording.len(),
                output.display()
            );
        }
        Command::Deconvolve {
            input,
            solver,
            alpha,
            max_iter,
            tolerance,
            non_negative,
            output,
        } => {
            let recording = Recording::load_from(&input)?;
            let method = match solver {
                SolverKind::Lstsq => Method::LeastSquares,
                SolverKind::Lasso => Method::Lasso(
                    Lasso::new(alpha)
                        .with_max_iter(max_iter)
                        .with_tolerance(tolerance)
                        .with_non_negative(non_negative),
                ),
            };
            log::debug!("Deconvolve {} with {:?}", input.display(), method);

            let deconvolution = Deconvolution::run(&recording, &method)?;
            deconvolution.save_to(&output)?;
            if let Some(rmse) = deconvolution.rmse {
                log::info!("RMSE to the ground truth: {:e}", rmse);
            }
            log::info!("Deconvolution saved to {}", output.display());
        }
    }

    Ok(())
}
