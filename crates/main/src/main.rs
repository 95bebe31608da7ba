use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use solar_proposal::{
    AssetSource, BrandAssets, Month, PaybackYear, ProductionSample, ProposalConfig,
    ProposalGenerator, ProposalInput,
};

/// Builds solar proposal PDFs from JSON payloads.
///
/// Fonts must be present under `assets/fonts` next to the binary or provided
/// via the `SOLAR_PROPOSAL_FONTS_DIR` environment variable. Set `RUST_LOG=debug`
/// to follow the build steps.
#[derive(Parser)]
#[command(author, version, about = "Builds solar installation proposal PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a proposal from a JSON payload and print the build summary.
    Generate {
        /// Payload with the client, equipment, production and payback data.
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the PDF. Defaults to `SOLAR_PROPOSAL_OUTPUT_DIR`
        /// or `/tmp/propostas`.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Image stretched over the cover page instead of the generated gradient.
        #[arg(long)]
        cover_background: Option<PathBuf>,

        /// Logo shown in the header of content pages.
        #[arg(long)]
        logo: Option<PathBuf>,
    },

    /// Print an example payload to stdout.
    #[command(name = "sample-input", aliases = ["sample_input", "sample"])]
    SampleInput,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            output_dir,
            cover_background,
            logo,
        } => generate(input, output_dir, cover_background, logo),
        Commands::SampleInput => print_sample_input(),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn generate(
    input: PathBuf,
    output_dir: Option<PathBuf>,
    cover_background: Option<PathBuf>,
    logo: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let payload = fs::read_to_string(&input)?;
    let proposal: ProposalInput = serde_json::from_str(&payload)?;
    proposal.validate()?;

    let config = match output_dir {
        Some(dir) => ProposalConfig::new(dir),
        None => ProposalConfig::from_env(),
    }
    .with_assets(BrandAssets {
        cover_background: cover_background.map(AssetSource::Path),
        logo: logo.map(AssetSource::Path),
    });

    let document = ProposalGenerator::new(config).generate(&proposal)?;
    info!("wrote {}", document.path.display());
    println!("{}", serde_json::to_string_pretty(&document.summary())?);
    Ok(())
}

fn print_sample_input() -> Result<(), Box<dyn Error>> {
    let mut monthly_production: Vec<ProductionSample> = [
        4_820.0, 4_510.0, 4_630.0, 4_200.0, 3_870.0, 3_540.0, 3_720.0, 4_160.0, 4_380.0, 4_710.0,
        4_760.0, 4_900.0,
    ]
    .into_iter()
    .zip(1u8..)
    .map(|(total_generation_kwh, month)| ProductionSample {
        month: Month::Calendar(month),
        total_generation_kwh,
    })
    .collect();
    let average = monthly_production
        .iter()
        .map(|sample| sample.total_generation_kwh)
        .sum::<f64>()
        / 12.0;
    monthly_production.push(ProductionSample {
        month: Month::Average,
        total_generation_kwh: average.round(),
    });

    let sample = ProposalInput {
        client_name: "Cliente Exemplo".into(),
        modules_quantity: 60,
        module_spec: "620W Mono Honor Solar".into(),
        inverter_quantity: 2,
        inverter_spec: "SOFAR 20kW".into(),
        kit_investment: 55_000.0,
        labor_investment: 15_000.0,
        monthly_production,
        payback_schedule: (1..=25)
            .map(|year| PaybackYear {
                year,
                balance: -70_000.0 + 18_500.0 * f64::from(year),
                avg_monthly_savings: 1_540.0,
                annual_savings: 18_500.0,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&sample)?);
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
