use anyhow::Context;
use beamline_limits::{BeamPowerLoader, LimitCalculator, RequirementsLoader};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "beamline-limits",
    about = "Computing beamline equipment protection limits"
)]
struct Opt {
    /// Path to the device requirements table
    #[structopt(short, long)]
    requirements: String,
    /// Path to the directory with the predicted pulse energy table: "beam.csv"
    #[structopt(short, long)]
    beam: Option<String>,
    /// Output directory for the derived limit tables
    #[structopt(short, long)]
    outdir: Option<String>,
    /// Plot the limit tables
    #[cfg(feature = "plot")]
    #[structopt(short, long)]
    plot: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let requirements = RequirementsLoader::default().path(opt.requirements).load()?;
    let mut loader = BeamPowerLoader::default();
    if let Some(arg) = opt.beam {
        loader = loader.data_path(arg);
    }
    let beam = loader.load()?;

    let (state_name, requirement) = requirements
        .first_state()
        .context("the requirements table has no rows")?;
    let limits = LimitCalculator::new(state_name, requirement, &beam).limits()?;
    limits.summary();
    limits.save(opt.outdir.as_deref().unwrap_or("."))?;

    #[cfg(feature = "plot")]
    if opt.plot {
        beamline_limits::plot::plot_limits(&limits);
    }

    Ok(())
}
