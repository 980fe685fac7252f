use anyhow::{bail, Context};
use browniancore::prelude::MatchingStrategy;
use clap::Parser;
use generator::profile::{render_frames, GeneratorConfig};
use gui_bridge::bridge::GuiBridge;
use gui_bridge::model::AnalysisModel;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::frames::load_frames;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Particle tracking of Brownian motion")]
struct Args {
    /// Directory of PNG/TIFF frames (natural file-name order), a multi-page TIFF, or one image
    #[arg(short = 'p', long)]
    frames: Option<PathBuf>,
    /// Analyse a rendered Brownian-motion video instead of recorded frames
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Seed for the synthetic video
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Frames per second of the video
    #[arg(short, long, default_value_t = 10.0)]
    framerate: f64,
    /// Micrometers per pixel
    #[arg(short, long, default_value_t = 1.0)]
    ratio: f64,
    /// Sample temperature in degrees Celsius
    #[arg(short, long, default_value_t = 25.0)]
    temperature: f64,
    /// Dynamic viscosity of the fluid in mPa*s
    #[arg(short, long, default_value_t = 0.89)]
    viscosity: f64,
    /// Maximal movement of a particle between two frames in px
    #[arg(short, long, default_value_t = 50.0)]
    max_distance: f64,
    /// Use minimum-cost assignment instead of greedy nearest matching
    #[arg(long, default_value_t = false)]
    optimal: bool,
    /// Write the analysis as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the HTTP bridge alive for plotting clients
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let matching = if args.optimal {
            MatchingStrategy::Optimal
        } else {
            MatchingStrategy::Greedy
        };
        WorkflowConfig::from_args(
            args.framerate,
            args.ratio,
            args.temperature,
            args.viscosity,
            args.max_distance,
            matching,
        )
    };

    let runner = Runner::new(workflow_config.clone());
    let gui_bridge = GuiBridge::new(Arc::new(runner.clone()));

    let frames = if let Some(path) = &args.frames {
        load_frames(path)?
    } else if args.synthetic {
        render_frames(&GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        })
        .context("rendering synthetic video")?
    } else if args.serve {
        Vec::new()
    } else {
        bail!("pass --frames <path>, --synthetic, or --serve");
    };

    if !frames.is_empty() {
        println!(
            "Tracking trajectories: frames {}, framerate {}, ratio {}, temperature {}, viscosity {}, max_distance {}, matching {:?}",
            frames.len(),
            workflow_config.framerate,
            workflow_config.ratio,
            workflow_config.temperature,
            workflow_config.viscosity,
            workflow_config.max_distance,
            workflow_config.matching
        );

        let result = runner.execute(&frames)?;
        let report = &result.report;
        println!(
            "Offline run -> trajectories {}, msd points {}, links {}",
            report.trajectories.len(),
            report.msd.len(),
            report.metrics.links_accepted
        );
        match &report.estimate {
            Ok(estimate) => {
                println!(
                    "Mean particle radius: {:.4} µm (D = {:.4} µm²/s)",
                    estimate.radius_m * 1e6,
                    estimate.diffusion.coefficient_um2_per_s
                );
                if let Some(avogadro) = estimate.avogadro_estimate {
                    println!("Avogadro's number (approximation): {:.4e} mol⁻¹", avogadro);
                }
            }
            Err(err) => println!("No physical estimate: {}", err),
        }

        let model = AnalysisModel::from_result(&result);
        gui_bridge.publish(&model)?;
        gui_bridge.publish_status("Offline workflow results ready.");

        if let Some(report_path) = &args.report {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&model).context("serializing analysis")?;
            fs::write(report_path, json)
                .with_context(|| format!("writing report {}", report_path.display()))?;
        }
    }

    if args.serve {
        gui_bridge.serve(args.bind);
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
