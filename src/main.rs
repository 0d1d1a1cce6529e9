use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use indicatif::ProgressStyle;
use tracing::info_span;
use tracing_core::LevelFilter;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use upose::config::Config;
use upose::video::{FrameSource, VideoInput};
use upose::visualization::{JsonLinesSink, RenderSink, WindowSink};
use upose::Context;

#[derive(Parser)]
pub struct Args {
    /// Camera index or video file
    #[clap(short, default_value = "0")]
    pub input: String,
    /// JSON file with the tracking parameters. When given it replaces every
    /// tracking flag; keys missing from the file take their defaults.
    #[clap(long)]
    pub config_file: Option<PathBuf>,
    /// Write every pose as a JSON line
    #[clap(long)]
    pub output: Option<PathBuf>,
    /// Save a rerun recording
    #[cfg(feature = "recording")]
    #[clap(long)]
    pub record: Option<PathBuf>,
    #[clap(long)]
    pub headless: bool,
    #[clap(short, long)]
    pub verbose: bool,
    #[clap(flatten)]
    pub config: Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // setup logging
    let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(level),
        )
        .with(indicatif_layer)
        .init();

    let config = args.config.clone().resolve(args.config_file.as_deref())?;

    let mut source = VideoInput::open(&args.input).with_context(|| format!("cannot open {}", args.input))?;
    let mut context = Context::from_source(&mut source, &config)?;

    let mut sinks: Vec<Box<dyn RenderSink>> = vec![];
    if !args.headless {
        sinks.push(Box::new(WindowSink::new("upose")));
    }
    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        sinks.push(Box::new(JsonLinesSink::new(BufWriter::new(file))));
    }
    #[cfg(feature = "recording")]
    if let Some(path) = &args.record {
        sinks.push(Box::new(upose::visualization::RerunSink::save(path)?));
    }

    let header_span = info_span!("header");
    match source.remaining() {
        Some(length) => {
            header_span.pb_set_style(&ProgressStyle::default_bar());
            header_span.pb_set_length(length as u64);
        }
        None => header_span.pb_set_style(&ProgressStyle::default_spinner()),
    }
    let header_span_enter = header_span.enter();

    upose::run(&mut context, &mut source, &mut sinks)?;

    std::mem::drop(header_span_enter);
    std::mem::drop(header_span);

    Ok(())
}
