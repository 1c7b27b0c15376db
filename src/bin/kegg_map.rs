use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kegg_pathway_mapper::app::{App, MapReport, MapRequest};
use kegg_pathway_mapper::config::{ConfigLoader, ResolvedConfig};
use kegg_pathway_mapper::domain::{ExternalId, GeneName, PathwayId, SpeciesCode, parse_gene_list};
use kegg_pathway_mapper::error::KeggError;
use kegg_pathway_mapper::kegg::KeggHttpClient;
use kegg_pathway_mapper::materialize::{ArtifactKind, MaterializedArtifact, latest_image};
use kegg_pathway_mapper::output::{JsonOutput, OutputMode, StderrProgress};
use kegg_pathway_mapper::pacing::Pacing;

#[derive(Parser)]
#[command(name = "kegg-map")]
#[command(about = "Map gene names to KEGG pathways and save the pathway maps")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "Path to a kegg-map.json config file")]
    config: Option<String>,

    #[arg(long, global = true, help = "Number of parallel KEGG workers")]
    workers: Option<usize>,

    #[arg(long, global = true, help = "Minimum pause between requests of one worker")]
    interval_ms: Option<u64>,

    #[arg(long, global = true, help = "Print JSON instead of a summary")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve genes, look up pathways and save one map per identifier")]
    Map(MapArgs),
    #[command(about = "Map gene names to KEGG identifiers")]
    Resolve(ResolveArgs),
    #[command(about = "List the pathways of KEGG identifiers")]
    Pathways(PathwaysArgs),
    #[command(about = "Save the map of a single pathway")]
    Render(RenderArgs),
    #[command(about = "Export the gene/compound graph of a pathway as Graphviz DOT")]
    Graph(GraphArgs),
    #[command(about = "Show the most recently saved pathway image")]
    Latest(LatestArgs),
}

#[derive(Args)]
struct MapArgs {
    #[arg(help = "Gene names, separated by spaces or commas")]
    genes: Vec<String>,

    #[arg(long, help = "File with one gene name per line")]
    genes_file: Option<Utf8PathBuf>,

    #[arg(long)]
    species: Option<String>,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(required = true)]
    genes: Vec<String>,

    #[arg(long)]
    species: Option<String>,
}

#[derive(Args)]
struct PathwaysArgs {
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Args)]
struct RenderArgs {
    pathway: String,

    #[arg(long = "highlight")]
    highlight: Vec<String>,

    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct GraphArgs {
    pathway: String,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct LatestArgs {
    #[arg(long)]
    output_dir: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kegg) = report.downcast_ref::<KeggError>() {
            return ExitCode::from(map_exit_code(kegg));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KeggError) -> u8 {
    match error {
        err if err.is_nothing_found() => 2,
        err if err.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if cli.workers.is_some() || cli.interval_ms.is_some() {
        config.pacing = Pacing::new(
            cli.workers.unwrap_or(config.pacing.workers),
            cli.interval_ms
                .map(Duration::from_millis)
                .unwrap_or(config.pacing.interval),
        );
    }

    let client = KeggHttpClient::with_settings(&config.base_url, config.timeout)?;
    let app = App::new(client, config.pacing);

    match cli.command {
        Commands::Map(args) => run_map(args, &app, &config, output_mode),
        Commands::Resolve(args) => {
            let species = species_or_default(args.species.as_deref(), &config)?;
            let genes = parse_gene_list(&args.genes.join(","));
            let mapping = app
                .resolve(&genes, &species)
                .into_iter()
                .collect::<std::collections::BTreeMap<_, _>>();
            match output_mode {
                OutputMode::Json => JsonOutput::print_json(&mapping).into_diagnostic()?,
                OutputMode::Human => {
                    for gene in &genes {
                        match mapping.get(gene) {
                            Some(id) => println!("{gene}\t{id}"),
                            None => println!("{gene}\t-"),
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Pathways(args) => {
            let ids = args
                .ids
                .iter()
                .map(|id| id.parse())
                .collect::<Result<Vec<ExternalId>, KeggError>>()?;
            let mapping = app.lookup(&ids);
            match output_mode {
                OutputMode::Json => JsonOutput::print_json(&mapping).into_diagnostic()?,
                OutputMode::Human => {
                    for (id, pathways) in &mapping {
                        let joined = pathways
                            .iter()
                            .map(PathwayId::as_str)
                            .collect::<Vec<_>>()
                            .join(" ");
                        println!("{id}\t{joined}");
                    }
                }
            }
            Ok(())
        }
        Commands::Render(args) => {
            let pathway: PathwayId = args.pathway.parse()?;
            let highlight = args
                .highlight
                .iter()
                .map(|id| id.parse())
                .collect::<Result<Vec<ExternalId>, KeggError>>()?;
            let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
            let artifact = app.render(&pathway, &highlight, &output_dir)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_json(&artifact).into_diagnostic()?,
                OutputMode::Human => print_artifact(&artifact),
            }
            Ok(())
        }
        Commands::Graph(args) => {
            let pathway: PathwayId = args.pathway.parse()?;
            let graph = app.graph(&pathway)?;
            if graph.is_empty() {
                tracing::warn!(pathway = %pathway, "record has no GENE, COMPOUND or REL_PATHWAY lines");
            }
            let output = args
                .output
                .unwrap_or_else(|| config.output_dir.join(format!("{pathway}.dot")));
            graph.write_dot(&output, pathway.as_str())?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_json(&graph).into_diagnostic()?,
                OutputMode::Human => println!(
                    "{} nodes, {} edges -> {output}",
                    graph.nodes.len(),
                    graph.edges.len()
                ),
            }
            Ok(())
        }
        Commands::Latest(args) => {
            let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
            let path = latest_image(&output_dir)?.ok_or(KeggError::NoImages)?;
            println!("{path}");
            Ok(())
        }
    }
}

fn species_or_default(
    flag: Option<&str>,
    config: &ResolvedConfig,
) -> Result<SpeciesCode, KeggError> {
    match flag {
        Some(value) => value.parse(),
        None => Ok(config.species.clone()),
    }
}

fn collect_genes(args: &MapArgs, config: &ResolvedConfig) -> miette::Result<Vec<GeneName>> {
    if !args.genes.is_empty() {
        return Ok(parse_gene_list(&args.genes.join(",")));
    }
    if let Some(path) = &args.genes_file {
        let text = std::fs::read_to_string(path.as_std_path())
            .map_err(|err| KeggError::Filesystem(format!("read {path}: {err}")))?;
        return Ok(parse_gene_list(&text));
    }
    Ok(config.genes.clone())
}

fn run_map(
    args: MapArgs,
    app: &App<KeggHttpClient>,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let request = MapRequest {
        genes: collect_genes(&args, config)?,
        species: species_or_default(args.species.as_deref(), config)?,
        output_dir: args
            .output_dir
            .unwrap_or_else(|| config.output_dir.clone()),
    };

    match output_mode {
        OutputMode::Json => {
            let report = app.map_genes(request, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        OutputMode::Human => {
            let report = app.map_genes(request, &StderrProgress)?;
            print_map_summary(&report);
        }
    }
    Ok(())
}

fn print_artifact(artifact: &MaterializedArtifact) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    let (label, color) = match artifact.kind {
        ArtifactKind::Image => ("image", green),
        ArtifactKind::Text => ("text fallback", yellow),
        ArtifactKind::Error => ("error", red),
    };
    println!(
        "{color}{} {label}: {}{reset}",
        artifact.pathway_id, artifact.path
    );
}

fn print_map_summary(report: &MapReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}KEGG mapping ({}){reset}", report.species);
    for (gene, id) in &report.gene_to_id {
        let pathways = report
            .id_to_pathways
            .get(id)
            .map(|pathways| pathways.len())
            .unwrap_or(0);
        println!("{green}  {gene} -> {id} ({pathways} pathways){reset}");
    }
    for gene in &report.unresolved {
        println!("{yellow}  {gene} -> not found{reset}");
    }
    for artifact in &report.artifacts {
        print!("  ");
        print_artifact(artifact);
    }
    println!("{}", report.message);
}
