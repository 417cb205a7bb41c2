use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kira_cyc::cache::ObjectCache;
use kira_cyc::config::ConfigLoader;
use kira_cyc::error::CycError;
use kira_cyc::fetch::WebServiceClient;
use kira_cyc::identity::{Detail, Identity};
use kira_cyc::record::Record;
use kira_cyc::xml::Document;

#[derive(Parser)]
#[command(name = "kira-cyc")]
#[command(about = "Fetch and decode BioCyc objects as JSON")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch an object by ORGID:FRAMEID and print it")]
    Get(GetArgs),
    #[command(about = "Decode the objects of a local getxml document")]
    Parse(ParseArgs),
    #[command(about = "Run a Pathway Tools API function on an object")]
    Api(ApiArgs),
    #[command(about = "Run a BioVelo query")]
    Query(QueryArgs),
    #[command(about = "Download and decode the atom mappings of a reaction")]
    AtomMappings(AtomMappingsArgs),
}

#[derive(Args)]
struct GetArgs {
    id: String,

    #[arg(long, value_enum)]
    detail: Option<Detail>,

    /// Relationship fields to resolve and print alongside the object.
    #[arg(long = "follow")]
    follow: Vec<String>,
}

#[derive(Args)]
struct ParseArgs {
    file: String,
}

#[derive(Args)]
struct ApiArgs {
    /// API function name, e.g. `genes-of-pathway`.
    function: String,
    id: String,

    #[arg(long, value_enum)]
    detail: Option<Detail>,
}

#[derive(Args)]
struct QueryArgs {
    query: String,

    #[arg(long, value_enum)]
    detail: Option<Detail>,
}

#[derive(Args)]
struct AtomMappingsArgs {
    id: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CycError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CycError) -> u8 {
    if error.is_not_found() {
        2
    } else if error.is_transport() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Get(args) => run_get(cli.config.as_deref(), args),
        Commands::Parse(args) => run_parse(args),
        Commands::Api(args) => run_api(cli.config.as_deref(), args),
        Commands::Query(args) => run_query(cli.config.as_deref(), args),
        Commands::AtomMappings(args) => run_atom_mappings(cli.config.as_deref(), args),
    }
}

fn run_get(config: Option<&str>, args: GetArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(config)?;
    let identity: Identity = args.id.parse()?;
    let detail = args.detail.or(config.default_detail);
    let cache = ObjectCache::new(WebServiceClient::new(&config)?);

    let record = identity.resolve(&cache, detail)?;
    if args.follow.is_empty() {
        return print_json(record.as_ref());
    }

    let mut followed = Map::new();
    for field in &args.follow {
        let targets = record.resolve(field, &cache)?;
        info!(%field, count = targets.len(), "resolved relationship");
        let targets: Vec<&Record> = targets.iter().map(AsRef::as_ref).collect();
        followed.insert(field.clone(), serde_json::to_value(targets).into_diagnostic()?);
    }
    let mut output = Map::new();
    output.insert(
        "record".to_string(),
        serde_json::to_value(record.as_ref()).into_diagnostic()?,
    );
    output.insert("follow".to_string(), Json::Object(followed));
    print_json(&output)
}

fn run_parse(args: ParseArgs) -> miette::Result<()> {
    let content = fs::read_to_string(&args.file)
        .map_err(|err| CycError::Filesystem(format!("{}: {err}", args.file)))?;
    let document = Document::parse(&content)?;
    print_json(&Record::parse_all(&document)?)
}

fn run_api(config: Option<&str>, args: ApiArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(config)?;
    let identity: Identity = args.id.parse()?;
    let client = WebServiceClient::new(&config)?;
    let records = client.apixml(&args.function, &identity, args.detail.or(config.default_detail))?;
    info!(function = %args.function, count = records.len(), "api call returned");
    print_json(&records)
}

fn run_query(config: Option<&str>, args: QueryArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(config)?;
    let client = WebServiceClient::new(&config)?;
    let records = client.xmlquery(&args.query, args.detail.or(config.default_detail))?;
    info!(count = records.len(), "query returned");
    print_json(&records)
}

fn run_atom_mappings(config: Option<&str>, args: AtomMappingsArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(config)?;
    let identity: Identity = args.id.parse()?;
    let client = WebServiceClient::new(&config)?;
    print_json(&client.download_atom_mappings(&identity)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}
