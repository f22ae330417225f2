use std::process::ExitCode;

use clap::Parser;
use kdam::{BarExt, tqdm};
use staffmatch::{
    ChatClient,
    ConfigDb,
    DataDir,
    Error,
    ModelManager,
    RecordKind,
    Repository,
    Result,
    Settings,
    cli::{self, Cli, Command, ConfigAction},
    embedding_text::Query,
    ingestion,
    matcher,
    search::{self, SearchParams},
    store::Applied,
    walker::{self, SourceFile},
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("STAFFMATCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_caller_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config_db = ConfigDb::open(&data_dir.config_db())?;

    if let Command::Config { action } = &cli.command {
        return cmd_config(&config_db, action);
    }

    let settings = Settings::load(&config_db)?;
    let mut repo = Repository::open(data_dir.storage())?;

    match cli.command {
        Command::Add(args) => cmd_add(&mut repo, &settings, &args)?,
        Command::Ingest(args) => cmd_ingest(&mut repo, &settings, &args)?,
        Command::Delete(args) => {
            let mut model = ModelManager::new(&settings.embedding_model);
            let applied = repo.delete(args.kind, args.id, &mut model)?;
            report_unsaved(&applied);
            println!("Deleted {} {}", args.kind, args.id);
        }
        Command::Get(args) => {
            let record = repo
                .get_by_id(args.record.kind, args.record.id)
                .ok_or_else(|| Error::NotFound {
                    kind: args.record.kind.as_str(),
                    name: args.record.id.to_string(),
                })?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                println!("{} #{}", record.name, record.id);
                println!("  Type: {}", record.kind);
                println!("  Stack: {}", record.stack);
                println!("  Skills: {}", record.skills);
                println!("  Description: {}", record.description);
                println!("  Telephone: {}", record.telephone);
                println!("  Email: {}", record.email);
                println!("  Telegram: {}", record.telegram);
            }
        }
        Command::List(args) => {
            let records = repo.list_all(args.kind);
            if args.json {
                println!("{}", serde_json::to_string_pretty(records)?);
            } else if records.is_empty() {
                println!("No {} stored.", args.kind.collection_name());
            } else {
                for (i, record) in records.iter().enumerate() {
                    println!(
                        "{:>3}. {} (#{})  Stack: {}",
                        i + 1,
                        record.name,
                        record.id,
                        record.stack
                    );
                }
            }
        }
        Command::Search(args) => {
            let query = Query {
                kind: args.kind,
                stack: args.stack.clone(),
                skills: args.skills.clone(),
                description: args.description.clone(),
            };
            let params = search_params(&settings, args.count, args.threshold);
            let mut model = ModelManager::new(&settings.embedding_model);

            let hits = search::execute_search(
                repo.collection(args.kind),
                &query,
                &mut model,
                &params,
            )?;

            if args.json {
                search::format_json(&hits, &query)?;
            } else {
                search::format_human(&hits);
            }
        }
        Command::Match(args) => {
            let params = search_params(&settings, args.count, args.threshold);
            let mut model = ModelManager::new(&settings.embedding_model);
            let llm = ChatClient::from_env(&settings)?;

            let report = matcher::match_record(
                &repo,
                args.record.kind,
                args.record.id,
                &mut model,
                &llm,
                &params,
            )?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                search::format_human(&report.hits);
                println!("\n{}", report.narrative.trim());
            }
        }
        Command::Rebuild(args) => {
            let kinds = match args.kind {
                Some(kind) => vec![kind],
                None => RecordKind::ALL.to_vec(),
            };
            let mut model = ModelManager::new(&settings.embedding_model);
            for kind in kinds {
                eprintln!("Rebuilding {}...", kind.collection_name());
                let applied = repo.rebuild(kind, &mut model)?;
                report_unsaved(&applied);
                eprintln!("  Embedded {} records", applied.value);
            }
            eprintln!("Rebuild complete.");
        }
        Command::Status(args) => {
            cmd_status(&repo, &data_dir, &settings, args.json)?;
        }
        Command::Config { .. } | Command::Completions(_) => {}
    }

    Ok(())
}

/// Settings supply the defaults; command-line flags win.
fn search_params(
    settings: &Settings,
    count: Option<usize>,
    threshold: Option<f32>,
) -> SearchParams {
    SearchParams {
        top_k: count.unwrap_or(settings.top_k),
        threshold: threshold.unwrap_or(settings.threshold),
    }
}

fn report_unsaved<T>(applied: &Applied<T>) {
    if let Some(e) = &applied.persist_error {
        eprintln!("Warning: change applied but not saved to disk: {e}");
    }
}

fn cmd_add(
    repo: &mut Repository,
    settings: &Settings,
    args: &cli::AddArgs,
) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)?;
    let records = ingestion::records_from_json(&text, args.kind)?;
    if records.is_empty() {
        eprintln!("No records in {}.", args.file.display());
        return Ok(());
    }

    let mut model = ModelManager::new(&settings.embedding_model);
    for record in records {
        let kind = record.kind;
        let applied = repo.add(record, &mut model)?;
        report_unsaved(&applied);
        println!("Added {kind} {}", applied.value);
    }
    Ok(())
}

fn cmd_ingest(
    repo: &mut Repository,
    settings: &Settings,
    args: &cli::IngestArgs,
) -> Result<()> {
    let sources = if args.path.is_dir() {
        walker::discover_sources(&args.path)?
    } else {
        let source = SourceFile::from_path(&args.path).ok_or_else(|| {
            Error::Config(format!(
                "unsupported file type (expected .txt, .md or .json): {}",
                args.path.display()
            ))
        })?;
        vec![source]
    };

    if sources.is_empty() {
        eprintln!("No ingestible files found in {}.", args.path.display());
        return Ok(());
    }

    let llm = ChatClient::from_env(settings)?;
    let mut model = ModelManager::new(&settings.embedding_model);

    let mut pb = tqdm!(total = sources.len(), desc = "Ingesting");
    let mut added = 0;
    let mut failed = 0;

    for source in &sources {
        let path = source.relative_path.display();
        match ingestion::ingest_file(repo, source, args.kind, &mut model, &llm)
        {
            Ok(applied) => {
                for a in &applied {
                    report_unsaved(a);
                    pb.write(format!("{path}: added {} {}", args.kind, a.value))?;
                }
                added += applied.len();
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(%path, error = %e, "ingestion failed");
                pb.write(format!("{path}: failed: {e}"))?;
            }
        }
        pb.update(1)?;
    }
    eprintln!();
    eprintln!(
        "Ingested {added} {} from {} files ({failed} failed).",
        args.kind.collection_name(),
        sources.len()
    );
    Ok(())
}

fn cmd_status(
    repo: &Repository,
    data_dir: &DataDir,
    settings: &Settings,
    json: bool,
) -> Result<()> {
    if json {
        let collections: Vec<_> = RecordKind::ALL
            .iter()
            .map(|&kind| {
                let c = repo.collection(kind);
                serde_json::json!({
                    "kind": kind,
                    "records": c.len(),
                    "vectors": c.index().map_or(0, |i| i.len()),
                    "dimension": c.index().map_or(0, |i| i.dimension()),
                    "aligned": c.is_aligned(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "files": data_dir
                .artifacts()
                .into_iter()
                .map(|(path, present)| serde_json::json!({
                    "path": path.display().to_string(),
                    "present": present,
                }))
                .collect::<Vec<_>>(),
            "embedding_model": settings.embedding_model,
            "llm_model": settings.llm_model,
            "collections": collections,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Data directory: {}", data_dir.root().display());
    println!("Embedding model: {}", settings.embedding_model);
    println!("LLM model: {}", settings.llm_model);
    for (path, present) in data_dir.artifacts() {
        let state = if present { "present" } else { "missing" };
        println!("  {} ({state})", path.display());
    }
    for kind in RecordKind::ALL {
        let c = repo.collection(kind);
        let health = if c.is_aligned() {
            "ok"
        } else {
            "stale, run `staffmatch rebuild`"
        };
        println!(
            "{}: {} records, {} vectors of dimension {} ({health})",
            kind.collection_name(),
            c.len(),
            c.index().map_or(0, |i| i.len()),
            c.index().map_or(0, |i| i.dimension()),
        );
    }
    Ok(())
}

fn cmd_config(config_db: &ConfigDb, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { json } => {
            let settings = Settings::load(config_db)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("top_k = {}", settings.top_k);
                println!("threshold = {}", settings.threshold);
                println!("embedding_model = {}", settings.embedding_model);
                println!("llm_model = {}", settings.llm_model);
                println!("llm_base_url = {}", settings.llm_base_url);
                println!("llm_timeout_secs = {}", settings.llm_timeout_secs);
            }
        }
        ConfigAction::Set { key, value } => {
            Settings::set(config_db, key, value)?;
            println!("Set {key} = {}", value.trim());
        }
        ConfigAction::Clear { key } => {
            Settings::clear(config_db, key)?;
            println!("Cleared {key}");
        }
    }
    Ok(())
}
