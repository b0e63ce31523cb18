// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod api;
mod backend;
mod browse;
mod cli;
mod compare;
mod config;
mod error;
mod export;
mod fetch;
mod filter;
mod filter_expr;
mod http;
mod model;
mod output;
mod pagination;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::api::ApiClient;
use crate::api::Features;
use crate::api::PriceQuery;
use crate::browse::Browser;
use crate::cli::ByPriceArgs;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::CompareCommand;
use crate::cli::ExportArgs;
use crate::cli::ParamsArgs;
use crate::cli::PredictArgs;
use crate::cli::SearchArgs;
use crate::cli::SimilarArgs;
use crate::compare::AddOutcome;
use crate::compare::ComparisonStore;
use crate::config::Config;
use crate::config::ConfigCtx;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::filter::Filter;
use crate::model::ItemKey;
use crate::model::PhoneModel;
use crate::model::SearchResult;
use crate::model::format_price;
use crate::output::JsonResponse;
use crate::output::StatsOut;
use crate::output::print_json;
use crate::pagination::PageRequest;
use crate::pagination::Pagination;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("PHONEDEX_LOG", "warn"))
        .format_timestamp(None)
        .init();
    if let Err(err) = run() {
        let (_, message) = describe(&err);
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { force } => cmd_init(force),
        Commands::Config { json } => handle_result(cmd_config(json), json),
        Commands::Params(args) => {
            let json = args.json;
            handle_result(cmd_params(args), json)
        }
        Commands::Search(args) => {
            let json = args.json;
            handle_result(cmd_search(args), json)
        }
        Commands::Browse(args) => {
            let ctx = ConfigCtx::load()?;
            let filter = args.filter.to_filter()?;
            let limit = ctx.config.clamp_limit(args.limit);
            let mut store = open_store(&ctx)?;
            let fetcher = Fetcher::new(backend::from_config(&ctx.config)?);
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            Browser::new(fetcher, filter, limit, &mut store).run(stdin.lock(), &mut stdout.lock())
        }
        Commands::Export(args) => {
            let json = args.json;
            handle_result(cmd_export(args), json)
        }
        Commands::Similar(args) => {
            let json = args.json;
            handle_result(cmd_similar(args), json)
        }
        Commands::ByPrice(args) => {
            let json = args.json;
            handle_result(cmd_by_price(args), json)
        }
        Commands::Predict(args) => {
            let json = args.json;
            handle_result(cmd_predict(args), json)
        }
        Commands::Compare(command) => {
            let json = match &command {
                CompareCommand::Add { json, .. }
                | CompareCommand::Rm { json, .. }
                | CompareCommand::List { json }
                | CompareCommand::Clear { json }
                | CompareCommand::Show { json } => *json,
            };
            handle_result(cmd_compare(command), json)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "phonedex", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let (code, message) = describe(&err);
                let resp = JsonResponse::error(code, &message);
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

/// Error code and user-facing message. Fetch failures carry their own code.
fn describe(err: &anyhow::Error) -> (&'static str, String) {
    match err.downcast_ref::<FetchError>() {
        Some(fetch) => (fetch.code(), fetch.user_message()),
        None => ("error", format!("{err:#}")),
    }
}

fn cmd_init(force: bool) -> Result<()> {
    let path = config::global_config_path()
        .ok_or_else(|| anyhow::anyhow!("config dir unavailable; set HOME or XDG_CONFIG_HOME"))?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config::write_config(&path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    if json {
        let resp = JsonResponse::ok()
            .with_config(serde_json::to_value(&ctx.config)?)
            .with_message(config::global_config_path().map(|p| p.display().to_string()));
        print_json(&resp)?;
    } else {
        if let Some(path) = config::global_config_path() {
            println!("# {}", path.display());
        }
        print!("{}", toml::to_string_pretty(&ctx.config)?);
    }
    Ok(())
}

fn cmd_params(args: ParamsArgs) -> Result<()> {
    let params = args.filter.to_filter()?.to_params();
    if args.json {
        print_json(&JsonResponse::ok().with_params(params))?;
    } else {
        println!("{params}");
    }
    Ok(())
}

/// Fetches one page and syncs the pagination total with it.
fn fetch_page<'a>(
    fetcher: &'a mut Fetcher,
    filter: &Filter,
    pagination: &mut Pagination,
) -> Result<&'a SearchResult> {
    let result = fetcher.try_fetch(filter, pagination.request())?;
    pagination.update(result);
    Ok(result)
}

fn past_end_warning(result: &SearchResult, pagination: &Pagination) -> Vec<String> {
    if result.items.is_empty() && pagination.offset() > 0 {
        vec![format!(
            "page {} is past the last page ({})",
            pagination.current_page(),
            pagination.total_pages()
        )]
    } else {
        Vec::new()
    }
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let filter = args.filter.to_filter()?;
    let mut pagination = Pagination::at_page(ctx.config.clamp_limit(args.limit), args.page);
    let mut fetcher = Fetcher::new(backend::from_config(&ctx.config)?);
    let backend_name = fetcher.backend_name();
    let result = fetch_page(&mut fetcher, &filter, &mut pagination)?;
    let mut warnings = past_end_warning(result, &pagination);
    let stray = browse::count_mismatches(&filter, result);
    if stray > 0 {
        warnings.push(format!("{stray} rows do not match the current filter"));
    }

    if args.json {
        let resp = JsonResponse::ok()
            .with_query(backend_name, filter.to_params(), &pagination)
            .with_results(&result.items)?
            .with_stats(StatsOut::from_result(result, &pagination))
            .with_next_offset(&pagination)
            .with_warnings(warnings);
        print_json(&resp)?;
    } else {
        let stdout = std::io::stdout();
        browse::write_page(&mut stdout.lock(), result, &pagination)?;
        for warn in warnings {
            eprintln!("warning: {warn}");
        }
    }
    Ok(())
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let filter = args.filter.to_filter()?;
    let mut pagination = Pagination::at_page(ctx.config.clamp_limit(args.limit), args.page);
    let mut fetcher = Fetcher::new(backend::from_config(&ctx.config)?);
    let result = fetch_page(&mut fetcher, &filter, &mut pagination)?;

    let now = OffsetDateTime::now_utc();
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(export::default_export_name(now.date())));
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let stats = export::export_csv(&result.items, file)?;
    log::info!("exported {} rows to {}", stats.rows, path.display());

    if args.json {
        let resp = JsonResponse::ok()
            .with_params(filter.to_params())
            .with_stats(StatsOut::from_result(result, &pagination))
            .with_export(json!({
                "path": path.display().to_string(),
                "rows": stats.rows,
                "exported_at": now.format(&Rfc3339)?,
            }));
        print_json(&resp)?;
    } else {
        println!(
            "Exported {} of {} phones to {}",
            stats.rows,
            result.filtered,
            path.display()
        );
    }
    Ok(())
}

fn cmd_similar(args: SimilarArgs) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let client = ApiClient::new(&ctx.config)?;
    let limit = args.limit.clamp(1, ctx.config.max_limit.max(1));
    let features = match args.like.as_deref() {
        Some([brand, name]) => {
            let key = ItemKey::new(brand, name);
            let mut fetcher = Fetcher::new(backend::from_config(&ctx.config)?);
            let Some(phone) = lookup(&mut fetcher, &key)? else {
                anyhow::bail!("{key} is not in the dataset");
            };
            Features::from_phone(&phone)
        }
        _ => args.features.to_features(),
    };
    let models = client.similar(&features, limit)?;

    if args.json {
        print_json(&JsonResponse::ok().with_results(&models)?)?;
    } else if models.is_empty() {
        println!("No similar phones found");
    } else {
        for (i, similar) in models.iter().enumerate() {
            println!(
                "{}\t{:.2}",
                browse::format_row(i + 1, &similar.model),
                similar.similarity_score
            );
        }
    }
    Ok(())
}

fn cmd_by_price(args: ByPriceArgs) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let client = ApiClient::new(&ctx.config)?;
    let query = PriceQuery::new(args.price, args.tolerance)?;
    let result = client.by_price(query, ctx.config.clamp_limit(args.limit))?;
    let message = result.empty_message();

    if args.json {
        let resp = JsonResponse::ok()
            .with_results(&result.items)?
            .with_price_range(&result)
            .with_message(message);
        print_json(&resp)?;
    } else if let Some(message) = message {
        println!("{message}");
    } else {
        println!(
            "{} of {} phones between {} and {}",
            result.items.len(),
            result.total,
            format_price(result.requested.min),
            format_price(result.requested.max)
        );
        for (i, phone) in result.items.iter().enumerate() {
            println!("{}", browse::format_row(i + 1, phone));
        }
        if !result.brands.is_empty() {
            println!("brands: {}", result.brands.join(", "));
        }
    }
    Ok(())
}

fn cmd_predict(args: PredictArgs) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let client = ApiClient::new(&ctx.config)?;
    let prediction = client.predict(args.target, &args.features.to_features())?;

    if args.json {
        let resp = JsonResponse::ok().with_prediction(json!({
            "target": args.target.as_str(),
            "value": prediction,
        }));
        print_json(&resp)?;
    } else {
        println!("predicted {}: {prediction}", args.target.as_str());
    }
    Ok(())
}

fn open_store(ctx: &ConfigCtx) -> Result<ComparisonStore> {
    let mut store = ComparisonStore::open(&ctx.comparison_path(), ctx.config.comparison_cap)?;
    log::debug!("comparison file {}", store.path().display());
    store.subscribe(|set| log::debug!("comparison now holds {} phones", set.len()));
    Ok(store)
}

fn cmd_compare(command: CompareCommand) -> Result<()> {
    let ctx = ConfigCtx::load()?;
    let mut store = open_store(&ctx)?;

    match command {
        CompareCommand::Add { brand, name, json } => {
            let key = ItemKey::new(&brand, &name);
            if key.brand.is_empty() || key.name.is_empty() {
                anyhow::bail!("brand and name must not be empty");
            }
            let outcome = store.update(|set| set.add(key.clone()))?;
            let message = match outcome {
                AddOutcome::Added => format!("Added {key}"),
                AddOutcome::Duplicate => format!("{key} is already in the comparison"),
                AddOutcome::Full => anyhow::bail!(
                    "comparison is full ({} phones); remove one first",
                    store.get().cap()
                ),
            };
            print_comparison(&store, Some(message), json)
        }
        CompareCommand::Rm { index, json } => {
            let removed = store.update(|set| index.checked_sub(1).and_then(|i| set.remove(i)))?;
            let Some(removed) = removed else {
                anyhow::bail!("no comparison entry at position {index}");
            };
            print_comparison(&store, Some(format!("Removed {removed}")), json)
        }
        CompareCommand::List { json } => print_comparison(&store, None, json),
        CompareCommand::Clear { json } => {
            store.set(Vec::new())?;
            print_comparison(&store, Some("Cleared comparison".to_string()), json)
        }
        CompareCommand::Show { json } => {
            let keys = store.get().keys().to_vec();
            let mut fetcher = Fetcher::new(backend::from_config(&ctx.config)?);
            let mut phones = Vec::new();
            let mut missing = Vec::new();
            for key in &keys {
                match lookup(&mut fetcher, key)? {
                    Some(phone) => phones.push(phone),
                    None => missing.push(format!("{key} is no longer in the dataset")),
                }
            }
            if json {
                let resp = JsonResponse::ok()
                    .with_comparison(&keys)
                    .with_results(&phones)?
                    .with_warnings(missing);
                print_json(&resp)?;
            } else {
                if keys.is_empty() {
                    println!("comparison is empty");
                }
                for (i, phone) in phones.iter().enumerate() {
                    println!("{}", browse::format_row(i + 1, phone));
                }
                for warn in missing {
                    eprintln!("warning: {warn}");
                }
            }
            Ok(())
        }
    }
}

fn lookup(fetcher: &mut Fetcher, key: &ItemKey) -> Result<Option<PhoneModel>> {
    let mut filter = Filter::default();
    filter.set_query(&key.name);
    filter.add_brand(&key.brand);
    let result = fetcher.try_fetch(
        &filter,
        PageRequest {
            limit: 10,
            offset: 0,
        },
    )?;
    Ok(result.items.iter().find(|p| key.matches(p)).cloned())
}

fn print_comparison(store: &ComparisonStore, message: Option<String>, json: bool) -> Result<()> {
    let set = store.get();
    if json {
        let resp = JsonResponse::ok()
            .with_comparison(set.keys())
            .with_message(message);
        return print_json(&resp);
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Some(message) = message {
        writeln!(out, "{message}")?;
    }
    if set.is_empty() {
        writeln!(out, "comparison is empty")?;
    }
    for (i, key) in set.iter().enumerate() {
        writeln!(out, "{:>3}  {key}", i + 1)?;
    }
    writeln!(out, "{}/{} slots used", set.len(), set.cap())?;
    Ok(())
}
