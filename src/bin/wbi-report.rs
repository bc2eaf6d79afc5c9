use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use wbi_reporter::report::{self, providers_from_settings};
use wbi_reporter::request::DEFAULT_PER_PAGE;
use wbi_reporter::{Client, Query, Session, Settings, stats};

#[derive(Parser, Debug)]
#[command(
    name = "wbi-report",
    version,
    about = "Query, tabulate & summarize World Bank indicators"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch data and print it (optionally with stats and an AI summary).
    Get(GetArgs),
    /// Validate a query without contacting the API.
    Check(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Country/region codes separated by comma or semicolon (e.g., USA,FRA)
    #[arg(short, long)]
    countries: String,
    /// Indicator code (e.g., NY.GDP.PCAP.CD)
    #[arg(short, long)]
    indicator: String,
    /// Year (YYYY) or range (YYYY:YYYY)
    #[arg(short = 'd', long, default_value = "2010:2024")]
    date: String,
}

#[derive(Args, Debug)]
struct GetArgs {
    #[command(flatten)]
    query: QueryArgs,
    /// World Bank API key (optional; defaults to WORLD_BANK_API_KEY).
    #[arg(long)]
    api_key: Option<String>,
    /// Override the API base URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Rows requested per API page.
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,
    /// Rows of the table to print.
    #[arg(long, default_value_t = 50)]
    rows: usize,
    /// Print the rows as comma-delimited text instead of a table.
    #[arg(long, default_value_t = false)]
    csv: bool,
    /// Print per-country statistics.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Ask a language model for a short report on the data.
    #[arg(long, default_value_t = false)]
    report: bool,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_years(s: &str) -> Option<(i32, i32)> {
    if let Some((a, b)) = s.split_once(':') {
        Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
    } else {
        let y = s.trim().parse().ok()?;
        Some((y, y))
    }
}

fn build_query(args: &QueryArgs) -> Result<Query> {
    let (start, end) = parse_years(&args.date)
        .ok_or_else(|| anyhow::anyhow!("invalid --date, expected YYYY or YYYY:YYYY"))?;
    Ok(Query::new(
        parse_list(&args.countries),
        &args.indicator,
        start,
        end,
    )?)
}

fn build_prompt(context: &str, indicator: &str) -> String {
    format!(
        "Below are World Bank summary statistics for the indicator \"{indicator}\", by country.\n\n\
         {context}\n\n\
         Write a short report (2-3 sentences), then 3-5 bullet-point insights. Keep it under 150 words."
    )
}

fn main() -> Result<()> {
    env_logger::init();
    let settings = Settings::from_env();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Get(args) => cmd_get(args, &settings),
        Command::Check(args) => {
            let q = build_query(&args)?;
            println!("ok: {}", q.cache_key());
            Ok(())
        }
    }
}

fn cmd_get(args: GetArgs, settings: &Settings) -> Result<()> {
    let query = build_query(&args.query)?;
    let client = match &args.base_url {
        Some(url) => Client::with_base_url(url.trim_end_matches('/')),
        None => Client::default(),
    }
    .api_key(args.api_key.clone().or_else(|| settings.world_bank_api_key.clone()))
    .per_page(args.per_page);

    let (_, key_msg) = settings.api_key_status();
    log::info!("{key_msg}");

    let mut session = Session::new(client);
    let table = session.submit(&query).with_context(|| {
        format!("query {} failed", query.cache_key())
    })?;

    if table.is_empty() {
        eprintln!("No results found for the selected parameters.");
        return Ok(());
    }
    eprintln!("{} rows", table.len());

    if args.csv {
        print!("{}", table.to_delimited()?);
    } else {
        for o in table.iter().take(args.rows) {
            println!(
                "{:<4} {:<28} {:<18} {:>5}  {}",
                o.country_id,
                o.country_name,
                o.indicator_id,
                o.year,
                fmt_opt(o.value)
            );
        }
        if table.len() > args.rows {
            eprintln!("… {} more rows", table.len() - args.rows);
        }
    }

    if args.stats {
        for s in stats::by_country(&table) {
            println!(
                "{}  count={} missing={}  min={} max={} mean={} median={}",
                s.country_name,
                s.count,
                s.missing,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }

    if args.report {
        let indicator = table
            .first()
            .map(|o| o.indicator_name.clone())
            .unwrap_or_else(|| query.indicator_code.clone());
        let providers = providers_from_settings(settings);
        match session.summarize(&providers, |ctx| build_prompt(ctx, &indicator)) {
            Ok(r) => println!("\n[{}]\n{}", r.provider, r.text),
            Err(report::ReportError::NoData) => eprintln!("No data available to summarize."),
            Err(e) => eprintln!(
                "AI report failed: {e}. Start a local Ollama or set OLLAMA_API_KEY / OPENAI_API_KEY."
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_parsing_accepts_both_separators() {
        assert_eq!(parse_list("USA, FRA ; DEU,,"), vec!["USA", "FRA", "DEU"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_years("2015:2017"), Some((2015, 2017)));
        assert_eq!(parse_years("2020"), Some((2020, 2020)));
        assert_eq!(parse_years("20x0"), None);
    }

    #[test]
    fn value_formatting() {
        assert_eq!(fmt_opt(Some(1.5)), "1.5");
        assert_eq!(fmt_opt(Some(0.0)), "0");
        assert_eq!(fmt_opt(None), "NA");
    }
}
