// CLI host for the dashboard core.
//
// Runs the startup pipeline once, applies the filter flags the same way
// the web UI's controls would, and renders each dashboard region: the
// utilisation table as a Markdown preview plus CSV export, and the cards,
// charts and map markers as JSON artifacts a front end can pick up.
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use isp_activity_dashboard::aggregate::{region_name, summary_cards, POD_OPTIONS, REGION_CODES};
use isp_activity_dashboard::present;
use isp_activity_dashboard::types::{Catchment, FilterSelection};
use isp_activity_dashboard::util::{format_int, parse_week};
use isp_activity_dashboard::{build_resident_table, output};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CatchmentArg {
    Inner,
    Outer,
}

// clap needs Display to render the default value in --help.
impl std::fmt::Display for CatchmentArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatchmentArg::Inner => write!(f, "inner"),
            CatchmentArg::Outer => write!(f, "outer"),
        }
    }
}

impl From<CatchmentArg> for Catchment {
    fn from(value: CatchmentArg) -> Catchment {
        match value {
            CatchmentArg::Inner => Catchment::Inner,
            CatchmentArg::Outer => Catchment::Outer,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "isp-dashboard", about = "Independent-sector weekly activity dashboard")]
struct Args {
    /// Weekly activity extract (ISO-8859-1 CSV)
    #[arg(long, default_value = "Raw_Data_Final.csv")]
    activity: PathBuf,

    /// Provider-location lookup (ISO-8859-1 CSV)
    #[arg(long, default_value = "Location_data.csv")]
    locations: PathBuf,

    /// Points of delivery to include
    #[arg(long = "pod", value_delimiter = ',', default_values_t = ["Elective".to_string(), "Daycase".to_string()])]
    pods: Vec<String>,

    /// Region short codes (SWL, SEL, NWL, NCL, NEL) or full STP names;
    /// defaults to all five regions
    #[arg(long = "stp", value_delimiter = ',')]
    stps: Vec<String>,

    /// Inner/outer providers to include
    #[arg(long = "catchment", value_enum, value_delimiter = ',', default_values_t = [CatchmentArg::Outer])]
    catchments: Vec<CatchmentArg>,

    /// Activity subtypes to include; omit for all
    #[arg(long = "subtype", value_delimiter = ',')]
    subtypes: Vec<String>,

    /// First week of the table view (DD/MM/YYYY); defaults to the oldest
    /// week in the data
    #[arg(long)]
    from: Option<String>,

    /// Last week of the table view (DD/MM/YYYY); defaults to the newest
    /// week in the data
    #[arg(long)]
    to: Option<String>,

    /// Directory the CSV/JSON artifacts are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn expand_regions(codes: &[String]) -> anyhow::Result<HashSet<String>> {
    if codes.is_empty() {
        return Ok(REGION_CODES.iter().map(|(_, full)| full.to_string()).collect());
    }
    let mut stps = HashSet::new();
    for code in codes {
        if let Some(full) = region_name(code) {
            stps.insert(full.to_string());
        } else if REGION_CODES.iter().any(|(_, full)| *full == code.as_str()) {
            stps.insert(code.clone());
        } else {
            bail!(
                "unknown region {:?}; expected one of {}",
                code,
                REGION_CODES
                    .iter()
                    .map(|(short, _)| *short)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    Ok(stps)
}

fn parse_week_arg(value: &Option<String>, flag: &str) -> anyhow::Result<Option<chrono::NaiveDate>> {
    match value {
        None => Ok(None),
        Some(s) => match parse_week(s) {
            Some(d) => Ok(Some(d)),
            None => bail!("--{} {:?} is not a DD/MM/YYYY or YYYY-MM-DD date", flag, s),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let table = build_resident_table(&args.activity, &args.locations)
        .context("startup load failed; aborting without partial data")?;

    // The POD dropdown is a closed enumeration; reject anything else here
    // the way the UI control would.
    for pod in &args.pods {
        if !POD_OPTIONS.contains(&pod.as_str()) {
            bail!(
                "unknown point of delivery {:?}; expected one of {}",
                pod,
                POD_OPTIONS.join(", ")
            );
        }
    }

    let from = parse_week_arg(&args.from, "from")?.unwrap_or(table.first_week);
    let to = parse_week_arg(&args.to, "to")?.unwrap_or(table.last_week);
    if from > to {
        bail!("--from {} is after --to {}", from, to);
    }

    let filter = FilterSelection {
        pods: args.pods.iter().cloned().collect(),
        stps: expand_regions(&args.stps)?,
        catchments: args.catchments.iter().map(|c| Catchment::from(*c)).collect(),
        subtypes: if args.subtypes.is_empty() {
            None
        } else {
            Some(args.subtypes.iter().cloned().collect())
        },
        date_range: Some((from, to)),
    };

    let artifact = |name: &str| args.out_dir.join(name).to_string_lossy().into_owned();

    println!(
        "Independent Sector Weekly Activity Dashboard ({} fact rows, {} to {})\n",
        format_int(table.rows.len() as i64),
        table.first_week,
        table.last_week
    );

    let cards = summary_cards(&table, &filter);
    println!(
        "Weekly Utilisation (%) ==> {}: {}",
        cards.week.format("%d/%m/%y"),
        present::format_card(cards.weekly_utilisation)
    );
    println!(
        "Total Utilisation (%): {}\n",
        present::format_card(cards.total_utilisation)
    );
    output::write_json(&artifact("summary_cards.json"), &cards)?;

    let rows = present::utilisation_table(&table, &filter);
    println!("Utilisation Table ({} to {})\n", from, to);
    output::preview_rows(&rows, 15);
    output::write_csv(&artifact("utilisation_table.csv"), &rows)?;
    println!("(Full table exported to utilisation_table.csv)\n");

    let trend = present::activity_trend(&table, &filter);
    output::write_json(&artifact("activity_trend.json"), &trend)?;

    let chart = present::utilisation_chart(&table, &filter);
    output::write_json(&artifact("utilisation_chart.json"), &chart)?;

    let markers = present::map_markers(&table, &filter);
    output::write_json(&artifact("map_markers.json"), &markers)?;
    println!(
        "Chart and map artifacts written: activity_trend.json, utilisation_chart.json, map_markers.json ({} markers)",
        format_int(markers.len() as i64)
    );

    Ok(())
}
