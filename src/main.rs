use carta_astral::angle::{decimals, degree_within_sign};
use carta_astral::api::{CalculationRequest, HttpCalculationClient};
use carta_astral::calendar::{
    export_ics_to_dir, export_to_dir, festival_map, CalendarSession, CalendarYear,
};
use carta_astral::chart::{fetch_chart, ResolvedChart};
use carta_astral::config::{Location, Settings};
use carta_astral::error::{AstrologyError, Result};
use carta_astral::geo::lookup_timezone;
use carta_astral::render::{render_frame, ChartPalette, SvgSurface, TreeRenderer, WheelRenderer};
use carta_astral::shemot::{shem_enoch_index, shem_info};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "carta", version, about = "Birth charts and the Enoch calendar")]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    /// Settings file (TOML); defaults to <config dir>/carta.toml
    #[arg(long, env = "CARTA_CONFIG", global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a chart and optionally draw it as SVG
    Chart {
        /// Moment to cast, e.g. 2025-03-26T12:00:00 (defaults to now, UTC)
        #[arg(long)]
        datetime: Option<NaiveDateTime>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// IANA timezone; looked up from the coordinates when omitted
        #[arg(long)]
        tz: Option<String>,
        #[arg(long, value_hint = ValueHint::FilePath)]
        svg_wheel: Option<PathBuf>,
        #[arg(long, value_hint = ValueHint::FilePath)]
        svg_tree: Option<PathBuf>,
        /// Wheel edge length in pixels
        #[arg(long, default_value_t = 600.0)]
        size: f64,
        /// Tree-of-Life scale factor
        #[arg(long, default_value_t = 1.0)]
        tree_scale: f64,
    },
    /// Show an Enoch calendar year
    Calendar {
        /// Any Gregorian day inside the wanted year (defaults to today)
        #[arg(long, conflicts_with = "year")]
        date: Option<NaiveDate>,
        /// Enoch year to jump to
        #[arg(long)]
        year: Option<i32>,
        /// Write enoch-calendar-<year>.csv into this directory
        #[arg(long, value_hint = ValueHint::DirPath)]
        export: Option<PathBuf>,
        /// Write enoch-astro-<year>.ics into this directory
        #[arg(long, value_hint = ValueHint::DirPath)]
        ics: Option<PathBuf>,
        /// Print every day instead of a month summary
        #[arg(long)]
        days: bool,
    },
    /// Name for an Enoch month and day
    Shem {
        month: u8,
        day: u8,
        #[arg(long)]
        added_week: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Err(e) = run(cli).await {
        debug!("{:?}", e);
        eprintln!("Error: {}", e.status_message());
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::default().add_directive(level.into()),
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();

    match level {
        LevelFilter::INFO => info!("Debug mode: info"),
        LevelFilter::DEBUG => debug!("Debug mode: debug"),
        LevelFilter::TRACE => debug!("Debug mode: trace"),
        _ => {}
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Shem {
            month,
            day,
            added_week,
        } => print_shem(month, day, added_week),
        Commands::Chart {
            datetime,
            lat,
            lon,
            tz,
            svg_wheel,
            svg_tree,
            size,
            tree_scale,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let location = resolve_location(&settings, lat, lon, tz).await;
            let client = HttpCalculationClient::new(&settings)?;
            let moment = datetime.unwrap_or_else(|| Utc::now().naive_utc());

            let chart = fetch_chart(&client, &CalculationRequest::new(moment, &location)).await?;
            print_chart(&chart);

            let palette = ChartPalette::default();
            if let Some(path) = svg_wheel {
                let renderer = WheelRenderer::new(palette.clone());
                let mut surface = SvgSurface::new(size, size).with_background(&palette.background);
                render_frame(&mut surface, "wheel", |s| renderer.draw(&chart, s))?;
                save(&surface, &path)?;
            }
            if let Some(path) = svg_tree {
                let renderer = TreeRenderer::new(palette.clone()).with_scale(tree_scale);
                let mut surface = SvgSurface::new(800.0 * tree_scale, 880.0 * tree_scale)
                    .with_background(&palette.background);
                render_frame(&mut surface, "tree", |s| renderer.draw(&chart, s))?;
                save(&surface, &path)?;
            }
            Ok(())
        }
        Commands::Calendar {
            date,
            year,
            export,
            ics,
            days,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let client = HttpCalculationClient::new(&settings)?;
            let session = CalendarSession::from_settings(Arc::new(client), &settings);

            let shown = match year {
                Some(year) => session.jump(year).await?,
                None => {
                    let day = date.unwrap_or_else(|| Utc::now().date_naive());
                    let reference = day.and_hms_opt(12, 0, 0).ok_or_else(|| {
                        AstrologyError::InvalidInput(format!("cannot anchor {}", day))
                    })?;
                    session.load(reference).await?
                }
            };
            print_calendar(&shown, days);

            if let Some(dir) = export {
                let path = export_to_dir(&dir, &shown.days)?;
                println!("exported {}", path.display());
            }
            if let Some(dir) = ics {
                let path = export_ics_to_dir(&dir, &shown)?;
                println!("exported {}", path.display());
            }
            Ok(())
        }
    }
}

async fn resolve_location(
    settings: &Settings,
    lat: Option<f64>,
    lon: Option<f64>,
    tz: Option<String>,
) -> Location {
    let mut location = settings.location();
    let moved = lat.is_some() || lon.is_some();
    location.latitude = lat.unwrap_or(location.latitude);
    location.longitude = lon.unwrap_or(location.longitude);

    location.timezone = match tz {
        Some(tz) => tz,
        None if moved => {
            let client = reqwest::Client::new();
            lookup_timezone(
                &client,
                location.latitude,
                location.longitude,
                settings.geonames_username.as_deref(),
            )
            .await
        }
        None => location.timezone,
    };
    location
}

fn save(surface: &SvgSurface, path: &Path) -> Result<()> {
    surface.save(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn print_shem(month: u8, day: u8, added_week: bool) -> Result<()> {
    let info = shem_enoch_index(month, day, added_week)
        .and_then(shem_info)
        .ok_or_else(|| {
            AstrologyError::InvalidInput(format!("no name for month {} day {}", month, day))
        })?;
    println!("{:>2}. {}  {}", info.index + 1, info.name, info.kavanah);
    Ok(())
}

fn print_chart(chart: &ResolvedChart) {
    if let Some(asc) = chart.chart.ascendant {
        println!("ASC  {} {}°", asc.sign, decimals(asc.position, 2));
    }
    if let Some(mc) = chart.chart.midheaven {
        println!("MC   {} {}°", mc.sign, decimals(mc.position, 2));
    }
    println!();

    for position in &chart.chart.bodies {
        let sign = position
            .sign()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        let house = chart
            .assignment
            .house_of(position.body)
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {} {:<12} {:>6}°  house {}",
            position.body.name(),
            position.body.glyph(),
            sign,
            decimals(degree_within_sign(position.longitude), 2),
            house
        );
    }

    if !chart.aspects.is_empty() {
        println!();
        for aspect in &chart.aspects {
            println!(
                "{} {} {}  orb {}°",
                aspect.first,
                aspect.kind.symbol(),
                aspect.second,
                decimals(aspect.orb, 2)
            );
        }
    }

    println!();
    let (element, score) = chart.balance.dominant();
    match element {
        Some(element) => println!("dominant element: {} ({})", element, score),
        None => println!("dominant element: none"),
    }
    for (element, tokens) in &chart.balance.element_tokens {
        println!("  {:<6} {}", element.to_string(), tokens.join(" "));
    }

    if let Some(shem) = chart.astronomical_shem() {
        println!("sun shem: {}. {}", shem.index + 1, shem.name);
    }
    if let Some(shem) = chart.enoch_shem() {
        println!("day shem: {}. {}", shem.index + 1, shem.name);
    }
}

fn print_calendar(year: &CalendarYear, every_day: bool) {
    println!(
        "Enoch year {}: {} days{}",
        year.year,
        year.len(),
        if year.has_added_week() {
            " (with added week)"
        } else {
            ""
        }
    );
    let festivals = festival_map(year);
    for month in year.months() {
        let (Some(first), Some(last)) = (month.days.first(), month.days.last()) else {
            continue;
        };
        println!(
            "month {:>2}: {} .. {} ({} days)",
            month.month,
            first.gregorian,
            last.gregorian,
            month.days.len()
        );
        if every_day {
            for day in &month.days {
                let feast = festivals
                    .get(&day.enoch.day_of_year)
                    .map(|f| format!("  [{}]", f.name))
                    .unwrap_or_default();
                println!(
                    "  {:>3} {} {:>2}/{:<2} {}{}",
                    day.enoch.day_of_year,
                    day.gregorian,
                    day.enoch.month,
                    day.enoch.day,
                    day.name,
                    feast
                );
            }
        }
    }
}
