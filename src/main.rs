use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use readyrs::export::{DateRange, ExportFormat, ExportManager, ExportOptions, ExportType};
use readyrs::hooper::HooperBand;
use readyrs::logging::{init_logging, LogLevel};
use readyrs::recovery::{RecoveryHistory, RecoveryStatus};
use readyrs::service::ReadinessService;
use readyrs::{AppConfig, InMemoryStore, RecoveryComponents, TsbTier};

/// ReadyRS - Athlete Readiness CLI
///
/// Estimates readiness from daily check-ins with an impulse-response model
/// and projects how it evolves if nothing else happens.
#[derive(Parser)]
#[command(name = "readyrs")]
#[command(author = "ReadyRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete Readiness CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON data bundle (overrides the config file)
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wellness score with per-factor breakdown
    Breakdown {
        /// Subject ID (omit with --all)
        subject: Option<String>,

        /// Query instant (YYYY-MM-DD or RFC 3339, default now)
        #[arg(short, long)]
        at: Option<String>,

        /// Score every subject in the data bundle
        #[arg(long)]
        all: bool,
    },

    /// Project wellness forward with no new events
    Forecast {
        subject: String,

        /// Horizon in days (1-30)
        #[arg(short = 'n', long)]
        days: Option<u32>,

        /// Start instant (YYYY-MM-DD or RFC 3339, default now)
        #[arg(short, long)]
        from: Option<String>,
    },

    /// Recommend the best training day in the coming week
    Recommend {
        subject: String,

        /// Start instant (YYYY-MM-DD or RFC 3339, default now)
        #[arg(short, long)]
        from: Option<String>,
    },

    /// Recovery score from physiological readings
    Recovery {
        /// Fill subjective and load inputs from this subject's history
        #[arg(short, long)]
        subject: Option<String>,

        /// HRV (RMSSD, ms)
        #[arg(long)]
        hrv: Option<f64>,
        #[arg(long)]
        hrv_baseline: Option<f64>,

        /// Sleep duration in hours
        #[arg(long)]
        sleep: Option<f64>,
        #[arg(long)]
        sleep_baseline: Option<f64>,

        /// Resting heart rate in bpm
        #[arg(long)]
        rhr: Option<f64>,
        #[arg(long)]
        rhr_baseline: Option<f64>,

        /// Mean subjective rating, 1-7 with 7 best
        #[arg(long)]
        subjective: Option<f64>,

        /// Acute load (ATL)
        #[arg(long)]
        acute: Option<f64>,
        /// Chronic load (CTL)
        #[arg(long)]
        chronic: Option<f64>,

        /// JSON file with hrv/sleep_hours/resting_hr histories for baselines
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },

    /// Hooper index of the latest check-in with TSB advisory
    Hooper {
        subject: String,

        /// Query instant (YYYY-MM-DD or RFC 3339, default now)
        #[arg(short, long)]
        at: Option<String>,
    },

    /// Chronic/acute load series (CTL, ATL, TSB)
    Load {
        subject: String,

        /// Date range start (YYYY-MM-DD)
        #[arg(short, long)]
        from: Option<String>,

        /// Date range end (YYYY-MM-DD)
        #[arg(short, long)]
        to: Option<String>,

        /// Show trend analysis and recommendations
        #[arg(long)]
        trends: bool,
    },

    /// Export forecast, breakdown or load data
    Export {
        subject: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json)
        #[arg(short = 'f', long, default_value = "csv")]
        format: String,

        /// What to export (forecast, breakdown, load)
        #[arg(short = 't', long = "type", default_value = "forecast")]
        export_type: String,

        /// Forecast horizon in days
        #[arg(short = 'n', long)]
        days: Option<u32>,

        /// Date range start (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Date range end (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Positive")]
    positive: String,
    #[tabled(rename = "Negative")]
    negative: String,
    #[tabled(rename = "Net")]
    net: String,
    #[tabled(rename = "Events")]
    events: usize,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Wellness")]
    wellness: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "CTL")]
    ctl: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "TSB")]
    tsb: String,
    #[tabled(rename = "Form")]
    tier: String,
}

#[derive(Tabled)]
struct SubjectRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Top factor")]
    top_factor: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_or_default(),
    };

    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging)?;

    let data_path = cli.data.clone().unwrap_or_else(|| config.data.data_file.clone());
    let store = InMemoryStore::load_from_file(&data_path)
        .with_context(|| format!("Failed to load data bundle {}", data_path.display()))?;
    let service = ReadinessService::from_store(&store).with_config(&config);

    match cli.command {
        Commands::Breakdown { subject, at, all } => {
            let at = parse_instant(at.as_deref())?;
            if all {
                show_all_breakdowns(&service, at);
            } else {
                let subject = subject.context("Provide a subject ID or --all")?;
                show_breakdown(&service, &subject, at)?;
            }
        }

        Commands::Forecast { subject, days, from } => {
            let days = days.unwrap_or(config.forecast.default_days);
            let from = parse_instant(from.as_deref())?;
            let points = service.forecast(&subject, Some(from), days)?;

            println!("{}", format!("{}-day forecast for {}", days, subject).blue().bold());
            let rows: Vec<ForecastRow> = points
                .iter()
                .map(|p| ForecastRow {
                    date: p.date,
                    wellness: colorize_score(p.wellness),
                    confidence: format!("{:.0}%", p.confidence * 100.0),
                })
                .collect();
            print_table(rows);
        }

        Commands::Recommend { subject, from } => {
            let from = parse_instant(from.as_deref())?;
            let recommendation = service.recommendation_from(&subject, from)?;

            println!("{}", "Training recommendation".green().bold());
            println!("  Date:       {}", recommendation.date.to_string().bold());
            println!("  Readiness:  {}", colorize_score(recommendation.readiness_score));
            println!("  Confidence: {:.0}%", recommendation.confidence * 100.0);
            println!("  {}", recommendation.reasoning);
        }

        Commands::Recovery {
            subject,
            hrv,
            hrv_baseline,
            sleep,
            sleep_baseline,
            rhr,
            rhr_baseline,
            subjective,
            acute,
            chronic,
            history,
        } => {
            let components = RecoveryComponents {
                hrv,
                hrv_baseline,
                sleep_hours: sleep,
                sleep_baseline_hours: sleep_baseline,
                resting_hr: rhr,
                resting_hr_baseline: rhr_baseline,
                subjective_mean: subjective,
                acute_load: acute,
                chronic_load: chronic,
            };
            let history = match history {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<RecoveryHistory>(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))?
                }
                None => RecoveryHistory::default(),
            };

            let score = match subject {
                Some(subject) => service.subject_recovery(&subject, components, &history, None)?,
                None => {
                    let mut components = components;
                    history.fill_baselines(
                        &mut components,
                        config.recovery.baseline_window_days,
                        config.recovery.min_baseline_samples,
                    );
                    service.recovery_score(&components)
                }
            };

            println!("{}", "Recovery score".blue().bold());
            if !score.has_signal() {
                println!("  {}", "No recovery data available".yellow());
                return Ok(());
            }
            let status = score.status();
            let status_text = match status {
                RecoveryStatus::Optimal | RecoveryStatus::Adequate => status.to_string().green(),
                RecoveryStatus::Compromised => status.to_string().yellow(),
                RecoveryStatus::Poor | RecoveryStatus::NoData => status.to_string().red(),
            };
            println!("  Score:      {} ({})", score.score.to_string().bold(), status_text);
            println!("  Confidence: {:.0}%", score.confidence * 100.0);
            for weight in &score.used_weights {
                println!(
                    "  {:<11} value {:.2}  weight {:.2}",
                    weight.component.to_string(),
                    weight.value,
                    weight.normalized_weight
                );
            }
        }

        Commands::Hooper { subject, at } => {
            let at = parse_instant(at.as_deref())?;
            match service.hooper_assessment(&subject, Some(at))? {
                Some(assessment) => {
                    let band = match assessment.band {
                        HooperBand::Excellent | HooperBand::Good => assessment.band.to_string().green(),
                        HooperBand::Moderate => assessment.band.to_string().yellow(),
                        HooperBand::High | HooperBand::Critical => assessment.band.to_string().red(),
                    };
                    println!("{}", format!("Hooper index for {}", subject).blue().bold());
                    println!("  Index: {} ({})", assessment.index.to_string().bold(), band);
                    println!("  {}", assessment.recommendation);
                    println!("  TSB:   {:.1} ({:?})", assessment.tsb, assessment.tsb_tier);
                    println!("  {}", assessment.advisory.italic());
                }
                None => println!("{}", "No rated check-ins yet".yellow()),
            }
        }

        Commands::Load { subject, from, to, trends } => {
            let end = match to {
                Some(to) => parse_date(&to)?,
                None => Utc::now().date_naive(),
            };
            let start = match from {
                Some(from) => parse_date(&from)?,
                None => end - chrono::Duration::days(27),
            };
            let series = service.load_series(&subject, start, end)?;

            println!("{}", format!("Training load for {}", subject).blue().bold());
            let rows: Vec<LoadRow> = series
                .iter()
                .map(|m| LoadRow {
                    date: m.date,
                    load: format!("{:.0}", m.daily_load),
                    ctl: format!("{:.1}", m.ctl),
                    atl: format!("{:.1}", m.atl),
                    tsb: format!("{:.1}", m.tsb),
                    tier: format!("{:?}", TsbTier::from_tsb(m.tsb)),
                })
                .collect();
            print_table(rows);

            if trends {
                let calculator = readyrs::PmcCalculator::with_config(config.pmc.clone());
                match calculator.analyze_trends(&series) {
                    Ok(trends) => {
                        println!("{}", "Trends".bold());
                        println!("  Fitness: {:?}", trends.ctl_trend);
                        println!("  Fatigue: {:?}", trends.atl_trend);
                        println!("  Form:    {:?}", trends.tsb_trend);
                    }
                    Err(e) => println!("  {}", e.to_string().yellow()),
                }
                if let Some(latest) = series.last() {
                    for recommendation in calculator.generate_recommendations(latest) {
                        println!("  - {}", recommendation);
                    }
                }
            }
        }

        Commands::Export {
            subject,
            output,
            format,
            export_type,
            days,
            from,
            to,
        } => {
            let options = ExportOptions {
                format: format.parse::<ExportFormat>()?,
                export_type: export_type.parse::<ExportType>()?,
                date_range: DateRange::new(
                    from.as_deref().map(parse_date).transpose()?,
                    to.as_deref().map(parse_date).transpose()?,
                ),
                at: None,
                days: days.unwrap_or(config.forecast.default_days),
            };

            ExportManager::new(&service).export(&subject, &options, &output)?;
            println!(
                "{}",
                format!("✓ Exported {:?} to {}", options.export_type, output.display()).green()
            );
        }
    }

    Ok(())
}

fn show_breakdown(service: &ReadinessService, subject: &str, at: DateTime<Utc>) -> Result<()> {
    let result = service.current_breakdown(subject, Some(at))?;

    println!(
        "{} {} on {}",
        "Wellness".blue().bold(),
        colorize_score(result.score),
        result.date
    );
    println!(
        "  Positive {:.1}  Negative {:.1}  Net {:+.1}",
        result.positive_total,
        result.negative_total,
        result.net_effect()
    );

    if result.breakdown.is_empty() {
        println!("  {}", "No contributing events yet".dimmed());
        return Ok(());
    }

    let rows: Vec<BreakdownRow> = result
        .breakdown
        .iter()
        .map(|c| BreakdownRow {
            factor: c.factor_id.clone(),
            positive: format!("{:.1}", c.positive),
            negative: format!("{:.1}", c.negative),
            net: if c.net >= 0.0 {
                format!("{:+.1}", c.net).green().to_string()
            } else {
                format!("{:+.1}", c.net).red().to_string()
            },
            events: c.impulse_count,
        })
        .collect();
    print_table(rows);
    Ok(())
}

fn show_all_breakdowns(service: &ReadinessService, at: DateTime<Utc>) {
    let summary = service.breakdown_all(at);

    let rows: Vec<SubjectRow> = summary
        .results
        .iter()
        .map(|entry| match &entry.result {
            Ok(result) => SubjectRow {
                subject: entry.subject_id.clone(),
                score: colorize_score(result.score),
                top_factor: result
                    .breakdown
                    .first()
                    .map_or_else(|| "-".to_string(), |c| c.factor_id.clone()),
            },
            Err(e) => SubjectRow {
                subject: entry.subject_id.clone(),
                score: "error".red().to_string(),
                top_factor: e.user_message(),
            },
        })
        .collect();
    print_table(rows);

    if summary.failed > 0 {
        println!("{}", format!("{} subject(s) failed", summary.failed).yellow());
    }
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn colorize_score(score: f64) -> String {
    let text = format!("{:.1}", score);
    if score > 85.0 {
        text.green().bold().to_string()
    } else if score > 70.0 {
        text.green().to_string()
    } else if score > 50.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

/// Midnight UTC for a bare date, otherwise an RFC 3339 timestamp
fn parse_instant(value: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(value) = value else {
        return Ok(Utc::now());
    };

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .context("Invalid date");
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid instant '{}', expected YYYY-MM-DD or RFC 3339", value))
}
