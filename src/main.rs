use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use contribution_tracker::tracker::csv_io::{self, CsvSchema, ExportKind};
use contribution_tracker::tracker::repo_stats::RepoSortKey;
use contribution_tracker::tracker::search::{
    ContributionField, ContributionFilter, ContributorFilter, SearchField, SearchType, SortField, SortOrder,
};
use contribution_tracker::tracker::{Contributor, ProjectTracker, ScoringPolicy, TrackerError};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// デフォルトのデータファイル
const DEFAULT_DATA_FILE: &str = "contributors.json";

/// デフォルトのプロジェクト名
const DEFAULT_PROJECT_NAME: &str = "Hacktoberfest 2025";

#[derive(Parser)]
#[command(
    version,
    about = "Tracks Hacktoberfest contributors, leaderboards and repository statistics",
    long_about = None
)]
struct Cli {
    /// Path to the JSON data file
    #[arg(short, long, global = true, env = "CONTRIB_TRACKER_DATA", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Project name used when the data file does not exist yet
    #[arg(short, long, global = true, env = "CONTRIB_TRACKER_PROJECT", default_value = DEFAULT_PROJECT_NAME)]
    project: String,

    /// Scoring policy JSON file (weights and thresholds)
    #[arg(short, long, global = true, env = "CONTRIB_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for tabular results (json or csv)
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Command {
    /// Register a contributor (existing usernames are returned unchanged)
    AddContributor {
        name: String,
        github_username: String,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Record a contribution for a registered contributor
    AddContribution {
        github_username: String,
        repo_name: String,
        #[arg(value_name = "TYPE")]
        contribution_type: String,
        #[arg(default_value = "")]
        description: String,
        /// Pull request number
        #[arg(long)]
        pr: Option<u64>,
    },

    /// List all contributors
    List,

    /// Show a contributor with their metrics
    Info { github_username: String },

    /// Contributors who reached the completion threshold
    Completed,

    /// Contributors ordered by contribution count
    Leaderboard,

    /// Project overview statistics
    Stats,

    /// Most recent contributions across all contributors
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Contributor metrics, or project metrics when no username is given
    Metrics {
        github_username: Option<String>,
        /// Number of top contributors in project metrics
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },

    /// Contributors ranked by engagement score
    Ranking,

    /// Daily, cumulative and weekly contribution counts
    TimeSeries,

    /// Highlights, concerns and recommendations
    Insights,

    /// Full performance summary
    Summary,

    /// Search contributors, then filter and sort the results
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(short = 't', long = "type", value_enum, default_value_t = SearchType::Contains)]
        search_type: SearchType,
        #[arg(long, value_enum, default_value_t = SearchField::All)]
        field: SearchField,
        #[arg(long)]
        case_sensitive: bool,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
    },

    /// Filter contributors
    Filter {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Sort contributors
    Sort {
        #[command(flatten)]
        sort: SortArgs,
    },

    /// Search contribution descriptions, repositories and types
    SearchContributions {
        query: String,
        #[arg(long, value_enum, default_value_t = ContributionField::All)]
        field: ContributionField,
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Filter contributions
    FilterContributions {
        #[arg(long = "type")]
        contribution_type: Option<String>,
        #[arg(long = "repo")]
        repo_name: Option<String>,
        #[arg(long, value_parser = parse_date)]
        after: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_date)]
        before: Option<NaiveDateTime>,
        #[arg(long)]
        has_pr: Option<bool>,
        #[arg(long = "username")]
        contributor_username: Option<String>,
    },

    /// Counts of contributors, contribution types and repositories
    SearchStats,

    /// Statistics for one repository, or all repositories
    RepoStats { repo_name: Option<String> },

    /// Top repositories by the chosen key
    TopRepos {
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = RepoSortKey::Contributions)]
        sort_by: RepoSortKey,
    },

    /// Repositories with the most contributions in the last days
    Trending {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },

    /// Rank repositories against each other per metric
    Compare {
        #[arg(required = true, num_args = 1..)]
        repos: Vec<String>,
    },

    /// Health assessment for a repository
    Health { repo_name: String },

    /// Export CSV (a directory for `all`)
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        path: PathBuf,
    },

    /// Import a CSV file (schema detected from the header)
    Import {
        file: PathBuf,
        /// Contributions file imported after the contributors file
        #[arg(long)]
        contributions: Option<PathBuf>,
    },

    /// Print or save a CSV template
    Template {
        #[arg(value_enum)]
        schema: CsvSchema,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    min_contributions: Option<usize>,
    #[arg(long)]
    max_contributions: Option<usize>,
    /// Only contributors who reached the completion threshold
    #[arg(long)]
    completed: bool,
    #[arg(long)]
    has_email: Option<bool>,
    #[arg(long, value_parser = parse_date)]
    joined_after: Option<NaiveDateTime>,
    #[arg(long, value_parser = parse_date)]
    joined_before: Option<NaiveDateTime>,
    /// Contributors with at least one contribution of this type
    #[arg(long)]
    contribution_type: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> ContributorFilter {
        ContributorFilter {
            min_contributions: self.min_contributions,
            max_contributions: self.max_contributions,
            completed_only: self.completed,
            has_email: self.has_email,
            joined_after: self.joined_after,
            joined_before: self.joined_before,
            contribution_type: self.contribution_type.clone(),
        }
    }
}

#[derive(Args)]
struct SortArgs {
    #[arg(long, value_enum, default_value_t = SortField::Name)]
    sort_by: SortField,
    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    order: SortOrder,
}

fn parse_date(value: &str) -> Result<NaiveDateTime, String> {
    csv_io::parse_timestamp(value).ok_or_else(|| format!("invalid date: {value} (expected YYYY-MM-DD)"))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?
    );
    Ok(())
}

/// 平坦な行の一覧をJSONまたはCSVで出力します
fn print_rows<T: Serialize>(rows: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row).context("Failed to write CSV record")?;
            }
            wtr.flush().context("Failed to flush CSV writer")?;
            Ok(())
        }
    }
}

fn print_contributors(contributors: &[&Contributor], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(contributors),
        OutputFormat::Csv => {
            csv_io::write_contributors(std::io::stdout(), contributors.iter().copied())
                .context("Failed to write CSV")?;
            Ok(())
        }
    }
}

/// 表形式でない出力はJSONのみ
fn print_document<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Csv => anyhow::bail!("CSV output is not supported for this command"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let policy = match &cli.config {
        Some(path) => ScoringPolicy::from_file(path)
            .with_context(|| format!("Failed to load scoring policy from {}", path.display()))?,
        None => ScoringPolicy::default(),
    };
    let mut tracker = ProjectTracker::open(&cli.data, &cli.project, policy);
    let format = cli.format;

    match cli.command {
        Command::AddContributor {
            name,
            github_username,
            email,
        } => {
            let contributor = tracker
                .add_contributor(&name, &github_username, email.as_deref())
                .context("Failed to add contributor")?;
            print_json(contributor)?;
        }
        Command::AddContribution {
            github_username,
            repo_name,
            contribution_type,
            description,
            pr,
        } => {
            let recorded = tracker
                .add_contribution(&github_username, &repo_name, &contribution_type, &description, pr)
                .context("Failed to add contribution")?;
            if !recorded {
                return Err(TrackerError::ContributorNotFound(github_username).into());
            }
            if let Some(contributor) = tracker.contributor(&github_username) {
                print_json(contributor)?;
            }
        }
        Command::List => print_contributors(&tracker.contributors(), format)?,
        Command::Info { github_username } => {
            let metrics = tracker
                .contributor_metrics(&github_username)
                .ok_or(TrackerError::ContributorNotFound(github_username))?;
            print_document(&metrics, format)?;
        }
        Command::Completed => print_contributors(&tracker.completed_contributors(), format)?,
        Command::Leaderboard => print_rows(&tracker.leaderboard(), format)?,
        Command::Stats => print_document(&tracker.project_stats(), format)?,
        Command::Recent { limit } => print_document(&tracker.recent_contributions(limit), format)?,
        Command::Metrics {
            github_username: Some(username),
            ..
        } => {
            let metrics = tracker
                .contributor_metrics(&username)
                .ok_or(TrackerError::ContributorNotFound(username))?;
            print_document(&metrics, format)?;
        }
        Command::Metrics {
            github_username: None,
            top,
        } => print_document(&tracker.project_metrics(top), format)?,
        Command::Ranking => print_rows(&tracker.contributors_ranking(), format)?,
        Command::TimeSeries => print_document(&tracker.time_series_metrics(), format)?,
        Command::Insights => print_document(&tracker.performance_insights(), format)?,
        Command::Summary => print_document(&tracker.performance_summary(), format)?,
        Command::Search {
            query,
            search_type,
            field,
            case_sensitive,
            filter,
            sort,
        } => {
            let results = tracker.advanced_search(
                &query,
                search_type,
                field,
                case_sensitive,
                &filter.to_filter(),
                sort.sort_by,
                sort.order,
            );
            print_contributors(&results, format)?;
        }
        Command::Filter { filter } => {
            print_contributors(&tracker.filter_contributors(&filter.to_filter()), format)?
        }
        Command::Sort { sort } => print_contributors(&tracker.sort_contributors(sort.sort_by, sort.order), format)?,
        Command::SearchContributions {
            query,
            field,
            case_sensitive,
        } => print_document(&tracker.search_contributions(&query, field, case_sensitive), format)?,
        Command::FilterContributions {
            contribution_type,
            repo_name,
            after,
            before,
            has_pr,
            contributor_username,
        } => {
            let filter = ContributionFilter {
                contribution_type,
                repo_name,
                after,
                before,
                has_pr,
                contributor_username,
            };
            print_document(&tracker.filter_contributions(&filter), format)?;
        }
        Command::SearchStats => print_document(&tracker.search_statistics(), format)?,
        Command::RepoStats { repo_name: Some(repo) } => {
            let stats = tracker
                .repository_stats(&repo)
                .ok_or(TrackerError::RepositoryNotFound(repo))?;
            print_document(&stats, format)?;
        }
        Command::RepoStats { repo_name: None } => print_document(&tracker.all_repository_stats(), format)?,
        Command::TopRepos { limit, sort_by } => print_document(&tracker.top_repositories(limit, sort_by), format)?,
        Command::Trending { days, limit } => print_rows(&tracker.trending_repositories(days, limit), format)?,
        Command::Compare { repos } => print_document(&tracker.compare_repositories(&repos), format)?,
        Command::Health { repo_name } => {
            let report = tracker
                .repository_health(&repo_name)
                .ok_or(TrackerError::RepositoryNotFound(repo_name))?;
            print_document(&report, format)?;
        }
        Command::Export { kind, path } => {
            let written = tracker
                .export_csv(kind, &path)
                .with_context(|| format!("Failed to export CSV to {}", path.display()))?;
            print_json(&written)?;
        }
        Command::Import {
            file,
            contributions: Some(contributions),
        } => {
            let report = tracker
                .import_from_csv(&file, Some(&contributions))
                .context("Failed to import CSV files")?;
            print_json(&report)?;
        }
        Command::Import {
            file,
            contributions: None,
        } => {
            let (_, report) = tracker
                .import_csv(&file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            print_json(&report)?;
        }
        Command::Template { schema, output } => match output {
            Some(path) => tracker
                .save_csv_template(schema, &path)
                .with_context(|| format!("Failed to write template to {}", path.display()))?,
            None => print!("{}", tracker.csv_template(schema)),
        },
    }

    Ok(())
}
