//! CSVのエクスポートとインポート
//!
//! エクスポートは任意の`Write`に書き出し、インポートはヘッダー行から
//! スキーマを判定します。インポート中の不正な行はエラーとして記録され、
//! 残りの行の処理は続行されます。

use super::config::ScoringPolicy;
use super::error::TrackerError;
use super::metrics::{contributor_metrics, round_to_3};
use super::model::{Contribution, Contributor};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONTRIBUTORS_FILE: &str = "contributors.csv";
pub const CONTRIBUTIONS_FILE: &str = "contributions.csv";
pub const METRICS_FILE: &str = "metrics.csv";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// インポート可能なCSVの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CsvSchema {
    Contributors,
    Contributions,
}

impl CsvSchema {
    /// ヘッダー行からスキーマを判定します
    ///
    /// `repo_name`列があれば貢献、`name`と`github_username`列があれば貢献者とみなします。
    pub fn detect<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self, TrackerError> {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let has = |column: &str| headers.iter().any(|h| *h == column);

        if has("repo_name") {
            Ok(Self::Contributions)
        } else if has("name") && has("github_username") {
            Ok(Self::Contributors)
        } else {
            Err(TrackerError::UnknownSchema(headers.join(",")))
        }
    }

    /// ヘッダー行と例の1行からなるテンプレート
    pub fn template(&self) -> &'static str {
        match self {
            Self::Contributors => {
                "name,github_username,email,joined_date\n\
                 John Doe,johndoe,john@example.com,2025-10-01\n"
            }
            Self::Contributions => {
                "github_username,repo_name,type,description,pr_number,date\n\
                 johndoe,awesome-project,bug-fix,Fixed login issue,123,2025-10-05\n"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contributors => "contributors",
            Self::Contributions => "contributions",
        }
    }
}

/// エクスポートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportKind {
    Contributors,
    Contributions,
    Metrics,
    /// 3種類すべてをディレクトリに書き出す
    All,
}

/// 1行分のインポートエラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// インポート結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn merge(&mut self, other: ImportReport) {
        self.imported += other.imported;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    fn row_error(&mut self, line: u64, message: impl Into<String>) {
        let message = message.into();
        warn!(line, %message, "skipping CSV row");
        self.errors.push(RowError { line, message });
    }
}

#[derive(Serialize)]
struct ContributorRow<'a> {
    name: &'a str,
    github_username: &'a str,
    email: &'a str,
    joined_date: NaiveDateTime,
    contribution_count: usize,
    hacktoberfest_complete: bool,
    unique_repositories: usize,
}

#[derive(Serialize)]
struct ContributionRow<'a> {
    github_username: &'a str,
    repo_name: &'a str,
    #[serde(rename = "type")]
    contribution_type: &'a str,
    description: &'a str,
    pr_number: Option<u64>,
    date: NaiveDateTime,
}

#[derive(Serialize)]
struct MetricsRow {
    username: String,
    name: String,
    total_contributions: usize,
    contribution_streak: usize,
    days_active: usize,
    #[serde(serialize_with = "round_to_3")]
    average_days_between_contributions: f64,
    most_active_day: String,
    #[serde(serialize_with = "round_to_3")]
    engagement_score: f64,
    hacktoberfest_complete: bool,
}

#[derive(Deserialize)]
struct ContributorRecord {
    name: String,
    github_username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    joined_date: Option<String>,
}

#[derive(Deserialize)]
struct ContributionRecord {
    github_username: String,
    repo_name: String,
    #[serde(rename = "type")]
    contribution_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    pr_number: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// 貢献者をCSVに書き出し、書き出した行数を返します
pub fn write_contributors<'a, W, I>(writer: W, contributors: I) -> Result<usize, TrackerError>
where
    W: Write,
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for c in contributors {
        wtr.serialize(ContributorRow {
            name: &c.name,
            github_username: &c.github_username,
            email: c.email.as_deref().unwrap_or(""),
            joined_date: c.joined_date,
            contribution_count: c.contribution_count(),
            hacktoberfest_complete: c.is_hacktoberfest_complete(),
            unique_repositories: c.unique_repositories(),
        })?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

/// 全貢献をCSVに書き出し、書き出した行数を返します
pub fn write_contributions<'a, W, I>(writer: W, contributors: I) -> Result<usize, TrackerError>
where
    W: Write,
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for c in contributors {
        for contribution in &c.contributions {
            wtr.serialize(ContributionRow {
                github_username: &c.github_username,
                repo_name: &contribution.repo_name,
                contribution_type: &contribution.contribution_type,
                description: &contribution.description,
                pr_number: contribution.pr_number,
                date: contribution.date,
            })?;
            rows += 1;
        }
    }
    wtr.flush()?;
    Ok(rows)
}

/// 貢献者ごとのメトリクスをCSVに書き出します
pub fn write_metrics<'a, W, I>(
    writer: W,
    contributors: I,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Result<usize, TrackerError>
where
    W: Write,
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for c in contributors {
        let m = contributor_metrics(c, now, policy);
        wtr.serialize(MetricsRow {
            username: m.username,
            name: m.name,
            total_contributions: m.total_contributions,
            contribution_streak: m.contribution_streak,
            days_active: m.days_active,
            average_days_between_contributions: m.average_days_between_contributions,
            most_active_day: m.most_active_day.unwrap_or_default(),
            engagement_score: m.engagement_score,
            hacktoberfest_complete: m.hacktoberfest_complete,
        })?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

/// 指定した種類のCSVをファイルに書き出します
///
/// `ExportKind::All`の場合、`path`はディレクトリとして扱われます。
///
/// # 戻り値
///
/// 書き出したファイルのパス
pub fn export_to_path(
    kind: ExportKind,
    path: &Path,
    contributors: &[&Contributor],
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Result<Vec<PathBuf>, TrackerError> {
    let rows = match kind {
        ExportKind::Contributors => write_contributors(File::create(path)?, contributors.iter().copied())?,
        ExportKind::Contributions => write_contributions(File::create(path)?, contributors.iter().copied())?,
        ExportKind::Metrics => write_metrics(File::create(path)?, contributors.iter().copied(), now, policy)?,
        ExportKind::All => return export_all(path, contributors, now, policy),
    };
    info!(path = %path.display(), rows, "exported CSV");
    Ok(vec![path.to_path_buf()])
}

/// 貢献者・貢献・メトリクスの3ファイルをディレクトリに書き出します
pub fn export_all(
    dir: &Path,
    contributors: &[&Contributor],
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Result<Vec<PathBuf>, TrackerError> {
    fs::create_dir_all(dir)?;

    let kinds = [
        (ExportKind::Contributors, CONTRIBUTORS_FILE),
        (ExportKind::Contributions, CONTRIBUTIONS_FILE),
        (ExportKind::Metrics, METRICS_FILE),
    ];

    let mut written = Vec::with_capacity(kinds.len());
    for (kind, file_name) in kinds {
        written.extend(export_to_path(kind, &dir.join(file_name), contributors, now, policy)?);
    }
    Ok(written)
}

/// テンプレートをファイルに書き出します
pub fn save_template(schema: CsvSchema, path: &Path) -> Result<(), TrackerError> {
    fs::write(path, schema.template())?;
    info!(path = %path.display(), schema = schema.as_str(), "wrote CSV template");
    Ok(())
}

/// `YYYY-MM-DD`またはタイムスタンプ形式の日時を解析します
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// 空欄なら`None`、解析できなければエラーメッセージ
fn optional_timestamp(value: Option<&str>, column: &str) -> Result<Option<NaiveDateTime>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_timestamp(v)
            .map(Some)
            .ok_or_else(|| format!("invalid {column}: {v}")),
    }
}

fn open_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// ヘッダーを読み、期待するスキーマであることを確認します
fn expect_schema<R: Read>(rdr: &mut csv::Reader<R>, expected: CsvSchema) -> Result<csv::StringRecord, TrackerError> {
    let headers = rdr.headers()?.clone();
    let found = CsvSchema::detect(headers.iter())?;
    if found != expected {
        return Err(TrackerError::UnknownSchema(format!(
            "expected {} columns, found {} columns",
            expected.as_str(),
            found.as_str()
        )));
    }
    Ok(headers)
}

/// 各行を解析して`on_row`に渡します。読み取れない行はエラーとして記録します
///
/// 入出力エラーの後は読み込みを打ち切ります。
fn for_each_row<R, T, F>(
    mut rdr: csv::Reader<R>,
    headers: &csv::StringRecord,
    report: &mut ImportReport,
    mut on_row: F,
) where
    R: Read,
    T: for<'de> Deserialize<'de>,
    F: FnMut(T, u64, &mut ImportReport),
{
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                let fatal = matches!(e.kind(), csv::ErrorKind::Io(_));
                report.row_error(line, e.to_string());
                if fatal {
                    break;
                }
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());
        match record.deserialize::<T>(Some(headers)) {
            Ok(row) => on_row(row, line, report),
            Err(e) => report.row_error(line, e.to_string()),
        }
    }
}

/// 貢献者CSVを読み込み、未登録の貢献者を追加します
///
/// 既に登録済みのユーザー名は上書きせずスキップします。
/// `joined_date`が空欄の場合は`now`を使用します。
///
/// # エラー
///
/// ヘッダーが読めない場合、または貢献者のスキーマでない場合にエラーを返します。
/// 行単位のエラーは`ImportReport::errors`に記録されます。
pub fn import_contributors<R: Read>(
    reader: R,
    contributors: &mut IndexMap<String, Contributor>,
    now: NaiveDateTime,
) -> Result<ImportReport, TrackerError> {
    let mut rdr = open_reader(reader);
    let headers = expect_schema(&mut rdr, CsvSchema::Contributors)?;
    let mut report = ImportReport::default();

    for_each_row(rdr, &headers, &mut report, |row: ContributorRecord, line, report| {
        if row.name.is_empty() || row.github_username.is_empty() {
            report.row_error(line, "name and github_username are required");
            return;
        }
        let joined_date = match optional_timestamp(row.joined_date.as_deref(), "joined_date") {
            Ok(date) => date.unwrap_or(now),
            Err(message) => {
                report.row_error(line, message);
                return;
            }
        };
        if contributors.contains_key(&row.github_username) {
            debug!(username = %row.github_username, "contributor already exists, skipping");
            report.skipped += 1;
            return;
        }

        let contributor =
            Contributor::new(row.name, row.github_username.clone(), row.email).with_joined_date(joined_date);
        contributors.insert(row.github_username, contributor);
        report.imported += 1;
    });

    info!(
        imported = report.imported,
        skipped = report.skipped,
        errors = report.errors.len(),
        "imported contributors"
    );
    Ok(report)
}

/// 貢献CSVを読み込み、既存の貢献者に貢献を追加します
///
/// 未登録のユーザー名の行は行エラーになります。`date`が空欄の場合は`now`を使用します。
pub fn import_contributions<R: Read>(
    reader: R,
    contributors: &mut IndexMap<String, Contributor>,
    now: NaiveDateTime,
) -> Result<ImportReport, TrackerError> {
    let mut rdr = open_reader(reader);
    let headers = expect_schema(&mut rdr, CsvSchema::Contributions)?;
    let mut report = ImportReport::default();

    for_each_row(rdr, &headers, &mut report, |row: ContributionRecord, line, report| {
        let Some(contributor) = contributors.get_mut(&row.github_username) else {
            report.row_error(line, format!("unknown contributor: {}", row.github_username));
            return;
        };
        if row.repo_name.is_empty() || row.contribution_type.is_empty() {
            report.row_error(line, "repo_name and type are required");
            return;
        }
        let pr_number = match row.pr_number.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => None,
            Some(v) => match v.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    report.row_error(line, format!("invalid pr_number: {v}"));
                    return;
                }
            },
        };
        let date = match optional_timestamp(row.date.as_deref(), "date") {
            Ok(date) => date.unwrap_or(now),
            Err(message) => {
                report.row_error(line, message);
                return;
            }
        };

        contributor.push_contribution(Contribution {
            repo_name: row.repo_name,
            contribution_type: row.contribution_type,
            description: row.description.unwrap_or_default(),
            pr_number,
            date,
        });
        report.imported += 1;
    });

    info!(
        imported = report.imported,
        errors = report.errors.len(),
        "imported contributions"
    );
    Ok(report)
}

/// CSVファイルのスキーマを判定してインポートします
pub fn import_file(
    path: &Path,
    contributors: &mut IndexMap<String, Contributor>,
    now: NaiveDateTime,
) -> Result<(CsvSchema, ImportReport), TrackerError> {
    let schema = {
        let mut rdr = open_reader(File::open(path)?);
        CsvSchema::detect(rdr.headers()?.iter())?
    };
    debug!(path = %path.display(), schema = schema.as_str(), "detected CSV schema");

    let file = File::open(path)?;
    let report = match schema {
        CsvSchema::Contributors => import_contributors(file, contributors, now)?,
        CsvSchema::Contributions => import_contributions(file, contributors, now)?,
    };
    Ok((schema, report))
}
