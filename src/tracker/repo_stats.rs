//! リポジトリ単位の統計を計算するモジュール
//!
//! 貢献をリポジトリ名ごとに集計し、以下を算出します：
//!
//! 1. 貢献数・ユニーク貢献者数・PR率などの基本統計
//! 2. 新しさで重み付けした貢献量に基づくアクティビティスコア
//! 3. 4項目のチェックによるヘルススコアとヘルスステータス
//! 4. 直近の期間でのトレンド、複数リポジトリの比較
//!
//! 存在しないリポジトリを指定した場合もエラーにはならず、ゼロ値の統計を返します。

use super::config::{ActivityPolicy, HealthThresholds, ScoringPolicy};
use super::metrics::{count_sorted, deserialize_f64, round_to_3};
use super::model::{Contribution, Contributor};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// `top_contributors`に含める人数
const TOP_CONTRIBUTORS_PER_REPO: usize = 5;

/// ヘルススコアから判定されるリポジトリの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Good,
    Moderate,
    NeedsAttention,
}

impl HealthStatus {
    /// ヘルススコア（0-100）を閾値でバケット化します
    pub fn from_score(score: u32, thresholds: &HealthThresholds) -> Self {
        if score >= thresholds.healthy {
            Self::Healthy
        } else if score >= thresholds.good {
            Self::Good
        } else if score >= thresholds.moderate {
            Self::Moderate
        } else {
            Self::NeedsAttention
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::NeedsAttention => "needs_attention",
        }
    }

    fn recommendation(&self) -> &'static str {
        match self {
            Self::Healthy => "Repository is performing well!",
            Self::Good => "Keep up the steady contributor engagement",
            Self::Moderate => "Consider increasing contributor engagement",
            Self::NeedsAttention => "Repository needs increased activity and contributor engagement",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ヘルスチェック各項目の評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Excellent,
    Good,
    Fair,
    Low,
}

/// リポジトリ一覧の並び替えキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum RepoSortKey {
    Contributions,
    Contributors,
    ActivityScore,
    PullRequests,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days_active: usize,
    pub days_span: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoContributor {
    pub username: String,
    pub contributions: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub percentage: f64,
}

/// リポジトリごとの統計情報
///
/// # フィールド
///
/// - `pull_request_percentage`: PR番号付きの貢献の割合（%）
/// - `contribution_frequency`: 活動日1日あたりの貢献数（小数第2位に丸め）
/// - `timeline`: 日付（`YYYY-MM-DD`）ごとの貢献数
/// - `contributors`: 初めて貢献した順のユーザー名
/// - `activity_score`: アクティビティスコア（0-100）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub repo_name: String,
    pub total_contributions: usize,
    pub unique_contributors: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub avg_contributions_per_contributor: f64,
    pub contribution_types: IndexMap<String, usize>,
    pub pull_requests_count: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub pull_request_percentage: f64,
    pub date_range: DateRange,
    pub days_active: usize,
    pub contribution_frequency: f64,
    pub timeline: IndexMap<String, usize>,
    pub top_contributors: Vec<RepoContributor>,
    pub contributors: Vec<String>,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub activity_score: f64,
    pub health_status: HealthStatus,
}

/// リポジトリのヘルス評価
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub repo_name: String,
    pub overall_score: u32,
    pub status: HealthStatus,
    pub metrics: IndexMap<String, HealthLevel>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingRepository {
    pub repo_name: String,
    pub recent_contributions: usize,
    pub recent_contributors: usize,
    pub trend_score: usize,
    pub last_activity: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub repo_name: String,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub value: f64,
    pub rank: usize,
}

/// 1つの指標についての順位付け
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRanking {
    pub metric: String,
    pub entries: Vec<RankedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryComparison {
    pub repositories: Vec<RepositoryStats>,
    pub rankings: Vec<MetricRanking>,
}

/// リポジトリごとの統計情報を収集する内部構造体
///
/// # フィールド
///
/// - `contributor_counts`: 貢献者ごとの貢献数（初回貢献順）
/// - `types`: 貢献の種類
/// - `dates`: 貢献日時
/// - `pull_requests`: PR番号付きの貢献数
/// - `weighted_volume`: 新しさで重み付けした貢献量
#[derive(Default)]
struct RepoAccumulator {
    contributor_counts: IndexMap<String, usize>,
    types: Vec<String>,
    dates: Vec<NaiveDateTime>,
    pull_requests: usize,
    weighted_volume: f64,
}

impl RepoAccumulator {
    fn record(
        &mut self,
        username: &str,
        contribution: &Contribution,
        now: NaiveDateTime,
        activity: &ActivityPolicy,
    ) {
        *self
            .contributor_counts
            .entry(username.to_string())
            .or_insert(0) += 1;
        self.types.push(contribution.contribution_type.clone());
        self.dates.push(contribution.date);

        if contribution.has_pr() {
            self.pull_requests += 1;
        }

        let age_days = (now.date() - contribution.day()).num_days();
        self.weighted_volume += if age_days <= i64::from(activity.recent_window_days) {
            1.0
        } else {
            activity.stale_weight
        };
    }

    /// 収集した統計情報から`RepositoryStats`を計算します
    fn into_stats(mut self, repo_name: String, thresholds: &HealthThresholds) -> RepositoryStats {
        let total = self.dates.len();
        let unique = self.contributor_counts.len();
        self.dates.sort();

        let pull_request_percentage = percentage(self.pull_requests, total);
        let date_range = date_range(&self.dates);
        let days_active = date_range.days_active;

        let mut timeline: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for date in &self.dates {
            *timeline.entry(date.date()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&String, &usize)> = self.contributor_counts.iter().collect();
        ranked.sort_by(|(ua, a), (ub, b)| b.cmp(a).then_with(|| ua.cmp(ub)));
        let top_contributors = ranked
            .into_iter()
            .take(TOP_CONTRIBUTORS_PER_REPO)
            .map(|(username, &count)| RepoContributor {
                username: username.clone(),
                contributions: count,
                percentage: percentage(count, total),
            })
            .collect();

        let activity_score = activity_score(
            self.weighted_volume,
            unique,
            self.pull_requests,
            total,
            days_active,
        );
        let (health_score, _, _) = health_checks(total, unique, pull_request_percentage, activity_score);

        RepositoryStats {
            repo_name,
            total_contributions: total,
            unique_contributors: unique,
            avg_contributions_per_contributor: if unique > 0 {
                total as f64 / unique as f64
            } else {
                0.0
            },
            contribution_types: count_sorted(self.types.iter().map(String::as_str)),
            pull_requests_count: self.pull_requests,
            pull_request_percentage,
            date_range,
            days_active,
            contribution_frequency: frequency(total, days_active),
            timeline: timeline
                .into_iter()
                .map(|(day, n)| (day.format("%Y-%m-%d").to_string(), n))
                .collect(),
            top_contributors,
            contributors: self.contributor_counts.into_keys().collect(),
            activity_score,
            health_status: HealthStatus::from_score(health_score, thresholds),
        }
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

fn frequency(total: usize, days_active: usize) -> f64 {
    if days_active == 0 {
        return 0.0;
    }
    (total as f64 / days_active as f64 * 100.0).round() / 100.0
}

/// 昇順に並んだ日時から期間情報を求めます
fn date_range(sorted: &[NaiveDateTime]) -> DateRange {
    let (Some(start), Some(end)) = (sorted.first(), sorted.last()) else {
        return DateRange::default();
    };

    let days_active = sorted.iter().map(|d| d.date()).collect::<HashSet<_>>().len();

    DateRange {
        start_date: Some(start.format("%Y-%m-%d").to_string()),
        end_date: Some(end.format("%Y-%m-%d").to_string()),
        days_active,
        days_span: (end.date() - start.date()).num_days() + 1,
    }
}

/// アクティビティスコア（0-100）を計算します
///
/// 貢献量（最大30点、新しさで重み付け）、貢献者の多様性（最大30点）、
/// PR率（最大25点）、活動日数（最大15点）の合計です。
fn activity_score(
    weighted_volume: f64,
    unique_contributors: usize,
    pull_requests: usize,
    total: usize,
    days_active: usize,
) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let volume = if weighted_volume >= 50.0 {
        30.0
    } else if weighted_volume >= 20.0 {
        20.0
    } else if weighted_volume >= 5.0 {
        10.0
    } else {
        weighted_volume / 5.0 * 10.0
    };

    let diversity = match unique_contributors {
        n if n >= 10 => 30.0,
        n if n >= 5 => 20.0,
        n if n >= 2 => 10.0,
        _ => 5.0,
    };

    let pr = (pull_requests as f64 / total as f64 * 25.0).min(25.0);

    let consistency = match days_active {
        d if d >= 30 => 15.0,
        d if d >= 14 => 10.0,
        d if d >= 7 => 5.0,
        _ => 0.0,
    };

    f64::min(100.0, volume + diversity + pr + consistency)
}

fn grade(value: f64, steps: [f64; 3]) -> (u32, HealthLevel) {
    if value >= steps[0] {
        (25, HealthLevel::Excellent)
    } else if value >= steps[1] {
        (15, HealthLevel::Good)
    } else if value >= steps[2] {
        (10, HealthLevel::Fair)
    } else {
        (0, HealthLevel::Low)
    }
}

/// 4項目のヘルスチェックを行い、スコア・項目別評価・警告を返します
fn health_checks(
    total: usize,
    unique: usize,
    pull_request_percentage: f64,
    activity_score: f64,
) -> (u32, IndexMap<String, HealthLevel>, Vec<String>) {
    let checks = [
        ("contribution_volume", total as f64, [50.0, 20.0, 5.0], "Low contribution volume"),
        ("contributor_diversity", unique as f64, [10.0, 5.0, 2.0], "Few unique contributors"),
        ("pr_activity", pull_request_percentage, [50.0, 30.0, 10.0], "Low PR activity"),
        ("activity_consistency", activity_score, [75.0, 50.0, 25.0], "Inconsistent activity"),
    ];

    let mut score = 0;
    let mut levels = IndexMap::new();
    let mut warnings = Vec::new();

    for (name, value, steps, warning) in checks {
        let (points, level) = grade(value, steps);
        score += points;
        if level == HealthLevel::Low {
            warnings.push(warning.to_string());
        }
        levels.insert(name.to_string(), level);
    }

    (score, levels, warnings)
}

fn accumulate<'a, I>(
    contributors: I,
    repo_filter: Option<&str>,
    now: NaiveDateTime,
    activity: &ActivityPolicy,
) -> BTreeMap<String, RepoAccumulator>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut repos: BTreeMap<String, RepoAccumulator> = BTreeMap::new();

    for contributor in contributors {
        for contribution in &contributor.contributions {
            if repo_filter.is_some_and(|r| r != contribution.repo_name) {
                continue;
            }
            repos
                .entry(contribution.repo_name.clone())
                .or_default()
                .record(&contributor.github_username, contribution, now, activity);
        }
    }

    repos
}

/// 1つのリポジトリの統計を計算します
pub fn repository_stats<'a, I>(
    contributors: I,
    repo_name: &str,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> RepositoryStats
where
    I: IntoIterator<Item = &'a Contributor>,
{
    accumulate(contributors, Some(repo_name), now, &policy.activity)
        .remove(repo_name)
        .unwrap_or_default()
        .into_stats(repo_name.to_string(), &policy.health)
}

/// すべてのリポジトリの統計を名前順で返します
pub fn all_repository_stats<'a, I>(
    contributors: I,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> IndexMap<String, RepositoryStats>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    accumulate(contributors, None, now, &policy.activity)
        .into_iter()
        .map(|(name, acc)| {
            let stats = acc.into_stats(name.clone(), &policy.health);
            (name, stats)
        })
        .collect()
}

/// 指定したキーの降順（同値は名前の昇順）で上位のリポジトリを返します
pub fn top_repositories<'a, I>(
    contributors: I,
    limit: usize,
    sort_key: RepoSortKey,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Vec<RepositoryStats>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let key = |s: &RepositoryStats| match sort_key {
        RepoSortKey::Contributions => s.total_contributions as f64,
        RepoSortKey::Contributors => s.unique_contributors as f64,
        RepoSortKey::ActivityScore => s.activity_score,
        RepoSortKey::PullRequests => s.pull_requests_count as f64,
    };

    let mut repos: Vec<RepositoryStats> = all_repository_stats(contributors, now, policy)
        .into_values()
        .collect();
    repos.sort_by(|a, b| key(b).total_cmp(&key(a)).then_with(|| a.repo_name.cmp(&b.repo_name)));
    repos.truncate(limit);
    repos
}

/// 直近`days`日間の貢献数が多いリポジトリを返します
///
/// 並び順は直近の貢献数、トレンドスコア（貢献数 + 貢献者数）の降順、名前の昇順です。
pub fn trending_repositories<'a, I>(
    contributors: I,
    days: u32,
    limit: usize,
    now: NaiveDateTime,
) -> Vec<TrendingRepository>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDateTime::MIN);
    let mut recent: BTreeMap<&str, (usize, BTreeSet<&str>, NaiveDateTime)> = BTreeMap::new();

    for contributor in contributors {
        for c in contributor.contributions.iter().filter(|c| c.date >= cutoff) {
            let entry = recent
                .entry(c.repo_name.as_str())
                .or_insert((0, BTreeSet::new(), c.date));
            entry.0 += 1;
            entry.1.insert(contributor.github_username.as_str());
            entry.2 = entry.2.max(c.date);
        }
    }

    let mut trending: Vec<TrendingRepository> = recent
        .into_iter()
        .map(|(repo, (count, users, last))| TrendingRepository {
            repo_name: repo.to_string(),
            recent_contributions: count,
            recent_contributors: users.len(),
            trend_score: count + users.len(),
            last_activity: last,
        })
        .collect();

    trending.sort_by(|a, b| {
        b.recent_contributions
            .cmp(&a.recent_contributions)
            .then_with(|| b.trend_score.cmp(&a.trend_score))
            .then_with(|| a.repo_name.cmp(&b.repo_name))
    });
    trending.truncate(limit);
    trending
}

/// 複数のリポジトリを指標ごとに順位付けして比較します
///
/// 重複した名前は無視されます。同値の場合は名前の昇順で順位を決めます。
pub fn compare_repositories<'a, I>(
    contributors: I,
    repo_names: &[String],
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> RepositoryComparison
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let contributors: Vec<&Contributor> = contributors.into_iter().collect();
    let mut seen = HashSet::new();
    let repositories: Vec<RepositoryStats> = repo_names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| repository_stats(contributors.iter().copied(), name, now, policy))
        .collect();

    let metrics: [(&str, fn(&RepositoryStats) -> f64); 5] = [
        ("total_contributions", |s: &RepositoryStats| s.total_contributions as f64),
        ("unique_contributors", |s: &RepositoryStats| s.unique_contributors as f64),
        ("activity_score", |s: &RepositoryStats| s.activity_score),
        ("pull_requests_count", |s: &RepositoryStats| s.pull_requests_count as f64),
        ("contribution_frequency", |s: &RepositoryStats| s.contribution_frequency),
    ];

    let rankings = metrics
        .iter()
        .map(|(metric, value_of)| {
            let mut values: Vec<(&str, f64)> = repositories
                .iter()
                .map(|s| (s.repo_name.as_str(), value_of(s)))
                .collect();
            values.sort_by(|(na, a), (nb, b)| b.total_cmp(a).then_with(|| na.cmp(nb)));

            MetricRanking {
                metric: metric.to_string(),
                entries: values
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, value))| RankedValue {
                        repo_name: name.to_string(),
                        value,
                        rank: i + 1,
                    })
                    .collect(),
            }
        })
        .collect();

    RepositoryComparison {
        repositories,
        rankings,
    }
}

/// リポジトリのヘルスを評価します
pub fn repository_health<'a, I>(
    contributors: I,
    repo_name: &str,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> HealthReport
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let stats = repository_stats(contributors, repo_name, now, policy);
    let (score, metrics, warnings) = health_checks(
        stats.total_contributions,
        stats.unique_contributors,
        stats.pull_request_percentage,
        stats.activity_score,
    );
    let status = HealthStatus::from_score(score, &policy.health);

    HealthReport {
        repo_name: repo_name.to_string(),
        overall_score: score,
        status,
        metrics,
        warnings,
        recommendations: vec![status.recommendation().to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::model::fixtures::{at, contribution, contributor};

    fn policy() -> ScoringPolicy {
        ScoringPolicy::default()
    }

    fn sample() -> Vec<Contributor> {
        let mut alice = contributor("alice", "2025-09-01", "alpha", &["2025-10-01", "2025-10-02"]);
        alice.push_contribution(contribution("beta", "docs", "2025-10-03", Some(12)));
        let mut bob = contributor("bob", "2025-09-02", "alpha", &["2025-10-02"]);
        bob.contributions[0].pr_number = Some(7);
        let carol = contributor("carol", "2025-09-03", "gamma", &["2025-09-01"]);
        vec![alice, bob, carol]
    }

    #[test]
    fn test_repository_stats() {
        let all = sample();
        let stats = repository_stats(&all, "alpha", at("2025-10-03"), &policy());

        assert_eq!(stats.total_contributions, 3);
        assert_eq!(stats.unique_contributors, 2);
        assert!((stats.avg_contributions_per_contributor - 1.5).abs() < 1e-9);
        assert_eq!(stats.pull_requests_count, 1);
        assert!((stats.pull_request_percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.date_range.start_date.as_deref(), Some("2025-10-01"));
        assert_eq!(stats.date_range.end_date.as_deref(), Some("2025-10-02"));
        assert_eq!(stats.days_active, 2);
        assert_eq!(stats.date_range.days_span, 2);
        assert_eq!(stats.contribution_frequency, 1.5);
        assert_eq!(stats.timeline["2025-10-02"], 2);
        assert_eq!(stats.top_contributors[0].username, "alice");
        assert!((stats.top_contributors[0].percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.contributors, vec!["alice", "bob"]);
    }

    #[test]
    fn test_unknown_repository_is_zeroed() {
        let all = sample();
        let stats = repository_stats(&all, "missing", at("2025-10-03"), &policy());

        assert_eq!(stats.repo_name, "missing");
        assert_eq!(stats.total_contributions, 0);
        assert_eq!(stats.unique_contributors, 0);
        assert_eq!(stats.avg_contributions_per_contributor, 0.0);
        assert_eq!(stats.pull_request_percentage, 0.0);
        assert_eq!(stats.activity_score, 0.0);
        assert_eq!(stats.date_range, DateRange::default());
        assert_eq!(stats.health_status, HealthStatus::NeedsAttention);
    }

    #[test]
    fn test_activity_score_weights_recency() {
        let dates: Vec<String> = (1..=6).map(|d| format!("2025-10-{d:02}")).collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let all = vec![contributor("alice", "2025-09-01", "alpha", &refs)];

        // 6件すべてが直近 -> 重み付き貢献量6で10点 + 多様性5点
        let fresh = repository_stats(&all, "alpha", at("2025-10-06"), &policy());
        assert!((fresh.activity_score - 15.0).abs() < 1e-9);

        // 古くなると重み0.5で貢献量3 -> 6点 + 多様性5点
        let stale = repository_stats(&all, "alpha", at("2026-01-31"), &policy());
        assert!((stale.activity_score - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_health_status_boundaries() {
        let t = HealthThresholds::default();
        assert_eq!(HealthStatus::from_score(100, &t), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(80, &t), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(79, &t), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(65, &t), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(64, &t), HealthStatus::Moderate);
        assert_eq!(HealthStatus::from_score(50, &t), HealthStatus::Moderate);
        assert_eq!(HealthStatus::from_score(49, &t), HealthStatus::NeedsAttention);
        assert_eq!(HealthStatus::from_score(0, &t), HealthStatus::NeedsAttention);
    }

    #[test]
    fn test_health_report() {
        let all = sample();
        let report = repository_health(&all, "alpha", at("2025-10-03"), &policy());

        // 貢献量3(低) 多様性2(10点) PR率33%(15点) アクティビティ24.33(低)
        assert_eq!(report.overall_score, 25);
        assert_eq!(report.status, HealthStatus::NeedsAttention);
        assert_eq!(report.metrics["contribution_volume"], HealthLevel::Low);
        assert_eq!(report.metrics["contributor_diversity"], HealthLevel::Fair);
        assert_eq!(report.metrics["pr_activity"], HealthLevel::Good);
        assert_eq!(report.warnings, vec!["Low contribution volume", "Inconsistent activity"]);
        assert_eq!(report.recommendations.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "needs_attention");
        assert_eq!(json["metrics"]["pr_activity"], "good");
    }

    #[test]
    fn test_all_and_top_repositories() {
        let all = sample();
        let stats = all_repository_stats(&all, at("2025-10-03"), &policy());
        assert_eq!(stats.keys().collect::<Vec<_>>(), vec!["alpha", "beta", "gamma"]);

        let top = top_repositories(&all, 2, RepoSortKey::Contributions, at("2025-10-03"), &policy());
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].repo_name, "alpha");
        // betaとgammaは同数なので名前順
        assert_eq!(top[1].repo_name, "beta");

        let by_prs = top_repositories(&all, 3, RepoSortKey::PullRequests, at("2025-10-03"), &policy());
        assert_eq!(by_prs[0].repo_name, "alpha");
        assert_eq!(by_prs[1].repo_name, "beta");
        assert_eq!(by_prs[2].repo_name, "gamma");
    }

    #[test]
    fn test_trending_window() {
        let all = sample();
        let trending = trending_repositories(&all, 2, 10, at("2025-10-03"));

        // 2025-10-01T12:00 が境界ちょうど
        let names: Vec<_> = trending.iter().map(|t| t.repo_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(trending[0].recent_contributions, 3);
        assert_eq!(trending[0].recent_contributors, 2);
        assert_eq!(trending[0].trend_score, 5);
        assert_eq!(trending[0].last_activity, at("2025-10-02"));

        let narrow = trending_repositories(&all, 1, 10, at("2025-10-03"));
        assert_eq!(narrow[0].repo_name, "alpha");
        assert_eq!(narrow[0].recent_contributions, 2);

        assert_eq!(trending_repositories(&all, 7, 1, at("2025-10-03")).len(), 1);
        assert!(trending_repositories(&all, 0, 5, at("2025-12-01")).is_empty());
    }

    #[test]
    fn test_trending_window_beyond_calendar_covers_all_history() {
        let all = sample();
        let total: usize = all.iter().map(|c| c.contribution_count()).sum();

        let trending = trending_repositories(&all, u32::MAX, 10, at("2025-10-03"));

        assert_eq!(trending.iter().map(|t| t.recent_contributions).sum::<usize>(), total);
    }

    #[test]
    fn test_compare_ties_broken_by_name() {
        let all = sample();
        let names = vec![
            "gamma".to_string(),
            "beta".to_string(),
            "alpha".to_string(),
            "beta".to_string(),
        ];

        let comparison = compare_repositories(&all, &names, at("2025-10-03"), &policy());

        assert_eq!(comparison.repositories.len(), 3);
        let totals = &comparison.rankings[0];
        assert_eq!(totals.metric, "total_contributions");
        let order: Vec<_> = totals.entries.iter().map(|e| (e.repo_name.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("alpha", 1), ("beta", 2), ("gamma", 3)]);
        assert_eq!(comparison.rankings.len(), 5);
    }

    #[test]
    fn test_compare_unknown_repository() {
        let all = sample();
        let names = vec!["nope".to_string(), "alpha".to_string()];
        let comparison = compare_repositories(&all, &names, at("2025-10-03"), &policy());

        let last = comparison.rankings[0].entries.last().unwrap();
        assert_eq!(last.repo_name, "nope");
        assert_eq!(last.value, 0.0);
    }
}
