//! 貢献者とプロジェクト全体のメトリクスを計算するモジュール
//!
//! すべての関数は入力を変更しない純粋関数で、空の入力に対しては
//! エラーではなくゼロ値の集計を返します。
//! 「現在時刻」に依存する計算は、呼び出し側から基準時刻を受け取ります。

use super::config::{EngagementWeights, ScoringPolicy};
use super::model::{Contributor, COMPLETION_THRESHOLD};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// 貢献数分布のバケット（ラベル、下限、上限）
const DISTRIBUTION_BUCKETS: [(&str, usize, Option<usize>); 5] = [
    ("0", 0, Some(0)),
    ("1-3", 1, Some(3)),
    ("4-6", 4, Some(6)),
    ("7-9", 7, Some(9)),
    ("10+", 10, None),
];

/// 貢献者ごとの分析メトリクス
///
/// # フィールド
///
/// - `contribution_streak`: 連続して貢献した暦日の最長日数
/// - `days_active`: 貢献のあった暦日の数
/// - `average_days_between_contributions`: 連続する活動日の平均間隔（日）
/// - `most_active_day`: 最も貢献の多い曜日（同数の場合は月曜日に近い方）
/// - `engagement_score`: 貢献量・連続日数・新しさから算出したスコア（0-100）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorMetrics {
    pub name: String,
    pub username: String,
    pub joined_date: NaiveDateTime,
    pub total_contributions: usize,
    pub contribution_streak: usize,
    pub days_active: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub average_days_between_contributions: f64,
    pub most_active_day: Option<String>,
    pub first_contribution: Option<NaiveDateTime>,
    pub last_contribution: Option<NaiveDateTime>,
    pub contributions_by_type: IndexMap<String, usize>,
    pub contributions_by_repo: IndexMap<String, usize>,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub engagement_score: f64,
    pub hacktoberfest_complete: bool,
}

/// エンゲージメントスコア順に並べた貢献者
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedContributor {
    pub rank: usize,
    pub name: String,
    pub username: String,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub engagement_score: f64,
    pub contributions: usize,
    pub contribution_streak: usize,
    pub hacktoberfest_complete: bool,
    pub joined_date: NaiveDateTime,
}

/// プロジェクト全体の集計メトリクス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total_contributors: usize,
    pub total_contributions: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub average_contributions_per_contributor: f64,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub median_contributions_per_contributor: f64,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub contribution_std_dev: f64,
    pub min_contributions: usize,
    pub max_contributions: usize,
    pub completed_contributors: usize,
    #[serde(serialize_with = "round_to_3", deserialize_with = "deserialize_f64")]
    pub hacktoberfest_completion_rate: f64,
    pub unique_repositories: usize,
    pub top_contributors: Vec<RankedContributor>,
    pub top_repositories: IndexMap<String, usize>,
    pub contribution_types_summary: IndexMap<String, usize>,
    pub contribution_distribution: IndexMap<String, usize>,
}

/// 日付ごとの貢献数の推移
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeriesMetrics {
    pub daily: IndexMap<String, usize>,
    pub cumulative: IndexMap<String, usize>,
    pub weekly: IndexMap<String, usize>,
    pub busiest_day: Option<String>,
    pub busiest_day_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceInsights {
    pub highlights: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub statistics: IndexMap<String, String>,
}

/// メトリクスのJSONエクスポートに使う総合サマリー
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub generated_at: NaiveDateTime,
    pub project_metrics: ProjectMetrics,
    pub ranking: Vec<RankedContributor>,
    pub time_series: TimeSeriesMetrics,
    pub insights: PerformanceInsights,
}

/// 浮動小数点数を3桁に丸める補助関数
///
/// # 引数
///
/// - `value`: 丸める浮動小数点数
/// - `serializer`: serdeシリアライザ
pub(crate) fn round_to_3<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64((*value * 1000.0).round() / 1000.0)
}

/// f64値をデシリアライズする補助関数
pub(crate) fn deserialize_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer)
}

/// 貢献のあった暦日を昇順・重複なしで返します
fn active_days(contributor: &Contributor) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = contributor.contributions.iter().map(|c| c.day()).collect();
    days.sort();
    days.dedup();
    days
}

/// 昇順・重複なしの日付列から最長の連続日数を求めます
fn longest_run(days: &[NaiveDate]) -> usize {
    let mut longest = 0;
    let mut streak = 0;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        streak = match prev {
            Some(p) if (*day - p).num_days() == 1 => streak + 1,
            _ => 1,
        };
        longest = longest.max(streak);
        prev = Some(*day);
    }

    longest
}

/// 貢献者の最長連続貢献日数
pub fn contribution_streak(contributor: &Contributor) -> usize {
    longest_run(&active_days(contributor))
}

fn average_gap_days(days: &[NaiveDate]) -> f64 {
    match (days.first(), days.last()) {
        (Some(first), Some(last)) if days.len() > 1 => {
            (*last - *first).num_days() as f64 / (days.len() - 1) as f64
        }
        _ => 0.0,
    }
}

fn most_active_day(contributor: &Contributor) -> Option<String> {
    let mut counts = [0usize; 7];
    for c in &contributor.contributions {
        counts[c.date.weekday().num_days_from_monday() as usize] += 1;
    }

    let (index, count) = counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (i, &n)| if n > best.1 { (i, n) } else { best });

    (count > 0).then(|| WEEKDAY_NAMES[index].to_string())
}

/// キーごとの件数を数え、件数の降順・名前の昇順に並べます
pub(crate) fn count_sorted<'a>(keys: impl Iterator<Item = &'a str>) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts.sort_by(|ka, va, kb, vb| vb.cmp(va).then_with(|| ka.cmp(kb)));
    counts
}

fn ratio(value: f64, target: u32) -> f64 {
    if target == 0 {
        1.0
    } else {
        (value / target as f64).min(1.0)
    }
}

/// エンゲージメントスコアを計算します
///
/// 式は[`EngagementWeights`]を参照してください。貢献がない場合は0です。
/// 最終貢献からの日数は暦日で数え、負にはなりません。
pub fn engagement_score(
    contributor: &Contributor,
    now: NaiveDateTime,
    weights: &EngagementWeights,
) -> f64 {
    let count = contributor.contribution_count();
    if count == 0 {
        return 0.0;
    }

    let volume = ratio(count as f64, weights.volume_target);
    let streak = ratio(contribution_streak(contributor) as f64, weights.streak_target);
    let recency = match contributor.latest_contribution() {
        Some(last) if weights.recency_window_days > 0 => {
            let days_since = (now.date() - last.date()).num_days().max(0) as f64;
            (1.0 - days_since / weights.recency_window_days as f64).max(0.0)
        }
        _ => 0.0,
    };

    let score = weights.volume_weight * volume
        + weights.streak_weight * streak
        + weights.recency_weight * recency;
    score.clamp(0.0, 100.0)
}

/// 1人の貢献者のメトリクスを計算します
pub fn contributor_metrics(
    contributor: &Contributor,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> ContributorMetrics {
    let days = active_days(contributor);

    ContributorMetrics {
        name: contributor.name.clone(),
        username: contributor.github_username.clone(),
        joined_date: contributor.joined_date,
        total_contributions: contributor.contribution_count(),
        contribution_streak: longest_run(&days),
        days_active: days.len(),
        average_days_between_contributions: average_gap_days(&days),
        most_active_day: most_active_day(contributor),
        first_contribution: contributor.contributions.iter().map(|c| c.date).min(),
        last_contribution: contributor.latest_contribution(),
        contributions_by_type: count_sorted(
            contributor.contributions.iter().map(|c| c.contribution_type.as_str()),
        ),
        contributions_by_repo: count_sorted(
            contributor.contributions.iter().map(|c| c.repo_name.as_str()),
        ),
        engagement_score: engagement_score(contributor, now, &policy.engagement),
        hacktoberfest_complete: contributor.is_hacktoberfest_complete(),
    }
}

/// 全貢献者をエンゲージメントスコア順に並べます
///
/// 並び順はスコアの降順、参加日の早い順、ユーザー名の昇順です。
pub fn contributors_ranking<'a, I>(
    contributors: I,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> Vec<RankedContributor>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut scored: Vec<(&Contributor, f64)> = contributors
        .into_iter()
        .map(|c| (c, engagement_score(c, now, &policy.engagement)))
        .collect();

    scored.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| a.joined_date.cmp(&b.joined_date))
            .then_with(|| a.github_username.cmp(&b.github_username))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (c, score))| RankedContributor {
            rank: i + 1,
            name: c.name.clone(),
            username: c.github_username.clone(),
            engagement_score: score,
            contributions: c.contribution_count(),
            contribution_streak: contribution_streak(c),
            hacktoberfest_complete: c.is_hacktoberfest_complete(),
            joined_date: c.joined_date,
        })
        .collect()
}

fn median(sorted: &[usize]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2] as f64,
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

/// プロジェクト全体のメトリクスを計算します
///
/// # 引数
///
/// - `contributors`: 対象の貢献者
/// - `top_n`: `top_contributors`に含める人数
/// - `now`: 新しさの基準時刻
/// - `policy`: スコア計算ポリシー
pub fn project_metrics<'a, I>(
    contributors: I,
    top_n: usize,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> ProjectMetrics
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let contributors: Vec<&Contributor> = contributors.into_iter().collect();
    let mut counts: Vec<usize> = contributors.iter().map(|c| c.contribution_count()).collect();
    counts.sort_unstable();

    let total_contributors = contributors.len();
    let total_contributions: usize = counts.iter().sum();
    let completed = contributors.iter().filter(|c| c.is_hacktoberfest_complete()).count();

    let (average, std_dev, completion_rate) = if total_contributors > 0 {
        let n = total_contributors as f64;
        let mean = total_contributions as f64 / n;
        let variance = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt(), completed as f64 / n * 100.0)
    } else {
        (0.0, 0.0, 0.0)
    };

    let all_contributions = || contributors.iter().flat_map(|c| c.contributions.iter());
    let top_repositories = count_sorted(all_contributions().map(|c| c.repo_name.as_str()));
    let contribution_types_summary =
        count_sorted(all_contributions().map(|c| c.contribution_type.as_str()));

    let contribution_distribution = DISTRIBUTION_BUCKETS
        .iter()
        .map(|(label, low, high)| {
            let n = counts
                .iter()
                .filter(|&&c| c >= *low && high.map_or(true, |h| c <= h))
                .count();
            (label.to_string(), n)
        })
        .collect();

    let mut top_contributors = contributors_ranking(contributors.iter().copied(), now, policy);
    top_contributors.truncate(top_n);

    ProjectMetrics {
        total_contributors,
        total_contributions,
        average_contributions_per_contributor: average,
        median_contributions_per_contributor: median(&counts),
        contribution_std_dev: std_dev,
        min_contributions: counts.first().copied().unwrap_or(0),
        max_contributions: counts.last().copied().unwrap_or(0),
        completed_contributors: completed,
        hacktoberfest_completion_rate: completion_rate,
        unique_repositories: top_repositories.len(),
        top_contributors,
        top_repositories,
        contribution_types_summary,
        contribution_distribution,
    }
}

/// 日別・週別の貢献数の推移を計算します
pub fn time_series_metrics<'a, I>(contributors: I) -> TimeSeriesMetrics
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for c in contributors.into_iter().flat_map(|c| c.contributions.iter()) {
        *by_day.entry(c.day()).or_insert(0) += 1;
    }

    let mut series = TimeSeriesMetrics::default();
    let mut running = 0;
    for (day, count) in &by_day {
        let key = day.format("%Y-%m-%d").to_string();
        running += count;

        if *count > series.busiest_day_count {
            series.busiest_day = Some(key.clone());
            series.busiest_day_count = *count;
        }

        let week = day.iso_week();
        *series
            .weekly
            .entry(format!("{:04}-W{:02}", week.year(), week.week()))
            .or_insert(0) += count;

        series.daily.insert(key.clone(), *count);
        series.cumulative.insert(key, running);
    }

    series
}

/// プロジェクトの状況からハイライト・懸念点・推奨事項を生成します
pub fn performance_insights<'a, I>(
    contributors: I,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> PerformanceInsights
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let contributors: Vec<&Contributor> = contributors.into_iter().collect();
    let metrics = project_metrics(contributors.iter().copied(), 1, now, policy);
    let mut insights = PerformanceInsights::default();

    if contributors.is_empty() {
        insights.concerns.push("No contributors registered yet".to_string());
        insights
            .recommendations
            .push("Invite contributors and record their first contributions".to_string());
    }

    let rate = metrics.hacktoberfest_completion_rate;
    if metrics.total_contributors > 0 {
        if rate >= 50.0 {
            insights
                .highlights
                .push(format!("{rate:.1}% of contributors completed Hacktoberfest"));
        } else if rate < 25.0 {
            insights
                .concerns
                .push(format!("Only {rate:.1}% of contributors completed Hacktoberfest"));
        }
    }

    if let Some(top) = metrics.top_contributors.first().filter(|t| t.contributions > 0) {
        insights.highlights.push(format!(
            "@{} leads with an engagement score of {:.1}",
            top.username, top.engagement_score
        ));
    }

    if let Some((username, streak)) = contributors
        .iter()
        .map(|c| (&c.github_username, contribution_streak(c)))
        .max_by(|(ua, a), (ub, b)| a.cmp(b).then_with(|| ub.cmp(ua)))
        .filter(|(_, s)| *s >= 3)
    {
        insights
            .highlights
            .push(format!("@{username} has a {streak}-day contribution streak"));
    }

    let almost = contributors
        .iter()
        .filter(|c| c.contribution_count() + 1 == COMPLETION_THRESHOLD)
        .count();
    if almost > 0 {
        insights.recommendations.push(format!(
            "{almost} contributor(s) are one contribution away from completing"
        ));
    }

    let not_started = contributors.iter().filter(|c| c.contributions.is_empty()).count();
    if not_started > 0 {
        insights
            .concerns
            .push(format!("{not_started} contributor(s) have not contributed yet"));
        insights
            .recommendations
            .push("Reach out to contributors who have not started".to_string());
    }

    let window = i64::from(policy.engagement.recency_window_days);
    let inactive = contributors
        .iter()
        .filter_map(|c| c.latest_contribution())
        .filter(|last| (now.date() - last.date()).num_days() > window)
        .count();
    if inactive > 0 {
        insights.concerns.push(format!(
            "{inactive} contributor(s) inactive for more than {window} days"
        ));
    }

    match metrics.unique_repositories {
        0 => {}
        1 => {
            insights
                .concerns
                .push("All contributions target a single repository".to_string());
            insights
                .recommendations
                .push("Suggest issues in other repositories to spread contributions".to_string());
        }
        n if n >= 5 => insights
            .highlights
            .push(format!("Contributions span {n} repositories")),
        _ => {}
    }

    let stats = &mut insights.statistics;
    stats.insert("Total Contributors".to_string(), metrics.total_contributors.to_string());
    stats.insert("Total Contributions".to_string(), metrics.total_contributions.to_string());
    stats.insert("Completion Rate".to_string(), format!("{rate:.1}%"));
    stats.insert(
        "Average Contributions".to_string(),
        format!("{:.2}", metrics.average_contributions_per_contributor),
    );
    stats.insert(
        "Unique Repositories".to_string(),
        metrics.unique_repositories.to_string(),
    );

    insights
}

/// メトリクスエクスポート用の総合サマリーを作成します
pub fn performance_summary<'a, I>(
    contributors: I,
    now: NaiveDateTime,
    policy: &ScoringPolicy,
) -> PerformanceSummary
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let contributors: Vec<&Contributor> = contributors.into_iter().collect();
    let project = project_metrics(contributors.iter().copied(), 10, now, policy);

    PerformanceSummary {
        generated_at: now,
        project_metrics: project,
        ranking: contributors_ranking(contributors.iter().copied(), now, policy),
        time_series: time_series_metrics(contributors.iter().copied()),
        insights: performance_insights(contributors.iter().copied(), now, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::model::fixtures::{at, contribution, contributor};

    fn policy() -> ScoringPolicy {
        ScoringPolicy::default()
    }

    fn usernames(ranking: &[RankedContributor]) -> Vec<&str> {
        ranking.iter().map(|r| r.username.as_str()).collect()
    }

    #[test]
    fn test_streak_example() {
        let mut alice = contributor(
            "alice",
            "2025-09-30",
            "repo",
            &["2025-10-01", "2025-10-02", "2025-10-03"],
        );
        assert_eq!(contribution_streak(&alice), 3);

        alice.push_contribution(contribution("repo", "docs", "2025-10-10", None));
        assert_eq!(contribution_streak(&alice), 3);
    }

    #[test]
    fn test_streak_counts_days_not_contributions() {
        let c = contributor(
            "bob",
            "2025-09-30",
            "repo",
            &["2025-10-01", "2025-10-01", "2025-10-01", "2025-10-03"],
        );
        assert_eq!(contribution_streak(&c), 1);
    }

    #[test]
    fn test_contributor_metrics() {
        // 2025-10-01は水曜日
        let mut c = contributor(
            "carol",
            "2025-09-28",
            "alpha",
            &["2025-10-01", "2025-10-02", "2025-10-08"],
        );
        c.push_contribution(contribution("beta", "docs", "2025-10-08", Some(4)));

        let m = contributor_metrics(&c, at("2025-10-08"), &policy());

        assert_eq!(m.total_contributions, 4);
        assert_eq!(m.contribution_streak, 2);
        assert_eq!(m.days_active, 3);
        // (10/08 - 10/01) / 2
        assert!((m.average_days_between_contributions - 3.5).abs() < 1e-9);
        assert_eq!(m.most_active_day.as_deref(), Some("Wednesday"));
        assert_eq!(m.first_contribution, Some(at("2025-10-01")));
        assert_eq!(m.last_contribution, Some(at("2025-10-08")));
        assert_eq!(m.contributions_by_repo.get_index(0), Some((&"alpha".to_string(), &3)));
        assert_eq!(m.contributions_by_type.get("docs"), Some(&1));
        assert!(m.hacktoberfest_complete);
    }

    #[test]
    fn test_empty_contributor_metrics() {
        let c = contributor("dan", "2025-10-01", "repo", &[]);
        let m = contributor_metrics(&c, at("2025-10-05"), &policy());

        assert_eq!(m.total_contributions, 0);
        assert_eq!(m.contribution_streak, 0);
        assert_eq!(m.days_active, 0);
        assert_eq!(m.average_days_between_contributions, 0.0);
        assert_eq!(m.most_active_day, None);
        assert_eq!(m.engagement_score, 0.0);
        assert!(!m.hacktoberfest_complete);
    }

    #[test]
    fn test_engagement_score_formula() {
        let c = contributor(
            "erin",
            "2025-09-30",
            "repo",
            &["2025-10-01", "2025-10-02", "2025-10-03", "2025-10-04", "2025-10-05"],
        );
        let w = EngagementWeights::default();

        // 当日: 40*0.5 + 30*(5/7) + 30*1.0
        let fresh = engagement_score(&c, at("2025-10-05"), &w);
        assert!((fresh - (20.0 + 30.0 * 5.0 / 7.0 + 30.0)).abs() < 1e-9);

        // 15日後は新しさが半分
        let later = engagement_score(&c, at("2025-10-20"), &w);
        assert!((later - (20.0 + 30.0 * 5.0 / 7.0 + 15.0)).abs() < 1e-9);

        // 窓を過ぎると新しさは0
        let stale = engagement_score(&c, at("2025-12-31"), &w);
        assert!((stale - (20.0 + 30.0 * 5.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_engagement_score_is_capped() {
        let dates: Vec<String> = (1..=20).map(|d| format!("2025-10-{d:02}")).collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let c = contributor("max", "2025-09-30", "repo", &refs);

        let score = engagement_score(&c, at("2025-10-20"), &EngagementWeights::default());
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_order_and_tie_break() {
        let early = contributor("zed", "2025-09-01", "repo", &["2025-10-01"]);
        let late = contributor("amy", "2025-09-15", "repo", &["2025-10-01"]);
        let same_day = contributor("bea", "2025-09-15", "repo", &["2025-10-01"]);
        let top = contributor("top", "2025-09-20", "repo", &["2025-10-01", "2025-10-02"]);
        let idle = contributor("idle", "2025-08-01", "repo", &[]);

        let all = vec![late, idle, same_day, top, early];
        let ranking = contributors_ranking(&all, at("2025-10-02"), &policy());

        assert_eq!(usernames(&ranking), vec!["top", "zed", "amy", "bea", "idle"]);
        assert_eq!(ranking.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert!(ranking
            .windows(2)
            .all(|w| w[0].engagement_score >= w[1].engagement_score));
    }

    #[test]
    fn test_project_metrics_totals() {
        let all = vec![
            contributor("a", "2025-09-01", "r1", &["2025-10-01"]),
            contributor("b", "2025-09-01", "r2", &["2025-10-01", "2025-10-02", "2025-10-03", "2025-10-04"]),
            contributor("c", "2025-09-01", "r1", &["2025-10-01", "2025-10-05"]),
            contributor("d", "2025-09-01", "r1", &[]),
        ];

        let m = project_metrics(&all, 2, at("2025-10-05"), &policy());

        let sum: usize = all.iter().map(|c| c.contribution_count()).sum();
        assert_eq!(m.total_contributions, sum);
        assert_eq!(m.total_contributors, 4);
        assert!((m.average_contributions_per_contributor - 1.75).abs() < 1e-9);
        assert!((m.median_contributions_per_contributor - 1.5).abs() < 1e-9);
        assert_eq!(m.min_contributions, 0);
        assert_eq!(m.max_contributions, 4);
        assert_eq!(m.completed_contributors, 1);
        assert!((m.hacktoberfest_completion_rate - 25.0).abs() < 1e-9);
        assert_eq!(m.unique_repositories, 2);
        assert_eq!(m.top_contributors.len(), 2);
        assert_eq!(m.top_contributors[0].username, "b");
        assert_eq!(m.top_repositories.get_index(0), Some((&"r2".to_string(), &4)));
        assert_eq!(m.contribution_distribution["0"], 1);
        assert_eq!(m.contribution_distribution["1-3"], 2);
        assert_eq!(m.contribution_distribution["4-6"], 1);
        assert_eq!(m.contribution_distribution["10+"], 0);
    }

    #[test]
    fn test_empty_project_metrics() {
        let none: Vec<Contributor> = Vec::new();
        let m = project_metrics(&none, 5, at("2025-10-05"), &policy());

        assert_eq!(m.total_contributors, 0);
        assert_eq!(m.total_contributions, 0);
        assert_eq!(m.average_contributions_per_contributor, 0.0);
        assert_eq!(m.median_contributions_per_contributor, 0.0);
        assert_eq!(m.contribution_std_dev, 0.0);
        assert_eq!(m.hacktoberfest_completion_rate, 0.0);
        assert!(m.top_contributors.is_empty());
        assert_eq!(m.contribution_distribution.len(), 5);
    }

    #[test]
    fn test_time_series() {
        let all = vec![
            contributor("a", "2025-09-01", "r", &["2025-10-01", "2025-10-06"]),
            contributor("b", "2025-09-01", "r", &["2025-10-06", "2025-10-01", "2025-10-01"]),
        ];

        let ts = time_series_metrics(&all);

        assert_eq!(ts.daily.keys().collect::<Vec<_>>(), vec!["2025-10-01", "2025-10-06"]);
        assert_eq!(ts.daily["2025-10-01"], 3);
        assert_eq!(ts.cumulative["2025-10-06"], 5);
        assert_eq!(ts.weekly["2025-W40"], 3);
        assert_eq!(ts.weekly["2025-W41"], 2);
        assert_eq!(ts.busiest_day.as_deref(), Some("2025-10-01"));
        assert_eq!(ts.busiest_day_count, 3);
    }

    #[test]
    fn test_insights() {
        let all = vec![
            contributor("a", "2025-09-01", "r", &["2025-10-01", "2025-10-02", "2025-10-03"]),
            contributor("b", "2025-09-01", "r", &[]),
        ];

        let insights = performance_insights(&all, at("2025-10-03"), &policy());

        assert!(insights.highlights.iter().any(|h| h.contains("@a has a 3-day")));
        assert!(insights.concerns.iter().any(|c| c.contains("1 contributor(s) have not")));
        assert!(insights.concerns.iter().any(|c| c.contains("single repository")));
        assert!(insights
            .recommendations
            .iter()
            .any(|r| r.contains("one contribution away")));
        assert_eq!(insights.statistics["Completion Rate"], "0.0%");
    }

    #[test]
    fn test_round_to_3() {
        #[derive(Serialize)]
        struct TestStruct {
            #[serde(serialize_with = "round_to_3")]
            value: f64,
        }

        let test_cases = vec![(1.23456, 1.235), (0.12345, 0.123), (1.0, 1.0), (57.14285, 57.143)];

        for (input, expected) in test_cases {
            let json = serde_json::to_value(TestStruct { value: input }).unwrap();
            assert!((json["value"].as_f64().unwrap() - expected).abs() < 0.0001);
        }
    }

    #[test]
    fn test_metrics_serialization() {
        let c = contributor("fay", "2025-09-01", "r", &["2025-10-01"]);
        let m = contributor_metrics(&c, at("2025-10-04"), &policy());

        let json = serde_json::to_string(&m).unwrap();
        let back: ContributorMetrics = serde_json::from_str(&json).unwrap();

        assert_eq!(back.username, "fay");
        assert!((back.engagement_score - m.engagement_score).abs() < 0.001);
    }
}
