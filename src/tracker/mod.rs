//! 貢献トラッカーの中核となるモジュール
//!
//! `ProjectTracker`が貢献者の集合を所有し、分析は以下のエンジンに委譲します。
//!
//! 1. `metrics`: 貢献者ごと・プロジェクト全体のメトリクス
//! 2. `repo_stats`: リポジトリごとの統計とヘルス評価
//! 3. `search`: 検索・フィルタ・並び替え
//!
//! 永続化は`storage`、CSVの入出力は`csv_io`が担当します。
//!
//! # 主要なコンポーネント
//!
//! - `ProjectTracker`: 貢献者の登録と各エンジンへの委譲を行う構造体
//! - `Contributor`: 貢献を所有する貢献者
//! - `ScoringPolicy`: スコア計算の重みと閾値

pub mod config;
pub mod csv_io;
mod error;
pub mod metrics;
pub mod model;
pub mod repo_stats;
pub mod search;
mod storage;

pub use config::ScoringPolicy;
pub use csv_io::{CsvSchema, ExportKind, ImportReport};
pub use error::TrackerError;
pub use model::{Contribution, Contributor, ProjectData};
pub use storage::JsonStore;

use chrono::NaiveDateTime;
use metrics::{
    ContributorMetrics, PerformanceInsights, PerformanceSummary, ProjectMetrics, RankedContributor,
    TimeSeriesMetrics,
};
use model::local_now;
use repo_stats::{HealthReport, RepoSortKey, RepositoryComparison, RepositoryStats, TrendingRepository};
use search::{
    ContributionField, ContributionFilter, ContributionMatch, ContributorFilter, QuickStats, SearchField,
    SearchStatistics, SearchType, SortField, SortOrder,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// リーダーボードの1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub github_username: String,
    pub email: Option<String>,
    pub contribution_count: usize,
    pub unique_repositories: usize,
    pub latest_contribution: Option<NaiveDateTime>,
    pub joined_date: NaiveDateTime,
}

/// プロジェクトの概要統計
///
/// `completion_rate`はパーセントです。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStats {
    pub project_name: String,
    pub total_contributors: usize,
    pub total_contributions: usize,
    pub completed_hacktoberfest: usize,
    #[serde(serialize_with = "metrics::round_to_3")]
    pub completion_rate: f64,
    #[serde(serialize_with = "metrics::round_to_3")]
    pub avg_contributions_per_contributor: f64,
    pub unique_repositories: usize,
    pub contributions_by_type: indexmap::IndexMap<String, usize>,
    pub created_date: NaiveDateTime,
}

/// 貢献者の登録と分析を行うメインの構造体
///
/// # フィールド
///
/// - `data`: 永続化されるプロジェクトデータ
/// - `store`: 保存先のJSONファイル（メモリ上のみの場合は`None`）
/// - `policy`: スコア計算ポリシー
pub struct ProjectTracker {
    data: ProjectData,
    store: Option<JsonStore>,
    policy: ScoringPolicy,
}

impl ProjectTracker {
    /// JSONファイルを保存先とするトラッカーを開きます
    ///
    /// # 引数
    ///
    /// - `path`: データファイルのパス
    /// - `default_project_name`: ファイルが存在しない場合のプロジェクト名
    /// - `policy`: スコア計算ポリシー
    ///
    /// ファイルが読めない、またはJSONとして不正な場合は警告を出力し、
    /// 貢献者のいないプロジェクトとして開始します。
    pub fn open(path: impl AsRef<Path>, default_project_name: &str, policy: ScoringPolicy) -> Self {
        let store = JsonStore::new(path);
        let data = match store.load() {
            Ok(Some(data)) => {
                info!(
                    project = %data.project_name,
                    contributors = data.contributors.len(),
                    "loaded project"
                );
                data
            }
            Ok(None) => ProjectData::new(default_project_name),
            Err(e) => {
                warn!(path = %store.path().display(), error = %e, "failed to load project data, starting empty");
                ProjectData::new(default_project_name)
            }
        };

        Self {
            data,
            store: Some(store),
            policy,
        }
    }

    /// 保存先を持たないトラッカーを作成します
    pub fn in_memory(project_name: &str, policy: ScoringPolicy) -> Self {
        Self {
            data: ProjectData::new(project_name),
            store: None,
            policy,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.data.project_name
    }

    pub fn data(&self) -> &ProjectData {
        &self.data
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// プロジェクトデータを保存します
    ///
    /// # エラー
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返します
    pub fn save(&self) -> Result<(), TrackerError> {
        match &self.store {
            Some(store) => store.save(&self.data),
            None => {
                debug!("in-memory tracker, nothing to save");
                Ok(())
            }
        }
    }

    /// 変更後の保存。メモリ上の変更は失敗しても保持されます
    fn persist(&self) -> Result<(), TrackerError> {
        self.save().map_err(|e| {
            warn!(error = %e, "failed to save project data");
            e
        })
    }

    /// 貢献者を登録します
    ///
    /// 既に登録済みのユーザー名の場合は、既存の貢献者をそのまま返します。
    ///
    /// # エラー
    ///
    /// 名前またはユーザー名が空の場合に`ValidationError`を返します。
    /// 新しい貢献者を保存できなかった場合は保存時のエラーを返します
    pub fn add_contributor(
        &mut self,
        name: &str,
        github_username: &str,
        email: Option<&str>,
    ) -> Result<&Contributor, TrackerError> {
        let name = name.trim();
        let username = github_username.trim();
        if name.is_empty() || username.is_empty() {
            return Err(TrackerError::ValidationError(
                "name and github_username must not be empty".to_string(),
            ));
        }

        if self.data.contributors.contains_key(username) {
            debug!(username, "contributor already registered");
        } else {
            let contributor = Contributor::new(name, username, email.map(|e| e.trim().to_string()));
            self.data.contributors.insert(username.to_string(), contributor);
            info!(username, "added contributor");
            self.persist()?;
        }

        self.data
            .contributors
            .get(username)
            .ok_or_else(|| TrackerError::ContributorNotFound(username.to_string()))
    }

    /// 現在時刻で貢献を記録します
    ///
    /// 未登録のユーザー名の場合は`Ok(false)`を返します。
    ///
    /// # エラー
    ///
    /// リポジトリ名または種類が空の場合に`ValidationError`、
    /// 保存に失敗した場合は保存時のエラーを返します
    pub fn add_contribution(
        &mut self,
        github_username: &str,
        repo_name: &str,
        contribution_type: &str,
        description: &str,
        pr_number: Option<u64>,
    ) -> Result<bool, TrackerError> {
        self.record_contribution(
            github_username,
            Contribution {
                repo_name: repo_name.trim().to_string(),
                contribution_type: contribution_type.trim().to_string(),
                description: description.to_string(),
                pr_number,
                date: local_now(),
            },
        )
    }

    /// 日時を指定済みの貢献を記録します
    pub fn record_contribution(
        &mut self,
        github_username: &str,
        contribution: Contribution,
    ) -> Result<bool, TrackerError> {
        if contribution.repo_name.trim().is_empty() || contribution.contribution_type.trim().is_empty() {
            return Err(TrackerError::ValidationError(
                "repo_name and type must not be empty".to_string(),
            ));
        }

        let Some(contributor) = self.data.contributors.get_mut(github_username) else {
            debug!(username = github_username, "contribution for unknown contributor");
            return Ok(false);
        };

        info!(
            username = github_username,
            repo = %contribution.repo_name,
            kind = %contribution.contribution_type,
            total = contributor.contribution_count() + 1,
            "recorded contribution"
        );
        contributor.push_contribution(contribution);
        if contributor.contribution_count() == model::COMPLETION_THRESHOLD {
            info!(username = github_username, "contributor completed Hacktoberfest");
        }
        self.persist()?;
        Ok(true)
    }

    pub fn contributor(&self, github_username: &str) -> Option<&Contributor> {
        self.data.contributors.get(github_username)
    }

    /// 登録順の全貢献者
    pub fn contributors(&self) -> Vec<&Contributor> {
        self.data.contributors.values().collect()
    }

    pub fn completed_contributors(&self) -> Vec<&Contributor> {
        self.data
            .contributors
            .values()
            .filter(|c| c.is_hacktoberfest_complete())
            .collect()
    }

    /// 貢献数の降順に並べたリーダーボード（同数は登録順）
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .data
            .contributors
            .values()
            .map(|c| LeaderboardEntry {
                name: c.name.clone(),
                github_username: c.github_username.clone(),
                email: c.email.clone(),
                contribution_count: c.contribution_count(),
                unique_repositories: c.unique_repositories(),
                latest_contribution: c.latest_contribution(),
                joined_date: c.joined_date,
            })
            .collect();
        entries.sort_by(|a, b| b.contribution_count.cmp(&a.contribution_count));
        entries
    }

    pub fn project_stats(&self) -> ProjectStats {
        let contributors = self.contributors();
        let total_contributors = contributors.len();
        let total_contributions: usize = contributors.iter().map(|c| c.contribution_count()).sum();
        let completed = contributors
            .iter()
            .filter(|c| c.is_hacktoberfest_complete())
            .count();
        let all = || contributors.iter().flat_map(|c| c.contributions.iter());
        let per_contributor = |n: usize| {
            if total_contributors > 0 {
                n as f64 / total_contributors as f64
            } else {
                0.0
            }
        };

        ProjectStats {
            project_name: self.data.project_name.clone(),
            total_contributors,
            total_contributions,
            completed_hacktoberfest: completed,
            completion_rate: per_contributor(completed) * 100.0,
            avg_contributions_per_contributor: per_contributor(total_contributions),
            unique_repositories: all().map(|c| c.repo_name.as_str()).collect::<HashSet<_>>().len(),
            contributions_by_type: metrics::count_sorted(all().map(|c| c.contribution_type.as_str())),
            created_date: self.data.created_date,
        }
    }

    /// 新しい順に最大`limit`件の貢献を返します
    pub fn recent_contributions(&self, limit: usize) -> Vec<ContributionMatch<'_>> {
        let mut all = search::filter_contributions(self.data.contributors.values(), &ContributionFilter::default());
        all.sort_by(|a, b| b.contribution.date.cmp(&a.contribution.date));
        all.truncate(limit);
        all
    }

    // メトリクス

    pub fn contributor_metrics(&self, github_username: &str) -> Option<ContributorMetrics> {
        self.contributor(github_username)
            .map(|c| metrics::contributor_metrics(c, local_now(), &self.policy))
    }

    /// 未登録のユーザー名の場合は0を返します
    pub fn engagement_score(&self, github_username: &str) -> f64 {
        self.contributor(github_username)
            .map_or(0.0, |c| metrics::engagement_score(c, local_now(), &self.policy.engagement))
    }

    pub fn contributors_ranking(&self) -> Vec<RankedContributor> {
        metrics::contributors_ranking(self.data.contributors.values(), local_now(), &self.policy)
    }

    pub fn project_metrics(&self, top_n: usize) -> ProjectMetrics {
        metrics::project_metrics(self.data.contributors.values(), top_n, local_now(), &self.policy)
    }

    pub fn time_series_metrics(&self) -> TimeSeriesMetrics {
        metrics::time_series_metrics(self.data.contributors.values())
    }

    pub fn performance_insights(&self) -> PerformanceInsights {
        metrics::performance_insights(self.data.contributors.values(), local_now(), &self.policy)
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        metrics::performance_summary(self.data.contributors.values(), local_now(), &self.policy)
    }

    // 検索

    pub fn search_contributors(
        &self,
        query: &str,
        search_type: SearchType,
        field: SearchField,
        case_sensitive: bool,
    ) -> Vec<&Contributor> {
        search::search_contributors(self.data.contributors.values(), query, search_type, field, case_sensitive)
    }

    pub fn filter_contributors(&self, filter: &ContributorFilter) -> Vec<&Contributor> {
        search::filter_contributors(self.data.contributors.values(), filter)
    }

    pub fn search_contributions(
        &self,
        query: &str,
        field: ContributionField,
        case_sensitive: bool,
    ) -> Vec<ContributionMatch<'_>> {
        search::search_contributions(self.data.contributors.values(), query, field, case_sensitive)
    }

    pub fn filter_contributions(&self, filter: &ContributionFilter) -> Vec<ContributionMatch<'_>> {
        search::filter_contributions(self.data.contributors.values(), filter)
    }

    pub fn sort_contributors(&self, field: SortField, order: SortOrder) -> Vec<&Contributor> {
        search::sort_contributors(self.contributors(), field, order)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn advanced_search(
        &self,
        query: &str,
        search_type: SearchType,
        field: SearchField,
        case_sensitive: bool,
        filter: &ContributorFilter,
        sort_by: SortField,
        order: SortOrder,
    ) -> Vec<&Contributor> {
        search::advanced_search(
            self.data.contributors.values(),
            query,
            search_type,
            field,
            case_sensitive,
            filter,
            sort_by,
            order,
        )
    }

    pub fn search_statistics(&self) -> SearchStatistics {
        search::search_statistics(self.data.contributors.values())
    }

    pub fn quick_stats(&self, results: &[&Contributor]) -> QuickStats {
        search::quick_stats(results)
    }

    // リポジトリ統計

    /// 貢献のあるリポジトリ名（名前順）
    pub fn repository_names(&self) -> BTreeSet<&str> {
        self.data
            .contributors
            .values()
            .flat_map(|c| c.contributions.iter().map(|x| x.repo_name.as_str()))
            .collect()
    }

    fn has_repository(&self, repo_name: &str) -> bool {
        self.data
            .contributors
            .values()
            .any(|c| c.contributions.iter().any(|x| x.repo_name == repo_name))
    }

    /// 貢献のないリポジトリの場合は`None`を返します
    pub fn repository_stats(&self, repo_name: &str) -> Option<RepositoryStats> {
        if !self.has_repository(repo_name) {
            debug!(repo = repo_name, "no contributions for repository");
            return None;
        }
        Some(repo_stats::repository_stats(
            self.data.contributors.values(),
            repo_name,
            local_now(),
            &self.policy,
        ))
    }

    pub fn all_repository_stats(&self) -> indexmap::IndexMap<String, RepositoryStats> {
        repo_stats::all_repository_stats(self.data.contributors.values(), local_now(), &self.policy)
    }

    pub fn top_repositories(&self, limit: usize, sort_key: RepoSortKey) -> Vec<RepositoryStats> {
        repo_stats::top_repositories(self.data.contributors.values(), limit, sort_key, local_now(), &self.policy)
    }

    pub fn trending_repositories(&self, days: u32, limit: usize) -> Vec<TrendingRepository> {
        repo_stats::trending_repositories(self.data.contributors.values(), days, limit, local_now())
    }

    pub fn compare_repositories(&self, repo_names: &[String]) -> RepositoryComparison {
        repo_stats::compare_repositories(self.data.contributors.values(), repo_names, local_now(), &self.policy)
    }

    /// 貢献のないリポジトリの場合は`None`を返します
    pub fn repository_health(&self, repo_name: &str) -> Option<HealthReport> {
        if !self.has_repository(repo_name) {
            debug!(repo = repo_name, "no contributions for repository");
            return None;
        }
        Some(repo_stats::repository_health(
            self.data.contributors.values(),
            repo_name,
            local_now(),
            &self.policy,
        ))
    }

    // CSV

    /// CSVをエクスポートし、書き出したファイルのパスを返します
    ///
    /// `ExportKind::All`の場合、`path`はディレクトリとして扱われます。
    pub fn export_csv(&self, kind: ExportKind, path: &Path) -> Result<Vec<PathBuf>, TrackerError> {
        csv_io::export_to_path(kind, path, &self.contributors(), local_now(), &self.policy)
    }

    /// スキーマを自動判定して1つのCSVファイルをインポートします
    pub fn import_csv(&mut self, path: &Path) -> Result<(CsvSchema, ImportReport), TrackerError> {
        let (schema, report) = csv_io::import_file(path, &mut self.data.contributors, local_now())?;
        if report.imported > 0 {
            self.persist()?;
        }
        Ok((schema, report))
    }

    /// 貢献者CSVと、任意で貢献CSVをインポートします
    ///
    /// 既存の貢献者は上書きされません。
    pub fn import_from_csv(
        &mut self,
        contributors_file: &Path,
        contributions_file: Option<&Path>,
    ) -> Result<ImportReport, TrackerError> {
        let now = local_now();
        let mut report = csv_io::import_contributors(File::open(contributors_file)?, &mut self.data.contributors, now)?;

        if let Some(path) = contributions_file {
            report.merge(csv_io::import_contributions(
                File::open(path)?,
                &mut self.data.contributors,
                now,
            )?);
        }

        if report.imported > 0 {
            self.persist()?;
        }
        if !report.errors.is_empty() {
            warn!(errors = report.errors.len(), "import completed with row errors");
        }
        Ok(report)
    }

    pub fn csv_template(&self, schema: CsvSchema) -> &'static str {
        schema.template()
    }

    pub fn save_csv_template(&self, schema: CsvSchema, path: &Path) -> Result<(), TrackerError> {
        csv_io::save_template(schema, path)
    }
}
