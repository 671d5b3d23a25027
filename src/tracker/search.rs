//! 貢献者と貢献の検索・フィルタ・並び替え
//!
//! 入力は変更せず、条件に合うものへの参照を返します。
//! 空の結果はエラーではありません。

use super::model::{Contribution, Contributor};
use chrono::NaiveDateTime;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 検索の照合方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SearchType {
    Exact,
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    /// クエリの文字がこの順に現れれば一致（大文字小文字は区別しない）
    Fuzzy,
}

/// 貢献者検索の対象フィールド
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    Username,
    Email,
    #[default]
    All,
}

/// 貢献検索の対象フィールド
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ContributionField {
    Description,
    Repo,
    Type,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Username,
    Email,
    Contributions,
    JoinedDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 貢献者のフィルタ条件（すべてAND）
///
/// `None`の条件は適用しません。日付の範囲は両端を含みます。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributorFilter {
    pub min_contributions: Option<usize>,
    pub max_contributions: Option<usize>,
    pub completed_only: bool,
    pub has_email: Option<bool>,
    pub joined_after: Option<NaiveDateTime>,
    pub joined_before: Option<NaiveDateTime>,
    pub contribution_type: Option<String>,
}

/// 貢献のフィルタ条件（すべてAND）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionFilter {
    pub contribution_type: Option<String>,
    pub repo_name: Option<String>,
    pub after: Option<NaiveDateTime>,
    pub before: Option<NaiveDateTime>,
    pub has_pr: Option<bool>,
    pub contributor_username: Option<String>,
}

/// 検索・フィルタで見つかった貢献と、その貢献者
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionMatch<'a> {
    pub contributor_name: &'a str,
    pub contributor_username: &'a str,
    #[serde(flatten)]
    pub contribution: &'a Contribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub total_contributors: usize,
    pub total_contributions: usize,
    pub contribution_types: indexmap::IndexMap<String, usize>,
    pub repositories: indexmap::IndexMap<String, usize>,
    pub contributors_with_email: usize,
    pub completed_hacktoberfest: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    pub result_count: usize,
    pub total_contributions: usize,
    pub completed_count: usize,
    pub average_contributions: f64,
    pub completion_rate: f64,
}

/// クエリの照合器。正規表現は一度だけコンパイルします
enum Matcher {
    Text {
        query: String,
        search_type: SearchType,
        case_sensitive: bool,
    },
    Regex(regex::Regex),
    /// 不正な正規表現は何にも一致しない
    Never,
}

impl Matcher {
    fn new(query: &str, search_type: SearchType, case_sensitive: bool) -> Self {
        match search_type {
            SearchType::Regex => RegexBuilder::new(query)
                .case_insensitive(!case_sensitive)
                .build()
                .map(Self::Regex)
                .unwrap_or(Self::Never),
            _ => Self::Text {
                query: fold_case(query, case_sensitive),
                search_type,
                case_sensitive,
            },
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Never => false,
            Self::Regex(re) => re.is_match(text),
            Self::Text {
                query,
                search_type,
                case_sensitive,
            } => {
                let text = fold_case(text, *case_sensitive);
                match search_type {
                    SearchType::Exact => text == *query,
                    SearchType::Contains => text.contains(query.as_str()),
                    SearchType::StartsWith => text.starts_with(query.as_str()),
                    SearchType::EndsWith => text.ends_with(query.as_str()),
                    SearchType::Fuzzy => fuzzy_match(&text, query),
                    SearchType::Regex => false,
                }
            }
        }
    }
}

fn fold_case(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

fn fuzzy_match(text: &str, pattern: &str) -> bool {
    let mut pattern = pattern.chars().flat_map(char::to_lowercase).peekable();
    for c in text.chars().flat_map(char::to_lowercase) {
        if pattern.peek() == Some(&c) {
            pattern.next();
        }
    }
    pattern.peek().is_none()
}

/// 貢献者を検索します
///
/// クエリが空の場合は入力をすべて返します。メールアドレスがない貢献者は
/// 空文字列として照合されます。
pub fn search_contributors<'a, I>(
    contributors: I,
    query: &str,
    search_type: SearchType,
    field: SearchField,
    case_sensitive: bool,
) -> Vec<&'a Contributor>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    if query.is_empty() {
        return contributors.into_iter().collect();
    }

    let matcher = Matcher::new(query, search_type, case_sensitive);

    contributors
        .into_iter()
        .filter(|c| {
            let email = c.email.as_deref().unwrap_or("");
            match field {
                SearchField::Name => matcher.is_match(&c.name),
                SearchField::Username => matcher.is_match(&c.github_username),
                SearchField::Email => matcher.is_match(email),
                SearchField::All => [c.name.as_str(), c.github_username.as_str(), email]
                    .into_iter()
                    .any(|f| matcher.is_match(f)),
            }
        })
        .collect()
}

/// 貢献者をフィルタします
pub fn filter_contributors<'a, I>(contributors: I, filter: &ContributorFilter) -> Vec<&'a Contributor>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    contributors
        .into_iter()
        .filter(|c| {
            let count = c.contribution_count();
            filter.min_contributions.map_or(true, |min| count >= min)
                && filter.max_contributions.map_or(true, |max| count <= max)
                && (!filter.completed_only || c.is_hacktoberfest_complete())
                && filter.has_email.map_or(true, |want| c.has_email() == want)
                && filter.joined_after.map_or(true, |after| c.joined_date >= after)
                && filter.joined_before.map_or(true, |before| c.joined_date <= before)
                && filter.contribution_type.as_deref().map_or(true, |t| {
                    c.contributions.iter().any(|x| x.contribution_type == t)
                })
        })
        .collect()
}

/// 全貢献から部分一致で検索します
pub fn search_contributions<'a, I>(
    contributors: I,
    query: &str,
    field: ContributionField,
    case_sensitive: bool,
) -> Vec<ContributionMatch<'a>>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let matcher = Matcher::new(query, SearchType::Contains, case_sensitive);

    each_contribution(contributors)
        .filter(|m| {
            let c = m.contribution;
            match field {
                ContributionField::Description => matcher.is_match(&c.description),
                ContributionField::Repo => matcher.is_match(&c.repo_name),
                ContributionField::Type => matcher.is_match(&c.contribution_type),
                ContributionField::All => [&c.description, &c.repo_name, &c.contribution_type]
                    .into_iter()
                    .any(|f| matcher.is_match(f)),
            }
        })
        .collect()
}

/// 貢献をフィルタします
pub fn filter_contributions<'a, I>(
    contributors: I,
    filter: &ContributionFilter,
) -> Vec<ContributionMatch<'a>>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    each_contribution(contributors)
        .filter(|m| {
            let c = m.contribution;
            filter
                .contributor_username
                .as_deref()
                .map_or(true, |u| m.contributor_username == u)
                && filter
                    .contribution_type
                    .as_deref()
                    .map_or(true, |t| c.contribution_type == t)
                && filter.repo_name.as_deref().map_or(true, |r| c.repo_name == r)
                && filter.after.map_or(true, |after| c.date >= after)
                && filter.before.map_or(true, |before| c.date <= before)
                && filter.has_pr.map_or(true, |want| c.has_pr() == want)
        })
        .collect()
}

fn each_contribution<'a, I>(contributors: I) -> impl Iterator<Item = ContributionMatch<'a>>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    contributors.into_iter().flat_map(|contributor| {
        contributor
            .contributions
            .iter()
            .map(move |contribution| ContributionMatch {
                contributor_name: &contributor.name,
                contributor_username: &contributor.github_username,
                contribution,
            })
    })
}

/// 貢献者を並び替えます
///
/// 安定ソートなので、同じ値の要素は入力の順序を保ちます。
/// 名前とユーザー名は大文字小文字を区別せず、メールアドレスがない場合は最小値として扱います。
pub fn sort_contributors<'a>(
    mut contributors: Vec<&'a Contributor>,
    field: SortField,
    order: SortOrder,
) -> Vec<&'a Contributor> {
    let compare = |a: &Contributor, b: &Contributor| -> Ordering {
        match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Username => a
                .github_username
                .to_lowercase()
                .cmp(&b.github_username.to_lowercase()),
            SortField::Email => a
                .email
                .as_deref()
                .map(str::to_lowercase)
                .cmp(&b.email.as_deref().map(str::to_lowercase)),
            SortField::Contributions => a.contribution_count().cmp(&b.contribution_count()),
            SortField::JoinedDate => a.joined_date.cmp(&b.joined_date),
        }
    };

    match order {
        SortOrder::Asc => contributors.sort_by(|a, b| compare(a, b)),
        SortOrder::Desc => contributors.sort_by(|a, b| compare(b, a)),
    }
    contributors
}

/// 検索・フィルタ・並び替えを順に適用します
#[allow(clippy::too_many_arguments)]
pub fn advanced_search<'a, I>(
    contributors: I,
    query: &str,
    search_type: SearchType,
    field: SearchField,
    case_sensitive: bool,
    filter: &ContributorFilter,
    sort_by: SortField,
    order: SortOrder,
) -> Vec<&'a Contributor>
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let found = search_contributors(contributors, query, search_type, field, case_sensitive);
    let filtered = filter_contributors(found, filter);
    sort_contributors(filtered, sort_by, order)
}

pub fn search_statistics<'a, I>(contributors: I) -> SearchStatistics
where
    I: IntoIterator<Item = &'a Contributor>,
{
    let contributors: Vec<&Contributor> = contributors.into_iter().collect();
    let all = || contributors.iter().flat_map(|c| c.contributions.iter());

    SearchStatistics {
        total_contributors: contributors.len(),
        total_contributions: all().count(),
        contribution_types: super::metrics::count_sorted(all().map(|c| c.contribution_type.as_str())),
        repositories: super::metrics::count_sorted(all().map(|c| c.repo_name.as_str())),
        contributors_with_email: contributors.iter().filter(|c| c.has_email()).count(),
        completed_hacktoberfest: contributors
            .iter()
            .filter(|c| c.is_hacktoberfest_complete())
            .count(),
    }
}

/// 検索結果の簡易統計
pub fn quick_stats(results: &[&Contributor]) -> QuickStats {
    let total: usize = results.iter().map(|c| c.contribution_count()).sum();
    let completed = results.iter().filter(|c| c.is_hacktoberfest_complete()).count();
    let n = results.len();

    QuickStats {
        result_count: n,
        total_contributions: total,
        completed_count: completed,
        average_contributions: if n > 0 { total as f64 / n as f64 } else { 0.0 },
        completion_rate: if n > 0 {
            completed as f64 / n as f64 * 100.0
        } else {
            0.0
        },
    }
}
