//! 貢献者と貢献レコードのデータモデル
//!
//! 永続化されるJSONドキュメントの形をそのまま表現します。
//! 貢献レコードは必ずいずれかの貢献者に所有され、追加のみ可能で削除はできません。

use chrono::{Local, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Hacktoberfest完了とみなす貢献数
pub const COMPLETION_THRESHOLD: usize = 4;

/// 現在のローカル時刻（タイムゾーンなし）
pub(crate) fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// 1件の貢献を表す構造体
///
/// # フィールド
///
/// - `repo_name`: 貢献先のリポジトリ名
/// - `contribution_type`: 貢献の種類（`bug-fix`、`feature`など自由形式）
/// - `description`: 貢献内容の説明
/// - `pr_number`: プルリクエスト番号（任意）
/// - `date`: 貢献を記録した日時
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub repo_name: String,
    #[serde(rename = "type")]
    pub contribution_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pr_number: Option<u64>,
    pub date: NaiveDateTime,
}

impl Contribution {
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    /// PR番号が0の場合はPRなしとして扱います
    pub fn has_pr(&self) -> bool {
        matches!(self.pr_number, Some(n) if n > 0)
    }
}

/// 貢献者を表す構造体
///
/// `github_username`が一意なキーです。貢献は記録順に保持されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub github_username: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(default = "local_now")]
    pub joined_date: NaiveDateTime,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

impl Contributor {
    /// 現在時刻を参加日として新しい貢献者を作成します
    pub fn new(name: impl Into<String>, github_username: impl Into<String>, email: Option<String>) -> Self {
        Self {
            name: name.into(),
            github_username: github_username.into(),
            email: email.filter(|e| !e.trim().is_empty()),
            joined_date: local_now(),
            contributions: Vec::new(),
        }
    }

    pub fn with_joined_date(mut self, joined_date: NaiveDateTime) -> Self {
        self.joined_date = joined_date;
        self
    }

    /// 現在時刻で貢献を追加します
    pub fn add_contribution(
        &mut self,
        repo_name: impl Into<String>,
        contribution_type: impl Into<String>,
        description: impl Into<String>,
        pr_number: Option<u64>,
    ) -> &Contribution {
        self.push_contribution(Contribution {
            repo_name: repo_name.into(),
            contribution_type: contribution_type.into(),
            description: description.into(),
            pr_number,
            date: local_now(),
        })
    }

    /// 日時を指定済みの貢献を末尾に追加します
    pub fn push_contribution(&mut self, contribution: Contribution) -> &Contribution {
        self.contributions.push(contribution);
        &self.contributions[self.contributions.len() - 1]
    }

    pub fn contribution_count(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_hacktoberfest_complete(&self) -> bool {
        self.contribution_count() >= COMPLETION_THRESHOLD
    }

    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }

    pub fn unique_repositories(&self) -> usize {
        self.contributions
            .iter()
            .map(|c| c.repo_name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn latest_contribution(&self) -> Option<NaiveDateTime> {
        self.contributions.iter().map(|c| c.date).max()
    }
}

/// プロジェクト全体の永続化ドキュメント
///
/// 貢献者は登録順に保持されます。比較は順序を無視します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    pub project_name: String,
    #[serde(default = "local_now")]
    pub created_date: NaiveDateTime,
    #[serde(default)]
    pub contributors: IndexMap<String, Contributor>,
}

impl ProjectData {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            created_date: local_now(),
            contributors: IndexMap::new(),
        }
    }
}

/// 空文字列のメールアドレスを`None`として読み込みます
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_completion_boundary() {
        let three = contributor("alice", "2025-09-30", "repo", &["2025-10-01", "2025-10-02", "2025-10-03"]);
        assert!(!three.is_hacktoberfest_complete());

        let mut four = three.clone();
        four.push_contribution(contribution("repo", "docs", "2025-10-04", None));
        assert_eq!(four.contribution_count(), 4);
        assert!(four.is_hacktoberfest_complete());
    }

    #[test]
    fn test_contribution_json_format() {
        let json = r#"{
            "repo_name": "awesome",
            "type": "bug-fix",
            "description": "Fixed login",
            "pr_number": 123,
            "date": "2025-10-05T14:30:00.123456"
        }"#;
        let c: Contribution = serde_json::from_str(json).unwrap();
        assert_eq!(c.contribution_type, "bug-fix");
        assert!(c.has_pr());
        assert_eq!(c.day(), NaiveDate::from_ymd_opt(2025, 10, 5).unwrap());

        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["type"], "bug-fix");
        assert!(value.get("contribution_type").is_none());
    }

    #[test]
    fn test_pr_number_zero_is_not_a_pr() {
        let mut c = contribution("repo", "docs", "2025-10-01", Some(0));
        assert!(!c.has_pr());
        c.pr_number = None;
        assert!(!c.has_pr());
    }

    #[test]
    fn test_empty_email_reads_as_none() {
        let json = r#"{
            "name": "Bob",
            "github_username": "bob",
            "email": "",
            "joined_date": "2025-10-01T09:00:00",
            "contributions": []
        }"#;
        let c: Contributor = serde_json::from_str(json).unwrap();
        assert_eq!(c.email, None);
        assert!(!c.has_email());
    }

    #[test]
    fn test_derived_values() {
        let mut c = contributor("carol", "2025-09-30", "a", &["2025-10-01"]);
        c.push_contribution(contribution("b", "feature", "2025-10-07", Some(9)));
        c.push_contribution(contribution("a", "docs", "2025-10-03", None));

        assert_eq!(c.unique_repositories(), 2);
        assert_eq!(c.latest_contribution(), Some(at("2025-10-07")));
    }

    #[test]
    fn test_new_filters_blank_email() {
        let c = Contributor::new("Dan", "dan", Some("   ".to_string()));
        assert_eq!(c.email, None);
    }
}
