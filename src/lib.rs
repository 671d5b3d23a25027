//! Hacktoberfest形式のイベント向け貢献トラッカー
//!
//! このクレートは、オープンソースイベントの貢献者と貢献を記録し、
//! リーダーボード、エンゲージメントスコア、リポジトリ統計を
//! 計算するための機能を提供します。
//!
//! # 主な機能
//!
//! - 貢献者と貢献の登録（JSONファイルへの保存）
//! - 貢献者ごと・プロジェクト全体のメトリクス計算
//! - リポジトリごとの統計、トレンド、ヘルス評価
//! - 貢献者と貢献の検索・フィルタ・並び替え
//! - CSVのインポートとエクスポート
//!
//! # 使用例
//!
//! ```no_run
//! use contribution_tracker::tracker::ScoringPolicy;
//! use contribution_tracker::ProjectTracker;
//!
//! let mut tracker = ProjectTracker::open("contributors.json", "Hacktoberfest 2025", ScoringPolicy::default());
//!
//! tracker.add_contributor("John Doe", "johndoe", Some("john@example.com")).unwrap();
//! tracker.add_contribution("johndoe", "awesome-project", "bug-fix", "Fixed login issue", Some(123)).unwrap();
//!
//! let ranking = tracker.contributors_ranking();
//! ```

pub mod tracker;
pub use tracker::ProjectTracker;
