//! スコア計算に使用するポリシー定数
//!
//! エンゲージメントスコア、アクティビティスコア、ヘルス判定の重みと閾値を
//! 1か所にまとめ、JSONファイルから上書きできるようにします。
//! 省略したフィールドはデフォルト値になります。

use super::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// スコア計算ポリシー全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub engagement: EngagementWeights,
    pub activity: ActivityPolicy,
    pub health: HealthThresholds,
}

impl ScoringPolicy {
    /// JSONファイルからポリシーを読み込みます
    ///
    /// # エラー
    ///
    /// ファイルの読み込みまたはJSONの解析に失敗した場合にエラーを返します
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// エンゲージメントスコア（0-100）の重み
///
/// スコア = `volume_weight`・min(貢献数 / `volume_target`, 1)
///        + `streak_weight`・min(最長連続日数 / `streak_target`, 1)
///        + `recency_weight`・max(0, 1 - 最終貢献からの日数 / `recency_window_days`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementWeights {
    pub volume_weight: f64,
    pub streak_weight: f64,
    pub recency_weight: f64,
    pub volume_target: u32,
    pub streak_target: u32,
    pub recency_window_days: u32,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            volume_weight: 40.0,
            streak_weight: 30.0,
            recency_weight: 30.0,
            volume_target: 10,
            streak_target: 7,
            recency_window_days: 30,
        }
    }
}

/// リポジトリのアクティビティスコアで使う新しさの重み付け
///
/// `recent_window_days`以内の貢献は1.0、それより古い貢献は`stale_weight`として数えます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityPolicy {
    pub recent_window_days: u32,
    pub stale_weight: f64,
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self {
            recent_window_days: 30,
            stale_weight: 0.5,
        }
    }
}

/// ヘルススコア（0-100）からステータスへの閾値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub healthy: u32,
    pub good: u32,
    pub moderate: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            healthy: 80,
            good: 65,
            moderate: 50,
        }
    }
}
