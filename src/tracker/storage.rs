//! プロジェクトドキュメントのJSONファイル保存

use super::error::TrackerError;
use super::model::ProjectData;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSONファイルに保存されたプロジェクトデータへのアクセス
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ドキュメントを読み込みます
    ///
    /// ファイルが存在しない場合は`Ok(None)`を返します。
    ///
    /// # エラー
    ///
    /// ファイルを読めない場合、またはJSONとして不正な場合にエラーを返します
    pub fn load(&self) -> Result<Option<ProjectData>, TrackerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "data file does not exist yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let data: ProjectData = serde_json::from_str(&content)?;
        debug!(
            path = %self.path.display(),
            contributors = data.contributors.len(),
            "loaded project data"
        );
        Ok(Some(data))
    }

    /// ドキュメントを整形済みJSONとして書き込みます
    ///
    /// 親ディレクトリが存在しない場合は作成します。
    pub fn save(&self, data: &ProjectData) -> Result<(), TrackerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "saved project data");
        Ok(())
    }
}
