use axum::extract::Multipart;
use service_core::error::AppError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Multipart form staged to disk: file parts under `tmp_dir`, text parts in
/// memory.
///
/// Files that are never taken are removed when this is dropped, so a request
/// that fails validation leaves nothing behind.
#[derive(Debug, Default)]
pub struct StagedForm {
    files: HashMap<String, PathBuf>,
    fields: HashMap<String, String>,
}

impl StagedForm {
    pub async fn read(mut multipart: Multipart, tmp_dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(tmp_dir).await?;

        let mut form = StagedForm::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(file_name) = field.file_name() {
                let path = tmp_dir.join(staged_name(file_name));
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                })?;
                if data.is_empty() {
                    continue;
                }
                tokio::fs::write(&path, &data).await?;
                // Record before anything else can fail so Drop cleans it up.
                if let Some(previous) = form.files.insert(name, path) {
                    let _ = std::fs::remove_file(previous);
                }
            } else {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read form field: {}", e))
                })?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Take ownership of a staged file; the caller is now responsible for it.
    pub fn take_file(&mut self, name: &str) -> Result<PathBuf, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("{} file is required", name)))
    }

    /// Take several files at once; nothing is taken unless all are present.
    pub fn take_files<const N: usize>(&mut self, names: [&str; N]) -> Result<[PathBuf; N], AppError> {
        if let Some(missing) = names.iter().find(|name| !self.files.contains_key(**name)) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} file is required",
                missing
            )));
        }
        Ok(names.map(|name| self.files.remove(name).unwrap_or_default()))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl Drop for StagedForm {
    fn drop(&mut self) {
        for path in self.files.values() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), "Failed to remove staged upload: {}", e);
            }
        }
    }
}

/// Random file name that keeps a short alphanumeric extension.
fn staged_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("{}.{}", Uuid::new_v4(), extension.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_name_keeps_safe_extension() {
        assert!(staged_name("clip.MP4").ends_with(".mp4"));
        assert!(staged_name("../../etc/passwd").ends_with(".bin"));
        assert!(staged_name("weird.p/ng").ends_with(".bin"));
        assert_ne!(staged_name("a.png"), staged_name("a.png"));
    }

    #[test]
    fn test_untaken_files_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.png");
        let dropped = dir.path().join("dropped.png");
        std::fs::write(&kept, b"x").unwrap();
        std::fs::write(&dropped, b"x").unwrap();

        let mut form = StagedForm::default();
        form.files.insert("avatar".into(), kept.clone());
        form.files.insert("cover".into(), dropped.clone());

        assert_eq!(form.take_file("avatar").unwrap(), kept);
        assert!(form.take_file("missing").is_err());
        drop(form);

        assert!(kept.exists());
        assert!(!dropped.exists());
    }

    #[test]
    fn test_take_files_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        std::fs::write(&video, b"x").unwrap();

        let mut form = StagedForm::default();
        form.files.insert("videoFile".into(), video.clone());

        assert!(form.take_files(["videoFile", "thumbnail"]).is_err());
        drop(form);
        assert!(!video.exists());
    }
}
