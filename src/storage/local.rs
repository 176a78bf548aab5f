//! Local filesystem storage.
//!
//! Every file is written to a temporary sibling first and then renamed into
//! place, so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::DailyWordStat;
use crate::storage::{HarvestStorage, PostDump, table};

const POSTS_KEY: &str = "posts.json";
const STATS_KEY: &str = "stats.csv";

/// Output directory backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl HarvestStorage for LocalStorage {
    async fn save_posts(&self, dump: &PostDump) -> Result<()> {
        self.write_json(POSTS_KEY, dump).await?;
        log::info!(
            "{} posts written to {}",
            dump.count,
            self.path(POSTS_KEY).display()
        );
        Ok(())
    }

    async fn load_posts(&self) -> Result<Option<PostDump>> {
        self.read_json(POSTS_KEY).await
    }

    async fn save_stats(&self, stats: &[DailyWordStat]) -> Result<()> {
        let mut buf = Vec::new();
        table::export_stats(&mut buf, stats)?;
        self.write_bytes(STATS_KEY, &buf).await?;
        log::info!(
            "{} table rows written to {}",
            stats.len(),
            self.path(STATS_KEY).display()
        );
        Ok(())
    }

    async fn load_stats(&self) -> Result<Vec<DailyWordStat>> {
        match self.read_bytes(STATS_KEY).await? {
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| AppError::validation(format!("{STATS_KEY} is not UTF-8: {e}")))?;
                table::import_stats(&text)
            }
            None => {
                log::warn!("No {} found in {}", STATS_KEY, self.root_dir.display());
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GalleryTarget, GalleryVariant, Post};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read_bytes() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested/out"));

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        assert_eq!(
            storage.read_bytes("test.txt").await.unwrap(),
            Some(b"hello".to_vec())
        );
        assert!(!storage.path("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_files() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load_posts().await.unwrap().is_none());
        assert!(storage.load_stats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_posts_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let post = Post {
            id: "101".to_string(),
            title: "테슬라 간다".to_string(),
            body: String::new(),
            raw_date: "2024.05.30".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 30),
            source_url: "https://gall.dcinside.com/mgallery/board/view/?id=stockus&no=101"
                .to_string(),
        };
        let dump = PostDump::new(
            GalleryTarget::new("stockus", GalleryVariant::Minor),
            vec![post.clone()],
        );
        storage.save_posts(&dump).await.unwrap();

        let loaded = storage.load_posts().await.unwrap().unwrap();
        assert_eq!(loaded.count, 1);
        assert_eq!(loaded.posts, vec![post]);
        assert_eq!(loaded.target.variant, GalleryVariant::Minor);
    }

    #[tokio::test]
    async fn test_stats_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let stats = vec![
            DailyWordStat::new(date, "금리", 1, 3, 2),
            DailyWordStat::new(date, "테슬라", 2, 3, 2),
        ];

        storage.save_stats(&stats).await.unwrap();
        assert_eq!(storage.load_stats().await.unwrap(), stats);

        let raw = std::fs::read_to_string(tmp.path().join("stats.csv")).unwrap();
        assert!(raw.starts_with("date,word,count,freq,total_words,total_posts"));
    }
}
