//! Directory scanning for batch uploads
//!
//! Every video in a directory becomes one upload. The cover is the image
//! sharing the video's stem, falling back to a shared `cover.<ext>`.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::clean_tags;
use crate::cli::signals::Interrupt;
use crate::constants::batch;

/// One video queued for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub video: PathBuf,
    pub cover: PathBuf,
    pub title: String,
    /// File stem of the video
    pub stem: String,
}

impl BatchItem {
    /// `description`, or one naming this video when none was given
    pub fn description(&self, description: Option<&str>) -> String {
        match description {
            Some(description) => description.to_string(),
            None => format!("{}{}", batch::DESCRIPTION_PREFIX, self.stem),
        }
    }
}

/// Cleaned `tags`, or the default batch tags when none remain
pub fn batch_tags(tags: &[String]) -> Vec<String> {
    let tags = clean_tags(tags);
    if tags.is_empty() {
        batch::DEFAULT_TAGS.iter().map(|tag| tag.to_string()).collect()
    } else {
        tags
    }
}

/// Result of scanning a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    /// Videos with a cover, in file name order
    pub items: Vec<BatchItem>,
    /// Videos skipped because no cover was found
    pub missing_cover: Vec<PathBuf>,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Titles published, with their publication ids
    pub succeeded: Vec<(String, i64)>,
    /// Titles that failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Titles never attempted because the run was interrupted
    pub skipped: Vec<String>,
    /// Whether Ctrl-C or SIGTERM stopped the run
    pub interrupted: bool,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }
}

/// Uploads `items` one after another, pausing `interval` between them
///
/// `upload` returns the publication id or a failure reason. An interrupt
/// during an upload or a pause ends the run; the interrupted item and every
/// later one are reported as skipped.
pub async fn run_batch<'a, F, Fut>(
    items: &'a [BatchItem],
    interval: Duration,
    interrupt: &Interrupt,
    mut upload: F,
) -> BatchSummary
where
    F: FnMut(usize, &'a BatchItem) -> Fut,
    Fut: Future<Output = Result<i64, String>>,
{
    let mut summary = BatchSummary::default();

    for (position, item) in items.iter().enumerate() {
        if position > 0 && !interval.is_zero() {
            tracing::info!("Waiting {:?} before the next upload", interval);
            if interrupt.guard(tokio::time::sleep(interval)).await.is_none() {
                summary.interrupted = true;
            }
        }

        let outcome = if summary.interrupted {
            None
        } else {
            interrupt.guard(upload(position, item)).await
        };
        match outcome {
            Some(Ok(id)) => summary.succeeded.push((item.title.clone(), id)),
            Some(Err(reason)) => summary.failed.push((item.title.clone(), reason)),
            None => {
                if !summary.interrupted {
                    tracing::warn!("Interrupted while uploading {}", item.video.display());
                    summary.interrupted = true;
                }
                summary.skipped.push(item.title.clone());
            }
        }
    }

    summary
}

/// Scans `dir` for videos and pairs each with a cover
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read
pub fn scan_directory(dir: &Path, title_prefix: &str) -> io::Result<BatchPlan> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, &batch::VIDEO_EXTENSIONS) {
            videos.push(path);
        }
    }
    videos.sort();

    let mut plan = BatchPlan::default();
    for video in videos {
        let stem = match video.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => {
                tracing::warn!("Skipping {}: file name is not UTF-8", video.display());
                continue;
            }
        };

        match find_cover(dir, &stem) {
            Some(cover) => plan.items.push(BatchItem {
                title: format!("{}{}", title_prefix, stem),
                stem,
                video,
                cover,
            }),
            None => {
                tracing::warn!("No cover found for {}", video.display());
                plan.missing_cover.push(video);
            }
        }
    }

    Ok(plan)
}

/// Finds `<stem>.<ext>` or the shared `cover.<ext>` in `dir`
pub fn find_cover(dir: &Path, stem: &str) -> Option<PathBuf> {
    [stem, batch::DEFAULT_COVER_STEM]
        .iter()
        .flat_map(|name| {
            batch::COVER_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", name, ext)))
        })
        .find(|candidate| candidate.is_file())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_scan_pairs_covers() {
        let dir = TempDir::new().unwrap();
        let first = touch(dir.path(), "a-first.mp4");
        let second = touch(dir.path(), "b-second.MKV");
        let first_cover = touch(dir.path(), "a-first.jpg");
        let shared_cover = touch(dir.path(), "cover.png");
        touch(dir.path(), "notes.txt");

        let plan = scan_directory(dir.path(), "[Clip] ").unwrap();

        assert_eq!(plan.items.len(), 2);
        assert!(plan.missing_cover.is_empty());

        assert_eq!(plan.items[0].video, first);
        assert_eq!(plan.items[0].cover, first_cover);
        assert_eq!(plan.items[0].title, "[Clip] a-first");

        assert_eq!(plan.items[1].video, second);
        assert_eq!(plan.items[1].cover, shared_cover);
        assert_eq!(plan.items[1].title, "[Clip] b-second");
        assert_eq!(plan.items[1].stem, "b-second");
    }

    #[test]
    fn test_default_description_names_video() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "intro.mp4");
        touch(dir.path(), "outro.mp4");
        touch(dir.path(), "cover.jpg");

        let plan = scan_directory(dir.path(), "").unwrap();
        let descriptions: Vec<String> =
            plan.items.iter().map(|item| item.description(None)).collect();
        assert_eq!(
            descriptions,
            vec![
                format!("{}intro", batch::DESCRIPTION_PREFIX),
                format!("{}outro", batch::DESCRIPTION_PREFIX),
            ]
        );
        assert_eq!(plan.items[0].description(Some("shared")), "shared");
    }

    #[test]
    fn test_batch_tags_default() {
        assert_eq!(batch_tags(&[]), vec!["批量上传", "自动化"]);
        assert_eq!(batch_tags(&[" ".to_string()]), vec!["批量上传", "自动化"]);
        assert_eq!(batch_tags(&[" game ".to_string()]), vec!["game"]);
    }

    #[test]
    fn test_scan_reports_missing_cover() {
        let dir = TempDir::new().unwrap();
        let video = touch(dir.path(), "clip.mov");

        let plan = scan_directory(dir.path(), "").unwrap();

        assert!(plan.items.is_empty());
        assert_eq!(plan.missing_cover, vec![video]);
    }

    #[test]
    fn test_directories_are_not_videos() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let plan = scan_directory(dir.path(), "").unwrap();
        assert_eq!(plan, BatchPlan::default());
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(scan_directory(&dir.path().join("absent"), "").is_err());
    }

    #[test]
    fn test_summary_total() {
        let summary = BatchSummary {
            succeeded: vec![("a".to_string(), 1)],
            failed: vec![("b".to_string(), "boom".to_string())],
            skipped: vec!["c".to_string()],
            interrupted: true,
        };
        assert_eq!(summary.total(), 3);
    }

    fn items(titles: &[&str]) -> Vec<BatchItem> {
        titles
            .iter()
            .map(|title| BatchItem {
                video: PathBuf::from(format!("{}.mp4", title)),
                cover: PathBuf::from("cover.jpg"),
                title: title.to_string(),
                stem: title.to_string(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_batch_records_each_outcome() {
        let items = items(&["one", "two", "three"]);
        let interrupt = Interrupt::from_signal(async { false });
        let started = tokio::time::Instant::now();

        let summary = run_batch(&items, Duration::from_secs(5), &interrupt, |position, _| async move {
            match position {
                1 => Err("boom".to_string()),
                _ => Ok(position as i64 + 100),
            }
        })
        .await;

        assert_eq!(
            summary.succeeded,
            vec![("one".to_string(), 100), ("three".to_string(), 102)]
        );
        assert_eq!(summary.failed, vec![("two".to_string(), "boom".to_string())]);
        assert!(summary.skipped.is_empty());
        assert!(!summary.interrupted);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_between_items_stops_batch() {
        let items = items(&["one", "two", "three"]);
        // Fires during the pause after the first upload
        let interrupt = Interrupt::from_signal(async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            true
        });
        let attempted = std::sync::Mutex::new(Vec::new());

        let summary = run_batch(&items, Duration::from_secs(5), &interrupt, |_, item| {
            attempted.lock().unwrap().push(item.title.clone());
            async { Ok(1) }
        })
        .await;

        assert_eq!(*attempted.lock().unwrap(), vec!["one"]);
        assert_eq!(summary.succeeded, vec![("one".to_string(), 1)]);
        assert_eq!(summary.skipped, vec!["two", "three"]);
        assert!(summary.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_upload_stops_batch() {
        let items = items(&["one", "two"]);
        let interrupt = Interrupt::from_signal(async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            true
        });

        let summary = run_batch(&items, Duration::ZERO, &interrupt, |_, _| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;

        assert!(summary.succeeded.is_empty());
        assert_eq!(summary.skipped, vec!["one", "two"]);
        assert!(summary.interrupted);
    }
}
