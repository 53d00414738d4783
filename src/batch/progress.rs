//! # 进度跟踪器
//!
//! 纯内存累加器：完成事件 → 计数、吞吐量、ETA。
//! 只由编排线程写入；终端进度条读取 `snapshot()`。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 在每个作业完成后调用
//! - 被 `batch/processor.rs` 用于刷新进度条

use std::time::{Duration, Instant};

/// 某一时刻的进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub total_files: usize,
    pub total_bytes: u64,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub processed_bytes: u64,
    pub elapsed: Duration,
    pub avg_processing_time: Duration,
    pub files_per_minute: f64,
    pub bytes_per_minute: f64,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// 已完成（成功 + 失败）的文件数
    pub fn done(&self) -> usize {
        self.completed + self.failed
    }

    /// 成功率（相对总文件数）
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total_files as f64 * 100.0
    }
}

/// 进度跟踪器
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_files: usize,
    total_bytes: u64,
    completed: usize,
    failed: usize,
    skipped: usize,
    processed_bytes: u64,
    processing_time: Duration,
    started: Option<Instant>,
    finished: Option<Instant>,
    files_per_minute: f64,
    bytes_per_minute: f64,
}

impl ProgressTracker {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            total_files,
            total_bytes,
            completed: 0,
            failed: 0,
            skipped: 0,
            processed_bytes: 0,
            processing_time: Duration::ZERO,
            started: None,
            finished: None,
            files_per_minute: 0.0,
            bytes_per_minute: 0.0,
        }
    }

    /// 开始计时
    pub fn start_processing(&mut self) {
        self.started = Some(Instant::now());
        self.finished = None;
        tracing::info!(
            files = self.total_files,
            bytes = self.total_bytes,
            "batch processing started"
        );
    }

    /// 记录一个文件完成
    pub fn complete_file(&mut self, success: bool, processing_time: Duration, file_size: u64) {
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.processed_bytes += file_size;
        self.processing_time += processing_time;
        self.recompute(self.elapsed());
    }

    /// 记录一个被跳过的文件
    pub fn skip_file(&mut self, reason: &str) {
        self.skipped += 1;
        tracing::debug!(reason, "file skipped");
    }

    /// 冻结结束时间
    pub fn finish_processing(&mut self) {
        if self.finished.is_none() {
            self.finished = Some(Instant::now());
        }
        self.recompute(self.elapsed());
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// 按给定耗时重新计算吞吐量
    pub(crate) fn recompute(&mut self, elapsed: Duration) {
        let minutes = elapsed.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.files_per_minute = (self.completed + self.failed) as f64 / minutes;
            self.bytes_per_minute = self.processed_bytes as f64 / minutes;
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let done = self.completed + self.failed;
        let avg_processing_time = average_duration(self.processing_time, done);

        let eta = if done == 0 || self.files_per_minute <= 0.0 {
            None
        } else {
            let remaining = self.total_files.saturating_sub(done + self.skipped) as f64;
            Some(Duration::from_secs_f64(remaining / self.files_per_minute * 60.0))
        };

        ProgressSnapshot {
            total_files: self.total_files,
            total_bytes: self.total_bytes,
            completed: self.completed,
            failed: self.failed,
            skipped: self.skipped,
            processed_bytes: self.processed_bytes,
            elapsed: self.elapsed(),
            avg_processing_time,
            files_per_minute: self.files_per_minute,
            bytes_per_minute: self.bytes_per_minute,
            eta,
        }
    }
}

/// 平均时长；`count == 0` 时为零
pub fn average_duration(total: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(total.as_secs_f64() / count as f64)
}

/// 将时长格式化为 `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_average() {
        let mut tracker = ProgressTracker::new(4, 4000);
        tracker.start_processing();
        tracker.complete_file(true, Duration::from_secs(2), 1000);
        tracker.complete_file(false, Duration::from_secs(4), 1000);

        let snap = tracker.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.done(), 2);
        assert_eq!(snap.processed_bytes, 2000);
        assert_eq!(snap.avg_processing_time, Duration::from_secs(3));
        assert!((snap.success_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_throughput_and_eta() {
        let mut tracker = ProgressTracker::new(10, 0);
        tracker.completed = 3;
        tracker.failed = 1;
        tracker.processed_bytes = 4 * 1024;
        tracker.recompute(Duration::from_secs(120));

        let snap = tracker.snapshot();
        assert!((snap.files_per_minute - 2.0).abs() < 1e-9);
        assert!((snap.bytes_per_minute - 2048.0).abs() < 1e-9);
        // 剩余 6 个文件，每分钟 2 个
        assert_eq!(snap.eta, Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_no_eta_before_first_completion() {
        let mut tracker = ProgressTracker::new(3, 0);
        tracker.start_processing();
        assert_eq!(tracker.snapshot().eta, None);
    }

    #[test]
    fn test_finish_freezes_elapsed() {
        let mut tracker = ProgressTracker::new(1, 0);
        tracker.start_processing();
        tracker.finish_processing();
        let first = tracker.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.elapsed(), first);
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_skip_counts_toward_progress() {
        let mut tracker = ProgressTracker::new(3, 0);
        tracker.skip_file("already processed");
        assert_eq!(tracker.snapshot().skipped, 1);
    }

    #[test]
    fn test_average_duration() {
        assert_eq!(average_duration(Duration::from_secs(5), 0), Duration::ZERO);
        let avg = average_duration(Duration::from_secs(7), 3);
        assert!((avg.as_secs_f64() - 7.0 / 3.0).abs() < 1e-9);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_average_duration_with_count_past_u32() {
        // 2^32 + 2 截断为 u32 后是 2
        let count = (1usize << 32) + 2;
        let avg = average_duration(Duration::from_secs(1 << 33), count);
        assert!(avg < Duration::from_secs(3));
        assert!(avg > Duration::from_millis(1999));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }
}
