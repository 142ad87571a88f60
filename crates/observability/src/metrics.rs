//! 分发指标收集模块
//!
//! Prometheus 指标记录函数，以及供 CLI 输出摘要的内存聚合器。

use std::collections::BTreeMap;

use contracts::TaskResponse;
use metrics::{counter, gauge, histogram};

/// 记录任务提交
pub fn record_task_submitted(function: &str) {
    counter!(
        "fndispatch_tasks_submitted_total",
        "function" => function.to_string()
    )
    .increment(1);
}

/// 记录一次响应 (按副本与结果)
pub fn record_response(replica: &str, success: bool, elapsed_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fndispatch_responses_total",
        "replica" => replica.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "fndispatch_invocation_latency_ms",
        "replica" => replica.to_string()
    )
    .record(elapsed_ms);
}

/// 记录存活副本数
pub fn record_replica_count(function: &str, count: usize) {
    gauge!(
        "fndispatch_replicas",
        "function" => function.to_string()
    )
    .set(count as f64);
}

/// 记录任务队列深度
pub fn record_queue_depth(function: &str, depth: usize) {
    gauge!(
        "fndispatch_queue_depth",
        "function" => function.to_string()
    )
    .set(depth as f64);
}

/// 记录一次重试
pub fn record_retry(address: &str) {
    counter!(
        "fndispatch_retries_total",
        "address" => address.to_string()
    )
    .increment(1);
}

/// 分发结果聚合器
///
/// 在内存中聚合响应，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 响应总数
    pub total: u64,

    /// 成功数
    pub succeeded: u64,

    /// 失败数
    pub failed: u64,

    /// 状态码分布
    pub status_codes: BTreeMap<u16, u64>,

    /// 各副本处理数
    pub per_replica: BTreeMap<String, u64>,

    /// 调用耗时统计 (毫秒)
    pub latency: RunningStats,
}

impl DispatchStats {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, response: &TaskResponse) {
        self.total += 1;
        if response.is_ok() {
            self.succeeded += 1;
            *self.status_codes.entry(response.status_code).or_insert(0) += 1;
        } else {
            self.failed += 1;
        }
        *self
            .per_replica
            .entry(response.address.clone())
            .or_insert(0) += 1;
        self.latency.push(response.elapsed.as_secs_f64() * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            failure_rate: if self.total > 0 {
                self.failed as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            status_codes: self.status_codes.clone(),
            per_replica: self.per_replica.clone(),
            latency_ms: StatsSummary::from(&self.latency),
        }
    }
}

/// 分发摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub status_codes: BTreeMap<u16, u64>,
    pub per_replica: BTreeMap<String, u64>,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Responses: {}", self.total)?;
        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(f, "Failed: {} ({:.2}%)", self.failed, self.failure_rate)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.status_codes.is_empty() {
            writeln!(f, "Status codes:")?;
            for (code, count) in &self.status_codes {
                writeln!(f, "  {}: {}", code, count)?;
            }
        }

        if !self.per_replica.is_empty() {
            writeln!(f, "Per replica:")?;
            for (address, count) in &self.per_replica {
                writeln!(f, "  {}: {}", address, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Invocation, InvokeError, Task};
    use std::time::Duration;

    fn ok_response(address: &str, status_code: u16, elapsed_ms: u64) -> TaskResponse {
        TaskResponse::success(
            address,
            0,
            Task::new(0, "x"),
            Invocation {
                status_code,
                status: String::new(),
                body: Default::default(),
                log: String::new(),
            },
            Duration::from_millis(elapsed_ms),
        )
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_dispatch_stats_update() {
        let mut stats = DispatchStats::new();
        stats.update(&ok_response("a:80", 200, 10));
        stats.update(&ok_response("b:80", 404, 30));
        stats.update(&TaskResponse::failure(
            "a:80",
            1,
            Task::new(1, "y"),
            InvokeError::transport("a:80", 6, "refused"),
            Duration::from_millis(20),
        ));

        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.status_codes.get(&404), Some(&1));
        assert_eq!(stats.per_replica.get("a:80"), Some(&2));
        assert!((stats.latency.mean() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_display() {
        let mut stats = DispatchStats::new();
        stats.update(&ok_response("a:80", 200, 5));

        let output = format!("{}", stats.summary());
        assert!(output.contains("Responses: 1"));
        assert!(output.contains("Failed: 0 (0.00%)"));
        assert!(output.contains("200: 1"));
        assert!(output.contains("a:80: 1"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = DispatchStats::new().summary();
        assert_eq!(summary.failure_rate, 0.0);
        assert_eq!(format!("{}", summary.latency_ms), "N/A");
    }
}
