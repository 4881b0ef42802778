//! Batch validation with bounded concurrency.
//!
//! Contents are processed in windows of `concurrency` items. Each window is
//! dispatched through the cache concurrently and fully awaited before the
//! next one starts. Every `yield_interval` windows the task yields so long
//! batches don't starve other work on the runtime.
//!
//! The output always has one result per input, in input order. Items that
//! fail to evaluate get a `validation_failed` result instead of aborting
//! the batch.

use cfm_core::{ValidationOptions, ValidationResult};
use futures::future::join_all;

use crate::cache::ResultCache;
use crate::config::BatchOptions;
use crate::runner::EvaluationRunner;

/// Validate many documents through the cache.
pub async fn batch_validate(
    cache: &ResultCache,
    runner: &dyn EvaluationRunner,
    contents: &[String],
    options: &ValidationOptions,
    batch: BatchOptions,
) -> Vec<ValidationResult> {
    let concurrency = batch.concurrency.max(1);
    let yield_interval = batch.yield_interval.max(1);
    let mut tagged: Vec<(usize, ValidationResult)> = Vec::with_capacity(contents.len());

    for (window_index, window) in contents.chunks(concurrency).enumerate() {
        let base = window_index * concurrency;
        let pending = window.iter().enumerate().map(|(offset, content)| async move {
            let index = base + offset;
            let result = match cache.get_or_evaluate(content, options, runner).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Batch item failed, recording fallback result");
                    ValidationResult::validation_failed(content.chars().count(), e.to_string())
                }
            };
            (index, result)
        });
        tagged.extend(join_all(pending).await);

        if (window_index + 1) % yield_interval == 0 {
            tracing::debug!(done = tagged.len(), total = contents.len(), "Batch progress");
            tokio::task::yield_now().await;
        }
    }

    // Completion order within a window is not guaranteed; restore input order.
    tagged.sort_by_key(|(index, _)| *index);
    tagged.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::runner::InProcessRunner;
    use crate::RuntimeError;
    use async_trait::async_trait;
    use cfm_core::ViolationType;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache() -> ResultCache {
        ResultCache::new(
            1_000,
            CacheConfig {
                timeout: Duration::from_secs(300),
                key_prefix_chars: None,
                dedupe_in_flight: false,
            },
        )
    }

    /// Sleeps longer for shorter content so later items finish first;
    /// tracks peak concurrency; fails on content containing "FAIL".
    #[derive(Default)]
    struct SlowRunner {
        inner: InProcessRunner,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EvaluationRunner for SlowRunner {
        fn name(&self) -> &str {
            "slow"
        }

        async fn run(
            &self,
            content: &str,
            options: &ValidationOptions,
        ) -> Result<ValidationResult, RuntimeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = 100u64.saturating_sub(content.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if content.contains("FAIL") {
                return Err(RuntimeError::ValidationTimeout(Duration::from_secs(10)));
            }
            self.inner.run(content, options).await
        }
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Documento {} {}", i, "x".repeat(i))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_and_concurrency_bounded() {
        let runner = SlowRunner::default();
        let contents = numbered(10);
        let results = batch_validate(
            &cache(),
            &runner,
            &contents,
            &ValidationOptions::default(),
            BatchOptions::default(),
        )
        .await;

        assert_eq!(results.len(), contents.len());
        for (content, result) in contents.iter().zip(&results) {
            assert_eq!(result.content_length, content.chars().count());
        }
        assert_eq!(runner.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_item_keeps_batch_length() {
        let runner = SlowRunner::default();
        let contents = vec![
            "Catarata.".to_string(),
            "FAIL".to_string(),
            "Este conteúdo não substitui consulta médica. CRM-MG 69.870.".to_string(),
        ];
        let results = batch_validate(
            &cache(),
            &runner,
            &contents,
            &ValidationOptions::default(),
            BatchOptions::default(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].score, 50);
        assert!(results[1].has_violation(ViolationType::ValidationFailed));
        assert!(!results[1].valid);
        assert_eq!(results[2].score, 100);
    }

    #[tokio::test]
    async fn test_duplicates_hit_cache_across_windows() {
        let runner = SlowRunner::default();
        let cache = cache();
        let contents = vec!["Catarata.".to_string(); 6];
        let results = batch_validate(
            &cache,
            &runner,
            &contents,
            &ValidationOptions::default(),
            BatchOptions {
                concurrency: 2,
                yield_interval: 1,
            },
        )
        .await;

        assert_eq!(results.len(), 6);
        // First window misses twice concurrently; later windows hit.
        assert_eq!(cache.stats().evaluations, 2);
        assert_eq!(cache.stats().hits, 4);
    }

    #[tokio::test]
    async fn test_zero_concurrency_treated_as_one() {
        let runner = SlowRunner::default();
        let results = batch_validate(
            &cache(),
            &runner,
            &numbered(4),
            &ValidationOptions::default(),
            BatchOptions {
                concurrency: 0,
                yield_interval: 0,
            },
        )
        .await;
        assert_eq!(results.len(), 4);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = SlowRunner::default();
        let results = batch_validate(
            &cache(),
            &runner,
            &[],
            &ValidationOptions::default(),
            BatchOptions::default(),
        )
        .await;
        assert!(results.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_batch_aligned_with_input(
            contents in proptest::collection::vec("\\PC{0,60}", 0..25),
            concurrency in 1usize..6,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            let runner = SlowRunner::default();
            let options = ValidationOptions::default();
            let results = rt.block_on(batch_validate(
                &cache(),
                &runner,
                &contents,
                &options,
                BatchOptions { concurrency, yield_interval: 2 },
            ));

            prop_assert_eq!(results.len(), contents.len());
            for (content, result) in contents.iter().zip(&results) {
                if content.contains("FAIL") {
                    continue;
                }
                let expected = cfm_core::evaluate(content, &options);
                prop_assert_eq!(result.score, expected.score);
                prop_assert_eq!(&result.violations, &expected.violations);
            }
        }
    }
}
