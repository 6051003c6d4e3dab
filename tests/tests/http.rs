#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use gauntlet::prelude::*;
    use mock_service::prelude::*;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn stub(addr: std::net::SocketAddr) -> HttpStub<MockInput> {
        HttpStub::new(&format!("http://{addr}")).unwrap()
    }

    fn digits(n: usize) -> Vec<(MockInput, usize)> {
        (0..n)
            .map(|i| {
                let label = i % NUM_CLASSES;
                let mut pixels = vec![0.; NUM_CLASSES];
                pixels[label] = 1.;
                let input = MockInput {
                    pixels,
                    delay_ms: (i % 5) as u64,
                    ..Default::default()
                };
                (input, label)
            })
            .collect()
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn classifies_every_digit() {
        let addr = start_mock_service().await.unwrap();

        let stats = Evaluation::new("http-digits", stub(addr), digits(100).into_iter())
            .concurrency(NonZeroUsize::new(8).unwrap())
            .await
            .unwrap();

        assert_eq!(stats.total, 100);
        assert_eq!(stats.correct, 100);
        assert_eq!(stats.classification_error_rate, 0.);
        assert!(stats.latency.is_some());
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn server_errors_are_counted() {
        let addr = start_mock_service().await.unwrap();

        let dataset: Vec<_> = digits(20)
            .into_iter()
            .enumerate()
            .map(|(i, (mut input, label))| {
                input.fail = i % 4 == 0;
                (input, label)
            })
            .collect();

        let stats = Evaluation::new("http-errors", stub(addr), dataset.into_iter())
            .concurrency(NonZeroUsize::new(4).unwrap())
            .await
            .unwrap();

        assert_eq!(stats.failures.service, 5);
        assert_eq!(stats.correct, 15);
        assert_eq!(stats.request_error_rate, 0.25);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn slow_replies_time_out() {
        let addr = start_mock_service().await.unwrap();

        let dataset: Vec<_> = digits(6)
            .into_iter()
            .enumerate()
            .map(|(i, (mut input, label))| {
                if i < 2 {
                    input.delay_ms = 2_000;
                }
                (input, label)
            })
            .collect();

        let stats = Evaluation::new("http-timeouts", stub(addr), dataset.into_iter())
            .concurrency(NonZeroUsize::new(6).unwrap())
            .timeout(Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(stats.failures.timeout, 2);
        assert_eq!(stats.succeeded, 4);
        assert!(stats.elapsed < Duration::from_secs(2));
    }
}
