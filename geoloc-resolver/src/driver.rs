//! Batch Driver
//!
//! Wraps one pipeline run per inbound message: process, publish, report.
//! The driver decides nothing about acknowledgement; it tells the transport
//! whether the batch reached a terminal state through `BatchOutcome`.

use crate::error::PipelineError;
use crate::pipeline::{BatchStats, ResolutionPipeline};
use crate::reporting::{BatchOrigin, ErrorReporter};
use crate::transport::{BatchPublisher, TransportError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info};

/// Terminal state of a handled batch (safe to acknowledge)
#[derive(Debug)]
pub enum BatchOutcome {
    /// Output was published (possibly an empty array)
    Published(BatchStats),
    /// Batch was dropped after reporting; nothing was published
    Rejected(PipelineError),
}

pub struct BatchDriver {
    pipeline: Arc<ResolutionPipeline>,
    publisher: Arc<dyn BatchPublisher>,
    reporter: Arc<dyn ErrorReporter>,
    output_topic: String,
}

impl BatchDriver {
    pub fn new(
        pipeline: Arc<ResolutionPipeline>,
        publisher: Arc<dyn BatchPublisher>,
        reporter: Arc<dyn ErrorReporter>,
        output_topic: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            publisher,
            reporter,
            output_topic: output_topic.into(),
        }
    }

    /// Process one batch payload and publish its output
    ///
    /// Malformed payloads and panics inside the pipeline are reported and
    /// returned as `BatchOutcome::Rejected`.
    ///
    /// # Errors
    /// The publisher's error when the output could not be published. The
    /// failure has already been reported; the batch must not be acknowledged.
    pub async fn handle_batch(
        &self,
        payload: &[u8],
        origin: &BatchOrigin,
    ) -> Result<BatchOutcome, TransportError> {
        debug!(%origin, bytes = payload.len(), "Handling batch");

        let processed = AssertUnwindSafe(self.pipeline.process_batch(payload))
            .catch_unwind()
            .await;

        let output = match processed {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(self.reject(e, origin)),
            Err(panic) => {
                let e = PipelineError::Panicked(panic_message(panic));
                return Ok(self.reject(e, origin));
            }
        };

        let stats = output.stats;
        if let Err(e) = self.publisher.publish(&self.output_topic, output.payload).await {
            self.reporter.report(&PipelineError::Publish(e.clone()), origin);
            return Err(e);
        }

        info!(
            %origin,
            topic = %self.output_topic,
            entries = stats.entries,
            pattern_accepted = stats.pattern_accepted,
            model_calls = stats.model_calls,
            model_accepted = stats.model_accepted,
            geocode_calls = stats.geocode_calls,
            resolved = stats.resolved,
            published = stats.published,
            "Message processed"
        );

        Ok(BatchOutcome::Published(stats))
    }

    fn reject(&self, error: PipelineError, origin: &BatchOrigin) -> BatchOutcome {
        self.reporter.report(&error, origin);
        BatchOutcome::Rejected(error)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::mock::{MockModelExtractor, MockPatternExtractor};
    use crate::geocoding::mock::MockGeocoder;
    use crate::pipeline::PipelineSettings;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        reported: Mutex<Vec<String>>,
    }

    struct Publisher(Arc<Captured>, bool);

    #[async_trait]
    impl BatchPublisher for Publisher {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
            if self.1 {
                return Err(TransportError::Publish("broker unavailable".to_string()));
            }
            self.0
                .published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct Reporter(Arc<Captured>);

    impl ErrorReporter for Reporter {
        fn report(&self, error: &PipelineError, _origin: &BatchOrigin) {
            self.0.reported.lock().unwrap().push(error.to_string());
        }
    }

    fn driver(captured: &Arc<Captured>, publish_fails: bool) -> BatchDriver {
        let pipeline = ResolutionPipeline::new(
            Arc::new(MockPatternExtractor::default().with("home", "1 Home St", 0.9)),
            Arc::new(MockModelExtractor::default()),
            Arc::new(MockGeocoder::default().with("1 Home St", 1.0, 2.0)),
            PipelineSettings::default(),
        );
        BatchDriver::new(
            Arc::new(pipeline),
            Arc::new(Publisher(captured.clone(), publish_fails)),
            Arc::new(Reporter(captured.clone())),
            "out",
        )
    }

    fn origin() -> BatchOrigin {
        BatchOrigin::new("in", 0, 7)
    }

    #[tokio::test]
    async fn test_publishes_to_output_topic() {
        let captured = Arc::new(Captured::default());
        let outcome = driver(&captured, false)
            .handle_batch(br#"[{"id": 1, "raw_text": "home"}]"#, &origin())
            .await
            .unwrap();

        match outcome {
            BatchOutcome::Published(stats) => assert_eq!(stats.published, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        let published = captured.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "out");
        assert!(captured.reported.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_batch_rejected_and_reported() {
        let captured = Arc::new(Captured::default());
        let outcome = driver(&captured, false)
            .handle_batch(b"not json", &origin())
            .await
            .unwrap();

        assert!(matches!(outcome, BatchOutcome::Rejected(PipelineError::Decode(_))));
        assert!(captured.published.lock().unwrap().is_empty());
        assert_eq!(captured.reported.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_surfaces() {
        let captured = Arc::new(Captured::default());
        let result = driver(&captured, true)
            .handle_batch(b"[]", &origin())
            .await;

        assert!(matches!(result, Err(TransportError::Publish(_))));
        assert_eq!(captured.reported.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(42u8)), "non-string panic payload");
    }
}
