//! Test Helper Utilities
//!
//! Shared utilities for testing geoloc-resolver

#![allow(dead_code)]

pub mod mocks;

pub use mocks::{
    RecordingPublisher, RecordingReporter, ScriptedGeocoder, ScriptedModel, ScriptedPattern,
};

use geoloc_resolver::{BatchDriver, PipelineSettings, ResolutionPipeline};
use std::sync::Arc;

pub const OUTPUT_TOPIC: &str = "address-processed";

/// Collaborators wired into one pipeline, kept for assertions
pub struct Harness {
    pub pattern: Arc<ScriptedPattern>,
    pub model: Arc<ScriptedModel>,
    pub geocoder: Arc<ScriptedGeocoder>,
    pub publisher: Arc<RecordingPublisher>,
    pub reporter: Arc<RecordingReporter>,
    pub driver: BatchDriver,
}

impl Harness {
    pub fn new(pattern: ScriptedPattern, model: ScriptedModel, geocoder: ScriptedGeocoder) -> Self {
        Self::with_settings(pattern, model, geocoder, PipelineSettings::default())
    }

    pub fn with_settings(
        pattern: ScriptedPattern,
        model: ScriptedModel,
        geocoder: ScriptedGeocoder,
        settings: PipelineSettings,
    ) -> Self {
        Self::build(pattern, model, geocoder, RecordingPublisher::default(), settings)
    }

    pub fn with_failing_publisher(
        pattern: ScriptedPattern,
        model: ScriptedModel,
        geocoder: ScriptedGeocoder,
    ) -> Self {
        Self::build(
            pattern,
            model,
            geocoder,
            RecordingPublisher::failing(),
            PipelineSettings::default(),
        )
    }

    fn build(
        pattern: ScriptedPattern,
        model: ScriptedModel,
        geocoder: ScriptedGeocoder,
        publisher: RecordingPublisher,
        settings: PipelineSettings,
    ) -> Self {
        let pattern = Arc::new(pattern);
        let model = Arc::new(model);
        let geocoder = Arc::new(geocoder);
        let publisher = Arc::new(publisher);
        let reporter = Arc::new(RecordingReporter::default());

        let pipeline = ResolutionPipeline::new(
            pattern.clone(),
            model.clone(),
            geocoder.clone(),
            settings,
        );
        let driver = BatchDriver::new(
            Arc::new(pipeline),
            publisher.clone(),
            reporter.clone(),
            OUTPUT_TOPIC,
        );

        Self {
            pattern,
            model,
            geocoder,
            publisher,
            reporter,
            driver,
        }
    }
}
