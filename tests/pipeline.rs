//! Pipeline integration tests against a scripted gateway.
//!
//! The gateway below implements the public [`Gateway`] trait the same way a
//! downstream crate would, records every call, and returns canned answers.

use async_trait::async_trait;
use caselens::{
    DeckDraft, DocumentSection, Gateway, GatewayError, Pipeline, PipelineError, PipelineObserver,
    SlideDraft, SlideKind, SlideStylePatch, Source, Stage, StyledPoint,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

#[derive(Default)]
struct Script {
    related: bool,
    /// Gateway call that answers with an error.
    fail_at: Option<&'static str>,
    /// Titles of slides whose image request fails.
    failing_images: Vec<String>,
    /// Titles of slides whose image request never completes.
    hanging_images: Vec<String>,
    calls: Mutex<Vec<String>>,
    seen_text: Mutex<Option<String>>,
}

struct ScriptedGateway(Arc<Script>);

impl ScriptedGateway {
    fn log(&self, call: &'static str) -> Result<(), GatewayError> {
        self.0.calls.lock().unwrap().push(call.to_string());
        match self.0.fail_at {
            Some(step) if step == call => Err(GatewayError::Api {
                message: format!("{call}: HTTP 503"),
            }),
            _ => Ok(()),
        }
    }
}

fn sections() -> Vec<DocumentSection> {
    [
        "1. Summary",
        "2. Timeline",
        "3. Legal Struggle",
        "4. PM Strategy",
        "5. DPO Deep Dive",
    ]
    .iter()
    .map(|t| DocumentSection::new(*t, format!("Body of {t}")))
    .collect()
}

fn slide(kind: SlideKind, title: &str, n: usize) -> SlideDraft {
    SlideDraft::new(
        kind,
        title,
        (0..n).map(|i| StyledPoint::plain(format!("Point {i}"))).collect(),
    )
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn validate(&self, _sources: &[Source]) -> Result<bool, GatewayError> {
        self.log("validate")?;
        Ok(self.0.related)
    }

    async fn extract_text(&self, _sources: &[Source]) -> Result<String, GatewayError> {
        self.log("extract_text")?;
        Ok("Case text...".into())
    }

    async fn generate_document(&self, text: &str) -> Result<Vec<DocumentSection>, GatewayError> {
        self.log("generate_document")?;
        *self.0.seen_text.lock().unwrap() = Some(text.to_string());
        Ok(sections())
    }

    async fn generate_deck(&self, _sections: &[DocumentSection]) -> Result<DeckDraft, GatewayError> {
        self.log("generate_deck")?;
        Ok(DeckDraft {
            presentation_title: "Meta vs DPC".into(),
            subtitle: "Children's data".into(),
            slides: vec![
                slide(SlideKind::Title, "Meta vs DPC", 1),
                slide(SlideKind::Toc, "Agenda", 4),
                slide(SlideKind::Content, "Findings", 3),
                slide(SlideKind::DpoTechnical, "Articles", 8),
            ],
        })
    }

    async fn synthesize_image(
        &self,
        title: &str,
        _points: &[StyledPoint],
    ) -> Result<String, GatewayError> {
        self.log("synthesize_image")?;
        if self.0.hanging_images.iter().any(|t| t == title) {
            std::future::pending::<()>().await;
        }
        if self.0.failing_images.iter().any(|t| t == title) {
            return Err(GatewayError::NoImage);
        }
        Ok("https://images.example/slide.png".into())
    }
}

fn pipeline(script: Script) -> (Pipeline<ScriptedGateway>, Arc<Script>) {
    let script = Arc::new(script);
    (Pipeline::new(ScriptedGateway(script.clone())), script)
}

fn related() -> Script {
    Script {
        related: true,
        ..Default::default()
    }
}

async fn deck_ready(script: Script) -> (Pipeline<ScriptedGateway>, Arc<Script>) {
    let (mut p, s) = pipeline(script);
    p.submit_sources([Source::url("https://dpc.ie/decision")]).unwrap();
    p.start_analysis().await.unwrap();
    p.proceed_to_analysis().await.unwrap();
    p.generate_deck().await.unwrap();
    (p, s)
}

#[tokio::test]
async fn url_source_reaches_document_ready_with_five_ordered_sections() {
    let (mut p, script) = pipeline(related());
    p.submit_sources([Source::url("https://dpc.ie/decision")]).unwrap();

    assert_eq!(p.start_analysis().await.unwrap(), Stage::TextReady);
    assert_eq!(p.extracted_text(), Some("Case text..."));

    p.proceed_to_analysis().await.unwrap();
    assert_eq!(p.stage(), Stage::DocumentReady);
    assert_eq!(p.sections(), sections().as_slice());
    assert_eq!(
        *script.calls.lock().unwrap(),
        ["validate", "extract_text", "generate_document"]
    );
}

#[tokio::test]
async fn rejected_sources_stop_before_extraction() {
    let (mut p, script) = pipeline(Script::default());
    p.submit_sources([Source::text_file("recipe.txt", "Preheat the oven")])
        .unwrap();

    assert_eq!(p.start_analysis().await.unwrap(), Stage::ValidationFailed);
    assert_eq!(p.extracted_text(), None);
    assert_eq!(*script.calls.lock().unwrap(), ["validate"]);

    // Only a reset leaves the rejected state.
    assert!(matches!(
        p.proceed_to_analysis().await,
        Err(PipelineError::InvalidStage { .. })
    ));
    p.reset();
    assert_eq!(p.stage(), Stage::Idle);
    assert!(p.sources().is_empty());
}

/// Drive the pipeline from sources to deck and return the first error.
async fn run_to_deck(p: &mut Pipeline<ScriptedGateway>) -> Result<(), PipelineError> {
    p.submit_sources([Source::url("https://dpc.ie/decision")])?;
    p.start_analysis().await?;
    p.proceed_to_analysis().await?;
    p.generate_deck().await?;
    Ok(())
}

#[tokio::test]
async fn any_failed_gateway_step_moves_to_error_and_stops() {
    for step in ["validate", "extract_text", "generate_document", "generate_deck"] {
        let (mut p, script) = pipeline(Script {
            related: true,
            fail_at: Some(step),
            ..Default::default()
        });

        let err = run_to_deck(&mut p).await.unwrap_err();
        assert!(err.is_fatal(), "{step}");
        assert_eq!(p.stage(), Stage::Error, "{step}");
        assert!(p.error_message().unwrap().contains("HTTP 503"), "{step}");
        assert_eq!(
            script.calls.lock().unwrap().last().map(String::as_str),
            Some(step)
        );

        p.reset();
        assert_eq!(p.stage(), Stage::Idle);
    }
}

/// Collects the message of every event emitted while installed.
struct EventCollector(Arc<Mutex<Vec<String>>>);

#[derive(Default)]
struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for EventCollector {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}

#[tokio::test]
async fn stage_failure_is_logged_with_the_failed_stage() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector(events.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let (mut p, _) = pipeline(Script {
        related: true,
        fail_at: Some("generate_deck"),
        ..Default::default()
    });
    run_to_deck(&mut p).await.unwrap_err();

    let events = events.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|m| m.contains("GENERATING_DECK failed") && m.contains("HTTP 503")),
        "got: {events:?}"
    );
}

#[tokio::test]
async fn edited_text_is_what_gets_analysed() {
    let (mut p, script) = pipeline(related());
    p.submit_sources([Source::url("https://dpc.ie/decision")]).unwrap();
    p.start_analysis().await.unwrap();

    p.review_extracted_text("Corrected case text").unwrap();
    p.proceed_to_analysis().await.unwrap();
    assert_eq!(
        script.seen_text.lock().unwrap().as_deref(),
        Some("Corrected case text")
    );
}

#[tokio::test]
async fn sources_can_be_removed_before_the_run() {
    let (mut p, _) = pipeline(related());
    let ids = p
        .submit_sources([
            Source::url("https://dpc.ie/a"),
            Source::url("https://dpc.ie/b"),
        ])
        .unwrap();
    let removed = p.remove_source(&ids[0]).unwrap();
    assert_eq!(removed.payload, "https://dpc.ie/a");
    assert_eq!(p.sources().len(), 1);
    assert!(matches!(
        p.remove_source(&ids[0]),
        Err(PipelineError::UnknownSource { .. })
    ));
}

#[tokio::test]
async fn deck_slides_get_ids_and_default_styles() {
    let (p, _) = deck_ready(related()).await;
    let deck = p.deck().unwrap();
    assert_eq!(deck.slides.len(), 4);
    assert!(deck.slides.iter().all(|s| s.id.starts_with("slide-")));
    assert!(deck
        .slides
        .iter()
        .all(|s| s.style == caselens::SlideStyle::default()));
}

#[tokio::test]
async fn failed_image_stays_scoped_to_its_slide() {
    let (mut p, _) = deck_ready(Script {
        related: true,
        failing_images: vec!["Findings".into()],
        ..Default::default()
    })
    .await;

    let err = p.regenerate_slide_image(2).await.unwrap_err();
    assert!(!err.is_fatal());
    let failed = &p.deck().unwrap().slides[2];
    assert!(failed.image.is_none());
    assert!(!failed.image_loading);
    assert_eq!(p.stage(), Stage::DeckReady);

    p.regenerate_slide_image(1).await.unwrap();
    assert_eq!(
        p.deck().unwrap().slides[1].image.as_deref(),
        Some("https://images.example/slide.png")
    );
}

#[tokio::test]
async fn abandoned_image_request_clears_the_loading_flag() {
    let (mut p, _) = deck_ready(Script {
        related: true,
        hanging_images: vec!["Findings".into()],
        ..Default::default()
    })
    .await;

    let attempt =
        tokio::time::timeout(Duration::from_millis(20), p.regenerate_slide_image(2)).await;
    assert!(attempt.is_err());

    let slide = &p.deck().unwrap().slides[2];
    assert!(!slide.image_loading);
    assert!(slide.image.is_none());
    assert_eq!(p.stage(), Stage::DeckReady);
}

#[tokio::test]
async fn eight_point_slide_shrinks_both_sizes() {
    let (mut p, _) = deck_ready(related()).await;
    let patch = SlideStylePatch {
        title_font_size: Some(32.0),
        body_font_size: Some(20.0),
        ..Default::default()
    };
    p.update_slide_style(3, &patch).unwrap();

    let sizes = p.render_sizes(3).unwrap();
    assert!((sizes.title_size - 28.8).abs() < 1e-9);
    assert!((sizes.body_size - 17.0).abs() < 1e-9);

    // Applying the same patch twice changes nothing.
    let before = p.deck().unwrap().slides[3].style.clone();
    assert_eq!(*p.update_slide_style(3, &patch).unwrap(), before);

    // Few short points keep the base sizes.
    let light = p.render_sizes(1).unwrap();
    assert_eq!((light.title_size, light.body_size), (32.0, 18.0));
}

#[tokio::test]
async fn style_floor_is_enforced_at_update_time() {
    let (mut p, _) = deck_ready(related()).await;
    let style = p
        .update_slide_style(
            0,
            &SlideStylePatch {
                title_font_size: Some(10.0),
                body_font_size: Some(8.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(style.title_font_size, 24.0);
    assert_eq!(style.body_font_size, 14.0);
}

#[tokio::test]
async fn sections_stay_editable_after_the_deck() {
    let (mut p, _) = deck_ready(related()).await;
    p.edit_document_section(4, "Art. 25 breached").unwrap();
    assert_eq!(p.sections()[4].body, "Art. 25 breached");
    assert!(matches!(
        p.edit_document_section(5, "x"),
        Err(PipelineError::IndexOutOfRange { .. })
    ));
}

#[derive(Default)]
struct StageLog(Mutex<Vec<Stage>>);

impl PipelineObserver for StageLog {
    fn on_stage_change(&self, _from: Stage, to: Stage) {
        self.0.lock().unwrap().push(to);
    }
}

#[tokio::test]
async fn observer_sees_every_transition() {
    let log = Arc::new(StageLog::default());
    let (p, _) = pipeline(related());
    let mut p = p.with_observer(log.clone());
    p.submit_sources([Source::url("https://dpc.ie/decision")]).unwrap();
    p.start_analysis().await.unwrap();
    p.proceed_to_analysis().await.unwrap();
    p.generate_deck().await.unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        [
            Stage::Validating,
            Stage::ExtractingText,
            Stage::TextReady,
            Stage::AnalyzingDocument,
            Stage::DocumentReady,
            Stage::GeneratingDeck,
            Stage::DeckReady,
        ]
    );
}
