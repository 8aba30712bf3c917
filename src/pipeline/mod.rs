//! The analysis pipeline: a state machine that turns sources into
//! extracted text, then a dossier, then a slide deck.
//!
//! ## Stages
//!
//! ```text
//! IDLE ─▶ VALIDATING ─┬▶ VALIDATION_FAILED
//!                     └▶ EXTRACTING_TEXT ─▶ TEXT_READY
//!     ─▶ ANALYZING_DOCUMENT ─▶ DOCUMENT_READY ─▶ GENERATING_DECK ─▶ DECK_READY
//!
//! any ─▶ ERROR        (stage-level gateway failure)
//! any ─▶ IDLE         (reset)
//! ```
//!
//! Every operation takes `&mut self`: one pipeline instance can never have
//! two gateway calls in flight, and edits cannot race a running stage.
//! There is no cancellation. Dropping the future of a running operation
//! abandons the request; call [`Pipeline::reset`] afterwards. A dropped
//! [`Pipeline::regenerate_slide_image`] still clears the slide's
//! `image_loading` flag.
//!
//! There is also no automatic retry. A failed stage moves to
//! [`Stage::Error`] and only a reset gets the pipeline going again.

mod stage;

pub use stage::Stage;

use crate::error::{GatewayError, PipelineError, SlideError};
use crate::gateway::Gateway;
use crate::model::{Deck, DocumentSection, Slide, SlideStyle, SlideStylePatch};
use crate::progress::Observer;
use crate::sizing::{compute_render_sizes, RenderSizes};
use crate::sources::{Source, SourceRegistry};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One analysis session.
pub struct Pipeline<G> {
    gateway: G,
    stage: Stage,
    sources: SourceRegistry,
    extracted_text: Option<String>,
    sections: Vec<DocumentSection>,
    deck: Option<Deck>,
    error: Option<String>,
    observer: Option<Observer>,
}

impl<G: Gateway> Pipeline<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            stage: Stage::Idle,
            sources: SourceRegistry::new(),
            extracted_text: None,
            sections: Vec::new(),
            deck: None,
            error: None,
            observer: None,
        }
    }

    /// Attach an observer that is notified of stage and image events.
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn sources(&self) -> &[Source] {
        self.sources.as_slice()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.as_deref()
    }

    pub fn sections(&self) -> &[DocumentSection] {
        &self.sections
    }

    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    /// Message recorded by the last stage-level failure.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ── Sources ──────────────────────────────────────────────────────────

    /// Add a batch of sources. Only valid in `IDLE`; the batch must not be
    /// empty. Returns the ids of the added sources.
    pub fn submit_sources(
        &mut self,
        sources: impl IntoIterator<Item = Source>,
    ) -> Result<Vec<String>, PipelineError> {
        self.require("submit sources", |s| s == Stage::Idle)?;
        let batch: Vec<Source> = sources.into_iter().collect();
        if batch.is_empty() {
            return Err(PipelineError::NoSources);
        }
        Ok(batch.into_iter().map(|s| self.sources.add(s)).collect())
    }

    /// Add a single source. Only valid in `IDLE`.
    pub fn add_source(&mut self, source: Source) -> Result<String, PipelineError> {
        self.require("add a source", |s| s == Stage::Idle)?;
        debug!("Adding source '{}'", source.display_name);
        Ok(self.sources.add(source))
    }

    /// Remove a source by id. Only valid in `IDLE`.
    pub fn remove_source(&mut self, id: &str) -> Result<Source, PipelineError> {
        self.require("remove a source", |s| s == Stage::Idle)?;
        self.sources
            .remove(id)
            .ok_or_else(|| PipelineError::UnknownSource { id: id.to_string() })
    }

    // ── Stage operations ─────────────────────────────────────────────────

    /// Validate the sources and, if they relate to a case decision,
    /// extract their text.
    ///
    /// Returns the resulting stage: [`Stage::TextReady`] or
    /// [`Stage::ValidationFailed`]. A gateway failure moves the pipeline to
    /// [`Stage::Error`] and is returned as `Err`.
    pub async fn start_analysis(&mut self) -> Result<Stage, PipelineError> {
        self.require("start analysis", |s| s == Stage::Idle)?;
        if self.sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        info!("Validating {} sources", self.sources.len());
        self.transition(Stage::Validating);
        let related = match self.gateway.validate(self.sources.as_slice()).await {
            Ok(v) => v,
            Err(e) => return Err(self.fail(e)),
        };

        if !related {
            info!("Sources rejected: not related to a case decision");
            self.transition(Stage::ValidationFailed);
            return Ok(self.stage);
        }

        self.transition(Stage::ExtractingText);
        let text = match self.gateway.extract_text(self.sources.as_slice()).await {
            Ok(t) => t,
            Err(e) => return Err(self.fail(e)),
        };
        info!("Extracted {} characters of case text", text.chars().count());
        self.extracted_text = Some(text);
        self.transition(Stage::TextReady);
        Ok(self.stage)
    }

    /// Replace the extracted text before analysis. Only valid in `TEXT_READY`.
    pub fn review_extracted_text(&mut self, text: impl Into<String>) -> Result<(), PipelineError> {
        self.require("edit the extracted text", |s| s == Stage::TextReady)?;
        self.extracted_text = Some(text.into());
        Ok(())
    }

    /// Generate the dossier from the extracted text.
    pub async fn proceed_to_analysis(&mut self) -> Result<&[DocumentSection], PipelineError> {
        self.require("analyse the document", |s| s == Stage::TextReady)?;
        let text = self.extracted_text.clone().unwrap_or_default();

        self.transition(Stage::AnalyzingDocument);
        let sections = match self.gateway.generate_document(&text).await {
            Ok(s) => s,
            Err(e) => return Err(self.fail(e)),
        };
        info!("Dossier generated with {} sections", sections.len());
        self.sections = sections;
        self.transition(Stage::DocumentReady);
        Ok(&self.sections)
    }

    /// Replace the body of one dossier section. Valid once the dossier
    /// exists, including after the deck has been generated.
    pub fn edit_document_section(
        &mut self,
        index: usize,
        body: impl Into<String>,
    ) -> Result<(), PipelineError> {
        self.require("edit a document section", |s| s.has_document())?;
        let len = self.sections.len();
        let section = self
            .sections
            .get_mut(index)
            .ok_or(PipelineError::IndexOutOfRange {
                what: "section",
                index,
                len,
            })?;
        section.body = body.into();
        Ok(())
    }

    /// Generate the slide deck from the dossier. Every slide gets a fresh
    /// id and the default style; blank points are dropped.
    pub async fn generate_deck(&mut self) -> Result<&Deck, PipelineError> {
        self.require("generate a deck", |s| s == Stage::DocumentReady)?;

        self.transition(Stage::GeneratingDeck);
        let draft = match self.gateway.generate_deck(&self.sections).await {
            Ok(d) => d,
            Err(e) => return Err(self.fail(e)),
        };

        let slides: Vec<Slide> = draft
            .slides
            .into_iter()
            .enumerate()
            .map(|(i, s)| Slide::from_draft(s, format!("slide-{}-{}", i, Uuid::new_v4().simple())))
            .collect();
        info!("Deck '{}' generated with {} slides", draft.presentation_title, slides.len());

        self.transition(Stage::DeckReady);
        let deck: &Deck = self.deck.insert(Deck {
            presentation_title: draft.presentation_title,
            subtitle: draft.subtitle,
            slides,
        });
        Ok(deck)
    }

    /// Ask the gateway for an illustration of one slide.
    ///
    /// Failure is scoped to the slide: the loading flag is cleared, the
    /// image stays unset, the stage stays `DECK_READY`, and the error is
    /// returned as [`PipelineError::Slide`].
    pub async fn regenerate_slide_image(&mut self, index: usize) -> Result<(), PipelineError> {
        self.require("regenerate a slide image", |s| s == Stage::DeckReady)?;
        let result = {
            let mut loading = ImageLoading::start(slide_in(&mut self.deck, index)?);
            if let Some(ref o) = self.observer {
                o.on_image_start(index);
            }
            let slide = &loading.0;
            let result = self
                .gateway
                .synthesize_image(&slide.title, &slide.points)
                .await;
            if let Ok(ref reference) = result {
                loading.0.image = Some(reference.clone());
            }
            result
        };

        match result {
            Ok(_) => {
                debug!("Slide {}: image stored", index);
                if let Some(ref o) = self.observer {
                    o.on_image_complete(index);
                }
                Ok(())
            }
            Err(e) => {
                let detail = e.to_string();
                warn!("Slide {}: image synthesis failed: {}", index, detail);
                if let Some(ref o) = self.observer {
                    o.on_image_error(index, &detail);
                }
                Err(SlideError::ImageFailed {
                    slide: index,
                    detail,
                }
                .into())
            }
        }
    }

    /// Merge a partial style into one slide. Font sizes are clamped before
    /// the style is stored.
    pub fn update_slide_style(
        &mut self,
        index: usize,
        patch: &SlideStylePatch,
    ) -> Result<&SlideStyle, PipelineError> {
        self.require("update a slide style", |s| s == Stage::DeckReady)?;
        let slide = self.slide_mut(index)?;
        slide.style.apply(patch);
        Ok(&slide.style)
    }

    /// Font sizes a slide should be previewed with. Same computation as the
    /// deck exporter.
    pub fn render_sizes(&self, index: usize) -> Result<RenderSizes, PipelineError> {
        let slides = self.deck.as_ref().map(|d| d.slides.as_slice()).unwrap_or(&[]);
        slides
            .get(index)
            .map(compute_render_sizes)
            .ok_or(PipelineError::IndexOutOfRange {
                what: "slide",
                index,
                len: slides.len(),
            })
    }

    /// Discard every artifact and return to `IDLE`. Valid in any stage.
    pub fn reset(&mut self) {
        self.sources.clear();
        self.extracted_text = None;
        self.sections.clear();
        self.deck = None;
        self.error = None;
        self.transition(Stage::Idle);
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn require(
        &self,
        operation: &'static str,
        allowed: impl Fn(Stage) -> bool,
    ) -> Result<(), PipelineError> {
        if allowed(self.stage) {
            Ok(())
        } else {
            Err(PipelineError::InvalidStage {
                operation,
                stage: self.stage,
            })
        }
    }

    fn slide_mut(&mut self, index: usize) -> Result<&mut Slide, PipelineError> {
        slide_in(&mut self.deck, index)
    }

    fn transition(&mut self, to: Stage) {
        let from = self.stage;
        if !from.can_transition_to(&to) {
            warn!("Unexpected stage transition {} -> {}", from, to);
        }
        debug!("Stage {} -> {}", from, to);
        self.stage = to;
        if let Some(ref o) = self.observer {
            o.on_stage_change(from, to);
        }
    }

    /// Record a stage-level gateway failure and move to `ERROR`.
    fn fail(&mut self, err: GatewayError) -> PipelineError {
        let failed_in = self.stage;
        let message = err.to_string();
        warn!("{} failed: {}", failed_in, message);
        self.error = Some(message.clone());
        self.transition(Stage::Error);
        if let Some(ref o) = self.observer {
            o.on_error(failed_in, &message);
        }
        PipelineError::Gateway(err)
    }
}

fn slide_in(deck: &mut Option<Deck>, index: usize) -> Result<&mut Slide, PipelineError> {
    let slides = match deck.as_mut() {
        Some(d) => &mut d.slides,
        None => {
            return Err(PipelineError::IndexOutOfRange {
                what: "slide",
                index,
                len: 0,
            })
        }
    };
    let len = slides.len();
    slides.get_mut(index).ok_or(PipelineError::IndexOutOfRange {
        what: "slide",
        index,
        len,
    })
}

/// Holds a slide's `image_loading` flag up for as long as it lives.
struct ImageLoading<'a>(&'a mut Slide);

impl<'a> ImageLoading<'a> {
    fn start(slide: &'a mut Slide) -> Self {
        slide.image_loading = true;
        Self(slide)
    }
}

impl Drop for ImageLoading<'_> {
    fn drop(&mut self) {
        self.0.image_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::model::{DeckDraft, SlideDraft, SlideKind, StyledPoint};
    use mockall::Sequence;

    fn sections(n: usize) -> Vec<DocumentSection> {
        (1..=n)
            .map(|i| DocumentSection::new(format!("{i}. Section"), format!("Body {i}")))
            .collect()
    }

    fn deck_draft() -> DeckDraft {
        DeckDraft {
            presentation_title: "Meta vs DPC".into(),
            subtitle: "Children's data on Instagram".into(),
            slides: vec![
                SlideDraft::new(SlideKind::Title, "Meta vs DPC", vec![]),
                SlideDraft::new(
                    SlideKind::Content,
                    "Violations",
                    vec![StyledPoint::plain("Art. 25"), StyledPoint::plain(" ")],
                ),
                SlideDraft::new(SlideKind::PmTakeaway, "Takeaways", vec![StyledPoint::plain("PbD")]),
            ],
        }
    }

    fn happy_gateway() -> MockGateway {
        let mut g = MockGateway::new();
        g.expect_validate().returning(|_| Ok(true));
        g.expect_extract_text().returning(|_| Ok("Case text...".into()));
        g.expect_generate_document().returning(|_| Ok(sections(5)));
        g.expect_generate_deck().returning(|_| Ok(deck_draft()));
        g
    }

    async fn deck_ready(g: MockGateway) -> Pipeline<MockGateway> {
        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        p.start_analysis().await.unwrap();
        p.proceed_to_analysis().await.unwrap();
        p.generate_deck().await.unwrap();
        p
    }

    #[tokio::test]
    async fn validate_runs_before_extraction() {
        let mut g = MockGateway::new();
        let mut seq = Sequence::new();
        g.expect_validate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        g.expect_extract_text()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("Case text...".into()));

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        assert_eq!(p.start_analysis().await.unwrap(), Stage::TextReady);
        assert_eq!(p.extracted_text(), Some("Case text..."));
    }

    #[tokio::test]
    async fn rejected_sources_skip_extraction() {
        let mut g = MockGateway::new();
        g.expect_validate().times(1).returning(|_| Ok(false));
        g.expect_extract_text().never();

        let mut p = Pipeline::new(g);
        p.add_source(Source::text_file("recipe.txt", "Pancakes")).unwrap();
        assert_eq!(p.start_analysis().await.unwrap(), Stage::ValidationFailed);
        assert!(p.extracted_text().is_none());

        // Only reset leaves VALIDATION_FAILED.
        assert!(matches!(
            p.proceed_to_analysis().await,
            Err(PipelineError::InvalidStage { .. })
        ));
        p.reset();
        assert_eq!(p.stage(), Stage::Idle);
        assert!(p.sources().is_empty());
    }

    #[tokio::test]
    async fn start_analysis_requires_sources() {
        let mut g = MockGateway::new();
        g.expect_validate().never();
        let mut p = Pipeline::new(g);
        assert!(matches!(p.start_analysis().await, Err(PipelineError::NoSources)));
        assert_eq!(p.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn submit_sources_rejects_empty_batch() {
        let mut p = Pipeline::new(MockGateway::new());
        assert!(matches!(
            p.submit_sources(Vec::new()),
            Err(PipelineError::NoSources)
        ));
        let ids = p
            .submit_sources(vec![
                Source::url("https://a.example/decision"),
                Source::text_file("b.txt", "b"),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(p.sources().len(), 2);
    }

    #[tokio::test]
    async fn remove_unknown_source_is_an_error() {
        let mut p = Pipeline::new(MockGateway::new());
        let id = p.add_source(Source::url("https://a.example")).unwrap();
        assert!(matches!(
            p.remove_source("nope"),
            Err(PipelineError::UnknownSource { .. })
        ));
        assert!(p.remove_source(&id).is_ok());
        assert!(p.sources().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_moves_to_error() {
        let mut g = MockGateway::new();
        g.expect_validate().returning(|_| Ok(true));
        g.expect_extract_text().returning(|_| {
            Err(GatewayError::Api {
                message: "503 Service Unavailable".into(),
            })
        });

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        let err = p.start_analysis().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(p.stage(), Stage::Error);
        assert!(p.error_message().unwrap().contains("503"));

        p.reset();
        assert_eq!(p.stage(), Stage::Idle);
        assert!(p.error_message().is_none());
    }

    #[tokio::test]
    async fn validation_failure_moves_to_error_before_extraction() {
        let mut g = MockGateway::new();
        g.expect_validate().times(1).returning(|_| {
            Err(GatewayError::Api {
                message: "429 Too Many Requests".into(),
            })
        });
        g.expect_extract_text().never();

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        assert!(p.start_analysis().await.unwrap_err().is_fatal());
        assert_eq!(p.stage(), Stage::Error);
        assert!(p.error_message().unwrap().contains("429"));
        assert!(p.extracted_text().is_none());
    }

    #[tokio::test]
    async fn document_failure_moves_to_error_before_the_deck() {
        let mut g = MockGateway::new();
        g.expect_validate().returning(|_| Ok(true));
        g.expect_extract_text().returning(|_| Ok("Case text...".into()));
        g.expect_generate_document().times(1).returning(|_| {
            Err(GatewayError::Api {
                message: "model overloaded".into(),
            })
        });
        g.expect_generate_deck().never();

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        p.start_analysis().await.unwrap();
        assert!(p.proceed_to_analysis().await.is_err());
        assert_eq!(p.stage(), Stage::Error);
        assert!(p.error_message().unwrap().contains("model overloaded"));
        assert!(p.sections().is_empty());
        assert!(matches!(
            p.generate_deck().await,
            Err(PipelineError::InvalidStage { .. })
        ));
    }

    #[tokio::test]
    async fn deck_failure_moves_to_error_without_images() {
        let mut g = MockGateway::new();
        g.expect_validate().returning(|_| Ok(true));
        g.expect_extract_text().returning(|_| Ok("Case text...".into()));
        g.expect_generate_document().returning(|_| Ok(sections(5)));
        g.expect_generate_deck().times(1).returning(|_| {
            Err(GatewayError::Api {
                message: "invalid deck JSON".into(),
            })
        });
        g.expect_synthesize_image().never();

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        p.start_analysis().await.unwrap();
        p.proceed_to_analysis().await.unwrap();
        assert!(p.generate_deck().await.unwrap_err().is_fatal());
        assert_eq!(p.stage(), Stage::Error);
        assert!(p.error_message().unwrap().contains("invalid deck JSON"));
        assert!(p.deck().is_none());
        assert!(matches!(
            p.regenerate_slide_image(0).await,
            Err(PipelineError::InvalidStage { .. })
        ));
    }

    #[tokio::test]
    async fn reviewed_text_is_sent_to_analysis() {
        let mut g = MockGateway::new();
        g.expect_validate().returning(|_| Ok(true));
        g.expect_extract_text().returning(|_| Ok("raw".into()));
        g.expect_generate_document()
            .withf(|text: &str| text == "edited")
            .times(1)
            .returning(|_| Ok(sections(5)));

        let mut p = Pipeline::new(g);
        p.add_source(Source::url("https://dpc.ie/decision.pdf")).unwrap();
        p.start_analysis().await.unwrap();
        p.review_extracted_text("edited").unwrap();
        let got = p.proceed_to_analysis().await.unwrap();
        assert_eq!(got.len(), 5);
        assert_eq!(p.stage(), Stage::DocumentReady);
    }

    #[tokio::test]
    async fn deck_slides_get_default_style_and_unique_ids() {
        let p = deck_ready(happy_gateway()).await;
        let deck = p.deck().unwrap();
        assert_eq!(deck.slides.len(), 3);
        assert!(deck.slides.iter().all(|s| s.style == SlideStyle::default()));
        assert_eq!(deck.slides[1].points.len(), 1, "blank point filtered");

        let mut ids: Vec<&str> = deck.slides.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn sections_stay_editable_after_deck() {
        let mut p = deck_ready(happy_gateway()).await;
        p.edit_document_section(4, "New DPO notes").unwrap();
        assert_eq!(p.sections()[4].body, "New DPO notes");
        assert_eq!(p.stage(), Stage::DeckReady);
        assert!(matches!(
            p.edit_document_section(9, "x"),
            Err(PipelineError::IndexOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn image_failure_is_scoped_to_the_slide() {
        let mut g = happy_gateway();
        g.expect_synthesize_image()
            .returning(|_, _| Err(GatewayError::NoImage));
        let mut p = deck_ready(g).await;

        let err = p.regenerate_slide_image(2).await.unwrap_err();
        assert!(!err.is_fatal());
        let slide = &p.deck().unwrap().slides[2];
        assert!(slide.image.is_none());
        assert!(!slide.image_loading);
        assert_eq!(p.stage(), Stage::DeckReady);
    }

    #[tokio::test]
    async fn image_success_is_stored() {
        let mut g = happy_gateway();
        g.expect_synthesize_image()
            .withf(|title: &str, points: &[StyledPoint]| title == "Violations" && points.len() == 1)
            .returning(|_, _| Ok("data:image/png;base64,AAAA".into()));
        let mut p = deck_ready(g).await;

        p.regenerate_slide_image(1).await.unwrap();
        let slide = &p.deck().unwrap().slides[1];
        assert_eq!(slide.image.as_deref(), Some("data:image/png;base64,AAAA"));
        assert!(!slide.image_loading);
    }

    #[tokio::test]
    async fn style_update_is_clamped_and_idempotent() {
        let mut p = deck_ready(happy_gateway()).await;
        let patch = SlideStylePatch {
            title_font_size: Some(40.0),
            body_font_size: Some(19.0),
            ..Default::default()
        };
        let once = p.update_slide_style(1, &patch).unwrap().clone();
        assert_eq!(once.title_font_size, 32.0);
        let twice = p.update_slide_style(1, &patch).unwrap().clone();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn deck_operations_require_deck_ready() {
        let mut g = MockGateway::new();
        g.expect_synthesize_image().never();
        let mut p = Pipeline::new(g);
        assert!(matches!(
            p.regenerate_slide_image(0).await,
            Err(PipelineError::InvalidStage { .. })
        ));
        assert!(matches!(
            p.update_slide_style(0, &SlideStylePatch::default()),
            Err(PipelineError::InvalidStage { .. })
        ));
    }
}
