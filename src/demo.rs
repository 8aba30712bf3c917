//! Built-in sample analysis of the Irish DPC's €405M Instagram decision.
//!
//! Lets the exporters and the CLI run end to end without a provider key
//! (`caselens --demo`).

use crate::model::{Deck, DocumentSection, Slide, SlideDraft, SlideKind, StyledPoint};

/// Public decision the sample is based on.
pub const DEMO_SOURCE_URL: &str = "https://www.dataprotection.ie/sites/default/files/uploads/2023-01/Final%20Decision%20VIEC%20IN-21-2-5%20121222_Redacted.pdf";

pub const DEMO_TITLE: &str = "Meta: The €405M Instagram Inquiry";

const SUMMARY: &str = "# The Incident
In a decision concluded in **January 2023**, the Irish Data Protection Commission (DPC) fined Meta Platforms Ireland Limited **€405 million** over the processing of personal data of Instagram users aged 13 to 17 between 2018 and 2020.

## Core Violations
1. **Business account exposure**: children could switch to business accounts, which published their phone number or email address.
2. **Public by default**: accounts of users under 18 were public at registration unless the user opted out.

## Strategic Mitigation
- **Age verification** at every entry point.
- **Most restrictive settings** for vulnerable users by default.
- **Data minimisation**: do not collect contact details the core service does not need.";

const TIMELINE: &str = "| Date | Stakeholder | Event |
|:---|:---|:---|
| **22 Sep 2020** | **Irish DPC** | Inquiry IN-21-2-5 opened. |
| **03 Dec 2021** | **Meta Ireland** | Defence submitted: business accounts were requested by users for analytics. |
| **13 Jun 2022** | **EDPB** | Art. 65 dispute resolution after objections from other authorities. |
| **15 Sep 2022** | **Irish DPC** | Final decision adopted with the higher fine required by the EDPB. |
| **12 Dec 2022** | **DPC** | Redacted decision published. |";

const STRUGGLE: &str = "### Meta's defence: user choice
Meta argued that teenagers chose business accounts to reach analytics features and that publishing contact details was necessary to perform the contract for a commercial profile.

### The regulator's finding: an illusion of choice
1. **Capacity**: minors cannot weigh the long-term risk of publishing contact data.
2. **Nudging**: the interface steered children toward business accounts, breaching fairness under **Art. 5(1)(a)**.
3. **Art. 24**: the controller did not implement appropriate measures for a vulnerable group.";

const PM_STRATEGY: &str = "### Constraints for product teams
- **Age-gated account types**: disable the business account upgrade for verified users under 18.
- **Private onboarding**: 13 to 17 year olds start private; going public requires a risk notice and parental notification.
- **Just-in-time notices**: explain visibility with icons and plain language at the moment of sharing.

> **Expert Note**: a growth loop that depends on exposing children's data is a legal liability.";

const DPO_DEEP_DIVE: &str = "### Legal basis
Meta relied on **Art. 6(1)(b)** (contractual necessity) to publish contact data of children with business profiles. The DPC held that publication was not objectively necessary for the service.

### Articles breached
- **Art. 5(1)(c)**: data minimisation.
- **Art. 25**: data protection by design and by default.
- **Art. 32**: security of processing, given the risk of off-platform contact.
- **Art. 35**: the DPIA did not address risks specific to minors.";

/// The five-section sample dossier.
pub fn demo_sections() -> Vec<DocumentSection> {
    vec![
        DocumentSection::new("1. Executive Summary: The €405M Instagram Inquiry", SUMMARY),
        DocumentSection::new("2. Legal Timeline & Procedural Milestones", TIMELINE),
        DocumentSection::new("3. The Legal Struggle: Defense vs Findings", STRUGGLE),
        DocumentSection::new("4. PM Strategy & Design Constraints", PM_STRATEGY),
        DocumentSection::new("5. DPO Technical Deep Dive", DPO_DEEP_DIVE),
    ]
}

fn points(texts: &[&str]) -> Vec<StyledPoint> {
    texts.iter().map(|t| StyledPoint::plain(*t)).collect()
}

fn bold(text: &str) -> StyledPoint {
    StyledPoint {
        bold: Some(true),
        ..StyledPoint::plain(text)
    }
}

/// The sample deck, with default styles and no images.
pub fn demo_deck() -> Deck {
    let mut title = SlideDraft::new(
        SlideKind::Title,
        "Executive Synthesis",
        vec![bold(
            "Strategic analysis of the €405 million GDPR penalty for default privacy settings applied to minors on Instagram.",
        )],
    );
    title.company_name = Some("Meta Platforms".into());
    title.authority_name = Some("Irish DPC".into());

    let mut summary = SlideDraft::new(
        SlideKind::StrategicSummary,
        "Strategic Impact Overview",
        vec![
            StyledPoint {
                color: Some("#E11D48".into()),
                ..bold("What happened? A €405,000,000 fine for exposing the contact details and profiles of users aged 13 to 17.")
            },
            bold("Why did it happen? Business accounts published contact data and teen accounts were public by default."),
            bold("How do we avoid this? Private defaults, age-gated features and a DPIA that addresses minors."),
        ],
    );
    summary.authority_opinions = vec![
        "Privacy by default is an engineering requirement, not a design preference.".into(),
        "Fines must be dissuasive enough to make non-compliance unprofitable.".into(),
        "Children's data rights are an enforcement priority for the EDPB.".into(),
    ];

    let drafts = vec![
        title,
        SlideDraft::new(
            SlideKind::Toc,
            "Agenda",
            points(&[
                "Strategic impact",
                "Timeline of the inquiry",
                "Defence versus findings",
                "Product constraints",
                "DPO deep dive",
            ]),
        ),
        summary,
        SlideDraft::new(
            SlideKind::Content,
            "Timeline of the Inquiry",
            points(&[
                "Sep 2020: DPC opens inquiry IN-21-2-5",
                "Dec 2021: Meta files its defence",
                "Jun 2022: EDPB resolves the Art. 65 dispute",
                "Sep 2022: final decision adopted",
            ]),
        ),
        SlideDraft::new(
            SlideKind::Content,
            "Defence vs Findings",
            vec![
                StyledPoint {
                    is_heading: Some(true),
                    ..bold("Meta: business accounts were a user choice")
                },
                StyledPoint::plain("Contact details framed as a necessary business feature"),
                StyledPoint {
                    is_heading: Some(true),
                    ..bold("DPC: an illusion of choice")
                },
                StyledPoint::plain("Minors lack capacity to weigh the risk"),
                StyledPoint::plain("The interface nudged users toward exposure"),
            ],
        ),
        SlideDraft::new(
            SlideKind::PmTakeaway,
            "Product Takeaways",
            points(&[
                "Block business upgrades for users under 18",
                "Private by default for every teen account",
                "Just-in-time visibility notices",
            ]),
        ),
        SlideDraft::new(
            SlideKind::DpoTechnical,
            "Articles Breached",
            vec![
                StyledPoint {
                    color: Some("#DC2626".into()),
                    ..bold("Art. 6(1)(b) rejected as a legal basis")
                },
                StyledPoint::plain("Art. 5(1)(c) data minimisation"),
                StyledPoint::plain("Art. 25 privacy by design and by default"),
                StyledPoint::plain("Art. 32 security of processing"),
                StyledPoint::plain("Art. 35 DPIA deficiencies"),
            ],
        ),
    ];

    Deck {
        presentation_title: DEMO_TITLE.into(),
        subtitle: "Strategic Breakdown of the Irish DPC Children's Data Decision".into(),
        slides: drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| Slide::from_draft(draft, format!("slide-{i}-demo")))
            .collect(),
    }
}
