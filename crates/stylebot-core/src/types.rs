use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Intent
// =============================================================================

/// What the user is trying to do in a single message.
///
/// Declaration order is the tie-break order used by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductInquiry,
    DesignConsultation,
    Faq,
    Shipping,
    Support,
    GeneralChat,
}

impl Intent {
    /// Every intent in tie-break order.
    pub const ALL: [Intent; 6] = [
        Intent::ProductInquiry,
        Intent::DesignConsultation,
        Intent::Faq,
        Intent::Shipping,
        Intent::Support,
        Intent::GeneralChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ProductInquiry => "product_inquiry",
            Intent::DesignConsultation => "design_consultation",
            Intent::Faq => "faq",
            Intent::Shipping => "shipping",
            Intent::Support => "support",
            Intent::GeneralChat => "general_chat",
        }
    }

    /// Whether this intent is answered from the knowledge base.
    pub fn uses_retrieval(&self) -> bool {
        matches!(
            self,
            Intent::ProductInquiry | Intent::Faq | Intent::Shipping | Intent::Support
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sessions and turns
// =============================================================================

/// Identifier for one conversation. Callers may supply their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session. Immutable once appended to memory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub intent: Intent,
    /// Source labels of the knowledge chunks used to answer, possibly empty.
    pub retrieved_sources: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            intent,
            retrieved_sources: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>, intent: Intent, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            intent,
            retrieved_sources: sources,
        }
    }
}

/// Per-session counters reported by `stats`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub duration_secs: i64,
    /// Number of user messages handled, including evicted ones.
    pub interaction_count: u64,
    /// Turns currently retained in history.
    pub retained_turns: usize,
    pub active_suggestions: usize,
}

// =============================================================================
// Knowledge
// =============================================================================

/// A raw document handed to the index builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub label: String,
    pub raw_text: String,
}

impl SourceDocument {
    pub fn new(label: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A retrieved chunk as handed to response generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub chunk_id: usize,
    pub source_label: String,
    pub text: String,
    pub score: f64,
}

/// A catalog record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub lead_time: String,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Design suggestions
// =============================================================================

/// Design theme taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Nature,
    Geometric,
    Cyberpunk,
    Abstract,
    StreetArt,
    Vintage,
    Minimalist,
    Japanese,
    Space,
    Modern,
}

impl Theme {
    pub const ALL: [Theme; 10] = [
        Theme::Nature,
        Theme::Geometric,
        Theme::Cyberpunk,
        Theme::Abstract,
        Theme::StreetArt,
        Theme::Vintage,
        Theme::Minimalist,
        Theme::Japanese,
        Theme::Space,
        Theme::Modern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Nature => "nature",
            Theme::Geometric => "geometric",
            Theme::Cyberpunk => "cyberpunk",
            Theme::Abstract => "abstract",
            Theme::StreetArt => "street_art",
            Theme::Vintage => "vintage",
            Theme::Minimalist => "minimalist",
            Theme::Japanese => "japanese",
            Theme::Space => "space",
            Theme::Modern => "modern",
        }
    }

    /// Human-readable name used in descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Theme::StreetArt => "street art",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a design sits on the garment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    CenteredChest,
    LeftChest,
    LargeFront,
    Back,
    StatementBack,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::CenteredChest => "centered-chest",
            Placement::LeftChest => "left-chest",
            Placement::LargeFront => "large-front",
            Placement::Back => "back",
            Placement::StatementBack => "statement-back",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Placement::CenteredChest => "centered on the front chest",
            Placement::LeftChest => "on the left chest",
            Placement::LargeFront => "across the entire front",
            Placement::Back => "on the back",
            Placement::StatementBack => "as a statement piece across the back",
        }
    }

    /// Smallest and largest print size that fits this placement.
    pub fn size_range(&self) -> (DesignSize, DesignSize) {
        match self {
            Placement::LeftChest => (DesignSize::Small, DesignSize::Small),
            Placement::CenteredChest => (DesignSize::Small, DesignSize::Medium),
            Placement::LargeFront => (DesignSize::Medium, DesignSize::Large),
            Placement::Back => (DesignSize::Medium, DesignSize::Large),
            Placement::StatementBack => (DesignSize::Large, DesignSize::Oversized),
        }
    }

    pub fn is_chest(&self) -> bool {
        matches!(self, Placement::CenteredChest | Placement::LeftChest)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Print size, ordered smallest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignSize {
    Small,
    Medium,
    Large,
    Oversized,
}

impl DesignSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesignSize::Small => "small",
            DesignSize::Medium => "medium",
            DesignSize::Large => "large",
            DesignSize::Oversized => "oversized",
        }
    }

    /// 1 for small through 4 for oversized.
    pub fn rank(&self) -> usize {
        match self {
            DesignSize::Small => 1,
            DesignSize::Medium => 2,
            DesignSize::Large => 3,
            DesignSize::Oversized => 4,
        }
    }

    /// One step smaller, saturating at `Small`.
    pub fn smaller(&self) -> Self {
        match self {
            DesignSize::Small | DesignSize::Medium => DesignSize::Small,
            DesignSize::Large => DesignSize::Medium,
            DesignSize::Oversized => DesignSize::Large,
        }
    }

    /// One step larger, saturating at `Oversized`.
    pub fn larger(&self) -> Self {
        match self {
            DesignSize::Small => DesignSize::Medium,
            DesignSize::Medium => DesignSize::Large,
            DesignSize::Large | DesignSize::Oversized => DesignSize::Oversized,
        }
    }

    pub fn clamp_to(self, placement: Placement) -> Self {
        let (min, max) = placement.size_range();
        self.clamp(min, max)
    }
}

impl fmt::Display for DesignSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintMethod {
    ScreenPrinting,
    DigitalPrinting,
}

impl PrintMethod {
    /// Many colours or a large print area favour digital printing.
    pub fn for_design(color_count: usize, size: DesignSize) -> Self {
        if color_count + size.rank() >= 5 {
            PrintMethod::DigitalPrinting
        } else {
            PrintMethod::ScreenPrinting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrintMethod::ScreenPrinting => "screen printing",
            PrintMethod::DigitalPrinting => "digital printing",
        }
    }
}

impl fmt::Display for PrintMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single design concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignSuggestion {
    pub id: Uuid,
    pub theme: Theme,
    /// The concrete element drawn from the theme, e.g. "mountain silhouettes".
    pub motif: String,
    /// Two or three named colours.
    pub color_palette: Vec<String>,
    pub placement: Placement,
    pub size: DesignSize,
    pub print_method: PrintMethod,
    pub description: String,
    pub parent_suggestion_id: Option<Uuid>,
}

// =============================================================================
// Chat reply
// =============================================================================

/// Everything the caller gets back for one message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub response_text: String,
    pub intent: Intent,
    pub source_labels: Vec<String>,
    pub suggestions: Vec<DesignSuggestion>,
}
