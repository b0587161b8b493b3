//! Design suggestion engine: turns free-text style preferences into design
//! concepts and refines a concept from feedback.
//!
//! Generation is combinatorial over (theme, palette, placement). The
//! `creativity` knob decides how many variants of each axis are sampled:
//! at 0.0 only the requested themes with their first palette and preferred
//! placement are used; at 1.0 related themes, alternative palettes and
//! every placement candidate are mixed in. All randomness comes from one
//! seedable RNG owned by the engine.

use std::sync::{LazyLock, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use stylebot_core::types::{DesignSize, DesignSuggestion, Placement, PrintMethod, Theme};

// =============================================================================
// Design tables
// =============================================================================

fn theme_keywords(theme: Theme) -> &'static str {
    match theme {
        Theme::Nature => {
            r"nature|natural|organic|forests?|trees?|lea(?:f|ves)|flowers?|floral|botanical|mountains?|oceans?|waves?|animals?|wildlife|outdoors?"
        }
        Theme::Geometric => {
            r"geometric|geometry|triangles?|hexagons?|diamonds?|polygons?|shapes|chevrons?|grid|tessellation"
        }
        Theme::Cyberpunk => {
            r"cyberpunk|cyber|neon|futuristic|sci-?fi|glitch|circuits?|dystopian|synthwave"
        }
        Theme::Abstract => r"abstract|splatters?|brush\s*strokes?|colou?r\s+blocks?|gradients?|surreal",
        Theme::StreetArt => {
            r"street\s*-?art|streetwear|graffiti|urban|spray\s*paint|stencils?|tags?"
        }
        Theme::Vintage => {
            r"vintage|retro|old[\s-]school|nostalgic|throwback|art\s+deco|[5-9]0s|classic"
        }
        Theme::Minimalist => r"minimalist|minimalism",
        Theme::Japanese => r"japanese|japan|cherry\s+blossoms?|sakura|koi|kanji|ukiyo-?e|samurai",
        Theme::Space => {
            r"space|galax(?:y|ies)|stars?|planets?|cosmic|cosmos|astronauts?|rockets?|moon|celestial|constellations?"
        }
        Theme::Modern => r"modern|contemporary|sleek|typography|typographic",
    }
}

fn motifs(theme: Theme) -> &'static [&'static str] {
    match theme {
        Theme::Nature => &[
            "mountain silhouettes",
            "layered leaf patterns",
            "wildflower sprigs",
            "a forest treeline",
        ],
        Theme::Geometric => &[
            "interlocking triangles",
            "a hexagon grid",
            "chevron bands",
            "concentric diamonds",
        ],
        Theme::Cyberpunk => &[
            "circuit-board traces",
            "a neon city skyline",
            "digital glitch bars",
            "a holographic grid",
        ],
        Theme::Abstract => &[
            "sweeping brush strokes",
            "paint splatters",
            "overlapping colour blocks",
            "flowing gradients",
        ],
        Theme::StreetArt => &[
            "a graffiti tag",
            "spray-paint stencils",
            "an urban collage",
            "drip lettering",
        ],
        Theme::Vintage => &[
            "retro sunset stripes",
            "an art deco frame",
            "a faded varsity badge",
            "classic script lettering",
        ],
        Theme::Minimalist => &[
            "a single-line drawing",
            "a small icon",
            "a clean wordmark",
            "a negative-space shape",
        ],
        Theme::Japanese => &[
            "a great wave",
            "cherry blossoms",
            "a koi fish",
            "rising sun rays",
        ],
        Theme::Space => &[
            "ringed planets",
            "a constellation map",
            "an astronaut silhouette",
            "a galaxy swirl",
        ],
        Theme::Modern => &[
            "bold typography",
            "clean intersecting lines",
            "a minimal graphic mark",
            "layered flat shapes",
        ],
    }
}

fn palettes(theme: Theme) -> &'static [&'static [&'static str]] {
    match theme {
        Theme::Nature => &[
            &["forest green", "tan", "sky blue"],
            &["olive", "rust", "cream"],
            &["sage", "brown", "sandy beige"],
        ],
        Theme::Geometric => &[
            &["black", "white", "gold"],
            &["navy", "coral", "white"],
            &["teal", "mustard", "charcoal"],
        ],
        Theme::Cyberpunk => &[
            &["electric blue", "hot pink", "black"],
            &["lime green", "purple", "charcoal"],
            &["cyan", "magenta", "yellow"],
        ],
        Theme::Abstract => &[
            &["red", "orange", "purple"],
            &["turquoise", "pink", "yellow"],
            &["indigo", "peach", "white"],
        ],
        Theme::StreetArt => &[
            &["red", "black", "white"],
            &["lime green", "orange", "black"],
            &["hot pink", "yellow", "blue"],
        ],
        Theme::Vintage => &[
            &["burnt orange", "mustard", "brown"],
            &["burgundy", "cream", "forest green"],
            &["teal", "coral", "cream"],
        ],
        Theme::Minimalist => &[&["black", "white"], &["gray", "white"], &["beige", "black"]],
        Theme::Japanese => &[
            &["red", "white", "black"],
            &["indigo", "white"],
            &["pink", "charcoal", "white"],
        ],
        Theme::Space => &[
            &["navy", "silver", "purple"],
            &["black", "white", "gold"],
            &["deep purple", "teal", "white"],
        ],
        Theme::Modern => &[
            &["black", "white", "red"],
            &["charcoal", "white", "electric blue"],
            &["navy", "white", "gray"],
        ],
    }
}

fn theme_detail(theme: Theme) -> &'static str {
    match theme {
        Theme::Nature => "drawn from the natural world",
        Theme::Geometric => "with clean, mathematical precision",
        Theme::Cyberpunk => "with a neon-lit, futuristic edge",
        Theme::Abstract => "as a free, non-representational composition",
        Theme::StreetArt => "with raw urban energy",
        Theme::Vintage => "with classic, timeless appeal",
        Theme::Minimalist => "kept deliberately sparse",
        Theme::Japanese => "with elegant Eastern influences",
        Theme::Space => "with a cosmic sense of scale",
        Theme::Modern => "with a contemporary, sleek finish",
    }
}

const PALETTES_PER_THEME: usize = 3;

const VIBRANT: &[&str] = &["red", "orange", "yellow", "pink", "purple", "turquoise"];
const EARTH: &[&str] = &["brown", "forest green", "tan", "rust", "olive"];
const PASTEL: &[&str] = &["light pink", "lavender", "mint green"];

const TRENDING_THEMES: [Theme; 5] = [
    Theme::Minimalist,
    Theme::Nature,
    Theme::Geometric,
    Theme::Vintage,
    Theme::Space,
];

/// Colour names recognised in free text. Multi-word names come first so the
/// alternation prefers them.
const COLOR_NAMES: &[&str] = &[
    "forest green",
    "lime green",
    "mint green",
    "electric blue",
    "baby blue",
    "sky blue",
    "hot pink",
    "light pink",
    "burnt orange",
    "deep purple",
    "red",
    "orange",
    "yellow",
    "green",
    "blue",
    "purple",
    "pink",
    "black",
    "white",
    "gray",
    "grey",
    "navy",
    "teal",
    "brown",
    "beige",
    "cream",
    "gold",
    "silver",
    "maroon",
    "burgundy",
    "olive",
    "coral",
    "turquoise",
    "lavender",
    "peach",
    "tan",
    "rust",
    "charcoal",
    "indigo",
    "magenta",
    "cyan",
    "mustard",
    "sage",
];

// =============================================================================
// Compiled patterns
// =============================================================================

static THEME_PATTERNS: LazyLock<Vec<(Theme, Regex)>> = LazyLock::new(|| {
    Theme::ALL
        .iter()
        .map(|t| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", theme_keywords(*t)))
                .expect("Invalid theme regex");
            (*t, re)
        })
        .collect()
});

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = COLOR_NAMES.iter().map(|c| c.replace(' ', r"\s+")).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).expect("Invalid colour regex")
});

static SUBTLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:minimal|subtle|simple|small|understated|discreet|clean|tiny|delicate|quiet)\b")
        .expect("Invalid tone regex")
});

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:bold|statement|loud|striking|dramatic|big|large|huge|oversized|eye-catching)\b")
        .expect("Invalid tone regex")
});

static SHRINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:smaller|tinier|subtler|more\s+subtle|less\s+(?:big|large)|reduce|shrink|scale\s+(?:it\s+)?down)\b",
    )
    .expect("Invalid refinement regex")
});

static GROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:bigger|larger|bolder|statement|huge|more\s+prominent|enlarge|scale\s+(?:it\s+)?up)\b",
    )
    .expect("Invalid refinement regex")
});

static BRIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:brighter|vibrant|more\s+colou?rful|colou?rful|louder|punchier)\b")
        .expect("Invalid refinement regex")
});

static DARK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:darker|muted|earthy|earth\s+tones?|moodier)\b")
        .expect("Invalid refinement regex")
});

static PASTEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:pastels?|softer|lighter|gentler)\b").expect("Invalid refinement regex")
});

/// Explicit placement phrases, most specific first.
static PLACEMENT_PATTERNS: LazyLock<Vec<(Placement, Regex)>> = LazyLock::new(|| {
    let mk = |p: &str| Regex::new(p).expect("Invalid placement regex");
    vec![
        (Placement::LeftChest, mk(r"(?i)\b(?:left\s+(?:chest|breast)|pocket)\b")),
        (
            Placement::StatementBack,
            mk(r"(?i)\b(?:statement\s+back|(?:full|whole|entire)\s+back|across\s+the\s+back)\b"),
        ),
        (Placement::CenteredChest, mk(r"(?i)\b(?:chest|centered|centred)\b")),
        (Placement::Back, mk(r"(?i)\bback\b")),
        (Placement::LargeFront, mk(r"(?i)\bfront\b")),
    ]
});

static FEEDBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:make\s+it|change\s+(?:it|the)|move\s+it|put\s+it|instead|tweak|adjust|refine|what\s+about|smaller|bigger|larger|brighter|darker|softer|bolder|subtler|simpler|muted|pastels?)\b|(?:\boption\s*|#)\d\b|\b(?:first|second|third|last)\s+one\b|\bon\s+the\s+(?:chest|back|front|pocket)\b",
    )
    .expect("Invalid feedback regex")
});

static FRESH_REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:new|another|different|fresh|more)\s+(?:designs?|ideas?|concepts?|options?|suggestions?)\b|\bstart\s+over\b|\bsomething\s+(?:else|different)\b",
    )
    .expect("Invalid fresh-request regex")
});

// =============================================================================
// Preference parsing
// =============================================================================

/// How loud the customer wants the print to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boldness {
    Subtle,
    Balanced,
    Bold,
}

impl Boldness {
    /// Placement candidates, preferred first.
    pub fn placements(&self) -> &'static [Placement] {
        match self {
            Boldness::Subtle => &[Placement::LeftChest, Placement::CenteredChest],
            Boldness::Balanced => &[
                Placement::CenteredChest,
                Placement::LargeFront,
                Placement::Back,
            ],
            Boldness::Bold => &[
                Placement::LargeFront,
                Placement::StatementBack,
                Placement::Back,
            ],
        }
    }

    /// Print size for a placement at this boldness.
    pub fn size_for(&self, placement: Placement) -> DesignSize {
        let (min, max) = placement.size_range();
        match self {
            Boldness::Subtle => min,
            Boldness::Bold => max,
            Boldness::Balanced => match placement {
                Placement::LeftChest => DesignSize::Small,
                Placement::CenteredChest | Placement::Back => DesignSize::Medium,
                Placement::LargeFront | Placement::StatementBack => DesignSize::Large,
            },
        }
    }
}

/// What was understood from a preference message.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignPreferences {
    /// Matched themes, strongest first. Empty when nothing matched.
    pub themes: Vec<Theme>,
    pub boldness: Boldness,
    /// Explicit colours in order of mention, deduplicated.
    pub colors: Vec<String>,
    pub placement: Option<Placement>,
}

/// Parse themes, tone, colours and placement out of free text.
pub fn analyze_preferences(text: &str) -> DesignPreferences {
    let mut scored: Vec<(usize, Theme)> = THEME_PATTERNS
        .iter()
        .filter_map(|(theme, re)| {
            let hits = re.find_iter(text).count();
            (hits > 0).then_some((hits, *theme))
        })
        .collect();
    // Theme::ALL order is the secondary key; sort is stable.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let subtle = SUBTLE_RE.is_match(text);
    let bold = BOLD_RE.is_match(text);
    let boldness = match (subtle, bold) {
        (true, false) => Boldness::Subtle,
        (false, true) => Boldness::Bold,
        _ => Boldness::Balanced,
    };

    DesignPreferences {
        themes: scored.into_iter().map(|(_, t)| t).collect(),
        boldness,
        colors: extract_colors(text),
        placement: parse_placement(text),
    }
}

fn extract_colors(text: &str) -> Vec<String> {
    let mut colors: Vec<String> = Vec::new();
    for m in COLOR_RE.find_iter(text) {
        let name = m
            .as_str()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let name = if name == "grey" { "gray".to_string() } else { name };
        if !colors.contains(&name) {
            colors.push(name);
        }
    }
    colors
}

fn parse_placement(text: &str) -> Option<Placement> {
    PLACEMENT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(p, _)| *p)
}

/// Whether a message reads as feedback on the current suggestions rather
/// than a fresh request.
pub fn reads_as_feedback(text: &str) -> bool {
    !FRESH_REQUEST_RE.is_match(text) && FEEDBACK_RE.is_match(text)
}

/// 2-3 colours: explicit ones first, topped up from `fallback`.
fn build_palette(explicit: &[String], fallback: &[&str]) -> Vec<String> {
    let mut palette: Vec<String> = explicit.iter().take(3).cloned().collect();
    for c in fallback {
        if palette.len() >= 3 || (palette.len() >= 2 && !explicit.is_empty()) {
            break;
        }
        if !palette.iter().any(|p| p == c) {
            palette.push(c.to_string());
        }
    }
    palette
}

fn format_colors(colors: &[String]) -> String {
    match colors {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn describe(
    theme: Theme,
    motif: &str,
    colors: &[String],
    placement: Placement,
    size: DesignSize,
    print: PrintMethod,
) -> String {
    format!(
        "{} design featuring {} in {}, {} at {} size, {}. Best produced with {}.",
        capitalize(theme.label()),
        motif,
        format_colors(colors),
        placement.describe(),
        size,
        theme_detail(theme),
        print
    )
}

fn compose(
    theme: Theme,
    motif: &str,
    color_palette: Vec<String>,
    placement: Placement,
    size: DesignSize,
    parent: Option<Uuid>,
) -> DesignSuggestion {
    let size = size.clamp_to(placement);
    let print_method = PrintMethod::for_design(color_palette.len(), size);
    let description = describe(theme, motif, &color_palette, placement, size, print_method);
    DesignSuggestion {
        id: Uuid::new_v4(),
        theme,
        motif: motif.to_string(),
        color_palette,
        placement,
        size,
        print_method,
        description,
        parent_suggestion_id: parent,
    }
}

/// `1 + round(creativity * (cap - 1))`, bounded by what exists.
fn variant_count(creativity: f64, cap: usize, available: usize) -> usize {
    if available == 0 || cap == 0 {
        return 0;
    }
    let extra = (creativity.clamp(0.0, 1.0) * (cap - 1) as f64).round() as usize;
    (1 + extra).min(cap).min(available)
}

/// Decode the `j`-th variant of one theme into (motif, palette, placement)
/// indices. The mapping is a bijection over `m * p * q`. With `spread` set,
/// palette and placement advance together with the motif; otherwise the
/// motif varies first, then the palette, then the placement.
fn variant_indices(j: usize, m: usize, p: usize, q: usize, spread: bool) -> (usize, usize, usize) {
    let a = j % m;
    let b = (j / m) % p;
    let c = (j / (m * p)) % q;
    if spread {
        (a, (a + b) % p, (a + b + c) % q)
    } else {
        (a, b, c)
    }
}

// =============================================================================
// DesignSuggestionEngine
// =============================================================================

/// Generates and refines design suggestions.
///
/// Holds the only RNG used for design choices; seed it for reproducible
/// output.
pub struct DesignSuggestionEngine {
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for DesignSuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignSuggestionEngine").finish_non_exhaustive()
    }
}

impl DesignSuggestionEngine {
    /// `Some(seed)` makes every choice reproducible; `None` seeds from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Produce exactly `min(max_suggestions, available combinations)`
    /// suggestions. Unparseable text falls back to the `modern` theme.
    ///
    /// Creativity sets how many themes the batch spreads over and whether
    /// palette and placement move together with the motif. Slots beyond
    /// what the chosen themes offer are filled from related themes.
    pub fn generate(
        &self,
        preference_text: &str,
        max_suggestions: usize,
        creativity: f64,
    ) -> Vec<DesignSuggestion> {
        if max_suggestions == 0 {
            return Vec::new();
        }
        let prefs = analyze_preferences(preference_text);
        let spread = creativity >= 0.5;

        // Placements are shared by every theme.
        let candidates: Vec<Placement> = match prefs.placement {
            Some(explicit) => vec![explicit],
            None => prefs.boldness.placements().to_vec(),
        };
        let q = candidates.len();
        let palettes_per_theme = if prefs.colors.is_empty() {
            PALETTES_PER_THEME
        } else {
            1
        };
        let capacity = |theme: Theme| motifs(theme).len() * palettes_per_theme * q;

        self.with_rng(|rng| {
            // Themes: every matched theme (up to the cap), topped up with
            // related themes according to creativity, then until the batch
            // can be filled.
            let mut themes: Vec<Theme> = prefs.themes.iter().copied().take(max_suggestions).collect();
            if themes.is_empty() {
                themes.push(Theme::Modern);
            }
            let mut related: Vec<Theme> = Theme::ALL
                .iter()
                .copied()
                .filter(|t| !themes.contains(t))
                .collect();
            related.shuffle(rng);
            let mut related = related.into_iter();

            let wanted = variant_count(creativity, max_suggestions, Theme::ALL.len()).max(themes.len());
            while themes.len() < wanted {
                match related.next() {
                    Some(theme) => themes.push(theme),
                    None => break,
                }
            }
            while themes.iter().map(|t| capacity(*t)).sum::<usize>() < max_suggestions {
                match related.next() {
                    Some(theme) => themes.push(theme),
                    None => break,
                }
            }

            let palette_sets: Vec<Vec<Vec<String>>> = themes
                .iter()
                .map(|theme| {
                    if prefs.colors.is_empty() {
                        let mut options: Vec<&[&str]> = palettes(*theme).to_vec();
                        options.shuffle(rng);
                        options
                            .into_iter()
                            .map(|p| p.iter().map(|c| c.to_string()).collect())
                            .collect()
                    } else {
                        vec![build_palette(&prefs.colors, palettes(*theme)[0])]
                    }
                })
                .collect();
            let motif_offsets: Vec<usize> = themes
                .iter()
                .map(|theme| rng.random_range(0..motifs(*theme).len()))
                .collect();

            let available: usize = themes.iter().map(|t| capacity(*t)).sum();
            let count = max_suggestions.min(available);
            debug!(
                themes = themes.len(),
                palettes = palettes_per_theme,
                placements = q,
                count,
                "Generating design suggestions"
            );

            // Round-robin over themes; the j-th variant of a theme is a
            // distinct (motif, palette, placement) triple.
            let mut out = Vec::with_capacity(count);
            let mut j = 0;
            while out.len() < count {
                for (ti, theme) in themes.iter().enumerate() {
                    if out.len() == count {
                        break;
                    }
                    if j >= capacity(*theme) {
                        continue;
                    }
                    let theme_motifs = motifs(*theme);
                    let (mi, pi, qi) = variant_indices(j, theme_motifs.len(), palettes_per_theme, q, spread);
                    let motif = theme_motifs[(motif_offsets[ti] + mi) % theme_motifs.len()];
                    let placement = candidates[(qi + ti) % q];
                    out.push(compose(
                        *theme,
                        motif,
                        palette_sets[ti][pi].clone(),
                        placement,
                        prefs.boldness.size_for(placement),
                        None,
                    ));
                }
                j += 1;
            }
            out
        })
    }

    /// Adjust one suggestion according to feedback.
    ///
    /// Theme and palette change only when the feedback names a theme, a
    /// colour, or a colour tone (brighter, darker, pastel). Size directives
    /// move one step and drift placement toward or away from the chest unless
    /// a placement is named; size is then clamped to what the placement fits.
    pub fn refine(&self, suggestion: &DesignSuggestion, feedback: &str) -> DesignSuggestion {
        let prefs = analyze_preferences(feedback);
        let shrink = SHRINK_RE.is_match(feedback);
        let grow = GROW_RE.is_match(feedback);

        let mut placement = suggestion.placement;
        let mut size = suggestion.size;
        if shrink && !grow {
            size = size.smaller();
            placement = toward_chest(placement);
        } else if grow && !shrink {
            size = size.larger();
            placement = away_from_chest(placement);
        }
        if let Some(explicit) = prefs.placement {
            placement = explicit;
        }

        self.with_rng(|rng| {
            let (theme, motif) = match prefs.themes.first() {
                Some(theme) if *theme != suggestion.theme => {
                    let options = motifs(*theme);
                    (*theme, options[rng.random_range(0..options.len())].to_string())
                }
                _ => (suggestion.theme, suggestion.motif.clone()),
            };

            let colors = if !prefs.colors.is_empty() {
                build_palette(&prefs.colors, palettes(theme)[0])
            } else if BRIGHT_RE.is_match(feedback) {
                sample_colors(VIBRANT, rng)
            } else if DARK_RE.is_match(feedback) {
                sample_colors(EARTH, rng)
            } else if PASTEL_RE.is_match(feedback) {
                PASTEL.iter().map(|c| c.to_string()).collect()
            } else {
                suggestion.color_palette.clone()
            };

            compose(theme, &motif, colors, placement, size, Some(suggestion.id))
        })
    }

    /// One suggestion per trending theme, up to `count` (at most five).
    pub fn trending(&self, count: usize) -> Vec<DesignSuggestion> {
        self.with_rng(|rng| {
            TRENDING_THEMES
                .iter()
                .take(count)
                .map(|theme| {
                    let options = palettes(*theme);
                    let palette = options[rng.random_range(0..options.len())]
                        .iter()
                        .map(|c| c.to_string())
                        .collect();
                    let theme_motifs = motifs(*theme);
                    let motif = theme_motifs[rng.random_range(0..theme_motifs.len())];
                    compose(
                        *theme,
                        motif,
                        palette,
                        Placement::CenteredChest,
                        DesignSize::Medium,
                        None,
                    )
                })
                .collect()
        })
    }
}

fn sample_colors(pool: &[&str], rng: &mut StdRng) -> Vec<String> {
    let mut colors: Vec<&str> = pool.to_vec();
    colors.shuffle(rng);
    colors.into_iter().take(3).map(|c| c.to_string()).collect()
}

fn toward_chest(placement: Placement) -> Placement {
    match placement {
        Placement::LargeFront => Placement::CenteredChest,
        Placement::CenteredChest | Placement::LeftChest => Placement::LeftChest,
        Placement::StatementBack | Placement::Back => Placement::Back,
    }
}

fn away_from_chest(placement: Placement) -> Placement {
    match placement {
        Placement::LeftChest => Placement::CenteredChest,
        Placement::CenteredChest | Placement::LargeFront => Placement::LargeFront,
        Placement::Back | Placement::StatementBack => Placement::StatementBack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DesignSuggestionEngine {
        DesignSuggestionEngine::new(Some(42))
    }

    fn assert_well_formed(s: &DesignSuggestion) {
        assert!(!s.motif.is_empty());
        assert!(
            (2..=3).contains(&s.color_palette.len()),
            "palette {:?}",
            s.color_palette
        );
        assert!(!s.description.is_empty());
        let (min, max) = s.placement.size_range();
        assert!(s.size >= min && s.size <= max);
        assert_eq!(
            s.print_method,
            PrintMethod::for_design(s.color_palette.len(), s.size)
        );
    }

    #[test]
    fn test_analyze_themes_and_tone() {
        let prefs = analyze_preferences("minimalist geometric pattern");
        assert!(prefs.themes.contains(&Theme::Geometric));
        assert!(prefs.themes.contains(&Theme::Minimalist));
        assert_eq!(prefs.boldness, Boldness::Balanced);

        let prefs = analyze_preferences("something subtle with cherry blossoms");
        assert_eq!(prefs.themes, vec![Theme::Japanese]);
        assert_eq!(prefs.boldness, Boldness::Subtle);

        let prefs = analyze_preferences("a bold statement galaxy print");
        assert_eq!(prefs.themes, vec![Theme::Space]);
        assert_eq!(prefs.boldness, Boldness::Bold);
    }

    #[test]
    fn test_analyze_ranks_by_hits() {
        let prefs = analyze_preferences("stars, planets and a rocket with one triangle");
        assert_eq!(prefs.themes[0], Theme::Space);
        assert_eq!(prefs.themes[1], Theme::Geometric);
    }

    #[test]
    fn test_analyze_colours() {
        let prefs = analyze_preferences("Forest Green and grey, maybe some hot pink");
        assert_eq!(prefs.colors, vec!["forest green", "gray", "hot pink"]);
    }

    #[test]
    fn test_parse_placement_precedence() {
        assert_eq!(parse_placement("on the left chest"), Some(Placement::LeftChest));
        assert_eq!(parse_placement("on the chest"), Some(Placement::CenteredChest));
        assert_eq!(parse_placement("full back please"), Some(Placement::StatementBack));
        assert_eq!(parse_placement("on the back"), Some(Placement::Back));
        assert_eq!(parse_placement("across the front"), Some(Placement::LargeFront));
        assert_eq!(parse_placement("no idea"), None);
    }

    #[test]
    fn test_generate_count_contract() {
        let engine = engine();
        let inputs = [
            "geometric shapes",
            "asdf qwerty",
            "a red vintage print on the back",
            "navy and white nature design on the left chest",
            "something subtle and japanese",
        ];
        for text in inputs {
            for max in 1..=6 {
                for creativity in [0.0, 0.3, 0.5, 0.8, 1.0] {
                    let suggestions = engine.generate(text, max, creativity);
                    assert_eq!(
                        suggestions.len(),
                        max,
                        "{:?} max={} creativity={}",
                        text,
                        max,
                        creativity
                    );
                    suggestions.iter().for_each(assert_well_formed);
                }
            }
        }
    }

    #[test]
    fn test_generate_caps_at_available_combinations() {
        // Explicit colour and placement leave one palette and one placement
        // per theme, so each theme offers only its motifs.
        let suggestions = engine().generate("a red vintage print on the back", 100, 0.0);
        let per_theme = motifs(Theme::Vintage).len();
        assert_eq!(suggestions.len(), per_theme * Theme::ALL.len());
        assert!(suggestions.iter().all(|s| s.placement == Placement::Back));
        assert!(suggestions.iter().all(|s| s.color_palette[0] == "red"));
    }

    #[test]
    fn test_explicit_colour_and_placement_still_fill_batch() {
        let suggestions = engine().generate("a red vintage print on the back", 6, 0.5);
        assert_eq!(suggestions.len(), 6);
        assert!(suggestions.iter().any(|s| s.theme == Theme::Vintage));
        assert!(suggestions.iter().all(|s| s.placement == Placement::Back));
    }

    #[test]
    fn test_generate_exact_count_with_creativity() {
        let engine = engine();
        let suggestions = engine.generate("geometric shapes", 3, 0.8);
        assert_eq!(suggestions.len(), 3);
    }

    #[test]
    fn test_zero_creativity_stays_on_requested_theme() {
        let engine = engine();
        let suggestions = engine.generate("geometric shapes", 3, 0.0);
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.theme == Theme::Geometric));
        assert_eq!(suggestions[0].placement, Placement::CenteredChest);
        let mut motifs: Vec<&str> = suggestions.iter().map(|s| s.motif.as_str()).collect();
        motifs.sort();
        motifs.dedup();
        assert_eq!(motifs.len(), 3);
    }

    #[test]
    fn test_higher_creativity_more_distinct_themes() {
        let engine = engine();
        let low = engine.generate("nature", 5, 0.0);
        let high = engine.generate("nature", 5, 1.0);
        let distinct = |v: &[DesignSuggestion]| {
            let mut t: Vec<Theme> = v.iter().map(|s| s.theme).collect();
            t.sort();
            t.dedup();
            t.len()
        };
        assert!(distinct(&high) > distinct(&low));
        assert!(high.iter().any(|s| s.theme == Theme::Nature));
    }

    #[test]
    fn test_minimalist_geometric_includes_geometric() {
        let suggestions = engine().generate("minimalist geometric pattern", 3, 0.8);
        assert!(suggestions.iter().any(|s| s.theme == Theme::Geometric));
        assert!(suggestions.iter().any(|s| s.theme == Theme::Minimalist));
    }

    #[test]
    fn test_malformed_text_defaults_to_modern() {
        let suggestions = engine().generate("asdf qwerty", 3, 0.0);
        assert_eq!(suggestions.len(), 3);
        for s in &suggestions {
            assert_eq!(s.theme, Theme::Modern);
            assert_well_formed(s);
        }
    }

    #[test]
    fn test_explicit_colours_used() {
        let suggestions = engine().generate("a red and black vintage design", 3, 0.8);
        for s in &suggestions {
            assert_eq!(s.color_palette[0], "red");
            assert_eq!(s.color_palette[1], "black");
        }
    }

    #[test]
    fn test_subtle_prefers_chest() {
        let suggestions = engine().generate("something subtle and japanese", 2, 1.0);
        assert!(suggestions.iter().all(|s| s.placement.is_chest()));
    }

    #[test]
    fn test_suggestions_are_distinct() {
        for creativity in [0.0, 1.0] {
            let suggestions = engine().generate("space", 12, creativity);
            assert_eq!(suggestions.len(), 12);
            for (i, a) in suggestions.iter().enumerate() {
                for b in &suggestions[i + 1..] {
                    assert!(
                        a.theme != b.theme
                            || a.motif != b.motif
                            || a.color_palette != b.color_palette
                            || a.placement != b.placement
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = DesignSuggestionEngine::new(Some(7)).generate("retro", 3, 1.0);
        let b = DesignSuggestionEngine::new(Some(7)).generate("retro", 3, 1.0);
        let strip = |v: Vec<DesignSuggestion>| -> Vec<(Theme, String, Vec<String>, Placement)> {
            v.into_iter()
                .map(|s| (s.theme, s.motif, s.color_palette, s.placement))
                .collect()
        };
        assert_eq!(strip(a), strip(b));
    }

    #[test]
    fn test_zero_max_is_empty() {
        assert!(engine().generate("space", 0, 0.5).is_empty());
    }

    #[test]
    fn test_refine_smaller_on_chest_keeps_theme_and_palette() {
        let original = compose(
            Theme::StreetArt,
            "a graffiti tag",
            vec!["red".into(), "black".into(), "white".into()],
            Placement::LargeFront,
            DesignSize::Large,
            None,
        );
        let refined = engine().refine(&original, "make it smaller and on the chest");
        assert_eq!(refined.theme, Theme::StreetArt);
        assert_eq!(refined.color_palette, original.color_palette);
        assert_eq!(refined.motif, original.motif);
        assert!(refined.placement.is_chest());
        assert!(refined.size < original.size);
        assert_eq!(refined.parent_suggestion_id, Some(original.id));
        assert_ne!(refined.id, original.id);
        assert_well_formed(&refined);
    }

    #[test]
    fn test_refine_smaller_without_placement_moves_toward_chest() {
        let original = compose(
            Theme::Space,
            "ringed planets",
            vec!["navy".into(), "silver".into()],
            Placement::LargeFront,
            DesignSize::Large,
            None,
        );
        let refined = engine().refine(&original, "smaller please");
        assert_eq!(refined.placement, Placement::CenteredChest);
        assert_eq!(refined.size, DesignSize::Medium);
    }

    #[test]
    fn test_refine_bigger_moves_away_from_chest() {
        let original = compose(
            Theme::Nature,
            "wildflower sprigs",
            vec!["olive".into(), "rust".into(), "cream".into()],
            Placement::CenteredChest,
            DesignSize::Medium,
            None,
        );
        let refined = engine().refine(&original, "go bigger");
        assert_eq!(refined.placement, Placement::LargeFront);
        assert_eq!(refined.size, DesignSize::Large);
        assert_eq!(refined.theme, Theme::Nature);
    }

    #[test]
    fn test_refine_at_smallest_stays_clamped() {
        let original = compose(
            Theme::Minimalist,
            "a small icon",
            vec!["black".into(), "white".into()],
            Placement::LeftChest,
            DesignSize::Small,
            None,
        );
        let refined = engine().refine(&original, "even smaller");
        assert_eq!(refined.placement, Placement::LeftChest);
        assert_eq!(refined.size, DesignSize::Small);
    }

    #[test]
    fn test_refine_tone_words_change_palette_only() {
        let original = compose(
            Theme::Geometric,
            "a hexagon grid",
            vec!["black".into(), "white".into(), "gold".into()],
            Placement::Back,
            DesignSize::Medium,
            None,
        );
        let engine = engine();

        let brighter = engine.refine(&original, "brighter colours please");
        assert!(brighter.color_palette.iter().all(|c| VIBRANT.contains(&c.as_str())));
        assert_eq!(brighter.placement, original.placement);
        assert_eq!(brighter.size, original.size);
        assert_eq!(brighter.theme, original.theme);

        let darker = engine.refine(&original, "more muted");
        assert!(darker.color_palette.iter().all(|c| EARTH.contains(&c.as_str())));

        let pastel = engine.refine(&original, "pastel please");
        assert_eq!(pastel.color_palette, vec!["light pink", "lavender", "mint green"]);
    }

    #[test]
    fn test_refine_explicit_theme_and_colour() {
        let original = compose(
            Theme::Modern,
            "bold typography",
            vec!["black".into(), "white".into(), "red".into()],
            Placement::CenteredChest,
            DesignSize::Medium,
            None,
        );
        let refined = engine().refine(&original, "can you do it in navy with a space vibe");
        assert_eq!(refined.theme, Theme::Space);
        assert!(motifs(Theme::Space).contains(&refined.motif.as_str()));
        assert_eq!(refined.color_palette[0], "navy");
        assert_eq!(refined.placement, Placement::CenteredChest);
    }

    #[test]
    fn test_refine_unrelated_feedback_copies_attributes() {
        let original = compose(
            Theme::Vintage,
            "an art deco frame",
            vec!["burgundy".into(), "cream".into()],
            Placement::Back,
            DesignSize::Medium,
            None,
        );
        let refined = engine().refine(&original, "hmm, I'm not sure");
        assert_eq!(refined.theme, original.theme);
        assert_eq!(refined.motif, original.motif);
        assert_eq!(refined.color_palette, original.color_palette);
        assert_eq!(refined.placement, original.placement);
        assert_eq!(refined.size, original.size);
    }

    #[test]
    fn test_trending() {
        let trending = engine().trending(3);
        let themes: Vec<Theme> = trending.iter().map(|s| s.theme).collect();
        assert_eq!(themes, vec![Theme::Minimalist, Theme::Nature, Theme::Geometric]);
        trending.iter().for_each(assert_well_formed);
        assert_eq!(engine().trending(10).len(), 5);
    }

    #[test]
    fn test_reads_as_feedback() {
        assert!(reads_as_feedback("make it smaller and on the chest"));
        assert!(reads_as_feedback("I like option 2, but brighter"));
        assert!(reads_as_feedback("the second one in navy instead"));
        assert!(!reads_as_feedback("I want a geometric design"));
        assert!(!reads_as_feedback("show me some new designs, smaller ones"));
    }

    #[test]
    fn test_format_colors() {
        assert_eq!(format_colors(&["red".into()]), "red");
        assert_eq!(format_colors(&["red".into(), "blue".into()]), "red and blue");
        assert_eq!(
            format_colors(&["red".into(), "blue".into(), "gold".into()]),
            "red, blue, and gold"
        );
    }

    #[test]
    fn test_description_mentions_attributes() {
        let s = compose(
            Theme::StreetArt,
            "drip lettering",
            vec!["red".into(), "black".into()],
            Placement::Back,
            DesignSize::Medium,
            None,
        );
        assert!(s.description.starts_with("Street art design featuring drip lettering"));
        assert!(s.description.contains("red and black"));
        assert!(s.description.contains("on the back"));
        assert!(s.description.contains("medium"));
    }
}
