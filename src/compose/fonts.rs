//! Font faces for meme text.
//!
//! Bold DejaVu faces are embedded so composition works on hosts without
//! system fonts. Each picker family maps to the closest embedded face; a
//! font directory can override any family with `{family}.ttf`.

use ab_glyph::FontArc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::overlay::FontFamily;

static SANS_CONDENSED_BOLD: OnceLock<FontArc> = OnceLock::new();
static SANS_BOLD: OnceLock<FontArc> = OnceLock::new();
static SERIF_BOLD: OnceLock<FontArc> = OnceLock::new();

fn sans_condensed_bold() -> &'static FontArc {
    SANS_CONDENSED_BOLD.get_or_init(|| {
        FontArc::try_from_slice(include_bytes!("fonts/DejaVuSansCondensed-Bold.ttf"))
            .expect("Failed to load DejaVu Sans Condensed Bold")
    })
}

fn sans_bold() -> &'static FontArc {
    SANS_BOLD.get_or_init(|| {
        FontArc::try_from_slice(include_bytes!("fonts/DejaVuSans-Bold.ttf"))
            .expect("Failed to load DejaVu Sans Bold")
    })
}

fn serif_bold() -> &'static FontArc {
    SERIF_BOLD.get_or_init(|| {
        FontArc::try_from_slice(include_bytes!("fonts/DejaVuSerif-Bold.ttf"))
            .expect("Failed to load DejaVu Serif Bold")
    })
}

/// Embedded face used for a family.
fn embedded(family: FontFamily) -> &'static FontArc {
    match family {
        FontFamily::Impact => sans_condensed_bold(),
        FontFamily::Arial | FontFamily::Helvetica | FontFamily::Comic => sans_bold(),
        FontFamily::Times | FontFamily::Kalam => serif_bold(),
    }
}

/// Resolves a [`FontFamily`] to a loaded face.
#[derive(Clone, Default)]
pub struct FontBook {
    overrides: HashMap<FontFamily, FontArc>,
}

impl FontBook {
    /// Only the embedded faces.
    pub fn embedded() -> Self {
        Self::default()
    }

    /// Embedded faces, replaced by `{dir}/{family}.ttf` where present.
    pub fn with_dir(dir: &Path) -> Self {
        let mut overrides = HashMap::new();
        for family in FontFamily::all() {
            let path = dir.join(format!("{}.ttf", family.name()));
            if !path.exists() {
                continue;
            }
            match std::fs::read(&path).map(FontArc::try_from_vec) {
                Ok(Ok(font)) => {
                    info!(target: "fonts", "Using {} for {}", path.display(), family);
                    overrides.insert(*family, font);
                }
                Ok(Err(e)) => warn!(target: "fonts", "Invalid font {}: {}", path.display(), e),
                Err(e) => warn!(target: "fonts", "Failed to read {}: {}", path.display(), e),
            }
        }
        Self { overrides }
    }

    pub fn font_for(&self, family: FontFamily) -> &FontArc {
        self.overrides.get(&family).unwrap_or_else(|| embedded(family))
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}
