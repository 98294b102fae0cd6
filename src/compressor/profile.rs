use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Ghostscript `PDFSETTINGS` presets, from smallest output to highest fidelity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QualityProfile {
    /// 72 dpi images, smallest output
    Screen,
    /// 150 dpi images
    #[default]
    Ebook,
    /// 300 dpi images
    Printer,
    /// 300 dpi, colour preserving
    Prepress,
}

impl QualityProfile {
    /// Parses a client-supplied quality value. A missing value falls back to
    /// the default profile; anything unrecognized is rejected.
    pub fn from_field(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("") => Some(Self::default()),
            Some(v) => v.to_ascii_lowercase().parse().ok(),
        }
    }

    pub fn pdf_settings(&self) -> String {
        format!("/{}", self)
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![format!("-dPDFSETTINGS={}", self.pdf_settings())]
    }
}
