//! # Printer Configuration
//!
//! Paper presets for the ESC/POS printers the worker drives.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Printable |
//! |-------|--------------|-----------|
//! | 58mm ESC/POS | 384 | 48mm |
//! | 80mm ESC/POS | 576 | 72mm |
//!
//! ## Usage
//!
//! ```
//! use paper_trail::printer::PrinterConfig;
//!
//! let config = PrinterConfig::POS58;
//! assert_eq!(config.width_bytes(), 48);
//! ```

/// One paper preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Maximum print width in dots (pixels)
    pub width_dots: u16,

    /// Line-feeds sent after every job to clear the tear-off bar
    pub feed_lines: u8,
}

impl PrinterConfig {
    /// # Generic 58mm ESC/POS Printer
    ///
    /// The pocket Bluetooth printers sold under many brand names.
    pub const POS58: Self = Self {
        name: "58mm ESC/POS",
        width_dots: 384,
        feed_lines: 4,
    };

    /// # Generic 80mm ESC/POS Printer
    pub const POS80: Self = Self {
        name: "80mm ESC/POS",
        width_dots: 576,
        feed_lines: 4,
    };

    /// Look a model up by short name (`"58mm"`, `"80mm"`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "58mm" | "pos58" => Some(Self::POS58),
            "80mm" | "pos80" => Some(Self::POS80),
            _ => None,
        }
    }

    /// Print width in bytes
    #[inline]
    pub fn width_bytes(&self) -> u16 {
        self.width_dots.div_ceil(8)
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::POS58
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos58_dimensions() {
        let config = PrinterConfig::POS58;
        assert_eq!(config.width_dots, 384);
        assert_eq!(config.width_bytes(), 48);
        assert_eq!(config.feed_lines, 4);
    }

    #[test]
    fn test_pos80_dimensions() {
        assert_eq!(PrinterConfig::POS80.width_bytes(), 72);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(PrinterConfig::by_name("58mm"), Some(PrinterConfig::POS58));
        assert_eq!(PrinterConfig::by_name("POS80"), Some(PrinterConfig::POS80));
        assert_eq!(PrinterConfig::by_name("tsp650"), None);
    }

    #[test]
    fn test_default_is_pos58() {
        assert_eq!(PrinterConfig::default(), PrinterConfig::POS58);
    }
}
