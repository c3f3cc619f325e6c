//! # Label Layout Engine
//!
//! Turns a [`LabelRequest`] into absolute [`DrawInstruction`]s for one label.
//!
//! ## Pipeline
//!
//! ```text
//! LabelRequest
//!   │  1. truncate buyer to max_chars (+ marker)
//!   │  2. reserve the price column (sentinel width + margin)
//!   │  3. wrap item, keep the first item_max_lines lines
//!   ▼
//! TextBlocks: buyer │ item… │ promo │ social
//!   │  4. measure every line (own ascent + descent)
//!   │  5. center the block vertically, clamp to min_top
//!   │  6. place each line: alignment, footer nudge/bias, bottom clamp
//!   ▼
//! DrawInstructions: buyer │ price? │ item… │ promo │ social
//! ```
//!
//! The pass is deterministic and never fails: every text measures to some
//! box, overflowing lines are drawn as they are, and lines that would run off
//! the bottom edge are pulled back up.
//!
//! ## Example
//!
//! ```
//! use miracle_label::config::LabelConfig;
//! use miracle_label::font::{FontSet, GlyphMetrics};
//! use miracle_label::layout::{layout, LabelRequest, LineKind};
//!
//! let config = LabelConfig::m221();
//! let fonts = FontSet::builtin(&config.fonts);
//! let request = LabelRequest::new("Johnathan Smith", "Gold Eagle", Some("$150")).unwrap();
//!
//! let label = layout(&GlyphMetrics, &request, &config, &fonts);
//! assert_eq!(label.instructions[0].text, "Johnathan S.");
//! assert_eq!(label.instructions[1].kind, LineKind::Price);
//! ```

pub mod wrap;

pub use wrap::wrap;

use crate::config::LabelConfig;
use crate::error::LabelError;
use crate::font::{Font, FontRole, FontSet, TextMetrics};

/// One label to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequest {
    pub buyer: String,
    pub item: String,
    /// Already formatted, e.g. `"$25"`
    pub price: Option<String>,
}

impl LabelRequest {
    /// Build a validated request. Blank prices count as no price.
    pub fn new(
        buyer: impl Into<String>,
        item: impl Into<String>,
        price: Option<impl Into<String>>,
    ) -> Result<Self, LabelError> {
        let price: Option<String> = price.map(Into::into);
        let request = Self {
            buyer: buyer.into(),
            item: item.into(),
            price: price.filter(|p| !p.trim().is_empty()),
        };
        request.validate()?;
        Ok(request)
    }

    /// Reject requests without a buyer or an item.
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.buyer.trim().is_empty() {
            return Err(LabelError::MalformedRequest(
                "buyer name is required".to_string(),
            ));
        }
        if self.item.trim().is_empty() {
            return Err(LabelError::MalformedRequest(
                "item description is required".to_string(),
            ));
        }
        Ok(())
    }

    /// The price, if one is present and not blank.
    pub fn price(&self) -> Option<&str> {
        self.price.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Horizontal placement rule of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// One physical line of the label before measurement.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub role: FontRole,
    pub text: String,
    pub font: Font,
    pub alignment: Alignment,
    pub horizontal_adjust: i32,
}

/// A [`TextBlock`] with its measured size.
#[derive(Debug, Clone)]
pub struct MeasuredLine {
    pub block: TextBlock,
    pub width: i32,
    pub height: i32,
}

/// What a draw instruction renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Buyer,
    Price,
    Item,
    Footer,
}

impl From<FontRole> for LineKind {
    fn from(role: FontRole) -> Self {
        match role {
            FontRole::Buyer => Self::Buyer,
            FontRole::Item => Self::Item,
            FontRole::Footer => Self::Footer,
        }
    }
}

/// Text at an absolute, already clamped canvas position.
#[derive(Debug, Clone)]
pub struct DrawInstruction {
    pub kind: LineKind,
    pub text: String,
    pub font: Font,
    pub x: i32,
    pub y: i32,
    /// Measured height of `text`
    pub height: i32,
}

/// Result of laying out one label.
#[derive(Debug, Clone)]
pub struct LabelLayout {
    pub instructions: Vec<DrawInstruction>,
    /// Pixels kept free for the price on the right of the buyer line
    pub price_reserve: i32,
}

impl LabelLayout {
    pub fn price(&self) -> Option<&DrawInstruction> {
        self.instructions.iter().find(|i| i.kind == LineKind::Price)
    }
}

/// Cut `buyer` to `max_chars` characters and append `marker` when cut.
pub fn truncate_buyer(buyer: &str, max_chars: usize, marker: &str) -> String {
    if buyer.chars().count() > max_chars {
        let mut truncated: String = buyer.chars().take(max_chars).collect();
        truncated.push_str(marker);
        truncated
    } else {
        buyer.to_string()
    }
}

/// Width reserved for the price column, or 0 without a price.
pub fn price_reserve<M>(metrics: &M, config: &LabelConfig, fonts: &FontSet, has_price: bool) -> i32
where
    M: TextMetrics + ?Sized,
{
    if !has_price {
        return 0;
    }
    metrics.measure(&config.price.sentinel, &fonts.buyer).width + config.price.margin
}

/// Assemble the ordered blocks: buyer, wrapped item lines, footer.
pub fn build_blocks<M>(
    metrics: &M,
    request: &LabelRequest,
    config: &LabelConfig,
    fonts: &FontSet,
) -> Vec<TextBlock>
where
    M: TextMetrics + ?Sized,
{
    let buyer = truncate_buyer(&request.buyer, config.buyer.max_chars, &config.buyer.marker);

    let mut item_lines = wrap(metrics, &request.item, &fonts.item, config.item_wrap_width());
    item_lines.truncate(config.item_max_lines);

    let nudge = config.offsets.buyer_nudge;
    let mut blocks = Vec::with_capacity(item_lines.len() + 3);

    blocks.push(TextBlock {
        role: FontRole::Buyer,
        text: buyer,
        font: fonts.buyer.clone(),
        alignment: Alignment::Left,
        horizontal_adjust: nudge,
    });

    for line in item_lines {
        blocks.push(TextBlock {
            role: FontRole::Item,
            text: line,
            font: fonts.item.clone(),
            alignment: Alignment::Left,
            horizontal_adjust: nudge,
        });
    }

    for line in [&config.footer.promo, &config.footer.social] {
        blocks.push(TextBlock {
            role: FontRole::Footer,
            text: line.clone(),
            font: fonts.footer.clone(),
            alignment: Alignment::Center,
            horizontal_adjust: 0,
        });
    }

    blocks
}

fn measure_blocks<M>(metrics: &M, blocks: Vec<TextBlock>) -> Vec<MeasuredLine>
where
    M: TextMetrics + ?Sized,
{
    blocks
        .into_iter()
        .map(|block| {
            let bbox = metrics.measure(&block.text, &block.font);
            MeasuredLine {
                block,
                width: bbox.width,
                height: bbox.height,
            }
        })
        .collect()
}

/// Top of the first line: the block centered vertically, shifted by the top
/// offset, never above `min_top`.
fn start_y(lines: &[MeasuredLine], config: &LabelConfig) -> i32 {
    let total: i32 = lines.iter().map(|l| l.height + config.line_spacing).sum();
    let y = (config.geometry.height - total).div_euclid(2) + config.offsets.top;
    y.max(config.margins.min_top)
}

fn line_x(line: &MeasuredLine, config: &LabelConfig) -> i32 {
    let label_width = config.geometry.width;
    let left = config.offsets.left;

    match line.block.alignment {
        Alignment::Left => config.margins.left + left + line.block.horizontal_adjust,
        Alignment::Right => label_width - line.width - config.margins.right + left,
        Alignment::Center => (label_width - line.width).div_euclid(2) + left,
    }
}

/// Lay out one label.
pub fn layout<M>(
    metrics: &M,
    request: &LabelRequest,
    config: &LabelConfig,
    fonts: &FontSet,
) -> LabelLayout
where
    M: TextMetrics + ?Sized,
{
    let price = request.price();
    let price_reserve = price_reserve(metrics, config, fonts, price.is_some());
    let lines = measure_blocks(metrics, build_blocks(metrics, request, config, fonts));

    let label_height = config.geometry.height;
    let bottom_limit = label_height - config.margins.bottom_safety;
    let mut y = start_y(&lines, config);
    let mut seen_footer = false;

    tracing::debug!(
        lines = lines.len(),
        start_y = y,
        price_reserve,
        "laying out label"
    );

    let mut instructions = Vec::with_capacity(lines.len() + 1);

    for line in &lines {
        let role = line.block.role;

        if role == FontRole::Footer && !seen_footer {
            seen_footer = true;
            y += config.offsets.footer_nudge;
        }

        let x = line_x(line, config);

        let mut line_y = y;
        if role == FontRole::Footer {
            line_y += config.offsets.footer_bias;
        }
        if line_y + line.height > bottom_limit {
            line_y = label_height - line.height - config.margins.bottom_safety;
        }

        instructions.push(DrawInstruction {
            kind: role.into(),
            text: line.block.text.clone(),
            font: line.block.font.clone(),
            x,
            y: line_y,
            height: line.height,
        });

        if role == FontRole::Buyer
            && let Some(price) = price
        {
            instructions.push(DrawInstruction {
                kind: LineKind::Price,
                text: price.to_string(),
                font: fonts.buyer.clone(),
                x: config.price.column + config.offsets.left,
                y: line_y,
                height: metrics.measure(price, &fonts.buyer).height,
            });
        }

        y += line.height + config.line_spacing;
    }

    LabelLayout {
        instructions,
        price_reserve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontConfig, LabelGeometry};
    use crate::font::TextBox;
    use pretty_assertions::assert_eq;

    /// Characters are half the font size wide; lines are as tall as the font.
    struct HalfEm;

    impl TextMetrics for HalfEm {
        fn measure(&self, text: &str, font: &Font) -> TextBox {
            if text.is_empty() {
                return TextBox::default();
            }
            TextBox {
                width: text.chars().count() as i32 * (font.size() as i32 / 2),
                height: font.size() as i32,
            }
        }
    }

    fn fonts() -> FontSet {
        FontSet::builtin(&FontConfig::default())
    }

    fn run(request: &LabelRequest, config: &LabelConfig) -> LabelLayout {
        layout(&HalfEm, request, config, &fonts())
    }

    fn positions(label: &LabelLayout) -> Vec<(LineKind, &str, i32, i32)> {
        label
            .instructions
            .iter()
            .map(|i| (i.kind, i.text.as_str(), i.x, i.y))
            .collect()
    }

    #[test]
    fn test_truncate_buyer() {
        assert_eq!(truncate_buyer("Johnathan S", 11, "."), "Johnathan S");
        assert_eq!(truncate_buyer("Johnathan Sm", 11, "."), "Johnathan S.");
        assert_eq!(truncate_buyer("Johnathan Smith", 11, "."), "Johnathan S.");
        assert_eq!(truncate_buyer("", 11, "."), "");
    }

    #[test]
    fn test_truncate_buyer_counts_characters() {
        assert_eq!(truncate_buyer("Zoë Ångström-Ødegård", 11, "."), "Zoë Ångströ.");
    }

    #[test]
    fn test_request_validation() {
        assert!(LabelRequest::new("Ann", "Coin", None::<String>).is_ok());
        assert!(matches!(
            LabelRequest::new("", "Coin", None::<String>),
            Err(LabelError::MalformedRequest(_))
        ));
        assert!(matches!(
            LabelRequest::new("Ann", "  ", None::<String>),
            Err(LabelError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_blank_price_is_no_price() {
        let request = LabelRequest::new("Ann", "Coin", Some(" ")).unwrap();
        assert_eq!(request.price, None);

        let raw = LabelRequest {
            buyer: "Ann".into(),
            item: "Coin".into(),
            price: Some(String::new()),
        };
        assert_eq!(raw.price(), None);
    }

    #[test]
    fn test_full_label_scenario() {
        let request =
            LabelRequest::new("Johnathan Smith", "Gold Eagle 2024 1oz Coin", Some("$150")).unwrap();
        let label = run(&request, &LabelConfig::m221());

        // Block heights 26 + 28 + 28 + 24 + 24 plus 5 px spacing each = 155,
        // centered start (236 - 155) / 2 - 42 = -2 clamps to 5.
        assert_eq!(
            positions(&label),
            vec![
                (LineKind::Buyer, "Johnathan S.", 7, 5),
                (LineKind::Price, "$150", 157, 5),
                (LineKind::Item, "Gold Eagle 2024", 7, 36),
                (LineKind::Item, "1oz Coin", 7, 69),
                (LineKind::Footer, "MiracleCoins.com", 18, 103),
                (LineKind::Footer, "FB: @miraclecoinz", 12, 132),
            ]
        );
        // "$9999" at 13 px per char plus 35 px margin
        assert_eq!(label.price_reserve, 100);
    }

    #[test]
    fn test_item_limited_to_two_lines() {
        let request = LabelRequest::new(
            "Ann",
            "Morgan Silver Dollar 1921 with certificate of authenticity",
            None::<String>,
        )
        .unwrap();
        let label = run(&request, &LabelConfig::m221());

        let items: Vec<&str> = label
            .instructions
            .iter()
            .filter(|i| i.kind == LineKind::Item)
            .map(|i| i.text.as_str())
            .collect();
        assert_eq!(items, vec!["Morgan Silver", "Dollar 1921 with"]);
    }

    #[test]
    fn test_no_price() {
        let request = LabelRequest::new("Ann", "Gold Eagle", None::<String>).unwrap();
        let label = run(&request, &LabelConfig::m221());

        assert!(label.price().is_none());
        assert_eq!(label.price_reserve, 0);
        assert_eq!(label.instructions.len(), 4);
    }

    #[test]
    fn test_empty_item_renders_buyer_and_footer() {
        let request = LabelRequest {
            buyer: "Ann".into(),
            item: String::new(),
            price: None,
        };
        let label = run(&request, &LabelConfig::m221());

        // Heights 26 + 24 + 24 plus 15 spacing = 89; (236 - 89) / 2 - 42 = 31
        assert_eq!(
            positions(&label),
            vec![
                (LineKind::Buyer, "Ann", 7, 31),
                (LineKind::Footer, "MiracleCoins.com", 18, 63),
                (LineKind::Footer, "FB: @miraclecoinz", 12, 92),
            ]
        );
    }

    #[test]
    fn test_footer_is_constant() {
        for (buyer, item) in [("A", "B"), ("Someone Long Name", "Anything at all here")] {
            let request = LabelRequest::new(buyer, item, None::<String>).unwrap();
            let label = run(&request, &LabelConfig::m221());
            let footer: Vec<&str> = label
                .instructions
                .iter()
                .filter(|i| i.kind == LineKind::Footer)
                .map(|i| i.text.as_str())
                .collect();
            assert_eq!(footer, vec!["MiracleCoins.com", "FB: @miraclecoinz"]);
        }
    }

    #[test]
    fn test_bottom_clamp_on_short_label() {
        let config = LabelConfig {
            geometry: LabelGeometry {
                width: 354,
                height: 100,
            },
            ..LabelConfig::m221()
        };
        let request =
            LabelRequest::new("Johnathan Smith", "Gold Eagle 2024 1oz Coin", Some("$150")).unwrap();
        let label = run(&request, &config);

        for instruction in &label.instructions {
            assert!(instruction.y + instruction.height <= 100 - 4, "{:?}", instruction);
        }
        let social = label.instructions.last().unwrap();
        assert_eq!(social.y, 100 - 24 - 4);
    }

    #[test]
    fn test_bounds_hold_for_many_inputs() {
        let config = LabelConfig::m221();
        let buyers = ["A", "Johnathan Smith", "Mary-Kate Olsen-Twist"];
        let items = [
            "Coin",
            "Gold Eagle 2024 1oz Coin",
            "Supercalifragilisticexpialidocious Proof Set",
            "a b c d e f g h i j k l m n o p q r s t u v w x y z",
        ];
        for buyer in buyers {
            for item in items {
                for price in [None, Some("$9999")] {
                    let request = LabelRequest::new(buyer, item, price).unwrap();
                    let label = run(&request, &config);
                    assert!(label.instructions[0].y >= 0);
                    for i in &label.instructions {
                        assert!(i.y + i.height <= config.geometry.height, "{:?}", i);
                    }
                }
            }
        }
    }

    #[test]
    fn test_top_clamp() {
        let config = LabelConfig {
            offsets: crate::config::Offsets {
                top: -500,
                ..Default::default()
            },
            ..LabelConfig::m221()
        };
        let request = LabelRequest::new("Ann", "Coin", None::<String>).unwrap();
        let label = run(&request, &config);
        assert_eq!(label.instructions[0].y, config.margins.min_top);
    }

    #[test]
    fn test_price_column_ignores_buyer_width() {
        let config = LabelConfig::m221();
        let short = run(&LabelRequest::new("Al", "Coin", Some("$5")).unwrap(), &config);
        let long = run(
            &LabelRequest::new("Maximiliana Q", "Coin", Some("$5")).unwrap(),
            &config,
        );

        let short_price = short.price().unwrap();
        let long_price = long.price().unwrap();
        assert_eq!(short_price.x, 157);
        assert_eq!(long_price.x, 157);
        assert_eq!(short_price.y, short.instructions[0].y);
    }

    #[test]
    fn test_right_alignment() {
        let config = LabelConfig::m221();
        let line = MeasuredLine {
            block: TextBlock {
                role: FontRole::Item,
                text: "x".into(),
                font: Font::builtin(20.0),
                alignment: Alignment::Right,
                horizontal_adjust: 40,
            },
            width: 100,
            height: 20,
        };
        assert_eq!(line_x(&line, &config), 354 - 100 - 10 - 63);
    }

    #[test]
    fn test_block_order() {
        let request =
            LabelRequest::new("Ann", "Gold Eagle 2024 1oz Coin", Some("$150")).unwrap();
        let blocks = build_blocks(&HalfEm, &request, &LabelConfig::m221(), &fonts());
        let roles: Vec<FontRole> = blocks.iter().map(|b| b.role).collect();
        assert_eq!(
            roles,
            vec![
                FontRole::Buyer,
                FontRole::Item,
                FontRole::Item,
                FontRole::Footer,
                FontRole::Footer,
            ]
        );
        assert_eq!(blocks[0].horizontal_adjust, 65);
        assert_eq!(blocks[3].alignment, Alignment::Center);
        assert_eq!(blocks[3].horizontal_adjust, 0);
    }
}
