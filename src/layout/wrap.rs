//! Greedy word wrapping.
//!
//! ```text
//! max_width ──────────────────────┤
//! "Gold Eagle 2024 1oz Coin"
//!   Gold            ✓
//!   Gold Eagle      ✓
//!   Gold Eagle 2024 ✓
//!   Gold Eagle 2024 1oz ✗ → commit "Gold Eagle 2024", restart at "1oz"
//!   1oz Coin        ✓ → commit at end
//! ```
//!
//! Words are never split. A word wider than the limit gets a line of its own
//! and overflows it. The wrapper bounds width only; callers limit line count.

use crate::font::{Font, TextMetrics};

/// Split `text` on single spaces and pack the words greedily into lines no
/// wider than `max_width`.
pub fn wrap<M>(metrics: &M, text: &str, font: &Font, max_width: i32) -> Vec<String>
where
    M: TextMetrics + ?Sized,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ') {
        let candidate = format!("{} {}", current, word).trim().to_string();

        if metrics.measure(&candidate, font).width <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(current);
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
