/// Font size change per search step
pub const STEP: f32 = 0.01;
/// Size the status label is reset to before every fit
pub const STATUS_START_SIZE: f32 = 20.0;

/// Measures the height of word-wrapped text
pub trait TextMetric {
    /// Height of `text` laid out at `font_size`, wrapped at `wrap_width`
    fn wrapped_height(&self, text: &str, font_size: f32, wrap_width: f32) -> f32;
}

/// A fixed-pitch approximation of a font, for consoles without a renderer.
///
/// Each glyph advances `advance` and each line takes `line_height`, both as fractions of
/// the font size. Lines break at spaces; a word longer than a line is split.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetric {
    pub advance: f32,
    pub line_height: f32,
}

impl Default for MonospaceMetric {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMetric for MonospaceMetric {
    fn wrapped_height(&self, text: &str, font_size: f32, wrap_width: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let glyph = self.advance * font_size;
        let per_line = ((wrap_width / glyph).floor() as usize).max(1);

        let mut lines = 0;
        for paragraph in text.split('\n') {
            lines += 1;
            let mut used = 0;
            for word in paragraph.split(' ') {
                let len = word.chars().count();
                let needed = if used == 0 { len } else { used + 1 + len };
                if needed <= per_line {
                    used = needed;
                } else if len <= per_line {
                    lines += 1;
                    used = len;
                } else {
                    // Break the word across as many lines as it takes
                    let remaining = if used == 0 { len } else { len + used + 1 - per_line };
                    if used != 0 {
                        lines += 1;
                    }
                    lines += (remaining.saturating_sub(1)) / per_line;
                    used = match remaining % per_line {
                        0 => per_line,
                        rest => rest,
                    };
                }
            }
        }
        lines as f32 * self.line_height * font_size
    }
}

/// Searches for the largest font size at which text still fits a box.
///
/// The search walks in steps of [`STEP`] from the current size. When the text overflows
/// at the starting size the fitter shrinks, committing a step before checking the new
/// height, so it ends on the first size that fits. Otherwise it grows, checking a step
/// before committing it, so it ends on the last size that fits. Shrinking stops at
/// `floor`, growing stops at `ceiling`. A start size above `ceiling`, or one that is not
/// finite, is brought down to `ceiling` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFitter {
    pub floor: f32,
    pub ceiling: f32,
}

impl TextFitter {
    /// Fitter for the status line
    pub const STATUS: TextFitter = TextFitter {
        floor: 1.0,
        ceiling: 40.0,
    };
    /// Fitter for file path labels
    pub const PATH_LABEL: TextFitter = TextFitter {
        floor: 0.1,
        ceiling: 20.0,
    };

    /// Fit `text` into a `width` x `height` box starting from `size`
    pub fn fit(
        &self,
        metric: &dyn TextMetric,
        text: &str,
        width: f32,
        height: f32,
        size: f32,
    ) -> f32 {
        let mut size = if size.is_finite() {
            size.min(self.ceiling)
        } else {
            self.ceiling
        };
        let step = if metric.wrapped_height(text, size, width) > height {
            -STEP
        } else {
            STEP
        };

        loop {
            let tentative = metric.wrapped_height(text, size + step, width);
            // A step below the f32 resolution at this size would never move it
            if size <= self.floor || size + step == size {
                break;
            }
            if step < 0.0 {
                size += step;
                if tentative < height {
                    break;
                }
            } else {
                if tentative > height || size + step > self.ceiling {
                    break;
                }
                size += step;
            }
        }

        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Height grows linearly with size; counts measurements
    struct LinearMetric {
        per_size: f32,
        calls: Cell<usize>,
    }

    impl TextMetric for LinearMetric {
        fn wrapped_height(&self, _text: &str, font_size: f32, _wrap_width: f32) -> f32 {
            self.calls.set(self.calls.get() + 1);
            font_size * self.per_size
        }
    }

    fn linear(per_size: f32) -> LinearMetric {
        LinearMetric {
            per_size,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn shrinks_to_first_size_that_fits() {
        // Fits strictly below 10.0
        let size = TextFitter::STATUS.fit(&linear(2.0), "overflow", 100.0, 20.0, 12.0);
        assert!(size < 10.0 && size > 10.0 - 2.0 * STEP, "size = {size}");
    }

    #[test]
    fn grows_to_last_size_that_fits() {
        let size = TextFitter::STATUS.fit(&linear(1.0), "short", 100.0, 25.5, 20.0);
        assert!(size <= 25.5 && size > 25.5 - 2.0 * STEP, "size = {size}");
    }

    #[test]
    fn stops_at_the_floor() {
        let status = TextFitter::STATUS.fit(&linear(1.0), "x", 100.0, 0.0, 20.0);
        assert!(status <= 1.0 && status > 1.0 - 2.0 * STEP, "status = {status}");

        let path = TextFitter::PATH_LABEL.fit(&linear(1.0), "x", 100.0, 0.0, 2.0);
        assert!(path <= 0.1 && path > 0.1 - 2.0 * STEP, "path = {path}");
    }

    #[test]
    fn empty_text_grows_to_the_ceiling() {
        let metric = MonospaceMetric::default();
        let size = TextFitter::STATUS.fit(&metric, "", 200.0, 30.0, STATUS_START_SIZE);
        assert!(size <= TextFitter::STATUS.ceiling);
        assert!(TextFitter::STATUS.ceiling - size < STEP * 1.5, "size = {size}");
    }

    #[test]
    fn fitting_twice_changes_nothing() {
        let metric = MonospaceMetric::default();
        let cases = [
            ("Error! See the terminal window for more information!", 180.0, 40.0),
            ("Conversion Finished!", 400.0, 30.0),
            ("Successfully loaded the file! - settings.json (Not applied yet)", 300.0, 12.0),
        ];
        for (text, width, height) in cases {
            let once = TextFitter::STATUS.fit(&metric, text, width, height, STATUS_START_SIZE);
            let twice = TextFitter::STATUS.fit(&metric, text, width, height, once);
            assert!((once - twice).abs() < 1e-4, "{text}: {once} vs {twice}");
            assert!(metric.wrapped_height(text, once, width) <= height);
        }
    }

    #[test]
    fn fitted_size_converges_in_one_step() {
        let metric = linear(1.0);
        let size = TextFitter::STATUS.fit(&metric, "x", 100.0, 25.5, 20.0);
        metric.calls.set(0);
        TextFitter::STATUS.fit(&metric, "x", 100.0, 25.5, size);
        // Initial measurement plus a single tentative step
        assert_eq!(metric.calls.get(), 2);
    }

    #[test]
    fn oversized_or_broken_start_sizes_still_return() {
        let size = TextFitter::STATUS.fit(&linear(1.0), "x", 100.0, 10.0, 300_000.0);
        assert!(size < 10.0 && size > 10.0 - 2.0 * STEP, "size = {size}");

        for start in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let size = TextFitter::STATUS.fit(&linear(1.0), "x", 100.0, 10.0, start);
            assert!(size.is_finite() && size < 10.0, "{start}: {size}");
        }

        // No ceiling to clamp to: stops where a step no longer changes the size
        let wide = TextFitter {
            floor: 1.0,
            ceiling: f32::MAX,
        };
        let size = wide.fit(&linear(1.0), "x", 100.0, 1.0, 300_000.0);
        assert_eq!(size, 300_000.0);
    }

    #[test]
    fn monospace_wraps_words() {
        let metric = MonospaceMetric {
            advance: 1.0,
            line_height: 1.0,
        };
        // Ten glyphs per line at size 1
        assert_eq!(metric.wrapped_height("hello", 1.0, 10.0), 1.0);
        assert_eq!(metric.wrapped_height("hello world", 1.0, 10.0), 2.0);
        assert_eq!(metric.wrapped_height("abcdefghijklmnopqrstuvwxy", 1.0, 10.0), 3.0);
        assert_eq!(metric.wrapped_height("a\nb", 1.0, 10.0), 2.0);
        assert_eq!(metric.wrapped_height("", 1.0, 10.0), 0.0);
    }
}
