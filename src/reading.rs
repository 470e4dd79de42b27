//! Reading time estimates and scroll based reading progress.
//!
//! Mixed Chinese and English text is counted per ideograph and per word, so a post
//! that is half prose and half code comments still gets a sensible estimate.

use serde::{Deserialize, Serialize};

pub const DEFAULT_READING_SPEED: u32 = 200;

// ----------------- Estimate -----------------

/// Minutes needed to read `html` at `speed` units per minute, never less than one.
///
/// Takes the raw markup: stripping happens here, exactly once, so decoded
/// entities such as `&lt;` are never mistaken for tags.
pub fn estimate_reading_time(html: &str, speed: u32) -> u32 {
    let speed = if speed == 0 {
        DEFAULT_READING_SPEED
    } else {
        speed
    };
    let units = count_units(&strip_markup(html)) as u64;
    let minutes = units.div_ceil(u64::from(speed));
    u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
}

/// Counts every CJK ideograph and every run of letters or digits as one unit.
pub fn count_units(text: &str) -> usize {
    let mut units = 0;
    let mut in_word = false;
    for c in text.chars() {
        if is_cjk(c) {
            units += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                units += 1;
                in_word = true;
            }
        } else if in_word && (c == '\'' || c == '-') {
            // "don't" and "well-known" stay one word
        } else {
            in_word = false;
        }
    }
    units
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{2A700}'..='\u{2CEAF}')
}

/// Drops HTML tags and decodes the handful of entities editors actually emit.
pub fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ----------------- Progress -----------------

/// Bounding box of the article body, relative to the top of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentRegion {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub percent: f64,
    pub minutes_remaining: u32,
}

pub fn reading_progress(region: ContentRegion, viewport_height: f64) -> f64 {
    let bottom = region.top + region.height;
    if region.top >= viewport_height {
        return 0.0;
    }
    if bottom <= viewport_height {
        return 100.0;
    }
    let scrollable = region.height - viewport_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (-region.top / scrollable * 100.0).clamp(0.0, 100.0)
}

pub fn time_remaining(percent: f64, total_minutes: u32) -> u32 {
    let left = (100.0 - percent.clamp(0.0, 100.0)) / 100.0;
    (total_minutes as f64 * left).ceil() as u32
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    region: Option<ContentRegion>,
    viewport_height: f64,
}

/// Scroll/resize listener for an article page. Observations are coalesced and
/// computed at most once per animation frame.
#[derive(Debug)]
pub struct ProgressTracker {
    total_minutes: u32,
    pending: Option<Observation>,
    latest: Option<ReadingProgress>,
}

impl ProgressTracker {
    pub fn new(total_minutes: u32) -> Self {
        Self {
            total_minutes,
            pending: None,
            latest: None,
        }
    }

    pub fn for_content(content: &str, speed: u32) -> Self {
        Self::new(estimate_reading_time(content, speed))
    }

    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    /// Returns true when this event requested a new frame.
    pub fn on_scroll(&mut self, region: Option<ContentRegion>, viewport_height: f64) -> bool {
        let requested = self.pending.is_none();
        self.pending = Some(Observation {
            region,
            viewport_height,
        });
        requested
    }

    pub fn on_resize(&mut self, region: Option<ContentRegion>, viewport_height: f64) -> bool {
        self.on_scroll(region, viewport_height)
    }

    /// Computes progress from the last observation since the previous frame.
    /// Produces nothing when no frame was requested or the content is not mounted yet.
    pub fn on_animation_frame(&mut self) -> Option<ReadingProgress> {
        let observation = self.pending.take()?;
        let region = observation.region?;
        let percent = reading_progress(region, observation.viewport_height);
        let progress = ReadingProgress {
            percent,
            minutes_remaining: time_remaining(percent, self.total_minutes),
        };
        self.latest = Some(progress);
        Some(progress)
    }

    pub fn latest(&self) -> Option<ReadingProgress> {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_reads_in_one_minute() {
        assert_eq!(estimate_reading_time("", DEFAULT_READING_SPEED), 1);
        assert_eq!(estimate_reading_time("<p></p>", DEFAULT_READING_SPEED), 1);
    }

    #[test]
    fn cjk_characters_count_individually() {
        assert_eq!(estimate_reading_time(&"字".repeat(200), 200), 1);
        assert_eq!(estimate_reading_time(&"字".repeat(201), 200), 2);
        assert_eq!(estimate_reading_time(&"字".repeat(250), 200), 2);
        assert_eq!(estimate_reading_time(&"字".repeat(401), 200), 3);
    }

    #[test]
    fn mixed_text_counts_words_and_ideographs() {
        assert_eq!(count_units("Rust 很好 don't panic, well-known"), 6);
        assert_eq!(count_units(&strip_markup("<p>hello</p><p>world</p>")), 2);
        assert_eq!(count_units("版本v2发布"), 5);
    }

    #[test]
    fn custom_speed_and_zero_speed() {
        let text = "word ".repeat(300);
        assert_eq!(estimate_reading_time(&text, 100), 3);
        assert_eq!(estimate_reading_time(&text, 0), 2);
    }

    #[test]
    fn huge_speed_does_not_overflow() {
        assert_eq!(estimate_reading_time("two words", u32::MAX), 1);
        assert_eq!(estimate_reading_time(&"word ".repeat(300), u32::MAX - 1), 1);
    }

    #[test]
    fn escaped_angle_bracket_keeps_following_text() {
        let html = format!("<p>if a &lt; b then</p><p>{}</p>", "word ".repeat(300));
        // 304 words
        assert_eq!(estimate_reading_time(&html, DEFAULT_READING_SPEED), 2);
    }

    #[test]
    fn markup_is_stripped_and_entities_decoded() {
        assert_eq!(
            strip_markup("<p>a&nbsp;&amp;&lt;b&gt;</p>").trim(),
            "a &<b>"
        );
        assert_eq!(strip_markup("<img src=\"x.png\">caption").trim(), "caption");
    }

    #[test]
    fn progress_cases() {
        let below = ContentRegion {
            top: 900.0,
            height: 2000.0,
        };
        assert_eq!(reading_progress(below, 800.0), 0.0);

        let through = ContentRegion {
            top: -1500.0,
            height: 2000.0,
        };
        assert_eq!(reading_progress(through, 800.0), 100.0);

        let halfway = ContentRegion {
            top: -600.0,
            height: 2000.0,
        };
        assert!((reading_progress(halfway, 800.0) - 50.0).abs() < f64::EPSILON);

        let not_started = ContentRegion {
            top: 200.0,
            height: 2000.0,
        };
        assert_eq!(reading_progress(not_started, 800.0), 0.0);
    }

    #[test]
    fn remaining_time_rounds_up() {
        assert_eq!(time_remaining(0.0, 5), 5);
        assert_eq!(time_remaining(50.0, 5), 3);
        assert_eq!(time_remaining(100.0, 5), 0);
    }

    #[test]
    fn tracker_computes_once_per_frame() {
        let mut tracker = ProgressTracker::new(4);
        assert!(tracker.on_scroll(
            Some(ContentRegion {
                top: 0.0,
                height: 1800.0
            }),
            800.0
        ));
        assert!(!tracker.on_scroll(
            Some(ContentRegion {
                top: -500.0,
                height: 1800.0
            }),
            800.0
        ));

        let progress = tracker.on_animation_frame().unwrap();
        assert!((progress.percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(progress.minutes_remaining, 2);
        assert_eq!(tracker.on_animation_frame(), None);
        assert_eq!(tracker.latest(), Some(progress));
    }

    #[test]
    fn tracker_is_silent_without_content() {
        let mut tracker = ProgressTracker::new(3);
        tracker.on_resize(None, 800.0);
        assert_eq!(tracker.on_animation_frame(), None);
        assert_eq!(tracker.latest(), None);
    }
}
