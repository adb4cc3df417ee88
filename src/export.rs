//! Arduino export: the whole animation as a `PROGMEM` byte table.
//!
//! Each frame becomes 65 records of 4 numbers:
//! - record 0 holds the frame settings `[wait_seconds, frame_count, 65, 4]`
//! - records 1..=64 hold `[led_id, r, g, b]` for every cell, in row-major
//!   grid order (not wire order); an off cell uses `OFF_SENTINEL` as its id
//!
//! The table is rendered as JSON-style nested arrays with every bracket
//! swapped for a brace, which is valid C array initializer syntax:
//!
//! ```text
//! const unsigned char PROGMEM anim[1][65][4] = {{{1,1,65,4},{99,255,0,0},...}};
//! ```

use crate::LED_COUNT;
use crate::animation::Animation;
use serde_json::{Number, Value};

/// Id written for LEDs that are off. Valid ids are `0..LED_COUNT`.
pub const OFF_SENTINEL: u8 = 99;

/// Numbers per record.
pub const RECORD_WIDTH: usize = 4;

/// Records per frame: one settings record plus one per LED.
pub const RECORDS_PER_FRAME: usize = LED_COUNT + 1;

/// One frame of the export table, before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTable {
    pub wait_ms: u32,
    pub frame_count: usize,
    /// `[led_id_or_sentinel, r, g, b]` in row-major grid order.
    pub leds: Vec<[u8; RECORD_WIDTH]>,
}

impl FrameTable {
    /// The settings record as rendered: wait in seconds (fractional when
    /// needed), frame count, records per frame, record width.
    fn settings(&self) -> Value {
        let wait = if self.wait_ms % 1000 == 0 {
            Value::from(self.wait_ms / 1000)
        } else {
            Number::from_f64(self.wait_ms as f64 / 1000.0)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        };
        Value::Array(vec![
            wait,
            Value::from(self.frame_count),
            Value::from(RECORDS_PER_FRAME),
            Value::from(RECORD_WIDTH),
        ])
    }

    fn to_value(&self) -> Value {
        let mut records = Vec::with_capacity(RECORDS_PER_FRAME);
        records.push(self.settings());
        records.extend(
            self.leds
                .iter()
                .map(|record| Value::Array(record.iter().map(|&n| Value::from(n)).collect())),
        );
        Value::Array(records)
    }
}

/// The full `[frame_count][65][4]` export table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportTable {
    pub frames: Vec<FrameTable>,
}

impl ExportTable {
    pub fn from_animation(animation: &Animation) -> Self {
        let frame_count = animation.len();
        let frames = animation
            .frames()
            .iter()
            .map(|frame| FrameTable {
                wait_ms: frame.wait_ms,
                frame_count,
                leds: frame
                    .grid
                    .cells()
                    .map(|(_, cell)| {
                        let id = if cell.on {
                            cell.physical_index()
                        } else {
                            OFF_SENTINEL
                        };
                        let [r, g, b] = cell.color.to_rgb();
                        [id, r, g, b]
                    })
                    .collect(),
            })
            .collect();
        Self { frames }
    }

    /// Render as a C declaration ready to paste into a sketch.
    pub fn render(&self) -> String {
        let nested = Value::Array(self.frames.iter().map(FrameTable::to_value).collect());
        let body: String = nested
            .to_string()
            .chars()
            .map(|c| match c {
                '[' => '{',
                ']' => '}',
                other => other,
            })
            .collect();
        format!(
            "const unsigned char PROGMEM anim[{}][{}][{}] = {};",
            self.frames.len(),
            RECORDS_PER_FRAME,
            RECORD_WIDTH,
            body
        )
    }
}

/// Serialize an animation to Arduino source text.
pub fn serialize(animation: &Animation) -> String {
    ExportTable::from_animation(animation).render()
}
