use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::road::TrackWindow;

/// What the road looks like right after a move.
pub struct Frame<'a> {
    pub window: &'a TrackWindow,
    pub car_lane: usize,
    pub crashed: bool,
    pub episode_index: u64,
}

/// Optional observer of every simulated step.
pub trait FrameSink {
    fn draw(&mut self, frame: &Frame<'_>);
}

pub struct NoopSink;

impl FrameSink for NoopSink {
    fn draw(&mut self, _frame: &Frame<'_>) {}
}

/// Plain text dump of the visible road, car row first.
pub struct TextSink<W: Write> {
    out: W,
    fast_mode: bool,
    display_every: u64,
    delay: Duration,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, fast_mode: bool, display_every: u64, delay: Duration) -> Self {
        Self {
            out,
            fast_mode,
            display_every: display_every.max(1),
            delay,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, frame: &Frame<'_>) -> std::io::Result<()> {
        writeln!(self.out)?;
        for (i, row) in frame.window.iter().enumerate() {
            let mut line: Vec<char> = row.to_string().chars().collect();
            //car sits on the front row
            if i == 0 && frame.car_lane < line.len() {
                line[frame.car_lane] = if frame.crashed { 'X' } else { 'H' };
            }
            writeln!(self.out, "{}", line.into_iter().collect::<String>())?;
        }
        self.out.flush()
    }
}

impl<W: Write> FrameSink for TextSink<W> {
    fn draw(&mut self, frame: &Frame<'_>) {
        if self.fast_mode && frame.episode_index % self.display_every != 0 {
            return;
        }
        if let Err(err) = self.render(frame) {
            crate::log::warn(&format!("frame not drawn: {err}"));
            return;
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}
