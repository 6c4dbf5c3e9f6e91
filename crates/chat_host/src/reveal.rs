//! Word-by-word reveal of a finished response.
//!
//! The markdown source is split into word tokens (a word plus the whitespace
//! after it). Each tick emits the revealed prefix; the receiver renders it
//! with whatever theme is active at that moment, so every frame is
//! well-formed HTML and the last frame is exactly the full render.

use futures::future::{AbortHandle, Abortable};
use shared::settings::RevealSettings;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealFrame {
    pub markdown: String,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct RevealPlan {
    text: String,
    /// Byte offset where each token ends.
    ends: Vec<usize>,
}

impl RevealPlan {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut ends = Vec::new();
        let mut seen_word = false;
        let mut after_space = false;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                after_space = true;
            } else {
                if seen_word && after_space {
                    ends.push(i);
                }
                seen_word = true;
                after_space = false;
            }
        }
        if !text.is_empty() {
            ends.push(text.len());
        }
        Self { text, ends }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.ends.len()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(&self.text[start..end])
    }

    /// Prefix ends for each tick. The last one is always the full text.
    pub fn steps(&self, words_per_tick: usize) -> Vec<usize> {
        let per_tick = words_per_tick.max(1);
        let mut steps: Vec<usize> = self
            .ends
            .iter()
            .skip(per_tick - 1)
            .step_by(per_tick)
            .copied()
            .collect();
        if let Some(&last) = self.ends.last() {
            if steps.last() != Some(&last) {
                steps.push(last);
            }
        }
        steps
    }
}

/// Reveal `plan` on the runtime, one step per tick, starting immediately.
/// Abort the returned handle to stop early; no frame is emitted after that.
pub fn spawn_reveal<F>(
    runtime: &Handle,
    plan: RevealPlan,
    settings: RevealSettings,
    mut on_frame: F,
) -> AbortHandle
where
    F: FnMut(RevealFrame) + Send + 'static,
{
    let (handle, registration) = AbortHandle::new_pair();
    let steps = plan.steps(settings.words_per_tick);
    let period = Duration::from_millis(settings.interval_ms.max(1));

    let task = async move {
        if steps.is_empty() {
            on_frame(RevealFrame {
                done: true,
                ..RevealFrame::default()
            });
            return;
        }

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let last = steps.len() - 1;
        for (i, end) in steps.into_iter().enumerate() {
            ticker.tick().await;
            on_frame(RevealFrame {
                markdown: plan.text()[..end].to_string(),
                done: i == last,
            });
        }
    };

    runtime.spawn(Abortable::new(task, registration));
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn settings(interval_ms: u64, words_per_tick: usize) -> RevealSettings {
        RevealSettings {
            interval_ms,
            words_per_tick,
        }
    }

    #[test]
    fn test_tokens_keep_trailing_whitespace() {
        let plan = RevealPlan::new("Hello **world**\n\nnext  line");
        assert_eq!(plan.token_count(), 4);
        assert_eq!(plan.token(0), Some("Hello "));
        assert_eq!(plan.token(1), Some("**world**\n\n"));
        assert_eq!(plan.token(2), Some("next  "));
        assert_eq!(plan.token(3), Some("line"));
        assert_eq!(plan.token(4), None);
    }

    #[test]
    fn test_leading_whitespace_joins_first_token() {
        let plan = RevealPlan::new("  hi there");
        assert_eq!(plan.token(0), Some("  hi "));
        assert_eq!(RevealPlan::new("").token_count(), 0);
    }

    #[test]
    fn test_steps_always_end_with_full_text() {
        let plan = RevealPlan::new("one two three four five");
        assert_eq!(plan.steps(1).len(), 5);
        assert_eq!(plan.steps(2), vec![8, 19, 23]);
        assert_eq!(plan.steps(10), vec![23]);
        assert_eq!(plan.steps(0).len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_frame_is_full_text() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();

        spawn_reveal(
            &Handle::current(),
            RevealPlan::new("Hello **world**"),
            settings(75, 1),
            move |frame| sink.lock().push(frame),
        );
        time::sleep(Duration::from_millis(500)).await;

        let frames = frames.lock();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].markdown, "Hello ");
        assert!(!frames[0].done);
        let last = frames.last().unwrap();
        assert!(last.done);
        assert_eq!(last.markdown, "Hello **world**");
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_follow_interval() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        spawn_reveal(
            &Handle::current(),
            RevealPlan::new("a b c d"),
            settings(100, 1),
            move |frame| sink.lock().push(frame),
        );

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(frames.lock().len(), 2);
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(frames.lock().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_frames() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        let handle = spawn_reveal(
            &Handle::current(),
            RevealPlan::new("many words to reveal slowly here"),
            settings(75, 1),
            move |frame| sink.lock().push(frame),
        );

        time::sleep(Duration::from_millis(80)).await;
        handle.abort();
        let seen = frames.lock().len();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(frames.lock().len(), seen);
        assert!(frames.lock().iter().all(|f| !f.done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_completes_at_once() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();
        spawn_reveal(
            &Handle::current(),
            RevealPlan::new(""),
            settings(75, 1),
            move |frame| sink.lock().push(frame),
        );
        tokio::task::yield_now().await;
        time::sleep(Duration::from_millis(1)).await;

        let frames = frames.lock();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].done);
        assert!(frames[0].markdown.is_empty());
    }
}
