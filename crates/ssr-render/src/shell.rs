//! HTML shell with head and body placeholders.

use ssr_assets::RenderOutput;
use ssr_core::{BODY_PLACEHOLDER, HEAD_PLACEHOLDER};

/// The HTML shell a rendered page is spliced into.
#[derive(Debug, Clone, Copy)]
pub struct ShellTemplate<'a> {
    html: &'a str,
}

impl<'a> ShellTemplate<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html }
    }

    pub fn has_head_placeholder(&self) -> bool {
        self.html.contains(HEAD_PLACEHOLDER)
    }

    pub fn has_body_placeholder(&self) -> bool {
        self.html.contains(BODY_PLACEHOLDER)
    }

    /// Replace the first head marker with `head` and the first body marker
    /// with `body`.
    ///
    /// Marker positions are taken from the shell alone, so markup inside the
    /// inserted fragments is never itself substituted. Later occurrences of a
    /// marker stay literal; a missing marker drops its fragment.
    pub fn fill(&self, head: &str, body: &str) -> String {
        let mut slots: Vec<(usize, &str, &str)> = [(HEAD_PLACEHOLDER, head), (BODY_PLACEHOLDER, body)]
            .into_iter()
            .filter_map(|(marker, value)| self.html.find(marker).map(|at| (at, marker, value)))
            .collect();
        slots.sort_by_key(|(at, _, _)| *at);

        let mut out = String::with_capacity(self.html.len() + head.len() + body.len());
        let mut cursor = 0;
        for (at, marker, value) in slots {
            out.push_str(&self.html[cursor..at]);
            out.push_str(value);
            cursor = at + marker.len();
        }
        out.push_str(&self.html[cursor..]);
        out
    }

    /// Fill from a render result; absent fragments become empty strings.
    pub fn fill_output(&self, output: &RenderOutput) -> String {
        self.fill(output.head_or_empty(), output.html_or_empty())
    }
}
