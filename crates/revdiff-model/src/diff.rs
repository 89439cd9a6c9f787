use serde::{Deserialize, Serialize};

/// Diff body of one file between two revisions.
///
/// A binary diff never carries line data; its content has to be downloaded
/// from the raw file endpoints instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffContent {
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub content: Vec<DiffBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
}

/// One region of the diff. `ab` lines are common to both sides, `a` lines
/// only exist on the left and `b` lines only on the right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ab: Option<Vec<String>>,
    /// Common lines elided by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

impl DiffContent {
    /// Placeholder used for binary files instead of asking the server.
    pub fn binary() -> Self {
        Self {
            binary: true,
            ..Default::default()
        }
    }

    pub fn has_line_data(&self) -> bool {
        self.content
            .iter()
            .any(|b| b.a.is_some() || b.b.is_some() || b.ab.is_some())
    }

    /// Lines of the base side in file order (`ab` then `a` per block).
    pub fn left_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.side_lines(true)
    }

    /// Lines of the revision side in file order (`ab` then `b` per block).
    pub fn right_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.side_lines(false)
    }

    fn side_lines(&self, left: bool) -> impl Iterator<Item = &str> + '_ {
        self.content.iter().flat_map(move |block| {
            let own = if left { &block.a } else { &block.b };
            block
                .ab
                .iter()
                .flatten()
                .chain(own.iter().flatten())
                .map(String::as_str)
        })
    }

    /// Rewrite the response of a revision diffed against itself.
    ///
    /// The server reports the whole file as `b` in that case; it is moved to
    /// `ab` so both panes show the same text. Returns `false` when there was
    /// nothing to rewrite.
    pub fn rectify_self_diff(&mut self) -> bool {
        match self.content.first_mut() {
            Some(block) => {
                block.ab = block.b.take();
                true
            }
            None => false,
        }
    }
}
