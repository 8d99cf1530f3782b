/// Ordered, append-only record of the text fragments received in one session.
///
/// Only the owning `StreamConsumer` appends to or finalizes a transcript;
/// callers get read access.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    fragments: Vec<String>,
    finalized: bool,
}

impl Transcript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment. Returns `false` and drops the fragment if the
    /// transcript is already finalized.
    pub(crate) fn append(&mut self, fragment: impl Into<String>) -> bool {
        if self.finalized {
            return false;
        }
        self.fragments.push(fragment.into());
        true
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Fragments in arrival order.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Concatenation of all fragments in arrival order.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// Whether a `completed` event sealed this transcript.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
